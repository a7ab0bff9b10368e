mod cli;
mod config;
mod logging;
mod progress;
mod source;

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use blast_engine::{
    FileRecordSink, PipelineError, PollLoop, ReqwestJobClient, RunSummary, SearchPipeline,
};
use blast_logging::{blast_info, blast_warn};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use crate::cli::Cli;
use crate::config::{AppConfig, FileConfig};
use crate::progress::{describe_failure, ConsoleProgress};

const BANNER: &str = "\
This program accepts a FASTA formatted file or manual entry and performs a BLAST search on DNA.
Only the first FASTA entry in a file will be processed.
If there are multiple alignments for a BLAST hit the last alignment will be returned.
Results are sent in tab separated format to a local text file named with the sequence name.

The search uses all EMBL nucleotide databases and may take a while to complete.
";

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(1)
        }
    }
}

/// Input and configuration problems surface as `Err`; pipeline failures are
/// reported here and mapped to their exit status.
fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = FileConfig::load(cli.config.as_deref())?
        .with_overrides(&cli)
        .resolve()?;
    logging::initialize(config.log, logging::level_for(cli.verbose));

    println!("{BANNER}");
    let query = match &cli.fasta {
        Some(path) => source::first_fasta_record(path)?,
        None => {
            println!("No file given.");
            source::from_flags_or_prompt(
                cli.id.clone(),
                cli.sequence.clone(),
                &mut io::stdin().lock(),
                &mut io::stdout(),
            )?
        }
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    let outcome = runtime.block_on(search(&config, &query));

    match outcome {
        Ok(summary) => {
            blast_info!(
                "{} hits for {} after {} status checks",
                summary.records,
                query.id,
                summary.status_queries
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            report_failure(&err);
            Ok(ExitCode::from(err.exit_code()))
        }
    }
}

async fn search(
    config: &AppConfig,
    query: &blast_core::QuerySequence,
) -> Result<RunSummary, PipelineError> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            blast_warn!("interrupt received, stopping the run");
            on_interrupt.cancel();
        }
    });

    let pipeline = SearchPipeline::new(
        Arc::new(ReqwestJobClient::new(config.service.clone())),
        PollLoop::new(config.poll.clone()),
        Arc::new(FileRecordSink::new(config.output_dir.clone())),
    );
    let progress = ConsoleProgress::new(io::stdout());
    pipeline.run(query, &cancel, &progress).await
}

fn report_failure(err: &PipelineError) {
    match err {
        PipelineError::JobFailed(failed) => eprintln!("{}", describe_failure(&failed.state)),
        PipelineError::Extraction {
            partial_output: Some(path),
            ..
        } => {
            eprintln!("An error occurred: {err}");
            eprintln!("Partial results were written to {}", path.display());
        }
        _ => eprintln!("An error occurred: {err}"),
    }
    if let Some(job_id) = err.job_id() {
        eprintln!("Job id: {job_id}");
    }
}
