use std::path::PathBuf;

use clap::Parser;

use crate::logging::LogDestination;

/// Submit a nucleotide sequence to the EBI NCBI BLAST service and write the
/// hits as tab separated rows.
#[derive(Debug, Default, Parser)]
#[command(name = "blast_search", version, about)]
pub struct Cli {
    /// FASTA file to read. Only the first record is searched.
    #[arg(short, long, value_name = "FILE")]
    pub fasta: Option<PathBuf>,

    /// Sequence id, used when no FASTA file is given.
    #[arg(long, conflicts_with = "fasta")]
    pub id: Option<String>,

    /// Sequence residues, used when no FASTA file is given.
    #[arg(long, conflicts_with = "fasta")]
    pub sequence: Option<String>,

    /// RON configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Contact e-mail sent with the submission.
    #[arg(long)]
    pub email: Option<String>,

    /// Directory the output file is written to.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Seconds between status checks.
    #[arg(long, value_name = "SECS")]
    pub poll_interval_secs: Option<u64>,

    /// Give up after waiting this many seconds for the job.
    #[arg(long, value_name = "SECS")]
    pub max_wait_secs: Option<u64>,

    /// Where log output goes.
    #[arg(long, value_enum)]
    pub log: Option<LogDestination>,

    /// Log debug detail.
    #[arg(short, long)]
    pub verbose: bool,
}
