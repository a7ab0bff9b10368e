use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use blast_core::{JobId, QuerySequence, SearchJob};
use blast_logging::{blast_error, blast_info, blast_warn, clear_job_context, set_job_context};
use tokio_util::sync::CancellationToken;

use crate::client::JobClient;
use crate::persist::RecordSink;
use crate::poll_loop::PollLoop;
use crate::results::{extract_stream, open_results};
use crate::{PipelineError, PipelineEvent, ProgressSink, RunSummary, Stage};

/// Submit, poll, fetch, extract, write. One job per call, strictly in order.
pub struct SearchPipeline {
    client: Arc<dyn JobClient>,
    poll_loop: PollLoop,
    records: Arc<dyn RecordSink>,
}

impl SearchPipeline {
    pub fn new(
        client: Arc<dyn JobClient>,
        poll_loop: PollLoop,
        records: Arc<dyn RecordSink>,
    ) -> Self {
        Self {
            client,
            poll_loop,
            records,
        }
    }

    pub async fn run(
        &self,
        query: &QuerySequence,
        cancel: &CancellationToken,
        progress: &dyn ProgressSink,
    ) -> Result<RunSummary, PipelineError> {
        let result = self.run_stages(query, cancel, progress).await;
        if let Err(err) = &result {
            blast_error!("{} stage failed: {err}", err.stage());
        }
        clear_job_context();
        result
    }

    async fn run_stages(
        &self,
        query: &QuerySequence,
        cancel: &CancellationToken,
        progress: &dyn ProgressSink,
    ) -> Result<RunSummary, PipelineError> {
        let job_id = until_cancelled(cancel, Stage::Submission, None, self.client.submit(query))
            .await?
            .map_err(PipelineError::Submission)?;
        set_job_context(job_id.as_str());
        blast_info!("submitted query {}", query.id);
        progress.emit(PipelineEvent::Submitted {
            job_id: job_id.clone(),
        });

        let mut job = SearchJob::submitted(job_id.clone());
        let polled = self
            .poll_loop
            .wait_for_completion(self.client.as_ref(), &mut job, cancel, progress)
            .await?;
        blast_info!(
            "results ready after {} status queries and {:?} of waiting",
            polled.status_queries,
            polled.waited
        );
        progress.emit(PipelineEvent::ResultsReady {
            job_id: job_id.clone(),
        });

        let stream = until_cancelled(
            cancel,
            Stage::Fetch,
            Some(&job_id),
            open_results(self.client.as_ref(), &job),
        )
        .await?
        .map_err(|source| PipelineError::Fetch {
            job_id: job_id.clone(),
            source,
        })?;

        let extracted = until_cancelled(
            cancel,
            Stage::Extraction,
            Some(&job_id),
            extract_stream(stream, &query.id),
        )
        .await?;
        let report = match extracted {
            Ok(report) => report,
            Err(interrupted) => {
                let records = interrupted.partial.records.len();
                blast_warn!(
                    "result stream broke after {records} records, writing what was read"
                );
                let partial_output = self.write_partial(&query.id, &interrupted.partial.lines());
                return Err(PipelineError::Extraction {
                    job_id,
                    records,
                    message: interrupted.error.to_string(),
                    partial_output,
                });
            }
        };

        if !report.malformed.is_empty() {
            blast_warn!(
                "{} malformed lines, affected hits are written with empty fields",
                report.malformed.len()
            );
        }
        progress.emit(PipelineEvent::Extracted {
            job_id: job_id.clone(),
            records: report.records.len(),
            malformed: report.malformed.len(),
        });

        let output_path = self.write(&job_id, &query.id, &report.lines())?;
        progress.emit(PipelineEvent::Written {
            job_id: job_id.clone(),
            path: output_path.clone(),
        });

        Ok(RunSummary {
            job_id,
            status_queries: polled.status_queries,
            records: report.records.len(),
            malformed: report.malformed,
            output_path,
        })
    }

    fn write_partial(&self, query_id: &str, lines: &[String]) -> Option<PathBuf> {
        match self.records.write_records(query_id, lines) {
            Ok(path) => Some(path),
            Err(err) => {
                blast_warn!("could not write partial output: {err}");
                None
            }
        }
    }

    fn write(
        &self,
        job_id: &JobId,
        query_id: &str,
        lines: &[String],
    ) -> Result<PathBuf, PipelineError> {
        self.records
            .write_records(query_id, lines)
            .map_err(|source| PipelineError::Write {
                job_id: job_id.clone(),
                source,
            })
    }
}

/// Runs `work` unless `cancel` fires first. Cancellation wins when both are
/// ready; the dropped future releases whatever it held.
async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    stage: Stage,
    job_id: Option<&JobId>,
    work: F,
) -> Result<F::Output, PipelineError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            blast_warn!("cancelled during {stage}");
            Err(PipelineError::Cancelled {
                job_id: job_id.cloned(),
                stage,
            })
        }
        output = work => Ok(output),
    }
}
