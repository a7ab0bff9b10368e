use std::sync::Arc;
use std::time::Duration;

use blast_core::{
    PollDecision, PollFailure, PollObservation, PollPolicy, PollTracker, SearchJob,
};
use blast_logging::{blast_debug, blast_info, blast_warn};
use tokio_util::sync::CancellationToken;

use crate::client::JobClient;
use crate::{JobFailedError, PipelineError, PipelineEvent, PollError, ProgressSink, Stage};

/// Suspends the poll loop between status queries.
#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How a completed wait went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    pub status_queries: u32,
    pub waited: Duration,
}

/// Drives [`JobClient::status`] until the job reaches a terminal state.
///
/// Tracks one job at a time. Cancellation is honoured before every status
/// query and while sleeping.
#[derive(Clone)]
pub struct PollLoop {
    policy: PollPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl PollLoop {
    pub fn new(policy: PollPolicy) -> Self {
        Self::with_sleeper(policy, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(policy: PollPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { policy, sleeper }
    }

    pub async fn wait_for_completion(
        &self,
        client: &dyn JobClient,
        job: &mut SearchJob,
        cancel: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> Result<PollSummary, PipelineError> {
        let mut tracker = PollTracker::new(self.policy.clone());
        let mut last_error: Option<PollError> = None;

        loop {
            if cancel.is_cancelled() {
                return Err(cancelled(job));
            }

            let observation = match client.status(job.id()).await {
                Ok(state) => {
                    blast_debug!("status query {} returned {state}", tracker.queries() + 1);
                    job.observe(state.clone());
                    sink.emit(PipelineEvent::StatusChecked {
                        job_id: job.id().clone(),
                        state: state.clone(),
                        query: tracker.queries() + 1,
                    });
                    PollObservation::Status(state)
                }
                Err(err) => {
                    blast_warn!("status query failed: {err}");
                    sink.emit(PipelineEvent::StatusUnavailable {
                        job_id: job.id().clone(),
                        error: err.clone(),
                    });
                    last_error = Some(err);
                    PollObservation::TransportFailure
                }
            };

            match tracker.observe(observation) {
                PollDecision::Finished => {
                    blast_info!(
                        "job finished after {} status queries",
                        tracker.queries()
                    );
                    return Ok(PollSummary {
                        status_queries: tracker.queries(),
                        waited: tracker.waited(),
                    });
                }
                PollDecision::Wait(wait) => {
                    sink.emit(PipelineEvent::Waiting {
                        job_id: job.id().clone(),
                        wait,
                    });
                    blast_debug!("checking again in {wait:?}");
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(cancelled(job)),
                        _ = self.sleeper.sleep(wait) => {}
                    }
                }
                PollDecision::Failed(failure) => {
                    return Err(failure_to_error(job, failure, last_error));
                }
            }
        }
    }
}

fn cancelled(job: &SearchJob) -> PipelineError {
    blast_warn!("cancelled while polling");
    PipelineError::Cancelled {
        job_id: Some(job.id().clone()),
        stage: Stage::Polling,
    }
}

fn failure_to_error(
    job: &SearchJob,
    failure: PollFailure,
    last_error: Option<PollError>,
) -> PipelineError {
    let job_id = job.id().clone();
    match failure {
        PollFailure::JobFailed(state) => {
            PipelineError::JobFailed(JobFailedError { job_id, state })
        }
        PollFailure::UnknownState(token) => PipelineError::UnknownState { job_id, token },
        PollFailure::TimedOut { waited } => PipelineError::Timeout { job_id, waited },
        PollFailure::TooManyErrors { consecutive } => PipelineError::Poll {
            job_id,
            consecutive,
            // The tracker only gives up after at least one transport failure.
            last: last_error.unwrap_or_else(|| {
                PollError(crate::TransportError::new(
                    crate::FailureKind::Network,
                    "status unavailable",
                ))
            }),
        },
    }
}
