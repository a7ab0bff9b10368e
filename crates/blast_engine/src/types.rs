use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use blast_core::{JobId, JobState, MalformedRecordError};

use crate::persist::PersistError;

/// Pipeline stage, used to attribute fatal failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Submission,
    Polling,
    Fetch,
    Extraction,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Submission => "submission",
            Stage::Polling => "polling",
            Stage::Fetch => "fetch",
            Stage::Extraction => "extraction",
            Stage::Write => "write",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    EmptyBody,
    NotFinished,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::EmptyBody => write!(f, "empty response body"),
            FailureKind::NotFinished => write!(f, "job has not finished"),
        }
    }
}

/// A single failed exchange with the service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: FailureKind,
    pub message: String,
}

impl TransportError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Job creation failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(transparent)]
pub struct SubmissionError(pub TransportError);

/// A status query failed. Retried by the poll loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(transparent)]
pub struct PollError(pub TransportError);

/// The result stream could not be opened.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(transparent)]
pub struct FetchError(pub TransportError);

impl SubmissionError {
    pub fn kind(&self) -> &FailureKind {
        &self.0.kind
    }
}

impl PollError {
    pub fn kind(&self) -> &FailureKind {
        &self.0.kind
    }
}

impl FetchError {
    pub fn kind(&self) -> &FailureKind {
        &self.0.kind
    }
}

/// The job reached `Error` or `NotFound`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("job {job_id} ended in state {state}")]
pub struct JobFailedError {
    pub job_id: JobId,
    pub state: JobState,
}

/// Fatal outcome of a search run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("submission failed: {0}")]
    Submission(#[source] SubmissionError),
    #[error("polling job {job_id} failed after {consecutive} consecutive errors: {last}")]
    Poll {
        job_id: JobId,
        consecutive: u32,
        #[source]
        last: PollError,
    },
    #[error("polling job {job_id} stopped on unrecognised status {token:?}")]
    UnknownState { job_id: JobId, token: String },
    #[error("polling failed: {0}")]
    JobFailed(#[source] JobFailedError),
    #[error("job {job_id} did not finish within {waited:?}")]
    Timeout { job_id: JobId, waited: Duration },
    #[error("cancelled during {stage}, job {}", display_job(.job_id))]
    Cancelled { job_id: Option<JobId>, stage: Stage },
    #[error("fetching results of job {job_id} failed: {source}")]
    Fetch {
        job_id: JobId,
        #[source]
        source: FetchError,
    },
    #[error("reading results of job {job_id} failed after {records} records: {message}")]
    Extraction {
        job_id: JobId,
        records: usize,
        message: String,
        partial_output: Option<PathBuf>,
    },
    #[error("writing output of job {job_id} failed: {source}")]
    Write {
        job_id: JobId,
        #[source]
        source: PersistError,
    },
}

fn display_job(job_id: &Option<JobId>) -> String {
    job_id
        .as_ref()
        .map(JobId::to_string)
        .unwrap_or_else(|| "(not submitted)".to_string())
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Submission(_) => Stage::Submission,
            PipelineError::Poll { .. }
            | PipelineError::UnknownState { .. }
            | PipelineError::JobFailed(_)
            | PipelineError::Timeout { .. } => Stage::Polling,
            PipelineError::Cancelled { stage, .. } => *stage,
            PipelineError::Fetch { .. } => Stage::Fetch,
            PipelineError::Extraction { .. } => Stage::Extraction,
            PipelineError::Write { .. } => Stage::Write,
        }
    }

    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            PipelineError::Submission(_) => None,
            PipelineError::Cancelled { job_id, .. } => job_id.as_ref(),
            PipelineError::JobFailed(err) => Some(&err.job_id),
            PipelineError::Poll { job_id, .. }
            | PipelineError::UnknownState { job_id, .. }
            | PipelineError::Timeout { job_id, .. }
            | PipelineError::Fetch { job_id, .. }
            | PipelineError::Extraction { job_id, .. }
            | PipelineError::Write { job_id, .. } => Some(job_id),
        }
    }

    /// Process exit status for this failure. `1` is left to input and
    /// configuration errors raised before a run starts.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Submission(_) => 2,
            PipelineError::Poll { .. } | PipelineError::UnknownState { .. } => 3,
            PipelineError::JobFailed(_) => 4,
            PipelineError::Timeout { .. } => 5,
            PipelineError::Cancelled { .. } => 6,
            PipelineError::Fetch { .. } => 7,
            PipelineError::Extraction { .. } => 8,
            PipelineError::Write { .. } => 9,
        }
    }
}

/// Progress reported while a run is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    Submitted {
        job_id: JobId,
    },
    StatusChecked {
        job_id: JobId,
        state: JobState,
        query: u32,
    },
    StatusUnavailable {
        job_id: JobId,
        error: PollError,
    },
    Waiting {
        job_id: JobId,
        wait: Duration,
    },
    ResultsReady {
        job_id: JobId,
    },
    Extracted {
        job_id: JobId,
        records: usize,
        malformed: usize,
    },
    Written {
        job_id: JobId,
        path: PathBuf,
    },
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub job_id: JobId,
    pub status_queries: u32,
    pub records: usize,
    pub malformed: Vec<MalformedRecordError>,
    pub output_path: PathBuf,
}

/// Receives [`PipelineEvent`]s as the run progresses.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}
