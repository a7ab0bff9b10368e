use std::fmt;

/// Opaque, service-assigned identifier of a remote search job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state reported by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Finished,
    Error,
    NotFound,
    /// A token the service returned that none of the known states match.
    Unknown(String),
}

impl JobState {
    /// Maps the first line of a status response to a state.
    ///
    /// `QUEUED` is folded into `Pending` and `FAILURE` into `Error`, matching
    /// the tokens the service documents alongside the five core states.
    pub fn from_token(token: &str) -> Self {
        let token = token.trim();
        match token.to_ascii_uppercase().as_str() {
            "PENDING" | "QUEUED" => JobState::Pending,
            "RUNNING" => JobState::Running,
            "FINISHED" => JobState::Finished,
            "ERROR" | "FAILURE" => JobState::Error,
            "NOT_FOUND" | "NOTFOUND" => JobState::NotFound,
            _ => JobState::Unknown(token.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Finished | JobState::Error | JobState::NotFound
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Pending => write!(f, "PENDING"),
            JobState::Running => write!(f, "RUNNING"),
            JobState::Finished => write!(f, "FINISHED"),
            JobState::Error => write!(f, "ERROR"),
            JobState::NotFound => write!(f, "NOT_FOUND"),
            JobState::Unknown(token) => write!(f, "unknown state {token:?}"),
        }
    }
}

/// A submitted job and the last state observed for it.
///
/// Once a terminal state is recorded the job is frozen; later observations
/// are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchJob {
    id: JobId,
    state: JobState,
}

impl SearchJob {
    /// A freshly submitted job. The service has not reported a state yet.
    pub fn submitted(id: JobId) -> Self {
        Self {
            id,
            state: JobState::Pending,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    /// Records a newly observed state. Returns `false` and leaves the job
    /// untouched if it already reached a terminal state.
    pub fn observe(&mut self, state: JobState) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = state;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{JobId, JobState, SearchJob};

    #[test]
    fn tokens_map_to_states() {
        assert_eq!(JobState::from_token("PENDING"), JobState::Pending);
        assert_eq!(JobState::from_token("QUEUED"), JobState::Pending);
        assert_eq!(JobState::from_token(" RUNNING \r"), JobState::Running);
        assert_eq!(JobState::from_token("FINISHED"), JobState::Finished);
        assert_eq!(JobState::from_token("ERROR"), JobState::Error);
        assert_eq!(JobState::from_token("FAILURE"), JobState::Error);
        assert_eq!(JobState::from_token("NOT_FOUND"), JobState::NotFound);
    }

    #[test]
    fn unrecognised_token_is_kept_verbatim() {
        assert_eq!(
            JobState::from_token("ARCHIVED"),
            JobState::Unknown("ARCHIVED".to_string())
        );
        assert!(!JobState::from_token("ARCHIVED").is_terminal());
    }

    #[test]
    fn terminal_job_ignores_later_observations() {
        let mut job = SearchJob::submitted(JobId::new("job-1"));
        assert!(job.observe(JobState::Running));
        assert!(job.observe(JobState::Error));
        assert!(!job.observe(JobState::Finished));
        assert_eq!(job.state(), &JobState::Error);
    }
}
