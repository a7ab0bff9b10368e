use std::time::Duration;

use crate::state::JobState;

/// How an unrecognised status token is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownStatePolicy {
    /// Keep polling, as if the job were still running.
    #[default]
    KeepPolling,
    /// Stop and report the token.
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Upper bound on the total time spent waiting. `None` polls forever.
    pub max_wait: Option<Duration>,
    /// Transport failures tolerated in a row before polling gives up.
    pub max_consecutive_errors: u32,
    pub unknown_state: UnknownStatePolicy,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5 * 60),
            max_wait: None,
            max_consecutive_errors: 5,
            unknown_state: UnknownStatePolicy::KeepPolling,
        }
    }
}

/// Result of one status query as seen by the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollObservation {
    Status(JobState),
    TransportFailure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollDecision {
    /// Sleep for the given duration, then query again.
    Wait(Duration),
    Finished,
    Failed(PollFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollFailure {
    /// The job reached `Error` or `NotFound`.
    JobFailed(JobState),
    UnknownState(String),
    TooManyErrors { consecutive: u32 },
    TimedOut { waited: Duration },
}

/// Pure poll state machine: feed it each status observation and it says
/// whether to wait, stop, or fail. Time is logical; the tracker only sums
/// the waits it has scheduled.
#[derive(Debug, Clone)]
pub struct PollTracker {
    policy: PollPolicy,
    queries: u32,
    consecutive_errors: u32,
    waited: Duration,
}

impl PollTracker {
    pub fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            queries: 0,
            consecutive_errors: 0,
            waited: Duration::ZERO,
        }
    }

    /// Status queries observed so far, failed ones included.
    pub fn queries(&self) -> u32 {
        self.queries
    }

    pub fn waited(&self) -> Duration {
        self.waited
    }

    pub fn observe(&mut self, observation: PollObservation) -> PollDecision {
        self.queries += 1;
        match observation {
            PollObservation::TransportFailure => {
                self.consecutive_errors += 1;
                if self.consecutive_errors > self.policy.max_consecutive_errors {
                    return PollDecision::Failed(PollFailure::TooManyErrors {
                        consecutive: self.consecutive_errors,
                    });
                }
                self.schedule_wait()
            }
            PollObservation::Status(state) => {
                self.consecutive_errors = 0;
                match state {
                    JobState::Finished => PollDecision::Finished,
                    JobState::Error | JobState::NotFound => {
                        PollDecision::Failed(PollFailure::JobFailed(state))
                    }
                    JobState::Unknown(token) => match self.policy.unknown_state {
                        UnknownStatePolicy::KeepPolling => self.schedule_wait(),
                        UnknownStatePolicy::Fail => {
                            PollDecision::Failed(PollFailure::UnknownState(token))
                        }
                    },
                    JobState::Pending | JobState::Running => self.schedule_wait(),
                }
            }
        }
    }

    fn schedule_wait(&mut self) -> PollDecision {
        let interval = self.policy.interval;
        let next = self.waited.checked_add(interval);
        if let Some(max_wait) = self.policy.max_wait {
            if next.map_or(true, |next| next > max_wait) {
                return PollDecision::Failed(PollFailure::TimedOut {
                    waited: self.waited,
                });
            }
        }
        self.waited = next.unwrap_or(Duration::MAX);
        PollDecision::Wait(interval)
    }
}
