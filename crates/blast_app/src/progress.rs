use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use blast_core::JobState;
use blast_engine::{PipelineEvent, ProgressSink};
use chrono::{DateTime, Local, TimeDelta};

/// Narrates a run on a terminal the way an interactive user expects.
pub struct ConsoleProgress<W> {
    out: Mutex<W>,
    now: fn() -> DateTime<Local>,
}

impl<W: Write + Send> ConsoleProgress<W> {
    pub fn new(out: W) -> Self {
        Self::with_clock(out, Local::now)
    }

    pub fn with_clock(out: W, now: fn() -> DateTime<Local>) -> Self {
        Self {
            out: Mutex::new(out),
            now,
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn message(&self, event: &PipelineEvent) -> String {
        match event {
            PipelineEvent::Submitted { job_id } => {
                format!("Your Job Dispatcher Job Id is:\n{job_id}")
            }
            PipelineEvent::StatusChecked { state, query, .. } => {
                if *query == 1 && !state.is_terminal() {
                    format!("\nYour results are pending. This may take some time.\n{state}")
                } else {
                    format!("\n{state}")
                }
            }
            PipelineEvent::StatusUnavailable { error, .. } => {
                format!("\nCould not read the job status ({error}), will retry.")
            }
            PipelineEvent::Waiting { wait, .. } => {
                let at = TimeDelta::from_std(*wait)
                    .ok()
                    .and_then(|delta| (self.now)().checked_add_signed(delta));
                match at {
                    Some(at) => format!(
                        "\nJob not completed, checking again in {} (at {}).",
                        describe_wait(*wait),
                        at.format("%H:%M:%S")
                    ),
                    None => format!(
                        "\nJob not completed, checking again in {}.",
                        describe_wait(*wait)
                    ),
                }
            }
            PipelineEvent::ResultsReady { .. } => "\nYour results are ready.".to_string(),
            PipelineEvent::Extracted {
                records, malformed, ..
            } => {
                if *malformed == 0 {
                    format!("{records} hits extracted.")
                } else {
                    format!("{records} hits extracted, {malformed} lines could not be parsed.")
                }
            }
            PipelineEvent::Written { path, .. } => {
                format!("Output written to file: {}", path.display())
            }
        }
    }
}

impl<W: Write + Send> ProgressSink for ConsoleProgress<W> {
    fn emit(&self, event: PipelineEvent) {
        let line = self.message(&event);
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Console output is best effort.
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }
}

/// Failure line for a job that ended in a terminal non-success state.
pub fn describe_failure(state: &JobState) -> String {
    match state {
        JobState::NotFound => "The service no longer knows this job.".to_string(),
        other => format!("The job ended with status {other}."),
    }
}

fn describe_wait(wait: Duration) -> String {
    let secs = wait.as_secs();
    match (secs / 60, secs % 60) {
        (1, 0) => "1 minute".to_string(),
        (minutes, 0) => format!("{minutes} minutes"),
        _ => format!("{secs} seconds"),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use blast_core::{JobId, JobState};
    use blast_engine::{PipelineEvent, ProgressSink};
    use chrono::{DateTime, Local, TimeZone};
    use pretty_assertions::assert_eq;

    use super::{describe_failure, describe_wait, ConsoleProgress};

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn job() -> JobId {
        JobId::new("ncbiblast-R20240501-120000-0001-p1m")
    }

    fn narrate(events: Vec<PipelineEvent>) -> String {
        let console = ConsoleProgress::with_clock(Vec::new(), noon);
        for event in events {
            console.emit(event);
        }
        String::from_utf8(console.into_inner()).unwrap()
    }

    #[test]
    fn narrates_a_successful_run() {
        let text = narrate(vec![
            PipelineEvent::Submitted { job_id: job() },
            PipelineEvent::StatusChecked {
                job_id: job(),
                state: JobState::Running,
                query: 1,
            },
            PipelineEvent::Waiting {
                job_id: job(),
                wait: Duration::from_secs(300),
            },
            PipelineEvent::StatusChecked {
                job_id: job(),
                state: JobState::Finished,
                query: 2,
            },
            PipelineEvent::ResultsReady { job_id: job() },
            PipelineEvent::Written {
                job_id: job(),
                path: PathBuf::from("AB123456_Output.txt"),
            },
        ]);

        assert_eq!(
            text,
            concat!(
                "Your Job Dispatcher Job Id is:\n",
                "ncbiblast-R20240501-120000-0001-p1m\n",
                "\nYour results are pending. This may take some time.\nRUNNING\n",
                "\nJob not completed, checking again in 5 minutes (at 12:05:00).\n",
                "\nFINISHED\n",
                "\nYour results are ready.\n",
                "Output written to file: AB123456_Output.txt\n",
            )
        );
    }

    #[test]
    fn reports_malformed_line_count() {
        let text = narrate(vec![PipelineEvent::Extracted {
            job_id: job(),
            records: 3,
            malformed: 1,
        }]);
        assert_eq!(text, "3 hits extracted, 1 lines could not be parsed.\n");
    }

    #[test]
    fn out_of_range_wait_omits_the_clock_time() {
        let text = narrate(vec![PipelineEvent::Waiting {
            job_id: job(),
            wait: Duration::from_secs(u64::MAX),
        }]);
        assert_eq!(
            text,
            format!(
                "\nJob not completed, checking again in {} seconds.\n",
                u64::MAX
            )
        );
    }

    #[test]
    fn short_waits_are_given_in_seconds() {
        assert_eq!(describe_wait(Duration::from_secs(60)), "1 minute");
        assert_eq!(describe_wait(Duration::from_secs(90)), "90 seconds");
        assert_eq!(describe_wait(Duration::from_secs(5)), "5 seconds");
    }

    #[test]
    fn failure_lines_name_the_state() {
        assert_eq!(
            describe_failure(&JobState::Error),
            "The job ended with status ERROR."
        );
    }
}
