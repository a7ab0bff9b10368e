//! BLAST client core: job state, poll policy state machine and hit extraction.
//! Nothing in this crate performs IO.
mod extract;
mod poll;
mod query;
mod record;
mod state;

pub use extract::{
    extract_lines, ExtractionReport, HitAccumulator, HitExtractor, LineExtractor, LineOutcome,
    MalformedRecordError, MarkerError, MarkerExtractor, Trigger,
};
pub use poll::{
    PollDecision, PollFailure, PollObservation, PollPolicy, PollTracker, UnknownStatePolicy,
};
pub use query::QuerySequence;
pub use record::{HitRecord, FIELD_SEPARATOR};
pub use state::{JobId, JobState, SearchJob};
