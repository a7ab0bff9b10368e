//! BLAST client engine: service calls, polling, result streaming and output.
mod client;
mod filename;
mod persist;
mod pipeline;
mod poll_loop;
mod results;
mod settings;
mod types;

pub use client::{JobClient, ReqwestJobClient, ResultStream};
pub use filename::output_filename;
pub use persist::{ensure_output_dir, AtomicFileWriter, FileRecordSink, PersistError, RecordSink};
pub use pipeline::SearchPipeline;
pub use poll_loop::{PollLoop, PollSummary, Sleeper, TokioSleeper};
pub use results::{extract_stream, open_results, StreamInterrupted};
pub use settings::{ServiceSettings, DEFAULT_BASE_URL};
pub use types::{
    FailureKind, FetchError, JobFailedError, PipelineError, PipelineEvent, PollError,
    ProgressSink, RunSummary, Stage, SubmissionError, TransportError,
};
