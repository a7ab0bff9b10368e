#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use blast_core::{JobId, JobState, QuerySequence};
use blast_engine::{
    FailureKind, FetchError, JobClient, PipelineEvent, PollError, ProgressSink, ResultStream,
    Sleeper, SubmissionError, TransportError,
};
use tokio::io::{AsyncRead, AsyncReadExt, BufReader, ReadBuf};
use tokio_util::sync::CancellationToken;

/// What the result stream does once the scripted body is used up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    Eof,
    /// The connection drops.
    Reset,
    /// No more bytes ever arrive.
    Stall,
}

impl AsyncRead for StreamEnd {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match *self {
            StreamEnd::Eof => Poll::Ready(Ok(())),
            StreamEnd::Reset => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ))),
            StreamEnd::Stall => Poll::Pending,
        }
    }
}

/// In-memory service answering status queries from a script.
pub struct ScriptedClient {
    job_id: String,
    statuses: Mutex<VecDeque<Result<JobState, PollError>>>,
    result_body: Vec<u8>,
    stream_end: StreamEnd,
    cancel_on_fetch: Option<CancellationToken>,
    hang_on_fetch: bool,
    status_queries: Mutex<u32>,
    fetches: Mutex<u32>,
}

impl ScriptedClient {
    pub fn new(statuses: Vec<JobState>) -> Self {
        Self::with_results(statuses.into_iter().map(Ok).collect(), Vec::new())
    }

    pub fn with_results(statuses: Vec<Result<JobState, PollError>>, result_body: Vec<u8>) -> Self {
        Self {
            job_id: "ncbiblast-R20261018-000000-0000-00000000-p1m".to_string(),
            statuses: Mutex::new(statuses.into()),
            result_body,
            stream_end: StreamEnd::Eof,
            cancel_on_fetch: None,
            hang_on_fetch: false,
            status_queries: Mutex::new(0),
            fetches: Mutex::new(0),
        }
    }

    pub fn ending_with(mut self, stream_end: StreamEnd) -> Self {
        self.stream_end = stream_end;
        self
    }

    /// Cancels `token` when the result stream is requested. With `hang` the
    /// request itself never completes.
    pub fn cancelling_on_fetch(mut self, token: CancellationToken, hang: bool) -> Self {
        self.cancel_on_fetch = Some(token);
        self.hang_on_fetch = hang;
        self
    }

    pub fn status_queries(&self) -> u32 {
        *self.status_queries.lock().unwrap()
    }

    pub fn fetches(&self) -> u32 {
        *self.fetches.lock().unwrap()
    }
}

pub fn transport_failure() -> PollError {
    PollError(TransportError {
        kind: FailureKind::Network,
        message: "connection reset".to_string(),
    })
}

#[async_trait::async_trait]
impl JobClient for ScriptedClient {
    async fn submit(&self, query: &QuerySequence) -> Result<JobId, SubmissionError> {
        if query.residues.is_empty() {
            return Err(SubmissionError(TransportError {
                kind: FailureKind::HttpStatus(400),
                message: "400 Bad Request".to_string(),
            }));
        }
        Ok(JobId::new(self.job_id.clone()))
    }

    async fn status(&self, _job_id: &JobId) -> Result<JobState, PollError> {
        *self.status_queries.lock().unwrap() += 1;
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .expect("status script exhausted")
    }

    async fn open_result_stream(&self, _job_id: &JobId) -> Result<ResultStream, FetchError> {
        *self.fetches.lock().unwrap() += 1;
        if let Some(token) = &self.cancel_on_fetch {
            token.cancel();
            if self.hang_on_fetch {
                std::future::pending::<()>().await;
            }
        }
        let body = Cursor::new(self.result_body.clone()).chain(self.stream_end);
        Ok(Box::new(BufReader::new(body)))
    }
}

/// Records requested sleeps and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    pub sleeps: Mutex<Vec<Duration>>,
}

#[async_trait::async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

/// Cancels the given token on the n-th sleep, then never wakes.
pub struct CancellingSleeper {
    pub cancel_on: usize,
    pub token: CancellationToken,
    pub calls: Mutex<usize>,
}

#[async_trait::async_trait]
impl Sleeper for CancellingSleeper {
    async fn sleep(&self, _duration: Duration) {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        if call >= self.cancel_on {
            self.token.cancel();
            std::future::pending::<()>().await;
        }
    }
}

#[derive(Default)]
pub struct TestSink {
    events: Arc<Mutex<Vec<PipelineEvent>>>,
}

impl TestSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<PipelineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: PipelineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn hit_document(accession: &str, description: &str) -> String {
    [
        r#"<?xml version="1.0" encoding="UTF-8"?>"#.to_string(),
        "<EBIApplicationResult>".to_string(),
        "<hits total=\"1\">".to_string(),
        format!(
            r#"<hit number="1" database="EM_STD" id="{accession}" ac="{accession}" length="1200" description="{description}">"#
        ),
        "<alignments total=\"1\">".to_string(),
        "<alignment number=\"1\">".to_string(),
        "<score>99</score>".to_string(),
        r#"<querySeq start="1" end="50">ACGTACGT</querySeq>"#.to_string(),
        r#"<matchSeq start="10" end="60">ACGTACGT</matchSeq>"#.to_string(),
        "</alignment>".to_string(),
        "</alignments>".to_string(),
        "</hit>".to_string(),
        "</hits>".to_string(),
        "</EBIApplicationResult>".to_string(),
    ]
    .join("\n")
}
