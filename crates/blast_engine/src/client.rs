use std::io;

use blast_core::{JobId, JobState, QuerySequence};
use blast_logging::{blast_debug, blast_info};
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tokio::io::AsyncBufRead;
use tokio_util::io::StreamReader;

use crate::settings::ServiceSettings;
use crate::{FailureKind, FetchError, PollError, SubmissionError, TransportError};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const PLAIN_TEXT: &str = "text/plain;charset=UTF-8";

/// Readable result markup, consumed line by line.
pub type ResultStream = Box<dyn AsyncBufRead + Send + Unpin>;

/// The three calls the job dispatcher exposes. Each call is one outbound
/// request; nothing is cached between calls.
#[async_trait::async_trait]
pub trait JobClient: Send + Sync {
    async fn submit(&self, query: &QuerySequence) -> Result<JobId, SubmissionError>;

    async fn status(&self, job_id: &JobId) -> Result<JobState, PollError>;

    async fn open_result_stream(&self, job_id: &JobId) -> Result<ResultStream, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestJobClient {
    settings: ServiceSettings,
}

impl ReqwestJobClient {
    pub fn new(settings: ServiceSettings) -> Self {
        Self { settings }
    }

    // A fresh client per call keeps every connection scoped to one request.
    fn build_client(&self) -> Result<reqwest::Client, TransportError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|err| TransportError::new(FailureKind::Network, err.to_string()))
    }

    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url, TransportError> {
        let base = self.settings.base_url.trim_end_matches('/');
        let raw = format!("{base}/{}", segments.join("/"));
        reqwest::Url::parse(&raw)
            .map_err(|err| TransportError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    fn submission_body(&self, query: &QuerySequence) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("sequence", &query.residues)
            .append_pair("program", &self.settings.program)
            .append_pair("database", &self.settings.database)
            .append_pair("stype", &self.settings.stype)
            .append_pair("email", &self.settings.email)
            .finish()
    }

    async fn get(&self, url: reqwest::Url) -> Result<reqwest::Response, TransportError> {
        let response = self
            .build_client()?
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        ensure_success(response)
    }
}

#[async_trait::async_trait]
impl JobClient for ReqwestJobClient {
    async fn submit(&self, query: &QuerySequence) -> Result<JobId, SubmissionError> {
        let url = self.endpoint(&["run"]).map_err(SubmissionError)?;
        blast_info!(
            "submitting {} ({} residues) to {url}",
            query.id,
            query.residues.len()
        );

        let response = self
            .build_client()
            .map_err(SubmissionError)?
            .post(url)
            .header(ACCEPT, PLAIN_TEXT)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(self.submission_body(query))
            .send()
            .await
            .map_err(|err| SubmissionError(map_reqwest_error(err)))?;
        let response = ensure_success(response).map_err(SubmissionError)?;
        let body = response
            .text()
            .await
            .map_err(|err| SubmissionError(map_reqwest_error(err)))?;

        first_line(&body)
            .map(JobId::new)
            .ok_or_else(|| {
                SubmissionError(TransportError::new(
                    FailureKind::EmptyBody,
                    "service returned no job id",
                ))
            })
    }

    async fn status(&self, job_id: &JobId) -> Result<JobState, PollError> {
        let url = self
            .endpoint(&["status", job_id.as_str()])
            .map_err(PollError)?;
        let response = self.get(url).await.map_err(PollError)?;
        let body = response
            .text()
            .await
            .map_err(|err| PollError(map_reqwest_error(err)))?;

        let token = first_line(&body).ok_or_else(|| {
            PollError(TransportError::new(
                FailureKind::EmptyBody,
                "service returned no status",
            ))
        })?;
        blast_debug!("status token {token:?}");
        Ok(JobState::from_token(token))
    }

    async fn open_result_stream(&self, job_id: &JobId) -> Result<ResultStream, FetchError> {
        let url = self
            .endpoint(&["result", job_id.as_str(), "xml"])
            .map_err(FetchError)?;
        let response = self.get(url).await.map_err(FetchError)?;
        blast_debug!(
            "result stream open, content length {:?}",
            response.content_length()
        );

        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(io::Error::other));
        Ok(Box::new(StreamReader::new(Box::pin(chunks))))
    }
}

fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::new(
            FailureKind::HttpStatus(status.as_u16()),
            status.to_string(),
        ));
    }
    Ok(response)
}

/// First line of a plain-text body, trimmed. `None` if it is blank.
fn first_line(body: &str) -> Option<&str> {
    body.lines().next().map(str::trim).filter(|line| !line.is_empty())
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::new(FailureKind::Timeout, err.to_string());
    }
    TransportError::new(FailureKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line_trims_and_skips_blank_bodies() {
        assert_eq!(first_line("  job-1 \r\nextra"), Some("job-1"));
        assert_eq!(first_line("\n"), None);
        assert_eq!(first_line(""), None);
    }

    #[test]
    fn endpoint_joins_segments_onto_base() {
        let client = ReqwestJobClient::new(ServiceSettings {
            base_url: "http://localhost:9/rest/ncbiblast/".to_string(),
            ..ServiceSettings::default()
        });
        let url = client.endpoint(&["result", "job-1", "xml"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9/rest/ncbiblast/result/job-1/xml");
    }

    #[test]
    fn submission_body_is_form_encoded_in_fixed_order() {
        let client = ReqwestJobClient::new(ServiceSettings {
            email: "someone@example.org".to_string(),
            ..ServiceSettings::default()
        });
        let body = client.submission_body(&QuerySequence::new("Q1", "ACGT"));
        assert_eq!(
            body,
            "sequence=ACGT&program=blastn&database=em_all&stype=dna&email=someone%40example.org"
        );
    }
}
