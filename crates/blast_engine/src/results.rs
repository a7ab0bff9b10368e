use std::borrow::Cow;
use std::io;

use blast_core::{ExtractionReport, HitExtractor, JobState, SearchJob};
use blast_logging::{blast_debug, blast_warn};
use encoding_rs::UTF_8;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::client::{JobClient, ResultStream};
use crate::{FailureKind, FetchError, TransportError};

/// Opens the result stream of a job that has been observed as finished.
pub async fn open_results(
    client: &dyn JobClient,
    job: &SearchJob,
) -> Result<ResultStream, FetchError> {
    if job.state() != &JobState::Finished {
        return Err(FetchError(TransportError::new(
            FailureKind::NotFinished,
            format!("job {} is {}", job.id(), job.state()),
        )));
    }
    client.open_result_stream(job.id()).await
}

/// The stream broke before it was fully read.
#[derive(Debug)]
pub struct StreamInterrupted {
    /// Hits completed before the failure.
    pub partial: ExtractionReport,
    pub error: io::Error,
}

/// Reads `reader` line by line through a [`HitExtractor`].
///
/// Each line is decoded on its own and bytes that are not valid UTF-8 become
/// U+FFFD, so a damaged line cannot take the rest of the document with it.
/// Only a failing read interrupts extraction.
pub async fn extract_stream<R>(
    mut reader: R,
    query_id: &str,
) -> Result<ExtractionReport, StreamInterrupted>
where
    R: AsyncBufRead + Unpin,
{
    let mut extractor = HitExtractor::new(query_id);
    let mut raw = Vec::new();
    let mut line_number = 0usize;
    let mut lossy_lines = 0usize;
    loop {
        raw.clear();
        match reader.read_until(b'\n', &mut raw).await {
            Ok(0) => break,
            Ok(_) => {
                line_number += 1;
                let (line, had_errors) = decode_line(&raw);
                if had_errors {
                    lossy_lines += 1;
                    blast_debug!("line {line_number} is not valid UTF-8, decoded lossily");
                }
                // Malformed lines are collected in the report.
                let _ = extractor.push_line(&line);
            }
            Err(error) => {
                return Err(StreamInterrupted {
                    partial: extractor.finish(),
                    error,
                });
            }
        }
    }
    let report = extractor.finish();
    if lossy_lines > 0 {
        blast_warn!("{lossy_lines} result lines held invalid UTF-8");
    }
    blast_debug!(
        "read {} lines, {} hits, {} malformed",
        report.lines_read,
        report.records.len(),
        report.malformed.len()
    );
    Ok(report)
}

/// Strips the line ending and decodes the rest as UTF-8 with replacement.
fn decode_line(raw: &[u8]) -> (Cow<'_, str>, bool) {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let (text, had_errors) = UTF_8.decode_without_bom_handling(raw);
    (text, had_errors)
}
