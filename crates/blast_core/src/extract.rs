//! Line-oriented recovery of hit records from the XML result stream.
//!
//! The result document is not parsed as XML. Each line is tested against a
//! fixed set of substrings and the wanted values are cut out between known
//! attribute markers. Attributes on a triggering line must appear in the
//! documented left-to-right order (`id=`, `ac=`, `description=` on a hit line;
//! `start=`, `end=`, `">` on a span line). Each marker is searched for after
//! the end of the previous one, so out-of-order attributes are reported as
//! missing markers rather than producing crossed offsets.

use std::fmt;

use blast_logging::{blast_trace, blast_warn};

use crate::record::HitRecord;

const HIT_START: &str = "hit number=";
const SCORE: &str = "<score>";
const QUERY_SPAN: &str = "<querySeq";
const MATCH_SPAN: &str = "<matchSeq";
const HIT_END: &str = "</hit>";

const ID_ATTR: &str = "id=";
const AC_ATTR: &str = "ac=";
const DESCRIPTION_ATTR: &str = "description=";
const START_ATTR: &str = "start=";
const END_ATTR: &str = "end=";
const TAG_CLOSE: &str = "\">";
const SCORE_DIGITS: &str = ">digits<";

/// The kind of line that moved the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    HitStart,
    Score,
    QuerySpan,
    MatchSpan,
    HitEnd,
}

impl Trigger {
    /// Classifies a line. Checked in a fixed order; the first match wins.
    pub fn detect(line: &str) -> Option<Self> {
        if line.contains(HIT_START) {
            Some(Trigger::HitStart)
        } else if line.contains(SCORE) {
            Some(Trigger::Score)
        } else if line.contains(QUERY_SPAN) {
            Some(Trigger::QuerySpan)
        } else if line.contains(MATCH_SPAN) {
            Some(Trigger::MatchSpan)
        } else if line.contains(HIT_END) {
            Some(Trigger::HitEnd)
        } else {
            None
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Trigger::HitStart => "hit",
            Trigger::Score => "score",
            Trigger::QuerySpan => "querySeq",
            Trigger::MatchSpan => "matchSeq",
            Trigger::HitEnd => "hit end",
        };
        f.write_str(name)
    }
}

/// Why a triggering line could not be cut into fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkerError {
    #[error("{trigger} line has no `{marker}` marker")]
    Missing {
        trigger: Trigger,
        marker: &'static str,
    },
    #[error("{trigger} line has no separator before `{marker}`")]
    NoSeparator {
        trigger: Trigger,
        marker: &'static str,
    },
}

/// A triggering line that lacked an expected marker.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed record at line {line_number} (hit #{hit_index}): {cause}")]
pub struct MalformedRecordError {
    /// 1-based line number in the result stream.
    pub line_number: usize,
    /// 0-based index of the hit being assembled when the line was read.
    pub hit_index: usize,
    #[source]
    pub cause: MarkerError,
}

/// What a single line did to the accumulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Ignored,
    Updated(Trigger),
    Completed(HitRecord),
}

/// The in-progress hit.
///
/// No record exists until the first hit-start line is seen. After a hit is
/// completed a fresh record seeded with the query id takes its place.
#[derive(Debug, Clone)]
pub struct HitAccumulator {
    query_id: String,
    current: Option<HitRecord>,
}

impl HitAccumulator {
    pub fn new(query_id: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
            current: None,
        }
    }

    /// The in-progress hit, created on demand.
    pub fn begin(&mut self) -> &mut HitRecord {
        let query_id = &self.query_id;
        self.current
            .get_or_insert_with(|| HitRecord::seeded(query_id))
    }

    pub fn current_mut(&mut self) -> Option<&mut HitRecord> {
        self.current.as_mut()
    }

    /// Hands out the finished hit and re-seeds the accumulator.
    pub fn finish(&mut self) -> Option<HitRecord> {
        let done = self.current.take()?;
        self.current = Some(HitRecord::seeded(&self.query_id));
        Some(done)
    }
}

/// Seam between the record lifecycle and the line recognition strategy.
pub trait LineExtractor {
    fn extract_from(
        &self,
        line: &str,
        accumulator: &mut HitAccumulator,
    ) -> Result<LineOutcome, MarkerError>;
}

/// Marker-trigger extractor for the service's XML output.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkerExtractor;

impl LineExtractor for MarkerExtractor {
    fn extract_from(
        &self,
        line: &str,
        accumulator: &mut HitAccumulator,
    ) -> Result<LineOutcome, MarkerError> {
        let Some(trigger) = Trigger::detect(line) else {
            return Ok(LineOutcome::Ignored);
        };

        match trigger {
            Trigger::HitStart => {
                // Opened before cutting so a damaged hit line still delimits a hit.
                let hit = accumulator.begin();
                let (accession, description) = cut_hit_attributes(line)?;
                hit.accession = accession.to_string();
                hit.description = description.to_string();
            }
            Trigger::HitEnd => {
                return Ok(match accumulator.finish() {
                    Some(hit) => LineOutcome::Completed(hit),
                    None => LineOutcome::Ignored,
                });
            }
            Trigger::Score => {
                let Some(hit) = in_progress(accumulator, trigger) else {
                    return Ok(LineOutcome::Ignored);
                };
                hit.score = cut_score(line)?.to_string();
            }
            Trigger::QuerySpan => {
                let Some(hit) = in_progress(accumulator, trigger) else {
                    return Ok(LineOutcome::Ignored);
                };
                let (start, end) = cut_span(line, trigger)?;
                hit.query_start = start.to_string();
                hit.query_end = end.to_string();
            }
            Trigger::MatchSpan => {
                let Some(hit) = in_progress(accumulator, trigger) else {
                    return Ok(LineOutcome::Ignored);
                };
                let (start, end) = cut_span(line, trigger)?;
                hit.match_start = start.to_string();
                hit.match_end = end.to_string();
            }
        }
        Ok(LineOutcome::Updated(trigger))
    }
}

fn in_progress(accumulator: &mut HitAccumulator, trigger: Trigger) -> Option<&mut HitRecord> {
    let hit = accumulator.current_mut();
    if hit.is_none() {
        blast_trace!("{trigger} line before the first hit, skipped");
    }
    hit
}

/// Byte range of a marker occurrence.
#[derive(Debug, Clone, Copy)]
struct Found {
    start: usize,
    end: usize,
}

fn find_marker(
    line: &str,
    marker: &'static str,
    from: usize,
    trigger: Trigger,
) -> Result<Found, MarkerError> {
    line[from..]
        .find(marker)
        .map(|offset| Found {
            start: from + offset,
            end: from + offset + marker.len(),
        })
        .ok_or(MarkerError::Missing { trigger, marker })
}

/// Slice from `from` up to one character before `marker`.
fn cut_before<'a>(
    line: &'a str,
    from: usize,
    marker: Found,
    name: &'static str,
    trigger: Trigger,
) -> Result<&'a str, MarkerError> {
    let stop = line[..marker.start]
        .char_indices()
        .next_back()
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    if stop < from {
        return Err(MarkerError::NoSeparator {
            trigger,
            marker: name,
        });
    }
    Ok(&line[from..stop])
}

fn cut_hit_attributes(line: &str) -> Result<(&str, &str), MarkerError> {
    let trigger = Trigger::HitStart;
    let id = find_marker(line, ID_ATTR, 0, trigger)?;
    let ac = find_marker(line, AC_ATTR, id.end, trigger)?;
    let description = find_marker(line, DESCRIPTION_ATTR, ac.end, trigger)?;
    let accession = cut_before(line, id.end, ac, AC_ATTR, trigger)?;
    Ok((accession, &line[description.end..]))
}

fn cut_span(line: &str, trigger: Trigger) -> Result<(&str, &str), MarkerError> {
    let start = find_marker(line, START_ATTR, 0, trigger)?;
    let end = find_marker(line, END_ATTR, start.end, trigger)?;
    let close = find_marker(line, TAG_CLOSE, end.end, trigger)?;
    let from = cut_before(line, start.end, end, END_ATTR, trigger)?;
    Ok((from, &line[end.end..close.start]))
}

/// First `>` digit-run `<` in the line, delimiters included.
fn cut_score(line: &str) -> Result<&str, MarkerError> {
    let bytes = line.as_bytes();
    for (open, _) in line.match_indices('>') {
        let digits = bytes[open + 1..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let close = open + 1 + digits;
        if digits > 0 && bytes.get(close) == Some(&b'<') {
            return Ok(&line[open..=close]);
        }
    }
    Err(MarkerError::Missing {
        trigger: Trigger::Score,
        marker: SCORE_DIGITS,
    })
}

/// Everything recovered from one result stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractionReport {
    pub records: Vec<HitRecord>,
    pub malformed: Vec<MalformedRecordError>,
    pub lines_read: usize,
}

impl ExtractionReport {
    /// Cleaned, tab-separated output rows in stream order.
    pub fn lines(&self) -> Vec<String> {
        self.records.iter().map(HitRecord::to_line).collect()
    }
}

/// Feeds lines one at a time through a [`LineExtractor`] and collects the
/// completed hits.
///
/// A malformed line is returned to the caller and also kept in the final
/// report; the extractor stays usable for the lines that follow.
#[derive(Debug)]
pub struct HitExtractor<E = MarkerExtractor> {
    extractor: E,
    accumulator: HitAccumulator,
    report: ExtractionReport,
}

impl HitExtractor<MarkerExtractor> {
    pub fn new(query_id: impl Into<String>) -> Self {
        Self::with_extractor(query_id, MarkerExtractor)
    }
}

impl<E: LineExtractor> HitExtractor<E> {
    pub fn with_extractor(query_id: impl Into<String>, extractor: E) -> Self {
        Self {
            extractor,
            accumulator: HitAccumulator::new(query_id),
            report: ExtractionReport::default(),
        }
    }

    pub fn push_line(&mut self, line: &str) -> Result<LineOutcome, MalformedRecordError> {
        self.report.lines_read += 1;
        match self.extractor.extract_from(line, &mut self.accumulator) {
            Ok(LineOutcome::Completed(hit)) => {
                blast_trace!(
                    "hit #{} complete at line {}",
                    self.report.records.len(),
                    self.report.lines_read
                );
                self.report.records.push(hit.clone());
                Ok(LineOutcome::Completed(hit))
            }
            Ok(outcome) => Ok(outcome),
            Err(cause) => {
                let err = MalformedRecordError {
                    line_number: self.report.lines_read,
                    hit_index: self.report.records.len(),
                    cause,
                };
                blast_warn!("{err}");
                self.report.malformed.push(err.clone());
                Err(err)
            }
        }
    }

    pub fn finish(self) -> ExtractionReport {
        self.report
    }
}

/// Runs a fresh [`HitExtractor`] over an in-memory sequence of lines.
pub fn extract_lines<I, S>(query_id: &str, lines: I) -> ExtractionReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut extractor = HitExtractor::new(query_id);
    for line in lines {
        // Malformed lines are kept in the report.
        let _ = extractor.push_line(line.as_ref());
    }
    extractor.finish()
}
