/// Characters left over from the attribute markup that never belong in output.
const MARKUP_PUNCTUATION: [char; 3] = ['"', '<', '>'];

pub const FIELD_SEPARATOR: char = '\t';

/// One hit, assembled field by field from the result markup.
///
/// Fields hold the raw substrings cut from the stream, markup punctuation
/// included. [`HitRecord::to_line`] produces the cleaned output row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HitRecord {
    pub query_id: String,
    pub query_start: String,
    pub query_end: String,
    pub accession: String,
    pub match_start: String,
    pub match_end: String,
    pub description: String,
    pub score: String,
}

impl HitRecord {
    /// An empty record seeded with the run's query identifier.
    pub fn seeded(query_id: &str) -> Self {
        Self {
            query_id: query_id.to_string(),
            ..Self::default()
        }
    }

    /// Fields in output column order.
    pub fn fields(&self) -> [&str; 8] {
        [
            &self.query_id,
            &self.query_start,
            &self.query_end,
            &self.accession,
            &self.match_start,
            &self.match_end,
            &self.description,
            &self.score,
        ]
    }

    /// Joins the fields with tabs, strips quote and angle-bracket characters
    /// from the joined text and trims the ends.
    ///
    /// Trimming applies to the whole row, so trailing empty fields lose their
    /// separators while inner whitespace in the description is kept.
    pub fn to_line(&self) -> String {
        let mut joined = String::new();
        for field in self.fields() {
            joined.push_str(field);
            joined.push(FIELD_SEPARATOR);
        }
        joined.retain(|c| !MARKUP_PUNCTUATION.contains(&c));
        joined.trim().to_string()
    }
}
