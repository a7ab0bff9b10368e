use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.ebi.ac.uk/Tools/services/rest/ncbiblast";

/// Connection and search parameters for the job dispatcher service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub base_url: String,
    /// Search program, `blastn` for nucleotide searches.
    pub program: String,
    /// Target database set.
    pub database: String,
    pub stype: String,
    /// Contact address the service requires with every submission.
    pub email: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            program: "blastn".to_string(),
            database: "em_all".to_string(),
            stype: "dna".to_string(),
            email: String::new(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
        }
    }
}
