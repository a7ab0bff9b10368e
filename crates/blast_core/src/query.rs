/// The nucleotide sequence submitted for one run, with the identifier every
/// output row is tagged with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySequence {
    pub id: String,
    pub residues: String,
}

impl QuerySequence {
    pub fn new(id: impl Into<String>, residues: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            residues: residues.into(),
        }
    }
}
