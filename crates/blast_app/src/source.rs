//! Where the query sequence comes from: a FASTA file, command-line flags, or
//! prompts on the terminal.

use std::fs::File;
use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{bail, Context};
use bio::io::fasta;
use blast_core::QuerySequence;
use blast_logging::{blast_info, blast_warn};

/// First record of a FASTA file. Any further records are ignored.
pub fn first_fasta_record(path: &Path) -> anyhow::Result<QuerySequence> {
    let file =
        File::open(path).with_context(|| format!("opening FASTA file {}", path.display()))?;
    let mut records = fasta::Reader::new(file).records();
    let record = records
        .next()
        .with_context(|| format!("{} contains no FASTA records", path.display()))?
        .with_context(|| format!("reading FASTA file {}", path.display()))?;
    if records.next().is_some() {
        blast_warn!(
            "{} holds more than one record, only `{}` is searched",
            path.display(),
            record.id()
        );
    }

    let residues = String::from_utf8_lossy(record.seq()).into_owned();
    validated(record.id().to_string(), residues)
}

/// Builds the query from flags, prompting on `output` and reading from
/// `input` for whatever was not given.
pub fn from_flags_or_prompt<R, W>(
    id: Option<String>,
    sequence: Option<String>,
    input: &mut R,
    output: &mut W,
) -> anyhow::Result<QuerySequence>
where
    R: BufRead,
    W: Write,
{
    let id = match id {
        Some(id) => id,
        None => prompt(input, output, "Please manually enter ID.")?,
    };
    let sequence = match sequence {
        Some(sequence) => sequence,
        None => prompt(input, output, "Please manually enter sequence.")?,
    };
    validated(id, sequence)
}

fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    message: &str,
) -> anyhow::Result<String> {
    writeln!(output, "{message}")?;
    output.flush()?;
    let mut line = String::new();
    let read = input.read_line(&mut line).context("reading from standard input")?;
    if read == 0 {
        bail!("standard input closed before a value was entered");
    }
    Ok(line.trim().to_string())
}

/// Trims the id, drops whitespace inside the sequence and rejects empty
/// values.
fn validated(id: String, sequence: String) -> anyhow::Result<QuerySequence> {
    let id = id.trim().to_string();
    if id.is_empty() {
        bail!("sequence id is empty");
    }
    let residues: String = sequence.split_whitespace().collect();
    if residues.is_empty() {
        bail!("sequence `{id}` has no residues");
    }
    blast_info!("query {id}, {} residues", residues.len());
    Ok(QuerySequence::new(id, residues))
}
