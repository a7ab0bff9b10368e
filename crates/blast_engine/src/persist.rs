use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use blast_logging::blast_info;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::filename::output_filename;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Writes `{dir}/{filename}` through a temp file in the same directory and a
/// rename, so readers never observe a half-written file.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Writes each line followed by a newline.
    pub fn write_lines<S: AsRef<str>>(
        &self,
        filename: &str,
        lines: &[S],
    ) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let tmp = NamedTempFile::new_in(&self.dir)?;
        let mut out = BufWriter::new(tmp);
        for line in lines {
            out.write_all(line.as_ref().as_bytes())?;
            out.write_all(b"\n")?;
        }
        let mut tmp = out.into_inner().map_err(|e| PersistError::Io(e.into_error()))?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        if target.exists() {
            fs::remove_file(&target)?;
        }
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

/// Destination for the finished rows of one run.
pub trait RecordSink: Send + Sync {
    /// Persists `lines` under a name derived from `query_id` and returns the
    /// path written.
    fn write_records(&self, query_id: &str, lines: &[String]) -> Result<PathBuf, PersistError>;
}

/// Writes `<first 8 chars of query id>_Output.txt` into a directory.
#[derive(Debug, Clone)]
pub struct FileRecordSink {
    dir: PathBuf,
}

impl FileRecordSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl RecordSink for FileRecordSink {
    fn write_records(&self, query_id: &str, lines: &[String]) -> Result<PathBuf, PersistError> {
        let filename = output_filename(query_id);
        let path = AtomicFileWriter::new(self.dir.clone()).write_lines(&filename, lines)?;
        blast_info!("wrote {} records to {}", lines.len(), path.display());
        Ok(path)
    }
}
