use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("log file does not exist: {0}")]
    Missing(PathBuf),
}

/// Sequential, one-pass reader over a finished log file.
///
/// Replay never follows a growing file, so there is no rotation handling
/// and no offset checkpointing here.
pub struct LogReader {
    path: PathBuf,
    file: Option<BufReader<File>>,
}

impl LogReader {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn open(&mut self) -> Result<(), ReaderError> {
        if !self.path.exists() {
            return Err(ReaderError::Missing(self.path.clone()));
        }
        self.file = Some(BufReader::new(File::open(&self.path)?));
        Ok(())
    }

    /// Read the next line, with the terminator stripped (handles both
    /// `\n` and `\r\n`). Returns `None` at end of file.
    pub fn next_line(&mut self) -> Result<Option<String>, ReaderError> {
        if self.file.is_none() {
            self.open()?;
        }
        let Some(file) = self.file.as_mut() else {
            return Ok(None);
        };

        let mut line = String::new();
        let bytes_read = file.read_line(&mut line)?;
        if bytes_read == 0 {
            return Ok(None);
        }

        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }

        Ok(Some(line))
    }
}
