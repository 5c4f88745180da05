use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, Terminator, WriterBuilder};
use twdl_core::HttpStatus;

pub const ERROR_LOG_FILENAME: &str = "error.csv";

#[derive(Debug, thiserror::Error)]
pub enum ErrorLogError {
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot append to error log: {0}")]
    Write(#[from] csv::Error),
    #[error("cannot flush error log: {0}")]
    Flush(#[from] std::io::Error),
}

/// Status column of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    /// Lookup found media (`+`).
    Found,
    /// Lookup failed (`-`).
    Failed,
    Http(HttpStatus),
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowStatus::Found => f.write_str("+"),
            RowStatus::Failed => f.write_str("-"),
            RowStatus::Http(status) => write!(f, "{status}"),
        }
    }
}

/// Append-only CSV with columns `origin URL, matched URL, status, detail`.
///
/// Every row is written with its own open/append/flush so concurrent readers
/// only ever see whole rows; nothing is rewritten.
#[derive(Debug, Clone)]
pub struct CsvErrorLog {
    path: PathBuf,
}

impl CsvErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_directory(dir: &Path) -> Self {
        Self::new(dir.join(ERROR_LOG_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(
        &self,
        origin: &str,
        matched: &str,
        status: RowStatus,
        detail: &str,
    ) -> Result<(), ErrorLogError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| ErrorLogError::Open {
                path: self.path.clone(),
                source,
            })?;
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .quote_style(QuoteStyle::NonNumeric)
            .terminator(Terminator::CRLF)
            .from_writer(file);
        let status = status.to_string();
        writer.write_record([origin, matched, status.as_str(), detail])?;
        writer.flush()?;
        Ok(())
    }
}
