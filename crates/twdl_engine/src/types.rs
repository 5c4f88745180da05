use twdl_core::{ArchiveError, HttpStatus};

use crate::bridge::BridgeError;
use crate::error_log::ErrorLogError;
use crate::persist::PersistError;

/// Result of fetching one binary resource through the content view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResponse {
    pub url: String,
    pub status: HttpStatus,
    pub status_text: String,
    /// Body, present only for a 200 response.
    pub data: Option<Vec<u8>>,
}

impl DownloadResponse {
    pub fn ok(url: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            url: url.into(),
            status: HttpStatus::Code(200),
            status_text: "OK".to_string(),
            data: Some(data),
        }
    }

    /// A request that never got an HTTP status.
    pub fn failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: HttpStatus::OutOfBand,
            status_text: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("invalid url {url}: {message}")]
    InvalidUrl { url: String, message: String },
    #[error("{url} answered {status}")]
    Status { url: String, status: u16 },
    #[error("timeout while loading {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    Network(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("content view: {0}")]
    Bridge(#[from] BridgeError),
    #[error("error log: {0}")]
    ErrorLog(#[from] ErrorLogError),
    #[error("persist: {0}")]
    Persist(#[from] PersistError),
    #[error("archive: {0}")]
    Archive(#[from] ArchiveError),
}
