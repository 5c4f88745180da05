use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use twdl_core::{DownloadRecord, HttpStatus, Manifest, StatusUpdate};
use twdl_logging::{twdl_info, twdl_warn};

use crate::bridge::{BridgeClient, BridgeError};
use crate::error_log::{CsvErrorLog, RowStatus};
use crate::filename::sanitize_file_name;
use crate::persist::AtomicFileWriter;
use crate::sink::StatusSink;
use crate::EngineError;

/// Fetches a manifest's media one item at a time through the content view
/// and writes successful bodies into the destination directory.
pub struct DownloadPipeline<'a> {
    bridge: &'a BridgeClient,
    writer: &'a AtomicFileWriter,
    error_log: &'a CsvErrorLog,
    sink: &'a dyn StatusSink,
    cancel: CancellationToken,
}

impl<'a> DownloadPipeline<'a> {
    pub fn new(
        bridge: &'a BridgeClient,
        writer: &'a AtomicFileWriter,
        error_log: &'a CsvErrorLog,
        sink: &'a dyn StatusSink,
    ) -> Self {
        Self {
            bridge,
            writer,
            error_log,
            sink,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop before the next item once `cancel` fires; the item in flight finishes.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// One record (and one error-log row) per attempted item. A sanitized
    /// file name is attempted at most once.
    pub async fn download(&self, manifest: &Manifest) -> Result<Vec<DownloadRecord>, EngineError> {
        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(manifest.len());

        for (name, item) in manifest.iter() {
            if self.cancel.is_cancelled() {
                twdl_info!("download cancelled with {} item(s) left", manifest.len() - records.len());
                break;
            }
            let file_name = sanitize_file_name(name);
            if !seen.insert(file_name.clone()) {
                continue;
            }

            self.sink
                .emit(StatusUpdate::Status(item.download_url.clone()));
            let mut record = DownloadRecord {
                file_name,
                source_url: item.source_url.clone(),
                download_url: item.download_url.clone(),
                status: HttpStatus::OutOfBand,
                status_text: String::new(),
                bytes: None,
            };
            let mut row_status = None;

            match self.bridge.download(&item.download_url).await {
                Ok(response) => {
                    record.status = response.status;
                    record.status_text = response.status_text;
                    match response.data {
                        Some(data) if response.status.is_ok() => {
                            match self.writer.write(&record.file_name, &data) {
                                Ok(path) => {
                                    twdl_info!("saved {}", path.display());
                                    record.bytes = Some(data.len() as u64);
                                }
                                Err(err) => {
                                    twdl_warn!("cannot save {}: {}", record.file_name, err);
                                    record.status_text = format!("write failed: {err}");
                                    row_status = Some(RowStatus::Failed);
                                }
                            }
                        }
                        _ => self.sink.emit(StatusUpdate::Status(format!(
                            "download failed: {} {}",
                            record.status, record.status_text
                        ))),
                    }
                }
                Err(BridgeError::View(message)) => record.status_text = message,
                Err(err) => return Err(err.into()),
            }

            self.error_log.append(
                &record.download_url,
                &record.source_url,
                row_status.unwrap_or(RowStatus::Http(record.status)),
                &record.status_text,
            )?;
            records.push(record);
        }
        Ok(records)
    }
}
