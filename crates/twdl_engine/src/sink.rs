use std::sync::mpsc;

use twdl_core::StatusUpdate;

/// Receives progress for display; must never block the batch.
pub trait StatusSink: Send + Sync {
    fn emit(&self, update: StatusUpdate);

    fn status(&self, text: String) {
        self.emit(StatusUpdate::Status(text));
    }
}

pub struct ChannelStatusSink {
    tx: mpsc::Sender<StatusUpdate>,
}

impl ChannelStatusSink {
    pub fn new(tx: mpsc::Sender<StatusUpdate>) -> Self {
        Self { tx }
    }
}

impl StatusSink for ChannelStatusSink {
    fn emit(&self, update: StatusUpdate) {
        let _ = self.tx.send(update);
    }
}
