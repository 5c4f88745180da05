use std::fmt;

/// Status column of an error-log row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatus {
    Code(u16),
    /// The request never produced an HTTP status (bridge or transport failure).
    OutOfBand,
}

impl HttpStatus {
    pub fn is_ok(self) -> bool {
        self == HttpStatus::Code(200)
    }
}

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpStatus::Code(code) => write!(f, "{code}"),
            HttpStatus::OutOfBand => f.write_str("-"),
        }
    }
}

/// One media download attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRecord {
    /// Sanitized name the file is (or would have been) written under.
    pub file_name: String,
    pub source_url: String,
    pub download_url: String,
    pub status: HttpStatus,
    pub status_text: String,
    /// Number of bytes written; `None` when nothing was written.
    pub bytes: Option<u64>,
}

/// Running position of a batch. Only ever moves forward.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchContext {
    count: usize,
    index: usize,
    conversation_id: Option<String>,
}

impl BatchContext {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            ..Self::default()
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Number of URLs fully handled so far.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn advance(&mut self) -> usize {
        if self.index < self.count {
            self.index += 1;
        }
        self.index
    }

    /// Record the conversation being walked; returns `true` when it changed.
    pub fn enter_conversation(&mut self, conversation_id: &str) -> bool {
        if self.conversation_id.as_deref() == Some(conversation_id) {
            return false;
        }
        self.conversation_id = Some(conversation_id.to_string());
        true
    }

    pub fn is_complete(&self) -> bool {
        self.index == self.count
    }
}

/// Totals returned when a batch stops.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub count: usize,
    pub processed: usize,
    pub found: usize,
    pub skipped: usize,
    pub timed_out: usize,
    pub downloaded: usize,
    pub download_failures: usize,
    /// Reason the batch was aborted, if it was.
    pub aborted: Option<String>,
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn completed(&self) -> bool {
        self.aborted.is_none() && !self.cancelled && self.processed == self.count
    }
}
