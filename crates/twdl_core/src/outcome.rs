use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    /// The attribute value the item was derived from.
    pub source_url: String,
    pub download_url: String,
    pub kind: MediaKind,
    /// Accessibility label of a video element, if any.
    pub label: Option<String>,
}

/// Media discovered on one tweet page, keyed by derived file name.
///
/// Insertion order is kept; the first item inserted under a name wins.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Manifest {
    items: Vec<(String, MediaItem)>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` (and keeps the existing item) when the name is taken.
    pub fn insert(&mut self, file_name: impl Into<String>, item: MediaItem) -> bool {
        let file_name = file_name.into();
        if self.contains(&file_name) {
            return false;
        }
        self.items.push((file_name, item));
        true
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.items.iter().any(|(name, _)| name == file_name)
    }

    pub fn get(&self, file_name: &str) -> Option<&MediaItem> {
        self.items
            .iter()
            .find(|(name, _)| name == file_name)
            .map(|(_, item)| item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MediaItem)> {
        self.items.iter().map(|(name, item)| (name.as_str(), item))
    }
}

impl FromIterator<(String, MediaItem)> for Manifest {
    fn from_iter<I: IntoIterator<Item = (String, MediaItem)>>(iter: I) -> Self {
        let mut manifest = Manifest::new();
        for (name, item) in iter {
            manifest.insert(name, item);
        }
        manifest
    }
}

/// Classification of the page currently loaded in the content view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The page or its script context failed; the whole batch must stop.
    Abort { reason: String },
    /// The page shows an explicit error.
    Error { message: String, retry_later: bool },
    /// The page has not settled yet.
    RetryLater { reason: String },
    /// The page rendered; the manifest may be empty.
    Found(Manifest),
}

impl ProbeOutcome {
    /// True when the scheduler should poll again (before considering policy).
    pub fn wants_retry(&self) -> bool {
        matches!(
            self,
            ProbeOutcome::RetryLater { .. } | ProbeOutcome::Error { retry_later: true, .. }
        )
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Abort { reason } => write!(f, "abort: {reason}"),
            ProbeOutcome::Error {
                message,
                retry_later,
            } => write!(f, "error (retry later: {retry_later}): {message}"),
            ProbeOutcome::RetryLater { reason } => write!(f, "retry later: {reason}"),
            ProbeOutcome::Found(manifest) => write!(f, "found {} media item(s)", manifest.len()),
        }
    }
}
