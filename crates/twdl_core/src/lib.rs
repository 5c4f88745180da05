//! twdl core: pure domain model and state machines.
mod archive;
mod batch;
mod config;
mod outcome;
mod scheduler;
mod selection;
mod session;
mod status;
mod tweet;

pub use archive::{
    collect_targets, parse_archive, ArchiveEntry, ArchiveError, ArchiveMessage, ArchiveUrl,
    Conversation, MessageEntry, TargetList, TargetMessage,
};
pub use batch::{BatchContext, BatchSummary, DownloadRecord, HttpStatus};
pub use config::{
    AppConfig, DateRange, EmptyManifestPolicy, TimerSettings, WebViewSettings,
};
pub use outcome::{Manifest, MediaItem, MediaKind, ProbeOutcome};
pub use scheduler::{LookupOutcome, LookupState, Resolution, RetryScheduler, Tick, Verdict};
pub use selection::{render_archive_script, select_by_date_range, SelectionStats};
pub use session::{LookupSession, SessionToken};
pub use status::StatusUpdate;
pub use tweet::{match_tweet_url, TweetUrlReference};
