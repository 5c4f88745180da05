//! twdl engine: page hosting, the view bridge and the effects of a batch run.
mod bridge;
mod categorize;
mod clock;
mod config_store;
mod download;
mod error_log;
mod filename;
mod host;
mod lookup;
mod persist;
mod probe;
mod sink;
mod types;
mod walker;

pub use bridge::{
    connect, open_bridge, BridgeClient, BridgeError, CorrelationId, ViewEndpoint, ViewRequest,
    ViewResponse,
};
pub use categorize::{
    color_key, CategorizeError, CategorizeSummary, ColorCategorizer, ColorHistogram, ColorStats,
    SINGLETON_BUCKET,
};
pub use clock::{Clock, TokioClock};
pub use config_store::{ConfigError, ConfigStore, CONFIG_FILENAME};
pub use download::DownloadPipeline;
pub use error_log::{CsvErrorLog, ErrorLogError, RowStatus, ERROR_LOG_FILENAME};
pub use filename::sanitize_file_name;
pub use host::{HostSettings, HttpPageHost, PageHost};
pub use lookup::lookup;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use probe::{PageProbe, ProbeInput, ProbeRule, TWEET_PAGE_RULES};
pub use sink::{ChannelStatusSink, StatusSink};
pub use types::{DownloadResponse, EngineError, HostError};
pub use walker::{BatchWalker, WalkerSettings};
