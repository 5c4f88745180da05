#![deny(missing_docs)]
//! Shared logging utilities for the twdl workspace.
//!
//! This crate provides the `twdl_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. While a batch is
//! running, every line is prefixed with the batch position (`[index/count]`).

use std::sync::atomic::{AtomicU64, Ordering};

/// Sentinel meaning "no batch in progress".
const NO_BATCH: u64 = u64::MAX;

static BATCH_INDEX: AtomicU64 = AtomicU64::new(NO_BATCH);
static BATCH_COUNT: AtomicU64 = AtomicU64::new(0);

/// Publishes the current batch position.
/// The batch walker calls this whenever its index moves.
pub fn set_batch_position(index: u64, count: u64) {
    BATCH_COUNT.store(count, Ordering::Relaxed);
    BATCH_INDEX.store(index, Ordering::Relaxed);
}

/// Clears the batch position once a batch has finished.
pub fn clear_batch_position() {
    BATCH_INDEX.store(NO_BATCH, Ordering::Relaxed);
}

/// Retrieves the published batch position, if a batch is running.
pub fn batch_position() -> Option<(u64, u64)> {
    let index = BATCH_INDEX.load(Ordering::Relaxed);
    if index == NO_BATCH {
        None
    } else {
        Some((index, BATCH_COUNT.load(Ordering::Relaxed)))
    }
}

/// Formats the position prefix for log lines (empty outside a batch).
#[doc(hidden)]
pub fn position_prefix() -> String {
    match batch_position() {
        Some((index, count)) => format!("[{index}/{count}] "),
        None => String::new(),
    }
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! twdl_trace {
    ($($arg:tt)*) => {{
        log::trace!("{}{}", $crate::position_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! twdl_info {
    ($($arg:tt)*) => {{
        log::info!("{}{}", $crate::position_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! twdl_debug {
    ($($arg:tt)*) => {{
        log::debug!("{}{}", $crate::position_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! twdl_warn {
    ($($arg:tt)*) => {{
        log::warn!("{}{}", $crate::position_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! twdl_error {
    ($($arg:tt)*) => {{
        log::error!("{}{}", $crate::position_prefix(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
