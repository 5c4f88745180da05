use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Persisted application settings (`twdl.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub destination_directory: PathBuf,
    pub timer: TimerSettings,
    pub webview: WebViewSettings,
    pub range: DateRange,
    pub development_mode: bool,
    /// Keys this version does not know about; written back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            destination_directory: PathBuf::from("."),
            timer: TimerSettings::default(),
            webview: WebViewSettings::default(),
            range: DateRange::default(),
            development_mode: false,
            extra: Map::new(),
        }
    }
}

/// What a rendered page with no media means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyManifestPolicy {
    /// Keep polling until media shows up or the lookup times out.
    #[default]
    Retry,
    /// Report zero media and move on.
    Accept,
}

/// Polling timers, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimerSettings {
    pub initial_delay: u64,
    pub period: u64,
    pub timeout: u64,
    pub empty_manifest: EmptyManifestPolicy,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            initial_delay: 100,
            period: 125,
            timeout: 5000,
            empty_manifest: EmptyManifestPolicy::Retry,
        }
    }
}

impl TimerSettings {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay)
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}

/// Settings for the content view that loads tweet pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebViewSettings {
    /// Base URL of a headless-browser service exposing `/content`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renderer_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renderer_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Per-request timeout in milliseconds.
    pub request_timeout: u64,
}

impl Default for WebViewSettings {
    fn default() -> Self {
        Self {
            renderer_url: None,
            renderer_token: None,
            user_agent: None,
            request_timeout: 30_000,
        }
    }
}

impl WebViewSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }
}

/// Date bounds for archive selection, kept as the user typed them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<String>,
}

impl DateRange {
    pub fn since(&self) -> Option<DateTime<Utc>> {
        self.since.as_deref().and_then(parse_date_bound)
    }

    pub fn until(&self) -> Option<DateTime<Utc>> {
        self.until.as_deref().and_then(parse_date_bound)
    }
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` (UTC) or a bare date.
fn parse_date_bound(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
