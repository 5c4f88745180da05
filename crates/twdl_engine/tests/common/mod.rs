#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use twdl_core::{match_tweet_url, StatusUpdate, TargetList, TargetMessage};
use twdl_engine::{DownloadResponse, HostError, PageHost, StatusSink};

/// What the scripted host observed, shared with the test after the host
/// moved into the content view.
#[derive(Debug, Default)]
pub struct HostLog {
    pub loads: Vec<String>,
    pub probes: Vec<tokio::time::Instant>,
    pub fetches: Vec<String>,
}

#[derive(Default)]
struct Page {
    documents: VecDeque<String>,
    rejection: Option<String>,
    load_error: Option<String>,
}

/// A [`PageHost`] serving canned documents. Each probe of a page takes the
/// next queued document; the last one repeats.
#[derive(Default)]
pub struct ScriptedHost {
    pages: HashMap<String, Page>,
    downloads: HashMap<String, DownloadResponse>,
    current: Option<String>,
    rejections: Vec<String>,
    failing_documents: usize,
    log: Arc<Mutex<HostLog>>,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> Arc<Mutex<HostLog>> {
        self.log.clone()
    }

    pub fn page(mut self, url: &str, documents: &[String]) -> Self {
        self.pages.entry(url.to_string()).or_default().documents = documents.iter().cloned().collect();
        self
    }

    /// Loading `url` raises a failure in the page context.
    pub fn rejecting(mut self, url: &str, reason: &str) -> Self {
        self.pages.entry(url.to_string()).or_default().rejection = Some(reason.to_string());
        self
    }

    pub fn failing_load(mut self, url: &str, message: &str) -> Self {
        self.pages.entry(url.to_string()).or_default().load_error = Some(message.to_string());
        self
    }

    /// The next `count` document reads fail as if the page context crashed.
    pub fn failing_documents(mut self, count: usize) -> Self {
        self.failing_documents = count;
        self
    }

    pub fn download(mut self, url: &str, response: DownloadResponse) -> Self {
        self.downloads.insert(url.to_string(), response);
        self
    }
}

#[async_trait::async_trait]
impl PageHost for ScriptedHost {
    async fn load(&mut self, url: &str) -> Result<(), HostError> {
        self.log.lock().unwrap().loads.push(url.to_string());
        self.current = Some(url.to_string());
        if let Some(page) = self.pages.get(url) {
            if let Some(message) = &page.load_error {
                return Err(HostError::InvalidUrl {
                    url: url.to_string(),
                    message: message.clone(),
                });
            }
            if let Some(reason) = &page.rejection {
                self.rejections.push(reason.clone());
            }
        }
        Ok(())
    }

    async fn document(&mut self) -> Result<String, HostError> {
        self.log.lock().unwrap().probes.push(tokio::time::Instant::now());
        if self.failing_documents > 0 {
            self.failing_documents -= 1;
            return Err(HostError::Network("renderer crashed".to_string()));
        }
        let Some(page) = self.current.as_ref().and_then(|url| self.pages.get_mut(url)) else {
            return Ok(String::new());
        };
        let document = if page.documents.len() > 1 {
            page.documents.pop_front()
        } else {
            page.documents.front().cloned()
        };
        Ok(document.unwrap_or_default())
    }

    fn take_rejections(&mut self) -> Vec<String> {
        std::mem::take(&mut self.rejections)
    }

    async fn fetch(&mut self, url: &str) -> DownloadResponse {
        self.log.lock().unwrap().fetches.push(url.to_string());
        self.downloads
            .get(url)
            .cloned()
            .unwrap_or_else(|| DownloadResponse::failed(url, "no canned response"))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    updates: Mutex<Vec<StatusUpdate>>,
}

impl RecordingSink {
    pub fn updates(&self) -> Vec<StatusUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.updates()
            .into_iter()
            .filter_map(|u| match u {
                StatusUpdate::Status(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.updates().into_iter().rev().find_map(|u| match u {
            StatusUpdate::Index(i) => Some(i),
            _ => None,
        })
    }
}

impl StatusSink for RecordingSink {
    fn emit(&self, update: StatusUpdate) {
        self.updates.lock().unwrap().push(update);
    }
}

/// One message per expanded tweet URL, in one conversation.
pub fn targets(expanded: &[&str]) -> TargetList {
    let messages: Vec<TargetMessage> = expanded
        .iter()
        .enumerate()
        .map(|(i, url)| TargetMessage {
            conversation_id: "100-200".to_string(),
            id: format!("{}", 9000 + i),
            sender_id: "100".to_string(),
            recipient_id: "200".to_string(),
            created_at: format!("2023-03-01T10:{i:02}:00.000Z"),
            timestamp: Some(Utc.with_ymd_and_hms(2023, 3, 1, 10, i as u32, 0).unwrap()),
            urls: vec![match_tweet_url(url, &format!("https://t.co/{i}")).unwrap()],
        })
        .collect();
    TargetList {
        count: messages.len(),
        messages,
    }
}

pub fn tweet_page(article: &str) -> String {
    format!(
        r#"<html><body><div id="react-root"><main role="main">
<div data-testid="primaryColumn"><div data-testid="cellInnerDiv"><article>{article}</article></div></div>
</main></div></body></html>"#
    )
}

pub fn image(id: &str, format: &str) -> String {
    format!(r#"<img alt="Image" src="https://pbs.twimg.com/media/{id}?format={format}&amp;name=small">"#)
}

pub fn loading_page() -> String {
    r#"<html><body><div id="react-root"><main role="main">
<div data-testid="primaryColumn"><div role="progressbar" aria-label="Loading timeline"><div><svg><circle cx="16" cy="16" r="14"></circle></svg></div></div></div>
</main></div></body></html>"#
        .to_string()
}

pub fn error_page(message: &str) -> String {
    format!(
        r#"<html><body><div id="react-root"><main role="main">
<div data-testid="primaryColumn"><div data-testid="error-detail"><div><span><span>{message}</span></span></div></div></div>
</main></div></body></html>"#
    )
}
