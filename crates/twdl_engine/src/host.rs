use std::time::Duration;

use futures_util::StreamExt;
use twdl_core::{HttpStatus, WebViewSettings};
use twdl_logging::{twdl_debug, twdl_warn};

use crate::{DownloadResponse, HostError};

/// The isolated browsing context that tweet pages are loaded into.
///
/// Only the content-view task owns a host; the control side reaches it
/// through [`crate::BridgeClient`].
#[async_trait::async_trait]
pub trait PageHost: Send {
    /// Navigate to `url`, replacing the current document.
    async fn load(&mut self, url: &str) -> Result<(), HostError>;

    /// The current document as HTML.
    async fn document(&mut self) -> Result<String, HostError>;

    /// Drain failures the page context raised since the last call.
    fn take_rejections(&mut self) -> Vec<String>;

    /// Fetch a resource within the page's session (cookies included).
    async fn fetch(&mut self, url: &str) -> DownloadResponse;
}

#[derive(Debug, Clone)]
pub struct HostSettings {
    /// Base URL of a headless-browser service with a `/content` endpoint.
    /// When absent, pages are fetched directly.
    pub renderer_url: Option<String>,
    pub renderer_token: Option<String>,
    pub user_agent: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            renderer_url: None,
            renderer_token: None,
            user_agent: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 64 * 1024 * 1024,
        }
    }
}

impl From<&WebViewSettings> for HostSettings {
    fn from(webview: &WebViewSettings) -> Self {
        Self {
            renderer_url: webview.renderer_url.clone(),
            renderer_token: webview.renderer_token.clone(),
            user_agent: webview.user_agent.clone(),
            request_timeout: webview.request_timeout(),
            ..Self::default()
        }
    }
}

/// A [`PageHost`] backed by one cookie-keeping HTTP client.
///
/// A transport failure while loading fails that load only, so the batch logs
/// the URL and moves on. An error status leaves an empty document and the
/// probe keeps asking to retry until the lookup times out. There is no script
/// context, so nothing is ever rejected.
pub struct HttpPageHost {
    client: reqwest::Client,
    settings: HostSettings,
    document: String,
}

impl HttpPageHost {
    pub fn new(settings: HostSettings) -> Result<Self, HostError> {
        let mut builder = reqwest::Client::builder()
            .cookie_store(true)
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout);
        if let Some(agent) = settings.user_agent.as_deref() {
            builder = builder.user_agent(agent);
        }
        let client = builder
            .build()
            .map_err(|err| HostError::Network(err.to_string()))?;
        Ok(Self {
            client,
            settings,
            document: String::new(),
        })
    }

    async fn render(&self, url: &str) -> Result<String, HostError> {
        let parsed = reqwest::Url::parse(url).map_err(|err| HostError::InvalidUrl {
            url: url.to_string(),
            message: err.to_string(),
        })?;

        let request = match self.settings.renderer_url.as_deref() {
            Some(base) => {
                let mut endpoint = format!("{}/content", base.trim_end_matches('/'));
                if let Some(token) = self.settings.renderer_token.as_deref() {
                    endpoint.push_str(&format!("?token={token}"));
                }
                self.client
                    .post(endpoint)
                    .json(&serde_json::json!({ "url": parsed.as_str() }))
            }
            None => self.client.get(parsed),
        };

        let response = request
            .send()
            .await
            .map_err(|err| map_reqwest_error(url, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(HostError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response
            .bytes()
            .await
            .map_err(|err| map_reqwest_error(url, err))?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

#[async_trait::async_trait]
impl PageHost for HttpPageHost {
    async fn load(&mut self, url: &str) -> Result<(), HostError> {
        self.document.clear();
        match self.render(url).await {
            Ok(html) => {
                twdl_debug!("loaded {} ({} bytes)", url, html.len());
                self.document = html;
                Ok(())
            }
            Err(err @ HostError::Status { .. }) => {
                twdl_warn!("page load: {}", err);
                Ok(())
            }
            Err(err) => {
                twdl_warn!("cannot load {}: {}", url, err);
                Err(err)
            }
        }
    }

    async fn document(&mut self) -> Result<String, HostError> {
        Ok(self.document.clone())
    }

    fn take_rejections(&mut self) -> Vec<String> {
        Vec::new()
    }

    async fn fetch(&mut self, url: &str) -> DownloadResponse {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(err) => return DownloadResponse::failed(url, map_reqwest_error(url, err).to_string()),
        };
        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or("").to_string();
        if status.as_u16() != 200 {
            return DownloadResponse {
                url: url.to_string(),
                status: HttpStatus::Code(status.as_u16()),
                status_text,
                data: None,
            };
        }

        let mut data = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    return DownloadResponse::failed(url, map_reqwest_error(url, err).to_string())
                }
            };
            if data.len() as u64 + chunk.len() as u64 > self.settings.max_bytes {
                return DownloadResponse::failed(
                    url,
                    format!("response larger than {} bytes", self.settings.max_bytes),
                );
            }
            data.extend_from_slice(&chunk);
        }

        DownloadResponse {
            url: url.to_string(),
            status: HttpStatus::Code(200),
            status_text,
            data: Some(data),
        }
    }
}

fn map_reqwest_error(url: &str, err: reqwest::Error) -> HostError {
    if err.is_timeout() {
        return HostError::Timeout(url.to_string());
    }
    HostError::Network(err.to_string())
}
