//! Typed request/response channel between the control side and the content view.
//!
//! The control side holds a [`BridgeClient`]. Every request gets a
//! [`CorrelationId`] and a one-shot completion parked in a pending map; the
//! content view answers on a separate channel and a dispatcher task matches
//! answers back to their requests. The two sides share nothing else.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};
use twdl_core::{ProbeOutcome, SessionToken};
use twdl_logging::{twdl_debug, twdl_warn};

use crate::host::PageHost;
use crate::probe::PageProbe;
use crate::DownloadResponse;

const CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewRequest {
    Load { url: String },
    LookupImages { session: SessionToken },
    Download { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewResponse {
    Loaded,
    ImagesFound {
        outcome: ProbeOutcome,
        session: SessionToken,
    },
    Downloaded(DownloadResponse),
    Failed { message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("content view is gone")]
    Disconnected,
    #[error("content view dropped request {0:?}")]
    Dropped(CorrelationId),
    #[error("{0}")]
    View(String),
    #[error("unexpected answer to {request}: {response:?}")]
    Unexpected {
        request: &'static str,
        response: Box<ViewResponse>,
    },
}

type Pending = Arc<Mutex<HashMap<CorrelationId, oneshot::Sender<ViewResponse>>>>;

/// Control-side handle. Cheap to clone; the content view shuts down once
/// every clone is dropped.
#[derive(Clone)]
pub struct BridgeClient {
    requests: mpsc::Sender<(CorrelationId, ViewRequest)>,
    pending: Pending,
    next_id: Arc<AtomicU64>,
}

impl BridgeClient {
    pub async fn request(&self, request: ViewRequest) -> Result<ViewResponse, BridgeError> {
        let id = CorrelationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);

        if self.requests.send((id, request)).await.is_err() {
            self.pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&id);
            return Err(BridgeError::Disconnected);
        }
        rx.await.map_err(|_| BridgeError::Dropped(id))
    }

    pub async fn load(&self, url: &str) -> Result<(), BridgeError> {
        match self.request(ViewRequest::Load { url: url.to_string() }).await? {
            ViewResponse::Loaded => Ok(()),
            ViewResponse::Failed { message } => Err(BridgeError::View(message)),
            other => Err(unexpected("load", other)),
        }
    }

    pub async fn lookup_images(
        &self,
        session: SessionToken,
    ) -> Result<(ProbeOutcome, SessionToken), BridgeError> {
        match self.request(ViewRequest::LookupImages { session }).await? {
            ViewResponse::ImagesFound { outcome, session } => Ok((outcome, session)),
            ViewResponse::Failed { message } => Err(BridgeError::View(message)),
            other => Err(unexpected("lookup-images", other)),
        }
    }

    pub async fn download(&self, url: &str) -> Result<DownloadResponse, BridgeError> {
        match self.request(ViewRequest::Download { url: url.to_string() }).await? {
            ViewResponse::Downloaded(response) => Ok(response),
            ViewResponse::Failed { message } => Err(BridgeError::View(message)),
            other => Err(unexpected("download", other)),
        }
    }
}

fn unexpected(request: &'static str, response: ViewResponse) -> BridgeError {
    BridgeError::Unexpected {
        request,
        response: Box::new(response),
    }
}

/// The content-view end of a bridge: requests come in, answers go out
/// tagged with the request's [`CorrelationId`].
pub struct ViewEndpoint {
    pub requests: mpsc::Receiver<(CorrelationId, ViewRequest)>,
    pub responses: mpsc::Sender<(CorrelationId, ViewResponse)>,
}

/// Open a bridge without a content view attached. Whoever holds the
/// [`ViewEndpoint`] answers the client's requests.
///
/// Must be called from within a tokio runtime.
pub fn open_bridge() -> (BridgeClient, ViewEndpoint) {
    let (request_tx, request_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (response_tx, response_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
    tokio::spawn(dispatch(response_rx, pending.clone()));

    let client = BridgeClient {
        requests: request_tx,
        pending,
        next_id: Arc::new(AtomicU64::new(1)),
    };
    let endpoint = ViewEndpoint {
        requests: request_rx,
        responses: response_tx,
    };
    (client, endpoint)
}

/// Spawn a content view around `host` and return the control-side client.
///
/// Must be called from within a tokio runtime.
pub fn connect<H>(host: H, probe: PageProbe) -> BridgeClient
where
    H: PageHost + 'static,
{
    let (client, endpoint) = open_bridge();
    let view = ContentView { host, probe };
    tokio::spawn(view.serve(endpoint.requests, endpoint.responses));
    client
}

async fn dispatch(
    mut responses: mpsc::Receiver<(CorrelationId, ViewResponse)>,
    pending: Pending,
) {
    while let Some((id, response)) = responses.recv().await {
        let waiter = pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        match waiter {
            Some(tx) => {
                let _ = tx.send(response);
            }
            None => twdl_warn!("dropping answer for unknown request {:?}", id),
        }
    }
    twdl_debug!("content view closed its answer channel");
}

/// The sandboxed side: owns the host and answers one request at a time.
struct ContentView<H> {
    host: H,
    probe: PageProbe,
}

impl<H: PageHost> ContentView<H> {
    async fn serve(
        mut self,
        mut requests: mpsc::Receiver<(CorrelationId, ViewRequest)>,
        responses: mpsc::Sender<(CorrelationId, ViewResponse)>,
    ) {
        while let Some((id, request)) = requests.recv().await {
            let response = self.handle(request).await;
            if responses.send((id, response)).await.is_err() {
                break;
            }
        }
    }

    async fn handle(&mut self, request: ViewRequest) -> ViewResponse {
        match request {
            ViewRequest::Load { url } => match self.host.load(&url).await {
                Ok(()) => ViewResponse::Loaded,
                Err(err) => ViewResponse::Failed {
                    message: err.to_string(),
                },
            },
            ViewRequest::LookupImages { session } => {
                let rejections = self.host.take_rejections();
                match self.host.document().await {
                    Ok(html) => ViewResponse::ImagesFound {
                        outcome: self.probe.classify(&html, &rejections),
                        session,
                    },
                    // Drained rejections must still reach the control side.
                    Err(err) if !rejections.is_empty() => {
                        twdl_warn!("cannot read the page: {}", err);
                        ViewResponse::ImagesFound {
                            outcome: self.probe.classify("", &rejections),
                            session,
                        }
                    }
                    Err(err) => ViewResponse::Failed {
                        message: err.to_string(),
                    },
                }
            }
            ViewRequest::Download { url } => ViewResponse::Downloaded(self.host.fetch(&url).await),
        }
    }
}
