//! Server-Sent Events stream with auto-reconnect.
//!
//! Opens a long-lived `text/event-stream` connection to a named endpoint,
//! decodes tagged events, and hands each one to a [`StreamHandler`] in
//! arrival order. Any transport failure -- including the server ending the
//! response -- closes the connection, reports the failure once through
//! [`StreamHandler::on_error`], and schedules a reconnect after a constant
//! interval. The loop runs until the handle is closed.
//!
//! # Example
//!
//! ```rust,ignore
//! use syncline_api::stream::{EventStreamClient, StreamConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let client = EventStreamClient::new(url, &TransportConfig::default(), StreamConfig::default())?;
//! let handle = client.open(MyHandler::default(), CancellationToken::new());
//! // ...
//! handle.close();
//! ```

mod sse;

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

pub use sse::{DEFAULT_TAG, SseDecoder, StreamEvent};

/// Delay between a connection failure and the next attempt.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(3000);

const EVENT_STREAM_MIME: &str = "text/event-stream";

// ── StreamHandler ────────────────────────────────────────────────────

/// Receives everything an event stream produces.
///
/// Callbacks run on the stream's task, in arrival order, and must not block.
pub trait StreamHandler: Send + Sync + 'static {
    /// Called for every decoded event.
    fn on_event(&self, event: &StreamEvent);

    /// Called exactly once per failed connection, before the retry is scheduled.
    fn on_error(&self, error: &Error);

    /// Called when a connection has been established.
    fn on_open(&self) {}
}

impl<H: StreamHandler> StreamHandler for Arc<H> {
    fn on_event(&self, event: &StreamEvent) {
        (**self).on_event(event);
    }

    fn on_error(&self, error: &Error) {
        (**self).on_error(error);
    }

    fn on_open(&self) {
        (**self).on_open();
    }
}

// ── StreamConfig / StreamState ───────────────────────────────────────

/// Reconnect configuration. The interval is constant -- no backoff growth.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub retry_interval: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

/// Lifecycle of an event stream connection.
///
/// `Connecting -> Open -> (ClosedError -> Connecting) | ClosedTerminal`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Connecting,
    Open,
    /// Connection failed; a retry is pending.
    ClosedError,
    /// Closed by the owner; no further reconnects.
    ClosedTerminal,
}

// ── EventStreamClient ────────────────────────────────────────────────

/// Client for a single event stream endpoint.
#[derive(Debug, Clone)]
pub struct EventStreamClient {
    http: reqwest::Client,
    url: Url,
    config: StreamConfig,
}

impl EventStreamClient {
    /// Create a client for `url`, building a timeout-free HTTP client
    /// from the shared transport settings.
    pub fn new(url: Url, transport: &TransportConfig, config: StreamConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_stream_client()?,
            url,
            config,
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, url: Url, config: StreamConfig) -> Self {
        Self { http, url, config }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Spawn the connect/read/reconnect loop and return its handle.
    ///
    /// Returns immediately; the first connection attempt happens on the
    /// background task. Cancelling `cancel` (or calling
    /// [`EventStreamHandle::close`]) stops the loop, including a pending retry.
    pub fn open<H: StreamHandler>(self, handler: H, cancel: CancellationToken) -> EventStreamHandle {
        let (state_tx, state_rx) = watch::channel(StreamState::Connecting);

        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            stream_loop(self, handler, state_tx, task_cancel).await;
        });

        EventStreamHandle {
            state: state_rx,
            cancel,
            task,
        }
    }
}

// ── EventStreamHandle ────────────────────────────────────────────────

/// Handle to a running event stream.
pub struct EventStreamHandle {
    state: watch::Receiver<StreamState>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl EventStreamHandle {
    /// Current lifecycle state.
    pub fn state(&self) -> StreamState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<StreamState> {
        self.state.clone()
    }

    /// Terminate the stream permanently. Idempotent.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Close the stream and wait for the background task to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "event stream task did not exit cleanly");
        }
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read → on error, notify, wait → reconnect.
async fn stream_loop<H: StreamHandler>(
    client: EventStreamClient,
    handler: H,
    state_tx: watch::Sender<StreamState>,
    cancel: CancellationToken,
) {
    let retry = client.config.retry_interval;

    loop {
        state_tx.send_replace(StreamState::Connecting);

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_read(&client, &handler, &state_tx, &cancel) => result,
        };

        let Err(e) = result else {
            // Read loop only returns Ok when cancelled.
            break;
        };

        warn!(url = %client.url, error = %e, "event stream error");
        state_tx.send_replace(StreamState::ClosedError);
        handler.on_error(&e);

        debug!(
            delay_ms = u64::try_from(retry.as_millis()).unwrap_or(u64::MAX),
            "waiting before reconnect"
        );
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(retry) => {}
        }
    }

    state_tx.send_replace(StreamState::ClosedTerminal);
    debug!(url = %client.url, "event stream loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish one connection and read events until it drops.
async fn connect_and_read<H: StreamHandler>(
    client: &EventStreamClient,
    handler: &H,
    state_tx: &watch::Sender<StreamState>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    info!(url = %client.url, "connecting to event stream");

    let resp = client
        .http
        .get(client.url.clone())
        .header(ACCEPT, EVENT_STREAM_MIME)
        .header(CACHE_CONTROL, "no-cache")
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Status {
            status: status.as_u16(),
            body,
        });
    }

    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    if !content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with(EVENT_STREAM_MIME))
    {
        return Err(Error::NotEventStream { content_type });
    }

    info!(url = %client.url, "event stream open");
    state_tx.send_replace(StreamState::Open);
    handler.on_open();

    let mut body = resp.bytes_stream();
    let mut decoder = SseDecoder::new();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            chunk = body.next() => match chunk {
                Some(Ok(bytes)) => {
                    for event in decoder.feed(&bytes)? {
                        trace!(tag = %event.tag, "event received");
                        handler.on_event(&event);
                    }
                }
                Some(Err(e)) => return Err(Error::Transport(e)),
                None => return Err(Error::StreamEnded),
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
