// ── Client facade ──
//
// Wires the transport to the reactive layer: the status stream feeds the
// connectivity gate, the gate drives the pattern store, and the model
// stream feeds the file collection and its status filter.

use std::sync::Arc;

use syncline_api::{EventStreamClient, EventStreamHandle, HttpDispatcher, Reaction};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::connectivity::{ConnectivityGate, StatusStreamHandler};
use crate::error::CoreError;
use crate::messages::{English, Localize};
use crate::model::{AutoQueuePattern, ViewFile};
use crate::store::{ModelStreamHandler, StreamedCollection, SyncedCollectionStore};
use crate::view::DerivedFilterView;

/// The auto-queue pattern store used by [`SyncClient`].
pub type PatternStore = SyncedCollectionStore<AutoQueuePattern, Arc<HttpDispatcher>>;

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<SyncClientInner>`. Construction wires the
/// stores together; [`connect()`](Self::connect) opens the event streams
/// and [`disconnect()`](Self::disconnect) closes them again.
#[derive(Clone)]
pub struct SyncClient {
    inner: Arc<SyncClientInner>,
}

struct SyncClientInner {
    config: ClientConfig,
    messages: Arc<dyn Localize>,
    dispatcher: Arc<HttpDispatcher>,
    gate: Arc<ConnectivityGate>,
    patterns: Arc<PatternStore>,
    files: Arc<StreamedCollection<ViewFile>>,
    status_filter: DerivedFilterView<ViewFile>,
    session: Mutex<Option<Session>>,
}

/// Everything started by one `connect()`.
struct Session {
    cancel: CancellationToken,
    streams: Vec<EventStreamHandle>,
    tasks: Vec<JoinHandle<()>>,
}

impl SyncClient {
    /// Create a client with English messages. Does NOT connect.
    pub fn new(config: ClientConfig) -> Result<Self, CoreError> {
        Self::with_messages(config, Arc::new(English))
    }

    /// Create a client that surfaces text from `messages`.
    pub fn with_messages(
        config: ClientConfig,
        messages: Arc<dyn Localize>,
    ) -> Result<Self, CoreError> {
        let dispatcher = Arc::new(HttpDispatcher::new(config.url.clone(), &config.transport())?);

        let patterns = Arc::new(
            SyncedCollectionStore::new(
                Arc::clone(&dispatcher),
                config.endpoints.autoqueue.clone(),
                "pattern",
            )
            .with_messages(Arc::clone(&messages)),
        );
        let files = Arc::new(StreamedCollection::new());
        let status_filter = DerivedFilterView::new(Arc::clone(&files));

        Ok(Self {
            inner: Arc::new(SyncClientInner {
                config,
                messages,
                dispatcher,
                gate: Arc::new(ConnectivityGate::new()),
                patterns,
                files,
                status_filter,
                session: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn connectivity(&self) -> &Arc<ConnectivityGate> {
        &self.inner.gate
    }

    pub fn patterns(&self) -> &Arc<PatternStore> {
        &self.inner.patterns
    }

    pub fn files(&self) -> &Arc<StreamedCollection<ViewFile>> {
        &self.inner.files
    }

    pub fn status_filter(&self) -> &DerivedFilterView<ViewFile> {
        &self.inner.status_filter
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Open the status and model streams and start tracking connectivity.
    ///
    /// Returns once the background tasks are spawned; the streams connect
    /// (and reconnect) on their own. Calling `connect` twice is a no-op.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let mut session = self.inner.session.lock().await;
        if session.is_some() {
            debug!("client already started");
            return Ok(());
        }

        let config = &self.inner.config;
        let transport = config.transport();
        let cancel = CancellationToken::new();

        let status_url = self.inner.dispatcher.url_for(&config.endpoints.status_stream)?;
        let model_url = self.inner.dispatcher.url_for(&config.endpoints.model_stream)?;

        // Build both clients before spawning either.
        let status_client = EventStreamClient::new(status_url, &transport, config.stream())?;
        let model_client = EventStreamClient::new(model_url, &transport, config.stream())?;

        let status = status_client.open(
            StatusStreamHandler::new(
                Arc::clone(&self.inner.gate),
                Arc::clone(&self.inner.messages),
            ),
            cancel.child_token(),
        );
        let model = model_client.open(
            ModelStreamHandler::new(Arc::clone(&self.inner.files)),
            cancel.child_token(),
        );
        let patterns = self
            .inner
            .patterns
            .attach(&self.inner.gate, cancel.child_token());

        *session = Some(Session {
            cancel,
            streams: vec![status, model],
            tasks: vec![patterns],
        });
        info!(url = %config.url, "client started");
        Ok(())
    }

    /// Close both streams, cancel pending retries, and wait for every
    /// background task. In-flight requests finish; their results are
    /// discarded if stale.
    pub async fn disconnect(&self) {
        let Some(session) = self.inner.session.lock().await.take() else {
            return;
        };
        session.cancel.cancel();

        for stream in session.streams {
            stream.shutdown().await;
        }
        for task in session.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "background task did not exit cleanly");
            }
        }
        debug!("disconnected");
    }

    /// Whether `connect` has run without a matching `disconnect`.
    pub async fn is_started(&self) -> bool {
        self.inner.session.lock().await.is_some()
    }

    // ── Pattern shortcuts ────────────────────────────────────────────

    pub async fn add_pattern(&self, pattern: impl Into<String>) -> Reaction {
        self.inner.patterns.add(AutoQueuePattern::new(pattern)).await
    }

    pub async fn remove_pattern(&self, pattern: impl Into<String>) -> Reaction {
        self.inner
            .patterns
            .remove(&AutoQueuePattern::new(pattern))
            .await
    }
}
