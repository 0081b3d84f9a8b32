// ── Connectivity gate ──
//
// Derives a single boolean "connected" signal from the server's status
// stream and notifies listeners on transitions only. Everything that
// must reset on disconnect hangs off this gate.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use syncline_api::{Error, StreamEvent, StreamHandler};
use tracing::{debug, info, warn};

use crate::messages::{Localize, MessageKey};
use crate::observable::{Broadcaster, ListenerGuard, Subscription};

/// Event tag carried by status stream events.
pub const STATUS_TAG: &str = "status";

/// Observable connectivity snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectivityState {
    pub connected: bool,
    /// Reason for the last disconnect, if any.
    pub error_message: Option<String>,
    /// When `connected` last flipped. `None` until the first transition.
    pub changed_at: Option<DateTime<Utc>>,
}

impl Default for ConnectivityState {
    fn default() -> Self {
        Self {
            connected: true,
            error_message: None,
            changed_at: None,
        }
    }
}

/// Wire payload of a `status` event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerStatus {
    pub up: bool,
    #[serde(default)]
    pub error_msg: Option<String>,
}

/// Boolean connectivity signal with transition-only notifications.
///
/// Starts optimistic (connected). Repeated reports of the same `up`
/// value are coalesced: the stored error message is refreshed, but no
/// listener runs and no subscriber wakes.
pub struct ConnectivityGate {
    state: Broadcaster<ConnectivityState>,
}

impl ConnectivityGate {
    pub fn new() -> Self {
        Self {
            state: Broadcaster::new(ConnectivityState::default()),
        }
    }

    /// Record a status report. Returns `true` if `connected` flipped.
    pub fn report(&self, up: bool, error_message: Option<String>) -> bool {
        let changed = self.state.publish_if(|state| {
            let flipped = state.connected != up;
            state.error_message = if up { None } else { error_message };
            if flipped {
                state.connected = up;
                state.changed_at = Some(Utc::now());
            }
            flipped
        });

        if changed {
            if up {
                info!("server connection restored");
            } else {
                info!(reason = ?self.state.current().error_message, "server connection lost");
            }
        } else {
            debug!(up, "duplicate connectivity report coalesced");
        }
        changed
    }

    /// Record a decoded `status` event.
    pub fn report_status(&self, status: ServerStatus) -> bool {
        self.report(status.up, status.error_msg)
    }

    pub fn is_connected(&self) -> bool {
        self.state.current().connected
    }

    pub fn current(&self) -> ConnectivityState {
        self.state.current()
    }

    pub fn subscribe(&self) -> Subscription<ConnectivityState> {
        self.state.subscribe()
    }

    /// Run `listener` synchronously on every transition.
    pub fn listen(
        &self,
        listener: impl Fn(&ConnectivityState) + Send + Sync + 'static,
    ) -> ListenerGuard {
        self.state.listen(listener)
    }
}

impl Default for ConnectivityGate {
    fn default() -> Self {
        Self::new()
    }
}

// ── StatusStreamHandler ──────────────────────────────────────────────

/// Feeds the status event stream into a [`ConnectivityGate`].
pub struct StatusStreamHandler {
    gate: Arc<ConnectivityGate>,
    messages: Arc<dyn Localize>,
}

impl StatusStreamHandler {
    pub fn new(gate: Arc<ConnectivityGate>, messages: Arc<dyn Localize>) -> Self {
        Self { gate, messages }
    }

    /// Report `event` to the gate. Returns `false` for events that carry
    /// no status.
    pub fn apply(&self, event: &StreamEvent) -> bool {
        if event.tag != STATUS_TAG {
            debug!(tag = %event.tag, "ignoring non-status event");
            return false;
        }
        match serde_json::from_str::<ServerStatus>(&event.data) {
            Ok(status) => {
                self.gate.report_status(status);
                true
            }
            Err(e) => {
                warn!(error = %e, data = %event.data, "malformed status event");
                false
            }
        }
    }
}

impl StreamHandler for StatusStreamHandler {
    fn on_event(&self, event: &StreamEvent) {
        self.apply(event);
    }

    fn on_error(&self, _error: &Error) {
        let message = self.messages.message(MessageKey::ServerDisconnected, &[]);
        self.gate.report(false, Some(message));
    }
}
