// ── Core error types ──
//
// User-facing errors from syncline-core. Transport detail (HTTP status,
// decoder failures) is folded into domain variants by the
// `From<syncline_api::Error>` impl.

use syncline_api::Reaction;
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to server at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Server disconnected")]
    Disconnected,

    #[error("Request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Entity not found: {entity_type} '{identifier}'")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("Malformed server payload: {message}")]
    Decode { message: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation rejected: {message}")]
    Rejected { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::Disconnected | Self::Timeout
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<syncline_api::Error> for CoreError {
    fn from(err: syncline_api::Error) -> Self {
        match err {
            syncline_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            syncline_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            syncline_api::Error::Status { status: 404, body } => CoreError::NotFound {
                entity_type: "resource".into(),
                identifier: body,
            },
            syncline_api::Error::Status { status, body } => CoreError::Api {
                message: if body.trim().is_empty() {
                    format!("HTTP {status}")
                } else {
                    body
                },
                status: Some(status),
            },
            syncline_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            syncline_api::Error::NotEventStream { content_type } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!(
                    "endpoint is not an event stream (content-type {})",
                    content_type.as_deref().unwrap_or("<none>")
                ),
            },
            syncline_api::Error::StreamEnded => CoreError::Disconnected,
            syncline_api::Error::Decode(message) => CoreError::Decode { message },
            syncline_api::Error::Deserialization { message, body: _ } => {
                CoreError::Decode { message }
            }
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Decode {
            message: err.to_string(),
        }
    }
}

// ── Reaction helpers ─────────────────────────────────────────────────

/// `?`-friendly view of a [`Reaction`].
pub trait ReactionExt {
    /// `Ok(data)` on success, [`CoreError::Rejected`] otherwise.
    fn into_result(self) -> Result<Option<String>, CoreError>;
}

impl ReactionExt for Reaction {
    fn into_result(self) -> Result<Option<String>, CoreError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(CoreError::Rejected {
                message: self.message.unwrap_or_default(),
            })
        }
    }
}
