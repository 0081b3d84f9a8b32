use thiserror::Error;

/// Top-level error type for the `syncline-api` crate.
///
/// Covers every failure mode of the transport layer: HTTP dispatch,
/// URL construction, and the Server-Sent Events stream.
/// `syncline-core` folds these into store-level state transitions.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// TLS or client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Event stream ────────────────────────────────────────────────
    /// The stream endpoint answered, but not with an event stream.
    #[error("Not an event stream (content-type {content_type:?})")]
    NotEventStream { content_type: Option<String> },

    /// The server ended the event stream.
    #[error("Event stream ended by server")]
    StreamEnded,

    /// A frame could not be decoded as UTF-8 text.
    #[error("Event stream decoding error: {0}")]
    Decode(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_body(),
            Self::Status { status, .. } => *status >= 500,
            Self::StreamEnded | Self::Decode(_) => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Status { status: 404, .. } => true,
            _ => false,
        }
    }
}
