// ── Runtime connection configuration ──
//
// Describes *how* to reach a sync server. Never touches disk: the CLI
// (or any other consumer) builds a `ClientConfig` and hands it in.

use std::time::Duration;

use syncline_api::{StreamConfig, TlsMode, TransportConfig};
use url::Url;

use crate::store::CollectionEndpoints;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed certs).
    DangerAcceptInvalid,
}

/// Server paths used by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoints {
    pub status_stream: String,
    pub model_stream: String,
    pub autoqueue: CollectionEndpoints,
}

impl Default for ServerEndpoints {
    fn default() -> Self {
        Self {
            status_stream: "/server/status-stream".into(),
            model_stream: "/server/stream".into(),
            autoqueue: CollectionEndpoints::autoqueue(),
        }
    }
}

/// Configuration for talking to a single server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL (e.g., `http://localhost:8800`).
    pub url: Url,
    pub tls: TlsVerification,
    /// Timeout for request/response calls. Streams have none.
    pub timeout: Duration,
    /// Constant delay before reconnecting a dropped event stream.
    pub stream_retry_interval: Duration,
    pub endpoints: ServerEndpoints,
}

impl ClientConfig {
    /// Defaults for a server at `url`.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            stream_retry_interval: syncline_api::stream::DEFAULT_RETRY_INTERVAL,
            endpoints: ServerEndpoints::default(),
        }
    }

    /// Transport settings for building request or stream clients.
    pub fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
            ..TransportConfig::default()
        }
    }

    pub fn stream(&self) -> StreamConfig {
        StreamConfig {
            retry_interval: self.stream_retry_interval,
        }
    }
}
