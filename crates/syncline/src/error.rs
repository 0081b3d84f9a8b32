//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use syncline_config::ConfigError;
use syncline_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the server at {url}")]
    #[diagnostic(
        code(syncline::connection_failed),
        help(
            "Check that the server is running and reachable.\n\
             Reason: {reason}\n\
             Try: syncline --server <URL> status show"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Server at {url} reports it is down")]
    #[diagnostic(code(syncline::server_down), help("{message}"))]
    ServerDown { url: String, message: String },

    #[error("No response from {url} within {seconds}s")]
    #[diagnostic(
        code(syncline::timeout),
        help("Increase the wait with --wait or check server responsiveness.")
    )]
    Timeout { url: String, seconds: u64 },

    #[error("Request timed out")]
    #[diagnostic(
        code(syncline::request_timeout),
        help("Increase the request timeout with --timeout.")
    )]
    RequestTimedOut,

    // ── Server-side outcomes ─────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(syncline::rejected))]
    Rejected { message: String },

    #[error("{entity_type} '{identifier}' not found")]
    #[diagnostic(code(syncline::not_found))]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("API error: {message}")]
    #[diagnostic(code(syncline::api_error))]
    Api { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(syncline::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(syncline::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: syncline config add {name} --server <URL>"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(syncline::config))]
    Config(ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(syncline::render))]
    Render(String),

    #[error("Internal error: {0}")]
    #[diagnostic(code(syncline::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::ServerDown { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } | Self::RequestTimedOut => exit_code::TIMEOUT,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::Disconnected => CliError::ConnectionFailed {
                url: "(disconnected)".into(),
                reason: "Server connection was lost".into(),
            },

            CoreError::Timeout => CliError::RequestTimedOut,

            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                entity_type,
                identifier,
            },

            CoreError::Rejected { message } => CliError::Rejected { message },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Decode { message } | CoreError::Api { message, .. } => {
                CliError::Api { message }
            }

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound {
                available: available_profiles(),
                name,
            },
            other => CliError::Config(other),
        }
    }
}

fn available_profiles() -> String {
    let cfg = syncline_config::load_config_or_default();
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}
