// ── Request outcome envelope ──
//
// Every request/response call resolves to a `Reaction`, whether the
// server accepted it, rejected it, or was never reached.

use serde::{Deserialize, Serialize};

/// Outcome of a single request/response call.
///
/// Validation failures, server rejections, and transport failures all
/// travel through the same value -- callers branch on [`success`](Self::success)
/// rather than on an error type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub success: bool,
    /// Response body on success.
    #[serde(default)]
    pub data: Option<String>,
    /// Human-readable reason on failure.
    #[serde(default)]
    pub message: Option<String>,
}

impl Reaction {
    /// A successful reaction carrying the response body, if any.
    pub fn ok(data: Option<String>) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    /// A failed reaction with a reason.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// The failure reason, or an empty string.
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }
}
