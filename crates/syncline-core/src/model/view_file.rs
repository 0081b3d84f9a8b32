// ── Files mirrored from the server's model stream ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::{Categorized, SyncedEntity};

/// Transfer status of a file, as shown to the user.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ViewFileStatus {
    #[default]
    Default,
    Queued,
    Downloading,
    Downloaded,
    Stopped,
}

/// A file (or directory) known to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewFile {
    pub name: String,
    #[serde(default)]
    pub is_dir: bool,
    #[serde(default, alias = "state")]
    pub status: ViewFileStatus,
    #[serde(default)]
    pub remote_size: Option<u64>,
    #[serde(default)]
    pub local_size: Option<u64>,
}

impl SyncedEntity for ViewFile {
    fn key(&self) -> &str {
        &self.name
    }
}

impl Categorized for ViewFile {
    type Category = ViewFileStatus;

    fn category(&self) -> ViewFileStatus {
        self.status
    }
}

/// Payload of the single-file model events.
///
/// `model-added` carries only `new_file`, `model-removed` only
/// `old_file`, `model-updated` both.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelUpdate<T> {
    pub new_file: Option<T>,
    pub old_file: Option<T>,
}
