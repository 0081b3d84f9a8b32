// ── Domain model ──
//
// Entities mirrored from the server. Every entity exposes a string key
// that is unique within its collection; stores compare entities by key.

pub mod pattern;
pub mod view_file;

use std::fmt::Debug;
use std::hash::Hash;

use strum::IntoEnumIterator;

pub use pattern::AutoQueuePattern;
pub use view_file::{ModelUpdate, ViewFile, ViewFileStatus};

/// An immutable record held in a synchronized collection.
pub trait SyncedEntity: Clone + Debug + Send + Sync + 'static {
    /// Equality key, unique within a collection.
    fn key(&self) -> &str;

    /// Whether the entity may be sent to the server at all.
    fn is_valid(&self) -> bool {
        !self.key().trim().is_empty()
    }
}

/// An entity that belongs to exactly one category on a filter axis.
pub trait Categorized: SyncedEntity {
    type Category: Copy + Eq + Hash + Debug + Send + Sync + IntoEnumIterator + 'static;

    fn category(&self) -> Self::Category;
}
