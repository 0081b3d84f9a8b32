// ── Stream-mirrored collection ──
//
// A read-only mirror of a collection the server pushes over an event
// stream: `model-init` replaces everything, the single-file events patch
// by key. Registered filter criteria are evaluated conjunctively into a
// second, filtered snapshot, which is brought up to date before the
// collection's own listeners run.

use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use syncline_api::{Error, StreamEvent, StreamHandler};
use tracing::{debug, trace, warn};

use crate::error::CoreError;
use crate::model::{ModelUpdate, SyncedEntity};
use crate::observable::{Broadcaster, ListenerGuard, Snapshot, Subscription};
use crate::view::FilterCriteria;

/// Event tags of the model stream.
pub mod tags {
    pub const INIT: &str = "model-init";
    pub const ADDED: &str = "model-added";
    pub const UPDATED: &str = "model-updated";
    pub const REMOVED: &str = "model-removed";
}

/// Collection mirrored from a server event stream.
pub struct StreamedCollection<T: SyncedEntity> {
    items: Broadcaster<Snapshot<T>>,
    filtered: Broadcaster<Snapshot<T>>,
    criteria: RwLock<Vec<Arc<dyn FilterCriteria<T>>>>,
}

impl<T: SyncedEntity> StreamedCollection<T> {
    pub fn new() -> Self {
        Self {
            items: Broadcaster::new(Arc::new(Vec::new())),
            filtered: Broadcaster::new(Arc::new(Vec::new())),
            criteria: RwLock::new(Vec::new()),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Snapshot<T> {
        self.items.current()
    }

    pub fn subscribe(&self) -> Subscription<Snapshot<T>> {
        self.items.subscribe()
    }

    /// Run `listener` synchronously after every change to the full set.
    pub fn listen(&self, listener: impl Fn(&Snapshot<T>) + Send + Sync + 'static) -> ListenerGuard {
        self.items.listen(listener)
    }

    /// Entities that satisfy every registered criteria.
    pub fn filtered(&self) -> Snapshot<T> {
        self.filtered.current()
    }

    pub fn subscribe_filtered(&self) -> Subscription<Snapshot<T>> {
        self.filtered.subscribe()
    }

    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        self.items.current().iter().find(|item| item.key() == key).cloned()
    }

    // ── Criteria ─────────────────────────────────────────────────────

    /// Add a criteria to the conjunction and re-filter.
    pub fn register_criteria(&self, criteria: Arc<dyn FilterCriteria<T>>) {
        self.criteria
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(criteria);
        self.reapply_filters();
    }

    /// Re-evaluate every criteria against the current items.
    ///
    /// Call after mutating a registered criteria in place.
    pub fn reapply_filters(&self) {
        let items = self.items.current();
        let criteria = self
            .criteria
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let filtered: Vec<Arc<T>> = items
            .iter()
            .filter(|item| criteria.iter().all(|c| c.matches(item)))
            .cloned()
            .collect();
        trace!(total = items.len(), shown = filtered.len(), "filters reapplied");
        self.filtered.publish(Arc::new(filtered));
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Replace the whole collection.
    pub fn replace_all(&self, items: Vec<T>) {
        let items: Vec<Arc<T>> = items.into_iter().map(Arc::new).collect();
        debug!(count = items.len(), "collection replaced");
        self.items.replace_quiet(Arc::new(items));
        self.changed();
    }

    /// Insert `item`, or replace the entity with the same key in place.
    pub fn upsert(&self, item: T) {
        let item = Arc::new(item);
        self.items.modify_quiet(|items| {
            let mut next = items.to_vec();
            match next.iter().position(|x| x.key() == item.key()) {
                Some(index) => next[index] = item,
                None => next.push(item),
            }
            *items = Arc::new(next);
            true
        });
        self.changed();
    }

    /// Remove the entity with `key`. Returns `false` if it was absent.
    pub fn remove_key(&self, key: &str) -> bool {
        let removed = self.items.modify_quiet(|items| {
            let Some(index) = items.iter().position(|x| x.key() == key) else {
                return false;
            };
            let mut next = items.to_vec();
            next.remove(index);
            *items = Arc::new(next);
            true
        });
        if removed {
            self.changed();
        }
        removed
    }

    pub fn clear(&self) {
        let cleared = self.items.modify_quiet(|items| {
            if items.is_empty() {
                return false;
            }
            *items = Arc::new(Vec::new());
            true
        });
        if cleared {
            debug!("collection cleared");
            self.changed();
        }
    }

    fn changed(&self) {
        self.reapply_filters();
        self.items.notify();
    }
}

impl<T: SyncedEntity + DeserializeOwned> StreamedCollection<T> {
    /// Apply one model stream event. Unknown tags are ignored.
    pub fn apply_event(&self, event: &StreamEvent) -> Result<(), CoreError> {
        match event.tag.as_str() {
            tags::INIT => {
                let items: Vec<T> = serde_json::from_str(&event.data)?;
                self.replace_all(items);
            }
            tags::ADDED | tags::UPDATED => {
                let update: ModelUpdate<T> = serde_json::from_str(&event.data)?;
                let Some(new_file) = update.new_file else {
                    return Err(CoreError::Decode {
                        message: format!("{} event without new_file", event.tag),
                    });
                };
                // A rename arrives as an update with differing keys.
                if let Some(old_file) = update.old_file {
                    if old_file.key() != new_file.key() {
                        self.remove_key(old_file.key());
                    }
                }
                self.upsert(new_file);
            }
            tags::REMOVED => {
                let update: ModelUpdate<T> = serde_json::from_str(&event.data)?;
                let Some(old_file) = update.old_file else {
                    return Err(CoreError::Decode {
                        message: format!("{} event without old_file", event.tag),
                    });
                };
                if !self.remove_key(old_file.key()) {
                    debug!(key = old_file.key(), "removal of unknown entity ignored");
                }
            }
            other => debug!(tag = other, "ignoring unknown model event"),
        }
        Ok(())
    }
}

impl<T: SyncedEntity> Default for StreamedCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ── ModelStreamHandler ───────────────────────────────────────────────

/// Feeds the model event stream into a [`StreamedCollection`].
///
/// A stream failure empties the collection; the next `model-init`
/// after reconnect repopulates it.
pub struct ModelStreamHandler<T: SyncedEntity> {
    collection: Arc<StreamedCollection<T>>,
}

impl<T: SyncedEntity> ModelStreamHandler<T> {
    pub fn new(collection: Arc<StreamedCollection<T>>) -> Self {
        Self { collection }
    }
}

impl<T: SyncedEntity + DeserializeOwned> StreamHandler for ModelStreamHandler<T> {
    fn on_event(&self, event: &StreamEvent) {
        if let Err(e) = self.collection.apply_event(event) {
            warn!(tag = %event.tag, error = %e, "malformed model event");
        }
    }

    fn on_error(&self, _error: &Error) {
        self.collection.clear();
    }
}
