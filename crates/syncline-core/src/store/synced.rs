// ── Server-confirmed collection ──
//
// A local mirror of a server-owned collection. Mutations are validated
// locally, sent to the server, and applied only once the server accepts
// them. Connectivity drives the lifecycle: losing the server empties the
// mirror, regaining it triggers a full fetch.
//
// Every clear bumps a generation counter. Responses that were requested
// under an older generation are stale and are dropped on arrival. A fetch
// replaces the list without bumping it, so confirmations in flight still
// land on the fetched list.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use syncline_api::{Dispatch, Reaction, endpoint};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::connectivity::ConnectivityGate;
use crate::messages::{English, Localize, MessageKey, capitalize};
use crate::model::SyncedEntity;
use crate::observable::{Broadcaster, ListenerGuard, Snapshot, Subscription};

// ── CollectionEndpoints ──────────────────────────────────────────────

/// Path templates for one collection. `add` and `remove` carry a `{}`
/// placeholder for the entity key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionEndpoints {
    pub fetch: String,
    pub add: String,
    pub remove: String,
}

impl CollectionEndpoints {
    /// The server's auto-queue pattern endpoints.
    pub fn autoqueue() -> Self {
        Self {
            fetch: "/server/autoqueue/get".into(),
            add: "/server/autoqueue/add/{}".into(),
            remove: "/server/autoqueue/remove/{}".into(),
        }
    }
}

impl Default for CollectionEndpoints {
    fn default() -> Self {
        Self::autoqueue()
    }
}

/// Result of a [`SyncedCollectionStore::refresh`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The collection was replaced with this many entities.
    Replaced(usize),
    /// The fetch failed; the collection is now empty.
    Failed { reason: String },
    /// A clear happened while the fetch was in flight; result discarded.
    Stale,
}

// ── SyncedCollectionStore ────────────────────────────────────────────

/// Ordered collection kept in step with the server.
///
/// Reads are cheap `Arc` snapshots. Writes go through [`add`](Self::add),
/// [`remove`](Self::remove), and the store's own connectivity handling.
pub struct SyncedCollectionStore<E, D>
where
    E: SyncedEntity,
{
    dispatcher: D,
    endpoints: CollectionEndpoints,
    label: String,
    messages: Arc<dyn Localize>,
    generation: Mutex<u64>,
    items: Broadcaster<Snapshot<E>>,
}

impl<E, D> SyncedCollectionStore<E, D>
where
    E: SyncedEntity + DeserializeOwned,
    D: Dispatch,
{
    /// Create an empty store. `label` names the entity kind in messages
    /// (e.g. `"pattern"`).
    pub fn new(dispatcher: D, endpoints: CollectionEndpoints, label: impl Into<String>) -> Self {
        Self {
            dispatcher,
            endpoints,
            label: label.into(),
            messages: Arc::new(English),
            generation: Mutex::new(0),
            items: Broadcaster::new(Arc::new(Vec::new())),
        }
    }

    /// Use a different message catalogue.
    pub fn with_messages(mut self, messages: Arc<dyn Localize>) -> Self {
        self.messages = messages;
        self
    }

    pub fn endpoints(&self) -> &CollectionEndpoints {
        &self.endpoints
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Snapshot<E> {
        self.items.current()
    }

    pub fn subscribe(&self) -> Subscription<Snapshot<E>> {
        self.items.subscribe()
    }

    /// Run `listener` synchronously after every change.
    pub fn listen(&self, listener: impl Fn(&Snapshot<E>) + Send + Sync + 'static) -> ListenerGuard {
        self.items.listen(listener)
    }

    pub fn len(&self) -> usize {
        self.items.current().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        position(&self.items.current(), key).is_some()
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Ask the server to add `entity`; append it once confirmed.
    ///
    /// Invalid and duplicate entities are rejected without a request.
    pub async fn add(&self, entity: E) -> Reaction {
        let key = entity.key().to_owned();
        debug!(label = %self.label, key = %key, "add requested");

        if !entity.is_valid() {
            return Reaction::rejected(self.text(MessageKey::EntityEmpty, &key));
        }

        let generation = {
            let generation = self.lock();
            if position(&self.items.current(), &key).is_some() {
                return Reaction::rejected(self.text(MessageKey::EntityExists, &key));
            }
            *generation
        };

        let reaction = self.dispatcher.send(&endpoint(&self.endpoints.add, &key)).await;
        if !reaction.success {
            debug!(key = %key, reason = reaction.message(), "add rejected");
            return reaction;
        }

        let entity = Arc::new(entity);
        self.apply_confirmed(generation, "add", |items| {
            if position(items, &key).is_some() {
                return None;
            }
            let mut next = items.to_vec();
            next.push(entity);
            Some(next)
        });
        reaction
    }

    /// Ask the server to remove `entity`; drop it once confirmed.
    ///
    /// Entities not in the collection are rejected without a request.
    pub async fn remove(&self, entity: &E) -> Reaction {
        let key = entity.key();
        debug!(label = %self.label, key = %key, "remove requested");

        let generation = {
            let generation = self.lock();
            if position(&self.items.current(), key).is_none() {
                return Reaction::rejected(self.text(MessageKey::EntityNotFound, key));
            }
            *generation
        };

        let reaction = self.dispatcher.send(&endpoint(&self.endpoints.remove, key)).await;
        if !reaction.success {
            debug!(key = %key, reason = reaction.message(), "remove rejected");
            return reaction;
        }

        // The index may have moved while the request was in flight.
        self.apply_confirmed(generation, "remove", |items| {
            let index = position(items, key)?;
            let mut next = items.to_vec();
            next.remove(index);
            Some(next)
        });
        reaction
    }

    // ── Connectivity lifecycle ───────────────────────────────────────

    /// Empty the collection and invalidate every in-flight response.
    pub fn clear(&self) {
        {
            let mut generation = self.lock();
            *generation += 1;
            self.items.replace_quiet(Arc::new(Vec::new()));
        }
        debug!(label = %self.label, "collection cleared");
        self.items.notify();
    }

    /// Fetch the full collection and replace the local copy.
    ///
    /// A failed fetch leaves the collection empty; there is no retry.
    pub async fn refresh(&self) -> FetchOutcome {
        let generation = self.generation();
        self.refresh_since(generation).await
    }

    /// Fetch, applying the result only if no clear happened after
    /// `generation` was read.
    async fn refresh_since(&self, generation: u64) -> FetchOutcome {
        let reaction = self.dispatcher.send(&self.endpoints.fetch).await;

        let parsed = if reaction.success {
            let body = reaction.data.as_deref().unwrap_or("[]");
            serde_json::from_str::<Vec<E>>(body).map_err(|e| e.to_string())
        } else {
            Err(reaction.message().to_owned())
        };

        let outcome = {
            let current = self.lock();
            if *current == generation {
                match parsed {
                    Ok(list) => {
                        let list = dedup_by_key(list);
                        let count = list.len();
                        self.items.replace_quiet(Arc::new(list));
                        Some(FetchOutcome::Replaced(count))
                    }
                    Err(reason) => {
                        warn!(label = %self.label, reason = %reason, "fetch failed");
                        self.items.replace_quiet(Arc::new(Vec::new()));
                        Some(FetchOutcome::Failed { reason })
                    }
                }
            } else {
                None
            }
        };

        match outcome {
            Some(outcome) => {
                debug!(label = %self.label, ?outcome, "fetch applied");
                self.items.notify();
                outcome
            }
            None => {
                debug!(label = %self.label, "discarding stale fetch response");
                FetchOutcome::Stale
            }
        }
    }

    /// Tie the store to `gate` until `cancel` fires.
    ///
    /// Disconnects clear the collection synchronously, inside the gate's
    /// notification. Connects (and an already-connected gate at attach
    /// time) queue a fetch on the returned task; a fetch queued before a
    /// later disconnect is discarded as stale.
    pub fn attach(self: &Arc<Self>, gate: &ConnectivityGate, cancel: CancellationToken) -> JoinHandle<()>
    where
        D: 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<u64>();

        if gate.is_connected() {
            let _ = tx.send(self.generation());
        }

        let store = Arc::downgrade(self);
        let guard = gate.listen(move |state| {
            let Some(store) = store.upgrade() else {
                return;
            };
            if state.connected {
                let _ = tx.send(store.generation());
            } else {
                store.clear();
            }
        });

        let store = Arc::downgrade(self);
        tokio::spawn(async move {
            let _guard = guard;
            loop {
                let generation = tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Some(generation) => generation,
                        None => break,
                    },
                };
                let Some(store) = store.upgrade() else { break };
                store.refresh_since(generation).await;
            }
            debug!("collection connectivity task exiting");
        })
    }

    // ── Internals ────────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, u64> {
        self.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn generation(&self) -> u64 {
        *self.lock()
    }

    /// Apply a confirmed mutation if no clear happened since `generation`.
    fn apply_confirmed(
        &self,
        generation: u64,
        op: &str,
        mutate: impl FnOnce(&[Arc<E>]) -> Option<Vec<Arc<E>>>,
    ) -> bool {
        {
            let current = self.lock();
            if *current != generation {
                debug!(label = %self.label, op, "discarding stale confirmation");
                return false;
            }
            let items = self.items.current();
            let Some(next) = mutate(&items) else {
                debug!(label = %self.label, op, "confirmation no longer applies");
                return false;
            };
            self.items.replace_quiet(Arc::new(next));
        }
        self.items.notify();
        true
    }

    fn text(&self, key: MessageKey, entity_key: &str) -> String {
        self.messages.message(
            key,
            &[
                ("label", &self.label),
                ("Label", &capitalize(&self.label)),
                ("key", entity_key),
            ],
        )
    }
}

fn position<E: SyncedEntity>(items: &[Arc<E>], key: &str) -> Option<usize> {
    items.iter().position(|item| item.key() == key)
}

/// Keep the first occurrence of every key, preserving order.
fn dedup_by_key<E: SyncedEntity>(list: Vec<E>) -> Vec<Arc<E>> {
    let mut seen = HashSet::new();
    list.into_iter()
        .filter(|item| seen.insert(item.key().to_owned()))
        .map(Arc::new)
        .collect()
}
