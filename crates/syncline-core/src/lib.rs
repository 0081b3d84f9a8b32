// syncline-core: reactive synchronization layer between syncline-api and consumers (CLI).

pub mod client;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod messages;
pub mod model;
pub mod observable;
pub mod store;
pub mod view;

// ── Primary re-exports ──────────────────────────────────────────────
pub use client::{PatternStore, SyncClient};
pub use config::{ClientConfig, ServerEndpoints, TlsVerification};
pub use connectivity::{ConnectivityGate, ConnectivityState, ServerStatus, StatusStreamHandler};
pub use error::{CoreError, ReactionExt};
pub use messages::{English, Localize, MessageKey};
pub use observable::{Broadcaster, ListenerGuard, Snapshot, Subscription};
pub use store::{
    CollectionEndpoints, FetchOutcome, ModelStreamHandler, StreamedCollection,
    SyncedCollectionStore,
};
pub use view::{CategoryFilter, CategoryFlags, DerivedFilterView, FilterCriteria, FilterView};

pub use model::{AutoQueuePattern, Categorized, SyncedEntity, ViewFile, ViewFileStatus};

// Transport types consumers need without depending on syncline-api directly.
pub use syncline_api::{Dispatch, Reaction};
