// ── Collection stores ──
//
// Two flavours of server-backed collection: one the client mutates
// through request/response calls, one the server pushes over an event
// stream. Both publish immutable `Arc` snapshots.

mod streamed;
mod synced;

pub use streamed::{ModelStreamHandler, StreamedCollection, tags as model_tags};
pub use synced::{CollectionEndpoints, FetchOutcome, SyncedCollectionStore};
