// syncline-api: async transport for a file-sync server (request dispatch + event streams)

pub mod dispatch;
pub mod error;
pub mod reaction;
pub mod stream;
pub mod transport;

pub use dispatch::{Dispatch, HttpDispatcher, encode_param, endpoint, join_path};
pub use error::Error;
pub use reaction::Reaction;
pub use stream::{
    EventStreamClient, EventStreamHandle, StreamConfig, StreamEvent, StreamHandler, StreamState,
};
pub use transport::{TlsMode, TransportConfig};
