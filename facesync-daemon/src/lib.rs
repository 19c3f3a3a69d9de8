//! Websocket progress server: one sync session per connection.

pub mod channel;
mod error;
pub mod factory;
pub mod protocol;
mod runtime;

pub use channel::WsProgressChannel;
pub use error::DaemonError;
pub use factory::{SessionClients, SessionFactory, SnapshotFactory};
pub use runtime::{handle_connection, init_tracing, run, serve, start_blocking, ServerState};
