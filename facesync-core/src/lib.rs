//! facesync core library: domain types, wire events, config file, errors.
//!
//! - [`types`]: contacts, phone numbers, photo payloads, sync options
//! - [`event`]: progress and failure frames sent to the listening client
//! - [`config`]: `~/.facesync/config.yaml` load / save
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod event;
pub mod types;

pub use config::{Config, RetryConfig};
pub use error::ConfigError;
pub use event::{ClientRequest, FailureKind, ServerEvent, SyncFailure, SyncProgress};
pub use types::{Contact, ContactId, PhoneNumber, PhotoPayload, SessionId, SyncOptions};
