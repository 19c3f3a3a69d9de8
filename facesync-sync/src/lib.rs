//! # facesync-sync
//!
//! Contact photo sync orchestration.
//!
//! Call [`run_sync`] with a [`SessionRegistry`] holding the session's
//! collaborators to copy photos from the messaging app into the directory
//! while streaming progress to the listening client.

pub mod clients;
pub mod error;
pub mod limiter;
pub mod matching;
pub mod orchestrator;
pub mod retry;
pub mod session;
pub mod snapshot;

pub use clients::{DirectoryClient, MessagingClient, ProgressChannel};
pub use error::{ChannelError, ClientError, SyncError};
pub use limiter::RateLimiter;
pub use orchestrator::{run_sync, run_with_handles, SyncReport};
pub use session::{SessionHandles, SessionRegistry};
pub use snapshot::{SnapshotDirectory, SnapshotMessaging};
