//! Builds the directory and messaging clients for a new session.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use facesync_core::SessionId;
use facesync_sync::{DirectoryClient, MessagingClient, SnapshotDirectory, SnapshotMessaging};

use crate::error::DaemonError;

/// Clients a session needs besides its progress channel.
pub struct SessionClients {
    pub messaging: Arc<dyn MessagingClient>,
    pub directory: Arc<dyn DirectoryClient>,
}

/// Source of authenticated clients for a session id.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, session_id: &SessionId) -> Result<SessionClients, DaemonError>;
}

/// Serves every session from the same pair of snapshot files.
#[derive(Debug, Clone)]
pub struct SnapshotFactory {
    pub directory_contacts: PathBuf,
    /// Where uploaded photos are written.
    pub directory_photos: PathBuf,
    pub messaging_contacts: PathBuf,
    pub messaging_photos: PathBuf,
}

impl SnapshotFactory {
    /// Load fresh clients from disk.
    pub fn load(&self) -> Result<SessionClients, DaemonError> {
        let directory =
            SnapshotDirectory::load(&self.directory_contacts, self.directory_photos.clone())?;
        let messaging =
            SnapshotMessaging::load(&self.messaging_contacts, self.messaging_photos.clone())?;
        Ok(SessionClients {
            messaging: Arc::new(messaging),
            directory: Arc::new(directory),
        })
    }
}

#[async_trait]
impl SessionFactory for SnapshotFactory {
    async fn open(&self, session_id: &SessionId) -> Result<SessionClients, DaemonError> {
        let factory = self.clone();
        let clients = tokio::task::spawn_blocking(move || factory.load())
            .await
            .map_err(|err| DaemonError::Protocol(format!("snapshot load join error: {err}")))??;
        tracing::debug!(session = %session_id, "snapshot clients loaded");
        Ok(clients)
    }
}
