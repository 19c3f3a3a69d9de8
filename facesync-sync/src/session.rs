//! Registry of live sync sessions.
//!
//! Whoever accepts a connection inserts the session's handles and removes
//! them when the connection ends. The orchestrator only reads.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;

use facesync_core::SessionId;

use crate::clients::{DirectoryClient, MessagingClient, ProgressChannel};
use crate::error::SyncError;

/// Handles owned by the registry for one session's lifetime.
#[derive(Clone)]
pub struct SessionHandles {
    pub channel: Arc<dyn ProgressChannel>,
    pub messaging: Arc<dyn MessagingClient>,
    pub directory: Arc<dyn DirectoryClient>,
}

impl fmt::Debug for SessionHandles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandles")
            .field("channel_open", &self.channel.is_open())
            .finish_non_exhaustive()
    }
}

/// Shared, cloneable lookup from session id to [`SessionHandles`].
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<SessionId, SessionHandles>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session. Fails if the id is already active.
    pub async fn insert(&self, id: SessionId, handles: SessionHandles) -> Result<(), SyncError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&id) {
            return Err(SyncError::SessionExists(id));
        }
        tracing::debug!(session = %id, "session registered");
        sessions.insert(id, handles);
        Ok(())
    }

    pub async fn remove(&self, id: &SessionId) -> Option<SessionHandles> {
        let removed = self.sessions.write().await.remove(id);
        if removed.is_some() {
            tracing::debug!(session = %id, "session removed");
        }
        removed
    }

    pub async fn contains(&self, id: &SessionId) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn handles(&self, id: &SessionId) -> Result<SessionHandles, SyncError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SyncError::SessionNotFound(id.clone()))
    }

    pub async fn channel(&self, id: &SessionId) -> Result<Arc<dyn ProgressChannel>, SyncError> {
        self.handles(id).await.map(|h| h.channel)
    }

    pub async fn messaging(&self, id: &SessionId) -> Result<Arc<dyn MessagingClient>, SyncError> {
        self.handles(id).await.map(|h| h.messaging)
    }

    pub async fn directory(&self, id: &SessionId) -> Result<Arc<dyn DirectoryClient>, SyncError> {
        self.handles(id).await.map(|h| h.directory)
    }
}
