//! Collaborators the orchestrator drives.
//!
//! Vendor SDKs (contacts directory, messaging app, socket transport) sit
//! behind these traits. A directory client is already bound to its
//! credential, so no credential argument is threaded through the calls.

use async_trait::async_trait;

use facesync_core::{Contact, ContactId, PhotoPayload, ServerEvent, SyncFailure};

use crate::error::{ChannelError, ClientError};

/// Remote contacts directory whose photos get updated.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Full contact list, fully materialized.
    async fn list_contacts(&self) -> Result<Vec<Contact>, ClientError>;

    async fn update_contact_photo(
        &self,
        contact_id: &ContactId,
        photo: &PhotoPayload,
    ) -> Result<(), ClientError>;
}

/// Messaging app that photos are read from.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    async fn load_contacts(&self) -> Result<Vec<Contact>, ClientError>;

    /// `Ok(None)` when the contact has no photo or it is not visible.
    async fn download_photo(
        &self,
        contact_id: &ContactId,
    ) -> Result<Option<PhotoPayload>, ClientError>;
}

/// Push-only channel to the client that asked for the sync.
#[async_trait]
pub trait ProgressChannel: Send + Sync {
    /// `false` once the far end has gone away.
    fn is_open(&self) -> bool;

    async fn send_event(&self, event: ServerEvent) -> Result<(), ChannelError>;

    async fn close(&self);

    /// Report a terminal failure, then close. The channel is closed even when
    /// the failure event could not be delivered; the delivery error is
    /// returned afterwards.
    async fn close_with_error(&self, failure: SyncFailure) -> Result<(), ChannelError> {
        let sent = self.send_event(ServerEvent::from(failure)).await;
        self.close().await;
        sent
    }
}
