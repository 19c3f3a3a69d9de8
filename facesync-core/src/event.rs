//! Wire messages exchanged over the progress channel.
//!
//! Server → client frames are [`ServerEvent`]s, tagged as
//! `{"type": "...", "data": {...}}`. The client opens a session with a single
//! [`ClientRequest`].

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{PhotoPayload, SessionId, SyncOptions};

/// Progress of a running sync.
///
/// Step events always carry `totalContacts` and `image` (serialized as
/// `null` when no photo was fetched for that contact). The terminal event
/// carries only `progress` and `syncCount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgress {
    pub progress: f64,
    pub sync_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_contacts: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub image: Option<Option<PhotoPayload>>,
}

impl SyncProgress {
    /// Event emitted after handling the remote contact at `index`.
    pub fn step(index: usize, total: usize, sync_count: u64, image: Option<PhotoPayload>) -> Self {
        Self {
            progress: index as f64 / total as f64 * 100.0,
            sync_count,
            total_contacts: Some(total as u64),
            image: Some(image),
        }
    }

    /// Terminal event emitted once the whole list has been walked.
    pub fn finished(sync_count: u64) -> Self {
        Self {
            progress: 100.0,
            sync_count,
            total_contacts: None,
            image: None,
        }
    }

    pub fn is_final(&self) -> bool {
        self.total_contacts.is_none()
    }
}

// Distinguishes an explicit `"image": null` from a missing field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Category of a terminal failure reported to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    AuthExpired,
    Fatal,
    Protocol,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl SyncFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Server → client frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    SyncProgress(SyncProgress),
    SyncError(SyncFailure),
}

impl ServerEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            ServerEvent::SyncProgress(_) => "syncProgress",
            ServerEvent::SyncError(_) => "syncError",
        }
    }
}

impl From<SyncProgress> for ServerEvent {
    fn from(progress: SyncProgress) -> Self {
        ServerEvent::SyncProgress(progress)
    }
}

impl From<SyncFailure> for ServerEvent {
    fn from(failure: SyncFailure) -> Self {
        ServerEvent::SyncError(failure)
    }
}

/// Client → server frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientRequest {
    StartSync {
        #[serde(rename = "sessionId")]
        session_id: SessionId,
        #[serde(default)]
        options: SyncOptions,
    },
}
