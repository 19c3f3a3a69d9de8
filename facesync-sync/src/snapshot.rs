//! File-backed directory and messaging clients.
//!
//! A snapshot is a JSON array of contacts plus a directory of photos named
//! `<contact id>.jpg`:
//!
//! ```text
//! contacts.json   [{"id": "people/c1", "numbers": ["+15550100"], "has_photo": false}]
//! photos/
//!   people_2Fc1.jpg
//! ```
//!
//! Contact ids are escaped into file names: `[A-Za-z0-9.-]` is kept and every
//! other byte, `_` included, becomes `_XX` (uppercase hex). Distinct ids
//! always get distinct files.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use facesync_core::{Contact, ContactId, PhotoPayload};

use crate::clients::{DirectoryClient, MessagingClient};
use crate::error::{io_err, ClientError, SyncError};

pub const PHOTO_EXTENSION: &str = "jpg";

/// Read a contacts JSON array from disk.
pub fn load_contacts(path: &Path) -> Result<Vec<Contact>, SyncError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_json::from_str(&contents).map_err(|source| SyncError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// `<photo_dir>/<escaped id>.jpg`
pub fn photo_path(photo_dir: &Path, id: &ContactId) -> PathBuf {
    let mut name = String::with_capacity(id.0.len());
    for byte in id.0.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'-') {
            name.push(char::from(byte));
        } else {
            name.push_str(&format!("_{byte:02X}"));
        }
    }
    photo_dir.join(format!("{name}.{PHOTO_EXTENSION}"))
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// Directory backed by a contacts file; uploaded photos land in `photo_dir`.
pub struct SnapshotDirectory {
    contacts: RwLock<Vec<Contact>>,
    photo_dir: PathBuf,
}

impl SnapshotDirectory {
    pub fn load(contacts_path: &Path, photo_dir: impl Into<PathBuf>) -> Result<Self, SyncError> {
        Ok(Self::from_contacts(load_contacts(contacts_path)?, photo_dir))
    }

    pub fn from_contacts(contacts: Vec<Contact>, photo_dir: impl Into<PathBuf>) -> Self {
        Self {
            contacts: RwLock::new(contacts),
            photo_dir: photo_dir.into(),
        }
    }

}

#[async_trait]
impl DirectoryClient for SnapshotDirectory {
    async fn list_contacts(&self) -> Result<Vec<Contact>, ClientError> {
        Ok(self.contacts.read().await.clone())
    }

    async fn update_contact_photo(
        &self,
        contact_id: &ContactId,
        photo: &PhotoPayload,
    ) -> Result<(), ClientError> {
        let bytes = photo
            .to_bytes()
            .map_err(|e| ClientError::Fatal(format!("photo for {contact_id} is not base64: {e}")))?;

        let mut contacts = self.contacts.write().await;
        let contact = contacts
            .iter_mut()
            .find(|c| &c.id == contact_id)
            .ok_or_else(|| ClientError::Fatal(format!("unknown directory contact {contact_id}")))?;

        tokio::fs::create_dir_all(&self.photo_dir)
            .await
            .map_err(|e| ClientError::Fatal(format!("{}: {e}", self.photo_dir.display())))?;
        let path = photo_path(&self.photo_dir, contact_id);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ClientError::Fatal(format!("{}: {e}", path.display())))?;

        contact.has_photo = true;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Messaging
// ---------------------------------------------------------------------------

/// Messaging app backed by a contacts file and a directory of avatars.
pub struct SnapshotMessaging {
    contacts: Vec<Contact>,
    photo_dir: PathBuf,
}

impl SnapshotMessaging {
    pub fn load(contacts_path: &Path, photo_dir: impl Into<PathBuf>) -> Result<Self, SyncError> {
        Ok(Self::from_contacts(load_contacts(contacts_path)?, photo_dir))
    }

    pub fn from_contacts(contacts: Vec<Contact>, photo_dir: impl Into<PathBuf>) -> Self {
        Self {
            contacts,
            photo_dir: photo_dir.into(),
        }
    }
}

#[async_trait]
impl MessagingClient for SnapshotMessaging {
    async fn load_contacts(&self) -> Result<Vec<Contact>, ClientError> {
        Ok(self.contacts.clone())
    }

    async fn download_photo(
        &self,
        contact_id: &ContactId,
    ) -> Result<Option<PhotoPayload>, ClientError> {
        let path = photo_path(&self.photo_dir, contact_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(PhotoPayload::from_bytes(&bytes))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ClientError::Transient(format!("{}: {err}", path.display()))),
        }
    }
}
