//! Domain types shared by the orchestrator, the daemon and the CLI.
//!
//! The same [`Contact`] shape is used for the remote directory and for the
//! messaging app so the two lists can be compared by phone number.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identifier of a contact on either side of the sync.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactId(pub String);

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ContactId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContactId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identifier of one sync session (one connected progress listener).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A phone number with formatting characters stripped.
///
/// `"+1 (555) 010-2030"` and `"+15550102030"` compare equal. No other
/// normalization happens: country prefixes are not inferred.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn new(raw: &str) -> Self {
        let normalized = raw
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')' | '\t'))
            .collect();
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the raw value held only formatting characters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for PhoneNumber {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl From<&str> for PhoneNumber {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<PhoneNumber> for String {
    fn from(p: PhoneNumber) -> Self {
        p.0
    }
}

/// Base64-encoded image data, as carried on the wire and handed to the
/// directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoPayload(pub String);

impl PhotoPayload {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(STANDARD.encode(bytes))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(self.0.as_bytes())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PhotoPayload {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Contact
// ---------------------------------------------------------------------------

/// Simplified contact used for both the directory and the messaging app.
///
/// Deserialization goes through [`Contact::new`], so loaded contacts get the
/// same number cleanup as constructed ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawContact")]
pub struct Contact {
    pub id: ContactId,
    /// Unique and non-empty within the contact. Order is kept because the
    /// orchestrator tries numbers first to last.
    pub numbers: Vec<PhoneNumber>,
    pub has_photo: bool,
}

#[derive(Deserialize)]
struct RawContact {
    id: ContactId,
    #[serde(default)]
    numbers: Vec<PhoneNumber>,
    #[serde(default)]
    has_photo: bool,
}

impl From<RawContact> for Contact {
    fn from(raw: RawContact) -> Self {
        Contact::new(raw.id, raw.numbers, raw.has_photo)
    }
}

impl Contact {
    pub fn new<I, N>(id: impl Into<ContactId>, numbers: I, has_photo: bool) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<PhoneNumber>,
    {
        let mut unique: Vec<PhoneNumber> = Vec::new();
        for number in numbers {
            let number = number.into();
            if !number.is_empty() && !unique.contains(&number) {
                unique.push(number);
            }
        }
        Self {
            id: id.into(),
            numbers: unique,
            has_photo,
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Options sent by the client when it asks for a sync.
///
/// `overwrite_photos` stays string-typed on the wire; only the exact value
/// `"false"` disables overwriting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    #[serde(default = "default_overwrite")]
    pub overwrite_photos: String,
}

fn default_overwrite() -> String {
    "true".to_string()
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            overwrite_photos: default_overwrite(),
        }
    }
}

impl SyncOptions {
    pub fn overwrite(overwrite: bool) -> Self {
        Self {
            overwrite_photos: overwrite.to_string(),
        }
    }

    pub fn overwrite_photos(&self) -> bool {
        self.overwrite_photos != "false"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
