//! Error types for facesync-sync.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use facesync_core::{ConfigError, FailureKind, SessionId};

/// Failure reported by a directory or messaging client.
///
/// The variant decides what the orchestrator does next: retry the single
/// call, pause and retry, or end the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Network hiccup; the same call may succeed if repeated.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The remote rejected the call for quota reasons.
    #[error("rate limited by remote{}", retry_after_suffix(.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    /// Credentials are no longer accepted; the session cannot continue.
    #[error("authentication expired: {0}")]
    AuthExpired(String),

    /// Anything else. Ends the session.
    #[error("{0}")]
    Fatal(String),
}

fn retry_after_suffix(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(" (retry after {} ms)", d.as_millis()),
        None => String::new(),
    }
}

impl ClientError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Transient(_) | ClientError::RateLimited { .. }
        )
    }

    /// How the failure is reported to the listening client once it ends the
    /// session.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ClientError::AuthExpired(_) => FailureKind::AuthExpired,
            _ => FailureKind::Fatal,
        }
    }
}

/// Failure writing to a progress channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("progress channel closed")]
    Closed,

    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(String),
}

/// All errors that can arise from sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no active session '{0}'")]
    SessionNotFound(SessionId),

    #[error("session '{0}' is already active")]
    SessionExists(SessionId),

    /// A collaborator call failed for good (retries exhausted or not
    /// retryable).
    #[error("{operation} failed: {source}")]
    Client {
        operation: &'static str,
        #[source]
        source: ClientError,
    },

    #[error("progress channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An I/O error, with annotated path for context (snapshot files).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot JSON error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SyncError {
    pub(crate) fn client(operation: &'static str) -> impl FnOnce(ClientError) -> SyncError {
        move |source| SyncError::Client { operation, source }
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_and_rate_limited_are_retryable() {
        assert!(ClientError::Transient("reset".into()).is_retryable());
        assert!(ClientError::RateLimited { retry_after: None }.is_retryable());
        assert!(!ClientError::AuthExpired("401".into()).is_retryable());
        assert!(!ClientError::Fatal("boom".into()).is_retryable());
    }

    #[test]
    fn auth_expiry_reports_its_own_kind() {
        assert_eq!(
            ClientError::AuthExpired("401".into()).failure_kind(),
            FailureKind::AuthExpired
        );
        assert_eq!(
            ClientError::Transient("reset".into()).failure_kind(),
            FailureKind::Fatal
        );
    }

    #[test]
    fn rate_limited_message_mentions_delay() {
        let err = ClientError::RateLimited {
            retry_after: Some(Duration::from_millis(1200)),
        };
        assert_eq!(err.to_string(), "rate limited by remote (retry after 1200 ms)");
    }
}
