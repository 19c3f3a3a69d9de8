use std::net::SocketAddr;

use thiserror::Error;

/// Error surface for the progress server and session lifecycle.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sync error: {0}")]
    Sync(#[from] facesync_sync::SyncError),

    #[error("config error: {0}")]
    Config(#[from] facesync_core::ConfigError),

    #[error("protocol error: {0}")]
    Protocol(String),
}
