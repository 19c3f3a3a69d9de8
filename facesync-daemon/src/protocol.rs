//! Websocket handshake: the client's first text frame names the session.

use futures_util::{Stream, StreamExt};
use tokio_tungstenite::tungstenite::{self, Message};

use facesync_core::ClientRequest;

use crate::error::DaemonError;

/// Read frames until the client's opening request arrives.
///
/// Pings and pongs are skipped. A close, end of stream, or a binary frame
/// before the request is a protocol error.
pub async fn read_request<R>(stream: &mut R) -> Result<ClientRequest, DaemonError>
where
    R: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) | None => {
                return Err(DaemonError::Protocol(
                    "client closed connection before startSync".to_string(),
                ))
            }
            Some(Ok(other)) => {
                return Err(DaemonError::Protocol(format!(
                    "expected a startSync text frame, got {} bytes of {}",
                    other.len(),
                    frame_kind(&other)
                )))
            }
            Some(Err(err)) => return Err(err.into()),
        }
    }
}

fn frame_kind(message: &Message) -> &'static str {
    match message {
        Message::Text(_) => "text",
        Message::Binary(_) => "binary",
        Message::Ping(_) => "ping",
        Message::Pong(_) => "pong",
        Message::Close(_) => "close",
        Message::Frame(_) => "raw frame",
    }
}
