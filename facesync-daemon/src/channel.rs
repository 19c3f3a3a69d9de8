//! Progress channel backed by a websocket connection.
//!
//! Frames are handed to a writer task through a bounded queue so the
//! orchestrator never touches the socket directly. The open flag is cleared
//! by whichever side notices the connection is gone first: the writer on a
//! failed send, the disconnect watcher on a close frame or read error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};

use facesync_core::ServerEvent;
use facesync_sync::{ChannelError, ProgressChannel};

const OUTBOUND_QUEUE: usize = 64;

pub struct WsProgressChannel {
    open: Arc<AtomicBool>,
    outbound: mpsc::Sender<Message>,
}

impl WsProgressChannel {
    /// Start the writer task for `sink` and return the channel feeding it.
    pub fn spawn<W>(sink: W) -> (Self, JoinHandle<()>)
    where
        W: Sink<Message, Error = tungstenite::Error> + Unpin + Send + 'static,
    {
        let open = Arc::new(AtomicBool::new(true));
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE);
        let writer = tokio::spawn(write_frames(sink, rx, open.clone()));
        (
            Self {
                open,
                outbound: tx,
            },
            writer,
        )
    }

    /// Watch the read half and clear the open flag once the peer goes away.
    pub fn watch_disconnect<R>(&self, stream: R) -> JoinHandle<()>
    where
        R: Stream<Item = Result<Message, tungstenite::Error>> + Unpin + Send + 'static,
    {
        let open = self.open.clone();
        tokio::spawn(async move {
            let mut stream = stream;
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(err) => {
                        tracing::debug!(error = %err, "websocket read failed");
                        break;
                    }
                }
            }
            open.store(false, Ordering::SeqCst);
        })
    }
}

#[async_trait]
impl ProgressChannel for WsProgressChannel {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn send_event(&self, event: ServerEvent) -> Result<(), ChannelError> {
        if !self.is_open() {
            return Err(ChannelError::Closed);
        }
        let payload = serde_json::to_string(&event)?;
        self.outbound
            .send(Message::Text(payload))
            .await
            .map_err(|_| ChannelError::Closed)
    }

    async fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            let _ = self.outbound.send(Message::Close(None)).await;
        }
    }
}

async fn write_frames<W>(mut sink: W, mut rx: mpsc::Receiver<Message>, open: Arc<AtomicBool>)
where
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    while let Some(frame) = rx.recv().await {
        let closing = matches!(frame, Message::Close(_));
        if let Err(err) = sink.send(frame).await {
            tracing::debug!(error = %err, "websocket write failed");
            open.store(false, Ordering::SeqCst);
            return;
        }
        if closing {
            return;
        }
    }
    let _ = sink.close().await;
}
