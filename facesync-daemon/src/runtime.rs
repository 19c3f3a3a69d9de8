//! Accept loop and per-connection session lifecycle for the progress server.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, WebSocketStream};

use facesync_core::{ClientRequest, Config, FailureKind, SyncFailure};
use facesync_sync::{run_sync, ProgressChannel, SessionHandles, SessionRegistry, SyncReport};

use crate::channel::WsProgressChannel;
use crate::error::DaemonError;
use crate::factory::SessionFactory;
use crate::protocol::read_request;

/// Everything a connection handler needs.
pub struct ServerState {
    pub registry: SessionRegistry,
    pub config: Config,
    pub factory: Arc<dyn SessionFactory>,
}

impl ServerState {
    pub fn new(config: Config, factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            registry: SessionRegistry::new(),
            config,
            factory,
        }
    }
}

/// Start the progress server and block the current thread until it exits.
pub fn start_blocking(config: Config, factory: Arc<dyn SessionFactory>) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(config, factory))
}

/// Bind the configured address and serve until ctrl-c.
pub async fn run(config: Config, factory: Arc<dyn SessionFactory>) -> Result<(), DaemonError> {
    let addr = config.listen_addr;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| DaemonError::Bind { addr, source })?;
    tracing::info!(addr = %addr, "progress server listening");

    let state = Arc::new(ServerState::new(config, factory));
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let server_handle = {
        let shutdown = shutdown_tx.clone();
        let state = state.clone();
        tokio::spawn(async move {
            let result = serve(listener, state, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down progress server");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Io(err)),
                    }
                }
            }
        })
    };

    let (server_result, signal_result) = tokio::join!(server_handle, signal_handle);
    handle_join("progress_server", server_result)?;
    handle_join("signal_handler", signal_result)?;

    let remaining = state.registry.len().await;
    if remaining > 0 {
        tracing::warn!(sessions = remaining, "shutting down with sessions still running");
    }
    Ok(())
}

/// Accept websocket connections on `listener` until `shutdown_rx` fires.
pub async fn serve(
    listener: TcpListener,
    state: Arc<ServerState>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                let state = state.clone();
                tokio::spawn(async move {
                    let ws = match accept_async(stream).await {
                        Ok(ws) => ws,
                        Err(err) => {
                            tracing::warn!(peer = %peer, error = %err, "websocket handshake failed");
                            return;
                        }
                    };
                    if let Err(err) = handle_connection(ws, peer, state).await {
                        tracing::warn!(peer = %peer, error = %err, "connection ended with error");
                    }
                });
            }
        }
    }
    Ok(())
}

/// Drive one connection: read `startSync`, register the session, run the
/// sync, and deregister whatever the outcome.
pub async fn handle_connection<S>(
    ws: WebSocketStream<S>,
    peer: SocketAddr,
    state: Arc<ServerState>,
) -> Result<Option<SyncReport>, DaemonError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (sink, mut stream) = ws.split();
    let (channel, writer) = WsProgressChannel::spawn(sink);
    let channel = Arc::new(channel);

    let request = match read_request(&mut stream).await {
        Ok(request) => request,
        Err(err) => {
            reject(channel.as_ref(), FailureKind::Protocol, &err).await;
            return Err(err);
        }
    };
    let ClientRequest::StartSync {
        session_id,
        options,
    } = request;
    tracing::info!(peer = %peer, session = %session_id, "sync requested");

    let watcher = channel.watch_disconnect(stream);

    let clients = match state.factory.open(&session_id).await {
        Ok(clients) => clients,
        Err(err) => {
            reject(channel.as_ref(), FailureKind::Fatal, &err).await;
            watcher.abort();
            return Err(err);
        }
    };

    let handles = SessionHandles {
        channel: channel.clone(),
        messaging: clients.messaging,
        directory: clients.directory,
    };
    if let Err(err) = state.registry.insert(session_id.clone(), handles).await {
        let err = DaemonError::from(err);
        reject(channel.as_ref(), FailureKind::Protocol, &err).await;
        watcher.abort();
        return Err(err);
    }

    let result = run_sync(&state.registry, &session_id, &options, &state.config).await;
    state.registry.remove(&session_id).await;
    watcher.abort();
    drop(channel);
    let _ = writer.await;

    // Terminal failures were already reported to the client by the sync.
    match result {
        Ok(report) => Ok(Some(report)),
        Err(err) => {
            tracing::warn!(session = %session_id, error = %err, "session ended with error");
            Ok(None)
        }
    }
}

async fn reject(channel: &dyn ProgressChannel, kind: FailureKind, err: &DaemonError) {
    let failure = SyncFailure::new(kind, err.to_string());
    if let Err(send_err) = channel.close_with_error(failure).await {
        tracing::debug!(error = %send_err, "rejection not delivered");
    }
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

/// Install the fmt subscriber on stderr; `RUST_LOG` overrides the `info`
/// default.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
