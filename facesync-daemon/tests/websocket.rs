use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Notify};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use facesync_core::{Config, Contact, ContactId, PhotoPayload, SessionId};
use facesync_daemon::{serve, DaemonError, ServerState, SessionClients, SessionFactory, SnapshotFactory};
use facesync_sync::{ClientError, DirectoryClient, MessagingClient};

struct Fixture {
    dir: TempDir,
    factory: SnapshotFactory,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = dir.path();
        fs::create_dir_all(root.join("avatars")).expect("avatars dir");
        fs::write(
            root.join("directory.json"),
            r#"[
                {"id": "people/c1", "numbers": ["+1 555 0100"], "has_photo": false},
                {"id": "people/c2", "numbers": ["+15550199"], "has_photo": false}
            ]"#,
        )
        .expect("directory contacts");
        fs::write(
            root.join("messaging.json"),
            r#"[{"id": "w1", "numbers": ["+15550100"], "has_photo": true}]"#,
        )
        .expect("messaging contacts");
        fs::write(root.join("avatars").join("w1.jpg"), b"avatar-bytes").expect("avatar");

        let factory = SnapshotFactory {
            directory_contacts: root.join("directory.json"),
            directory_photos: root.join("uploaded"),
            messaging_contacts: root.join("messaging.json"),
            messaging_photos: root.join("avatars"),
        };
        Self { dir, factory }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }
}

async fn start(factory: impl SessionFactory + 'static) -> (String, broadcast::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let state = Arc::new(ServerState::new(Config::default(), Arc::new(factory)));
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(serve(listener, state, shutdown_rx));
    (format!("ws://{addr}"), shutdown_tx)
}

/// Collect text frames as JSON until the server closes the connection.
async fn collect_events<S>(ws: &mut S) -> Vec<Value>
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + Unpin,
{
    let mut events = Vec::new();
    while let Some(frame) = ws.next().await {
        match frame.expect("frame") {
            Message::Text(text) => events.push(serde_json::from_str(&text).expect("json")),
            Message::Close(_) => break,
            _ => continue,
        }
    }
    events
}

#[tokio::test]
async fn full_sync_over_websocket() {
    let fixture = Fixture::new();
    let (url, shutdown) = start(fixture.factory.clone()).await;

    let (mut ws, _) = connect_async(url.as_str()).await.expect("connect");
    ws.send(Message::Text(
        r#"{"type":"startSync","sessionId":"s1"}"#.to_string(),
    ))
    .await
    .expect("send startSync");

    let events = collect_events(&mut ws).await;
    assert_eq!(events.len(), 3, "events: {events:?}");
    assert!(events.iter().all(|e| e["type"] == "syncProgress"));

    let first = &events[0]["data"];
    assert_eq!(first["progress"], 0.0);
    assert_eq!(first["syncCount"], 1);
    assert_eq!(first["totalContacts"], 2);
    assert!(first["image"].is_string());

    let second = &events[1]["data"];
    assert_eq!(second["progress"], 50.0);
    assert!(second["image"].is_null());

    let last = &events[2]["data"];
    assert_eq!(last["progress"], 100.0);
    assert_eq!(last["syncCount"], 1);
    assert!(last.get("totalContacts").is_none());
    assert!(last.get("image").is_none());

    let uploaded = fs::read(fixture.root().join("uploaded").join("people_2Fc1.jpg"))
        .expect("uploaded photo");
    assert_eq!(uploaded, b"avatar-bytes");

    let _ = shutdown.send(());
}

#[tokio::test]
async fn binary_first_frame_gets_protocol_error() {
    let fixture = Fixture::new();
    let (url, shutdown) = start(fixture.factory.clone()).await;

    let (mut ws, _) = connect_async(url.as_str()).await.expect("connect");
    ws.send(Message::Binary(vec![0xde, 0xad]))
        .await
        .expect("send binary");

    let events = collect_events(&mut ws).await;
    assert_eq!(events.len(), 1, "events: {events:?}");
    assert_eq!(events[0]["type"], "syncError");
    assert_eq!(events[0]["data"]["kind"], "protocol");

    let _ = shutdown.send(());
}

#[tokio::test]
async fn unreadable_snapshot_is_reported_as_fatal() {
    let fixture = Fixture::new();
    let mut factory = fixture.factory.clone();
    factory.messaging_contacts = fixture.root().join("missing.json");
    let (url, shutdown) = start(factory).await;

    let (mut ws, _) = connect_async(url.as_str()).await.expect("connect");
    ws.send(Message::Text(
        r#"{"type":"startSync","sessionId":"s2"}"#.to_string(),
    ))
    .await
    .expect("send startSync");

    let events = collect_events(&mut ws).await;
    assert_eq!(events.len(), 1, "events: {events:?}");
    assert_eq!(events[0]["type"], "syncError");
    assert_eq!(events[0]["data"]["kind"], "fatal");
    assert!(events[0]["data"]["message"]
        .as_str()
        .is_some_and(|m| m.contains("missing.json")));

    let _ = shutdown.send(());
}

/// Messaging client whose contact fetch parks until the test releases it.
struct Gated {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl MessagingClient for Gated {
    async fn load_contacts(&self) -> Result<Vec<Contact>, ClientError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(Vec::new())
    }

    async fn download_photo(
        &self,
        _contact_id: &ContactId,
    ) -> Result<Option<PhotoPayload>, ClientError> {
        Ok(None)
    }
}

struct EmptyDirectory;

#[async_trait]
impl DirectoryClient for EmptyDirectory {
    async fn list_contacts(&self) -> Result<Vec<Contact>, ClientError> {
        Ok(Vec::new())
    }

    async fn update_contact_photo(
        &self,
        _contact_id: &ContactId,
        _photo: &PhotoPayload,
    ) -> Result<(), ClientError> {
        Ok(())
    }
}

struct GatedFactory {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl SessionFactory for GatedFactory {
    async fn open(&self, _session_id: &SessionId) -> Result<SessionClients, DaemonError> {
        Ok(SessionClients {
            messaging: Arc::new(Gated {
                entered: self.entered.clone(),
                release: self.release.clone(),
            }),
            directory: Arc::new(EmptyDirectory),
        })
    }
}

#[tokio::test]
async fn duplicate_active_session_is_rejected_as_protocol_error() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let (url, shutdown) = start(GatedFactory {
        entered: entered.clone(),
        release: release.clone(),
    })
    .await;
    let start_sync = r#"{"type":"startSync","sessionId":"dup"}"#;

    let (mut first, _) = connect_async(url.as_str()).await.expect("connect first");
    first
        .send(Message::Text(start_sync.to_string()))
        .await
        .expect("send first startSync");
    // The first session is registered once its sync starts loading contacts.
    entered.notified().await;

    let (mut second, _) = connect_async(url.as_str()).await.expect("connect second");
    second
        .send(Message::Text(start_sync.to_string()))
        .await
        .expect("send second startSync");

    let rejected = collect_events(&mut second).await;
    assert_eq!(rejected.len(), 1, "events: {rejected:?}");
    assert_eq!(rejected[0]["type"], "syncError");
    assert_eq!(rejected[0]["data"]["kind"], "protocol");
    assert!(rejected[0]["data"]["message"]
        .as_str()
        .is_some_and(|m| m.contains("dup")));

    release.notify_one();
    let finished = collect_events(&mut first).await;
    assert_eq!(finished.len(), 1, "events: {finished:?}");
    assert_eq!(finished[0]["type"], "syncProgress");
    assert_eq!(finished[0]["data"]["progress"], 100.0);

    let _ = shutdown.send(());
}
