//! Reconnect manager and client facade tests over in-memory links.
//!
//! A channel connector stands in for the `WebSocket`: each successful
//! connect hands the test a [`Peer`] holding the server side of the link.
//! Timer behavior runs on a paused clock.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::arithmetic_side_effects
)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use switchboard_client::{
    ClientError, ConnectionState, Connector, Link, MemoryCache, MirrorState, ReconnectManager,
    SnapshotSource, SwitchClient,
};
use switchboard_types::{Message, Switch, SwitchMap, SwitchStatus, index_by_id};
use tokio::sync::mpsc;
use tokio::time::Instant;

const DELAY: Duration = Duration::from_millis(3000);

/// Server end of one in-memory link.
struct Peer {
    to_client: mpsc::Sender<String>,
    from_client: mpsc::Receiver<String>,
}

impl Peer {
    async fn push(&self, message: &Message) {
        self.to_client
            .send(switchboard_types::encode(message).unwrap())
            .await
            .unwrap();
    }
}

#[derive(Clone)]
struct ChannelConnector {
    attempts: Arc<AtomicUsize>,
    refuse: Arc<AtomicBool>,
    peers: mpsc::UnboundedSender<Peer>,
}

impl ChannelConnector {
    fn new() -> (Self, mpsc::UnboundedReceiver<Peer>) {
        let (peers, rx) = mpsc::unbounded_channel();
        let connector = Self {
            attempts: Arc::new(AtomicUsize::new(0)),
            refuse: Arc::new(AtomicBool::new(false)),
            peers,
        };
        (connector, rx)
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }
}

impl Connector for ChannelConnector {
    async fn connect(&self) -> Result<Link, ClientError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(ClientError::ConnectFailure("connection refused".to_owned()));
        }
        let (outbound, from_client) = mpsc::channel(16);
        let (to_client, inbound) = mpsc::channel(16);
        let _ = self.peers.send(Peer {
            to_client,
            from_client,
        });
        Ok(Link { outbound, inbound })
    }
}

struct FixedSource(SwitchMap);

impl SnapshotSource for FixedSource {
    async fn fetch_snapshot(&self) -> Result<SwitchMap, ClientError> {
        Ok(self.0.clone())
    }
}

fn baseline() -> SwitchMap {
    index_by_id([
        Switch::new("S1", "Switch 1", SwitchStatus::Off),
        Switch::new("S2", "Switch 2", SwitchStatus::Off),
    ])
}

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

async fn wait_for<C: Connector>(manager: &ReconnectManager<C>, target: ConnectionState) {
    manager
        .watch_state()
        .wait_for(|state| *state == target)
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn connect_is_idempotent() {
    let (connector, mut peers) = ChannelConnector::new();
    let manager = ReconnectManager::new(connector.clone(), DELAY);

    manager.connect();
    manager.connect();
    assert_eq!(manager.state(), ConnectionState::Connecting);
    wait_for(&manager, ConnectionState::Connected).await;
    manager.connect();
    settle().await;

    assert_eq!(connector.attempts(), 1);
    assert!(peers.try_recv().is_ok());
    assert!(peers.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn close_schedules_one_retry_after_the_delay() {
    let (connector, mut peers) = ChannelConnector::new();
    let manager = ReconnectManager::new(connector.clone(), DELAY);

    manager.connect();
    wait_for(&manager, ConnectionState::Connected).await;
    assert!(!manager.has_pending_retry());

    let closed_at = Instant::now();
    drop(peers.recv().await.unwrap());
    wait_for(&manager, ConnectionState::Disconnected).await;
    assert!(manager.has_pending_retry());
    assert_eq!(connector.attempts(), 1);

    tokio::time::advance(DELAY - Duration::from_millis(1)).await;
    settle().await;
    assert_eq!(connector.attempts(), 1);

    wait_for(&manager, ConnectionState::Connected).await;
    assert!(closed_at.elapsed() >= DELAY);
    assert_eq!(connector.attempts(), 2);
    assert!(!manager.has_pending_retry());
}

#[tokio::test(start_paused = true)]
async fn repeated_failures_never_stack_retries() {
    let (connector, _peers) = ChannelConnector::new();
    connector.refuse(true);
    let manager = ReconnectManager::new(connector.clone(), DELAY);

    manager.connect();
    settle().await;
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert!(manager.has_pending_retry());

    // A second drop while the first timer is pending replaces it.
    manager.connect();
    settle().await;
    assert_eq!(connector.attempts(), 2);
    assert!(manager.has_pending_retry());

    tokio::time::advance(DELAY).await;
    settle().await;
    assert_eq!(connector.attempts(), 3);

    tokio::time::advance(DELAY).await;
    settle().await;
    assert_eq!(connector.attempts(), 4);
}

#[tokio::test(start_paused = true)]
async fn connect_failure_is_retried_until_it_succeeds() {
    let (connector, mut peers) = ChannelConnector::new();
    connector.refuse(true);
    let manager = ReconnectManager::new(connector.clone(), DELAY);

    manager.connect();
    settle().await;
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    connector.refuse(false);
    wait_for(&manager, ConnectionState::Connected).await;

    assert_eq!(connector.attempts(), 2);
    assert!(!manager.has_pending_retry());
    assert!(peers.try_recv().is_ok());
}

#[tokio::test(start_paused = true)]
async fn disconnect_cancels_pending_retry() {
    let (connector, _peers) = ChannelConnector::new();
    connector.refuse(true);
    let manager = ReconnectManager::new(connector.clone(), DELAY);

    manager.connect();
    settle().await;
    assert!(manager.has_pending_retry());

    manager.disconnect();
    assert!(!manager.has_pending_retry());

    tokio::time::advance(DELAY * 5).await;
    settle().await;
    assert_eq!(connector.attempts(), 1);
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn disconnect_closes_the_live_link_without_retrying() {
    let (connector, mut peers) = ChannelConnector::new();
    let manager = ReconnectManager::new(connector.clone(), DELAY);

    manager.connect();
    wait_for(&manager, ConnectionState::Connected).await;
    let mut peer = peers.recv().await.unwrap();

    manager.disconnect();
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert!(peer.from_client.recv().await.is_none());

    tokio::time::advance(DELAY * 2).await;
    settle().await;
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn send_toggle_requires_a_link() {
    let (connector, mut peers) = ChannelConnector::new();
    let manager = ReconnectManager::new(connector, DELAY);

    let err = manager.send_toggle("S1").await.unwrap_err();
    assert!(matches!(err, ClientError::NotConnected));

    manager.connect();
    wait_for(&manager, ConnectionState::Connected).await;
    let mut peer = peers.recv().await.unwrap();

    manager.send_toggle("S1").await.unwrap();
    let sent = peer.from_client.recv().await.unwrap();
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&sent).unwrap(),
        serde_json::json!({"type": "TOGGLE_SWITCH", "switchId": "S1"})
    );
}

#[tokio::test(start_paused = true)]
async fn listeners_get_decoded_messages_and_bad_frames_are_skipped() {
    let (connector, mut peers) = ChannelConnector::new();
    let manager = ReconnectManager::new(connector, DELAY);

    let received = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let _good = manager.add_listener(move |m| sink.lock().unwrap().push(m.kind()));
    let _bad = manager.add_listener(|_| panic!("listener bug"));

    manager.connect();
    wait_for(&manager, ConnectionState::Connected).await;
    let peer = peers.recv().await.unwrap();

    peer.to_client.send("garbage".to_owned()).await.unwrap();
    peer.to_client
        .send(r#"{"type":"SOMETHING_ELSE"}"#.to_owned())
        .await
        .unwrap();
    peer.push(&Message::Init {
        switches: baseline(),
    })
    .await;
    settle().await;

    assert_eq!(*received.lock().unwrap(), vec![Message::INIT]);
    assert_eq!(manager.state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn client_hydrates_then_follows_the_link() {
    let (connector, mut peers) = ChannelConnector::new();
    let client = SwitchClient::new(connector, MemoryCache::new(), DELAY);

    client.start(&FixedSource(baseline())).await.unwrap();
    assert_eq!(client.mirror_state(), MirrorState::Live);
    assert_eq!(client.switches(), baseline());

    let mut peer = peers.recv().await.unwrap();
    wait_for(client.link(), ConnectionState::Connected).await;

    // Toggling only sends a request.
    client.toggle("S2").await.unwrap();
    let sent = peer.from_client.recv().await.unwrap();
    assert_eq!(
        switchboard_types::decode(sent.as_bytes()).unwrap(),
        Message::toggle("S2")
    );
    assert_eq!(
        client.switches().get("S2").unwrap().status,
        SwitchStatus::Off
    );

    peer.push(&Message::Update {
        switch: Switch::new("S2", "Switch 2", SwitchStatus::On),
    })
    .await;
    settle().await;
    assert_eq!(client.switches().get("S2").unwrap().status, SwitchStatus::On);
    assert_eq!(client.switches().get("S1").unwrap().status, SwitchStatus::Off);
}

#[tokio::test(start_paused = true)]
async fn reconnect_init_replaces_stale_mirror() {
    let (connector, mut peers) = ChannelConnector::new();
    let client = SwitchClient::new(connector, MemoryCache::with_snapshot(baseline()), DELAY);

    client.start(&FixedSource(SwitchMap::new())).await.unwrap();
    assert_eq!(client.switches(), baseline());

    // First link drops, second one delivers a fresh baseline.
    drop(peers.recv().await.unwrap());
    let peer = peers.recv().await.unwrap();
    wait_for(client.link(), ConnectionState::Connected).await;

    let fresh = index_by_id([Switch::new("S1", "Switch 1", SwitchStatus::On)]);
    peer.push(&Message::Init {
        switches: fresh.clone(),
    })
    .await;
    settle().await;

    assert_eq!(client.switches(), fresh);
}
