//! End-to-end tests for the observer `WebSocket`.
//!
//! Each test binds a real server on `127.0.0.1:0` and talks to it with a
//! `tokio-tungstenite` client, so snapshot delivery, fan-out, and inbound
//! toggle handling are exercised through the actual socket path.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::{SinkExt, StreamExt};
use switchboard_server::router::build_router;
use switchboard_server::server::ServerConfig;
use switchboard_server::startup::{RunningServer, spawn_server};
use switchboard_server::state::AppState;
use switchboard_types::{Message, Switch, SwitchStatus, index_by_id};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as Frame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

async fn start() -> (RunningServer, Arc<AppState>) {
    let state = Arc::new(AppState::new([
        Switch::new("S1", "Switch 1", SwitchStatus::Off),
        Switch::new("S2", "Switch 2", SwitchStatus::Off),
    ]));
    let config = ServerConfig {
        host: String::from("127.0.0.1"),
        port: 0,
    };
    let server = spawn_server(&config, Arc::clone(&state)).await.unwrap();
    (server, state)
}

async fn connect(server: &RunningServer) -> Client {
    let url = format!("ws://{}/ws", server.addr);
    let (client, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    client
}

async fn next_message(client: &mut Client) -> Message {
    loop {
        let frame = tokio::time::timeout(WAIT, client.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .unwrap();
        if let Frame::Text(text) = frame {
            return switchboard_types::decode(text.as_str().as_bytes()).unwrap();
        }
    }
}

async fn assert_silent(client: &mut Client) {
    let res = tokio::time::timeout(Duration::from_millis(200), client.next()).await;
    assert!(res.is_err(), "unexpected frame: {res:?}");
}

async fn send(client: &mut Client, text: &str) {
    client.send(Frame::Text(text.to_owned().into())).await.unwrap();
}

async fn wait_for_live(state: &AppState, expected: usize) {
    tokio::time::timeout(WAIT, async {
        while state.hub.len() != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("live connection count never settled");
}

fn update(id: &str, name: &str, status: SwitchStatus) -> Message {
    Message::Update {
        switch: Switch::new(id, name, status),
    }
}

#[tokio::test]
async fn new_connection_gets_snapshot_equal_to_list() {
    let (server, state) = start().await;
    let mut client = connect(&server).await;

    let init = next_message(&mut client).await;
    assert_eq!(
        init,
        Message::Init {
            switches: index_by_id(state.registry.list())
        }
    );
    assert_eq!(state.hub.len(), 1);
}

#[tokio::test]
async fn rest_update_reaches_client_and_later_client_starts_from_new_state() {
    let (server, state) = start().await;

    let mut a = connect(&server).await;
    let Message::Init { switches } = next_message(&mut a).await else {
        panic!("expected INIT first");
    };
    assert!(switches.values().all(|s| s.status == SwitchStatus::Off));

    let response = build_router(Arc::clone(&state))
        .oneshot(
            Request::put("/switches/S1")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"status":"ON"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(
        next_message(&mut a).await,
        update("S1", "Switch 1", SwitchStatus::On)
    );

    let mut b = connect(&server).await;
    let Message::Init { switches } = next_message(&mut b).await else {
        panic!("expected INIT first");
    };
    assert_eq!(switches.get("S1").unwrap().status, SwitchStatus::On);
    assert_eq!(switches.get("S2").unwrap().status, SwitchStatus::Off);
}

#[tokio::test]
async fn toggle_request_is_broadcast_to_all_including_sender() {
    let (server, state) = start().await;
    let mut a = connect(&server).await;
    let mut b = connect(&server).await;
    let _ = next_message(&mut a).await;
    let _ = next_message(&mut b).await;
    wait_for_live(&state, 2).await;

    send(&mut a, r#"{"type":"TOGGLE_SWITCH","switchId":"S2"}"#).await;

    let expected = update("S2", "Switch 2", SwitchStatus::On);
    assert_eq!(next_message(&mut a).await, expected);
    assert_eq!(next_message(&mut b).await, expected);
    assert_silent(&mut a).await;
    assert_eq!(state.registry.get("S2").unwrap().status, SwitchStatus::On);
}

#[tokio::test]
async fn garbage_and_unknown_frames_are_ignored() {
    let (server, state) = start().await;
    let mut a = connect(&server).await;
    let _ = next_message(&mut a).await;

    send(&mut a, "this is not json").await;
    send(&mut a, r#"{"type":"RESET_EVERYTHING"}"#).await;
    send(&mut a, r#"{"type":"TOGGLE_SWITCH"}"#).await;
    send(&mut a, r#"{"type":"TOGGLE_SWITCH","switchId":"NOPE"}"#).await;
    send(
        &mut a,
        r#"{"type":"SWITCH_UPDATE","switch":{"id":"S1","name":"Switch 1","status":"ON"}}"#,
    )
    .await;
    assert_silent(&mut a).await;
    assert_eq!(state.registry.get("S1").unwrap().status, SwitchStatus::Off);

    // The connection is still usable.
    send(&mut a, r#"{"type":"TOGGLE_SWITCH","switchId":"S1"}"#).await;
    assert_eq!(
        next_message(&mut a).await,
        update("S1", "Switch 1", SwitchStatus::On)
    );
}

#[tokio::test]
async fn closing_a_connection_unregisters_it() {
    let (server, state) = start().await;
    let mut a = connect(&server).await;
    let mut b = connect(&server).await;
    let _ = next_message(&mut a).await;
    let _ = next_message(&mut b).await;
    wait_for_live(&state, 2).await;

    a.close(None).await.unwrap();
    wait_for_live(&state, 1).await;

    state.registry.toggle("S1").unwrap();
    assert_eq!(
        next_message(&mut b).await,
        update("S1", "Switch 1", SwitchStatus::On)
    );
}

#[tokio::test]
async fn client_close_is_answered_with_a_close_frame() {
    let (server, state) = start().await;
    let mut client = connect(&server).await;
    let _ = next_message(&mut client).await;
    wait_for_live(&state, 1).await;

    client.close(None).await.unwrap();

    let reply = tokio::time::timeout(WAIT, client.next())
        .await
        .expect("timed out waiting for close reply")
        .expect("stream ended without a close frame")
        .unwrap();
    assert!(matches!(reply, Frame::Close(_)), "unexpected frame: {reply:?}");
    wait_for_live(&state, 0).await;
}

#[tokio::test]
async fn updates_arrive_in_registry_order() {
    let (server, state) = start().await;
    let mut a = connect(&server).await;
    let _ = next_message(&mut a).await;

    for _ in 0..5 {
        state.registry.toggle("S1").unwrap();
    }

    let mut expected = SwitchStatus::Off;
    for _ in 0..5 {
        expected = expected.toggled();
        assert_eq!(
            next_message(&mut a).await,
            update("S1", "Switch 1", expected)
        );
    }
}

#[tokio::test]
async fn other_upgrade_paths_are_not_found() {
    let (server, _state) = start().await;
    let url = format!("ws://{}/not-ws", server.addr);
    assert!(tokio_tungstenite::connect_async(url).await.is_err());
}
