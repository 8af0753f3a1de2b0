//! Gateway tests
//!
//! Router behavior is checked without a socket through `tower::ServiceExt`;
//! the WebSocket flow runs against a real listener with a tungstenite client.

use std::{sync::Arc, time::Duration};

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use futures_util::{SinkExt, StreamExt};
use tempfile::TempDir;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, protocol::frame::coding::CloseCode},
};
use tower::ServiceExt;
use votr_core::{Environment, USER_ENTERED, USER_PLACED_VOTE};
use votr_proto::{Message, MessageKind};
use votr_server::{
    GatewayState, OWNER_GREETING, RoomRegistry, Server, ServerRuntimeConfig, SessionConfig, gateway,
};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

// Test environment using thread RNG
#[derive(Clone)]
struct TestEnv;

impl Environment for TestEnv {
    fn random_bytes(&self, buffer: &mut [u8]) {
        use rand::RngCore;
        rand::thread_rng().fill_bytes(buffer);
    }
}

fn static_dir(index: Option<&str>) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    if let Some(html) = index {
        std::fs::write(dir.path().join("index.html"), html).unwrap();
    }
    dir
}

fn state(static_dir: &TempDir) -> Arc<GatewayState<TestEnv>> {
    Arc::new(GatewayState {
        registry: Arc::new(RoomRegistry::new(TestEnv, 8)),
        env: TestEnv,
        static_dir: static_dir.path().to_path_buf(),
        session: SessionConfig::default(),
    })
}

async fn get(state: &Arc<GatewayState<TestEnv>>, uri: &str) -> axum::response::Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    gateway::router(Arc::clone(state)).oneshot(request).await.unwrap()
}

fn location(response: &axum::response::Response) -> &str {
    response.headers().get(header::LOCATION).unwrap().to_str().unwrap()
}

#[tokio::test]
async fn root_without_room_creates_one_and_redirects() {
    let dir = static_dir(None);
    let state = state(&dir);

    let response = get(&state, "/").await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let target = location(&response).to_owned();
    let id = target.strip_prefix("/?r=").unwrap();
    assert!(state.registry.contains(&id.into()).await);
    assert_eq!(state.registry.stats().await.rooms, 1);
}

#[tokio::test]
async fn root_with_unknown_room_redirects_home() {
    let dir = static_dir(None);
    let state = state(&dir);

    let response = get(&state, "/?r=nosuch").await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/");
    assert_eq!(state.registry.stats().await.rooms, 0);
}

#[tokio::test]
async fn root_with_known_room_serves_page() {
    let dir = static_dir(Some("<html>votr</html>"));
    let state = state(&dir);
    let id = state.registry.create_room().await.unwrap();

    let response = get(&state, &format!("/?r={id}")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(&body[..], b"<html>votr</html>");
}

#[tokio::test]
async fn root_without_page_is_not_found() {
    let dir = static_dir(None);
    let state = state(&dir);
    let id = state.registry.create_room().await.unwrap();

    let response = get(&state, &format!("/?r={id}")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

async fn start_server() -> (String, Arc<RoomRegistry<votr_server::SystemEnv>>) {
    let config = ServerRuntimeConfig {
        bind_address: "127.0.0.1:0".to_string(),
        ..ServerRuntimeConfig::default()
    };
    let server = Server::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let registry = server.registry();
    tokio::spawn(server.run());
    (format!("ws://{addr}/ws"), registry)
}

/// Next application message, skipping keepalive frames.
async fn next(client: &mut Client) -> Message {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for a message")
            .expect("connection ended")
            .unwrap();
        match frame {
            tungstenite::Message::Text(text) => return Message::decode(&text).unwrap(),
            tungstenite::Message::Ping(_) | tungstenite::Message::Pong(_) => {},
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn send(client: &mut Client, message: Message) {
    client.send(tungstenite::Message::Text(message.encode().unwrap())).await.unwrap();
}

#[tokio::test]
async fn websocket_round_trip() {
    let (url, registry) = start_server().await;
    let room = registry.create_room().await.unwrap();
    let room_url = format!("{url}?r={room}");

    let (mut owner, _) = connect_async(room_url.as_str()).await.unwrap();
    let greeting = next(&mut owner).await;
    assert_eq!(greeting.kind, MessageKind::Status);
    assert_eq!(greeting.value, OWNER_GREETING);
    let secret = greeting.secret.expect("owner receives the secret");
    assert_eq!(next(&mut owner).await.value, USER_ENTERED);

    let (mut guest, _) = connect_async(room_url.as_str()).await.unwrap();
    let entered = next(&mut guest).await;
    assert_eq!(entered.value, USER_ENTERED);
    assert_eq!(entered.user_count, 2);
    assert_eq!(entered.secret, None);
    assert_eq!(next(&mut owner).await.user_count, 2);

    send(&mut owner, Message::vote("5")).await;
    for client in [&mut owner, &mut guest] {
        let msg = next(client).await;
        assert_eq!(msg.value, USER_PLACED_VOTE);
        assert_eq!(msg.vote_count, 1);
    }

    send(&mut guest, Message::vote("5")).await;
    for client in [&mut owner, &mut guest] {
        assert_eq!(next(client).await.vote_count, 2);
    }

    send(&mut owner, Message::reveal("").with_secret(secret)).await;
    for client in [&mut owner, &mut guest] {
        let msg = next(client).await;
        assert_eq!(msg.kind, MessageKind::Reveal);
        assert_eq!(msg.value, "5, 5");
        assert_eq!(msg.vote_count, 0);
    }
}

#[tokio::test]
async fn websocket_without_room_is_rejected() {
    let (url, _registry) = start_server().await;

    let err = connect_async(url.as_str()).await.unwrap_err();

    match err {
        tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        },
        other => panic!("expected HTTP error, got {other:?}"),
    }
}

#[tokio::test]
async fn websocket_to_unknown_room_is_closed() {
    let (url, _registry) = start_server().await;

    let (mut client, _) = connect_async(format!("{url}?r=ghost")).await.unwrap();

    match client.next().await {
        Some(Ok(tungstenite::Message::Close(Some(frame)))) => {
            assert_eq!(frame.code, CloseCode::Policy);
        },
        other => panic!("expected close frame, got {other:?}"),
    }
}

#[tokio::test]
async fn disconnect_removes_member() {
    let (url, registry) = start_server().await;
    let room = registry.create_room().await.unwrap();

    let (mut client, _) = connect_async(format!("{url}?r={room}")).await.unwrap();
    next(&mut client).await;
    assert_eq!(registry.stats().await.members, 1);

    client.close(None).await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while registry.stats().await.members != 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert!(registry.contains(&room).await);
}
