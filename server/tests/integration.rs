//! Integration tests for the arena server.
//!
//! These tests start a real server instance and connect via WebSocket
//! to verify end-to-end behavior.

use arena_server::access::{KnownRooms, TrustedHeader};
use arena_server::config::ServerConfig;
use arena_server::engine::Engine;
use arena_server::ws::{router, AppState};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{connect_async, tungstenite, tungstenite::Message};

type Ws = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<TcpStream>>;

struct TestServer {
    addr: String,
    engine: std::sync::Arc<Engine>,
}

impl TestServer {
    fn url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.engine.shutdown();
    }
}

fn test_config() -> ServerConfig {
    ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        spawn_interval: Duration::from_secs(3600),
        ..Default::default()
    }
}

/// Start a test server on a random available port.
async fn start_test_server(config: ServerConfig) -> TestServer {
    start_test_server_with(config, |_| {}).await
}

/// Like `start_test_server`, with a hook to swap the access collaborators.
async fn start_test_server_with(
    config: ServerConfig,
    configure: impl FnOnce(&mut AppState),
) -> TestServer {
    let listener = TcpListener::bind(&config.listen_addr).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let engine = Engine::new(config);
    engine.start();

    let mut app_state = AppState::new(engine.clone());
    configure(&mut app_state);
    let app = router(app_state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        addr: addr.to_string(),
        engine,
    }
}

async fn connect(url: &str) -> Ws {
    let (ws, _) = connect_async(url).await.expect("Failed to connect");
    ws
}

/// Read the next text message as JSON.
async fn recv_json(ws: &mut Ws) -> Value {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                return serde_json::from_str(&text).expect("Failed to parse server message");
            }
            Some(Ok(_)) => continue, // Skip ping/pong
            Some(Err(e)) => panic!("WebSocket error: {}", e),
            None => panic!("WebSocket closed unexpectedly"),
        }
    }
}

/// Read messages until one satisfies `pred`, or give up after `timeout`.
async fn recv_until(
    ws: &mut Ws,
    timeout: Duration,
    pred: impl Fn(&Value) -> bool,
) -> Option<Value> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.checked_duration_since(Instant::now())?;
        match tokio::time::timeout(remaining, recv_json(ws)).await {
            Ok(msg) if pred(&msg) => return Some(msg),
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
}

async fn recv_init_id(ws: &mut Ws) -> String {
    let msg = recv_json(ws).await;
    assert_eq!(msg["type"], "init", "Expected init, got {}", msg);
    msg["id"].as_str().expect("init id").to_string()
}

fn is_snapshot(msg: &Value) -> bool {
    msg.get("players").is_some() && msg.get("bullets").is_some() && msg.get("enemies").is_some()
}

/// HTTP status of a refused upgrade.
async fn rejected_status(request: tungstenite::handshake::client::Request) -> u16 {
    match connect_async(request).await {
        Err(tungstenite::Error::Http(response)) => response.status().as_u16(),
        Err(e) => panic!("Expected HTTP rejection, got {}", e),
        Ok(_) => panic!("Upgrade should have been refused"),
    }
}

async fn send_json(ws: &mut Ws, value: Value) {
    ws.send(Message::Text(value.to_string().into())).await.unwrap();
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_connect_and_receive_init() {
    let server = start_test_server(test_config()).await;
    let mut ws = connect(&server.url()).await;

    let id = recv_init_id(&mut ws).await;
    assert!(!id.is_empty(), "init id should be non-empty");

    let snapshot = recv_until(&mut ws, Duration::from_secs(1), is_snapshot)
        .await
        .expect("No snapshot received");
    let me = &snapshot["players"][&id];
    assert_eq!(me["health"], 100);
    assert_eq!(me["x"], 100.0);
    assert_eq!(me["y"], 100.0);
}

#[tokio::test]
async fn test_multiple_clients_get_unique_ids() {
    let server = start_test_server(test_config()).await;
    let mut ws1 = connect(&server.url()).await;
    let mut ws2 = connect(&server.url()).await;

    let id1 = recv_init_id(&mut ws1).await;
    let id2 = recv_init_id(&mut ws2).await;
    assert_ne!(id1, id2, "Each client should get a unique ID");
}

#[tokio::test]
async fn test_shot_bullet_travels_and_expires() {
    let server = start_test_server(test_config()).await;
    let mut ws = connect(&server.url()).await;
    let _id = recv_init_id(&mut ws).await;

    send_json(&mut ws, serde_json::json!({"action": "shoot", "dirX": 1, "dirY": 0})).await;

    let has_bullet = |m: &Value| {
        is_snapshot(m) && m["bullets"].as_object().is_some_and(|b| !b.is_empty())
    };
    let first = recv_until(&mut ws, Duration::from_secs(1), has_bullet)
        .await
        .expect("Bullet should appear after shoot");
    let (bullet_id, bullet) = first["bullets"].as_object().unwrap().iter().next().unwrap();
    let x0 = bullet["x"].as_f64().unwrap();
    let y0 = bullet["y"].as_f64().unwrap();
    assert!((x0 - 100.0).abs() <= 30.0, "bullet x {} not near spawn", x0);
    assert!((y0 - 100.0).abs() < 1e-6);

    let bullet_id = bullet_id.clone();
    let later = recv_until(&mut ws, Duration::from_secs(1), |m| {
        is_snapshot(m) && m["bullets"][&bullet_id]["x"].as_f64().is_some_and(|x| x > x0)
    })
    .await;
    assert!(later.is_some(), "bullet should move in +x");

    // 10 units/tick from x=100 leaves the inflated bounds (x > 900) in ~80 ticks
    let gone = recv_until(&mut ws, Duration::from_secs(4), |m| {
        is_snapshot(m) && m["bullets"].get(&bullet_id).is_none()
    })
    .await;
    assert!(gone.is_some(), "bullet should be pruned after leaving bounds");
}

#[tokio::test]
async fn test_malformed_input_keeps_connection_open() {
    let server = start_test_server(test_config()).await;
    let mut ws = connect(&server.url()).await;
    let _id = recv_init_id(&mut ws).await;

    ws.send(Message::Text("not valid json".into())).await.unwrap();
    send_json(&mut ws, serde_json::json!({"action": "dance"})).await;
    send_json(&mut ws, serde_json::json!({"action": "move", "velocityX": "fast"})).await;

    // Still alive and still accepting input
    send_json(&mut ws, serde_json::json!({"action": "shoot", "dirX": 0, "dirY": 1})).await;
    let found = recv_until(&mut ws, Duration::from_secs(1), |m| {
        is_snapshot(m) && m["bullets"].as_object().is_some_and(|b| !b.is_empty())
    })
    .await;
    assert!(found.is_some(), "Valid input after garbage should still work");
}

#[tokio::test]
async fn test_move_changes_position() {
    let server = start_test_server(test_config()).await;
    let mut ws = connect(&server.url()).await;
    let id = recv_init_id(&mut ws).await;

    send_json(
        &mut ws,
        serde_json::json!({"action": "move", "velocityX": 1, "velocityY": 0}),
    )
    .await;

    let moved = recv_until(&mut ws, Duration::from_secs(1), |m| {
        is_snapshot(m) && m["players"][&id]["x"].as_f64().is_some_and(|x| x > 110.0)
    })
    .await
    .expect("player should move right");
    assert_eq!(moved["players"][&id]["y"], 100.0);
}

#[tokio::test]
async fn test_player_disconnect_removes_only_that_player() {
    let server = start_test_server(test_config()).await;
    let mut ws1 = connect(&server.url()).await;
    let mut ws2 = connect(&server.url()).await;
    let id1 = recv_init_id(&mut ws1).await;
    let id2 = recv_init_id(&mut ws2).await;

    ws1.close(None).await.unwrap();

    let snapshot = recv_until(&mut ws2, Duration::from_secs(2), |m| {
        is_snapshot(m) && m["players"].get(&id1).is_none()
    })
    .await
    .expect("Disconnected player should be removed from snapshots");
    assert_eq!(snapshot["players"][&id2]["health"], 100);
    assert_eq!(snapshot["players"].as_object().unwrap().len(), 1);
}

#[tokio::test]
async fn test_agent_spawns_outside_field() {
    let config = ServerConfig {
        spawn_interval: Duration::from_millis(300),
        ..test_config()
    };
    let arena = config.arena;
    let server = start_test_server(config).await;
    let mut ws = connect(&server.url()).await;
    let _id = recv_init_id(&mut ws).await;

    let snapshot = recv_until(&mut ws, Duration::from_secs(1), |m| {
        is_snapshot(m) && m["enemies"].as_object().is_some_and(|e| !e.is_empty())
    })
    .await
    .expect("An agent should spawn within one interval");

    let enemies = snapshot["enemies"].as_object().unwrap();
    assert_eq!(enemies.len(), 1);
    let agent = enemies.values().next().unwrap();
    assert_eq!(agent["health"], 30);
    let (x, y) = (agent["x"].as_f64().unwrap(), agent["y"].as_f64().unwrap());
    assert!(!arena.in_field(x, y), "agent at ({}, {}) spawned inside the field", x, y);
}

#[tokio::test]
async fn test_room_join_event() {
    let server = start_test_server(test_config()).await;
    let url = format!("{}?roomId=lobby", server.url());
    let mut ws1 = connect(&url).await;
    let _id1 = recv_init_id(&mut ws1).await;

    let mut ws2 = connect(&url).await;
    let id2 = recv_init_id(&mut ws2).await;

    let event = recv_until(&mut ws1, Duration::from_secs(1), |m| {
        m["type"] == "player_joined" && m["payload"]["id"] == id2.as_str()
    })
    .await
    .expect("Room member should be told about the newcomer");
    assert_eq!(event["roomId"], "lobby");
}

#[tokio::test]
async fn test_connection_limit() {
    let config = ServerConfig {
        max_connections: 1,
        ..test_config()
    };
    let server = start_test_server(config).await;
    let mut ws1 = connect(&server.url()).await;
    let _id = recv_init_id(&mut ws1).await;

    assert!(
        connect_async(server.url()).await.is_err(),
        "Second connection should be refused"
    );
}

#[tokio::test]
async fn test_health_endpoint_reports_counts() {
    let server = start_test_server(test_config()).await;
    let mut ws = connect(&server.url()).await;
    let _id = recv_init_id(&mut ws).await;

    let mut stream = TcpStream::connect(&server.addr).await.unwrap();
    let request = format!(
        "GET /health HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        server.addr
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"));
    let body = response.split("\r\n\r\n").nth(1).unwrap();
    let stats: Value = serde_json::from_str(body).unwrap();
    assert_eq!(stats["players"], 1);
    assert_eq!(stats["sessions"], 1);
}

#[tokio::test]
async fn test_room_leave_event() {
    let server = start_test_server(test_config()).await;
    let url = format!("{}?roomId=lobby", server.url());
    let mut ws1 = connect(&url).await;
    let _id1 = recv_init_id(&mut ws1).await;
    let mut ws2 = connect(&url).await;
    let id2 = recv_init_id(&mut ws2).await;

    ws2.close(None).await.unwrap();

    let event = recv_until(&mut ws1, Duration::from_secs(2), |m| {
        m["type"] == "player_left" && m["payload"]["id"] == id2.as_str()
    })
    .await
    .expect("Room member should be told when someone leaves");
    assert_eq!(event["roomId"], "lobby");
}

fn guarded(app_state: &mut AppState) {
    app_state.identity = std::sync::Arc::new(TrustedHeader { header: "x-user-id" });
    app_state.rooms = std::sync::Arc::new(KnownRooms(["lobby".to_string()].into()));
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let server = start_test_server_with(test_config(), guarded).await;
    let request = format!("{}?roomId=lobby", server.url())
        .into_client_request()
        .unwrap();
    assert_eq!(rejected_status(request).await, 401);
    assert_eq!(server.engine.stats().players, 0);
}

#[tokio::test]
async fn test_unknown_room_is_not_found() {
    let server = start_test_server_with(test_config(), guarded).await;
    let mut request = format!("{}?roomId=cellar", server.url())
        .into_client_request()
        .unwrap();
    request
        .headers_mut()
        .insert("x-user-id", "alice".parse().unwrap());
    assert_eq!(rejected_status(request).await, 404);
    assert_eq!(server.engine.stats().players, 0);
}

#[tokio::test]
async fn test_known_user_and_room_are_admitted() {
    let server = start_test_server_with(test_config(), guarded).await;
    let mut request = format!("{}?roomId=lobby", server.url())
        .into_client_request()
        .unwrap();
    request
        .headers_mut()
        .insert("x-user-id", "alice".parse().unwrap());
    let (mut ws, _) = connect_async(request).await.expect("Failed to connect");

    let id = recv_init_id(&mut ws).await;
    assert!(!id.is_empty());
    assert_eq!(server.engine.stats().players, 1);
}

#[tokio::test]
async fn test_silent_client_times_out() {
    let config = ServerConfig {
        read_timeout: Duration::from_millis(300),
        ping_interval: Duration::from_millis(100),
        ..test_config()
    };
    let server = start_test_server(config).await;
    let mut silent = connect(&server.url()).await;
    let silent_id = recv_init_id(&mut silent).await;
    let mut reader = connect(&server.url()).await;
    let reader_id = recv_init_id(&mut reader).await;

    // Reading keeps answering pings, which resets the server's read deadline
    let snapshot = recv_until(&mut reader, Duration::from_secs(2), |m| {
        is_snapshot(m) && m["players"].get(&silent_id).is_none()
    })
    .await
    .expect("Silent client should be dropped after the read timeout");
    assert!(snapshot["players"].get(&reader_id).is_some());

    // Well past three read timeouts the reading client is still connected
    assert!(recv_until(&mut reader, Duration::from_millis(900), |_| false)
        .await
        .is_none());
    let stats = server.engine.stats();
    assert_eq!(stats.players, 1);
    assert_eq!(stats.sessions, 1);
}
