use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use uuid::Uuid;

use crate::access::{AllowAnonymous, AnyRoom, IdentityFilter, RoomDirectory, UserIdentity};
use crate::engine::Engine;
use crate::protocol::decode_input;
use crate::session::Session;

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub identity: Arc<dyn IdentityFilter>,
    pub rooms: Arc<dyn RoomDirectory>,
    pub connection_semaphore: Arc<Semaphore>,
}

impl AppState {
    /// Anonymous access to any room, capped at the configured connection limit.
    pub fn new(engine: Arc<Engine>) -> Self {
        let max_connections = engine.config().max_connections;
        Self {
            engine,
            identity: Arc::new(AllowAnonymous),
            rooms: Arc::new(AnyRoom),
            connection_semaphore: Arc::new(Semaphore::new(max_connections)),
        }
    }
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct ConnectParams {
    #[serde(rename = "roomId")]
    pub room_id: Option<String>,
}

/// Routes: `/ws` for the game socket, `/health` for live counts.
pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}

async fn health_handler(State(app_state): State<AppState>) -> impl IntoResponse {
    Json(app_state.engine.stats())
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
    State(app_state): State<AppState>,
) -> Response {
    let Some(user) = app_state.identity.verify(&headers) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    if let Some(room_id) = &params.room_id {
        if !app_state.rooms.room_exists(room_id) {
            return StatusCode::NOT_FOUND.into_response();
        }
    }

    let permit = match app_state.connection_semaphore.clone().try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            tracing::warn!("Connection limit reached, rejecting upgrade");
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    };

    ws.on_upgrade(move |socket| {
        handle_socket(socket, app_state.engine, params.room_id, user, permit)
    })
}

async fn handle_socket(
    socket: WebSocket,
    engine: Arc<Engine>,
    room_id: Option<String>,
    user: UserIdentity,
    _permit: OwnedSemaphorePermit,
) {
    let config = engine.config().clone();
    let (sink, mut stream) = socket.split();

    let id = Uuid::new_v4().to_string();
    let session = Arc::new(Session::new(
        id.clone(),
        room_id,
        user,
        Box::pin(sink),
        config.write_timeout,
    ));

    if let Err(e) = engine.admit(&session).await {
        tracing::warn!("Failed to admit {}: {}", id, e);
        engine.disconnect(&id);
        return;
    }
    tracing::info!(
        "Player {} connected ({:?}, room {:?})",
        id,
        session.user(),
        session.room_id()
    );

    let keepalive = tokio::spawn(run_keepalive(session.clone(), config.ping_interval));

    loop {
        tokio::select! {
            _ = session.closed() => break,

            // Any inbound frame, pongs included, resets the read deadline
            msg = tokio::time::timeout(config.read_timeout, stream.next()) => {
                match msg {
                    Ok(Some(Ok(Message::Text(text)))) => match decode_input(text.as_str()) {
                        Ok(event) => engine.apply_input(&id, event),
                        Err(e) => tracing::debug!("Dropped input from {}: {}", id, e),
                    },
                    Ok(Some(Ok(Message::Close(_)))) | Ok(None) => break,
                    Ok(Some(Ok(_))) => {}
                    Ok(Some(Err(e))) => {
                        tracing::debug!("Read error from {}: {}", id, e);
                        break;
                    }
                    Err(_) => {
                        tracing::info!("Player {} timed out", id);
                        break;
                    }
                }
            }
        }
    }

    // Cleanup on disconnect
    keepalive.abort();
    engine.disconnect(&id);
    tracing::debug!(
        "Session {} lasted {:.1}s",
        id,
        session.created_at().elapsed().as_secs_f64()
    );
    session.shutdown_transport().await;
}

/// Ping every `period`; a failed or timed-out ping closes the session.
async fn run_keepalive(session: Arc<Session>, period: Duration) {
    let mut ping_interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    loop {
        ping_interval.tick().await;
        if let Err(e) = session.send(Message::Ping(Vec::new().into())).await {
            tracing::debug!("Ping to {} failed: {}", session.id(), e);
            break;
        }
    }
}
