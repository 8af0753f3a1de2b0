//! HTTP and WebSocket gateway.
//!
//! Routes:
//!
//! - `GET /`: without `?r=` creates a room and redirects to it; with an
//!   unknown room redirects back to `/`; otherwise serves the client page
//! - `GET /ws?r=<id>`: upgrades to a WebSocket and joins the room
//! - `GET /static/*`: client assets
//!
//! Joining follows a fixed order: the member's delivery channel exists
//! first, the room registers the member, then the session starts both
//! pumps, and only then is the "user entered" status sent into the room.

use std::{path::PathBuf, sync::Arc};

use axum::{
    Router,
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{CloseFrame, Message as WsMessage, WebSocket, close_code},
    },
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use futures_util::StreamExt;
use serde::Deserialize;
use tower_http::services::ServeDir;
use votr_core::{Environment, Inbound, RoomId, SessionId, USER_ENTERED};
use votr_proto::Message;

use crate::{
    registry::RoomRegistry,
    session::{self, SessionConfig},
};

/// Shared state of the gateway handlers.
#[derive(Debug)]
pub struct GatewayState<E> {
    /// Room registry
    pub registry: Arc<RoomRegistry<E>>,
    /// Source of session identifiers
    pub env: E,
    /// Directory holding `index.html` and client assets
    pub static_dir: PathBuf,
    /// Settings for every member session
    pub session: SessionConfig,
}

/// `?r=<room id>` query parameter.
#[derive(Debug, Deserialize)]
struct RoomQuery {
    r: Option<String>,
}

impl RoomQuery {
    fn room_id(self) -> Option<RoomId> {
        self.r.filter(|r| !r.is_empty()).map(RoomId::from)
    }
}

/// Build the gateway router.
pub fn router<E: Environment>(state: Arc<GatewayState<E>>) -> Router {
    let assets = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/", get(root::<E>))
        .route("/ws", get(ws::<E>))
        .nest_service("/static", assets)
        .with_state(state)
}

async fn root<E: Environment>(
    State(state): State<Arc<GatewayState<E>>>,
    Query(query): Query<RoomQuery>,
) -> Response {
    let Some(room_id) = query.room_id() else {
        return match state.registry.create_room().await {
            Ok(id) => Redirect::temporary(&format!("/?r={id}")).into_response(),
            Err(e) => {
                tracing::error!("Room creation failed: {}", e);
                StatusCode::SERVICE_UNAVAILABLE.into_response()
            },
        };
    };

    if !state.registry.contains(&room_id).await {
        tracing::info!(room_id = %room_id, "Room does not exist");
        return Redirect::temporary("/").into_response();
    }

    let index = state.static_dir.join("index.html");
    match tokio::fs::read_to_string(&index).await {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            tracing::warn!("Cannot read {}: {}", index.display(), e);
            StatusCode::NOT_FOUND.into_response()
        },
    }
}

async fn ws<E: Environment>(
    State(state): State<Arc<GatewayState<E>>>,
    Query(query): Query<RoomQuery>,
    upgrade: WebSocketUpgrade,
) -> Response {
    let Some(room_id) = query.room_id() else {
        tracing::debug!("WebSocket request without room parameter");
        return (StatusCode::BAD_REQUEST, "missing room parameter").into_response();
    };

    upgrade
        .max_message_size(state.session.max_message_size)
        .on_upgrade(move |socket| connect(state, socket, room_id))
}

/// Turn an upgraded socket into a room member.
async fn connect<E: Environment>(
    state: Arc<GatewayState<E>>,
    mut socket: WebSocket,
    room_id: RoomId,
) {
    let id = SessionId::generate(&state.env);
    let (member, outbox) = session::channel(id, state.session.delivery_capacity);

    let link = match state.registry.add_member(member, &room_id).await {
        Ok(link) => link,
        Err(e) => {
            tracing::info!(session_id = %id, "Rejecting connection: {}", e);
            let close = CloseFrame { code: close_code::POLICY, reason: e.to_string().into() };
            let _ = socket.send(WsMessage::Close(Some(close))).await;
            return;
        },
    };

    tracing::debug!(
        room_id = %room_id,
        session_id = %id,
        owner = link.secret.is_some(),
        "Session started"
    );

    let (sink, stream) = socket.split();
    let incoming = link.incoming.clone();
    tokio::spawn(session::run(outbox, sink, stream, incoming, link.membership, state.session));

    let entered = Inbound::new(id, Message::status(USER_ENTERED));
    if link.incoming.send(entered).await.is_err() {
        tracing::warn!(room_id = %room_id, "Room closed before join announcement");
    }
}
