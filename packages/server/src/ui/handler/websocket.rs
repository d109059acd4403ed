//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{Action, RoomId, UserId, Username},
    infrastructure::dto::websocket::{ClientMessage, ErrorPayload, ProtocolError, ServerMessage},
    ui::state::AppState,
    usecase::{ConnectParams, Connected, UserType},
};

use super::http::ApiError;

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectQuery {
    pub room_id: String,
    pub user_id: String,
    pub user_type: UserType,
    pub max_connections: Option<i64>,
    pub username: Option<String>,
}

impl TryFrom<ConnectQuery> for ConnectParams {
    type Error = ApiError;

    fn try_from(query: ConnectQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            room_id: RoomId::new(query.room_id)?,
            user_id: UserId::new(query.user_id)?,
            username: query.username.map(Username::new).transpose()?,
            user_type: query.user_type,
            max_connections: query.max_connections,
        })
    }
}

/// Admit the connection, then upgrade.
///
/// Admission failures (unknown room, full room, invalid ids) are answered
/// with an HTTP status before the upgrade happens.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let params = ConnectParams::try_from(query).inspect_err(|e| {
        tracing::warn!("Rejected connection with invalid parameters: {}", e.0);
    })?;
    let user_id = params.user_id.clone();

    // Outbound queue for this connection; the room's pusher holds the only sender
    let (tx, rx) = mpsc::channel(state.config.outbound_queue_capacity);
    let errors = tx.downgrade();

    let connected = state
        .connect_participant_usecase
        .execute(params, tx)
        .await
        .inspect_err(|e| {
            tracing::warn!("Rejected connection for '{}': {}", user_id, e);
        })?;
    tracing::info!(
        "User '{}' connected to room '{}' as {:?} (connection {})",
        user_id,
        connected.room.room_id(),
        connected.outcome.binding,
        connected.connection_id.value()
    );

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user_id, connected, rx, errors)))
}

/// Drains the outbound queue into the socket.
///
/// The queue closes when the room drops this connection (leave, kick,
/// overflow, a newer connection or the room ending); the socket is then
/// closed as well.
fn pusher_loop(
    mut rx: mpsc::Receiver<String>,
    mut sender: SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    })
}

/// Reports a malformed frame to its sender without going through the room.
fn report_malformed(errors: &mpsc::WeakSender<String>, error: &ProtocolError) {
    let Some(tx) = errors.upgrade() else {
        return;
    };
    let message = ServerMessage::Error(ErrorPayload::from(error));
    if let Some(json) = message.to_json() {
        // A full queue means the room is about to drop this connection anyway
        let _ = tx.try_send(json);
    }
}

fn parse_frame(msg: Message) -> Option<Result<Action, ProtocolError>> {
    match msg {
        Message::Text(text) => Some(ClientMessage::parse(text.as_str()).and_then(Action::try_from)),
        Message::Binary(_) => Some(Err(ProtocolError::NonTextFrame)),
        // Transport pings count as liveness; the pong is sent by the socket itself
        Message::Ping(_) => Some(Ok(Action::Heartbeat { client_time: None })),
        Message::Pong(_) => None,
        Message::Close(_) => None,
    }
}

async fn receive_loop(
    mut receiver: SplitStream<WebSocket>,
    state: Arc<AppState>,
    user_id: UserId,
    connected: Arc<Connected>,
    errors: mpsc::WeakSender<String>,
) {
    let threshold = state.config.malformed_threshold;
    let mut malformed = 0u32;

    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!("WebSocket error from '{}': {}", user_id, e);
                break;
            }
        };
        if let Message::Close(_) = msg {
            tracing::info!("User '{}' requested close", user_id);
            break;
        }

        match parse_frame(msg) {
            Some(Ok(action)) => {
                tracing::debug!("Received '{}' from '{}'", action.name(), user_id);
                let result = state
                    .dispatch_action_usecase
                    .execute(
                        &connected.room,
                        user_id.clone(),
                        connected.connection_id,
                        action,
                    )
                    .await;
                if let Err(e) = result {
                    tracing::info!("Dropping connection of '{}': {}", user_id, e);
                    break;
                }
            }
            Some(Err(e)) => {
                malformed += 1;
                tracing::warn!(
                    "Malformed frame from '{}' ({}/{}): {}",
                    user_id,
                    malformed,
                    threshold,
                    e
                );
                report_malformed(&errors, &e);
                if malformed >= threshold {
                    tracing::warn!("Closing connection of '{}': too many malformed frames", user_id);
                    break;
                }
            }
            None => {}
        }
    }
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    user_id: UserId,
    connected: Connected,
    rx: mpsc::Receiver<String>,
    errors: mpsc::WeakSender<String>,
) {
    let (sender, receiver) = socket.split();
    let connected = Arc::new(connected);

    let mut recv_task = tokio::spawn(receive_loop(
        receiver,
        state.clone(),
        user_id.clone(),
        connected.clone(),
        errors,
    ));
    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    state
        .disconnect_participant_usecase
        .execute(&connected.room, user_id.clone(), connected.connection_id)
        .await;
    tracing::info!(
        "Connection {} of '{}' closed",
        connected.connection_id.value(),
        user_id
    );
}
