//! WebSocket client session management.

use std::{fmt, time::Duration};

use butai_server::infrastructure::dto::websocket::{
    ClientMessage, HeartbeatPayload, MessageType, ServerMessage,
};
use butai_shared::time::now_millis;
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use tokio::{
    net::TcpStream,
    sync::mpsc,
    time::{Instant, MissedTickBehavior, interval_at, timeout},
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Error as WsError, protocol::Message},
};

use crate::{
    command::{Command, HELP},
    domain::rejection_for_status,
    error::ClientError,
    formatter::MessageFormatter,
    mirror::RoomMirror,
    runner::ClientConfig,
    ui::redisplay_prompt,
};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// How long to wait for the join snapshot after the upgrade
const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Why a session ended without an error. None of these are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Input closed (Ctrl+C / Ctrl+D)
    UserExit,
    Left,
    Kicked,
    RoomEnded,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::UserExit => "user exited",
            Self::Left => "left the room",
            Self::Kicked => "removed by the host",
            Self::RoomEnded => "room ended",
        };
        f.write_str(text)
    }
}

/// The end a server message implies for the receiving participant.
pub fn session_end(message: &ServerMessage, you: &str) -> Option<SessionEnd> {
    match message {
        ServerMessage::Kick(kick) if kick.user_id == you => Some(SessionEnd::Kicked),
        ServerMessage::RoomEnded(_) => Some(SessionEnd::RoomEnded),
        ServerMessage::Ack(ack) if ack.action == MessageType::Leave => Some(SessionEnd::Left),
        _ => None,
    }
}

async fn send(write: &mut WsSink, message: &ClientMessage) -> Result<(), ClientError> {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to serialize message: {}", e);
            return Ok(());
        }
    };
    write
        .send(Message::text(json))
        .await
        .map_err(|e| ClientError::ConnectionLost(e.to_string()))
}

/// Handle one input line. Returns whether a leave was requested.
async fn handle_line(
    line: &str,
    mirror: &RoomMirror,
    write: &mut WsSink,
) -> Result<bool, ClientError> {
    let command = match Command::parse(line) {
        Ok(command) => command,
        Err(e) => {
            print!("\n{}\n", e);
            return Ok(false);
        }
    };

    match &command {
        Command::Who => print!("\n{}", MessageFormatter::format_participants(mirror)),
        Command::Tickers => print!("{}", MessageFormatter::format_tickers(mirror.tickers())),
        Command::Help => print!("\n{}", HELP),
        _ => {}
    }

    let leaving = command == Command::Leave;
    if let Some(message) =
        command.into_message(|| uuid::Uuid::new_v4().to_string(), mirror.you())
    {
        send(write, &message).await?;
    }
    Ok(leaving)
}

/// Run the WebSocket client session
///
/// Returns `Ok` when the session ended for a reason that must not be
/// retried, and `Err` otherwise.
pub async fn run_client_session(
    config: &ClientConfig,
    input: &mut mpsc::UnboundedReceiver<String>,
) -> Result<SessionEnd, ClientError> {
    let (ws_stream, _response) = connect_async(config.connect_url())
        .await
        .map_err(|e| match e {
            WsError::Http(response) => {
                rejection_for_status(response.status().as_u16(), &config.room_id)
            }
            other => ClientError::ConnectionError(other.to_string()),
        })?;
    tracing::info!("Connected to room '{}'", config.room_id);

    let (mut write, mut read) = ws_stream.split();
    let mut mirror = RoomMirror::new();

    // The first message is always the room snapshot
    loop {
        let frame = timeout(SNAPSHOT_TIMEOUT, read.next())
            .await
            .map_err(|_| ClientError::ConnectionLost("no room snapshot received".to_string()))?;
        match frame {
            Some(Ok(Message::Text(text))) => {
                match serde_json::from_str::<ServerMessage>(text.as_str()) {
                    Ok(message @ ServerMessage::RoomState(_)) => {
                        mirror.apply(&message);
                        break;
                    }
                    Ok(other) => tracing::debug!("Ignoring {:?} before the snapshot", other),
                    Err(e) => tracing::warn!("Unrecognized message: {}", e),
                }
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(ClientError::ConnectionLost(e.to_string())),
            None => {
                return Err(ClientError::ConnectionLost(
                    "closed before the room snapshot".to_string(),
                ));
            }
        }
    }
    print!("{}", MessageFormatter::format_room_state(&mirror));
    println!("Type /help for commands. Press Ctrl+C to exit.\n");
    redisplay_prompt(&config.user_id);

    let period = mirror
        .heartbeat_interval()
        .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL);
    let mut heartbeat = interval_at(Instant::now() + period, period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut leaving = false;

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let message = match serde_json::from_str::<ServerMessage>(text.as_str()) {
                        Ok(message) => message,
                        Err(e) => {
                            tracing::warn!("Unrecognized message: {}", e);
                            continue;
                        }
                    };
                    if let Some(formatted) = MessageFormatter::format_message(&message, &mirror) {
                        print!("{}", formatted);
                        redisplay_prompt(&config.user_id);
                    }
                    let end = session_end(&message, mirror.you());
                    mirror.apply(&message);
                    if let ServerMessage::RoomState(_) = message {
                        print!("{}", MessageFormatter::format_room_state(&mirror));
                        redisplay_prompt(&config.user_id);
                    }
                    if let Some(end) = end {
                        return Ok(end);
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    if leaving {
                        return Ok(SessionEnd::Left);
                    }
                    tracing::info!("Server closed the connection");
                    return Err(ClientError::ConnectionLost(
                        "server closed the connection".to_string(),
                    ));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    return Err(ClientError::ConnectionLost(e.to_string()));
                }
            },
            line = input.recv() => match line {
                Some(line) => {
                    leaving |= handle_line(&line, &mirror, &mut write).await?;
                    redisplay_prompt(&config.user_id);
                }
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(SessionEnd::UserExit);
                }
            },
            _ = heartbeat.tick() => {
                let message = ClientMessage::Heartbeat(HeartbeatPayload {
                    client_time: Some(now_millis()),
                });
                send(&mut write, &message).await?;
                tracing::debug!("Heartbeat sent");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use butai_server::infrastructure::dto::websocket::{AckPayload, KickInfo, RoomEndedInfo};

    #[test]
    fn test_own_kick_ends_session() {
        // テスト項目: 自分宛ての kick でセッションが Kicked で終了する
        // given (前提条件):
        let message = ServerMessage::Kick(KickInfo {
            user_id: "alice".to_string(),
            by: "host".to_string(),
        });

        // when (操作):
        let end = session_end(&message, "alice");

        // then (期待する結果):
        assert_eq!(end, Some(SessionEnd::Kicked));
    }

    #[test]
    fn test_kick_of_other_participant_continues() {
        // テスト項目: 他人の kick ではセッションは続く
        // given (前提条件):
        let message = ServerMessage::Kick(KickInfo {
            user_id: "bob".to_string(),
            by: "host".to_string(),
        });

        // when (操作):
        let end = session_end(&message, "alice");

        // then (期待する結果):
        assert_eq!(end, None);
    }

    #[test]
    fn test_leave_ack_and_room_end_stop_session() {
        // テスト項目: leave の ack とルーム終了でセッションが終わる
        // given (前提条件):
        let ack = ServerMessage::Ack(AckPayload::of(MessageType::Leave));
        let ended = ServerMessage::RoomEnded(RoomEndedInfo {
            room_id: "stage".to_string(),
            by: None,
        });

        // when (操作):
        let after_ack = session_end(&ack, "alice");
        let after_end = session_end(&ended, "alice");

        // then (期待する結果):
        assert_eq!(after_ack, Some(SessionEnd::Left));
        assert_eq!(after_end, Some(SessionEnd::RoomEnded));
    }

    #[test]
    fn test_chat_ack_does_not_stop_session() {
        // テスト項目: leave 以外の ack ではセッションは続く
        // given (前提条件):
        let ack = ServerMessage::Ack(AckPayload::of(MessageType::Chat));

        // when (操作):
        let end = session_end(&ack, "alice");

        // then (期待する結果):
        assert_eq!(end, None);
    }
}
