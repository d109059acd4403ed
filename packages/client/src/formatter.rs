//! Message formatting utilities for client display.

use butai_server::{
    domain::{ConnectionState, Role},
    infrastructure::dto::websocket::{
        ChatInfo, ErrorPayload, LeaveReasonInfo, ParticipantInfo, ServerMessage, TickerInfo,
    },
};
use butai_shared::time::timestamp_to_jst_rfc3339;

use crate::mirror::RoomMirror;

const RULE: &str = "============================================================";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format a server message for display.
    ///
    /// Call before applying the message to `mirror` so that departing
    /// participants can still be named. Returns `None` for messages that
    /// are not shown (acks for chat, heartbeats).
    pub fn format_message(message: &ServerMessage, mirror: &RoomMirror) -> Option<String> {
        let name = |user_id: &str| display_name(mirror, user_id);
        match message {
            ServerMessage::RoomState(_) => None,
            ServerMessage::Join(participant) => Some(format!(
                "\n+ {} joined at {}\n",
                participant.username,
                timestamp_to_jst_rfc3339(participant.joined_at)
            )),
            ServerMessage::Leave(leave) => {
                let reason = match leave.reason {
                    LeaveReasonInfo::Left => "left",
                    LeaveReasonInfo::TimedOut => "timed out",
                    LeaveReasonInfo::Kicked => "was removed",
                };
                Some(format!("\n- {} {}\n", name(&leave.user_id), reason))
            }
            ServerMessage::Presence(presence) => {
                let state = match presence.connection_state {
                    ConnectionState::Connected => "is back",
                    ConnectionState::Disconnected => "lost connection",
                    ConnectionState::Connecting | ConnectionState::Reconnecting => return None,
                };
                Some(format!("\n~ {} {}\n", name(&presence.user_id), state))
            }
            ServerMessage::Chat(chat) => Some(Self::format_chat_message(
                &name(&chat.sender_id),
                chat,
            )),
            ServerMessage::StrokeAdd(stroke) => Some(format!(
                "\n✎ {} drew stroke #{} ({} points, {})\n",
                name(&stroke.author_id),
                stroke.sequence_number,
                stroke.points.len(),
                stroke.color
            )),
            ServerMessage::StrokeUndo(undo) => Some(format!(
                "\n↶ {} undid stroke #{}\n",
                name(&undo.by),
                undo.sequence_number
            )),
            ServerMessage::CanvasClear(clear) => Some(format!(
                "\n⌫ {} cleared the canvas ({} strokes)\n",
                name(&clear.by),
                clear.removed
            )),
            ServerMessage::MuteToggle(mute) => Some(format!(
                "\n{} {} {}\n",
                name(&mute.by),
                if mute.is_muted { "muted" } else { "unmuted" },
                name(&mute.user_id)
            )),
            ServerMessage::Speaking(speaking) => speaking
                .is_speaking
                .then(|| format!("\n♪ {} is speaking\n", name(&speaking.user_id))),
            ServerMessage::Promote(promote) => Some(format!(
                "\n★ {} is now the host\n",
                name(&promote.host_id)
            )),
            ServerMessage::Kick(kick) if kick.user_id == mirror.you() => Some(format!(
                "\n✖ You were removed from the room by {}\n",
                name(&kick.by)
            )),
            ServerMessage::Kick(kick) => Some(format!(
                "\n✖ {} removed {}\n",
                name(&kick.by),
                name(&kick.user_id)
            )),
            ServerMessage::TickerUpdate(update) => Some(Self::format_tickers(&update.snapshots)),
            ServerMessage::Signal(signal) => {
                Some(format!("\n← signal from {}: {}\n", name(&signal.from), signal.data))
            }
            ServerMessage::Ack(_) | ServerMessage::Heartbeat(_) => None,
            ServerMessage::Error(error) => Some(Self::format_error(error)),
            ServerMessage::RoomEnded(ended) => Some(match &ended.by {
                Some(by) => format!("\n■ {} ended the room\n", name(by)),
                None => "\n■ The room has ended\n".to_string(),
            }),
        }
    }

    /// Format the snapshot received on (re)connect
    pub fn format_room_state(mirror: &RoomMirror) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n\n{}\n", RULE));
        if let Some(room) = mirror.room() {
            output.push_str(&format!(
                "{} [{}] - {} of {} participants\n",
                room.title,
                room.id,
                mirror.participants().count(),
                room.max_participants
            ));
        }
        output.push_str(&Self::format_participants(mirror));
        output.push_str(&format!("Strokes on canvas: {}\n", mirror.strokes().len()));
        if !mirror.chat().is_empty() {
            output.push_str("Recent chat:\n");
            let skip = mirror.chat().len().saturating_sub(5);
            for chat in &mirror.chat()[skip..] {
                output.push_str(&format!(
                    "  {}: {}\n",
                    display_name(mirror, &chat.sender_id),
                    chat.text
                ));
            }
        }
        output.push_str(&format!("{}\n", RULE));
        output
    }

    /// Format the participant list
    pub fn format_participants(mirror: &RoomMirror) -> String {
        let mut output = String::from("Participants:\n");
        let participants: Vec<&ParticipantInfo> = mirror.participants().collect();
        if participants.is_empty() {
            output.push_str("(No participants)\n");
            return output;
        }
        for participant in participants {
            output.push_str(&format!(
                "  {}\n",
                Self::format_participant(participant, mirror.you())
            ));
        }
        output
    }

    fn format_participant(participant: &ParticipantInfo, you: &str) -> String {
        let mut line = participant.username.clone();
        if participant.user_id == you {
            line.push_str(" (me)");
        }
        if participant.role == Role::Host {
            line.push_str(" [host]");
        }
        if participant.is_muted {
            line.push_str(" [muted]");
        }
        if participant.connection_state == ConnectionState::Disconnected {
            line.push_str(" [away]");
        }
        line
    }

    /// Format a chat message
    pub fn format_chat_message(sender: &str, chat: &ChatInfo) -> String {
        let timestamp_str = timestamp_to_jst_rfc3339(chat.timestamp);
        if chat.is_system {
            return format!("\n* {} ({})\n", chat.text, timestamp_str);
        }
        format!(
            "\n\n------------------------------------------------------------\n\
             @{}: {}\n\
             sent at {}\n\
             ------------------------------------------------------------\n",
            sender, chat.text, timestamp_str
        )
    }

    /// Format ticker prices, one symbol per line
    pub fn format_tickers<'a>(tickers: impl IntoIterator<Item = &'a TickerInfo>) -> String {
        let mut output = String::from("\n");
        for ticker in tickers {
            let arrow = if ticker.change >= 0.0 { "▲" } else { "▼" };
            output.push_str(&format!(
                "  {:<8} {:>12.2} {} {:+.2} ({:+.2}%)\n",
                ticker.symbol, ticker.price, arrow, ticker.change, ticker.change_percent
            ));
        }
        output
    }

    /// Format an error reported by the server
    pub fn format_error(error: &ErrorPayload) -> String {
        format!("\n! {}\n", error.message)
    }
}

fn display_name(mirror: &RoomMirror, user_id: &str) -> String {
    mirror
        .participant(user_id)
        .map(|p| p.username.clone())
        .unwrap_or_else(|| user_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use butai_server::infrastructure::dto::websocket::{
        ErrorCode, KickInfo, LeaveInfo, RoomEndedInfo,
    };

    fn chat(text: &str, is_system: bool) -> ChatInfo {
        ChatInfo {
            id: "m-1".to_string(),
            sender_id: "host".to_string(),
            text: text.to_string(),
            timestamp: 1672498800000,
            is_system,
        }
    }

    #[test]
    fn test_format_chat_message() {
        // テスト項目: チャットメッセージが送信者・本文・日時付きでフォーマットされる
        // given (前提条件):
        let message = chat("Hello, World!", false);

        // when (操作):
        let result = MessageFormatter::format_chat_message("Host", &message);

        // then (期待する結果):
        assert!(result.contains("@Host: Hello, World!"));
        assert!(result.contains("2023-01-01"));
    }

    #[test]
    fn test_format_system_chat_message() {
        // テスト項目: システムメッセージは送信者なしの 1 行で表示される
        // given (前提条件):
        let message = chat("alice joined", true);

        // when (操作):
        let result = MessageFormatter::format_chat_message("system", &message);

        // then (期待する結果):
        assert!(result.starts_with("\n* alice joined"));
        assert!(!result.contains('@'));
    }

    #[test]
    fn test_format_leave_with_reason() {
        // テスト項目: 退出通知に理由が表示される
        // given (前提条件):
        let mirror = RoomMirror::new();
        let message = ServerMessage::Leave(LeaveInfo {
            user_id: "bob".to_string(),
            reason: LeaveReasonInfo::TimedOut,
        });

        // when (操作):
        let result = MessageFormatter::format_message(&message, &mirror).unwrap();

        // then (期待する結果):
        assert_eq!(result, "\n- bob timed out\n");
    }

    #[test]
    fn test_format_kick_of_other_participant() {
        // テスト項目: 他の参加者の kick は実行者と対象を表示する
        // given (前提条件):
        let mirror = RoomMirror::new();
        let message = ServerMessage::Kick(KickInfo {
            user_id: "bob".to_string(),
            by: "host".to_string(),
        });

        // when (操作):
        let result = MessageFormatter::format_message(&message, &mirror).unwrap();

        // then (期待する結果):
        assert!(result.contains("host removed bob"));
    }

    #[test]
    fn test_format_error() {
        // テスト項目: サーバーのエラーはメッセージ本文が表示される
        // given (前提条件):
        let error = ErrorPayload {
            code: ErrorCode::Unauthorized,
            message: "User 'bob' is not allowed to perform this action".to_string(),
        };

        // when (操作):
        let result = MessageFormatter::format_error(&error);

        // then (期待する結果):
        assert!(result.contains("not allowed"));
    }

    #[test]
    fn test_format_room_ended_without_actor() {
        // テスト項目: 実行者のいないルーム終了は汎用メッセージになる
        // given (前提条件):
        let mirror = RoomMirror::new();
        let message = ServerMessage::RoomEnded(RoomEndedInfo {
            room_id: "stage".to_string(),
            by: None,
        });

        // when (操作):
        let result = MessageFormatter::format_message(&message, &mirror).unwrap();

        // then (期待する結果):
        assert!(result.contains("The room has ended"));
    }

    #[test]
    fn test_format_tickers() {
        // テスト項目: ティッカーは価格と騰落率付きでフォーマットされる
        // given (前提条件):
        let ticker = TickerInfo {
            symbol: "NVDA".to_string(),
            price: 120.5,
            change: -1.25,
            change_percent: -1.03,
            volume: 10,
            as_of: 0,
        };

        // when (操作):
        let result = MessageFormatter::format_tickers([&ticker]);

        // then (期待する結果):
        assert!(result.contains("NVDA"));
        assert!(result.contains("120.50"));
        assert!(result.contains("▼"));
        assert!(result.contains("-1.03%"));
    }
}
