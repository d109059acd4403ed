//! Typed commands entered at the prompt.
//!
//! Plain text is chat. Lines starting with `/` are commands:
//!
//! ```text
//! /draw 0,0 10,10 20,5 [color=#ff0000] [width=2] [tool=pen]
//! /undo              /clear
//! /mute [user]       /promote <user>     /kick <user>
//! /speak on|off      /name <username>
//! /who               /tickers            /help
//! /leave
//! ```

use butai_server::{
    domain::{Point, Tool},
    infrastructure::dto::websocket::{
        ChatPayload, ClientMessage, JoinPayload, SpeakingPayload, StrokeAddPayload, TargetPayload,
    },
};

use crate::error::ClientError;

const DEFAULT_COLOR: &str = "#000000";
const DEFAULT_WIDTH: f64 = 2.0;

pub const HELP: &str = "\
commands:
  <text>                      send a chat message
  /draw x,y x,y ... [color=#rrggbb] [width=N] [tool=pen|highlighter|eraser]
  /undo                       remove your last stroke (host: any last stroke)
  /clear                      clear the canvas (host only)
  /mute [user]                toggle mute for yourself or, as host, another user
  /promote <user>             hand the host role to another participant
  /kick <user>                remove a participant (host only)
  /speak on|off               report whether you are speaking
  /name <username>            change your display name
  /who                        list participants
  /tickers                    show the latest ticker prices
  /leave                      leave the room
";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Chat(String),
    Draw {
        points: Vec<Point>,
        color: String,
        width: f64,
        tool: Tool,
    },
    Undo,
    Clear,
    /// `None` mutes the sender
    Mute(Option<String>),
    Promote(String),
    Kick(String),
    Speak(bool),
    Rename(String),
    Who,
    Tickers,
    Help,
    Leave,
}

impl Command {
    /// Parse one input line.
    pub fn parse(line: &str) -> Result<Self, ClientError> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Self::Chat(line.to_string()));
        };

        let mut words = rest.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        match (name, args.as_slice()) {
            ("undo", []) => Ok(Self::Undo),
            ("clear", []) => Ok(Self::Clear),
            ("mute", []) => Ok(Self::Mute(None)),
            ("mute", [user]) => Ok(Self::Mute(Some(user.to_string()))),
            ("promote", [user]) => Ok(Self::Promote(user.to_string())),
            ("kick", [user]) => Ok(Self::Kick(user.to_string())),
            ("speak", ["on"]) => Ok(Self::Speak(true)),
            ("speak", ["off"]) => Ok(Self::Speak(false)),
            ("name", [username]) => Ok(Self::Rename(username.to_string())),
            ("who", []) => Ok(Self::Who),
            ("tickers", []) => Ok(Self::Tickers),
            ("help", []) => Ok(Self::Help),
            ("leave", []) => Ok(Self::Leave),
            ("draw", args) => parse_draw(args),
            _ => Err(ClientError::InvalidCommand(format!(
                "'{}' (type /help for usage)",
                line
            ))),
        }
    }

    /// The envelope to send, or `None` for commands answered locally.
    ///
    /// `stroke_id` is used only by `/draw`.
    pub fn into_message(
        self,
        stroke_id: impl FnOnce() -> String,
        self_id: &str,
    ) -> Option<ClientMessage> {
        let target = |user: String| TargetPayload { target_id: user };
        match self {
            Self::Chat(text) => Some(ClientMessage::Chat(ChatPayload { text })),
            Self::Draw {
                points,
                color,
                width,
                tool,
            } => Some(ClientMessage::StrokeAdd(StrokeAddPayload {
                id: stroke_id(),
                points,
                color,
                width,
                tool,
            })),
            Self::Undo => Some(ClientMessage::StrokeUndo),
            Self::Clear => Some(ClientMessage::CanvasClear),
            Self::Mute(user) => Some(ClientMessage::MuteToggle(target(
                user.unwrap_or_else(|| self_id.to_string()),
            ))),
            Self::Promote(user) => Some(ClientMessage::Promote(target(user))),
            Self::Kick(user) => Some(ClientMessage::Kick(target(user))),
            Self::Speak(is_speaking) => {
                Some(ClientMessage::Speaking(SpeakingPayload { is_speaking }))
            }
            Self::Rename(username) => Some(ClientMessage::Join(JoinPayload {
                username: Some(username),
            })),
            Self::Leave => Some(ClientMessage::Leave),
            Self::Who | Self::Tickers | Self::Help => None,
        }
    }
}

fn parse_draw(args: &[&str]) -> Result<Command, ClientError> {
    let invalid = |what: &str| ClientError::InvalidCommand(format!("/draw: {}", what));

    let mut points = Vec::new();
    let mut color = DEFAULT_COLOR.to_string();
    let mut width = DEFAULT_WIDTH;
    let mut tool = Tool::Pen;

    for arg in args {
        if let Some(value) = arg.strip_prefix("color=") {
            color = value.to_string();
        } else if let Some(value) = arg.strip_prefix("width=") {
            width = value
                .parse()
                .map_err(|_| invalid(&format!("invalid width '{}'", value)))?;
        } else if let Some(value) = arg.strip_prefix("tool=") {
            tool = match value {
                "pen" => Tool::Pen,
                "highlighter" => Tool::Highlighter,
                "eraser" => Tool::Eraser,
                other => return Err(invalid(&format!("unknown tool '{}'", other))),
            };
        } else {
            let (x, y) = arg
                .split_once(',')
                .ok_or_else(|| invalid(&format!("expected x,y but got '{}'", arg)))?;
            let x = x
                .parse::<f64>()
                .map_err(|_| invalid(&format!("invalid x in '{}'", arg)))?;
            let y = y
                .parse::<f64>()
                .map_err(|_| invalid(&format!("invalid y in '{}'", arg)))?;
            points.push(Point {
                x,
                y,
                pressure: None,
            });
        }
    }

    if points.is_empty() {
        return Err(invalid("at least one point is required"));
    }
    Ok(Command::Draw {
        points,
        color,
        width,
        tool,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_chat() {
        // テスト項目: スラッシュで始まらない入力はチャットになる
        // given (前提条件):
        let line = "  hello everyone ";

        // when (操作):
        let command = Command::parse(line).unwrap();

        // then (期待する結果):
        assert_eq!(command, Command::Chat("hello everyone".to_string()));
    }

    #[test]
    fn test_parse_draw_with_options() {
        // テスト項目: /draw は座標とオプションを読み取る
        // given (前提条件):
        let line = "/draw 0,0 10.5,20 color=#00ff00 width=4 tool=highlighter";

        // when (操作):
        let command = Command::parse(line).unwrap();

        // then (期待する結果):
        match command {
            Command::Draw {
                points,
                color,
                width,
                tool,
            } => {
                assert_eq!(points.len(), 2);
                assert_eq!(points[1].x, 10.5);
                assert_eq!(points[1].y, 20.0);
                assert_eq!(color, "#00ff00");
                assert_eq!(width, 4.0);
                assert_eq!(tool, Tool::Highlighter);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_draw_without_points_fails() {
        // テスト項目: 座標のない /draw はエラーになる
        // given (前提条件):
        let line = "/draw color=red";

        // when (操作):
        let result = Command::parse(line);

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::InvalidCommand(_))));
    }

    #[test]
    fn test_unknown_command_fails() {
        // テスト項目: 未知のコマンドや引数の誤りはエラーになる
        // given (前提条件):
        let lines = ["/dance", "/kick", "/speak maybe"];

        for line in lines {
            // when (操作):
            let result = Command::parse(line);

            // then (期待する結果):
            assert!(matches!(result, Err(ClientError::InvalidCommand(_))), "{}", line);
        }
    }

    #[test]
    fn test_mute_without_target_mutes_self() {
        // テスト項目: 対象なしの /mute は自分自身を対象にする
        // given (前提条件):
        let command = Command::parse("/mute").unwrap();

        // when (操作):
        let message = command.into_message(String::new, "alice");

        // then (期待する結果):
        assert_eq!(
            message,
            Some(ClientMessage::MuteToggle(TargetPayload {
                target_id: "alice".to_string()
            }))
        );
    }

    #[test]
    fn test_draw_uses_generated_stroke_id() {
        // テスト項目: /draw の送信メッセージには生成したストローク ID が入る
        // given (前提条件):
        let command = Command::parse("/draw 1,1 2,2").unwrap();

        // when (操作):
        let message = command.into_message(|| "stroke-1".to_string(), "alice");

        // then (期待する結果):
        match message {
            Some(ClientMessage::StrokeAdd(payload)) => {
                assert_eq!(payload.id, "stroke-1");
                assert_eq!(payload.color, DEFAULT_COLOR);
                assert_eq!(payload.tool, Tool::Pen);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_local_commands_send_nothing() {
        // テスト項目: /who /tickers /help はサーバーへ何も送らない
        // given (前提条件):
        let commands = [Command::Who, Command::Tickers, Command::Help];

        for command in commands {
            // when (操作):
            let message = command.into_message(String::new, "alice");

            // then (期待する結果):
            assert!(message.is_none());
        }
    }
}
