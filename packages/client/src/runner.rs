//! Client execution logic with reconnection support.

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

use super::{
    domain::{backoff_delay, should_attempt_reconnect, should_exit_immediately},
    error::ClientError,
    session::run_client_session,
};

const BASE_RECONNECT_DELAY_MS: u64 = 500;
const MAX_RECONNECT_DELAY_MS: u64 = 10_000;
const RECONNECT_JITTER_FACTOR: f64 = 0.2;

/// Connection settings for one participant.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// WebSocket endpoint, e.g. `ws://127.0.0.1:8080/ws`
    pub url: String,
    pub room_id: String,
    pub user_id: String,
    /// `host` or `participant`
    pub user_type: String,
    /// Capacity requested when this connection creates the room
    pub max_connections: Option<i64>,
    pub username: Option<String>,
    pub max_reconnect_attempts: u32,
}

impl ClientConfig {
    /// Endpoint URL with the connection query attached
    pub fn connect_url(&self) -> String {
        let mut url = format!(
            "{}?roomId={}&userId={}&userType={}",
            self.url,
            utf8_percent_encode(&self.room_id, NON_ALPHANUMERIC),
            utf8_percent_encode(&self.user_id, NON_ALPHANUMERIC),
            utf8_percent_encode(&self.user_type, NON_ALPHANUMERIC)
        );
        if let Some(max) = self.max_connections {
            url.push_str(&format!("&maxConnections={}", max));
        }
        if let Some(username) = &self.username {
            url.push_str(&format!(
                "&username={}",
                utf8_percent_encode(username, NON_ALPHANUMERIC)
            ));
        }
        url
    }
}

/// Read lines on a dedicated thread for the lifetime of the client.
///
/// The channel closes on Ctrl+C or Ctrl+D.
fn spawn_input_thread(prompt_id: String) -> mpsc::UnboundedReceiver<String> {
    let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();

    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        let prompt = format!("{}> ", prompt_id);

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            // Channel closed, exit thread
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    input_rx
}

/// Run the client with reconnection logic
///
/// Admission rejections end the client immediately. Lost connections are
/// retried with exponential backoff and jitter, up to
/// `max_reconnect_attempts` consecutive failures.
pub async fn run_client(config: ClientConfig) -> Result<(), ClientError> {
    let mut input = spawn_input_thread(config.user_id.clone());
    let mut reconnect_count = 0;

    loop {
        tracing::info!(
            "Connecting to room '{}' at {} as '{}' (attempt {}/{})",
            config.room_id,
            config.url,
            config.user_id,
            reconnect_count + 1,
            config.max_reconnect_attempts + 1
        );

        let error = match run_client_session(&config, &mut input).await {
            Ok(end) => {
                tracing::info!("Client session ended: {}", end);
                return Ok(());
            }
            Err(e) => e,
        };

        if should_exit_immediately(&error) {
            tracing::error!("{}", error);
            return Err(error);
        }

        // A session that got as far as connecting starts a fresh retry budget
        if matches!(error, ClientError::ConnectionLost(_)) {
            reconnect_count = 0;
        }
        tracing::warn!("{}", error);

        if !should_attempt_reconnect(&error, reconnect_count, config.max_reconnect_attempts) {
            tracing::error!(
                "Failed to reconnect after {} attempts. Exiting.",
                config.max_reconnect_attempts
            );
            return Err(error);
        }

        let delay = backoff_delay(
            reconnect_count,
            BASE_RECONNECT_DELAY_MS,
            MAX_RECONNECT_DELAY_MS,
            RECONNECT_JITTER_FACTOR,
            rand::random::<f64>(),
        );
        reconnect_count += 1;
        tracing::info!(
            "Reconnecting in {:?}... (attempt {}/{})",
            delay,
            reconnect_count,
            config.max_reconnect_attempts
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClientConfig {
        ClientConfig {
            url: "ws://127.0.0.1:8080/ws".to_string(),
            room_id: "stage".to_string(),
            user_id: "alice".to_string(),
            user_type: "participant".to_string(),
            max_connections: None,
            username: None,
            max_reconnect_attempts: 5,
        }
    }

    #[test]
    fn test_connect_url_has_required_query() {
        // テスト項目: 接続 URL に roomId / userId / userType が付与される
        // given (前提条件):
        let config = config();

        // when (操作):
        let url = config.connect_url();

        // then (期待する結果):
        assert_eq!(
            url,
            "ws://127.0.0.1:8080/ws?roomId=stage&userId=alice&userType=participant"
        );
    }

    #[test]
    fn test_connect_url_encodes_optional_values() {
        // テスト項目: 任意のパラメータが付与され、空白などはエンコードされる
        // given (前提条件):
        let config = ClientConfig {
            user_type: "host".to_string(),
            max_connections: Some(8),
            username: Some("Alice B&C".to_string()),
            ..config()
        };

        // when (操作):
        let url = config.connect_url();

        // then (期待する結果):
        assert!(url.ends_with("&userType=host&maxConnections=8&username=Alice%20B%26C"));
    }

    #[test]
    fn test_connect_url_encodes_utf8_and_reserved_characters() {
        // テスト項目: マルチバイト文字や区切り文字を含む値は UTF-8 でパーセントエンコードされる
        // given (前提条件):
        let config = ClientConfig {
            room_id: "a&b=c".to_string(),
            username: Some("太郎".to_string()),
            ..config()
        };

        // when (操作):
        let url = config.connect_url();

        // then (期待する結果):
        assert!(url.contains("?roomId=a%26b%3Dc&"));
        assert!(url.ends_with("&username=%E5%A4%AA%E9%83%8E"));
    }
}
