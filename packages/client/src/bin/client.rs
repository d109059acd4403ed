//! Butai command-line participant.
//!
//! Connects to a room, shows its participants, canvas activity, chat and
//! ticker prices, and sends chat and commands typed at the prompt.
//! Lost connections are retried with exponential backoff; admission
//! rejections (room full, unknown room, duplicate user) end the client.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin butai-client -- --room-id stage --user-id host --user-type host
//! cargo run --bin butai-client -- -r stage -i alice --username Alice
//! ```

use butai_client::{ClientConfig, run_client};
use butai_shared::logger::setup_logger;
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum UserType {
    Host,
    Participant,
}

impl UserType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Participant => "participant",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "butai-client")]
#[command(about = "Command-line participant for Butai live rooms", long_about = None)]
struct Args {
    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Room to join (created when connecting as host)
    #[arg(short = 'r', long)]
    room_id: String,

    /// User ID for identifying this participant (must be unique in the room)
    #[arg(short = 'i', long)]
    user_id: String,

    /// Role to claim when connecting
    #[arg(short = 't', long, value_enum, default_value = "participant")]
    user_type: UserType,

    /// Capacity of the room when this connection creates it
    #[arg(short = 'm', long)]
    max_connections: Option<i64>,

    /// Display name shown to other participants
    #[arg(short = 'n', long)]
    username: Option<String>,

    /// Consecutive reconnection attempts before giving up
    #[arg(long, default_value = "5")]
    max_reconnect_attempts: u32,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let config = ClientConfig {
        url: args.url,
        room_id: args.room_id,
        user_id: args.user_id,
        user_type: args.user_type.as_str().to_string(),
        max_connections: args.max_connections,
        username: args.username,
        max_reconnect_attempts: args.max_reconnect_attempts,
    };

    // Run the client
    if let Err(e) = run_client(config).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
