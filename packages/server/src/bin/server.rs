//! Butai live-session server.
//!
//! Hosts rooms with shared annotation, chat, host controls and a ticker feed
//! over WebSocket, plus a small REST API for room management.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin butai-server
//! cargo run --bin butai-server -- --host 0.0.0.0 --port 3000 --grace-period-secs 60
//! ```

use std::{sync::Arc, time::Duration};

use butai_server::{
    domain::{ChatRateLimit, MessagePusher, RoomRepository, TickerFeed},
    infrastructure::{
        message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRepository,
        ticker::RandomWalkFeed,
    },
    ui::Server,
    usecase::{
        ConnectParticipantUseCase, CreateRoomUseCase, DisconnectParticipantUseCase,
        DispatchActionUseCase, EndRoomUseCase, GetRoomDetailUseCase, GetRoomsUseCase,
        JoinRoomUseCase, LeaveRoomUseCase, RoomSpawner, SessionConfig,
    },
};
use butai_shared::{logger::setup_logger, time::SystemClock};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "butai-server")]
#[command(about = "Live-session collaboration server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Heartbeat interval advertised to clients, in seconds
    #[arg(long, default_value = "15")]
    heartbeat_interval_secs: u64,

    /// Silence after which a participant is marked disconnected, in seconds
    #[arg(long, default_value = "30")]
    heartbeat_timeout_secs: u64,

    /// How long a disconnected participant keeps its slot, in seconds
    #[arg(long, default_value = "30")]
    grace_period_secs: u64,

    /// Ticker update interval, in milliseconds
    #[arg(long, default_value = "2000")]
    ticker_interval_ms: u64,

    /// Ticker symbols, comma separated
    #[arg(long, value_delimiter = ',', default_value = "AAPL,TSLA,NVDA,BTC-USD")]
    watchlist: Vec<String>,

    /// Outbound messages buffered per connection before it is dropped
    #[arg(long, default_value = "256")]
    outbound_queue_capacity: usize,

    /// Malformed frames tolerated before a connection is closed
    #[arg(long, default_value = "5")]
    malformed_threshold: u32,

    /// Capacity of rooms created without one
    #[arg(long, default_value = "50")]
    default_max_participants: i64,

    /// Chat messages allowed per participant within the rate window
    #[arg(long, default_value = "10")]
    chat_rate_limit: usize,

    /// Chat rate window, in seconds
    #[arg(long, default_value = "10")]
    chat_rate_window_secs: i64,

    /// Chat messages kept for join snapshots
    #[arg(long, default_value = "500")]
    chat_history: usize,
}

impl Args {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval_secs),
            heartbeat_timeout: Duration::from_secs(self.heartbeat_timeout_secs),
            grace_period: Duration::from_secs(self.grace_period_secs),
            ticker_interval: Duration::from_millis(self.ticker_interval_ms.max(1)),
            outbound_queue_capacity: self.outbound_queue_capacity.max(1),
            malformed_threshold: self.malformed_threshold.max(1),
            default_max_participants: self.default_max_participants,
            chat_rate_limit: ChatRateLimit {
                max_messages: self.chat_rate_limit,
                window_ms: self.chat_rate_window_secs.saturating_mul(1_000),
            },
            chat_retention: self.chat_history,
            ..SessionConfig::default()
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();
    let config = Arc::new(args.session_config());
    tracing::info!("Session config: {:?}", config);

    // Initialize dependencies in order:
    // 1. Repository
    // 2. Room spawner (per-room MessagePusher and ticker feed)
    // 3. UseCases
    // 4. Server

    // 1. Create Repository (in-memory room registry)
    let repository: Arc<dyn RoomRepository> = Arc::new(InMemoryRoomRepository::new());

    // 2. Create the spawner; every room gets its own pusher and feed
    let watchlist = args.watchlist.clone();
    let spawner = Arc::new(RoomSpawner::new(
        repository.clone(),
        Arc::new(|| Arc::new(WebSocketMessagePusher::new()) as Arc<dyn MessagePusher>),
        Arc::new(move || Box::new(RandomWalkFeed::new(&watchlist)) as Box<dyn TickerFeed>),
        Arc::new(SystemClock),
        config.clone(),
    ));

    // 3. Create UseCases
    let connect_participant_usecase = Arc::new(ConnectParticipantUseCase::new(
        repository.clone(),
        spawner.clone(),
    ));
    let disconnect_participant_usecase = Arc::new(DisconnectParticipantUseCase::new());
    let dispatch_action_usecase = Arc::new(DispatchActionUseCase::new());
    let create_room_usecase = Arc::new(CreateRoomUseCase::new(spawner));
    let join_room_usecase = Arc::new(JoinRoomUseCase::new(repository.clone()));
    let leave_room_usecase = Arc::new(LeaveRoomUseCase::new(repository.clone()));
    let end_room_usecase = Arc::new(EndRoomUseCase::new(repository.clone()));
    let get_rooms_usecase = Arc::new(GetRoomsUseCase::new(repository.clone()));
    let get_room_detail_usecase = Arc::new(GetRoomDetailUseCase::new(repository));

    // 4. Create and run the server
    let server = Server::new(
        connect_participant_usecase,
        disconnect_participant_usecase,
        dispatch_action_usecase,
        create_room_usecase,
        join_room_usecase,
        leave_room_usecase,
        end_room_usecase,
        get_rooms_usecase,
        get_room_detail_usecase,
        config,
    );
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
