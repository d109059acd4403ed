//! Server execution logic.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::usecase::{
    ConnectParticipantUseCase, CreateRoomUseCase, DisconnectParticipantUseCase,
    DispatchActionUseCase, EndRoomUseCase, GetRoomDetailUseCase, GetRoomsUseCase,
    JoinRoomUseCase, LeaveRoomUseCase, SessionConfig,
};

use super::{
    handler::{
        create_room, end_room, get_room_detail, get_rooms, health_check, join_room, leave_room,
        websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// Live session server
///
/// This struct encapsulates the use cases behind the HTTP and WebSocket
/// endpoints and provides methods to run the server.
///
/// # Example
///
/// ```ignore
/// let server = Server::new(
///     connect_participant_usecase,
///     disconnect_participant_usecase,
///     dispatch_action_usecase,
///     // ...
///     config,
/// );
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    /// Create a new Server instance
    ///
    /// # Arguments
    ///
    /// * `connect_participant_usecase` - UseCase for binding signaling connections
    /// * `disconnect_participant_usecase` - UseCase for reporting closed connections
    /// * `dispatch_action_usecase` - UseCase for forwarding client actions to rooms
    /// * `create_room_usecase` - UseCase for creating rooms
    /// * `join_room_usecase` - UseCase for admitting viewers over HTTP
    /// * `leave_room_usecase` - UseCase for confirmed leaves
    /// * `end_room_usecase` - UseCase for ending rooms
    /// * `get_rooms_usecase` - UseCase for listing live rooms
    /// * `get_room_detail_usecase` - UseCase for reading one room
    /// * `config` - Session settings shared with connection handlers
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        connect_participant_usecase: Arc<ConnectParticipantUseCase>,
        disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
        dispatch_action_usecase: Arc<DispatchActionUseCase>,
        create_room_usecase: Arc<CreateRoomUseCase>,
        join_room_usecase: Arc<JoinRoomUseCase>,
        leave_room_usecase: Arc<LeaveRoomUseCase>,
        end_room_usecase: Arc<EndRoomUseCase>,
        get_rooms_usecase: Arc<GetRoomsUseCase>,
        get_room_detail_usecase: Arc<GetRoomDetailUseCase>,
        config: Arc<SessionConfig>,
    ) -> Self {
        Self {
            state: Arc::new(AppState {
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
            }),
        }
    }

    /// Build the router with every endpoint
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/rooms", get(get_rooms).post(create_room))
            .route("/api/rooms/{room_id}", get(get_room_detail))
            .route("/api/rooms/{room_id}/join", post(join_room))
            .route("/api/rooms/{room_id}/leave", post(leave_room))
            .route("/api/rooms/{room_id}/end", post(end_room))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve on an already bound listener until a shutdown signal arrives
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        let app = self.router();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }

    /// Run the live session server
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8080)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        // Bind the server to the host and port
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Butai server listening on {}", listener.local_addr()?);
        tracing::info!(
            "Connect to: ws://{}/ws?roomId=<room>&userId=<user>&userType=host",
            bind_addr
        );
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener).await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
