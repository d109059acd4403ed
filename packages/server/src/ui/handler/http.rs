//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    domain::{RoomError, RoomId, RoomTitle, UserId, Username, ValueObjectError},
    infrastructure::dto::http::{
        CreateRoomRequest, ErrorResponse, HealthResponse, JoinRoomRequest, ParticipantResponse,
        RoomDetailResponse, RoomListResponse, UserRequest,
    },
    ui::state::AppState,
};

/// A room error rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub RoomError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            RoomError::RoomNotFound(_) | RoomError::ParticipantNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            RoomError::RoomFull { .. } => StatusCode::SERVICE_UNAVAILABLE,
            RoomError::AlreadyJoined(_) | RoomError::RoomAlreadyExists(_) => StatusCode::CONFLICT,
            RoomError::InvalidCapacity(_) | RoomError::InvalidValue(_) => StatusCode::BAD_REQUEST,
            RoomError::Unauthorized(_) => StatusCode::FORBIDDEN,
            RoomError::RoomClosed(_) => StatusCode::GONE,
            RoomError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl From<RoomError> for ApiError {
    fn from(error: RoomError) -> Self {
        Self(error)
    }
}

impl From<ValueObjectError> for ApiError {
    fn from(error: ValueObjectError) -> Self {
        Self(RoomError::InvalidValue(error))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::debug!("Request failed with {}: {}", status, self.0);
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        rooms: state.get_rooms_usecase.count().await,
    })
}

/// Get list of live rooms
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<RoomListResponse> {
    let rooms = state.get_rooms_usecase.execute().await;

    // Domain Model から DTO への変換
    Json(RoomListResponse {
        rooms: rooms.iter().map(Into::into).collect(),
    })
}

/// Create a room hosted by the requesting user
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomDetailResponse>), ApiError> {
    let host_name = match body.host_name {
        Some(name) => Username::new(name)?,
        None => Username::new(body.host_id.clone())?,
    };
    let host_id = UserId::new(body.host_id)?;
    let title = RoomTitle::new(body.title)?;

    let snapshot = state
        .create_room_usecase
        .execute(host_id, host_name, title, body.max_participants)
        .await?;
    tracing::info!("Room '{}' created over HTTP", snapshot.id);

    Ok((StatusCode::CREATED, Json((&snapshot).into())))
}

/// Get room detail by ID
pub async fn get_room_detail(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomDetailResponse>, ApiError> {
    let room_id = RoomId::new(room_id)?;
    let snapshot = state.get_room_detail_usecase.execute(&room_id).await?;
    Ok(Json((&snapshot).into()))
}

/// Admit a viewer before it opens its signaling connection
pub async fn join_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Json(body): Json<JoinRoomRequest>,
) -> Result<Json<ParticipantResponse>, ApiError> {
    let room_id = RoomId::new(room_id)?;
    let username = match body.username {
        Some(name) => Username::new(name)?,
        None => Username::new(body.user_id.clone())?,
    };
    let user_id = UserId::new(body.user_id)?;

    let participant = state
        .join_room_usecase
        .execute(&room_id, user_id, username)
        .await?;
    Ok(Json((&participant).into()))
}

/// Leave a room for good
pub async fn leave_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Json(body): Json<UserRequest>,
) -> Result<StatusCode, ApiError> {
    let room_id = RoomId::new(room_id)?;
    let user_id = UserId::new(body.user_id)?;
    state.leave_room_usecase.execute(&room_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// End a room; only its host may do this
pub async fn end_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Json(body): Json<UserRequest>,
) -> Result<StatusCode, ApiError> {
    let room_id = RoomId::new(room_id)?;
    let user_id = UserId::new(body.user_id)?;
    state.end_room_usecase.execute(&room_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
