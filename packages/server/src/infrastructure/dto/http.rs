//! HTTP API request and response bodies.

use serde::{Deserialize, Serialize};

use crate::domain::{ConnectionState, Role};

use super::websocket::ErrorCode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub host_id: String,
    #[serde(default)]
    pub host_name: Option<String>,
    pub title: String,
    /// Falls back to the server's default capacity when omitted
    #[serde(default)]
    pub max_participants: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    pub user_id: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// Body of leave and end requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryResponse {
    pub id: String,
    pub title: String,
    pub host_id: Option<String>,
    pub participant_count: usize,
    pub max_participants: u32,
    pub is_live: bool,
    /// RFC 3339 (JST)
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomListResponse {
    pub rooms: Vec<RoomSummaryResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantResponse {
    pub user_id: String,
    pub username: String,
    pub role: Role,
    pub connection_state: ConnectionState,
    pub is_muted: bool,
    /// RFC 3339 (JST)
    pub joined_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetailResponse {
    pub id: String,
    pub title: String,
    pub host_id: Option<String>,
    pub max_participants: u32,
    pub is_live: bool,
    pub created_at: String,
    pub sequence_counter: u64,
    pub stroke_count: usize,
    pub chat_count: usize,
    pub participants: Vec<ParticipantResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub rooms: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}
