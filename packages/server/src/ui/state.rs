//! Server state shared by every handler.

use std::sync::Arc;

use crate::usecase::{
    ConnectParticipantUseCase, CreateRoomUseCase, DisconnectParticipantUseCase,
    DispatchActionUseCase, EndRoomUseCase, GetRoomDetailUseCase, GetRoomsUseCase,
    JoinRoomUseCase, LeaveRoomUseCase, SessionConfig,
};

/// Shared application state
pub struct AppState {
    /// ConnectParticipantUseCase（参加者接続のユースケース）
    pub connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    /// DisconnectParticipantUseCase（参加者切断のユースケース）
    pub disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    /// DispatchActionUseCase（クライアント操作の受け渡し）
    pub dispatch_action_usecase: Arc<DispatchActionUseCase>,
    /// CreateRoomUseCase（ルーム作成のユースケース）
    pub create_room_usecase: Arc<CreateRoomUseCase>,
    /// JoinRoomUseCase（ルーム参加のユースケース）
    pub join_room_usecase: Arc<JoinRoomUseCase>,
    /// LeaveRoomUseCase（ルーム退出のユースケース）
    pub leave_room_usecase: Arc<LeaveRoomUseCase>,
    /// EndRoomUseCase（ルーム終了のユースケース）
    pub end_room_usecase: Arc<EndRoomUseCase>,
    /// GetRoomsUseCase（ルーム一覧取得のユースケース）
    pub get_rooms_usecase: Arc<GetRoomsUseCase>,
    /// GetRoomDetailUseCase（ルーム詳細取得のユースケース）
    pub get_room_detail_usecase: Arc<GetRoomDetailUseCase>,
    /// Outbound queue size and malformed frame threshold for new connections
    pub config: Arc<SessionConfig>,
}
