//! UseCase layer.
//!
//! Use cases resolve the room a request is about and hand the request to
//! that room's session. They never touch room state directly.

pub mod connect_participant;
pub mod create_room;
pub mod disconnect_participant;
pub mod dispatch_action;
pub mod get_rooms;
pub mod room_membership;
pub mod session;

pub use connect_participant::{ConnectParams, ConnectParticipantUseCase, Connected, UserType};
pub use create_room::CreateRoomUseCase;
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use dispatch_action::DispatchActionUseCase;
pub use get_rooms::{GetRoomDetailUseCase, GetRoomsUseCase};
pub use room_membership::{EndRoomUseCase, JoinRoomUseCase, LeaveRoomUseCase};
pub use session::{RoomSpawner, SessionConfig};

use crate::domain::{RoomError, RoomHandle, RoomId, RoomRepository};

/// Look up a live room or fail with `RoomNotFound`.
pub(crate) async fn find_room(
    repository: &dyn RoomRepository,
    room_id: &RoomId,
) -> Result<RoomHandle, RoomError> {
    repository
        .get(room_id)
        .await
        .ok_or_else(|| RoomError::RoomNotFound(room_id.as_str().to_string()))
}
