//! Control surface: authorization rules for privileged room actions.

use super::{directory::ParticipantDirectory, error::RoomError, value_object::UserId};

/// Actions gated by the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Mute,
    Promote,
    Kick,
    ClearCanvas,
    EndRoom,
}

impl ControlAction {
    /// Whether the action names another participant as its target.
    fn is_targeted(&self) -> bool {
        matches!(self, Self::Mute | Self::Promote | Self::Kick)
    }
}

/// Check whether `actor` may perform `action` on `target`.
///
/// Self-mute is always allowed for a participant. Every other action needs
/// the current host, and targeted actions may not target the host itself.
pub fn authorize(
    directory: &ParticipantDirectory,
    actor: &UserId,
    action: ControlAction,
    target: Option<&UserId>,
) -> Result<(), RoomError> {
    let unauthorized = || RoomError::Unauthorized(actor.as_str().to_string());

    let Some(acting) = directory.get(actor) else {
        return Err(unauthorized());
    };

    if action == ControlAction::Mute && target == Some(actor) {
        return Ok(());
    }

    if !acting.is_host() {
        return Err(unauthorized());
    }

    if action.is_targeted() {
        let target = target.ok_or_else(unauthorized)?;
        if target == actor {
            return Err(unauthorized());
        }
        directory.require(target)?;
    }

    Ok(())
}

/// Undo is allowed for the author of the stroke being removed, or the host.
pub fn authorize_undo(
    directory: &ParticipantDirectory,
    actor: &UserId,
    stroke_author: &UserId,
) -> Result<(), RoomError> {
    let acting = directory
        .get(actor)
        .ok_or_else(|| RoomError::Unauthorized(actor.as_str().to_string()))?;
    if acting.is_host() || actor == stroke_author {
        Ok(())
    } else {
        Err(RoomError::Unauthorized(actor.as_str().to_string()))
    }
}
