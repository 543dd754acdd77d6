//! Rejections of player intents

use super::session::Role;

/// Why a player intent was not applied.
///
/// Every variant leaves the session untouched. Only some are reported
/// back to the sender; the rest are dropped quietly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Already in a game")]
    AlreadyInSession,

    #[error("Lobby is full or game already started")]
    LobbyFull,

    #[error("Role is already full")]
    RoleFull(Role),

    #[error("Cannot start game - not all roles filled")]
    CannotStart,

    #[error("Not in a game")]
    NotInSession,

    #[error("Not in a lobby")]
    NotInLobby,

    #[error("Game is not in progress")]
    NotPlaying,

    #[error("Invalid spray direction")]
    InvalidDirection,

    #[error("No water left")]
    NoWater,

    #[error("Hose is not connected")]
    HoseNotConnected,

    #[error("Hose cannot reach that far")]
    HoseTooLong,

    #[error("Unknown civilian")]
    UnknownCivilian,

    #[error("Civilian already rescued")]
    AlreadyRescued,
}

impl GameError {
    /// Whether the sender gets an `error` message for this rejection
    pub fn notify_client(&self) -> bool {
        matches!(
            self,
            GameError::AlreadyInSession
                | GameError::LobbyFull
                | GameError::RoleFull(_)
                | GameError::CannotStart
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lobby_failures_are_reported() {
        assert!(GameError::RoleFull(Role::Firefighter).notify_client());
        assert!(GameError::CannotStart.notify_client());
        assert!(!GameError::NotPlaying.notify_client());
        assert!(!GameError::NoWater.notify_client());
        assert_eq!(
            GameError::CannotStart.to_string(),
            "Cannot start game - not all roles filled"
        );
    }
}
