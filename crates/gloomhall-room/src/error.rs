use gloomhall_game::GameError;
use gloomhall_protocol::RoomCode;

/// Room-level failures, surfaced to the connection handler.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room {0} not found")]
    NotFound(RoomCode),
    #[error("room is full")]
    RoomFull,
    #[error("already in a room")]
    AlreadyInRoom,
    #[error("not in a room")]
    NotInRoom,
    #[error("the game has already started")]
    AlreadyStarted,
    #[error("room is unavailable")]
    Unavailable,
}

impl From<GameError> for RoomError {
    fn from(err: GameError) -> Self {
        match err {
            GameError::RoomFull => Self::RoomFull,
            GameError::AlreadyStarted => Self::AlreadyStarted,
            GameError::AlreadySeated(_) => Self::AlreadyInRoom,
        }
    }
}
