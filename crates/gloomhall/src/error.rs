//! Unified error type for the Gloomhall server.

use gloomhall_protocol::ProtocolError;
use gloomhall_room::RoomError;
use gloomhall_session::SessionError;
use gloomhall_transport::TransportError;

/// Top-level error wrapping every layer's error type.
///
/// `#[from]` on each variant lets `?` lift sub-crate errors without
/// explicit conversions.
#[derive(Debug, thiserror::Error)]
pub enum GloomhallError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Room(#[from] RoomError),
}
