//! Player sessions for Gloomhall.
//!
//! A session is created at handshake time and assigns the connection its
//! [`PlayerId`](gloomhall_protocol::PlayerId) plus a reconnect token. A
//! dropped connection keeps its session alive for a grace window so the
//! player can resume the same seat; after that the session expires and
//! the server frees the seat.

mod auth;
mod manager;

pub use auth::{Authenticator, OpenDoorAuth};
pub use manager::{Session, SessionConfig, SessionManager, SessionState};

/// Session-layer failures.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("authentication rejected: {0}")]
    Rejected(String),
    #[error("unknown or expired session token")]
    UnknownToken,
}
