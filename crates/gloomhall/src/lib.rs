//! # Gloomhall
//!
//! Authoritative server for a cooperative tabletop session: rooms with
//! five-letter join codes, DM-first turn sequencing, d20 combat, card
//! decks, and NPC fill-ins for any role a human does not take.
//!
//! Clients connect over WebSocket and speak JSON envelopes; every game
//! decision is made server-side and synced back as full room snapshots.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), gloomhall::GloomhallError> {
//! use gloomhall::prelude::*;
//!
//! let server = GloomhallServer::<OpenDoorAuth, gloomhall_protocol::JsonCodec>::builder()
//!     .bind("0.0.0.0:8080")
//!     .build(OpenDoorAuth)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::GloomhallError;
pub use server::{GloomhallServer, GloomhallServerBuilder, PROTOCOL_VERSION};

/// Everything needed to stand up a server or write a client against it.
pub mod prelude {
    pub use crate::{
        GloomhallError, GloomhallServer, GloomhallServerBuilder,
        PROTOCOL_VERSION,
    };
    pub use gloomhall_catalog::Catalog;
    pub use gloomhall_game::{GameConfig, PacingProfile};
    pub use gloomhall_protocol::{
        CardId, CardKind, Channel, ClassId, ClientIntent, DmActionKind,
        Envelope, EventOutcome, GameMode, GamePhase, Payload,
        PlayerActionKind, PlayerId, Recipient, RoomCode, RoomSnapshot,
        ServerNotice, SystemMessage,
    };
    pub use gloomhall_session::{
        Authenticator, OpenDoorAuth, SessionConfig, SessionError,
    };
}
