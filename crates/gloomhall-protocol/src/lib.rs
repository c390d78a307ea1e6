//! Wire protocol for Gloomhall.
//!
//! Defines the "language" that clients and the game server speak:
//!
//! - **Identity** ([`PlayerId`], [`RoomCode`], [`CardId`], [`ClassId`]).
//! - **Envelope types** ([`Envelope`], [`SystemMessage`], [`Channel`]) —
//!   the framework-level plumbing: handshake, heartbeat, room join/leave.
//! - **Game messages** ([`ClientIntent`], [`ServerNotice`]) — typed player
//!   intents and the notices the engine broadcasts back.
//! - **Snapshots** ([`RoomSnapshot`] and friends) — the full-room view that
//!   is the sole state-sync mechanism; no incremental diffs.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — byte conversion.
//!
//! The protocol layer knows nothing about connections or rooms; it only
//! describes shapes and how to serialize them.

mod codec;
mod dto;
mod error;
mod ids;
mod messages;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use dto::{
    ActorView, CardView, MonsterView, PlayerSummary, RoomSnapshot, StatusView,
};
pub use error::ProtocolError;
pub use ids::{CardId, ClassId, PlayerId, RoomCode};
pub use messages::{
    AttackReport, ClientIntent, DmActionKind, EventOutcome, PlayerActionKind,
    ServerNotice,
};
pub use types::{
    CardKind, Channel, Envelope, GameMode, GamePhase, Payload, Recipient, Role,
    SystemMessage,
};
