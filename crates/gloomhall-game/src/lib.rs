//! The Gloomhall rules engine.
//!
//! Everything here is synchronous and transport-free. A [`GameState`]
//! lives on a room task; intents and pacing events go in, an [`Effects`]
//! batch comes out — notices to fan out and delayed events to put on the
//! room's pacer. Nothing in this crate awaits, sleeps, or talks to a
//! socket, which is what makes the turn rules unit-testable with a
//! seeded RNG.

mod actor;
mod cards;
mod combat;
mod deck;
mod effects;
mod engine;
mod events;
mod npc;
mod snapshot;

pub use actor::{HealthDice, Player, Stats};
pub use cards::{CardInstance, InstanceCounter, MonsterInstance, StatusInstance};
pub use combat::{judge_attack, resolve_attack};
pub use deck::Deck;
pub use effects::{Effects, PacingEvent, PacingProfile};
pub use engine::{GameConfig, GameState};
pub use events::classify_event_roll;
pub use npc::NpcAction;

use gloomhall_protocol::PlayerId;

/// Failures surfaced to the room layer when membership changes are
/// rejected. Everything else (bad intents, wrong turn, missing AP) is a
/// targeted notice, not an error.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("room is full")]
    RoomFull,
    #[error("game already started")]
    AlreadyStarted,
    #[error("player {0} is already seated")]
    AlreadySeated(PlayerId),
}
