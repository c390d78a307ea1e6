//! Snapshot views sent to clients.
//!
//! These are flattened, presentation-ready copies of room state. The
//! engine rebuilds them wholesale after every mutation; clients never
//! receive diffs.

use serde::{Deserialize, Serialize};

use crate::ids::{CardId, PlayerId, RoomCode};
use crate::types::{CardKind, GameMode, GamePhase, Role};

/// A card as shown to clients (hand, equipment, reveals).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardView {
    pub id: CardId,
    pub name: String,
    pub kind: CardKind,
    pub ap_cost: u8,
    pub description: String,
}

/// An active status effect on an actor or monster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusView {
    pub name: String,
    /// Rounds remaining before the effect wears off.
    pub remaining: u8,
}

/// One seat in the room, fully described.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorView {
    pub id: PlayerId,
    pub name: String,
    pub role: Role,
    pub is_npc: bool,
    pub class_name: Option<String>,
    pub max_hp: i32,
    pub current_hp: i32,
    pub damage_bonus: i32,
    pub shield_bonus: i32,
    pub ap: i32,
    pub current_ap: i32,
    pub lives: u8,
    pub health_dice_max: u8,
    pub health_dice_current: u8,
    pub hand: Vec<CardView>,
    pub weapon: Option<CardView>,
    pub armor: Option<CardView>,
    pub statuses: Vec<StatusView>,
    pub pending_event_roll: bool,
    pub fallen: bool,
}

/// A live monster on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterView {
    pub instance_id: CardId,
    pub name: String,
    pub current_hp: i32,
    pub max_hp: i32,
    pub required_roll_to_hit: i32,
    pub statuses: Vec<StatusView>,
}

/// Compact roster entry for lobby updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub role: Role,
    pub is_npc: bool,
    pub class_name: Option<String>,
    pub is_host: bool,
}

/// The full room view — the sole state-sync payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room_code: RoomCode,
    pub host: PlayerId,
    pub phase: GamePhase,
    pub mode: GameMode,
    pub players: Vec<ActorView>,
    /// Seat order fixed at game start; empty while in the lobby.
    pub turn_order: Vec<PlayerId>,
    /// −1 before the first turn.
    pub current_turn_index: i32,
    pub active_player: Option<PlayerId>,
    pub board: Vec<MonsterView>,
    pub current_world_event: Option<CardView>,
    pub turns_elapsed: u32,
    pub monsters_defeated: u32,
    pub stage: u32,
}
