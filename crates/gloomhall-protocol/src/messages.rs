//! Typed game traffic: player intents in, server notices out.

use serde::{Deserialize, Serialize};

use crate::dto::{CardView, PlayerSummary, RoomSnapshot};
use crate::ids::{CardId, ClassId, PlayerId};
use crate::types::{CardKind, GameMode};

/// A turn-gated explorer action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerActionKind {
    /// Attack a monster on the board with the equipped weapon.
    Attack { target: CardId },
    /// Spend one health die to recover some HP.
    BriefRespite,
    /// Spend two health dice for a larger recovery.
    FullRest,
    /// Take a defensive stance (Guarded status, duration 2).
    Guard,
}

/// A DM-only action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DmActionKind {
    /// Spawn the next monster from the monster deck onto the board.
    PlayMonster,
}

/// Everything a client can ask the engine to do once inside a room.
///
/// Validation (turn ownership, phase, pending flags, AP) happens on the
/// room task; invalid intents produce a targeted
/// [`ServerNotice::ActionError`] or are dropped, never a room-wide fault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientIntent {
    /// Pick a class while in the lobby.
    ChooseClass { class_id: ClassId },
    /// Host only: start the game in the given mode.
    StartGame { mode: GameMode },
    /// Advanced mode: pick the kind of bonus starting card.
    AdvancedCardChoice { kind: CardKind },
    /// End the current turn (must be the active actor).
    EndTurn,
    /// Perform a turn-gated action.
    PlayerAction {
        action: PlayerActionKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        narrative: Option<String>,
    },
    /// Perform a DM action.
    DmAction { action: DmActionKind },
    /// Move a weapon or armor card from hand into its equipment slot.
    EquipItem { card_id: CardId },
    /// Consume a pending event roll granted by the turn engine.
    RollForEvent,
    /// Pick one of the three revealed event cards.
    SelectEventCard { card_id: CardId },
    /// Free-form table talk, relayed to the whole room.
    Chat { text: String },
}

/// How an event roll resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventOutcome {
    /// Roll below 10 — nothing happens.
    Nothing,
    /// Roll 10–14 — a player event fires.
    PlayerEvent,
    /// Roll 15+ — a discovery is offered.
    Discovery,
}

/// The auditable result of one attack resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackReport {
    /// The d20 to-hit roll including the attacker's damage bonus.
    pub attack_roll: i32,
    /// Whether the roll met the target's required roll (inclusive).
    pub hit: bool,
    /// The raw weapon dice result (0 on a miss).
    pub damage_roll: i32,
    /// The attacker's flat damage bonus.
    pub bonus: i32,
    /// Damage actually subtracted from the target.
    pub total_damage: i32,
    /// Whether the target dropped to 0 HP and left the board.
    pub target_defeated: bool,
}

/// Everything the server pushes to clients from inside a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerNotice {
    /// Full room snapshot — the sole state-sync mechanism.
    RoomSnapshot { snapshot: RoomSnapshot },
    /// Lobby roster changed.
    PlayerListUpdate { players: Vec<PlayerSummary> },
    /// The game left the lobby.
    GameStarted { snapshot: RoomSnapshot },
    /// Targeted, non-fatal rejection of an intent.
    ActionError { message: String },
    /// An attack was resolved; the report is broadcast for narration.
    AttackResolved {
        attacker: PlayerId,
        target: CardId,
        report: AttackReport,
    },
    /// Result of a pending event roll.
    EventRollResult {
        player_id: PlayerId,
        roll: i32,
        outcome: EventOutcome,
    },
    /// Targeted reveal of the three candidate event cards.
    EventCardReveal { cards: Vec<CardView> },
    /// A narrated system line (NPC flavor, world events, failures).
    Narration { text: String },
    /// Relayed table talk.
    Chat { from: String, text: String },
}
