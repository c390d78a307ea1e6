//! What the engine hands back to the room actor.

use std::time::Duration;

use gloomhall_protocol::{CardId, PlayerId, Recipient, ServerNotice};

/// A delayed engine event, carried by the room's pacer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingEvent {
    /// Move to the next seat in the turn order.
    AdvanceTurn,
    /// Draw and place the next monster.
    SpawnMonster,
    /// An NPC explorer's turn comes up for a decision.
    NpcTurn { actor: PlayerId },
    /// The delayed swing after an NPC's attack flavor line.
    NpcStrike { attacker: PlayerId, target: CardId },
}

/// The batch of outputs from one engine call: notices to fan out and
/// events to schedule. The engine never sends or sleeps itself.
#[derive(Debug, Default)]
pub struct Effects {
    pub notices: Vec<(Recipient, ServerNotice)>,
    pub scheduled: Vec<(Duration, PacingEvent)>,
}

impl Effects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&mut self, to: Recipient, notice: ServerNotice) {
        self.notices.push((to, notice));
    }

    /// Broadcast narration.
    pub fn narrate(&mut self, text: impl Into<String>) {
        self.notify(
            Recipient::All,
            ServerNotice::Narration { text: text.into() },
        );
    }

    /// Targeted, non-fatal rejection.
    pub fn error_to(&mut self, player: PlayerId, message: impl Into<String>) {
        self.notify(
            Recipient::Player(player),
            ServerNotice::ActionError {
                message: message.into(),
            },
        );
    }

    pub fn schedule(&mut self, delay: Duration, event: PacingEvent) {
        self.scheduled.push((delay, event));
    }

    pub fn merge(&mut self, mut other: Effects) {
        self.notices.append(&mut other.notices);
        self.scheduled.append(&mut other.scheduled);
    }
}

/// Delay lengths for the dramatic beats. All zero under test.
#[derive(Debug, Clone, Copy)]
pub struct PacingProfile {
    /// Turn start to an NPC's decision.
    pub npc_think: Duration,
    /// Attack flavor line to the actual swing.
    pub npc_attack_flavor: Duration,
    /// An NPC's completed action to the next turn.
    pub npc_act: Duration,
    /// World event to the follow-up monster spawn.
    pub dm_spawn: Duration,
    /// Monster spawn to the next turn.
    pub dm_advance: Duration,
}

impl PacingProfile {
    /// The pacing used in real play.
    pub fn standard() -> Self {
        Self {
            npc_think: Duration::from_millis(1500),
            npc_attack_flavor: Duration::from_millis(1200),
            npc_act: Duration::from_millis(1200),
            dm_spawn: Duration::from_millis(1500),
            dm_advance: Duration::from_millis(1500),
        }
    }

    /// Zero delays, for tests and simulations.
    pub fn instant() -> Self {
        Self {
            npc_think: Duration::ZERO,
            npc_attack_flavor: Duration::ZERO,
            npc_act: Duration::ZERO,
            dm_spawn: Duration::ZERO,
            dm_advance: Duration::ZERO,
        }
    }
}

impl Default for PacingProfile {
    fn default() -> Self {
        Self::standard()
    }
}
