//! Builds the client-facing room view.
//!
//! Snapshots are rebuilt wholesale after every mutation; there is no
//! diffing and no per-field patching anywhere in the engine.

use gloomhall_protocol::{
    ActorView, CardView, MonsterView, PlayerSummary, RoomSnapshot, StatusView,
};

use crate::cards::{CardInstance, StatusInstance};
use crate::engine::GameState;

pub(crate) fn card_view(card: &CardInstance) -> CardView {
    CardView {
        id: card.id,
        name: card.template.name.clone(),
        kind: card.template.kind,
        ap_cost: card.template.ap_cost,
        description: card.template.description.clone(),
    }
}

fn status_views(statuses: &[StatusInstance]) -> Vec<StatusView> {
    statuses
        .iter()
        .map(|s| StatusView {
            name: s.kind.to_string(),
            remaining: s.remaining,
        })
        .collect()
}

impl GameState {
    /// The full room view, the sole state-sync payload.
    pub fn snapshot(&self) -> RoomSnapshot {
        let players = self
            .players
            .iter()
            .map(|p| ActorView {
                id: p.id,
                name: p.name.clone(),
                role: p.role,
                is_npc: p.is_npc,
                class_name: p
                    .class
                    .and_then(|c| self.catalog.class(c))
                    .map(|c| c.name.clone()),
                max_hp: p.stats.max_hp,
                current_hp: p.stats.current_hp,
                damage_bonus: p.stats.damage_bonus,
                shield_bonus: p.stats.shield_bonus,
                ap: p.stats.ap,
                current_ap: p.current_ap,
                lives: p.lives,
                health_dice_max: p.health_dice.max,
                health_dice_current: p.health_dice.current,
                hand: p.hand.iter().map(card_view).collect(),
                weapon: p.weapon.as_ref().map(card_view),
                armor: p.armor.as_ref().map(card_view),
                statuses: status_views(&p.statuses),
                pending_event_roll: p.pending_event_roll,
                fallen: p.fallen,
            })
            .collect();

        let board = self
            .board
            .iter()
            .map(|m| MonsterView {
                instance_id: m.instance_id,
                name: m.template.name.clone(),
                current_hp: m.current_hp,
                max_hp: m.max_hp,
                required_roll_to_hit: m.required_roll(),
                statuses: status_views(&m.statuses),
            })
            .collect();

        RoomSnapshot {
            room_code: self.room_code.clone(),
            host: self.host_id(),
            phase: self.phase,
            mode: self.mode,
            players,
            turn_order: self.turn_order.clone(),
            current_turn_index: self.current_turn_index,
            active_player: self.active_id(),
            board,
            current_world_event: self.current_world_event.as_ref().map(card_view),
            turns_elapsed: self.turns_elapsed,
            monsters_defeated: self.monsters_defeated,
            stage: self.stage,
        }
    }

    /// Compact roster for lobby updates.
    pub(crate) fn roster(&self) -> Vec<PlayerSummary> {
        let host = self.host_id();
        self.players
            .iter()
            .map(|p| PlayerSummary {
                id: p.id,
                name: p.name.clone(),
                role: p.role,
                is_npc: p.is_npc,
                class_name: p
                    .class
                    .and_then(|c| self.catalog.class(c))
                    .map(|c| c.name.clone()),
                is_host: p.id == host,
            })
            .collect()
    }
}
