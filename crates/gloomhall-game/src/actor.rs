//! Player seats and derived stats.

use gloomhall_catalog::{Catalog, StatusKind};
use gloomhall_protocol::{ClassId, PlayerId, Role};

use crate::cards::{CardInstance, StatusInstance};

/// Derived combat numbers. Recomputed from class and equipment, never
/// edited piecemeal.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stats {
    pub max_hp: i32,
    pub current_hp: i32,
    pub damage_bonus: i32,
    pub shield_bonus: i32,
    /// AP granted at the start of each of this actor's turns.
    pub ap: i32,
}

/// The recovery resource spent by respites.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthDice {
    pub max: u8,
    pub current: u8,
}

/// One seat in a room: a human player or an NPC fill-in.
#[derive(Debug)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub is_npc: bool,
    pub role: Role,
    pub class: Option<ClassId>,
    pub stats: Stats,
    pub current_ap: i32,
    pub lives: u8,
    /// Out of lives; skipped by the turn loop.
    pub fallen: bool,
    pub health_dice: HealthDice,
    pub hand: Vec<CardInstance>,
    pub weapon: Option<CardInstance>,
    pub armor: Option<CardInstance>,
    pub statuses: Vec<StatusInstance>,
    /// Granted by the turn engine, consumed by `RollForEvent`.
    pub pending_event_roll: bool,
    /// The three revealed candidates awaiting `SelectEventCard`.
    pub pending_event_choice: Option<Vec<CardInstance>>,
    /// Advanced mode: whether this seat already took its setup boon.
    pub advanced_choice_made: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: String, is_npc: bool, lives: u8) -> Self {
        Self {
            id,
            name,
            is_npc,
            role: Role::Explorer,
            class: None,
            stats: Stats::default(),
            current_ap: 0,
            lives,
            fallen: false,
            health_dice: HealthDice::default(),
            hand: Vec::new(),
            weapon: None,
            armor: None,
            statuses: Vec::new(),
            pending_event_roll: false,
            pending_event_choice: None,
            advanced_choice_made: false,
        }
    }

    /// Rebuilds derived stats from role, class and equipment.
    ///
    /// The HP deficit is carried across: a recompute never heals, and
    /// never kills an actor who was above zero. AP never drops below 1
    /// no matter how heavy the armor.
    pub fn recompute_stats(&mut self, catalog: &Catalog) {
        let old_max = self.stats.max_hp;
        let old_hp = self.stats.current_hp;

        let (max_hp, mut damage, mut shield, mut ap) = match self.role {
            // The keeper narrates; their numbers are out of reach.
            Role::Dm => (9999, 99, 99, 99),
            Role::Explorer => match self.class.and_then(|c| catalog.class(c)) {
                Some(class) => (
                    class.base_hp,
                    class.damage_bonus,
                    class.shield_bonus,
                    class.base_ap,
                ),
                None => (20, 0, 0, 3),
            },
        };

        if let Some(b) = self.weapon.as_ref().and_then(|w| w.template.bonuses) {
            damage += b.damage;
            shield += b.shield;
            ap += b.ap;
        }
        if let Some(b) = self.armor.as_ref().and_then(|a| a.template.bonuses) {
            damage += b.damage;
            shield += b.shield;
            ap += b.ap;
        }
        let ap = ap.max(1);

        let current_hp = if old_max == 0 {
            max_hp
        } else {
            let shifted = old_hp + (max_hp - old_max);
            if old_hp > 0 {
                shifted.clamp(1, max_hp)
            } else {
                shifted.min(max_hp)
            }
        };

        self.stats = Stats {
            max_hp,
            current_hp,
            damage_bonus: damage,
            shield_bonus: shield,
            ap,
        };
        self.current_ap = self.current_ap.min(ap);
    }

    /// Heals up to `amount`, clamped at max HP. Returns the HP actually
    /// restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.stats.current_hp;
        self.stats.current_hp = (before + amount.max(0)).min(self.stats.max_hp);
        self.stats.current_hp - before
    }

    /// Applies a status, extending the duration if it is already active.
    pub fn apply_status(&mut self, kind: StatusKind, duration: u8) {
        match self.statuses.iter_mut().find(|s| s.kind == kind) {
            Some(s) => s.remaining = s.remaining.max(duration),
            None => self.statuses.push(StatusInstance {
                kind,
                remaining: duration,
            }),
        }
    }

    pub fn has_status(&self, kind: StatusKind) -> bool {
        self.statuses.iter().any(|s| s.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gloomhall_catalog::{CardTemplate, EquipBonuses};
    use gloomhall_protocol::{CardId, CardKind};

    fn catalog() -> Catalog {
        Catalog::builtin()
    }

    fn explorer() -> Player {
        Player::new(PlayerId(1), "Ada".into(), false, 3)
    }

    #[test]
    fn test_classless_explorer_gets_placeholder_stats() {
        let mut p = explorer();
        p.recompute_stats(&catalog());
        assert_eq!(p.stats.max_hp, 20);
        assert_eq!(p.stats.current_hp, 20);
        assert_eq!(p.stats.damage_bonus, 0);
        assert_eq!(p.stats.ap, 3);
    }

    #[test]
    fn test_dm_stats_are_effectively_unbounded() {
        let mut p = explorer();
        p.role = Role::Dm;
        p.recompute_stats(&catalog());
        assert_eq!(p.stats.max_hp, 9999);
        assert_eq!(p.stats.ap, 99);
    }

    #[test]
    fn test_recompute_preserves_hp_deficit_across_class_change() {
        let catalog = catalog();
        let mut p = explorer();
        p.class = Some(catalog.classes()[0].id);
        p.recompute_stats(&catalog);
        let first_max = p.stats.max_hp;
        p.stats.current_hp -= 5;

        p.class = Some(catalog.classes()[1].id);
        p.recompute_stats(&catalog);
        let second_max = p.stats.max_hp;
        assert_ne!(first_max, second_max, "classes must differ in HP");
        assert_eq!(p.stats.current_hp, second_max - 5);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let catalog = catalog();
        let mut p = explorer();
        p.class = Some(catalog.classes()[0].id);
        p.recompute_stats(&catalog);
        p.stats.current_hp -= 7;
        p.recompute_stats(&catalog);
        let once = p.stats;
        p.recompute_stats(&catalog);
        assert_eq!(p.stats.current_hp, once.current_hp);
        assert_eq!(p.stats.max_hp, once.max_hp);
    }

    #[test]
    fn test_recompute_never_kills_from_gear_alone() {
        let catalog = catalog();
        let mut p = explorer();
        p.class = Some(catalog.classes()[0].id);
        p.recompute_stats(&catalog);
        p.stats.current_hp = 1;
        // Dropping to a lower-HP class would shift below zero unclamped.
        p.class = Some(catalog.classes()[1].id);
        p.recompute_stats(&catalog);
        assert!(p.stats.current_hp >= 1);
    }

    #[test]
    fn test_ap_never_drops_below_one() {
        let catalog = catalog();
        let mut p = explorer();
        p.class = Some(catalog.classes()[0].id);
        let mut ids = crate::cards::InstanceCounter::new();
        let leaden = CardTemplate {
            id: CardId(999),
            name: "Leaden Shell".into(),
            kind: CardKind::Armor,
            ap_cost: 1,
            effect: None,
            bonuses: Some(EquipBonuses {
                shield: 5,
                ap: -10,
                ..Default::default()
            }),
            monster: None,
            class_affinity: None,
            description: "Barely walkable.".into(),
        };
        p.armor = Some(CardInstance::stamp(&leaden, &mut ids));
        p.recompute_stats(&catalog);
        assert_eq!(p.stats.ap, 1);
    }

    #[test]
    fn test_heal_clamps_at_max() {
        let catalog = catalog();
        let mut p = explorer();
        p.class = Some(catalog.classes()[0].id);
        p.recompute_stats(&catalog);
        p.stats.current_hp -= 3;
        assert_eq!(p.heal(100), 3);
        assert_eq!(p.stats.current_hp, p.stats.max_hp);
    }

    #[test]
    fn test_apply_status_extends_not_stacks() {
        let mut p = explorer();
        p.apply_status(StatusKind::Guarded, 2);
        p.statuses[0].remaining = 1;
        p.apply_status(StatusKind::Guarded, 2);
        assert_eq!(p.statuses.len(), 1);
        assert_eq!(p.statuses[0].remaining, 2);
    }
}
