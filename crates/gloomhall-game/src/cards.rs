//! Session-side card and monster instances.
//!
//! Templates never leave the catalog; everything a room holds is a
//! stamped copy with a fresh instance id, so two Giant Rats drawn in one
//! session stay distinguishable.

use gloomhall_catalog::{CardTemplate, StatusKind};
use gloomhall_protocol::{CardId, CardKind};

/// Hands out instance ids, counting up from [`CardId::INSTANCE_BASE`].
#[derive(Debug)]
pub struct InstanceCounter {
    next: u32,
}

impl InstanceCounter {
    pub fn new() -> Self {
        Self {
            next: CardId::INSTANCE_BASE,
        }
    }

    pub fn next_id(&mut self) -> CardId {
        let id = CardId(self.next);
        self.next += 1;
        id
    }
}

impl Default for InstanceCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// A drawn card: a template copy with its own identity.
#[derive(Debug, Clone)]
pub struct CardInstance {
    pub id: CardId,
    pub template: CardTemplate,
}

impl CardInstance {
    pub fn stamp(template: &CardTemplate, ids: &mut InstanceCounter) -> Self {
        Self {
            id: ids.next_id(),
            template: template.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.template.name
    }

    pub fn kind(&self) -> CardKind {
        self.template.kind
    }
}

/// A status effect currently riding on an actor or monster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusInstance {
    pub kind: StatusKind,
    /// Rounds left before it wears off.
    pub remaining: u8,
}

/// A monster standing on the board.
#[derive(Debug, Clone)]
pub struct MonsterInstance {
    pub instance_id: CardId,
    pub template: CardTemplate,
    pub max_hp: i32,
    pub current_hp: i32,
    pub statuses: Vec<StatusInstance>,
}

impl MonsterInstance {
    /// Turns a drawn monster card into a board presence. `bonus_hp`
    /// carries the stage scaling.
    pub fn from_card(card: CardInstance, bonus_hp: i32) -> Self {
        let hp = card.template.monster.map(|m| m.hp).unwrap_or(1) + bonus_hp.max(0);
        Self {
            instance_id: card.id,
            template: card.template,
            max_hp: hp,
            current_hp: hp,
            statuses: Vec::new(),
        }
    }

    /// Minimum attack roll needed to hit this monster (inclusive).
    pub fn required_roll(&self) -> i32 {
        self.template
            .monster
            .map(|m| m.required_roll_to_hit)
            .unwrap_or(10)
    }

    pub fn name(&self) -> &str {
        &self.template.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gloomhall_catalog::Catalog;

    #[test]
    fn test_instance_ids_start_above_catalog_space() {
        let mut ids = InstanceCounter::new();
        let first = ids.next_id();
        assert_eq!(first.0, CardId::INSTANCE_BASE);
        assert_eq!(ids.next_id().0, CardId::INSTANCE_BASE + 1);
    }

    #[test]
    fn test_stamped_copies_are_distinct() {
        let catalog = Catalog::builtin();
        let template = catalog.card(CardId(101)).unwrap();
        let mut ids = InstanceCounter::new();
        let a = CardInstance::stamp(template, &mut ids);
        let b = CardInstance::stamp(template, &mut ids);
        assert_ne!(a.id, b.id);
        assert_eq!(a.name(), b.name());
    }

    #[test]
    fn test_monster_from_card_applies_bonus_hp() {
        let catalog = Catalog::builtin();
        let template = catalog.card(CardId(201)).unwrap();
        let base_hp = template.monster.unwrap().hp;
        let mut ids = InstanceCounter::new();
        let card = CardInstance::stamp(template, &mut ids);
        let monster = MonsterInstance::from_card(card, 2);
        assert_eq!(monster.max_hp, base_hp + 2);
        assert_eq!(monster.current_hp, monster.max_hp);
    }
}
