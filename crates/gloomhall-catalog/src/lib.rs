//! Immutable reference data for Gloomhall.
//!
//! The catalog is loaded once at process start and shared read-only by
//! every room: class definitions, card templates, status-effect
//! definitions, action costs, and the NPC name/dialogue pools. Session
//! state never mutates it — decks copy templates out and stamp instance
//! ids on them.

mod data;
mod dialogue;
mod types;

pub use dialogue::DialoguePools;
pub use types::{
    ActionCosts, ClassDefinition, CardTemplate, Effect, EffectKind,
    EquipBonuses, MonsterStats, StatusEffectDefinition, StatusKind,
    TargetSelector, TriggerTiming,
};

use gloomhall_protocol::{CardId, CardKind, ClassId};

/// The full read-only catalog.
pub struct Catalog {
    classes: Vec<ClassDefinition>,
    cards: Vec<CardTemplate>,
    statuses: Vec<StatusEffectDefinition>,
    /// AP prices for the built-in actions (guard, respites).
    pub action_costs: ActionCosts,
    /// Names given to synthesized explorer NPCs, in preference order.
    pub npc_names: Vec<String>,
    /// Name given to a synthesized DM.
    pub dm_name: String,
    /// Flavor lines for NPC narration.
    pub dialogue: DialoguePools,
}

impl Catalog {
    /// The built-in catalog shipped with the engine.
    pub fn builtin() -> Self {
        data::builtin()
    }

    /// Looks up a class definition.
    pub fn class(&self, id: ClassId) -> Option<&ClassDefinition> {
        self.classes.iter().find(|c| c.id == id)
    }

    /// All class definitions, in catalog order.
    pub fn classes(&self) -> &[ClassDefinition] {
        &self.classes
    }

    /// Looks up a card template by its catalog id.
    pub fn card(&self, id: CardId) -> Option<&CardTemplate> {
        self.cards.iter().find(|c| c.id == id)
    }

    /// Looks up a status-effect definition.
    pub fn status(&self, kind: StatusKind) -> Option<&StatusEffectDefinition> {
        self.statuses.iter().find(|s| s.kind == kind)
    }

    /// All templates of one kind, in catalog order.
    pub fn templates_of(&self, kind: CardKind) -> Vec<&CardTemplate> {
        self.cards.iter().filter(|c| c.kind == kind).collect()
    }

    /// Templates that seed the discovery deck: everything drawable as
    /// loot (gear, potions, scrolls, spells, items, consumables).
    pub fn discovery_templates(&self) -> Vec<&CardTemplate> {
        self.cards
            .iter()
            .filter(|c| c.kind.is_discovery_loot())
            .collect()
    }

    /// The class-affine subset of the discovery pool. Callers fall back
    /// to the full pool when this has fewer than three entries.
    pub fn discovery_for_class(&self, class_id: ClassId) -> Vec<&CardTemplate> {
        self.discovery_templates()
            .into_iter()
            .filter(|c| c.class_affinity.is_none_or(|a| a == class_id))
            .collect()
    }
}

/// Extension predicate on [`CardKind`] used to seed the discovery deck.
trait DiscoveryLoot {
    fn is_discovery_loot(&self) -> bool;
}

impl DiscoveryLoot for CardKind {
    fn is_discovery_loot(&self) -> bool {
        matches!(
            self,
            CardKind::Weapon
                | CardKind::Armor
                | CardKind::Potion
                | CardKind::Scroll
                | CardKind::Spell
                | CardKind::Item
                | CardKind::Consumable
                | CardKind::Discovery
        )
    }
}
