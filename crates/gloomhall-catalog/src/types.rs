//! Catalog entity types.

use gloomhall_protocol::{CardId, CardKind, ClassId};

/// A playable character class.
#[derive(Debug, Clone)]
pub struct ClassDefinition {
    pub id: ClassId,
    pub name: String,
    pub base_hp: i32,
    pub damage_bonus: i32,
    pub shield_bonus: i32,
    pub base_ap: i32,
    /// How many health dice the class starts with.
    pub health_dice: u8,
    /// The die rolled when spending a health die (e.g. `1d8`).
    pub health_die: String,
    /// Catalog id of the weapon every member starts with.
    pub starter_weapon: CardId,
}

/// What an effect fundamentally does when it resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Damage,
    Heal,
    Status,
    Utility,
}

/// Who an effect may be pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSelector {
    SelfOnly,
    AnyExplorer,
    AnyMonster,
}

/// The resolvable payload of a card.
#[derive(Debug, Clone)]
pub struct Effect {
    pub kind: EffectKind,
    /// Dice notation, empty when the effect has no roll (pure status).
    pub dice: String,
    /// Status inflicted on the target, if any.
    pub status: Option<StatusKind>,
    /// Rounds the inflicted status lasts.
    pub status_duration: u8,
    pub target: TargetSelector,
}

impl Effect {
    pub fn damage(dice: &str, target: TargetSelector) -> Self {
        Self {
            kind: EffectKind::Damage,
            dice: dice.to_string(),
            status: None,
            status_duration: 0,
            target,
        }
    }

    pub fn heal(dice: &str, target: TargetSelector) -> Self {
        Self {
            kind: EffectKind::Heal,
            dice: dice.to_string(),
            status: None,
            status_duration: 0,
            target,
        }
    }

    pub fn status(kind: StatusKind, duration: u8, target: TargetSelector) -> Self {
        Self {
            kind: EffectKind::Status,
            dice: String::new(),
            status: Some(kind),
            status_duration: duration,
            target,
        }
    }

    pub fn utility() -> Self {
        Self {
            kind: EffectKind::Utility,
            dice: String::new(),
            status: None,
            status_duration: 0,
            target: TargetSelector::SelfOnly,
        }
    }

    /// Attaches an inflicted status to a damage effect.
    pub fn inflicting(mut self, status: StatusKind, duration: u8) -> Self {
        self.status = Some(status);
        self.status_duration = duration;
        self
    }
}

/// Flat stat contributions from an equipped card.
#[derive(Debug, Clone, Copy, Default)]
pub struct EquipBonuses {
    pub damage: i32,
    pub shield: i32,
    /// May be negative (heavy armor slows you down).
    pub ap: i32,
}

/// Monster-only template fields.
#[derive(Debug, Clone, Copy)]
pub struct MonsterStats {
    pub hp: i32,
    /// Minimum attack roll needed to hit this monster (inclusive).
    pub required_roll_to_hit: i32,
    /// Status inflicted on explorers by this monster's events, if any.
    pub inflicts: Option<StatusKind>,
}

/// A card template. Copied (never referenced mutably) into session state.
#[derive(Debug, Clone)]
pub struct CardTemplate {
    pub id: CardId,
    pub name: String,
    pub kind: CardKind,
    pub ap_cost: u8,
    pub effect: Option<Effect>,
    pub bonuses: Option<EquipBonuses>,
    pub monster: Option<MonsterStats>,
    /// Discovery filtering: when set, only this class draws it from the
    /// class-filtered pool. `None` means any class.
    pub class_affinity: Option<ClassId>,
    pub description: String,
}

/// The named, duration-bounded modifiers an actor can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    Poisoned,
    Burning,
    Stunned,
    Guarded,
    Blessed,
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Poisoned => write!(f, "Poisoned"),
            Self::Burning => write!(f, "Burning"),
            Self::Stunned => write!(f, "Stunned"),
            Self::Guarded => write!(f, "Guarded"),
            Self::Blessed => write!(f, "Blessed"),
        }
    }
}

/// When a status effect's periodic payload fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerTiming {
    /// At the start of the afflicted actor's turn.
    TurnStart,
    /// At the end of the afflicted actor's turn.
    TurnEnd,
}

/// The rules text behind a [`StatusKind`].
#[derive(Debug, Clone)]
pub struct StatusEffectDefinition {
    pub kind: StatusKind,
    pub trigger: TriggerTiming,
    /// Damage rolled when the trigger fires; empty for harmless statuses.
    pub damage_dice: String,
    /// The afflicted actor loses their turn while this holds.
    pub cannot_act: bool,
    /// Added to the afflicted actor's d20 rolls.
    pub roll_modifier: i32,
    pub description: String,
}

/// AP prices for the built-in (non-card) actions.
#[derive(Debug, Clone, Copy)]
pub struct ActionCosts {
    pub guard: i32,
    pub brief_respite: i32,
    pub full_rest: i32,
}

impl Default for ActionCosts {
    fn default() -> Self {
        Self {
            guard: 1,
            brief_respite: 1,
            full_rest: 2,
        }
    }
}
