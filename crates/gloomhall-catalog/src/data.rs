//! The built-in catalog content.
//!
//! Numbering convention: classes 1–99, weapons 101–119, armor 120–139,
//! potions 140–149, scrolls 150–159, spells 160–199, monsters 201–299,
//! world events 301–319, player events 320–399. Everything stays below
//! [`CardId::INSTANCE_BASE`] so stamped instances can never collide.

use gloomhall_protocol::{CardId, CardKind, ClassId};

use crate::dialogue::DialoguePools;
use crate::types::{
    ActionCosts, ClassDefinition, CardTemplate, Effect, EquipBonuses,
    MonsterStats, StatusEffectDefinition, StatusKind, TargetSelector,
    TriggerTiming,
};
use crate::Catalog;

pub(crate) fn builtin() -> Catalog {
    Catalog {
        classes: classes(),
        cards: cards(),
        statuses: statuses(),
        action_costs: ActionCosts::default(),
        npc_names: ["Brakka", "Fennel", "Osric", "Maudie", "Tobben", "Yara"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        dm_name: "The Keeper".to_string(),
        dialogue: DialoguePools::builtin(),
    }
}

fn classes() -> Vec<ClassDefinition> {
    vec![
        ClassDefinition {
            id: ClassId(1),
            name: "Warrior".into(),
            base_hp: 24,
            damage_bonus: 2,
            shield_bonus: 1,
            base_ap: 3,
            health_dice: 4,
            health_die: "1d10".into(),
            starter_weapon: CardId(101),
        },
        ClassDefinition {
            id: ClassId(2),
            name: "Mage".into(),
            base_hp: 18,
            damage_bonus: 1,
            shield_bonus: 0,
            base_ap: 4,
            health_dice: 4,
            health_die: "1d6".into(),
            starter_weapon: CardId(102),
        },
        ClassDefinition {
            id: ClassId(3),
            name: "Rogue".into(),
            base_hp: 20,
            damage_bonus: 2,
            shield_bonus: 0,
            base_ap: 4,
            health_dice: 4,
            health_die: "1d8".into(),
            starter_weapon: CardId(103),
        },
        ClassDefinition {
            id: ClassId(4),
            name: "Cleric".into(),
            base_hp: 22,
            damage_bonus: 1,
            shield_bonus: 1,
            base_ap: 3,
            health_dice: 4,
            health_die: "1d8".into(),
            starter_weapon: CardId(104),
        },
    ]
}

fn weapon(
    id: u32,
    name: &str,
    dice: &str,
    damage_bonus: i32,
    affinity: Option<u32>,
    description: &str,
) -> CardTemplate {
    CardTemplate {
        id: CardId(id),
        name: name.into(),
        kind: CardKind::Weapon,
        ap_cost: 2,
        effect: Some(Effect::damage(dice, TargetSelector::AnyMonster)),
        bonuses: Some(EquipBonuses {
            damage: damage_bonus,
            ..Default::default()
        }),
        monster: None,
        class_affinity: affinity.map(ClassId),
        description: description.into(),
    }
}

fn armor(
    id: u32,
    name: &str,
    shield: i32,
    ap: i32,
    affinity: Option<u32>,
    description: &str,
) -> CardTemplate {
    CardTemplate {
        id: CardId(id),
        name: name.into(),
        kind: CardKind::Armor,
        ap_cost: 1,
        effect: None,
        bonuses: Some(EquipBonuses {
            shield,
            ap,
            ..Default::default()
        }),
        monster: None,
        class_affinity: affinity.map(ClassId),
        description: description.into(),
    }
}

fn monster(
    id: u32,
    name: &str,
    hp: i32,
    required_roll: i32,
    inflicts: Option<StatusKind>,
    description: &str,
) -> CardTemplate {
    CardTemplate {
        id: CardId(id),
        name: name.into(),
        kind: CardKind::Monster,
        ap_cost: 0,
        effect: None,
        bonuses: None,
        monster: Some(MonsterStats {
            hp,
            required_roll_to_hit: required_roll,
            inflicts,
        }),
        class_affinity: None,
        description: description.into(),
    }
}

fn event(
    id: u32,
    name: &str,
    kind: CardKind,
    effect: Effect,
    description: &str,
) -> CardTemplate {
    CardTemplate {
        id: CardId(id),
        name: name.into(),
        kind,
        ap_cost: 0,
        effect: Some(effect),
        bonuses: None,
        monster: None,
        class_affinity: None,
        description: description.into(),
    }
}

fn cards() -> Vec<CardTemplate> {
    use TargetSelector::{AnyExplorer, AnyMonster, SelfOnly};

    let mut cards = vec![
        // -- Weapons -------------------------------------------------
        weapon(101, "Shortsword", "1d6", 0, Some(1), "A soldier's standby."),
        weapon(102, "Apprentice Wand", "1d4+1", 0, Some(2), "Hums faintly."),
        weapon(103, "Twin Daggers", "2d4", 0, Some(3), "Quick and quiet."),
        weapon(104, "Iron Mace", "1d6", 0, Some(4), "Blunt persuasion."),
        weapon(105, "Greataxe", "1d10", 1, Some(1), "Needs both hands."),
        weapon(106, "Storm Staff", "2d6", 0, Some(2), "Crackles on a hit."),
        weapon(107, "Hunting Bow", "1d8", 0, Some(3), "Strings well-waxed."),
        weapon(
            108,
            "Sunforged Hammer",
            "1d8+1",
            0,
            Some(4),
            "Warm to the touch.",
        ),
        // -- Armor ---------------------------------------------------
        armor(120, "Leather Jerkin", 1, 0, None, "Better than nothing."),
        armor(121, "Chainmail", 2, -1, Some(1), "Heavy but dependable."),
        armor(122, "Warded Cloak", 1, 0, Some(2), "Stitched with sigils."),
        armor(123, "Plate Harness", 3, -1, Some(4), "A walking fortress."),
        // -- Potions -------------------------------------------------
        CardTemplate {
            id: CardId(140),
            name: "Healing Draught".into(),
            kind: CardKind::Potion,
            ap_cost: 1,
            effect: Some(Effect::heal("2d4+2", SelfOnly)),
            bonuses: None,
            monster: None,
            class_affinity: None,
            description: "Tastes of copper and mint.".into(),
        },
        CardTemplate {
            id: CardId(141),
            name: "Elixir of Vigor".into(),
            kind: CardKind::Potion,
            ap_cost: 1,
            effect: Some(Effect::heal("1d8", AnyExplorer)),
            bonuses: None,
            monster: None,
            class_affinity: None,
            description: "Share with a friend in need.".into(),
        },
        // -- Scrolls -------------------------------------------------
        event(
            150,
            "Scroll of Embers",
            CardKind::Scroll,
            Effect::damage("2d6", AnyMonster).inflicting(StatusKind::Burning, 2),
            "Burns away in the reading.",
        ),
        event(
            151,
            "Scroll of Warding",
            CardKind::Scroll,
            Effect::status(StatusKind::Guarded, 2, SelfOnly),
            "The words hang in the air.",
        ),
        // -- Spells --------------------------------------------------
        event(
            160,
            "Healing Word",
            CardKind::Spell,
            Effect::heal("1d6+2", AnyExplorer),
            "A syllable of mending.",
        ),
        event(
            161,
            "Frost Lance",
            CardKind::Spell,
            Effect::damage("1d8", AnyMonster).inflicting(StatusKind::Stunned, 1),
            "Cold enough to stop a heart.",
        ),
        // -- Monsters ------------------------------------------------
        monster(201, "Giant Rat", 7, 8, None, "Bolder than it should be."),
        monster(
            202,
            "Cave Spider",
            9,
            10,
            Some(StatusKind::Poisoned),
            "Venom drips from its fangs.",
        ),
        monster(203, "Skeleton Guard", 12, 11, None, "Still on duty."),
        monster(
            204,
            "Gloom Wraith",
            14,
            13,
            Some(StatusKind::Stunned),
            "The torchlight bends around it.",
        ),
        monster(205, "Ogre Brute", 18, 12, None, "Smells it before you see it."),
        monster(206, "Hall Tyrant", 24, 14, None, "The gloom's own warden."),
        // -- World events --------------------------------------------
        event(
            301,
            "Cave-in",
            CardKind::WorldEvent,
            Effect::damage("1d4", AnyExplorer),
            "Dust and falling stone batter the party.",
        ),
        event(
            302,
            "Chill Mists",
            CardKind::WorldEvent,
            Effect::utility(),
            "Visibility drops to a sword's length.",
        ),
        event(
            303,
            "Swarm of Bats",
            CardKind::WorldEvent,
            Effect::damage("1d3", AnyExplorer),
            "A shrieking cloud claws past.",
        ),
        event(
            304,
            "Eerie Silence",
            CardKind::WorldEvent,
            Effect::utility(),
            "Even footsteps die in the air.",
        ),
        event(
            305,
            "Poison Spores",
            CardKind::WorldEvent,
            Effect::status(StatusKind::Poisoned, 2, AnyExplorer),
            "Green motes drift from the ceiling.",
        ),
        event(
            306,
            "Forgotten Shrine",
            CardKind::WorldEvent,
            Effect::heal("1d4", AnyExplorer),
            "A moment of unexpected grace.",
        ),
        // -- Player events -------------------------------------------
        event(
            320,
            "Hidden Spring",
            CardKind::PlayerEvent,
            Effect::heal("2d4", SelfOnly),
            "Clear water, impossibly fresh.",
        ),
        event(
            321,
            "Loose Flagstone",
            CardKind::PlayerEvent,
            Effect::damage("1d4", SelfOnly),
            "The floor gives way underfoot.",
        ),
        event(
            322,
            "Wandering Merchant",
            CardKind::PlayerEvent,
            Effect::utility(),
            "He's gone when you blink.",
        ),
        event(
            323,
            "Old Wound",
            CardKind::PlayerEvent,
            Effect::damage("1d6", SelfOnly),
            "It never really healed.",
        ),
        event(
            324,
            "Lucky Charm",
            CardKind::PlayerEvent,
            Effect::heal("1d6", SelfOnly),
            "Maybe it works after all.",
        ),
        event(
            325,
            "Rotten Rations",
            CardKind::PlayerEvent,
            Effect::damage("1d4-1", SelfOnly),
            "Something in the pack turned.",
        ),
    ];

    cards.sort_by_key(|c| c.id);
    cards
}

fn statuses() -> Vec<StatusEffectDefinition> {
    vec![
        StatusEffectDefinition {
            kind: StatusKind::Poisoned,
            trigger: TriggerTiming::TurnStart,
            damage_dice: "1d4".into(),
            cannot_act: false,
            roll_modifier: 0,
            description: "Takes 1d4 damage at the start of each turn.".into(),
        },
        StatusEffectDefinition {
            kind: StatusKind::Burning,
            trigger: TriggerTiming::TurnEnd,
            damage_dice: "1d6".into(),
            cannot_act: false,
            roll_modifier: 0,
            description: "Takes 1d6 damage at the end of each turn.".into(),
        },
        StatusEffectDefinition {
            kind: StatusKind::Stunned,
            trigger: TriggerTiming::TurnStart,
            damage_dice: String::new(),
            cannot_act: true,
            roll_modifier: 0,
            description: "Cannot act while stunned.".into(),
        },
        StatusEffectDefinition {
            kind: StatusKind::Guarded,
            trigger: TriggerTiming::TurnEnd,
            damage_dice: String::new(),
            cannot_act: false,
            roll_modifier: 0,
            description: "Incoming event damage is reduced.".into(),
        },
        StatusEffectDefinition {
            kind: StatusKind::Blessed,
            trigger: TriggerTiming::TurnStart,
            damage_dice: String::new(),
            cannot_act: false,
            roll_modifier: 1,
            description: "+1 to d20 rolls.".into(),
        },
    ]
}
