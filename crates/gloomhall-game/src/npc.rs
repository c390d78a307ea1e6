//! NPC decision policy and flavor narration.
//!
//! Fill-in explorers follow a fixed priority: fight if they can, patch
//! up the party if it needs it, otherwise brace — waiting only when the
//! AP pool is spent. The policy is a pure function of the visible state
//! so it can be tested without an engine or an RNG.

use gloomhall_catalog::EffectKind;
use gloomhall_protocol::{CardId, PlayerId};
use rand::Rng;
use rand::seq::IndexedRandom;

use crate::actor::Player;
use crate::cards::MonsterInstance;

/// What an NPC explorer decided to do with its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NpcAction {
    /// Swing the equipped weapon at a board monster.
    Attack { target: CardId },
    /// Play a healing card from hand on an ally.
    Heal { card_id: CardId, ally: PlayerId },
    /// Take the defensive stance.
    Guard,
    /// Nothing useful to do.
    Idle,
}

/// Picks an action for `actor`. `party` is every standing explorer,
/// the actor included.
pub fn choose_action(
    actor: &Player,
    party: &[&Player],
    board: &[MonsterInstance],
    guard_cost: i32,
) -> NpcAction {
    // Fight first. The board is spawn-ordered, so the front entry is the
    // monster that has been threatening the party longest.
    if let Some(target) = board.first() {
        if let Some(weapon) = &actor.weapon {
            if actor.current_ap >= weapon.template.ap_cost as i32 {
                return NpcAction::Attack {
                    target: target.instance_id,
                };
            }
        }
    }

    // Then mend: between fights any scratch counts; mid-fight only when
    // somebody is under half.
    if let Some(card) = affordable_heal_card(actor) {
        let urgent = board.is_empty() || party.iter().any(|p| below_half(p));
        if urgent {
            let candidates = party.iter().filter(|p| wounded(p));
            let pick = if board.is_empty() {
                candidates.max_by(|a, b| wound_order(a, b)).copied()
            } else {
                candidates
                    .filter(|p| below_half(p))
                    .max_by(|a, b| wound_order(a, b))
                    .copied()
            };
            if let Some(ally) = pick {
                return NpcAction::Heal {
                    card_id: card,
                    ally: ally.id,
                };
            }
        }
    }

    // Bracing is the default; idling is reserved for an empty AP pool.
    if actor.current_ap >= guard_cost {
        return NpcAction::Guard;
    }

    NpcAction::Idle
}

fn affordable_heal_card(actor: &Player) -> Option<CardId> {
    actor
        .hand
        .iter()
        .find(|c| {
            c.template
                .effect
                .as_ref()
                .is_some_and(|e| e.kind == EffectKind::Heal)
                && actor.current_ap >= c.template.ap_cost as i32
        })
        .map(|c| c.id)
}

fn wounded(p: &Player) -> bool {
    p.stats.current_hp < p.stats.max_hp
}

fn below_half(p: &Player) -> bool {
    p.stats.max_hp > 0 && p.stats.current_hp * 2 < p.stats.max_hp
}

/// Orders by wound severity: larger HP deficit wins, ties broken by the
/// lower HP ratio. Ratios are compared by cross-multiplication to stay
/// in integers.
fn wound_order(a: &Player, b: &Player) -> std::cmp::Ordering {
    let deficit_a = a.stats.max_hp - a.stats.current_hp;
    let deficit_b = b.stats.max_hp - b.stats.current_hp;
    deficit_a.cmp(&deficit_b).then_with(|| {
        let lhs = a.stats.current_hp as i64 * b.stats.max_hp.max(1) as i64;
        let rhs = b.stats.current_hp as i64 * a.stats.max_hp.max(1) as i64;
        rhs.cmp(&lhs)
    })
}

/// Picks a flavor line from a pool and fills the placeholders.
pub(crate) fn flavor(
    pool: &[String],
    name: &str,
    target: &str,
    rng: &mut impl Rng,
) -> String {
    pool.choose(rng)
        .map(|line| line.replace("{name}", name).replace("{target}", target))
        .unwrap_or_else(|| format!("{name} acts."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gloomhall_catalog::Catalog;
    use gloomhall_protocol::CardId;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::cards::{CardInstance, InstanceCounter};

    fn catalog() -> Catalog {
        Catalog::builtin()
    }

    fn armed_explorer(catalog: &Catalog, id: u64) -> Player {
        let mut p = Player::new(PlayerId(id), format!("npc-{id}"), true, 3);
        p.class = Some(catalog.classes()[0].id);
        let mut ids = InstanceCounter::new();
        let starter = catalog.card(catalog.classes()[0].starter_weapon).unwrap();
        p.weapon = Some(CardInstance::stamp(starter, &mut ids));
        p.recompute_stats(catalog);
        p.current_ap = p.stats.ap;
        p
    }

    fn monster(catalog: &Catalog, template: u32, hp: i32) -> MonsterInstance {
        let mut ids = InstanceCounter::new();
        let card =
            CardInstance::stamp(catalog.card(CardId(template)).unwrap(), &mut ids);
        let mut m = MonsterInstance::from_card(card, 0);
        m.current_hp = hp;
        m
    }

    #[test]
    fn test_attacks_oldest_monster_when_armed() {
        let catalog = catalog();
        let actor = armed_explorer(&catalog, 1);
        let board = vec![monster(&catalog, 201, 7), monster(&catalog, 203, 3)];
        let oldest = board[0].instance_id;
        let action = choose_action(&actor, &[&actor], &board, 1);
        assert_eq!(action, NpcAction::Attack { target: oldest });
    }

    #[test]
    fn test_heals_most_wounded_ally_between_fights() {
        let catalog = catalog();
        let mut actor = armed_explorer(&catalog, 1);
        let potion = catalog.card(CardId(140)).unwrap();
        let mut ids = InstanceCounter::new();
        let card = CardInstance::stamp(potion, &mut ids);
        let card_id = card.id;
        actor.hand.push(card);

        let mut ally = armed_explorer(&catalog, 2);
        ally.stats.current_hp -= 9;

        let action = choose_action(&actor, &[&actor, &ally], &[], 1);
        assert_eq!(
            action,
            NpcAction::Heal {
                card_id,
                ally: ally.id
            }
        );
    }

    #[test]
    fn test_guards_when_facing_monsters_unarmed() {
        let catalog = catalog();
        let mut actor = armed_explorer(&catalog, 1);
        actor.weapon = None;
        let board = vec![monster(&catalog, 201, 7)];
        let action = choose_action(&actor, &[&actor], &board, 1);
        assert_eq!(action, NpcAction::Guard);
    }

    #[test]
    fn test_guards_by_default_between_fights() {
        let catalog = catalog();
        let mut actor = armed_explorer(&catalog, 1);
        actor.weapon = None;
        let action = choose_action(&actor, &[&actor], &[], 1);
        assert_eq!(action, NpcAction::Guard);
    }

    #[test]
    fn test_idles_only_when_out_of_ap() {
        let catalog = catalog();
        let mut actor = armed_explorer(&catalog, 1);
        actor.current_ap = 0;
        let action = choose_action(&actor, &[&actor], &[], 1);
        assert_eq!(action, NpcAction::Idle);
    }

    #[test]
    fn test_flavor_substitutes_placeholders() {
        let mut rng = StdRng::seed_from_u64(1);
        let pool = vec!["{name} strikes the {target}!".to_string()];
        let line = flavor(&pool, "Brakka", "Giant Rat", &mut rng);
        assert_eq!(line, "Brakka strikes the Giant Rat!");
    }
}
