//! Attack resolution.
//!
//! The arithmetic is split from the dice so the hit threshold and
//! defeat boundary are testable without an RNG: [`judge_attack`] is
//! pure, [`resolve_attack`] rolls and delegates.

use gloomhall_protocol::AttackReport;
use rand::Rng;

/// Judges an attack from already-rolled numbers.
///
/// `attack_roll` is the full to-hit value (d20 + bonuses); a hit is
/// `attack_roll >= required_roll`, inclusive. On a miss the damage roll
/// is discarded and reported as zero.
pub fn judge_attack(
    attack_roll: i32,
    damage_roll: i32,
    bonus: i32,
    required_roll: i32,
    target_hp: i32,
) -> AttackReport {
    let hit = attack_roll >= required_roll;
    let damage_roll = if hit { damage_roll } else { 0 };
    let total_damage = if hit { (damage_roll + bonus).max(0) } else { 0 };
    AttackReport {
        attack_roll,
        hit,
        damage_roll,
        bonus,
        total_damage,
        target_defeated: hit && target_hp - total_damage <= 0,
    }
}

/// Rolls a full attack: d20 + damage bonus + status roll modifier to
/// hit, then the weapon dice for damage.
pub fn resolve_attack(
    damage_bonus: i32,
    roll_modifier: i32,
    weapon_dice: &str,
    required_roll: i32,
    target_hp: i32,
    rng: &mut impl Rng,
) -> AttackReport {
    let attack_roll = gloomhall_dice::d20(rng) + damage_bonus + roll_modifier;
    let damage_roll = if attack_roll >= required_roll {
        gloomhall_dice::roll_or_zero(weapon_dice, rng)
    } else {
        0
    };
    judge_attack(attack_roll, damage_roll, damage_bonus, required_roll, target_hp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_hit_threshold_is_inclusive() {
        let exactly = judge_attack(13, 4, 2, 13, 20);
        assert!(exactly.hit);
        let under = judge_attack(12, 4, 2, 13, 20);
        assert!(!under.hit);
    }

    #[test]
    fn test_miss_deals_nothing() {
        let report = judge_attack(5, 9, 3, 13, 10);
        assert!(!report.hit);
        assert_eq!(report.damage_roll, 0);
        assert_eq!(report.total_damage, 0);
        assert!(!report.target_defeated);
    }

    #[test]
    fn test_damage_is_roll_plus_bonus() {
        let report = judge_attack(18, 6, 2, 13, 20);
        assert_eq!(report.total_damage, 8);
        assert!(!report.target_defeated);
    }

    #[test]
    fn test_defeat_boundary_is_inclusive() {
        let exact = judge_attack(18, 6, 2, 13, 8);
        assert!(exact.target_defeated);
        let survives = judge_attack(18, 6, 2, 13, 9);
        assert!(!survives.target_defeated);
    }

    #[test]
    fn test_negative_total_clamps_to_zero() {
        let report = judge_attack(18, 1, -5, 13, 8);
        assert_eq!(report.total_damage, 0);
        assert!(!report.target_defeated);
    }

    #[test]
    fn test_resolve_attack_is_internally_consistent() {
        let mut rng = StdRng::seed_from_u64(0xA77AC);
        for _ in 0..200 {
            let report = resolve_attack(2, 0, "1d6", 13, 10, &mut rng);
            assert_eq!(report.hit, report.attack_roll >= 13);
            if report.hit {
                assert!((1..=6).contains(&report.damage_roll));
                assert_eq!(report.total_damage, report.damage_roll + 2);
            } else {
                assert_eq!(report.total_damage, 0);
            }
        }
    }
}
