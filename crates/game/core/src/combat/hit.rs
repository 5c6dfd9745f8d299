//! Chance to hit.
//!
//! # Formula
//!
//! ```text
//! base   = (10 + weapon skill + weapon bonus - dual wield penalty) * 5 + modifiers
//!          (unarmed: 10 + 1.5 * unarmed rank)
//! facing = back bonus | side bonus | 0        (melee only)
//! defend = (dodge + parry skill) * 5, halved vs. an unarmed attacker if armed
//! chance = clamp(base + facing - defend, min, max)
//! ```

use crate::config::HitTuning;
use crate::state::{CombatModifiers, Entity, Hand, Orientation, Skill, Weapon};

/// Outcome of a single to-hit roll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HitRoll {
    pub chance: i32,
    pub roll: i32,
    pub hit: bool,
}

impl HitRoll {
    /// A hit when the d100 roll (0..100) is strictly below the chance.
    pub fn resolve(chance: i32, roll: i32) -> Self {
        Self {
            chance,
            roll,
            hit: roll < chance,
        }
    }
}

fn dual_wield_penalty(rank: i32, hand: Hand) -> f32 {
    match hand {
        Hand::Right => match rank {
            0 => 4.0,
            1 => 2.0,
            2 | 3 => 1.0,
            _ => 0.0,
        },
        Hand::Left => match rank {
            0 | 1 => 4.0,
            2 => 2.0,
            3 | 4 => 1.0,
            _ => 0.0,
        },
    }
}

/// Attacker's chance from stats alone, for the weapon in `hand` (or fists).
pub fn base_chance(attacker: &Entity, hand: Option<Hand>, extra: &CombatModifiers) -> i32 {
    let skills = &attacker.stats.skills;
    let hand = hand.unwrap_or(Hand::Right);
    let mut value = 10.0_f32;

    match attacker.equipment.weapon(hand) {
        Some(weapon) => value += (skills.rank(weapon.skill) + weapon.bonus) as f32,
        None => value += skills.rank(Skill::Unarmed) as f32 * 1.5,
    }

    if attacker.equipment.is_dual_wielding() {
        value -= dual_wield_penalty(skills.rank(Skill::DualWielding), hand);
    }

    let modifiers = attacker.stats.modifiers.combined(*extra);
    (value * 5.0) as i32 + modifiers.chance_to_hit
}

/// Bonus for striking from behind or from the flank.
///
/// `heading` is the direction the attacker looks in toward the target;
/// `target_facing` is where the target looks. Matching directions mean the
/// attacker stands behind the target.
pub fn facing_bonus(heading: Orientation, target_facing: Orientation, tuning: &HitTuning) -> i32 {
    if target_facing == heading {
        tuning.back_bonus
    } else if target_facing.opposite() != heading
        && target_facing.clockwise().opposite() != heading
        && target_facing.anticlockwise().opposite() != heading
    {
        tuning.side_bonus
    } else {
        0
    }
}

/// Defender's dodge-or-parry against `attacking` (None for fists).
pub fn dodge_or_parry(defender: &Entity, attacking: Option<&Weapon>) -> i32 {
    let skills = &defender.stats.skills;
    let unarmed_attack = attacking.is_none();
    let ranged_attack = attacking.is_some_and(|w| w.ranged);

    let hand = if defender.equipment.right.is_some() {
        Hand::Right
    } else {
        Hand::Left
    };

    let mut value = skills.rank(Skill::Dodge);
    let unarmed_defence = match defender.equipment.weapon(hand) {
        Some(weapon) => {
            if !weapon.ranged && !ranged_attack {
                value += skills.rank(weapon.skill);
            }
            false
        }
        None => {
            // Fists only parry fists.
            if unarmed_attack {
                value += skills.rank(Skill::Unarmed);
            }
            true
        }
    };

    let mut value = value * 5 + defender.stats.modifiers.dodge_parry;
    if unarmed_attack && !unarmed_defence {
        value /= 2;
    }
    value
}

/// Complete chance to hit, clamped to the configured bounds.
pub fn chance_to_hit(
    attacker: &Entity,
    defender: &Entity,
    hand: Option<Hand>,
    isometric: bool,
    tuning: &HitTuning,
    extra: &CombatModifiers,
) -> i32 {
    let weapon = hand.and_then(|h| attacker.equipment.weapon(h));
    let base = base_chance(attacker, hand, extra);

    let bonus = if weapon.is_none_or(|w| !w.ranged) {
        let heading = Orientation::toward(isometric, attacker.position, defender.position);
        facing_bonus(heading, defender.orientation, tuning)
    } else {
        0
    };

    let defence = dodge_or_parry(defender, weapon);
    (base + bonus - defence).clamp(tuning.min_chance, tuning.max_chance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Capabilities, EntityId, Position};

    fn entity(id: u32, tile: Position) -> Entity {
        Entity::new(EntityId(id), "e", Capabilities::NPC).at(tile)
    }

    #[test]
    fn unarmed_base_uses_rank_and_a_half() {
        let mut attacker = entity(1, Position::ORIGIN);
        attacker.stats.skills.set(Skill::Unarmed, 2);
        // (10 + 3) * 5
        assert_eq!(base_chance(&attacker, None, &CombatModifiers::default()), 65);
    }

    #[test]
    fn dual_wielding_penalises_off_hand_more() {
        let mut attacker = entity(1, Position::ORIGIN);
        attacker.equipment.right = Some(Weapon::melee("a", Skill::Sword, 1, 2));
        attacker.equipment.left = Some(Weapon::melee("b", Skill::Sword, 1, 2));
        attacker.stats.skills.set(Skill::DualWielding, 1);

        let none = CombatModifiers::default();
        let right = base_chance(&attacker, Some(Hand::Right), &none);
        let left = base_chance(&attacker, Some(Hand::Left), &none);
        assert_eq!(right, (10 - 2) * 5);
        assert_eq!(left, (10 - 4) * 5);
    }

    #[test]
    fn facing_rewards_back_then_flank() {
        let tuning = HitTuning::default();
        // Attacker looks up at a target that also looks up: behind it.
        assert_eq!(facing_bonus(Orientation::Up, Orientation::Up, &tuning), 20);
        // Face to face.
        assert_eq!(facing_bonus(Orientation::Up, Orientation::Down, &tuning), 0);
        assert_eq!(facing_bonus(Orientation::UpRight, Orientation::Down, &tuning), 0);
        // Side.
        assert_eq!(facing_bonus(Orientation::Right, Orientation::Up, &tuning), 10);
    }

    #[test]
    fn armed_defender_halves_against_fists() {
        let mut defender = entity(2, Position::new(1, 0));
        defender.stats.skills.set(Skill::Dodge, 2);
        defender.stats.skills.set(Skill::Sword, 2);
        defender.equipment.right = Some(Weapon::melee("sword", Skill::Sword, 1, 4));

        assert_eq!(dodge_or_parry(&defender, None), 10);
        let club = Weapon::melee("club", Skill::Staff, 1, 3);
        assert_eq!(dodge_or_parry(&defender, Some(&club)), 20);
        let bow = Weapon::bow("bow", 1, 3);
        assert_eq!(dodge_or_parry(&defender, Some(&bow)), 10);
    }

    #[test]
    fn chance_is_always_clamped() {
        let tuning = HitTuning::default();
        let mut attacker = entity(1, Position::ORIGIN);
        let mut defender = entity(2, Position::new(0, 1));

        for (cth_mod, dodge) in [(10_000, 0), (-10_000, 0), (0, 1_000), (500, -500)] {
            attacker.stats.modifiers.chance_to_hit = cth_mod;
            defender.stats.skills.set(Skill::Dodge, dodge);
            let chance = chance_to_hit(
                &attacker,
                &defender,
                None,
                false,
                &tuning,
                &CombatModifiers::default(),
            );
            assert!((1..=99).contains(&chance), "chance {chance} escaped bounds");
        }
    }

    #[test]
    fn roll_must_be_strictly_below_chance() {
        assert!(HitRoll::resolve(50, 49).hit);
        assert!(!HitRoll::resolve(50, 50).hit);
    }
}
