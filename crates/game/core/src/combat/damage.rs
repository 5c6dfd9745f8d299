//! Damage calculation.
//!
//! # Formula
//!
//! ```text
//! unarmed = 1 + rank / 2 + variance            variance in [0, rank)
//! armed   = bonus + skill + min + variance     variance in [0, max - min)
//! damage  = (base + flat modifier) * (100 + percent modifier) / 100
//! damage  = max(1, damage * (100 - armor) / 100)
//! ```
//!
//! The variance is rolled by the caller so the arithmetic stays pure.

use crate::state::{CombatModifiers, Entity, Skill, Weapon};

/// Exclusive upper bound of the variance roll for this weapon (or fists).
pub fn variance_span(attacker: &Entity, weapon: Option<&Weapon>) -> u32 {
    match weapon {
        None => attacker.stats.skills.rank(Skill::Unarmed).max(0) as u32,
        Some(w) => (w.max_damage - w.min_damage).max(0) as u32,
    }
}

/// Damage before the defender's armour.
pub fn raw_damage(
    attacker: &Entity,
    weapon: Option<&Weapon>,
    variance: i32,
    extra: &CombatModifiers,
) -> f32 {
    let skills = &attacker.stats.skills;
    let modifiers = attacker.stats.modifiers.combined(*extra);

    let (base, flat) = match weapon {
        None => {
            let rank = skills.rank(Skill::Unarmed);
            (1 + rank / 2 + variance, modifiers.unarmed_damage)
        }
        Some(w) => (
            w.bonus + skills.rank(w.skill) + w.min_damage + variance,
            modifiers.damage,
        ),
    };

    (base + flat) as f32 * (100 + modifiers.damage_percent) as f32 / 100.0
}

/// Reduces by armour rating and floors at 1.
pub fn apply_armor(damage: f32, armor_rating: i32) -> i32 {
    let reduced = damage / 100.0 * (100 - armor_rating) as f32;
    (reduced as i32).max(1)
}

/// Full damage of one successful strike.
pub fn calculate_damage(
    attacker: &Entity,
    defender: &Entity,
    weapon: Option<&Weapon>,
    variance: i32,
    extra: &CombatModifiers,
) -> i32 {
    let raw = raw_damage(attacker, weapon, variance, extra);
    apply_armor(raw, defender.stats.armor_rating)
}
