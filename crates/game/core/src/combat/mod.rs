//! Combat arithmetic shared by the attack, perk and interaction actions.
//!
//! # Architecture
//!
//! Pure formulas (hit chance, damage, AP cost, engagement selection) take
//! entities by reference and return numbers. Rolling and applying results is
//! left to the actions, which own the order of side effects.

mod cost;
mod damage;
mod effect;
mod engagement;
mod hit;
mod projectile;
mod skill;

pub use cost::{action_ap_cost, attack_ap_cost};
pub use damage::{apply_armor, calculate_damage, raw_damage, variance_span};
pub use effect::apply_effects;
pub use engagement::Engagement;
pub use hit::{HitRoll, base_chance, chance_to_hit, dodge_or_parry, facing_bonus};
pub use projectile::{Flight, Projectile, ProjectileId, Projectiles};
pub use skill::{
    award_experience, check_chance, check_experience, is_observed, roll_skill_check,
    stealth_check,
};
