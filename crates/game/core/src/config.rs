//! Rules table: costs, bonuses and timings the action layer is tuned by.
//!
//! Every section has sensible defaults. `tactics-content` overlays a
//! `rules.toml` on top of them, so a file only needs the keys it changes.

use crate::state::AnimationState;

/// Action point costs charged during strict-turn combat.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ApCosts {
    pub attack: i32,
    pub use_item: i32,
    pub disarm_trap: i32,
    pub open: i32,
    pub pick_up: i32,
    pub move_step: i32,
}

impl ApCosts {
    pub const DEFAULT_ATTACK: i32 = 5;
    pub const DEFAULT_USE_ITEM: i32 = 4;
    pub const DEFAULT_DISARM_TRAP: i32 = 4;
    pub const DEFAULT_OPEN: i32 = 4;
    pub const DEFAULT_PICK_UP: i32 = 4;
    pub const DEFAULT_MOVE_STEP: i32 = 1;
}

impl Default for ApCosts {
    fn default() -> Self {
        Self {
            attack: Self::DEFAULT_ATTACK,
            use_item: Self::DEFAULT_USE_ITEM,
            disarm_trap: Self::DEFAULT_DISARM_TRAP,
            open: Self::DEFAULT_OPEN,
            pick_up: Self::DEFAULT_PICK_UP,
            move_step: Self::DEFAULT_MOVE_STEP,
        }
    }
}

/// Chance-to-hit tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HitTuning {
    /// Bonus for striking a target from its flank.
    pub side_bonus: i32,
    /// Bonus for striking a target from behind.
    pub back_bonus: i32,
    pub min_chance: i32,
    pub max_chance: i32,
}

impl Default for HitTuning {
    fn default() -> Self {
        Self {
            side_bonus: 10,
            back_bonus: 20,
            min_chance: 1,
            max_chance: 99,
        }
    }
}

/// Situational modifiers applied to stealth checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StealthModifiers {
    pub darkness: i32,
    pub pick_up: i32,
    pub pick_lock: i32,
    pub disarm_trap: i32,
    pub cast_spell: i32,
    pub use_perk: i32,
    pub use_object: i32,
    pub talk_to: i32,
}

impl Default for StealthModifiers {
    fn default() -> Self {
        Self {
            darkness: 20,
            pick_up: 0,
            pick_lock: -15,
            disarm_trap: -15,
            cast_spell: -30,
            use_perk: -30,
            use_object: -30,
            talk_to: -45,
        }
    }
}

/// Movement speed multipliers.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpeedTuning {
    pub world_map_multiplier: f32,
    pub combat_multiplier: f32,
}

impl Default for SpeedTuning {
    fn default() -> Self {
        Self {
            world_map_multiplier: 1.0,
            combat_multiplier: 2.0,
        }
    }
}

/// How long one-shot animations take, in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AnimationTimings {
    pub attack_impact_secs: f32,
    pub attack_secs: f32,
    pub cast_secs: f32,
    pub special_secs: f32,
}

impl AnimationTimings {
    /// Returns `(impact_at, duration)` for a state.
    pub fn for_state(&self, state: AnimationState) -> (f32, f32) {
        match state {
            AnimationState::AttackMelee | AnimationState::AttackRanged => {
                (self.attack_impact_secs, self.attack_secs)
            }
            AnimationState::Cast => (self.cast_secs, self.cast_secs),
            AnimationState::Special => (self.special_secs, self.special_secs),
            AnimationState::Idle | AnimationState::Walk | AnimationState::Death => (0.0, 0.0),
        }
    }
}

impl Default for AnimationTimings {
    fn default() -> Self {
        Self {
            attack_impact_secs: 0.3,
            attack_secs: 0.6,
            cast_secs: 0.5,
            special_secs: 0.5,
        }
    }
}

/// Projectile flight and how long an attack waits for one.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ProjectileTuning {
    /// Tiles per second.
    pub speed: f32,
    pub timeout_secs: f32,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            speed: 12.0,
            timeout_secs: 5.0,
        }
    }
}

/// What a brain does once combat ends.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BrainTuning {
    /// Seconds between peace-mode script evaluations.
    pub decision_interval_secs: f32,
    pub search_radius: i32,
    pub search_chance_to_move: u32,
    pub search_duration_secs: f32,
}

impl Default for BrainTuning {
    fn default() -> Self {
        Self {
            decision_interval_secs: 0.5,
            search_radius: 5,
            search_chance_to_move: 60,
            search_duration_secs: 30.0,
        }
    }
}

/// Complete rules table handed to every action through the simulation context.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GameRules {
    pub ap: ApCosts,
    pub hit: HitTuning,
    pub stealth: StealthModifiers,
    pub speed: SpeedTuning,
    pub animation: AnimationTimings,
    pub projectile: ProjectileTuning,
    pub brain: BrainTuning,
}

impl GameRules {
    pub fn new() -> Self {
        Self::default()
    }
}
