//! Animation clock consumed by actions.
//!
//! Rendering is external. Actions only need to know which state an entity is
//! in, whether a strike has reached its impact frame and whether a one-shot
//! animation has played out, so that is all this tracks.

use strum::{AsRefStr, EnumString};

use crate::config::AnimationTimings;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, AsRefStr, EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum AnimationState {
    #[default]
    Idle,
    Walk,
    AttackMelee,
    AttackRanged,
    Cast,
    Special,
    Death,
}

impl AnimationState {
    /// Looping states never report themselves finished.
    pub const fn is_looping(self) -> bool {
        matches!(self, Self::Idle | Self::Walk | Self::Death)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Animation {
    pub state: AnimationState,
    pub elapsed: f32,
    pub impact_at: f32,
    pub duration: f32,
}

impl Animation {
    /// Switches state. Re-entering the current state keeps the clock running.
    pub fn set_state(&mut self, state: AnimationState, timings: &AnimationTimings) {
        if self.state == state {
            return;
        }
        let (impact_at, duration) = timings.for_state(state);
        *self = Self {
            state,
            elapsed: 0.0,
            impact_at,
            duration,
        };
    }

    /// Restarts the clock even if the state does not change.
    pub fn restart(&mut self, state: AnimationState, timings: &AnimationTimings) {
        let (impact_at, duration) = timings.for_state(state);
        *self = Self {
            state,
            elapsed: 0.0,
            impact_at,
            duration,
        };
    }

    pub fn advance(&mut self, dt: f32) {
        self.elapsed += dt;
    }

    /// True once an attack animation has reached the frame where the blow lands.
    pub fn has_impact_passed(&self) -> bool {
        matches!(
            self.state,
            AnimationState::AttackMelee | AnimationState::AttackRanged
        ) && self.elapsed >= self.impact_at
    }

    pub fn is_finished(&self) -> bool {
        !self.state.is_looping() && self.elapsed >= self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attack_passes_impact_before_finishing() {
        let timings = AnimationTimings::default();
        let mut anim = Animation::default();
        anim.set_state(AnimationState::AttackMelee, &timings);

        assert!(!anim.has_impact_passed());
        anim.advance(timings.attack_impact_secs);
        assert!(anim.has_impact_passed());
        assert!(!anim.is_finished());
        anim.advance(timings.attack_secs);
        assert!(anim.is_finished());
    }

    #[test]
    fn looping_states_never_finish() {
        let timings = AnimationTimings::default();
        let mut anim = Animation::default();
        anim.set_state(AnimationState::Walk, &timings);
        anim.advance(100.0);
        assert!(!anim.is_finished());
        assert!(!anim.has_impact_passed());
    }
}
