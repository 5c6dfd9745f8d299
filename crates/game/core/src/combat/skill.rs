//! Skill and stealth checks.

use crate::env::{RollPurpose, SimContext, SimEvent};
use crate::state::{EntityId, Skill};

/// Chance of a check before the roll.
///
/// Rank-scaled skills contribute `16 * rank`; all checks add the situational
/// modifier. Capped at 99.
pub fn check_chance(rank: i32, skill: Skill, modifier: i32) -> i32 {
    let base = if skill.is_rank_scaled() { 16 * rank } else { 0 };
    (base + modifier).min(99)
}

/// Experience for a successful check: harder checks teach more.
pub fn check_experience(chance: i32, skill: Skill) -> u32 {
    let divisor = if skill == Skill::Persuasion { 5 } else { 10 };
    ((100 - chance).max(0) / divisor) as u32
}

/// Rolls a check for `actor`. Success awards experience through the actor.
pub fn roll_skill_check(ctx: &mut SimContext<'_>, actor: EntityId, skill: Skill, modifier: i32) -> bool {
    let Some(rank) = ctx.entity(actor).map(|e| e.stats.skills.rank(skill)) else {
        return false;
    };
    let chance = check_chance(rank, skill, modifier);
    let roll = ctx.roll(actor, RollPurpose::SkillCheck, 100) as i32;
    let success = roll < chance;

    tracing::debug!(
        "{} rolled {} check: chance {}, roll {}, {}",
        actor,
        skill.as_ref(),
        chance,
        roll,
        if success { "success" } else { "failure" }
    );
    ctx.emit(SimEvent::SkillCheck {
        actor,
        skill,
        chance,
        roll,
        success,
    });

    if success {
        let xp = check_experience(chance, skill);
        if xp > 0 {
            award_experience(ctx, actor, xp);
        }
    }
    success
}

pub fn award_experience(ctx: &mut SimContext<'_>, actor: EntityId, amount: u32) {
    if let Some(entity) = ctx.entity_mut(actor) {
        entity.give_experience(amount);
        ctx.emit(SimEvent::ExperienceGained { actor, amount });
    }
}

/// True if an awake entity of another faction can see `actor`.
pub fn is_observed(ctx: &SimContext<'_>, actor: EntityId) -> bool {
    let Some(me) = ctx.entity(actor) else {
        return false;
    };
    let tile = me.tile();
    ctx.world.entities().any(|other| {
        other.id != actor
            && other.faction != me.faction
            && other.is_alive()
            && !other.asleep
            && ctx.env.map.can_see(&*ctx.world, other.id, other.tile(), tile)
    })
}

/// A sneaking actor doing something noticeable must pass a stealth check
/// while watched, or stop sneaking.
pub fn stealth_check(ctx: &mut SimContext<'_>, actor: EntityId, activity_modifier: i32) {
    let Some(tile) = ctx.entity(actor).filter(|e| e.sneaking).map(|e| e.tile()) else {
        return;
    };
    if !is_observed(ctx, actor) {
        return;
    }

    let darkness = if ctx.env.map.is_dark(tile) {
        ctx.rules().stealth.darkness
    } else {
        0
    };
    if !roll_skill_check(ctx, actor, Skill::Sneaking, activity_modifier + darkness) {
        if let Some(entity) = ctx.entity_mut(actor) {
            entity.sneaking = false;
        }
        tracing::info!("{} was noticed", actor);
        ctx.emit(SimEvent::StealthBroken { actor });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chance_caps_at_ninety_nine() {
        assert_eq!(check_chance(10, Skill::Sneaking, 0), 99);
        assert_eq!(check_chance(2, Skill::Sneaking, -15), 17);
        // Not rank scaled: only the modifier counts.
        assert_eq!(check_chance(5, Skill::Lockpicking, 20), 20);
    }

    #[test]
    fn experience_rewards_long_odds() {
        assert_eq!(check_experience(20, Skill::Sneaking), 8);
        assert_eq!(check_experience(20, Skill::Persuasion), 16);
        assert_eq!(check_experience(99, Skill::Sneaking), 0);
    }
}
