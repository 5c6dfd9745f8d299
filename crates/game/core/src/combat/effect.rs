//! Immediate effects of items and perks.

use crate::env::{Effect, RollPurpose, SimContext, SimEvent};
use crate::state::EntityId;

/// Applies `effects` from `source` to `target` through the target's own pools.
pub fn apply_effects(ctx: &mut SimContext<'_>, source: EntityId, target: EntityId, effects: &[Effect]) {
    for effect in effects {
        apply_effect(ctx, source, target, *effect);
    }
}

fn apply_effect(ctx: &mut SimContext<'_>, source: EntityId, target: EntityId, effect: Effect) {
    let amount = match effect {
        Effect::Damage { min, max } => ctx.roll_between(source, RollPurpose::Damage, min, max),
        Effect::Heal(n) | Effect::RestoreAp(n) | Effect::RestoreSp(n) | Effect::RestoreMp(n) => n,
    };
    let timings = ctx.rules().animation;
    let Some(entity) = ctx.entity_mut(target) else {
        return;
    };
    match effect {
        Effect::Damage { .. } => {
            let dealt = entity.take_damage(amount, &timings);
            let dead = !entity.is_alive();
            tracing::info!("{} takes {} damage from {}", target, dealt, source);
            if dead {
                ctx.emit(SimEvent::Died { entity: target });
            }
        }
        Effect::Heal(_) => {
            let healed = entity.heal(amount);
            tracing::info!("{} heals {}", target, healed);
        }
        Effect::RestoreAp(_) => entity.stats.ap.add(amount),
        Effect::RestoreSp(_) => entity.stats.sp.add(amount),
        Effect::RestoreMp(_) => entity.stats.mp.add(amount),
    }
}
