//! Message-log lines for simulation events.

use tactics_core::{EntityId, SimEvent, World};

fn name(world: &World, id: EntityId) -> String {
    world
        .entity(id)
        .map(|e| e.name.clone())
        .or_else(|| world.object(id).map(|o| o.name.clone()))
        .unwrap_or_else(|| id.to_string())
}

/// Human-readable line for `event`, or `None` for events not worth a line.
pub fn describe(world: &World, event: &SimEvent) -> Option<String> {
    let n = |id| name(world, id);
    let line = match event {
        SimEvent::Refused {
            actor,
            kind,
            reason,
        } => format!("{} cannot {}: {}", n(*actor), kind, reason),
        SimEvent::AttackResolved {
            attacker,
            target,
            roll,
            damage,
            ..
        } if roll.hit => format!(
            "{} hits {} for {} ({} vs {})",
            n(*attacker),
            n(*target),
            damage,
            roll.roll,
            roll.chance
        ),
        SimEvent::AttackResolved {
            attacker,
            target,
            roll,
            ..
        } => format!(
            "{} misses {} ({} vs {})",
            n(*attacker),
            n(*target),
            roll.roll,
            roll.chance
        ),
        SimEvent::ProjectileLaunched {
            attacker, target, ..
        } => format!("{} shoots at {}", n(*attacker), n(*target)),
        SimEvent::ProjectileLost { attacker, .. } => {
            format!("{}'s missile goes astray", n(*attacker))
        }
        SimEvent::Died { entity } => format!("{} dies", n(*entity)),
        SimEvent::SkillCheck { .. } => return None,
        SimEvent::ExperienceGained { actor, amount } => {
            format!("{} gains {} experience", n(*actor), amount)
        }
        SimEvent::StealthBroken { actor } => format!("{} is spotted", n(*actor)),
        SimEvent::Unlocked {
            actor,
            object,
            with_key,
        } => {
            let how = if *with_key { "with a key" } else { "by picking it" };
            format!("{} unlocks {} {}", n(*actor), n(*object), how)
        }
        SimEvent::LockpickFailed { actor, object } => {
            format!("{} fails to pick {}", n(*actor), n(*object))
        }
        SimEvent::TrapSprung {
            actor,
            object,
            damage,
        } => format!("{} springs the trap on {} ({})", n(*actor), n(*object), damage),
        SimEvent::TrapDisarmed { actor, object } => {
            format!("{} disarms {}", n(*actor), n(*object))
        }
        SimEvent::DisarmFailed { actor, object } => {
            format!("{} fails to disarm {}", n(*actor), n(*object))
        }
        SimEvent::ObjectUsed {
            actor,
            object,
            verb,
        } => format!("{} {} {}", n(*actor), verb, n(*object)),
        SimEvent::ItemPickedUp { actor, stack } => {
            format!("{} picks up {} x{}", n(*actor), stack.item.0, stack.count)
        }
        SimEvent::ItemUsed { actor, item } => format!("{} uses item {}", n(*actor), item.0),
        SimEvent::PerkUsed { actor, perk, at } => {
            format!("{} uses perk {} at {}", n(*actor), perk.0, at)
        }
        SimEvent::DialogueRequested {
            speaker, listener, ..
        } => format!("{} talks to {}", n(*speaker), n(*listener)),
        SimEvent::Shouted { actor, text } => format!("{}: \"{}\"", n(*actor), text),
        SimEvent::Log { text } => text.clone(),
    };
    Some(line)
}
