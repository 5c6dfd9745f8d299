//! Interaction verbs: walk up to a world object or character and do one thing.
//!
//! Each verb is an [`Approach`] over a small [`Resolution`]. AP is only
//! checked and charged while combat is in progress.

use crate::combat::{award_experience, stealth_check};
use crate::env::{Request, SimContext, SimEvent};
use crate::state::{EntityId, Skill};

use super::approach::{can_afford, charge_ap, spring_trap};
use super::{ActionCommand, ActionKind, Approach, Resolution};

pub type Lockpick = Approach<PickLock>;
pub type DisarmTrap = Approach<Disarm>;
pub type UseGameObject = Approach<Operate>;
pub type PickUp = Approach<Gather>;
pub type TalkTo = Approach<Converse>;

// ============================================================================
// Lockpick
// ============================================================================

#[derive(Debug, Default)]
pub struct PickLock;

impl Resolution for PickLock {
    const KIND: ActionKind = ActionKind::Lockpick;

    fn target_of(command: &ActionCommand) -> Option<EntityId> {
        match command {
            ActionCommand::Lockpick { object } => Some(*object),
            _ => None,
        }
    }

    fn command_for(target: EntityId) -> ActionCommand {
        ActionCommand::Lockpick { object: target }
    }

    fn resolve(&mut self, owner: EntityId, object: EntityId, ctx: &mut SimContext<'_>) {
        let Some(lock) = ctx.world.object(object).and_then(|o| o.lock) else {
            ctx.refuse(owner, Self::KIND, "not locked");
            return;
        };
        if !lock.locked {
            ctx.refuse(owner, Self::KIND, "not locked");
            return;
        }
        if !lock.pickable {
            ctx.refuse(owner, Self::KIND, "cannot be picked");
            return;
        }
        let cost = ctx.rules().ap.use_item;
        if !can_afford(ctx, owner, cost) {
            ctx.refuse(owner, Self::KIND, "not enough AP");
            return;
        }

        let modifier = ctx.rules().stealth.pick_lock;
        stealth_check(ctx, owner, modifier);
        if !spring_trap(ctx, owner, object) {
            let rank = ctx
                .entity(owner)
                .map_or(0, |e| e.stats.skills.rank(Skill::Lockpicking));
            if lock.level <= rank {
                if let Some(target) = ctx.world.object_mut(object) {
                    target.unlock();
                }
                tracing::info!("{} picked the lock of #{}", owner, object.0);
                ctx.emit(SimEvent::Unlocked {
                    actor: owner,
                    object,
                    with_key: false,
                });
                award_experience(ctx, owner, (lock.level * 5).max(0) as u32);
            } else {
                tracing::info!("{} failed to pick the lock of #{}", owner, object.0);
                ctx.emit(SimEvent::LockpickFailed {
                    actor: owner,
                    object,
                });
            }
        }
        charge_ap(ctx, owner, cost);
    }
}

// ============================================================================
// Disarm trap
// ============================================================================

#[derive(Debug, Default)]
pub struct Disarm;

impl Resolution for Disarm {
    const KIND: ActionKind = ActionKind::DisarmTrap;

    fn target_of(command: &ActionCommand) -> Option<EntityId> {
        match command {
            ActionCommand::DisarmTrap { object } => Some(*object),
            _ => None,
        }
    }

    fn command_for(target: EntityId) -> ActionCommand {
        ActionCommand::DisarmTrap { object: target }
    }

    fn resolve(&mut self, owner: EntityId, object: EntityId, ctx: &mut SimContext<'_>) {
        let trap = ctx
            .world
            .object(object)
            .and_then(|o| o.armed_trap())
            .filter(|t| t.detected);
        let Some(trap) = trap else {
            ctx.refuse(owner, Self::KIND, "not trapped");
            return;
        };
        let cost = ctx.rules().ap.disarm_trap;
        if !can_afford(ctx, owner, cost) {
            ctx.refuse(owner, Self::KIND, "not enough AP");
            return;
        }

        let modifier = ctx.rules().stealth.disarm_trap;
        stealth_check(ctx, owner, modifier);
        let rank = ctx
            .entity(owner)
            .map_or(0, |e| e.stats.skills.rank(Skill::Traps));
        if trap.level <= rank {
            if let Some(t) = ctx.world.object_mut(object).and_then(|o| o.trap.as_mut()) {
                t.disarmed = true;
            }
            tracing::info!("{} disarmed the trap on #{}", owner, object.0);
            ctx.emit(SimEvent::TrapDisarmed {
                actor: owner,
                object,
            });
            award_experience(ctx, owner, (trap.level * 3).max(0) as u32);
        } else {
            tracing::info!("{} failed to disarm the trap on #{}", owner, object.0);
            ctx.emit(SimEvent::DisarmFailed {
                actor: owner,
                object,
            });
        }
        charge_ap(ctx, owner, cost);
    }
}

// ============================================================================
// Use game object
// ============================================================================

#[derive(Debug, Default)]
pub struct Operate;

impl Resolution for Operate {
    const KIND: ActionKind = ActionKind::UseGameObject;

    fn target_of(command: &ActionCommand) -> Option<EntityId> {
        match command {
            ActionCommand::UseGameObject { object } => Some(*object),
            _ => None,
        }
    }

    fn command_for(target: EntityId) -> ActionCommand {
        ActionCommand::UseGameObject { object: target }
    }

    fn resolve(&mut self, owner: EntityId, object: EntityId, ctx: &mut SimContext<'_>) {
        let Some(target) = ctx.world.object(object) else {
            ctx.refuse(owner, Self::KIND, "nothing to use");
            return;
        };
        let Some(usable) = target.usable.clone() else {
            ctx.refuse(owner, Self::KIND, "nothing to use");
            return;
        };
        let locked = target.is_locked();
        let key = target.lock.and_then(|l| l.key);
        let has_key = key.is_some_and(|k| ctx.entity(owner).is_some_and(|e| e.inventory.has(k)));

        if locked && !has_key {
            if !spring_trap(ctx, owner, object) {
                ctx.refuse(owner, Self::KIND, "locked");
            }
            return;
        }
        if locked {
            if let Some(target) = ctx.world.object_mut(object) {
                target.unlock();
            }
            tracing::info!("{} unlocked #{} with a key", owner, object.0);
            ctx.emit(SimEvent::Unlocked {
                actor: owner,
                object,
                with_key: true,
            });
        }

        if !can_afford(ctx, owner, usable.ap_cost) {
            ctx.refuse(owner, Self::KIND, "not enough AP");
            return;
        }
        if !spring_trap(ctx, owner, object) {
            if let Some(u) = ctx.world.object_mut(object).and_then(|o| o.usable.as_mut()) {
                u.activated = !u.activated;
            }
            tracing::info!("{} {} #{}", owner, usable.verb, object.0);
            ctx.emit(SimEvent::ObjectUsed {
                actor: owner,
                object,
                verb: usable.verb,
            });
            charge_ap(ctx, owner, usable.ap_cost);
            let modifier = ctx.rules().stealth.use_object;
            stealth_check(ctx, owner, modifier);
        } else {
            charge_ap(ctx, owner, usable.ap_cost);
        }
    }
}

// ============================================================================
// Pick up
// ============================================================================

#[derive(Debug, Default)]
pub struct Gather;

impl Resolution for Gather {
    const KIND: ActionKind = ActionKind::PickUp;

    fn target_of(command: &ActionCommand) -> Option<EntityId> {
        match command {
            ActionCommand::PickUp { object } => Some(*object),
            _ => None,
        }
    }

    fn command_for(target: EntityId) -> ActionCommand {
        ActionCommand::PickUp { object: target }
    }

    fn resolve(&mut self, owner: EntityId, object: EntityId, ctx: &mut SimContext<'_>) {
        let Some(stack) = ctx.world.object(object).and_then(|o| o.loot) else {
            ctx.refuse(owner, Self::KIND, "nothing to pick up");
            return;
        };
        let cost = ctx.rules().ap.pick_up;
        if !can_afford(ctx, owner, cost) {
            ctx.refuse(owner, Self::KIND, "not enough AP");
            return;
        }
        charge_ap(ctx, owner, cost);
        let modifier = ctx.rules().stealth.pick_up;
        stealth_check(ctx, owner, modifier);

        let Some(picker) = ctx.entity_mut(owner) else {
            return;
        };
        picker.inventory.add(stack);
        ctx.world.remove_object(object);
        tracing::info!("{} picked up {} of item {}", owner, stack.count, stack.item.0);
        ctx.emit(SimEvent::ItemPickedUp {
            actor: owner,
            stack,
        });
    }
}

// ============================================================================
// Talk to
// ============================================================================

/// Holds the listener still for as long as the conversation is pending.
#[derive(Debug, Default)]
pub struct Converse;

impl Resolution for Converse {
    const KIND: ActionKind = ActionKind::TalkTo;

    fn target_of(command: &ActionCommand) -> Option<EntityId> {
        match command {
            ActionCommand::TalkTo { target } => Some(*target),
            _ => None,
        }
    }

    fn command_for(target: EntityId) -> ActionCommand {
        ActionCommand::TalkTo { target }
    }

    fn on_bound(&mut self, _owner: EntityId, target: EntityId, ctx: &mut SimContext<'_>) {
        ctx.request(Request::PauseActions(target));
    }

    fn resolve(&mut self, owner: EntityId, target: EntityId, ctx: &mut SimContext<'_>) {
        let Some(listener) = ctx.entity_mut(target) else {
            ctx.refuse(owner, Self::KIND, "nobody to talk to");
            return;
        };
        listener.met.insert(owner);
        let dialogue = listener.dialogue.clone();
        if let Some(speaker) = ctx.entity_mut(owner) {
            speaker.met.insert(target);
        }
        tracing::info!("{} talks to {}", owner, target);
        ctx.emit(SimEvent::DialogueRequested {
            speaker: owner,
            listener: target,
            dialogue,
        });
        let modifier = ctx.rules().stealth.talk_to;
        stealth_check(ctx, owner, modifier);
    }

    fn release(&mut self, _owner: EntityId, target: EntityId, ctx: &mut SimContext<'_>) {
        ctx.request(Request::ResumeActions(target));
    }
}
