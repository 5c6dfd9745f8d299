//! Approach-then-act template for single-step interaction verbs.
//!
//! [`Approach`] owns the target reference, the walk and the lifecycle; a
//! [`Resolution`] supplies the one step performed on arrival. Lockpicking,
//! trap disarming, object use, picking up and talking differ only in that
//! step, so each is a small `Resolution` type plugged into `Approach`.

use std::fmt;

use crate::env::{SimContext, SimEvent};
use crate::persist::{Element, PersistError};
use crate::state::{EntityId, Position};

use super::{
    Action, ActionCommand, ActionError, ActionKind, ActionSlot, Binding, Destination, MoveTo,
    TargetRef, check_owner, mismatch,
};

/// The act performed once the owner stands next to (or on) the target.
pub trait Resolution: fmt::Debug + Default + Send + 'static {
    const KIND: ActionKind;

    /// Extracts the target id, or `None` if the command is of another kind.
    fn target_of(command: &ActionCommand) -> Option<EntityId>;

    fn command_for(target: EntityId) -> ActionCommand;

    /// Runs once when the target first resolves, before walking.
    fn on_bound(&mut self, _owner: EntityId, _target: EntityId, _ctx: &mut SimContext<'_>) {}

    fn resolve(&mut self, owner: EntityId, target: EntityId, ctx: &mut SimContext<'_>);

    /// Undoes `on_bound` when the action is detached.
    fn release(&mut self, _owner: EntityId, _target: EntityId, _ctx: &mut SimContext<'_>) {}
}

#[derive(Debug, Default)]
pub struct Approach<R> {
    owner: EntityId,
    target: Option<TargetRef>,
    target_tile: Position,
    mover: MoveTo,
    resolution: R,
    finished: bool,
}

impl<R: Resolution> Approach<R> {
    pub fn target(&self) -> Option<EntityId> {
        self.target.map(|t| t.id())
    }

    fn arrival(&self) -> impl Fn(&SimContext<'_>) -> bool + use<R> {
        let (owner, tile) = (self.owner, self.target_tile);
        move |ctx: &SimContext<'_>| ctx.entity(owner).is_none_or(|me| me.tile().is_next_to_or_on(tile))
    }

    fn bind(&mut self, tile: Position, ctx: &mut SimContext<'_>) {
        self.target_tile = tile;
        if let Some(target) = self.target() {
            self.resolution.on_bound(self.owner, target, ctx);
        }
        let arrived = self.arrival();
        self.mover
            .begin(self.owner, &Destination::tile(tile), ctx, &arrived);
    }

    fn is_in_reach(&self, target: EntityId, ctx: &SimContext<'_>) -> bool {
        match (ctx.entity(self.owner), ctx.world.tile_of(target)) {
            (Some(me), Some(tile)) => me.tile().is_next_to_or_on(tile),
            _ => false,
        }
    }
}

impl<R: Resolution> Action for Approach<R> {
    fn kind(&self) -> ActionKind {
        R::KIND
    }

    fn init(
        &mut self,
        owner: EntityId,
        command: &ActionCommand,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), ActionError> {
        let target = R::target_of(command).ok_or_else(|| mismatch(R::KIND, command))?;
        check_owner(R::KIND, owner, ctx)?;
        *self = Self {
            owner,
            target: Some(TargetRef::new(target)),
            ..Self::default()
        };
        let binding = self.target.as_mut().map(|t| t.resolve(&*ctx.world));
        if let Some(Binding::Fresh(tile)) = binding {
            self.bind(tile, ctx);
        }
        Ok(())
    }

    fn update(&mut self, dt: f32, ctx: &mut SimContext<'_>) {
        if self.finished || self.mover.is_paused() {
            return;
        }
        if self.target.is_some_and(|t| !t.is_bound()) {
            match self.target.as_mut().map(|t| t.resolve(&*ctx.world)) {
                Some(Binding::Fresh(tile)) => self.bind(tile, ctx),
                _ => {
                    ctx.refuse(self.owner, R::KIND, "target vanished");
                    self.finished = true;
                    return;
                }
            }
        }

        let arrived = self.arrival();
        self.mover.step(dt, ctx, &arrived);
        if !self.mover.is_finished() {
            return;
        }

        self.finished = true;
        let Some(target) = self.target() else {
            return;
        };
        if self.is_in_reach(target, ctx) {
            self.resolution.resolve(self.owner, target, ctx);
        } else {
            ctx.refuse(self.owner, R::KIND, "cannot reach the target");
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn is_paused(&self) -> bool {
        self.mover.is_paused()
    }

    fn pause(&mut self) {
        self.mover.request_pause();
    }

    fn resume(&mut self, ctx: &mut SimContext<'_>) {
        let arrived = self.arrival();
        self.mover.resume_with(ctx, &arrived);
    }

    fn is_blocking_in_combat(&self) -> bool {
        !self.finished
    }

    fn slot(&self) -> ActionSlot {
        ActionSlot::Exclusive(ActionKind::MoveTo)
    }

    fn on_remove(&mut self, ctx: &mut SimContext<'_>) {
        self.mover.stop(ctx);
        if let Some(target) = self.target.filter(|t| t.is_bound()).map(|t| t.id()) {
            self.resolution.release(self.owner, target, ctx);
        }
        self.finished = true;
    }

    fn write_params(&self, out: &mut Element) {
        if let Some(target) = self.target() {
            out.set_entity("target", target);
        }
    }

    fn read_params(
        &mut self,
        owner: EntityId,
        input: &Element,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), PersistError> {
        let target = input.entity("target")?;
        self.init(owner, &R::command_for(target), ctx)?;
        Ok(())
    }
}

/// Whether `owner` can pay `cost` now. Outside combat everything is free.
pub(crate) fn can_afford(ctx: &SimContext<'_>, owner: EntityId, cost: i32) -> bool {
    !ctx.combat || ctx.entity(owner).is_some_and(|e| e.stats.ap.current >= cost)
}

/// Deducts AP during strict combat.
pub(crate) fn charge_ap(ctx: &mut SimContext<'_>, owner: EntityId, cost: i32) {
    if !ctx.combat || cost <= 0 {
        return;
    }
    if let Some(entity) = ctx.entity_mut(owner) {
        entity.stats.ap.add(-cost);
    }
}

/// Sets off an armed trap on `object` against `victim`. Returns whether one fired.
pub(crate) fn spring_trap(ctx: &mut SimContext<'_>, victim: EntityId, object: EntityId) -> bool {
    let Some(trap) = ctx.world.object_mut(object).and_then(|o| o.spring_trap()) else {
        return false;
    };
    let timings = ctx.rules().animation;
    let died = ctx.entity_mut(victim).is_some_and(|e| {
        e.take_damage(trap.damage, &timings);
        !e.is_alive()
    });
    tracing::info!("{} sets off a trap for {} damage", victim, trap.damage);
    ctx.emit(SimEvent::TrapSprung {
        actor: victim,
        object,
        damage: trap.damage,
    });
    if died {
        ctx.emit(SimEvent::Died { entity: victim });
    }
    true
}
