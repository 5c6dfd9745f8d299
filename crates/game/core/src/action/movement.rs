//! Movement primitive: follow a path tile by tile.
//!
//! # Per-frame step
//!
//! 1. Standing on the next node commits it: in strict combat its move cost
//!    is charged, then a pending pause takes effect, then the index advances.
//! 2. Movement ends when there are no more steps (see [`MoveTo::step`]).
//! 3. A next node that became blocked drops the path and ends the move.
//! 4. Otherwise the owner moves toward the node at its speed, scaled on
//!    world maps and in combat. Isometric diagonals along the screen axes
//!    halve both components.
//!
//! Composite actions embed a `MoveTo` and pass an [`Arrival`] predicate that
//! stops the walk early, for example once a target is in range.

use crate::env::{Path, SimContext, Step};
use crate::persist::{Element, PersistError};
use crate::state::{AnimationState, Capabilities, EntityId, Orientation, Position};

use super::{Action, ActionCommand, ActionError, ActionKind, Destination, check_owner, mismatch};

/// Early-stop predicate evaluated before every node.
pub type Arrival<'f> = &'f dyn Fn(&SimContext<'_>) -> bool;

pub(crate) fn never(_: &SimContext<'_>) -> bool {
    false
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MoveTo {
    owner: EntityId,
    destination: Option<Position>,
    include_last: bool,
    path: Option<Path>,
    index: usize,
    finished: bool,
    /// Pause requested; honoured at the next node.
    pausing: bool,
    paused: bool,
}

impl MoveTo {
    /// Resets and starts walking. Finishes at once when there is nothing to do.
    pub fn begin(
        &mut self,
        owner: EntityId,
        destination: &Destination,
        ctx: &mut SimContext<'_>,
        arrived: Arrival<'_>,
    ) {
        *self = Self {
            owner,
            ..Self::default()
        };
        match destination {
            Destination::Path(path) => {
                self.destination = path.last().map(|s| s.tile);
                self.include_last = true;
                self.path = Some(path.clone());
                self.reset_index(ctx);
            }
            Destination::Tile { tile, include_last } => {
                self.destination = Some(*tile);
                self.include_last = *include_last;
                self.calculate_path(ctx);
            }
        }
        if self.finish_if_no_more_steps(ctx, arrived) {
            tracing::debug!("{} has nowhere to walk", owner);
        }
    }

    pub fn destination(&self) -> Option<Position> {
        self.destination
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// True while the owner is between nodes or still has nodes ahead.
    pub fn is_moving(&self) -> bool {
        !self.finished && !self.paused && self.path.is_some()
    }

    pub fn request_pause(&mut self) {
        if self.finished || self.paused {
            return;
        }
        if self.path.is_none() {
            self.paused = true;
        } else {
            self.pausing = true;
        }
    }

    /// Resumes with a fresh path from wherever the owner stands now.
    pub fn resume_with(&mut self, ctx: &mut SimContext<'_>, arrived: Arrival<'_>) {
        if !self.paused && !self.pausing {
            return;
        }
        self.paused = false;
        self.pausing = false;
        if self.finished {
            return;
        }
        self.calculate_path(ctx);
        if !self.finish_if_no_more_steps(ctx, arrived) {
            self.set_animation(ctx, AnimationState::Walk);
        }
    }

    /// Advances one frame.
    pub fn step(&mut self, dt: f32, ctx: &mut SimContext<'_>, arrived: Arrival<'_>) {
        if self.finished || self.paused {
            return;
        }
        if self.path.is_none() {
            self.calculate_path(ctx);
            if self.finish_if_no_more_steps(ctx, arrived) {
                return;
            }
        }

        let Some(next) = self.current_step() else {
            self.finish(ctx);
            return;
        };
        let Some(position) = ctx.entity(self.owner).map(|e| e.position) else {
            self.finished = true;
            return;
        };

        if position.is_on(next.tile) {
            self.commit(next, ctx);
            if self.pausing {
                self.pausing = false;
                self.paused = true;
                self.set_animation(ctx, AnimationState::Idle);
                tracing::debug!("{} paused at {}", self.owner, next.tile);
                return;
            }
            self.index += 1;
            if self.finish_if_no_more_steps(ctx, arrived) {
                return;
            }
            let Some(next) = self.current_step() else {
                self.finish(ctx);
                return;
            };
            if ctx.is_blocked(self.owner, next.tile) {
                tracing::debug!("{} path blocked at {}", self.owner, next.tile);
                self.path = None;
                self.finish(ctx);
                return;
            }
            self.move_toward(next.tile, dt, ctx);
        } else {
            self.move_toward(next.tile, dt, ctx);
        }
    }

    /// Detaches: the owner goes idle and the move counts as done.
    pub fn stop(&mut self, ctx: &mut SimContext<'_>) {
        if self.finished {
            return;
        }
        if self.destination.is_some() {
            self.finish(ctx);
        } else {
            self.finished = true;
        }
    }

    fn current_step(&self) -> Option<Step> {
        self.path.as_ref().and_then(|p| p.get(self.index)).copied()
    }

    fn commit(&mut self, node: Step, ctx: &mut SimContext<'_>) {
        if !ctx.combat {
            return;
        }
        if let Some(owner) = ctx.entity_mut(self.owner) {
            if owner.has(Capabilities::COMBATANT) {
                owner.stats.ap.add(-node.move_cost);
            }
        }
    }

    fn calculate_path(&mut self, ctx: &mut SimContext<'_>) {
        self.path = None;
        let (Some(destination), Some(from)) =
            (self.destination, ctx.entity(self.owner).map(|e| e.tile()))
        else {
            return;
        };
        let Some(mut path) = ctx
            .map()
            .find_path(&*ctx.world, self.owner, from, destination)
        else {
            tracing::debug!("{} found no path to {}", self.owner, destination);
            return;
        };

        if !self.include_last {
            path.drop_last(1);
        } else if path.len() > 1
            && path
                .last()
                .is_some_and(|last| ctx.is_blocked(self.owner, last.tile))
        {
            path.drop_last(1);
        }
        self.path = Some(path);
        self.reset_index(ctx);
    }

    /// Skips step 0 when it is the tile the owner already stands on.
    fn reset_index(&mut self, ctx: &SimContext<'_>) {
        let here = ctx.entity(self.owner).map(|e| e.tile());
        let first = self.path.as_ref().and_then(|p| p.first()).map(|s| s.tile);
        self.index = usize::from(first.is_some() && first == here);
    }

    fn no_more_steps(&mut self, ctx: &SimContext<'_>, arrived: Arrival<'_>) -> bool {
        if arrived(ctx) {
            return true;
        }
        let Some(path) = &self.path else {
            return true;
        };
        let Some(next) = path.get(self.index) else {
            return true;
        };
        let Some(owner) = ctx.entity(self.owner) else {
            return true;
        };
        if ctx.combat && owner.has(Capabilities::COMBATANT) && owner.stats.ap.current < next.move_cost
        {
            return true;
        }
        if !owner.can_perform(ActionKind::MoveTo) {
            return true;
        }
        if self.index > 0 && path.get(self.index - 1).is_some_and(|prev| prev.end_step) {
            return true;
        }
        if self.index + 1 == path.len() && ctx.is_blocked(self.owner, next.tile) {
            self.path = None;
            return true;
        }
        false
    }

    fn finish_if_no_more_steps(&mut self, ctx: &mut SimContext<'_>, arrived: Arrival<'_>) -> bool {
        if self.no_more_steps(ctx, arrived) {
            self.finish(ctx);
            true
        } else {
            false
        }
    }

    fn finish(&mut self, ctx: &mut SimContext<'_>) {
        self.finished = true;
        self.pausing = false;
        let walking = ctx
            .entity(self.owner)
            .is_some_and(|e| e.animation.state == AnimationState::Walk);
        if walking {
            self.set_animation(ctx, AnimationState::Idle);
        }
    }

    fn set_animation(&self, ctx: &mut SimContext<'_>, state: AnimationState) {
        let timings = ctx.rules().animation;
        if let Some(owner) = ctx.entity_mut(self.owner) {
            owner.set_animation(state, &timings);
        }
    }

    fn move_toward(&mut self, tile: Position, dt: f32, ctx: &mut SimContext<'_>) {
        let map = ctx.map();
        let speed_rules = ctx.rules().speed;
        let timings = ctx.rules().animation;
        let combat = ctx.combat;
        let Some(owner) = ctx.entity_mut(self.owner) else {
            return;
        };

        let mut speed = owner.speed * dt;
        if map.is_world_map() {
            speed *= speed_rules.world_map_multiplier;
        }
        if combat {
            speed *= speed_rules.combat_multiplier;
        }

        let target = tile.to_world();
        let dx = direction(target.x - owner.position.x);
        let dy = direction(target.y - owner.position.y);
        let (mut sx, mut sy) = (dx * speed, dy * speed);
        if map.is_isometric() && dx * dy > 0.0 {
            sx /= 2.0;
            sy /= 2.0;
        }

        owner.position.x = approach(owner.position.x, target.x, sx);
        owner.position.y = approach(owner.position.y, target.y, sy);
        if owner.has(Capabilities::ORIENTED) {
            owner.orientation = Orientation::toward_delta(map.is_isometric(), dx, dy);
        }
        owner.set_animation(AnimationState::Walk, &timings);
    }
}

fn direction(delta: f32) -> f32 {
    if delta == 0.0 { 0.0 } else { delta.signum() }
}

/// Moves `from` by `delta` without overshooting `to`.
fn approach(from: f32, to: f32, delta: f32) -> f32 {
    let moved = from + delta;
    if (delta > 0.0 && moved > to) || (delta < 0.0 && moved < to) {
        to
    } else {
        moved
    }
}

impl Action for MoveTo {
    fn kind(&self) -> ActionKind {
        ActionKind::MoveTo
    }

    fn init(
        &mut self,
        owner: EntityId,
        command: &ActionCommand,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), ActionError> {
        let ActionCommand::MoveTo(destination) = command else {
            return Err(mismatch(ActionKind::MoveTo, command));
        };
        check_owner(ActionKind::MoveTo, owner, ctx)?;
        self.begin(owner, destination, ctx, &never);
        Ok(())
    }

    fn update(&mut self, dt: f32, ctx: &mut SimContext<'_>) {
        self.step(dt, ctx, &never);
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn pause(&mut self) {
        self.request_pause();
    }

    fn resume(&mut self, ctx: &mut SimContext<'_>) {
        self.resume_with(ctx, &never);
    }

    fn is_blocking_in_combat(&self) -> bool {
        !self.finished
    }

    fn on_remove(&mut self, ctx: &mut SimContext<'_>) {
        self.stop(ctx);
    }

    fn write_params(&self, out: &mut Element) {
        if let Some(tile) = self.destination {
            out.set_tile(tile);
        }
        if !self.include_last {
            out.set("include_last", false);
        }
    }

    fn read_params(
        &mut self,
        owner: EntityId,
        input: &Element,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), PersistError> {
        let destination = Destination::Tile {
            tile: input.tile()?,
            include_last: input.parse("include_last")?.unwrap_or(true),
        };
        self.init(owner, &ActionCommand::MoveTo(destination), ctx)?;
        Ok(())
    }
}
