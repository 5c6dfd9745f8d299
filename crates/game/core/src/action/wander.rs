//! Random strolling around a centre tile.
//!
//! Once per second the wanderer, when idle, rolls against its chance to move
//! and walks to a random tile within the radius. The centre is captured on
//! the first update, since an entity restored from a save may not have its
//! final position yet when the action is built.

use crate::env::{RollPurpose, SimContext};
use crate::persist::{Element, PersistError};
use crate::state::{EntityId, Position};

use super::command::{read_duration, write_duration};
use super::movement::never;
use super::{
    Action, ActionCommand, ActionError, ActionKind, Destination, MoveTo, WanderDuration,
    WanderParams, check_owner, mismatch,
};

const ROLL_INTERVAL_SECS: f32 = 1.0;

#[derive(Debug, Default)]
pub struct Wander {
    owner: EntityId,
    params: Option<WanderParams>,
    centre: Option<Position>,
    mover: MoveTo,
    walking: bool,
    walked_once: bool,
    since_roll: f32,
    total: f32,
    paused: bool,
    finished: bool,
}

impl Wander {
    pub fn centre(&self) -> Option<Position> {
        self.centre
    }

    fn is_walking(&self) -> bool {
        self.walking && !self.mover.is_finished()
    }

    fn may_walk_again(&self, params: &WanderParams) -> bool {
        match params.duration {
            WanderDuration::Infinite => true,
            WanderDuration::Once => !self.walked_once,
            WanderDuration::Seconds(limit) => self.total < limit,
        }
    }

    /// Random tile within the radius, kept off the outer map border.
    fn pick_tile(&self, centre: Position, radius: i32, ctx: &mut SimContext<'_>) -> Position {
        let dims = ctx.map().dimensions();
        let pick = |ctx: &mut SimContext<'_>, centre: i32, max: u32| {
            let low = (centre - radius).max(1);
            let high = (centre + radius).min(max as i32 - 1);
            ctx.roll_between(self.owner, RollPurpose::Wander, low, high)
        };
        let x = pick(ctx, centre.x, dims.width);
        let y = pick(ctx, centre.y, dims.height);
        Position::new(x, y)
    }
}

impl Action for Wander {
    fn kind(&self) -> ActionKind {
        ActionKind::Wander
    }

    fn init(
        &mut self,
        owner: EntityId,
        command: &ActionCommand,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), ActionError> {
        let ActionCommand::Wander(params) = command else {
            return Err(mismatch(ActionKind::Wander, command));
        };
        check_owner(ActionKind::Wander, owner, ctx)?;
        *self = Self {
            owner,
            params: Some(*params),
            centre: params.centre,
            // The first roll happens on the first update.
            since_roll: ROLL_INTERVAL_SECS,
            ..Self::default()
        };
        Ok(())
    }

    fn update(&mut self, dt: f32, ctx: &mut SimContext<'_>) {
        let Some(params) = self.params else {
            self.finished = true;
            return;
        };
        if self.finished || self.is_paused() {
            return;
        }
        let Some(here) = ctx.entity(self.owner).map(|e| (e.tile(), e.visible_to_player)) else {
            self.finished = true;
            return;
        };
        if params.visible_only && !here.1 {
            return;
        }
        let centre = *self.centre.get_or_insert(here.0);

        self.since_roll += dt;
        if matches!(params.duration, WanderDuration::Seconds(_)) {
            self.total += dt;
        }

        if self.since_roll < ROLL_INTERVAL_SECS || self.is_walking() {
            if self.walking {
                self.mover.step(dt, ctx, &never);
            }
            return;
        }
        if !self.may_walk_again(&params) {
            self.finished = true;
            return;
        }

        self.since_roll = 0.0;
        let roll = ctx.roll(self.owner, RollPurpose::Wander, 100);
        if roll < params.chance_to_move {
            let tile = self.pick_tile(centre, params.radius, ctx);
            tracing::debug!("{} wanders to {}", self.owner, tile);
            self.mover
                .begin(self.owner, &Destination::tile(tile), ctx, &never);
            self.walking = true;
            self.walked_once = true;
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn is_paused(&self) -> bool {
        self.paused || self.mover.is_paused()
    }

    fn pause(&mut self) {
        if self.is_walking() {
            self.mover.request_pause();
        } else {
            self.paused = true;
        }
    }

    fn resume(&mut self, ctx: &mut SimContext<'_>) {
        self.paused = false;
        self.mover.resume_with(ctx, &never);
    }

    fn is_blocking_in_combat(&self) -> bool {
        self.is_walking()
    }

    fn on_remove(&mut self, ctx: &mut SimContext<'_>) {
        if self.walking {
            self.mover.stop(ctx);
        }
        self.finished = true;
    }

    fn write_params(&self, out: &mut Element) {
        let Some(params) = self.params else {
            return;
        };
        out.set("radius", params.radius);
        out.set("chance_to_move", params.chance_to_move);
        write_duration(out, params.duration);
        out.set("total", self.total);
        out.set("visible_only", params.visible_only);
        if let Some(centre) = self.centre {
            out.set("centre_x", centre.x);
            out.set("centre_y", centre.y);
        }
    }

    fn read_params(
        &mut self,
        owner: EntityId,
        input: &Element,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), PersistError> {
        let duration = read_duration(input)?;
        let centre = match (input.parse("centre_x")?, input.parse("centre_y")?) {
            (Some(x), Some(y)) => Some(Position::new(x, y)),
            _ => None,
        };
        let params = WanderParams {
            centre,
            radius: input.parse("radius")?.unwrap_or(10),
            chance_to_move: input.parse("chance_to_move")?.unwrap_or(10),
            duration,
            visible_only: input.flag("visible_only")?,
        };
        self.init(owner, &ActionCommand::Wander(params), ctx)?;
        self.total = input.parse("total")?.unwrap_or(0.0);
        Ok(())
    }
}
