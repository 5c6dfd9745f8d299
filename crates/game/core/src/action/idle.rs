//! Small actions that do not move: waiting, turning, shouting and brain toggles.

use crate::env::{Request, RollPurpose, SimContext, SimEvent};
use crate::persist::{Element, PersistError};
use crate::state::{EntityId, Orientation, Position};

use super::command::{read_duration, read_orientations, write_duration, write_orientations};
use super::{
    Action, ActionCommand, ActionError, ActionKind, ActionSlot, LookAroundParams, WanderDuration,
    check_owner, mismatch,
};

// ============================================================================
// Wait
// ============================================================================

/// Does nothing for a while. Holds the turn in combat until done.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Wait {
    seconds: f32,
    elapsed: f32,
    paused: bool,
    finished: bool,
}

impl Action for Wait {
    fn kind(&self) -> ActionKind {
        ActionKind::Wait
    }

    fn init(
        &mut self,
        owner: EntityId,
        command: &ActionCommand,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), ActionError> {
        let ActionCommand::Wait { seconds } = command else {
            return Err(mismatch(ActionKind::Wait, command));
        };
        check_owner(ActionKind::Wait, owner, ctx)?;
        *self = Self {
            seconds: *seconds,
            ..Self::default()
        };
        Ok(())
    }

    fn update(&mut self, dt: f32, _ctx: &mut SimContext<'_>) {
        if self.finished || self.paused {
            return;
        }
        self.elapsed += dt;
        self.finished = self.elapsed > self.seconds;
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self, _ctx: &mut SimContext<'_>) {
        self.paused = false;
    }

    fn is_blocking_in_combat(&self) -> bool {
        !self.finished
    }

    fn write_params(&self, out: &mut Element) {
        out.set("seconds", self.seconds);
        out.set("elapsed", self.elapsed);
    }

    fn read_params(
        &mut self,
        owner: EntityId,
        input: &Element,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), PersistError> {
        let seconds = input.require("seconds")?;
        self.init(owner, &ActionCommand::Wait { seconds }, ctx)?;
        self.elapsed = input.parse("elapsed")?.unwrap_or(0.0);
        Ok(())
    }
}

// ============================================================================
// LookAt
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LookAt {
    tile: Position,
    finished: bool,
}

impl Action for LookAt {
    fn kind(&self) -> ActionKind {
        ActionKind::LookAt
    }

    fn init(
        &mut self,
        owner: EntityId,
        command: &ActionCommand,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), ActionError> {
        let ActionCommand::LookAt { tile } = command else {
            return Err(mismatch(ActionKind::LookAt, command));
        };
        check_owner(ActionKind::LookAt, owner, ctx)?;
        *self = Self {
            tile: *tile,
            finished: true,
        };
        let isometric = ctx.map().is_isometric();
        if let Some(entity) = ctx.entity_mut(owner) {
            entity.face(isometric, tile.to_world());
        }
        Ok(())
    }

    fn update(&mut self, _dt: f32, _ctx: &mut SimContext<'_>) {}

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn is_paused(&self) -> bool {
        false
    }

    fn pause(&mut self) {}

    fn resume(&mut self, _ctx: &mut SimContext<'_>) {}

    fn is_blocking_in_combat(&self) -> bool {
        false
    }

    fn write_params(&self, out: &mut Element) {
        out.set_tile(self.tile);
    }

    fn read_params(
        &mut self,
        owner: EntityId,
        input: &Element,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), PersistError> {
        let tile = input.tile()?;
        self.init(owner, &ActionCommand::LookAt { tile }, ctx)?;
        Ok(())
    }
}

// ============================================================================
// LookAround
// ============================================================================

const TURN_INTERVAL_SECS: f32 = 1.0;

/// Idle glancing. Once per second the owner may turn one step either way.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LookAround {
    owner: EntityId,
    params: Option<LookAroundParams>,
    since_roll: f32,
    total: f32,
    paused: bool,
    finished: bool,
}

impl LookAround {
    /// One step clockwise or anticlockwise, avoiding forbidden facings.
    fn pick_turn(&self, current: Orientation, ctx: &mut SimContext<'_>) -> Option<Orientation> {
        let forbidden = self.params.as_ref().map_or(&[][..], |p| &p.forbidden[..]);
        let clockwise = current.clockwise();
        let anticlockwise = current.anticlockwise();
        match (forbidden.contains(&clockwise), forbidden.contains(&anticlockwise)) {
            (true, true) => None,
            (true, false) => Some(anticlockwise),
            (false, true) => Some(clockwise),
            (false, false) => {
                if ctx.roll(self.owner, RollPurpose::Wander, 2) == 0 {
                    Some(clockwise)
                } else {
                    Some(anticlockwise)
                }
            }
        }
    }
}

impl Action for LookAround {
    fn kind(&self) -> ActionKind {
        ActionKind::LookAround
    }

    fn init(
        &mut self,
        owner: EntityId,
        command: &ActionCommand,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), ActionError> {
        let ActionCommand::LookAround(params) = command else {
            return Err(mismatch(ActionKind::LookAround, command));
        };
        check_owner(ActionKind::LookAround, owner, ctx)?;
        *self = Self {
            owner,
            params: Some(params.clone()),
            // The first roll happens on the first update.
            since_roll: TURN_INTERVAL_SECS,
            ..Self::default()
        };
        Ok(())
    }

    fn update(&mut self, dt: f32, ctx: &mut SimContext<'_>) {
        if self.finished || self.paused {
            return;
        }
        let Some((chance, duration)) = self.params.as_ref().map(|p| (p.chance_to_turn, p.duration))
        else {
            self.finished = true;
            return;
        };

        self.since_roll += dt;
        if matches!(duration, WanderDuration::Seconds(_)) {
            self.total += dt;
        }
        if self.since_roll < TURN_INTERVAL_SECS {
            if let WanderDuration::Seconds(limit) = duration
                && self.total >= limit
            {
                self.finished = true;
            }
            return;
        }

        self.since_roll = 0.0;
        let Some(current) = ctx.entity(self.owner).map(|e| e.orientation) else {
            self.finished = true;
            return;
        };
        if ctx.roll(self.owner, RollPurpose::Wander, 100) >= chance {
            return;
        }
        let Some(facing) = self.pick_turn(current, ctx) else {
            return;
        };
        if let Some(entity) = ctx.entity_mut(self.owner) {
            entity.orientation = facing;
        }
        tracing::trace!("{} looks {}", self.owner, facing.as_ref());
        if duration == WanderDuration::Once {
            self.finished = true;
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self, _ctx: &mut SimContext<'_>) {
        self.paused = false;
    }

    fn is_blocking_in_combat(&self) -> bool {
        false
    }

    fn write_params(&self, out: &mut Element) {
        let Some(params) = &self.params else {
            return;
        };
        out.set("chance_to_turn", params.chance_to_turn);
        write_duration(out, params.duration);
        out.set("total", self.total);
        write_orientations(out, "forbidden", &params.forbidden);
    }

    fn read_params(
        &mut self,
        owner: EntityId,
        input: &Element,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), PersistError> {
        let params = LookAroundParams {
            chance_to_turn: input.parse("chance_to_turn")?.unwrap_or(10),
            duration: read_duration(input)?,
            forbidden: read_orientations(input, "forbidden")?,
        };
        self.init(owner, &ActionCommand::LookAround(params), ctx)?;
        self.total = input.parse("total")?.unwrap_or(0.0);
        Ok(())
    }
}

// ============================================================================
// Shout
// ============================================================================

/// Speech bubble. Any number may run at once.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Shout {
    text: String,
    finished: bool,
}

impl Action for Shout {
    fn kind(&self) -> ActionKind {
        ActionKind::Shout
    }

    fn init(
        &mut self,
        owner: EntityId,
        command: &ActionCommand,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), ActionError> {
        let ActionCommand::Shout { text } = command else {
            return Err(mismatch(ActionKind::Shout, command));
        };
        check_owner(ActionKind::Shout, owner, ctx)?;
        *self = Self {
            text: text.clone(),
            finished: true,
        };
        tracing::info!("{} shouts: {}", owner, text);
        ctx.emit(SimEvent::Shouted {
            actor: owner,
            text: text.clone(),
        });
        Ok(())
    }

    fn update(&mut self, _dt: f32, _ctx: &mut SimContext<'_>) {}

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn is_paused(&self) -> bool {
        false
    }

    fn pause(&mut self) {}

    fn resume(&mut self, _ctx: &mut SimContext<'_>) {}

    fn is_blocking_in_combat(&self) -> bool {
        false
    }

    fn slot(&self) -> ActionSlot {
        ActionSlot::Unbounded
    }

    fn write_params(&self, out: &mut Element) {
        out.set("text", &self.text);
    }

    fn read_params(
        &mut self,
        owner: EntityId,
        input: &Element,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), PersistError> {
        let text = input.require("text")?;
        self.init(owner, &ActionCommand::Shout { text }, ctx)?;
        Ok(())
    }
}

// ============================================================================
// DisableAi / EnableAi
// ============================================================================

/// Switches the owner's brain off or on. Mostly used inside chains.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SetBrainEnabled {
    enabled: bool,
    finished: bool,
}

impl SetBrainEnabled {
    pub fn disable() -> Self {
        Self::default()
    }

    pub fn enable() -> Self {
        Self {
            enabled: true,
            finished: false,
        }
    }

    fn this_kind(&self) -> ActionKind {
        if self.enabled {
            ActionKind::EnableAi
        } else {
            ActionKind::DisableAi
        }
    }

    fn command(&self) -> ActionCommand {
        if self.enabled {
            ActionCommand::EnableAi
        } else {
            ActionCommand::DisableAi
        }
    }
}

impl Action for SetBrainEnabled {
    fn kind(&self) -> ActionKind {
        self.this_kind()
    }

    fn init(
        &mut self,
        owner: EntityId,
        command: &ActionCommand,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), ActionError> {
        if command.kind() != self.this_kind() {
            return Err(mismatch(self.this_kind(), command));
        }
        check_owner(self.this_kind(), owner, ctx)?;
        self.finished = true;
        tracing::debug!(
            "{} brain {}",
            owner,
            if self.enabled { "enabled" } else { "disabled" }
        );
        ctx.request(Request::SetBrainEnabled {
            entity: owner,
            enabled: self.enabled,
        });
        Ok(())
    }

    fn update(&mut self, _dt: f32, _ctx: &mut SimContext<'_>) {}

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn is_paused(&self) -> bool {
        false
    }

    fn pause(&mut self) {}

    fn resume(&mut self, _ctx: &mut SimContext<'_>) {}

    fn is_blocking_in_combat(&self) -> bool {
        false
    }

    fn write_params(&self, _out: &mut Element) {}

    fn read_params(
        &mut self,
        owner: EntityId,
        _input: &Element,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), PersistError> {
        let command = self.command();
        self.init(owner, &command, ctx)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Capabilities, Entity, Orientation};
    use crate::testing::Fixture;

    const OWNER: EntityId = EntityId(1);

    fn fixture() -> Fixture {
        Fixture::corridor()
            .with_entity(Entity::new(OWNER, "guard", Capabilities::NPC).at(Position::new(3, 1)))
    }

    #[test]
    fn wait_runs_past_its_duration_and_blocks_meanwhile() {
        let mut fx = fixture();
        let mut wait = Wait::default();
        wait.init(OWNER, &ActionCommand::wait(0.5), &mut fx.ctx(true))
            .expect("init");
        assert!(wait.is_blocking_in_combat());

        let frames = fx.run(&mut wait, true);
        assert!((10..=11).contains(&frames));
        assert!(!wait.is_blocking_in_combat());
    }

    #[test]
    fn paused_wait_does_not_advance() {
        let mut fx = fixture();
        let mut wait = Wait::default();
        wait.init(OWNER, &ActionCommand::wait(0.1), &mut fx.ctx(false))
            .expect("init");
        wait.pause();
        for _ in 0..10 {
            wait.update(0.05, &mut fx.ctx(false));
        }
        assert!(!wait.is_finished());
        wait.resume(&mut fx.ctx(false));
        fx.run(&mut wait, false);
        assert!(wait.is_finished());
    }

    #[test]
    fn look_at_turns_the_owner() {
        let mut fx = fixture();
        let mut look = LookAt::default();
        look.init(
            OWNER,
            &ActionCommand::LookAt {
                tile: Position::new(1, 1),
            },
            &mut fx.ctx(false),
        )
        .expect("init");
        assert!(look.is_finished());
        assert_eq!(fx.entity(OWNER).orientation, Orientation::Left);
    }

    #[test]
    fn shout_is_unbounded_and_reported() {
        let mut fx = fixture();
        let mut shout = Shout::default();
        shout
            .init(
                OWNER,
                &ActionCommand::Shout {
                    text: "Halt!".into(),
                },
                &mut fx.ctx(false),
            )
            .expect("init");
        assert_eq!(shout.slot(), ActionSlot::Unbounded);
        assert_eq!(
            fx.events(),
            &[SimEvent::Shouted {
                actor: OWNER,
                text: "Halt!".into()
            }]
        );
    }

    #[test]
    fn brain_toggles_are_requests() {
        let mut fx = fixture();
        let mut off = SetBrainEnabled::disable();
        off.init(OWNER, &ActionCommand::DisableAi, &mut fx.ctx(false))
            .expect("init");
        assert!(SetBrainEnabled::enable()
            .init(OWNER, &ActionCommand::DisableAi, &mut fx.ctx(false))
            .is_err());
        assert_eq!(
            fx.outbox.requests,
            vec![Request::SetBrainEnabled {
                entity: OWNER,
                enabled: false
            }]
        );
    }

    fn look_around(chance_to_turn: u32, duration: WanderDuration, forbidden: Vec<Orientation>) -> ActionCommand {
        ActionCommand::LookAround(LookAroundParams {
            chance_to_turn,
            duration,
            forbidden,
        })
    }

    #[test]
    fn look_around_once_turns_a_single_step() {
        let mut fx = fixture();
        let mut look = LookAround::default();
        look.init(OWNER, &look_around(50, WanderDuration::Once, vec![]), &mut fx.ctx(false))
            .expect("init");
        look.update(0.05, &mut fx.ctx(false));

        assert!(look.is_finished());
        assert_eq!(fx.entity(OWNER).orientation, Orientation::UpRight);
    }

    #[test]
    fn look_around_avoids_forbidden_facings() {
        let mut fx = fixture();
        let mut look = LookAround::default();
        look.init(
            OWNER,
            &look_around(50, WanderDuration::Once, vec![Orientation::UpRight]),
            &mut fx.ctx(false),
        )
        .expect("init");
        fx.run(&mut look, false);
        assert_eq!(fx.entity(OWNER).orientation, Orientation::UpLeft);
    }

    #[test]
    fn look_around_for_seconds_stops_on_time_and_restores() {
        let mut fx = fixture();
        let mut look = LookAround::default();
        // Every roll is 0, which never beats a chance of 0.
        look.init(OWNER, &look_around(0, WanderDuration::Seconds(2.0), vec![]), &mut fx.ctx(false))
            .expect("init");
        for _ in 0..10 {
            look.update(0.05, &mut fx.ctx(false));
        }
        let mut saved = Element::new("look_around");
        look.write_params(&mut saved);

        let mut restored = LookAround::default();
        restored
            .read_params(OWNER, &saved, &mut fx.ctx(false))
            .expect("restore");
        assert!(!look.is_blocking_in_combat());
        let frames = fx.run(&mut restored, false);

        assert!((29..=31).contains(&frames), "{frames}");
        assert_eq!(fx.entity(OWNER).orientation, Orientation::Up);
    }
}
