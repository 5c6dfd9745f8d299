//! Attack: approach a target, swing or shoot, resolve each weapon once.
//!
//! # Phases
//!
//! ```text
//! approach  -> walk until adjacent, or until in sight for ranged
//! start     -> pick weapons, price the attack, face, play the animation
//! impact    -> melee legs roll now, ranged legs launch projectiles
//! settle    -> projectiles arrive (roll) or time out (miss)
//! done      -> animation over and every leg resolved: charge AP once,
//!              even if the target died and was removed meanwhile
//! ```
//!
//! The target's own actions are paused for the duration and resumed when the
//! attack is removed.

use arrayvec::ArrayVec;

use crate::combat::{
    Engagement, HitRoll, ProjectileId, attack_ap_cost, calculate_damage, chance_to_hit,
    variance_span,
};
use crate::env::{Request, RollPurpose, SimContext, SimEvent};
use crate::persist::{Element, PersistError};
use crate::state::{AnimationState, CombatModifiers, EntityId, Hand, Position};

use super::{
    Action, ActionCommand, ActionError, ActionKind, ActionSlot, Binding, Destination, MoveTo,
    TargetRef, check_owner, mismatch,
};

/// Adjustments for attacks launched by something other than the attack verb.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StrikeOptions {
    /// Replaces the computed AP cost. Perk attacks pay through the perk.
    pub cost_override: Option<i32>,
    /// Added to the attacker's modifiers for every roll of this attack.
    pub modifiers: CombatModifiers,
    /// Rolls to hit but never deals damage.
    pub sparring: bool,
}

#[derive(Debug, Default)]
pub struct Attack {
    owner: EntityId,
    options: StrikeOptions,
    mover: MoveTo,
    target: Option<TargetRef>,
    target_tile: Position,
    engagement: Engagement,
    started: bool,
    struck: bool,
    legs_resolved: usize,
    attack_finished: bool,
    action_finished: bool,
    total_ap_cost: i32,
    charged: bool,
    in_flight: ArrayVec<(ProjectileId, Hand), 2>,
    waited: f32,
    holds_target: bool,
    hits: u32,
    finished: bool,
}

impl Attack {
    /// Resets and starts an attack on `target`.
    pub fn begin(
        &mut self,
        owner: EntityId,
        target: EntityId,
        options: StrikeOptions,
        ctx: &mut SimContext<'_>,
    ) {
        *self = Self {
            owner,
            options,
            target: Some(TargetRef::new(target)),
            ..Self::default()
        };
        let binding = self.target.as_mut().map(|t| t.resolve(&*ctx.world));
        if let Some(Binding::Fresh(tile)) = binding {
            self.on_target_bound(tile, ctx);
        }
    }

    pub fn target(&self) -> Option<EntityId> {
        self.target.map(|t| t.id())
    }

    /// Successful rolls so far.
    pub fn hits(&self) -> u32 {
        self.hits
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_ranged(&self) -> bool {
        self.engagement.ranged
    }

    fn refusal_kind(&self) -> ActionKind {
        if self.options.sparring {
            ActionKind::MockAttack
        } else {
            ActionKind::Attack
        }
    }

    /// One-time setup once the target is known to exist.
    fn on_target_bound(&mut self, tile: Position, ctx: &mut SimContext<'_>) {
        let Some(target) = self.target() else {
            return;
        };
        self.target_tile = tile;
        ctx.request(Request::PauseActions(target));
        self.holds_target = true;

        let Some(attacker) = ctx.entity(self.owner) else {
            self.finished = true;
            return;
        };
        let here = attacker.tile();
        self.engagement = Engagement::determine(attacker, here, tile);
        let adjacent = here.is_next_to_or_on(tile);
        let ranged = self.engagement.ranged;
        let cost = self.price(ctx);
        let ap = ctx.entity(self.owner).map_or(0, |e| e.stats.ap.current);

        if adjacent && ranged {
            ctx.refuse(self.owner, self.refusal_kind(), "too close for a ranged weapon");
            self.finished = true;
            return;
        }
        // Melee from afar is priced after the walk.
        if (adjacent || ranged) && ap < cost {
            ctx.refuse(self.owner, self.refusal_kind(), "not enough AP");
            self.finished = true;
            return;
        }

        let arrived = self.arrival();
        self.mover
            .begin(self.owner, &Destination::tile(tile), ctx, &arrived);
        self.finished = self.compute_finished(ctx);
    }

    fn price(&self, ctx: &SimContext<'_>) -> i32 {
        if let Some(cost) = self.options.cost_override {
            return cost;
        }
        if !ctx.combat {
            return 0;
        }
        ctx.entity(self.owner)
            .map_or(0, |e| attack_ap_cost(e, ctx.rules().ap.attack))
    }

    /// Adjacent, or in sight with a ranged engagement.
    fn arrival(&self) -> impl Fn(&SimContext<'_>) -> bool + use<> {
        let (owner, tile, ranged) = (self.owner, self.target_tile, self.engagement.ranged);
        move |ctx: &SimContext<'_>| {
            ctx.entity(owner).is_none_or(|me| {
                me.tile().is_next_to_or_on(tile) || (ranged && ctx.can_see(owner, tile))
            })
        }
    }

    fn is_adjacent(&self, ctx: &SimContext<'_>) -> bool {
        let target = self.target().and_then(|id| ctx.world.tile_of(id));
        match (ctx.entity(self.owner), target) {
            (Some(me), Some(tile)) => me.tile().is_next_to_or_on(tile),
            _ => false,
        }
    }

    fn compute_finished(&self, ctx: &SimContext<'_>) -> bool {
        if !self.mover.is_finished() {
            return false;
        }
        if self.action_finished {
            return true;
        }
        // A started swing plays out even if the target is gone.
        if self.started {
            return !ctx.world.contains(self.owner);
        }
        let target_present = self
            .target()
            .is_some_and(|id| ctx.world.contains(id));
        let adjacent = self.is_adjacent(ctx);
        let ranged = self.engagement.ranged;
        !target_present
            || (!adjacent && !ranged)
            || (ranged && !ctx.can_see(self.owner, self.target_tile))
    }

    fn start(&mut self, ctx: &mut SimContext<'_>) {
        self.started = true;
        let Some(attacker) = ctx.entity(self.owner) else {
            self.action_finished = true;
            return;
        };
        let here = attacker.tile();
        self.engagement = Engagement::determine(attacker, here, self.target_tile);
        let fists = attacker.equipment.is_unarmed() && here.is_next_to_or_on(self.target_tile);
        let can_swing = !self.engagement.hands.is_empty() || fists;
        let ap = attacker.stats.ap.current;
        self.total_ap_cost = self.price(ctx);

        if ap < self.total_ap_cost {
            ctx.refuse(self.owner, self.refusal_kind(), "not enough AP");
            self.action_finished = true;
            return;
        }
        if !can_swing {
            ctx.refuse(self.owner, self.refusal_kind(), "no usable weapon");
            self.action_finished = true;
            return;
        }

        let isometric = ctx.map().is_isometric();
        let timings = ctx.rules().animation;
        let state = if self.engagement.ranged {
            AnimationState::AttackRanged
        } else {
            AnimationState::AttackMelee
        };
        let target = self.target_tile.to_world();
        if let Some(attacker) = ctx.entity_mut(self.owner) {
            attacker.sneaking = false;
            attacker.face(isometric, target);
            attacker.animation.restart(state, &timings);
        }
        tracing::debug!(
            "{} starts {} attack on {}",
            self.owner,
            if self.engagement.ranged { "ranged" } else { "melee" },
            self.target_tile
        );
    }

    fn impact(&mut self, ctx: &mut SimContext<'_>) {
        self.struck = true;
        let Some(target) = self.target() else {
            return;
        };
        let hands = self.engagement.hands.clone();
        for hand in hands {
            let shoots = ctx
                .entity(self.owner)
                .and_then(|e| e.equipment.weapon(hand))
                .is_some_and(|w| w.projectile);
            if shoots {
                self.launch(hand, target, ctx);
            } else {
                self.strike(Some(hand), ctx);
            }
        }
        let unarmed = ctx
            .entity(self.owner)
            .is_some_and(|e| e.equipment.is_unarmed());
        if unarmed && self.is_adjacent(ctx) {
            self.strike(None, ctx);
        } else if self.engagement.hands.is_empty() {
            self.attack_finished = true;
        }
    }

    fn launch(&mut self, hand: Hand, target: EntityId, ctx: &mut SimContext<'_>) {
        let (Some(from), Some(to)) = (
            ctx.entity(self.owner).map(|e| e.position),
            ctx.entity(target).map(|e| e.position),
        ) else {
            self.resolve_leg();
            return;
        };
        let projectile = ctx.world.projectiles.launch(self.owner, target, from, to);
        self.in_flight.push((projectile, hand));
        ctx.emit(SimEvent::ProjectileLaunched {
            attacker: self.owner,
            target,
            projectile,
        });
    }

    /// Waits for projectiles, bounded by the configured timeout.
    fn settle(&mut self, dt: f32, ctx: &mut SimContext<'_>) {
        if self.in_flight.is_empty() {
            return;
        }
        self.waited += dt;
        let mut index = 0;
        while index < self.in_flight.len() {
            let (projectile, hand) = self.in_flight[index];
            if ctx.world.projectiles.has_arrived(projectile) {
                ctx.world.projectiles.retire(projectile);
                self.in_flight.remove(index);
                self.strike(Some(hand), ctx);
            } else {
                index += 1;
            }
        }

        if !self.in_flight.is_empty() && self.waited > ctx.rules().projectile.timeout_secs {
            for (projectile, _) in std::mem::take(&mut self.in_flight) {
                ctx.world.projectiles.retire(projectile);
                tracing::info!("{} projectile lost, counting a miss", self.owner);
                ctx.emit(SimEvent::ProjectileLost {
                    attacker: self.owner,
                    projectile,
                });
                self.resolve_leg();
            }
        }
    }

    /// Rolls one leg against the target. `None` is a fist.
    fn strike(&mut self, hand: Option<Hand>, ctx: &mut SimContext<'_>) {
        let Some(target) = self.target() else {
            return;
        };
        let rules = ctx.rules();
        let isometric = ctx.map().is_isometric();
        let extra = self.options.modifiers;

        let Some((chance, span)) = ctx
            .entity(self.owner)
            .zip(ctx.entity(target))
            .map(|(attacker, defender)| {
                let weapon = hand.and_then(|h| attacker.equipment.weapon(h));
                (
                    chance_to_hit(attacker, defender, hand, isometric, &rules.hit, &extra),
                    variance_span(attacker, weapon),
                )
            })
        else {
            self.resolve_leg();
            return;
        };

        let roll = HitRoll::resolve(chance, ctx.roll(self.owner, RollPurpose::Hit, 100) as i32);
        if self.options.sparring {
            if roll.hit {
                self.hits += 1;
            }
            tracing::debug!("{} spars with {} (hit: {})", self.owner, target, roll.hit);
            self.resolve_leg();
            return;
        }
        let mut damage = 0;
        if roll.hit {
            let variance = ctx.roll(self.owner, RollPurpose::Damage, span) as i32;
            damage = ctx
                .entity(self.owner)
                .zip(ctx.entity(target))
                .map_or(0, |(attacker, defender)| {
                    let weapon = hand.and_then(|h| attacker.equipment.weapon(h));
                    calculate_damage(attacker, defender, weapon, variance, &extra)
                });
            let died = ctx.entity_mut(target).is_some_and(|defender| {
                defender.take_damage(damage, &rules.animation);
                !defender.is_alive()
            });
            self.hits += 1;
            tracing::info!(
                "{} hits {} for {} (chance {}, roll {})",
                self.owner,
                target,
                damage,
                roll.chance,
                roll.roll
            );
            if died {
                tracing::info!("{} dies", target);
                ctx.emit(SimEvent::Died { entity: target });
            }
        } else {
            tracing::info!(
                "{} misses {} (chance {}, roll {})",
                self.owner,
                target,
                roll.chance,
                roll.roll
            );
        }

        ctx.emit(SimEvent::AttackResolved {
            attacker: self.owner,
            target,
            hand,
            roll,
            damage,
        });
        self.resolve_leg();
    }

    fn resolve_leg(&mut self) {
        self.legs_resolved += 1;
        if self.legs_resolved >= self.engagement.hands.len() {
            self.attack_finished = true;
        }
    }

    /// Frame logic shared by the attack verb and perk attacks.
    pub fn advance(&mut self, dt: f32, ctx: &mut SimContext<'_>) {
        if self.finished || self.mover.is_paused() {
            return;
        }

        if self.target.is_some_and(|t| !t.is_bound()) {
            match self.target.as_mut().map(|t| t.resolve(&*ctx.world)) {
                Some(Binding::Fresh(tile)) => self.on_target_bound(tile, ctx),
                _ => {
                    ctx.refuse(self.owner, self.refusal_kind(), "target vanished");
                    self.finished = true;
                    return;
                }
            }
            if self.finished {
                return;
            }
        }

        let arrived = self.arrival();
        self.mover.step(dt, ctx, &arrived);

        if self.mover.is_finished() && !self.action_finished {
            if self.started {
                self.follow_through(dt, ctx);
            } else {
                let target_present = self.target().is_some_and(|id| ctx.world.contains(id));
                let in_reach = self.is_adjacent(ctx) || self.engagement.ranged;
                if target_present && in_reach {
                    self.start(ctx);
                }
            }
        }

        self.finished = self.compute_finished(ctx);
    }

    /// Impact, projectiles and the end of the animation, once started.
    fn follow_through(&mut self, dt: f32, ctx: &mut SimContext<'_>) {
        let animation = ctx.entity(self.owner).map(|e| e.animation);
        if animation.is_some_and(|a| a.has_impact_passed()) && !self.struck {
            self.impact(ctx);
        }
        self.settle(dt, ctx);
        let animation_done = ctx
            .entity(self.owner)
            .is_none_or(|e| e.animation.is_finished());
        if animation_done && self.attack_finished {
            self.action_finished = true;
            self.charge(ctx);
            let timings = ctx.rules().animation;
            if let Some(attacker) = ctx.entity_mut(self.owner)
                && attacker.is_alive()
            {
                attacker.set_animation(AnimationState::Idle, &timings);
            }
        }
    }

    /// Deducts the attack's AP. Runs at most once per attack.
    fn charge(&mut self, ctx: &mut SimContext<'_>) {
        if self.charged {
            return;
        }
        self.charged = true;
        let cost = self.total_ap_cost;
        if cost > 0
            && let Some(attacker) = ctx.entity_mut(self.owner)
        {
            attacker.stats.ap.add(-cost);
        }
        tracing::debug!("{} attack done, {} AP charged", self.owner, cost);
    }

    /// Releases the target, pending projectiles and the owner's walk.
    pub fn release(&mut self, ctx: &mut SimContext<'_>) {
        self.mover.stop(ctx);
        // Cut short after the blow landed: the swing still costs.
        if self.struck && !self.action_finished {
            self.charge(ctx);
        }
        for (projectile, _) in std::mem::take(&mut self.in_flight) {
            ctx.world.projectiles.retire(projectile);
        }
        if self.holds_target {
            self.holds_target = false;
            if let Some(target) = self.target() {
                ctx.request(Request::ResumeActions(target));
            }
        }
        self.finished = true;
    }
}

impl Action for Attack {
    fn kind(&self) -> ActionKind {
        ActionKind::Attack
    }

    fn init(
        &mut self,
        owner: EntityId,
        command: &ActionCommand,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), ActionError> {
        let ActionCommand::Attack { target } = command else {
            return Err(mismatch(ActionKind::Attack, command));
        };
        check_owner(ActionKind::Attack, owner, ctx)?;
        self.begin(owner, *target, StrikeOptions::default(), ctx);
        Ok(())
    }

    fn update(&mut self, dt: f32, ctx: &mut SimContext<'_>) {
        self.advance(dt, ctx);
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
        self.release(ctx);
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
        self.init(owner, &ActionCommand::Attack { target }, ctx)?;
        Ok(())
    }
}

/// Sparring: the whole attack sequence at no AP cost and without damage.
#[derive(Debug, Default)]
pub struct MockAttack {
    strike: Attack,
}

impl MockAttack {
    pub fn hits(&self) -> u32 {
        self.strike.hits()
    }
}

impl Action for MockAttack {
    fn kind(&self) -> ActionKind {
        ActionKind::MockAttack
    }

    fn init(
        &mut self,
        owner: EntityId,
        command: &ActionCommand,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), ActionError> {
        let ActionCommand::MockAttack { target } = command else {
            return Err(mismatch(ActionKind::MockAttack, command));
        };
        check_owner(ActionKind::MockAttack, owner, ctx)?;
        let options = StrikeOptions {
            cost_override: Some(0),
            sparring: true,
            ..StrikeOptions::default()
        };
        self.strike.begin(owner, *target, options, ctx);
        Ok(())
    }

    fn update(&mut self, dt: f32, ctx: &mut SimContext<'_>) {
        self.strike.advance(dt, ctx);
    }

    fn is_finished(&self) -> bool {
        self.strike.is_finished()
    }

    fn is_paused(&self) -> bool {
        Action::is_paused(&self.strike)
    }

    fn pause(&mut self) {
        self.strike.pause();
    }

    fn resume(&mut self, ctx: &mut SimContext<'_>) {
        self.strike.resume(ctx);
    }

    fn is_blocking_in_combat(&self) -> bool {
        !self.strike.is_finished()
    }

    fn slot(&self) -> ActionSlot {
        ActionSlot::Exclusive(ActionKind::MoveTo)
    }

    fn on_remove(&mut self, ctx: &mut SimContext<'_>) {
        self.strike.release(ctx);
    }

    fn write_params(&self, out: &mut Element) {
        self.strike.write_params(out);
    }

    fn read_params(
        &mut self,
        owner: EntityId,
        input: &Element,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), PersistError> {
        let target = input.entity("target")?;
        self.init(owner, &ActionCommand::MockAttack { target }, ctx)?;
        Ok(())
    }
}
