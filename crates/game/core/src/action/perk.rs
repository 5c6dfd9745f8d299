//! Perk and spell use.
//!
//! Two paths share one action:
//!
//! - attack perks strike every selected target through an embedded
//!   [`Attack`], applying the perk's effects to each target that was hit;
//! - every other perk walks until the target tile is in sight, faces it,
//!   plays its animation and applies its effects at the impact frame.
//!
//! Resource costs, the cooldown and the stealth check are applied once, when
//! the perk resolves. Costs are only paid during strict combat.

use std::collections::VecDeque;

use crate::combat::{apply_effects, stealth_check};
use crate::env::{PerkDefinition, SimContext, SimEvent, Targeting};
use crate::persist::{Element, PersistError};
use crate::state::{AnimationState, EntityId, PerkId, Position};

use super::{
    Action, ActionCommand, ActionError, ActionKind, ActionSlot, ActionTarget, Attack, Binding,
    Destination, MoveTo, PerkParams, StrikeOptions, TargetRef, check_owner, mismatch,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Phase {
    #[default]
    Approach,
    Casting,
    Striking,
}

#[derive(Debug, Default)]
pub struct UsePerk {
    spell: bool,
    owner: EntityId,
    params: Option<PerkParams>,
    definition: Option<PerkDefinition>,
    target: Option<TargetRef>,
    target_tile: Position,
    phase: Phase,
    mover: MoveTo,
    strike: Attack,
    striking: Option<EntityId>,
    queue: VecDeque<EntityId>,
    effects_applied: bool,
    finished: bool,
}

impl UsePerk {
    pub fn perk() -> Self {
        Self::default()
    }

    pub fn spell() -> Self {
        Self {
            spell: true,
            ..Self::default()
        }
    }

    pub fn perk_id(&self) -> Option<PerkId> {
        self.params.map(|p| p.perk)
    }

    fn this_kind(&self) -> ActionKind {
        if self.spell {
            ActionKind::CastSpell
        } else {
            ActionKind::UsePerk
        }
    }

    fn is_attack(&self) -> bool {
        self.definition.as_ref().is_some_and(|d| d.attack)
    }

    fn refuse(&mut self, ctx: &mut SimContext<'_>, reason: &'static str) {
        ctx.refuse(self.owner, self.this_kind(), reason);
        self.finished = true;
    }

    /// Passive, unknown to the owner, cooling down or unaffordable.
    fn unusable_reason(&self, ctx: &SimContext<'_>) -> Option<&'static str> {
        let (Some(definition), Some(params)) = (&self.definition, self.params) else {
            return Some("no perk");
        };
        let Some(me) = ctx.entity(self.owner) else {
            return Some("owner vanished");
        };
        if !definition.activated {
            return Some("perk is passive");
        }
        if !me.perks.contains(&definition.id) {
            return Some("perk not known");
        }
        if !me.is_perk_ready(definition.id) {
            return Some("perk is cooling down");
        }
        if ctx.combat {
            let costs = definition.costs;
            let ap = if params.free { 0 } else { costs.ap };
            let stats = &me.stats;
            if stats.ap.current < ap
                || stats.hp.current <= costs.hp
                || stats.sp.current < costs.sp
                || stats.mp.current < costs.mp
            {
                return Some("not enough resources");
            }
        }
        None
    }

    fn arrival(&self) -> impl Fn(&SimContext<'_>) -> bool + use<> {
        let (owner, tile) = (self.owner, self.target_tile);
        move |ctx: &SimContext<'_>| {
            ctx.entity(owner)
                .is_none_or(|me| me.tile().is_next_to_or_on(tile) || ctx.can_see(owner, tile))
        }
    }

    fn bind(&mut self, tile: Position, ctx: &mut SimContext<'_>) {
        self.target_tile = tile;
        if self.is_attack() {
            self.queue = self.select_targets(ctx).into();
            self.phase = Phase::Striking;
            if self.queue.is_empty() {
                self.refuse(ctx, "no target in range");
            } else {
                self.next_strike(ctx);
            }
        } else {
            let arrived = self.arrival();
            self.mover
                .begin(self.owner, &Destination::tile(tile), ctx, &arrived);
        }
    }

    fn select_targets(&self, ctx: &SimContext<'_>) -> Vec<EntityId> {
        let targeting = self
            .definition
            .as_ref()
            .map_or(Targeting::Single, |d| d.targeting);
        match targeting {
            Targeting::Single => self
                .target
                .map(|t| t.id())
                .or_else(|| ctx.world.entity_at(self.target_tile).map(|e| e.id))
                .filter(|id| *id != self.owner)
                .into_iter()
                .collect(),
            Targeting::Area { radius } => ctx
                .world
                .entities()
                .filter(|e| e.id != self.owner && e.is_alive())
                .filter(|e| e.tile().distance(self.target_tile) <= radius as f32)
                .map(|e| e.id)
                .collect(),
        }
    }

    fn next_strike(&mut self, ctx: &mut SimContext<'_>) {
        let Some(target) = self.queue.pop_front() else {
            self.striking = None;
            self.complete(ctx);
            return;
        };
        let modifiers = self
            .definition
            .as_ref()
            .map(|d| d.modifiers)
            .unwrap_or_default();
        let options = StrikeOptions {
            cost_override: Some(0),
            modifiers,
            ..StrikeOptions::default()
        };
        self.striking = Some(target);
        self.strike.begin(self.owner, target, options, ctx);
    }

    fn advance_strikes(&mut self, dt: f32, ctx: &mut SimContext<'_>) {
        self.strike.advance(dt, ctx);
        if !self.strike.is_finished() {
            return;
        }
        let hit = self.strike.hits() > 0;
        self.strike.release(ctx);
        if let (true, Some(target)) = (hit, self.striking) {
            let effects = self
                .definition
                .as_ref()
                .map(|d| d.effects.clone())
                .unwrap_or_default();
            apply_effects(ctx, self.owner, target, &effects);
        }
        self.next_strike(ctx);
    }

    fn start_casting(&mut self, ctx: &mut SimContext<'_>) {
        if !ctx.can_see(self.owner, self.target_tile) {
            let here = ctx.entity(self.owner).map(|e| e.tile());
            if here.is_none_or(|t| !t.is_next_to_or_on(self.target_tile)) {
                self.refuse(ctx, "cannot see the target");
                return;
            }
        }
        let state = self
            .definition
            .as_ref()
            .and_then(|d| d.animation)
            .unwrap_or(AnimationState::Cast);
        let isometric = ctx.map().is_isometric();
        let timings = ctx.rules().animation;
        let tile = self.target_tile.to_world();
        if let Some(me) = ctx.entity_mut(self.owner) {
            me.face(isometric, tile);
            me.animation.restart(state, &timings);
        }
        self.phase = Phase::Casting;
        tracing::debug!("{} starts {} at {}", self.owner, self.this_kind().as_ref(), tile.tile());
    }

    fn advance_casting(&mut self, ctx: &mut SimContext<'_>) {
        let animation = ctx.entity(self.owner).map(|e| e.animation);
        if !self.effects_applied && animation.is_none_or(|a| a.has_impact_passed()) {
            self.effects_applied = true;
            let effects = self
                .definition
                .as_ref()
                .map(|d| d.effects.clone())
                .unwrap_or_default();
            for target in self.select_targets(ctx) {
                apply_effects(ctx, self.owner, target, &effects);
            }
        }
        if self.effects_applied && animation.is_none_or(|a| a.is_finished()) {
            let timings = ctx.rules().animation;
            if let Some(me) = ctx.entity_mut(self.owner).filter(|e| e.is_alive()) {
                me.set_animation(AnimationState::Idle, &timings);
            }
            self.complete(ctx);
        }
    }

    /// Pays costs, starts the cooldown and reports the use.
    fn complete(&mut self, ctx: &mut SimContext<'_>) {
        self.finished = true;
        let (Some(definition), Some(params)) = (&self.definition, self.params) else {
            return;
        };
        let (perk, costs, cooldown) = (definition.id, definition.costs, definition.cooldown_secs);
        let combat = ctx.combat;
        if let Some(me) = ctx.entity_mut(self.owner) {
            if combat {
                if !params.free {
                    me.stats.ap.add(-costs.ap);
                }
                me.stats.hp.add(-costs.hp);
                me.stats.sp.add(-costs.sp);
                me.stats.mp.add(-costs.mp);
            }
            if cooldown > 0.0 {
                me.perk_cooldowns.insert(perk, cooldown);
            }
        }
        tracing::info!("{} used perk {} at {}", self.owner, perk.0, self.target_tile);
        ctx.emit(SimEvent::PerkUsed {
            actor: self.owner,
            perk,
            at: self.target_tile,
        });
        let stealth = ctx.rules().stealth;
        let modifier = if self.spell {
            stealth.cast_spell
        } else {
            stealth.use_perk
        };
        stealth_check(ctx, self.owner, modifier);
    }
}

impl Action for UsePerk {
    fn kind(&self) -> ActionKind {
        self.this_kind()
    }

    fn init(
        &mut self,
        owner: EntityId,
        command: &ActionCommand,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), ActionError> {
        let kind = self.this_kind();
        let params = match (command, self.spell) {
            (ActionCommand::CastSpell(params), true) | (ActionCommand::UsePerk(params), false) => {
                *params
            }
            _ => return Err(mismatch(kind, command)),
        };
        check_owner(kind, owner, ctx)?;
        let perks = ctx.env.perks()?;
        let definition = if self.spell {
            perks.spell(params.perk)
        } else {
            perks.perk(params.perk)
        };
        let definition = definition.ok_or(ActionError::UnknownPerk(params.perk))?.clone();

        *self = Self {
            spell: self.spell,
            owner,
            params: Some(params),
            definition: Some(definition),
            ..Self::default()
        };

        if let Some(reason) = self.unusable_reason(ctx) {
            self.refuse(ctx, reason);
            return Ok(());
        }
        match params.target {
            ActionTarget::Tile(tile) => self.bind(tile, ctx),
            ActionTarget::Entity(id) => {
                self.target = Some(TargetRef::new(id));
                let binding = self.target.as_mut().map(|t| t.resolve(&*ctx.world));
                if let Some(Binding::Fresh(tile)) = binding {
                    self.bind(tile, ctx);
                }
            }
        }
        Ok(())
    }

    fn update(&mut self, dt: f32, ctx: &mut SimContext<'_>) {
        if self.finished || self.is_paused() {
            return;
        }
        if self.target.is_some_and(|t| !t.is_bound()) {
            match self.target.as_mut().map(|t| t.resolve(&*ctx.world)) {
                Some(Binding::Fresh(tile)) => self.bind(tile, ctx),
                _ => {
                    self.refuse(ctx, "target vanished");
                    return;
                }
            }
            if self.finished {
                return;
            }
        }

        match self.phase {
            Phase::Striking => self.advance_strikes(dt, ctx),
            Phase::Approach => {
                let arrived = self.arrival();
                self.mover.step(dt, ctx, &arrived);
                if self.mover.is_finished() {
                    self.start_casting(ctx);
                }
            }
            Phase::Casting => self.advance_casting(ctx),
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn is_paused(&self) -> bool {
        match self.phase {
            Phase::Striking => Action::is_paused(&self.strike),
            _ => self.mover.is_paused(),
        }
    }

    fn pause(&mut self) {
        match self.phase {
            Phase::Striking => self.strike.pause(),
            _ => self.mover.request_pause(),
        }
    }

    fn resume(&mut self, ctx: &mut SimContext<'_>) {
        match self.phase {
            Phase::Striking => self.strike.resume(ctx),
            _ => {
                let arrived = self.arrival();
                self.mover.resume_with(ctx, &arrived);
            }
        }
    }

    fn is_blocking_in_combat(&self) -> bool {
        !self.finished
    }

    fn slot(&self) -> ActionSlot {
        ActionSlot::Exclusive(ActionKind::MoveTo)
    }

    fn on_remove(&mut self, ctx: &mut SimContext<'_>) {
        self.mover.stop(ctx);
        if self.striking.take().is_some() {
            self.strike.release(ctx);
        }
        self.queue.clear();
        self.finished = true;
    }

    fn write_params(&self, out: &mut Element) {
        let Some(params) = self.params else {
            return;
        };
        out.set("perk", params.perk.0);
        match params.target {
            ActionTarget::Entity(id) => out.set_entity("target", id),
            ActionTarget::Tile(tile) => out.set_tile(tile),
        }
        if params.free {
            out.set("free", true);
        }
    }

    fn read_params(
        &mut self,
        owner: EntityId,
        input: &Element,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), PersistError> {
        let perk = PerkId(input.require("perk")?);
        let target = match input.parse::<u32>("target")? {
            Some(id) => ActionTarget::Entity(EntityId(id)),
            None => ActionTarget::Tile(input.tile()?),
        };
        let params = PerkParams {
            perk,
            target,
            free: input.flag("free")?,
        };
        let command = if self.spell {
            ActionCommand::CastSpell(params)
        } else {
            ActionCommand::UsePerk(params)
        };
        self.init(owner, &command, ctx)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{Catalog, Effect, ResourceCosts};
    use crate::state::{Capabilities, CombatModifiers, Entity, Faction, Weapon, Skill};
    use crate::testing::Fixture;

    const MAGE: EntityId = EntityId(1);
    const RAT: EntityId = EntityId(2);
    const BOLT: PerkId = PerkId(10);
    const CLEAVE: PerkId = PerkId(11);
    const FOCUS: PerkId = PerkId(12);

    fn definition(id: PerkId, attack: bool) -> PerkDefinition {
        PerkDefinition {
            id,
            name: format!("perk {}", id.0),
            activated: true,
            spell: !attack,
            attack,
            costs: ResourceCosts {
                ap: 3,
                mp: 2,
                ..ResourceCosts::default()
            },
            cooldown_secs: 5.0,
            targeting: Targeting::Single,
            animation: None,
            modifiers: CombatModifiers::default(),
            effects: vec![Effect::Damage { min: 2, max: 2 }],
        }
    }

    fn fixture() -> Fixture {
        let mut mage = Entity::new(MAGE, "mage", Capabilities::PC)
            .at(Position::new(1, 1))
            .with_faction(Faction::Player);
        mage.perks.extend([BOLT, CLEAVE, FOCUS]);
        mage.stats.mp.maximum = 10;
        mage.stats.mp.current = 10;
        mage.equipment.right = Some(Weapon::melee("axe", Skill::Axe, 3, 3));
        let mut fx = Fixture::corridor().with_entity(mage).with_entity(
            Entity::new(RAT, "rat", Capabilities::NPC)
                .at(Position::new(4, 1))
                .with_faction(Faction::Hostile),
        );
        fx.catalog = Catalog::new()
            .with_perk(definition(BOLT, false))
            .with_perk(definition(CLEAVE, true))
            .with_perk(PerkDefinition {
                activated: false,
                ..definition(FOCUS, false)
            });
        fx
    }

    fn command(perk: PerkId, spell: bool) -> ActionCommand {
        let params = PerkParams {
            perk,
            target: ActionTarget::Entity(RAT),
            free: false,
        };
        if spell {
            ActionCommand::CastSpell(params)
        } else {
            ActionCommand::UsePerk(params)
        }
    }

    #[test]
    fn spell_in_sight_is_cast_without_walking() {
        let mut fx = fixture();
        let mut cast = UsePerk::spell();
        cast.init(MAGE, &command(BOLT, true), &mut fx.ctx(true))
            .expect("init");
        fx.run(&mut cast, true);

        let mage = fx.entity(MAGE);
        assert_eq!(mage.tile(), Position::new(1, 1));
        assert_eq!(mage.stats.ap.current, 7);
        assert_eq!(mage.stats.mp.current, 8);
        assert!(!mage.is_perk_ready(BOLT));
        assert_eq!(fx.entity(RAT).stats.hp.current, 8);
        assert!(fx.events().contains(&SimEvent::PerkUsed {
            actor: MAGE,
            perk: BOLT,
            at: Position::new(4, 1)
        }));
    }

    #[test]
    fn attack_perk_strikes_then_applies_effects() {
        let mut fx = fixture();
        let mut cleave = UsePerk::perk();
        cleave
            .init(MAGE, &command(CLEAVE, false), &mut fx.ctx(false))
            .expect("init");
        fx.run(&mut cleave, false);

        // Axe 3 + effect 2. No AP outside combat.
        assert_eq!(fx.entity(RAT).stats.hp.current, 5);
        assert_eq!(fx.entity(MAGE).tile(), Position::new(3, 1));
        assert_eq!(fx.entity(MAGE).stats.ap.current, 10);
    }

    #[test]
    fn passive_or_cooling_perks_finish_without_cost() {
        let mut fx = fixture();
        let mut focus = UsePerk::perk();
        focus
            .init(MAGE, &command(FOCUS, false), &mut fx.ctx(true))
            .expect("init");
        assert!(focus.is_finished());

        fx.entity_mut(MAGE).perk_cooldowns.insert(BOLT, 2.0);
        let mut bolt = UsePerk::spell();
        bolt.init(MAGE, &command(BOLT, true), &mut fx.ctx(true))
            .expect("init");
        assert!(bolt.is_finished());
        assert_eq!(fx.entity(MAGE).stats.ap.current, 10);
        assert!(matches!(
            fx.events().last(),
            Some(SimEvent::Refused { reason: "perk is cooling down", .. })
        ));
    }

    #[test]
    fn unknown_perks_and_wrong_verbs_are_configuration_errors() {
        let mut fx = fixture();
        let err = UsePerk::perk()
            .init(MAGE, &command(PerkId(99), false), &mut fx.ctx(false))
            .unwrap_err();
        assert_eq!(err, ActionError::UnknownPerk(PerkId(99)));

        // A perk that is not a spell cannot be cast.
        let err = UsePerk::spell()
            .init(MAGE, &command(CLEAVE, true), &mut fx.ctx(false))
            .unwrap_err();
        assert_eq!(err, ActionError::UnknownPerk(CLEAVE));

        let err = UsePerk::spell()
            .init(MAGE, &command(BOLT, false), &mut fx.ctx(false))
            .unwrap_err();
        assert!(matches!(err, ActionError::ParameterMismatch { .. }));
    }
}
