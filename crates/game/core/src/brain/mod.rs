//! Brain domain - per-entity decision loop.
//!
//! # Architecture
//!
//! - [`Brain`]: picks the next command from a decision script, separately for
//!   peace (continuous) and strict-turn (combat) scheduling
//! - [`DecisionScript`]: where commands come from; [`RuleScript`] is the
//!   data-driven implementation content uses
//! - [`ScriptBook`]: scripts by id, reached through the simulation context
//!
//! Peace actions are attached to the owner's [`ActionContainer`] and tracked
//! by handle. The turn action is owned by the brain itself and updated only
//! while it is the owner's turn.

mod script;

pub use script::{
    Condition, DecisionScript, Proposal, Rule, RuleScript, ScriptBook, ScriptId, ScriptView,
};

use crate::action::{
    Action, ActionCommand, ActionContainer, ActionHandle, ChainParams, Destination, WanderDuration,
    WanderParams, save_action,
};
use crate::env::SimContext;
use crate::persist::{Element, PersistError};
use crate::state::{EntityId, Position};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrainState {
    Disabled,
    /// Eligible to decide.
    Idle,
    PeaceActive,
    TurnActive,
}

#[derive(Debug)]
pub struct Brain {
    owner: EntityId,
    disabled: bool,
    script: Option<ScriptId>,
    /// Script to return to after an override.
    backup: Option<ScriptId>,
    /// Controllability taken away by the current override.
    demoted: bool,
    peace_action: Option<ActionHandle>,
    /// The peace action is the post-combat search-and-return chain.
    combat_end: bool,
    turn_action: Option<Box<dyn Action>>,
    /// The script had nothing usable this turn.
    turn_exhausted: bool,
    since_decision: f32,
    combat_start: Option<Position>,
    last_hostile: Option<Position>,
    /// Walk back to the combat start tile once combat ends.
    pub return_after_combat: bool,
    /// Search around the last seen hostile once combat ends.
    pub search_after_combat: bool,
}

impl Brain {
    pub fn new(owner: EntityId) -> Self {
        Self {
            owner,
            disabled: false,
            script: None,
            backup: None,
            demoted: false,
            peace_action: None,
            combat_end: false,
            turn_action: None,
            turn_exhausted: false,
            since_decision: 0.0,
            combat_start: None,
            last_hostile: None,
            return_after_combat: true,
            search_after_combat: true,
        }
    }

    #[must_use]
    pub fn with_script(mut self, script: ScriptId) -> Self {
        self.set_script(script);
        self
    }

    pub fn owner(&self) -> EntityId {
        self.owner
    }

    pub fn state(&self) -> BrainState {
        if self.disabled {
            BrainState::Disabled
        } else if self.turn_action.is_some() {
            BrainState::TurnActive
        } else if self.peace_action.is_some() {
            BrainState::PeaceActive
        } else {
            BrainState::Idle
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }

    pub fn script(&self) -> Option<&ScriptId> {
        self.script.as_ref()
    }

    pub fn peace_action(&self) -> Option<ActionHandle> {
        self.peace_action
    }

    pub fn turn_action(&self) -> Option<&dyn Action> {
        self.turn_action.as_deref()
    }

    /// Permanently assigns a script; the override backup follows it.
    pub fn set_script(&mut self, script: ScriptId) {
        self.script = Some(script.clone());
        self.backup = Some(script);
    }

    // ========================================================================
    // Decisions
    // ========================================================================

    fn propose(&mut self, ctx: &mut SimContext<'_>) -> Option<ActionCommand> {
        let id = self.script.as_ref()?;
        let book = match ctx.env.scripts() {
            Ok(book) => book,
            Err(err) => {
                tracing::warn!("{} cannot think: {}", self.owner, err);
                return None;
            }
        };
        let Some(script) = book.get(id) else {
            tracing::warn!("{} has unknown script {}", self.owner, id);
            return None;
        };
        let mut view = ScriptView::new(self.owner, ctx);
        if let Some(hostile) = view.nearest_visible_hostile() {
            self.last_hostile = Some(hostile.tile());
        }
        script.propose(&mut view)
    }

    /// Peace mode. Asks the script for a new action once the previous one is
    /// gone, at most once per decision interval.
    pub fn update(&mut self, dt: f32, container: &mut ActionContainer, ctx: &mut SimContext<'_>) {
        if self
            .peace_action
            .is_some_and(|handle| !container.contains(handle))
        {
            if self.combat_end {
                self.last_hostile = None;
            }
            self.peace_action = None;
            self.combat_end = false;
        }
        if self.disabled || ctx.combat || self.peace_action.is_some() {
            return;
        }
        let Some(me) = ctx.entity(self.owner) else {
            return;
        };
        if me.asleep || me.controllable || !me.is_alive() {
            return;
        }

        self.since_decision += dt;
        if self.since_decision < ctx.rules().brain.decision_interval_secs {
            return;
        }
        self.since_decision = 0.0;

        let Some(command) = self.propose(ctx) else {
            return;
        };
        match container.add_action(&command, ctx) {
            Ok(handle) => {
                tracing::debug!("{} brain starts {}", self.owner, command.kind());
                self.peace_action = Some(handle);
            }
            Err(err) => tracing::warn!("{} brain proposed an unusable action: {}", self.owner, err),
        }
    }

    /// Strict-turn mode. Runs the turn action, or picks the next one.
    pub fn update_combat_action(&mut self, dt: f32, ctx: &mut SimContext<'_>) {
        if ctx.entity(self.owner).is_none_or(|me| me.asleep) {
            return;
        }
        match self.turn_action.as_mut() {
            Some(action) => {
                action.update(dt, ctx);
                if action.is_finished() {
                    action.on_remove(ctx);
                    self.turn_action = None;
                }
            }
            None => self.start_turn_action(ctx),
        }
    }

    fn start_turn_action(&mut self, ctx: &mut SimContext<'_>) {
        let Some(command) = self.propose(ctx) else {
            self.turn_exhausted = true;
            return;
        };
        let kind = command.kind();
        if ctx.entity(self.owner).is_none_or(|me| !me.can_perform(kind)) {
            tracing::debug!("{} may not {} this turn", self.owner, kind);
            self.turn_exhausted = true;
            return;
        }
        let mut action = match ctx.env.registry.create(kind) {
            Ok(action) => action,
            Err(err) => {
                tracing::warn!("{} brain proposed an unusable action: {}", self.owner, err);
                self.turn_exhausted = true;
                return;
            }
        };
        if let Err(err) = action.init(self.owner, &command, ctx) {
            tracing::warn!("{} brain proposed an unusable action: {}", self.owner, err);
            self.turn_exhausted = true;
            return;
        }
        if action.is_finished() {
            // Refused on the spot (no AP, out of reach): nothing more to do this turn.
            action.on_remove(ctx);
            self.turn_exhausted = true;
            return;
        }
        tracing::debug!("{} takes turn action {}", self.owner, kind);
        self.turn_action = Some(action);
    }

    /// Whether the owner is done for this turn.
    pub fn finished_turn(&mut self, ctx: &mut SimContext<'_>) -> bool {
        let spent = ctx
            .entity(self.owner)
            .is_none_or(|me| me.asleep || me.stats.ap.current <= 0);
        if spent {
            self.remove_turn_action(ctx);
            return true;
        }
        self.turn_action.is_none() && (self.turn_exhausted || self.script.is_none())
    }

    /// Whether the turn action must complete before anything else starts.
    pub fn blocking_turn_action_in_progress(&self, container: &ActionContainer) -> bool {
        self.turn_action
            .as_ref()
            .is_some_and(|a| a.is_blocking_in_combat())
            || container.has_blocking_action()
    }

    fn remove_turn_action(&mut self, ctx: &mut SimContext<'_>) {
        if let Some(mut action) = self.turn_action.take() {
            action.on_remove(ctx);
        }
    }

    // ========================================================================
    // Control
    // ========================================================================

    /// Stops thinking and cancels the in-flight peace action.
    pub fn disable(&mut self, container: &mut ActionContainer, ctx: &mut SimContext<'_>) {
        self.disabled = true;
        if let Some(handle) = self.peace_action.take() {
            container.remove_action(handle, ctx);
        }
        self.combat_end = false;
        tracing::debug!("{} brain disabled", self.owner);
    }

    /// Drops every action the brain is responsible for. Used when the owner
    /// leaves the world.
    pub fn shut_down(&mut self, container: &mut ActionContainer, ctx: &mut SimContext<'_>) {
        self.remove_turn_action(ctx);
        self.disable(container, ctx);
    }

    /// Lifts `disable`. Nothing cancelled is resumed.
    pub fn enable(&mut self) {
        self.disabled = false;
        tracing::debug!("{} brain enabled", self.owner);
    }

    /// Temporarily replaces the script. A controllable owner leaves the
    /// player's group until [`Brain::restore`].
    pub fn override_script(&mut self, script: ScriptId, ctx: &mut SimContext<'_>) {
        self.script = Some(script);
        if let Some(me) = ctx.entity_mut(self.owner)
            && me.controllable
        {
            me.controllable = false;
            self.demoted = true;
        }
    }

    pub fn restore(&mut self, ctx: &mut SimContext<'_>) {
        self.script = self.backup.clone();
        if std::mem::take(&mut self.demoted)
            && let Some(me) = ctx.entity_mut(self.owner)
        {
            me.controllable = true;
        }
    }

    // ========================================================================
    // Combat and turn hooks
    // ========================================================================

    pub fn on_combat_start(&mut self, container: &mut ActionContainer, ctx: &mut SimContext<'_>) {
        self.remove_turn_action(ctx);
        if let Some(handle) = self.peace_action.take() {
            container.remove_action(handle, ctx);
        }
        self.combat_end = false;
        self.combat_start = ctx.entity(self.owner).map(|me| me.tile());
        self.turn_exhausted = false;
    }

    /// Resets per-turn bookkeeping at the start of the owner's turn.
    pub fn begin_turn(&mut self) {
        self.turn_exhausted = false;
    }

    /// Searches around the last seen hostile, then walks back to where
    /// combat started. Runs as the peace action.
    pub fn on_combat_end(&mut self, container: &mut ActionContainer, ctx: &mut SimContext<'_>) {
        self.remove_turn_action(ctx);
        if self.script.is_none() || ctx.entity(self.owner).is_none_or(|me| me.controllable) {
            return;
        }
        let tuning = ctx.rules().brain;
        let mut steps = Vec::new();
        if self.search_after_combat
            && let Some(centre) = self.last_hostile
        {
            steps.push(ActionCommand::Wander(WanderParams {
                centre: Some(centre),
                radius: tuning.search_radius,
                chance_to_move: tuning.search_chance_to_move,
                duration: WanderDuration::Seconds(tuning.search_duration_secs),
                visible_only: false,
            }));
        }
        if self.return_after_combat
            && let Some(home) = self.combat_start
        {
            steps.push(ActionCommand::MoveTo(Destination::tile(home)));
        }
        if steps.is_empty() || self.disabled {
            return;
        }
        let chain = ActionCommand::Chain(ChainParams {
            performer: None,
            steps,
        });
        match container.add_action(&chain, ctx) {
            Ok(handle) => {
                tracing::debug!("{} searches and returns after combat", self.owner);
                self.peace_action = Some(handle);
                self.combat_end = true;
            }
            Err(err) => tracing::warn!("{} cannot return after combat: {}", self.owner, err),
        }
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Brain state. The peace action itself is saved by the container and
    /// referenced here by its position in that save.
    pub fn save(&self, container: &ActionContainer) -> Element {
        let mut out = Element::new("brain");
        if self.disabled {
            out.set("disabled", true);
        }
        if let Some(script) = &self.script {
            out.set("script", script);
        }
        if let Some(backup) = &self.backup {
            out.set("backup", backup);
        }
        if self.demoted {
            out.set("demoted", true);
        }
        out.set("return_after_combat", self.return_after_combat);
        out.set("search_after_combat", self.search_after_combat);
        out.set("since_decision", self.since_decision);
        if let Some(index) = self
            .peace_action
            .and_then(|handle| container.iter().position(|(h, _)| h == handle))
        {
            out.set("peace_action", index);
            if self.combat_end {
                out.set("combat_end", true);
            }
        }
        if let Some(tile) = self.combat_start {
            out.push(Element::new("combat_start").with("x", tile.x).with("y", tile.y));
        }
        if let Some(tile) = self.last_hostile {
            out.push(Element::new("last_hostile").with("x", tile.x).with("y", tile.y));
        }
        if let Some(action) = &self.turn_action {
            let mut turn = Element::new("turn_action");
            turn.push(save_action(action.as_ref()));
            out.push(turn);
        }
        out
    }

    /// Reads state written by [`Brain::save`]. `container` must already hold
    /// the owner's restored actions and `restored` is what
    /// [`ActionContainer::restore`] returned for them.
    pub fn restore_from(
        &mut self,
        input: &Element,
        restored: &[Option<ActionHandle>],
        container: &ActionContainer,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), PersistError> {
        *self = Self::new(self.owner);
        self.disabled = input.flag("disabled")?;
        self.script = input.get("script").map(ScriptId::new);
        self.backup = input.get("backup").map(ScriptId::new);
        self.demoted = input.flag("demoted")?;
        self.return_after_combat = input.parse("return_after_combat")?.unwrap_or(true);
        self.search_after_combat = input.parse("search_after_combat")?.unwrap_or(true);
        self.since_decision = input.parse("since_decision")?.unwrap_or(0.0);
        if let Some(index) = input.parse::<usize>("peace_action")? {
            self.peace_action = restored
                .get(index)
                .copied()
                .flatten()
                .filter(|&handle| container.contains(handle));
            self.combat_end = self.peace_action.is_some() && input.flag("combat_end")?;
        }
        self.combat_start = input.child("combat_start").map(Element::tile).transpose()?;
        self.last_hostile = input.child("last_hostile").map(Element::tile).transpose()?;
        if let Some(saved) = input.child("turn_action").and_then(|t| t.children.first()) {
            let mut action = ctx.env.registry.create_by_tag(&saved.name)?;
            action.read_params(self.owner, saved, ctx)?;
            self.turn_action = Some(action);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionKind;
    use crate::env::{Env, SimEvent};
    use crate::state::{Capabilities, Entity, Faction};
    use crate::testing::Fixture;

    const GUARD: EntityId = EntityId(1);
    const THIEF: EntityId = EntityId(2);

    fn book() -> ScriptBook {
        ScriptBook::new()
            .with_script(
                "guard",
                RuleScript::new(vec![
                    Rule {
                        when: vec![Condition::InCombat, Condition::HostileVisible],
                        then: Proposal::AttackNearestHostile,
                    },
                    Rule {
                        when: vec![Condition::Not(Box::new(Condition::InCombat))],
                        then: Proposal::Wait(0.5),
                    },
                ]),
            )
            .with_script(
                "puppet",
                RuleScript::new(vec![Rule {
                    when: vec![],
                    then: Proposal::Nothing,
                }]),
            )
    }

    /// Fixture plus the script book, which the shared fixture does not carry.
    struct Harness {
        fx: Fixture,
        book: ScriptBook,
        container: ActionContainer,
        brain: Brain,
    }

    impl Harness {
        fn new() -> Self {
            let fx = Fixture::corridor()
                .with_entity(
                    Entity::new(GUARD, "guard", Capabilities::NPC)
                        .at(Position::new(4, 1))
                        .with_faction(Faction::Hostile),
                )
                .with_entity(
                    Entity::new(THIEF, "thief", Capabilities::PC)
                        .at(Position::new(1, 1))
                        .with_faction(Faction::Player),
                );
            Self {
                fx,
                book: book(),
                container: ActionContainer::new(GUARD),
                brain: Brain::new(GUARD).with_script(ScriptId::new("guard")),
            }
        }

        fn with_ctx<R>(
            &mut self,
            combat: bool,
            f: impl FnOnce(&mut Brain, &mut ActionContainer, &mut SimContext<'_>) -> R,
        ) -> R {
            let fx = &mut self.fx;
            let env = Env::new(&fx.rules, &fx.map, &fx.rng, &fx.registry)
                .with_items(&fx.catalog)
                .with_perks(&fx.catalog)
                .with_scripts(&self.book);
            let mut ctx = SimContext::new(&mut fx.world, env, &mut fx.dice, &mut fx.outbox, combat);
            f(&mut self.brain, &mut self.container, &mut ctx)
        }

        fn peace_frames(&mut self, frames: usize) {
            for _ in 0..frames {
                self.with_ctx(false, |brain, container, ctx| {
                    brain.update(0.05, container, ctx);
                    container.update(0.05, ctx);
                });
            }
        }
    }

    #[test]
    fn peace_decisions_wait_for_the_interval_and_the_previous_action() {
        let mut h = Harness::new();
        h.peace_frames(9);
        assert_eq!(h.brain.state(), BrainState::Idle);

        h.peace_frames(1);
        assert_eq!(h.brain.state(), BrainState::PeaceActive);
        let handle = h.brain.peace_action().expect("peace action");
        assert_eq!(h.container.get(handle).map(|a| a.kind()), Some(ActionKind::Wait));

        // The wait runs its half second before the brain may decide again.
        h.peace_frames(11);
        assert!(!h.container.contains(handle));
    }

    #[test]
    fn disable_cancels_the_peace_action() {
        let mut h = Harness::new();
        h.peace_frames(10);
        let handle = h.brain.peace_action().expect("peace action");

        h.with_ctx(false, |brain, container, ctx| brain.disable(container, ctx));
        assert!(!h.container.contains(handle));
        assert_eq!(h.brain.state(), BrainState::Disabled);

        h.peace_frames(20);
        assert!(h.container.is_empty());
        h.brain.enable();
        assert_eq!(h.brain.state(), BrainState::Idle);
    }

    #[test]
    fn combat_turn_attacks_then_reports_finished() {
        let mut h = Harness::new();
        h.with_ctx(true, |brain, container, ctx| {
            brain.on_combat_start(container, ctx);
            brain.begin_turn();
            assert!(!brain.finished_turn(ctx));
            brain.update_combat_action(0.05, ctx);
        });
        assert_eq!(h.brain.state(), BrainState::TurnActive);

        let mut frames = 0;
        while !h.with_ctx(true, |brain, _, ctx| brain.finished_turn(ctx)) {
            h.with_ctx(true, |brain, _, ctx| brain.update_combat_action(0.05, ctx));
            h.fx.tick_world(0.05);
            frames += 1;
            assert!(frames < 2000, "turn never ended");
        }
        assert!(h.fx.events().iter().any(|e| matches!(
            e,
            SimEvent::AttackResolved { attacker: GUARD, .. }
        )));
    }

    #[test]
    fn asleep_entities_end_their_turn_at_once() {
        let mut h = Harness::new();
        h.fx.entity_mut(GUARD).asleep = true;
        assert!(h.with_ctx(true, |brain, _, ctx| brain.finished_turn(ctx)));
        h.peace_frames(20);
        assert_eq!(h.brain.state(), BrainState::Idle);
    }

    #[test]
    fn combat_end_searches_then_returns_home() {
        let mut h = Harness::new();
        h.with_ctx(true, |brain, container, ctx| {
            brain.on_combat_start(container, ctx);
            brain.update_combat_action(0.05, ctx);
        });
        h.fx.entity_mut(GUARD).position = Position::new(6, 1).to_world();
        h.with_ctx(false, |brain, container, ctx| brain.on_combat_end(container, ctx));

        let handle = h.brain.peace_action().expect("combat end chain");
        assert_eq!(h.container.get(handle).map(|a| a.kind()), Some(ActionKind::Chain));
        assert_eq!(h.brain.state(), BrainState::PeaceActive);

        let saved = h.brain.save(&h.container);
        assert_eq!(saved.get("combat_end"), Some("true"));
        assert_eq!(
            saved.child("combat_start").map(|c| c.tile()),
            Some(Ok(Position::new(4, 1)))
        );
        assert_eq!(
            saved.child("last_hostile").map(|c| c.tile()),
            Some(Ok(Position::new(1, 1)))
        );
    }

    #[test]
    fn override_demotes_and_restore_returns_control() {
        let mut h = Harness::new();
        h.fx.entity_mut(GUARD).controllable = true;
        h.with_ctx(false, |brain, _, ctx| {
            brain.override_script(ScriptId::new("puppet"), ctx)
        });
        assert_eq!(h.brain.script(), Some(&ScriptId::new("puppet")));
        assert!(!h.fx.entity(GUARD).controllable);

        h.with_ctx(false, |brain, _, ctx| brain.restore(ctx));
        assert_eq!(h.brain.script(), Some(&ScriptId::new("guard")));
        assert!(h.fx.entity(GUARD).controllable);
    }

    #[test]
    fn brain_state_round_trips_through_a_document() {
        let mut h = Harness::new();
        h.peace_frames(10);
        h.brain.return_after_combat = false;
        let actions = h.container.save();
        let saved = h.brain.save(&h.container);

        let mut container = ActionContainer::new(GUARD);
        let mut brain = Brain::new(GUARD);
        h.with_ctx(false, |_, _, ctx| {
            let restored = container.restore(&actions, ctx).expect("actions");
            brain.restore_from(&saved, &restored, &container, ctx).expect("brain");
        });
        assert_eq!(brain.script(), Some(&ScriptId::new("guard")));
        assert!(!brain.return_after_combat);
        assert_eq!(brain.peace_action(), container.iter().next().map(|(h, _)| h));
    }

    #[test]
    fn peace_action_survives_skipped_saved_actions() {
        let mut h = Harness::new();
        h.peace_frames(10);
        let mut actions = h.container.save();
        let peace = actions.children.first().cloned().expect("peace action saved");
        actions.children = vec![Element::new("teleport"), peace];
        let saved = h.brain.save(&h.container).with("peace_action", 1);

        let mut container = ActionContainer::new(GUARD);
        let mut brain = Brain::new(GUARD);
        h.with_ctx(false, |_, _, ctx| {
            let restored = container.restore(&actions, ctx).expect("actions");
            assert_eq!(restored.len(), 2);
            assert_eq!(restored[0], None);
            brain.restore_from(&saved, &restored, &container, ctx).expect("brain");
        });
        assert_eq!(container.len(), 1);
        assert_eq!(brain.peace_action(), container.iter().next().map(|(h, _)| h));
    }
}
