//! Frame driver that owns the world and every entity's action machinery.
//!
//! # Architecture
//!
//! [`Simulation`] is the single owner of mutable state. Each frame it builds
//! a [`SimContext`] from its own fields and hands it to brains and action
//! containers one entity at a time, in id order. Cross-entity effects are
//! queued as [`Request`]s and applied after the issuing entity's step, so no
//! action ever holds two containers at once.
//!
//! Two scheduling modes share the same state:
//!
//! - **Peace** ([`Simulation::update`]): every brain and container runs
//!   every frame.
//! - **Strict turn** ([`Simulation::update_turn`]): only the entity whose
//!   turn it is acts. The external scheduler drives the turn order through
//!   [`Simulation::start_combat`], [`Simulation::begin_turn`],
//!   [`Simulation::finished_turn`] and [`Simulation::end_combat`].

use std::collections::BTreeMap;

use crate::action::{ActionCommand, ActionContainer, ActionError, ActionHandle, ActionRegistry};
use crate::brain::{Brain, ScriptBook, ScriptId};
use crate::config::GameRules;
use crate::env::{
    Catalog, Dice, Env, MapOracle, Outbox, PcgRng, Request, RngOracle, SimContext, SimEvent,
};
use crate::persist::{Element, PersistError};
use crate::state::{Entity, EntityId, World};

/// Requests may trigger further requests (a resumed chain releasing its
/// performer). Rounds beyond this are dropped.
const MAX_REQUEST_ROUNDS: usize = 8;

/// Per-entity action machinery.
#[derive(Debug)]
struct Actor {
    container: ActionContainer,
    brain: Brain,
}

impl Actor {
    fn new(id: EntityId) -> Self {
        Self {
            container: ActionContainer::new(id),
            brain: Brain::new(id),
        }
    }
}

/// Read-only collaborators, grouped so a context can borrow them while the
/// actors are borrowed mutably.
struct Collaborators {
    rules: GameRules,
    map: Box<dyn MapOracle>,
    rng: Box<dyn RngOracle>,
    registry: ActionRegistry,
    catalog: Catalog,
    scripts: ScriptBook,
}

impl Collaborators {
    fn env(&self) -> Env<'_> {
        Env::new(&self.rules, self.map.as_ref(), self.rng.as_ref(), &self.registry)
            .with_items(&self.catalog)
            .with_perks(&self.catalog)
            .with_scripts(&self.scripts)
    }
}

pub struct Simulation {
    world: World,
    actors: BTreeMap<EntityId, Actor>,
    collaborators: Collaborators,
    dice: Dice,
    outbox: Outbox,
    combat: bool,
    turn: Option<EntityId>,
}

impl Simulation {
    pub fn new(rules: GameRules, map: impl MapOracle + 'static, seed: u64) -> Self {
        Self {
            world: World::new(),
            actors: BTreeMap::new(),
            collaborators: Collaborators {
                rules,
                map: Box::new(map),
                rng: Box::new(PcgRng),
                registry: ActionRegistry::with_builtins(),
                catalog: Catalog::new(),
                scripts: ScriptBook::new(),
            },
            dice: Dice::new(seed),
            outbox: Outbox::default(),
            combat: false,
            turn: None,
        }
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.collaborators.catalog = catalog;
        self
    }

    #[must_use]
    pub fn with_scripts(mut self, scripts: ScriptBook) -> Self {
        self.collaborators.scripts = scripts;
        self
    }

    #[must_use]
    pub fn with_rng(mut self, rng: impl RngOracle + 'static) -> Self {
        self.collaborators.rng = Box::new(rng);
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: ActionRegistry) -> Self {
        self.collaborators.registry = registry;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn map(&self) -> &dyn MapOracle {
        self.collaborators.map.as_ref()
    }

    pub fn rules(&self) -> &GameRules {
        &self.collaborators.rules
    }

    pub fn dice(&self) -> Dice {
        self.dice
    }

    pub fn is_in_combat(&self) -> bool {
        self.combat
    }

    /// Entity whose strict turn is running.
    pub fn current_turn(&self) -> Option<EntityId> {
        self.turn
    }

    pub fn container(&self, id: EntityId) -> Option<&ActionContainer> {
        self.actors.get(&id).map(|a| &a.container)
    }

    pub fn brain(&self, id: EntityId) -> Option<&Brain> {
        self.actors.get(&id).map(|a| &a.brain)
    }

    pub fn brain_mut(&mut self, id: EntityId) -> Option<&mut Brain> {
        self.actors.get_mut(&id).map(|a| &mut a.brain)
    }

    pub fn events(&self) -> &[SimEvent] {
        &self.outbox.events
    }

    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.outbox.drain_events()
    }

    /// Context over the simulation's own fields, plus the actors it does not
    /// cover.
    fn split(&mut self) -> (SimContext<'_>, &mut BTreeMap<EntityId, Actor>) {
        let ctx = SimContext::new(
            &mut self.world,
            self.collaborators.env(),
            &mut self.dice,
            &mut self.outbox,
            self.combat,
        );
        (ctx, &mut self.actors)
    }

    // ========================================================================
    // Population
    // ========================================================================

    /// Adds an entity with an empty container and a brain running `script`.
    pub fn spawn(&mut self, entity: Entity, script: Option<ScriptId>) -> EntityId {
        let id = entity.id;
        let mut actor = Actor::new(id);
        if let Some(script) = script {
            actor.brain.set_script(script);
        }
        tracing::debug!("{} ({}) joins the world", id, entity.name);
        self.world.insert_entity(entity);
        self.actors.insert(id, actor);
        id
    }

    /// Removes an entity together with its actions and brain. Actions are
    /// removed first so hand-offs release their performers.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        let (mut ctx, actors) = self.split();
        if let Some(mut actor) = actors.remove(&id) {
            actor.brain.shut_down(&mut actor.container, &mut ctx);
            actor.container.remove_all(&mut ctx);
        }
        let removed = self.world.remove_entity(id);
        if self.turn == Some(id) {
            self.turn = None;
        }
        self.apply_requests();
        removed
    }

    /// Attaches a command issued from outside the brains (player input).
    pub fn add_action(
        &mut self,
        id: EntityId,
        command: &ActionCommand,
    ) -> Result<ActionHandle, ActionError> {
        let (mut ctx, actors) = self.split();
        let actor = actors.get_mut(&id).ok_or(ActionError::UnknownEntity(id))?;
        let handle = actor.container.add_action(command, &mut ctx)?;
        self.apply_requests();
        Ok(handle)
    }

    pub fn remove_action(&mut self, id: EntityId, handle: ActionHandle) -> bool {
        let (mut ctx, actors) = self.split();
        let removed = actors
            .get_mut(&id)
            .is_some_and(|actor| actor.container.remove_action(handle, &mut ctx));
        self.apply_requests();
        removed
    }

    // ========================================================================
    // Frames
    // ========================================================================

    /// One peace-mode frame: brains, then containers, then the world clock.
    pub fn update(&mut self, dt: f32) {
        if self.combat {
            tracing::warn!("peace update requested during combat");
            return;
        }
        let ids: Vec<EntityId> = self.actors.keys().copied().collect();

        for &id in &ids {
            let (mut ctx, actors) = self.split();
            if let Some(Actor { container, brain }) = actors.get_mut(&id) {
                brain.update(dt, container, &mut ctx);
            }
        }
        self.apply_requests();

        for &id in &ids {
            let (mut ctx, actors) = self.split();
            if let Some(actor) = actors.get_mut(&id) {
                actor.container.update(dt, &mut ctx);
            }
            self.apply_requests();
        }

        self.tick_world(dt);
    }

    /// One strict-turn frame for the entity whose turn it is.
    pub fn update_turn(&mut self, dt: f32) {
        let Some(id) = self.turn.filter(|_| self.combat) else {
            tracing::warn!("turn update requested outside a turn");
            return;
        };
        let (mut ctx, actors) = self.split();
        if let Some(actor) = actors.get_mut(&id) {
            actor.brain.update_combat_action(dt, &mut ctx);
            actor.container.update(dt, &mut ctx);
        }
        self.apply_requests();
        self.tick_world(dt);
    }

    /// Animations, projectiles and perk cooldowns.
    fn tick_world(&mut self, dt: f32) {
        for entity in self.world.entities_mut() {
            entity.animation.advance(dt);
            for left in entity.perk_cooldowns.values_mut() {
                *left -= dt;
            }
            entity.perk_cooldowns.retain(|_, left| *left > 0.0);
        }
        let speed = self.collaborators.rules.projectile.speed;
        self.world.projectiles.advance(dt, speed);
    }

    fn apply_requests(&mut self) {
        for _ in 0..MAX_REQUEST_ROUNDS {
            let requests = std::mem::take(&mut self.outbox.requests);
            if requests.is_empty() {
                return;
            }
            for request in requests {
                self.apply_request(request);
            }
        }
        let dropped = std::mem::take(&mut self.outbox.requests);
        tracing::warn!("dropping {} cascading requests", dropped.len());
    }

    fn apply_request(&mut self, request: Request) {
        tracing::trace!("applying {:?}", request);
        let (mut ctx, actors) = self.split();
        match request {
            Request::PauseActions(id) => {
                if let Some(actor) = actors.get_mut(&id) {
                    actor.container.pause_all();
                }
            }
            Request::ResumeActions(id) => {
                if let Some(actor) = actors.get_mut(&id) {
                    actor.container.resume_all(&mut ctx);
                }
            }
            Request::SetBrainEnabled { entity, enabled } => {
                if let Some(Actor { container, brain }) = actors.get_mut(&entity) {
                    if enabled {
                        brain.enable();
                    } else {
                        brain.disable(container, &mut ctx);
                    }
                }
            }
        }
    }

    // ========================================================================
    // Turn scheduler hooks
    // ========================================================================

    pub fn start_combat(&mut self) {
        if self.combat {
            return;
        }
        self.combat = true;
        self.turn = None;
        tracing::info!("combat begins");
        let (mut ctx, actors) = self.split();
        ctx.emit(SimEvent::Log {
            text: "Combat begins".into(),
        });
        for Actor { container, brain } in actors.values_mut() {
            brain.on_combat_start(container, &mut ctx);
        }
        self.apply_requests();
    }

    pub fn end_combat(&mut self) {
        if !self.combat {
            return;
        }
        self.combat = false;
        self.turn = None;
        tracing::info!("combat ends");
        let (mut ctx, actors) = self.split();
        ctx.emit(SimEvent::Log {
            text: "Combat ends".into(),
        });
        for Actor { container, brain } in actors.values_mut() {
            brain.on_combat_end(container, &mut ctx);
        }
        self.apply_requests();
    }

    /// Hands the turn to `id` and refills its AP.
    pub fn begin_turn(&mut self, id: EntityId) {
        self.turn = Some(id);
        if let Some(entity) = self.world.entity_mut(id) {
            entity.stats.ap.refill();
            tracing::debug!("{} begins its turn with {} AP", id, entity.stats.ap.current);
        }
        if let Some(actor) = self.actors.get_mut(&id) {
            actor.brain.begin_turn();
        }
    }

    /// Whether the current turn may pass. Player-controlled entities keep the
    /// turn until their AP is spent; the scheduler may also end it on request.
    pub fn finished_turn(&mut self) -> bool {
        let Some(id) = self.turn else {
            return true;
        };
        let (mut ctx, actors) = self.split();
        let Some(Actor { container, brain }) = actors.get_mut(&id) else {
            return true;
        };
        if container.has_blocking_action() {
            return false;
        }
        let Some(me) = ctx.entity(id) else {
            return true;
        };
        if me.controllable {
            return me.stats.ap.current <= 0;
        }
        brain.finished_turn(&mut ctx)
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Live action and brain state. World data is persisted separately.
    pub fn save(&self) -> Element {
        let mut out = Element::new("simulation")
            .with("seed", self.dice.game_seed)
            .with("nonce", self.dice.nonce);
        if self.combat {
            out.set("combat", true);
        }
        if let Some(turn) = self.turn {
            out.set_entity("turn", turn);
        }
        for (id, actor) in &self.actors {
            let mut entry = Element::new("actor");
            entry.set_entity("id", *id);
            entry.push(actor.container.save());
            entry.push(actor.brain.save(&actor.container));
            out.push(entry);
        }
        out
    }

    /// Restores state written by [`Simulation::save`] onto an already loaded
    /// world. Entries for entities missing from the world are skipped.
    pub fn load(&mut self, input: &Element) -> Result<(), PersistError> {
        self.dice = Dice {
            game_seed: input.require("seed")?,
            nonce: input.require("nonce")?,
        };
        self.combat = input.flag("combat")?;
        self.turn = input.parse::<u32>("turn")?.map(EntityId);

        let ids = self.world.entity_ids();
        self.actors = ids.iter().map(|&id| (id, Actor::new(id))).collect();

        for entry in input.children.iter().filter(|c| c.name == "actor") {
            let id = entry.entity("id")?;
            let (mut ctx, actors) = self.split();
            let Some(Actor { container, brain }) = actors.get_mut(&id) else {
                tracing::warn!("skipping saved actions of missing {}", id);
                continue;
            };
            let restored = match entry.child("actions") {
                Some(actions) => container.restore(actions, &mut ctx)?,
                None => Vec::new(),
            };
            if let Some(saved) = entry.child("brain") {
                brain.restore_from(saved, &restored, container, &mut ctx)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionKind, ChainParams};
    use crate::brain::{Condition, Proposal, Rule, RuleScript};
    use crate::env::GridMap;
    use crate::state::{Capabilities, Faction, PerkId, Position};
    use crate::testing::FixedRng;

    const GUARD: EntityId = EntityId(1);
    const THIEF: EntityId = EntityId(2);
    const MINION: EntityId = EntityId(5);

    fn corridor() -> GridMap {
        GridMap::from_rows(&["#########", "#.......#", "#########"])
    }

    fn scripts() -> ScriptBook {
        ScriptBook::new().with_script(
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
    }

    fn simulation() -> Simulation {
        Simulation::new(GameRules::default(), corridor(), 7)
            .with_rng(FixedRng(0))
            .with_scripts(scripts())
    }

    fn run(sim: &mut Simulation, frames: usize) {
        for _ in 0..frames {
            sim.update(0.05);
        }
    }

    #[test]
    fn peace_frames_let_brains_pick_actions() {
        let mut sim = simulation();
        sim.spawn(
            Entity::new(GUARD, "guard", Capabilities::NPC).at(Position::new(4, 1)),
            Some(ScriptId::new("guard")),
        );
        run(&mut sim, 10);

        let handle = sim.brain(GUARD).and_then(Brain::peace_action).expect("peace action");
        let container = sim.container(GUARD).expect("container");
        assert_eq!(container.get(handle).map(|a| a.kind()), Some(ActionKind::Wait));
    }

    #[test]
    fn hand_off_pauses_and_resumes_the_performer_actions() {
        let mut sim = simulation();
        sim.spawn(Entity::new(GUARD, "guard", Capabilities::NPC).at(Position::new(1, 1)), None);
        sim.spawn(Entity::new(MINION, "minion", Capabilities::NPC).at(Position::new(4, 1)), None);
        let own = sim
            .add_action(MINION, &ActionCommand::wait(30.0))
            .expect("minion wait");
        sim.add_action(
            GUARD,
            &ActionCommand::Chain(ChainParams {
                performer: Some(MINION),
                steps: vec![ActionCommand::wait(0.2)],
            }),
        )
        .expect("chain");

        run(&mut sim, 1);
        let paused = |sim: &Simulation| {
            sim.container(MINION)
                .and_then(|c| c.get(own))
                .is_some_and(|a| a.is_paused())
        };
        assert!(paused(&sim));

        run(&mut sim, 10);
        assert!(sim.container(GUARD).is_some_and(ActionContainer::is_empty));
        assert!(!paused(&sim));
    }

    #[test]
    fn removing_the_owner_releases_a_handed_off_performer() {
        let mut sim = simulation();
        sim.spawn(Entity::new(GUARD, "guard", Capabilities::NPC).at(Position::new(1, 1)), None);
        sim.spawn(Entity::new(MINION, "minion", Capabilities::NPC).at(Position::new(4, 1)), None);
        let own = sim
            .add_action(MINION, &ActionCommand::wait(30.0))
            .expect("minion wait");
        sim.add_action(
            GUARD,
            &ActionCommand::Chain(ChainParams {
                performer: Some(MINION),
                steps: vec![ActionCommand::wait(5.0)],
            }),
        )
        .expect("chain");
        run(&mut sim, 2);

        assert!(sim.remove_entity(GUARD).is_some());
        assert!(sim.container(GUARD).is_none());
        let minion_wait = sim.container(MINION).and_then(|c| c.get(own));
        assert!(minion_wait.is_some_and(|a| !a.is_paused()));
    }

    #[test]
    fn strict_turn_runs_until_the_brain_is_done() {
        let mut sim = simulation();
        sim.spawn(
            Entity::new(GUARD, "guard", Capabilities::NPC)
                .at(Position::new(2, 1))
                .with_faction(Faction::Hostile),
            Some(ScriptId::new("guard")),
        );
        sim.spawn(
            Entity::new(THIEF, "thief", Capabilities::PC)
                .at(Position::new(1, 1))
                .with_faction(Faction::Player),
            None,
        );
        sim.start_combat();
        sim.begin_turn(GUARD);

        let mut frames = 0;
        while !sim.finished_turn() {
            sim.update_turn(0.05);
            frames += 1;
            assert!(frames < 2000, "turn never ended");
        }
        assert!(sim.events().iter().any(|e| matches!(
            e,
            SimEvent::AttackResolved { attacker: GUARD, .. }
        )));
        let guard = sim.world().entity(GUARD).expect("guard");
        assert!(guard.stats.ap.current < guard.stats.ap.maximum);

        sim.end_combat();
        assert!(!sim.is_in_combat());
        assert_eq!(
            sim.brain(GUARD)
                .and_then(Brain::peace_action)
                .and_then(|h| sim.container(GUARD)?.get(h).map(|a| a.kind())),
            Some(ActionKind::Chain)
        );
    }

    #[test]
    fn player_characters_keep_the_turn_while_they_have_ap() {
        let mut sim = simulation();
        let mut hero = Entity::new(THIEF, "hero", Capabilities::PC).at(Position::new(1, 1));
        hero.controllable = true;
        sim.spawn(hero, None);
        sim.start_combat();
        sim.begin_turn(THIEF);
        assert!(!sim.finished_turn());

        if let Some(hero) = sim.world_mut().entity_mut(THIEF) {
            hero.stats.ap.current = 0;
        }
        assert!(sim.finished_turn());
    }

    #[test]
    fn save_and_load_restore_actions_brains_and_dice() {
        let mut sim = simulation();
        sim.spawn(
            Entity::new(GUARD, "guard", Capabilities::NPC).at(Position::new(4, 1)),
            Some(ScriptId::new("guard")),
        );
        sim.spawn(Entity::new(MINION, "minion", Capabilities::NPC).at(Position::new(6, 1)), None);
        sim.add_action(MINION, &ActionCommand::wait(30.0)).expect("wait");
        run(&mut sim, 14);
        let saved = sim.save();

        let mut restored = simulation();
        *restored.world_mut() = sim.world().clone();
        restored.load(&saved).expect("load");

        assert_eq!(restored.save(), saved);
        assert_eq!(restored.dice(), sim.dice());
        assert_eq!(
            restored.container(MINION).map(ActionContainer::len),
            Some(1)
        );
    }

    #[test]
    fn perk_cooldowns_run_down_each_frame() {
        let mut sim = simulation();
        let mut mage = Entity::new(GUARD, "mage", Capabilities::NPC).at(Position::new(4, 1));
        mage.perk_cooldowns.insert(PerkId(3), 0.1);
        sim.spawn(mage, None);
        run(&mut sim, 3);

        assert!(sim.world().entity(GUARD).is_some_and(|m| m.is_perk_ready(PerkId(3))));
        assert!(sim.world().entity(GUARD).is_some_and(|m| m.perk_cooldowns.is_empty()));
    }
}
