//! Shared fixtures for unit tests.

use crate::action::{Action, ActionRegistry};
use crate::config::GameRules;
use crate::env::{Catalog, Dice, Env, GridMap, Outbox, RngOracle, SimContext, SimEvent};
use crate::state::{Entity, EntityId, World, WorldObject};

/// Oracle that always returns the same bits, so `roll(bound)` is `value % bound`.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct FixedRng(pub u32);

impl RngOracle for FixedRng {
    fn next_u32(&self, _seed: u64) -> u32 {
        self.0
    }
}

pub(crate) struct Fixture {
    pub world: World,
    pub map: GridMap,
    pub rules: GameRules,
    pub registry: ActionRegistry,
    pub catalog: Catalog,
    pub rng: FixedRng,
    pub dice: Dice,
    pub outbox: Outbox,
}

impl Fixture {
    pub fn new(rows: &[&str]) -> Self {
        Self {
            world: World::new(),
            map: GridMap::from_rows(rows),
            rules: GameRules::default(),
            registry: ActionRegistry::with_builtins(),
            catalog: Catalog::new(),
            rng: FixedRng(0),
            dice: Dice::new(0),
            outbox: Outbox::default(),
        }
    }

    /// A walled 9x3 room with one open row at y = 1.
    pub fn corridor() -> Self {
        Self::new(&["#########", "#.......#", "#########"])
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.world.insert_entity(entity);
        self
    }

    pub fn with_object(mut self, object: WorldObject) -> Self {
        self.world.insert_object(object);
        self
    }

    pub fn ctx(&mut self, combat: bool) -> SimContext<'_> {
        let env = Env::new(&self.rules, &self.map, &self.rng, &self.registry)
            .with_items(&self.catalog)
            .with_perks(&self.catalog);
        SimContext::new(&mut self.world, env, &mut self.dice, &mut self.outbox, combat)
    }

    pub fn entity(&self, id: EntityId) -> &Entity {
        self.world.entity(id).expect("entity in fixture")
    }

    pub fn entity_mut(&mut self, id: EntityId) -> &mut Entity {
        self.world.entity_mut(id).expect("entity in fixture")
    }

    pub fn events(&self) -> &[SimEvent] {
        &self.outbox.events
    }

    /// Advances animations and projectiles the way the simulation does.
    pub fn tick_world(&mut self, dt: f32) {
        for entity in self.world.entities_mut() {
            entity.animation.advance(dt);
        }
        let speed = self.rules.projectile.speed;
        self.world.projectiles.advance(dt, speed);
    }

    /// Updates `action` until it finishes. Returns the number of frames.
    pub fn run(&mut self, action: &mut dyn Action, combat: bool) -> usize {
        let dt = 0.05;
        let mut frames = 0;
        while !action.is_finished() && frames < 2000 {
            {
                let mut ctx = self.ctx(combat);
                action.update(dt, &mut ctx);
            }
            self.tick_world(dt);
            frames += 1;
        }
        assert!(frames < 2000, "action never finished: {action:?}");
        frames
    }
}
