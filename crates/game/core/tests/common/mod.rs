//! Shared setup for the integration tests.
#![allow(dead_code)]

use tactics_core::{
    Action, ActionRegistry, Catalog, Dice, Entity, EntityId, Env, GameRules, GridMap, RngOracle,
    SimContext, Simulation, World,
};
use tactics_core::env::Outbox;

pub const DT: f32 = 0.05;

/// Every roll returns the same bits: `roll(bound)` is `value % bound`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedRng(pub u32);

impl RngOracle for FixedRng {
    fn next_u32(&self, _seed: u64) -> u32 {
        self.0
    }
}

pub fn corridor() -> GridMap {
    GridMap::from_rows(&["#########", "#.......#", "#########"])
}

pub fn room() -> GridMap {
    GridMap::from_rows(&[
        "#######", "#.....#", "#.....#", "#.....#", "#.....#", "#.....#", "#######",
    ])
}

/// Simulation on `map` where every roll comes up 0 (always hits).
pub fn simulation(map: GridMap) -> Simulation {
    Simulation::new(GameRules::default(), map, 1).with_rng(FixedRng(0))
}

/// Runs peace frames until `id` has no actions left. Returns the frame count.
pub fn settle(sim: &mut Simulation, id: EntityId) -> usize {
    let mut frames = 0;
    while sim.container(id).is_some_and(|c| !c.is_empty()) {
        sim.update(DT);
        frames += 1;
        assert!(frames < 2000, "{id} never settled");
    }
    frames
}

/// Hand-built context for driving a single action outside a simulation.
pub struct Rig {
    pub world: World,
    pub map: GridMap,
    pub rules: GameRules,
    pub registry: ActionRegistry,
    pub catalog: Catalog,
    pub rng: FixedRng,
    pub dice: Dice,
    pub outbox: Outbox,
}

impl Rig {
    pub fn new(map: GridMap) -> Self {
        Self {
            world: World::new(),
            map,
            rules: GameRules::default(),
            registry: ActionRegistry::with_builtins(),
            catalog: Catalog::new(),
            rng: FixedRng(0),
            dice: Dice::new(1),
            outbox: Outbox::default(),
        }
    }

    pub fn with(mut self, entity: Entity) -> Self {
        self.world.insert_entity(entity);
        self
    }

    pub fn ctx(&mut self, combat: bool) -> SimContext<'_> {
        let env = Env::new(&self.rules, &self.map, &self.rng, &self.registry)
            .with_items(&self.catalog)
            .with_perks(&self.catalog);
        SimContext::new(&mut self.world, env, &mut self.dice, &mut self.outbox, combat)
    }

    pub fn entity(&self, id: EntityId) -> &Entity {
        self.world.entity(id).unwrap()
    }

    /// Updates `action` until it finishes. Returns the number of frames.
    pub fn run(&mut self, action: &mut dyn Action, combat: bool) -> usize {
        let mut frames = 0;
        while !action.is_finished() {
            action.update(DT, &mut self.ctx(combat));
            for entity in self.world.entities_mut() {
                entity.animation.advance(DT);
            }
            frames += 1;
            assert!(frames < 2000, "action never finished: {action:?}");
        }
        frames
    }
}
