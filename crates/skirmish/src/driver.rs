//! Turn scheduler and a stand-in for the player.
//!
//! The simulation leaves turn order to its host. [`Skirmish`] runs peace
//! frames until two hostile entities see each other, then cycles strict
//! turns in id order until one side is gone. Controllable characters have no
//! brain, so an autopilot issues their orders: walk toward the enemy in
//! peace, attack the nearest visible enemy while AP lasts in combat.

use std::collections::{BTreeMap, VecDeque};

use tactics_core::{
    ActionCommand, Capabilities, Destination, Entity, EntityId, SimEvent, Simulation,
    attack_ap_cost,
};

use crate::report;

/// Seconds between peace orders to the same character.
const ORDER_INTERVAL_SECS: f32 = 1.0;
/// Orders the autopilot gives in one turn before passing.
const MAX_ORDERS_PER_TURN: u32 = 4;
/// Frames after which a turn that never ends is taken away.
const MAX_TURN_FRAMES: u32 = 2_000;

#[derive(Debug)]
struct Turn {
    id: EntityId,
    player: bool,
    frames: u32,
    orders: u32,
    /// AP when the last order was given.
    ap_at_order: Option<i32>,
    passed: bool,
}

impl Turn {
    fn new(id: EntityId, player: bool) -> Self {
        Self {
            id,
            player,
            frames: 0,
            orders: 0,
            ap_at_order: None,
            passed: false,
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub frames: u64,
    pub combats: u32,
    pub rounds: u32,
    pub timed_out: bool,
    /// Name and remaining HP of every entity still standing.
    pub survivors: Vec<(String, i32)>,
}

pub struct Skirmish {
    sim: Simulation,
    dt: f32,
    frame: u64,
    elapsed: f32,
    combats: u32,
    rounds: u32,
    queue: VecDeque<EntityId>,
    turn: Option<Turn>,
    next_order: BTreeMap<EntityId, f32>,
}

impl Skirmish {
    pub fn new(sim: Simulation, dt: f32) -> Self {
        Self {
            sim,
            dt,
            frame: 0,
            elapsed: 0.0,
            combats: 0,
            rounds: 0,
            queue: VecDeque::new(),
            turn: None,
            next_order: BTreeMap::new(),
        }
    }

    pub fn sim(&self) -> &Simulation {
        &self.sim
    }

    /// Runs frames until nobody has an enemy left or `max_frames` pass.
    pub fn run(&mut self, max_frames: u64) -> Outcome {
        let mut timed_out = true;
        while self.frame < max_frames {
            if !self.step() {
                timed_out = false;
                break;
            }
        }
        self.outcome(timed_out)
    }

    /// One frame. Returns false once the skirmish is over.
    pub fn step(&mut self) -> bool {
        self.frame += 1;
        self.elapsed += self.dt;
        if self.sim.is_in_combat() {
            self.combat_frame();
        } else {
            self.peace_frame();
        }
        self.report_events();
        self.sim.is_in_combat() || self.hostilities_remain()
    }

    fn outcome(&self, timed_out: bool) -> Outcome {
        Outcome {
            frames: self.frame,
            combats: self.combats,
            rounds: self.rounds,
            timed_out,
            survivors: self
                .sim
                .world()
                .entities()
                .filter(|e| e.is_alive())
                .map(|e| (e.name.clone(), e.stats.hp.current))
                .collect(),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    fn is_alive(&self, id: EntityId) -> bool {
        self.sim.world().entity(id).is_some_and(Entity::is_alive)
    }

    fn hostilities_remain(&self) -> bool {
        let world = self.sim.world();
        world
            .entities()
            .any(|e| e.is_alive() && world.hostiles_of(e.id).next().is_some())
    }

    fn sees(&self, viewer: &Entity, other: &Entity) -> bool {
        self.sim
            .map()
            .can_see(self.sim.world(), viewer.id, viewer.tile(), other.tile())
    }

    fn anyone_spotted(&self) -> bool {
        let world = self.sim.world();
        world.entities().filter(|e| e.is_alive()).any(|e| {
            world.hostiles_of(e.id).any(|h| self.sees(e, h))
        })
    }

    fn nearest_hostile(&self, id: EntityId, visible_only: bool) -> Option<&Entity> {
        let world = self.sim.world();
        let me = world.entity(id)?;
        world
            .hostiles_of(id)
            .filter(|h| !visible_only || self.sees(me, h))
            .min_by(|a, b| {
                let da = me.tile().distance(a.tile());
                let db = me.tile().distance(b.tile());
                da.total_cmp(&db)
            })
    }

    fn is_idle(&self, id: EntityId) -> bool {
        self.sim.container(id).is_some_and(|c| c.is_empty())
    }

    // ========================================================================
    // Peace
    // ========================================================================

    fn peace_frame(&mut self) {
        if self.anyone_spotted() {
            self.combats += 1;
            self.queue.clear();
            self.turn = None;
            self.sim.start_combat();
            return;
        }
        self.order_party();
        self.sim.update(self.dt);
    }

    /// Sends idle controllable characters toward the nearest enemy.
    fn order_party(&mut self) {
        let party: Vec<EntityId> = self
            .sim
            .world()
            .entities()
            .filter(|e| e.controllable && e.is_alive())
            .map(|e| e.id)
            .collect();
        for id in party {
            let due = self.next_order.get(&id).is_none_or(|at| *at <= self.elapsed);
            if !due || !self.is_idle(id) {
                continue;
            }
            let Some(goal) = self.nearest_hostile(id, false).map(Entity::tile) else {
                continue;
            };
            self.next_order.insert(id, self.elapsed + ORDER_INTERVAL_SECS);
            let command = ActionCommand::MoveTo(Destination::next_to(goal));
            if let Err(err) = self.sim.add_action(id, &command) {
                tracing::debug!("{} ignores the order to advance: {}", id, err);
            }
        }
    }

    // ========================================================================
    // Combat
    // ========================================================================

    fn combat_frame(&mut self) {
        if !self.hostilities_remain() {
            self.turn = None;
            self.queue.clear();
            self.sim.end_combat();
            return;
        }
        let mut turn = match self.turn.take().filter(|t| self.is_alive(t.id)) {
            Some(turn) => turn,
            None => match self.next_turn() {
                Some(turn) => turn,
                None => {
                    self.sim.end_combat();
                    return;
                }
            },
        };

        if turn.player {
            self.drive_player(&mut turn);
        }
        self.sim.update_turn(self.dt);
        turn.frames += 1;

        let blocked = self
            .sim
            .container(turn.id)
            .is_some_and(|c| c.has_blocking_action());
        let over = self.sim.finished_turn() || (turn.passed && !blocked);
        if turn.frames >= MAX_TURN_FRAMES {
            tracing::warn!("{} held the turn for {} frames", turn.id, turn.frames);
        } else if !over {
            self.turn = Some(turn);
        }
    }

    /// Hands the turn to the next living combatant, starting a new round
    /// when everyone has acted.
    fn next_turn(&mut self) -> Option<Turn> {
        loop {
            if self.queue.is_empty() {
                self.queue = self
                    .sim
                    .world()
                    .entities()
                    .filter(|e| e.is_alive() && e.has(Capabilities::COMBATANT))
                    .map(|e| e.id)
                    .collect();
                if self.queue.is_empty() {
                    return None;
                }
                self.rounds += 1;
                tracing::info!("round {}", self.rounds);
            }
            let id = self.queue.pop_front()?;
            let Some(player) = self.sim.world().entity(id).filter(|e| e.is_alive()).map(|e| e.controllable)
            else {
                continue;
            };
            self.sim.begin_turn(id);
            return Some(Turn::new(id, player));
        }
    }

    /// Attacks the nearest visible enemy while that still spends AP.
    fn drive_player(&mut self, turn: &mut Turn) {
        if turn.passed || !self.is_idle(turn.id) {
            return;
        }
        let Some(me) = self.sim.world().entity(turn.id) else {
            turn.passed = true;
            return;
        };
        let ap = me.stats.ap.current;
        let stalled = turn.ap_at_order.is_some_and(|before| ap >= before);
        let cost = attack_ap_cost(me, self.sim.rules().ap.attack);
        let target = self.nearest_hostile(turn.id, true).map(|h| h.id);

        let Some(target) = target.filter(|_| {
            !stalled && ap >= cost && turn.orders < MAX_ORDERS_PER_TURN
        }) else {
            tracing::debug!("{} passes with {} AP", turn.id, ap);
            turn.passed = true;
            return;
        };
        match self.sim.add_action(turn.id, &ActionCommand::Attack { target }) {
            Ok(_) => {
                turn.orders += 1;
                turn.ap_at_order = Some(ap);
            }
            Err(err) => {
                tracing::warn!("{} cannot attack {}: {}", turn.id, target, err);
                turn.passed = true;
            }
        }
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Logs this frame's events and clears the dead from the field.
    fn report_events(&mut self) {
        let events = self.sim.drain_events();
        let mut dead = Vec::new();
        for event in &events {
            if let Some(line) = report::describe(self.sim.world(), event) {
                tracing::info!(target: "skirmish::log", "{}", line);
            }
            if let SimEvent::Died { entity } = event {
                dead.push(*entity);
            }
        }
        for id in dead {
            self.sim.remove_entity(id);
            self.next_order.remove(&id);
        }
    }
}
