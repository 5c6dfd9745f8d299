//! The simulation context handed to every action and brain call.

use crate::action::{ActionKind, ActionRegistry};
use crate::brain::ScriptBook;
use crate::combat::{HitRoll, ProjectileId};
use crate::config::GameRules;
use crate::state::{Entity, EntityId, Hand, ItemId, ItemStack, PerkId, Position, Skill, World};

use super::{Dice, ItemOracle, MapOracle, OracleError, PerkOracle, RngOracle, RollPurpose};

/// Read-only collaborators.
#[derive(Clone, Copy)]
pub struct Env<'a> {
    pub rules: &'a GameRules,
    pub map: &'a dyn MapOracle,
    pub rng: &'a dyn RngOracle,
    pub registry: &'a ActionRegistry,
    items: Option<&'a dyn ItemOracle>,
    perks: Option<&'a dyn PerkOracle>,
    scripts: Option<&'a ScriptBook>,
}

impl<'a> Env<'a> {
    pub fn new(
        rules: &'a GameRules,
        map: &'a dyn MapOracle,
        rng: &'a dyn RngOracle,
        registry: &'a ActionRegistry,
    ) -> Self {
        Self {
            rules,
            map,
            rng,
            registry,
            items: None,
            perks: None,
            scripts: None,
        }
    }

    #[must_use]
    pub fn with_items(mut self, items: &'a dyn ItemOracle) -> Self {
        self.items = Some(items);
        self
    }

    #[must_use]
    pub fn with_perks(mut self, perks: &'a dyn PerkOracle) -> Self {
        self.perks = Some(perks);
        self
    }

    #[must_use]
    pub fn with_scripts(mut self, scripts: &'a ScriptBook) -> Self {
        self.scripts = Some(scripts);
        self
    }

    pub fn items(&self) -> Result<&'a dyn ItemOracle, OracleError> {
        self.items.ok_or(OracleError::ItemsNotAvailable)
    }

    pub fn perks(&self) -> Result<&'a dyn PerkOracle, OracleError> {
        self.perks.ok_or(OracleError::PerksNotAvailable)
    }

    pub fn scripts(&self) -> Result<&'a ScriptBook, OracleError> {
        self.scripts.ok_or(OracleError::ScriptsNotAvailable)
    }
}

/// Observable outcome of a frame. Tests and front-ends read these instead of logs.
#[derive(Clone, Debug, PartialEq)]
pub enum SimEvent {
    /// An action gave up or declined; `reason` is a stable log key.
    Refused {
        actor: EntityId,
        kind: ActionKind,
        reason: &'static str,
    },
    AttackResolved {
        attacker: EntityId,
        target: EntityId,
        hand: Option<Hand>,
        roll: HitRoll,
        damage: i32,
    },
    ProjectileLaunched {
        attacker: EntityId,
        target: EntityId,
        projectile: ProjectileId,
    },
    ProjectileLost {
        attacker: EntityId,
        projectile: ProjectileId,
    },
    Died {
        entity: EntityId,
    },
    SkillCheck {
        actor: EntityId,
        skill: Skill,
        chance: i32,
        roll: i32,
        success: bool,
    },
    ExperienceGained {
        actor: EntityId,
        amount: u32,
    },
    StealthBroken {
        actor: EntityId,
    },
    Unlocked {
        actor: EntityId,
        object: EntityId,
        with_key: bool,
    },
    LockpickFailed {
        actor: EntityId,
        object: EntityId,
    },
    TrapSprung {
        actor: EntityId,
        object: EntityId,
        damage: i32,
    },
    TrapDisarmed {
        actor: EntityId,
        object: EntityId,
    },
    DisarmFailed {
        actor: EntityId,
        object: EntityId,
    },
    ObjectUsed {
        actor: EntityId,
        object: EntityId,
        verb: String,
    },
    ItemPickedUp {
        actor: EntityId,
        stack: ItemStack,
    },
    ItemUsed {
        actor: EntityId,
        item: ItemId,
    },
    PerkUsed {
        actor: EntityId,
        perk: PerkId,
        at: Position,
    },
    DialogueRequested {
        speaker: EntityId,
        listener: EntityId,
        dialogue: Option<String>,
    },
    Shouted {
        actor: EntityId,
        text: String,
    },
    /// Free-form line for the message log.
    Log {
        text: String,
    },
}

/// Cross-entity effects on action machinery, applied by the simulation after
/// the issuing entity's frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Request {
    PauseActions(EntityId),
    ResumeActions(EntityId),
    SetBrainEnabled { entity: EntityId, enabled: bool },
}

/// Events and requests produced during a frame.
#[derive(Clone, Debug, Default)]
pub struct Outbox {
    pub events: Vec<SimEvent>,
    pub requests: Vec<Request>,
}

impl Outbox {
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Explicit state passed to every `init`/`update`.
pub struct SimContext<'a> {
    pub world: &'a mut World,
    pub env: Env<'a>,
    pub dice: &'a mut Dice,
    pub outbox: &'a mut Outbox,
    /// Whether strict-turn combat is in progress. Owned by the turn scheduler.
    pub combat: bool,
}

impl<'a> SimContext<'a> {
    pub fn new(
        world: &'a mut World,
        env: Env<'a>,
        dice: &'a mut Dice,
        outbox: &'a mut Outbox,
        combat: bool,
    ) -> Self {
        Self {
            world,
            env,
            dice,
            outbox,
            combat,
        }
    }

    pub fn rules(&self) -> &'a GameRules {
        self.env.rules
    }

    pub fn map(&self) -> &'a dyn MapOracle {
        self.env.map
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.world.entity(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.world.entity_mut(id)
    }

    /// Uniform roll in `0..bound`.
    pub fn roll(&mut self, actor: EntityId, purpose: RollPurpose, bound: u32) -> u32 {
        self.dice.below(self.env.rng, actor, purpose, bound)
    }

    /// Uniform roll in `min..=max`.
    pub fn roll_between(&mut self, actor: EntityId, purpose: RollPurpose, min: i32, max: i32) -> i32 {
        self.dice.between(self.env.rng, actor, purpose, min, max)
    }

    pub fn emit(&mut self, event: SimEvent) {
        self.outbox.events.push(event);
    }

    pub fn request(&mut self, request: Request) {
        self.outbox.requests.push(request);
    }

    /// Logs and records that an action declined to proceed.
    pub fn refuse(&mut self, actor: EntityId, kind: ActionKind, reason: &'static str) {
        tracing::info!("{} cannot {}: {}", actor, kind.as_ref(), reason);
        self.emit(SimEvent::Refused {
            actor,
            kind,
            reason,
        });
    }

    pub fn is_blocked(&self, owner: EntityId, tile: Position) -> bool {
        self.env.map.is_blocked(&*self.world, owner, tile)
    }

    /// Whether `viewer` has line of sight from its current tile to `tile`.
    pub fn can_see(&self, viewer: EntityId, tile: Position) -> bool {
        self.world
            .entity(viewer)
            .is_some_and(|e| self.env.map.can_see(&*self.world, viewer, e.tile(), tile))
    }
}
