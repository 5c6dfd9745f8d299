//! Decision scripts: where a brain's next command comes from.
//!
//! A [`DecisionScript`] looks at the world through a [`ScriptView`] and
//! proposes at most one [`ActionCommand`]. The built-in [`RuleScript`] is a
//! data-driven priority list so content can describe simple behaviour
//! without code; hosts may register their own implementations.

use std::collections::BTreeMap;
use std::fmt;

use crate::action::{ActionCommand, ActionTarget, Destination, PerkParams, WanderDuration, WanderParams};
use crate::env::{RollPurpose, SimContext};
use crate::state::{Entity, EntityId, PerkId, Position};

/// Stable name of a script in the [`ScriptBook`]. Persisted by brains.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScriptId(pub String);

impl ScriptId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScriptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of commands for a brain.
///
/// Implementations must not assume the proposal will run: the brain may
/// drop it when the owner is forbidden to perform it or `init` refuses.
pub trait DecisionScript: fmt::Debug + Send + Sync {
    fn propose(&self, view: &mut ScriptView<'_, '_>) -> Option<ActionCommand>;
}

// ============================================================================
// ScriptView
// ============================================================================

/// What a script may look at: the deciding entity, the world and the dice.
///
/// World access is read-only; the only mutation is consuming rolls.
pub struct ScriptView<'v, 'a> {
    me: EntityId,
    ctx: &'v mut SimContext<'a>,
}

impl<'v, 'a> ScriptView<'v, 'a> {
    pub fn new(me: EntityId, ctx: &'v mut SimContext<'a>) -> Self {
        Self { me, ctx }
    }

    pub fn me(&self) -> Option<&Entity> {
        self.ctx.entity(self.me)
    }

    pub fn id(&self) -> EntityId {
        self.me
    }

    pub fn in_combat(&self) -> bool {
        self.ctx.combat
    }

    /// Closest living hostile the deciding entity can see.
    pub fn nearest_visible_hostile(&self) -> Option<&Entity> {
        let here = self.me()?.tile();
        self.ctx
            .world
            .hostiles_of(self.me)
            .filter(|other| self.ctx.can_see(self.me, other.tile()))
            .min_by(|a, b| {
                here.distance(a.tile())
                    .total_cmp(&here.distance(b.tile()))
                    .then(a.id.cmp(&b.id))
            })
    }

    pub fn hostile_adjacent(&self) -> bool {
        let Some(here) = self.me().map(Entity::tile) else {
            return false;
        };
        self.ctx
            .world
            .hostiles_of(self.me)
            .any(|other| here.is_next_to_or_on(other.tile()))
    }

    /// Uniform roll in `0..100` on the deciding entity's stream.
    pub fn percent_roll(&mut self) -> u32 {
        self.ctx.roll(self.me, RollPurpose::Script, 100)
    }

    /// Tile `distance` steps directly away from `threat`, kept inside the map
    /// border. An axis too thin to have a border only keeps inside the map.
    pub fn tile_away_from(&self, threat: Position, distance: i32) -> Option<Position> {
        let here = self.me()?.tile();
        let dims = self.ctx.map().dimensions();
        let step = |from: i32, away: i32, size: u32| {
            let size = i32::try_from(size).unwrap_or(i32::MAX);
            let (low, high) = if size >= 3 {
                (1, size - 2)
            } else {
                (0, (size - 1).max(0))
            };
            let dir = (from - away).signum();
            (from + dir * distance).clamp(low, high)
        };
        let tile = Position::new(
            step(here.x, threat.x, dims.width),
            step(here.y, threat.y, dims.height),
        );
        (tile != here).then_some(tile)
    }
}

// ============================================================================
// RuleScript
// ============================================================================

/// Test over the deciding entity and its surroundings.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Condition {
    Always,
    InCombat,
    HostileVisible,
    HostileAdjacent,
    /// HP below this percentage of the maximum.
    HealthBelow(i32),
    HasAp(i32),
    /// Percent chance, rolled each time the rule is evaluated.
    Chance(u32),
    Not(Box<Condition>),
}

impl Condition {
    fn holds(&self, view: &mut ScriptView<'_, '_>) -> bool {
        match self {
            Self::Always => true,
            Self::InCombat => view.in_combat(),
            Self::HostileVisible => view.nearest_visible_hostile().is_some(),
            Self::HostileAdjacent => view.hostile_adjacent(),
            Self::HealthBelow(pct) => view.me().is_some_and(|me| me.stats.hp.percent() < *pct),
            Self::HasAp(ap) => view.me().is_some_and(|me| me.stats.ap.current >= *ap),
            Self::Chance(pct) => view.percent_roll() < *pct,
            Self::Not(inner) => !inner.holds(view),
        }
    }
}

/// What a matching rule asks for.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Proposal {
    AttackNearestHostile,
    Wander {
        radius: i32,
        chance_to_move: u32,
        /// `None` wanders forever.
        seconds: Option<f32>,
    },
    Wait(f32),
    MoveTo(Position),
    RetreatFromNearestHostile,
    UsePerkOnNearestHostile(PerkId),
    /// Matches but proposes nothing, stopping the search.
    Nothing,
}

const RETREAT_DISTANCE: i32 = 3;

impl Proposal {
    fn command(&self, view: &ScriptView<'_, '_>) -> Option<ActionCommand> {
        match self {
            Self::AttackNearestHostile => view
                .nearest_visible_hostile()
                .map(|target| ActionCommand::Attack { target: target.id }),
            Self::Wander {
                radius,
                chance_to_move,
                seconds,
            } => Some(ActionCommand::Wander(WanderParams {
                centre: None,
                radius: *radius,
                chance_to_move: *chance_to_move,
                duration: seconds.map_or(WanderDuration::Infinite, WanderDuration::Seconds),
                visible_only: false,
            })),
            Self::Wait(seconds) => Some(ActionCommand::wait(*seconds)),
            Self::MoveTo(tile) => Some(ActionCommand::MoveTo(Destination::tile(*tile))),
            Self::RetreatFromNearestHostile => {
                let threat = view.nearest_visible_hostile()?.tile();
                let tile = view.tile_away_from(threat, RETREAT_DISTANCE)?;
                Some(ActionCommand::MoveTo(Destination::tile(tile)))
            }
            Self::UsePerkOnNearestHostile(perk) => {
                view.nearest_visible_hostile().map(|target| {
                    ActionCommand::UsePerk(PerkParams {
                        perk: *perk,
                        target: ActionTarget::Entity(target.id),
                        free: false,
                    })
                })
            }
            Self::Nothing => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rule {
    #[cfg_attr(feature = "serde", serde(default))]
    pub when: Vec<Condition>,
    pub then: Proposal,
}

/// Ordered rules; the first whose conditions all hold decides.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RuleScript {
    pub rules: Vec<Rule>,
}

impl RuleScript {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }
}

impl DecisionScript for RuleScript {
    fn propose(&self, view: &mut ScriptView<'_, '_>) -> Option<ActionCommand> {
        let rule = self
            .rules
            .iter()
            .find(|rule| rule.when.iter().all(|c| c.holds(view)))?;
        rule.then.command(view)
    }
}

// ============================================================================
// ScriptBook
// ============================================================================

/// Scripts by id, handed to brains through the simulation context.
#[derive(Debug, Default)]
pub struct ScriptBook {
    scripts: BTreeMap<ScriptId, Box<dyn DecisionScript>>,
}

impl ScriptBook {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_script(mut self, id: impl Into<String>, script: impl DecisionScript + 'static) -> Self {
        self.insert(ScriptId::new(id), Box::new(script));
        self
    }

    pub fn insert(&mut self, id: ScriptId, script: Box<dyn DecisionScript>) {
        self.scripts.insert(id, script);
    }

    pub fn get(&self, id: &ScriptId) -> Option<&dyn DecisionScript> {
        self.scripts.get(id).map(Box::as_ref)
    }

    pub fn contains(&self, id: &ScriptId) -> bool {
        self.scripts.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}
