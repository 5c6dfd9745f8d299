//! Real-time and turn-based action simulation for tactical role-playing games.
//!
//! `tactics-core` models what entities are doing over time: walking, fighting,
//! using perks and items, interacting with objects, and the brains that pick
//! those actions. Every behaviour is a resumable [`action::Action`] driven by
//! per-frame updates through an explicit [`env::SimContext`], and
//! [`sim::Simulation`] owns the frame loop, the strict-turn hooks and the
//! save document.
pub mod action;
pub mod brain;
pub mod combat;
pub mod config;
pub mod env;
pub mod error;
pub mod persist;
pub mod sim;
pub mod state;

#[cfg(test)]
mod testing;

pub use action::{
    Action, ActionCommand, ActionContainer, ActionError, ActionHandle, ActionKind,
    ActionRegistry, ActionSlot, ActionTarget, ChainParams, Destination, ItemUseParams,
    LookAroundParams, PerkParams, WanderDuration, WanderParams,
};
pub use brain::{
    Brain, BrainState, Condition, DecisionScript, Proposal, Rule, RuleScript, ScriptBook,
    ScriptId,
};
pub use combat::{HitRoll, action_ap_cost, attack_ap_cost, chance_to_hit};
pub use config::GameRules;
pub use env::{
    Catalog, Dice, Env, GridMap, ItemDefinition, ItemOracle, MapDimensions, MapOracle,
    OracleError, Path, PcgRng, PerkDefinition, PerkOracle, Request, RngOracle, SimContext,
    SimEvent, Step, Terrain,
};
pub use error::{ErrorContext, ErrorSeverity, GameError};
pub use persist::{Element, PersistError};
pub use sim::Simulation;
pub use state::{
    Capabilities, Entity, EntityId, Faction, ItemId, ItemStack, Orientation, PerkId, Position,
    ResourceMeter, World, WorldObject, WorldPos,
};
