//! Collaborators and the explicit simulation context.
//!
//! Nothing in the action layer reaches for global state. Map queries, catalogs,
//! randomness, the rules table and the combat flag all arrive through
//! [`SimContext`], which makes every action testable against a hand-built world.

mod catalog;
mod context;
mod error;
mod grid;
mod map;
mod rng;

pub use catalog::{
    Catalog, Effect, ItemDefinition, ItemOracle, ItemUse, PerkDefinition, PerkOracle,
    ResourceCosts, Targeting, UseCondition,
};
pub use context::{Env, Outbox, Request, SimContext, SimEvent};
pub use error::OracleError;
pub use grid::{GridMap, Terrain};
pub use map::{MapDimensions, MapOracle, Path, Step};
pub use rng::{Dice, PcgRng, RngOracle, RollPurpose, compute_seed};
