//! Data-driven content for the tactics simulation.
//!
//! This crate turns files in a content directory into `tactics-core` values:
//! - Rules table (TOML)
//! - Item and perk catalogs (RON)
//! - Grid map (RON)
//! - Decision scripts (RON)
//! - Scenario: actors and world objects to place (RON)
//! - Save documents (RON)
//!
//! Content is consumed when a simulation is built and never appears in
//! live state.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{
    ActorSpec, CatalogLoader, ContentFactory, LoadResult, MapLoader, RulesLoader, SaveLoader,
    Scenario, ScenarioLoader, ScriptLoader,
};
