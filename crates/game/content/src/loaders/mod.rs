//! Content loaders for reading game data from files.

pub mod catalog;
pub mod factory;
pub mod map;
pub mod rules;
pub mod save;
pub mod scenario;
pub mod scripts;

pub use catalog::CatalogLoader;
pub use factory::ContentFactory;
pub use map::MapLoader;
pub use rules::RulesLoader;
pub use save::SaveLoader;
pub use scenario::{ActorSpec, Scenario, ScenarioLoader};
pub use scripts::ScriptLoader;

use std::path::Path;

use anyhow::Context;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Reads and parses a RON file into `T`.
pub(crate) fn read_ron<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> LoadResult<T> {
    let content = read_file(path)?;
    ron::from_str(&content).with_context(|| format!("failed to parse {what} RON at {}", path.display()))
}
