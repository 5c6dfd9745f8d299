//! Content factory for building a simulation from a content directory.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tactics_core::{Catalog, GameRules, GridMap, ScriptBook, Simulation};

use crate::loaders::{
    CatalogLoader, LoadResult, MapLoader, RulesLoader, Scenario, ScenarioLoader, ScriptLoader,
};

/// Content factory that loads all game content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// content_dir/
/// ├── rules.toml      (optional, defaults when absent)
/// ├── items.ron
/// ├── perks.ron
/// ├── map.ron
/// ├── scripts.ron
/// └── scenario.ron
/// ```
pub struct ContentFactory {
    content_dir: PathBuf,
}

impl ContentFactory {
    pub fn new(content_dir: impl Into<PathBuf>) -> Self {
        Self {
            content_dir: content_dir.into(),
        }
    }

    /// Load the rules table from `rules.toml`, or the defaults if the file is absent.
    pub fn load_rules(&self) -> LoadResult<GameRules> {
        let path = self.content_dir.join("rules.toml");
        if !path.exists() {
            tracing::info!("no {} found, using default rules", path.display());
            return Ok(GameRules::default());
        }
        RulesLoader::load(&path)
    }

    /// Load items and perks from `items.ron` and `perks.ron`.
    pub fn load_catalog(&self) -> LoadResult<Catalog> {
        CatalogLoader::load(
            &self.content_dir.join("items.ron"),
            &self.content_dir.join("perks.ron"),
        )
    }

    pub fn load_map(&self) -> LoadResult<GridMap> {
        MapLoader::load(&self.content_dir.join("map.ron"))
    }

    pub fn load_scripts(&self) -> LoadResult<ScriptBook> {
        ScriptLoader::load(&self.content_dir.join("scripts.ron"))
    }

    pub fn load_scenario(&self) -> LoadResult<Scenario> {
        ScenarioLoader::load(&self.content_dir.join("scenario.ron"))
    }

    /// Loads everything and returns a populated simulation seeded with `seed`.
    pub fn build_simulation(&self, seed: u64) -> LoadResult<Simulation> {
        let rules = self.load_rules()?;
        let catalog = self.load_catalog()?;
        let map = self.load_map()?;
        let scripts = self.load_scripts()?;
        let scenario = self.load_scenario()?;
        scenario
            .validate(&scripts)
            .with_context(|| format!("invalid scenario in {}", self.content_dir.display()))?;

        let mut sim = Simulation::new(rules, map, seed)
            .with_catalog(catalog)
            .with_scripts(scripts);
        scenario.populate(&mut sim);
        Ok(sim)
    }

    /// Returns the content directory path.
    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_paths() {
        let factory = ContentFactory::new("/tmp/content");
        assert_eq!(factory.content_dir(), Path::new("/tmp/content"));
    }

    #[test]
    fn absent_rules_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let factory = ContentFactory::new(dir.path());
        assert_eq!(factory.load_rules().unwrap(), GameRules::default());
        assert!(factory.load_map().is_err());
    }
}
