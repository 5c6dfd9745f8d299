//! Rules table loader.

use std::path::Path;

use anyhow::Context;
use tactics_core::GameRules;

use crate::loaders::{LoadResult, read_file};

/// Loader for the rules table from TOML files.
///
/// Every section and key is optional; missing ones keep their defaults.
///
/// ```toml
/// [ap]
/// attack = 6
///
/// [hit]
/// back_bonus = 25
/// ```
pub struct RulesLoader;

impl RulesLoader {
    pub fn load(path: &Path) -> LoadResult<GameRules> {
        let content = read_file(path)?;
        Self::parse(&content).with_context(|| format!("in {}", path.display()))
    }

    pub fn parse(content: &str) -> LoadResult<GameRules> {
        let rules: GameRules = toml::from_str(content).context("failed to parse rules TOML")?;
        Self::validate(&rules)?;
        Ok(rules)
    }

    fn validate(rules: &GameRules) -> LoadResult<()> {
        let hit = &rules.hit;
        anyhow::ensure!(
            hit.min_chance <= hit.max_chance,
            "hit.min_chance ({}) is above hit.max_chance ({})",
            hit.min_chance,
            hit.max_chance
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_keep_their_defaults() {
        let rules = RulesLoader::parse(
            r#"
            [ap]
            attack = 6

            [brain]
            search_radius = 3
            "#,
        )
        .unwrap();

        let defaults = GameRules::default();
        assert_eq!(rules.ap.attack, 6);
        assert_eq!(rules.ap.pick_up, defaults.ap.pick_up);
        assert_eq!(rules.brain.search_radius, 3);
        assert_eq!(rules.hit, defaults.hit);
    }

    #[test]
    fn empty_file_is_the_default_table() {
        assert_eq!(RulesLoader::parse("").unwrap(), GameRules::default());
    }

    #[test]
    fn inverted_hit_bounds_are_rejected() {
        let err = RulesLoader::parse("[hit]\nmin_chance = 90\nmax_chance = 10\n").unwrap_err();
        assert!(format!("{err:#}").contains("min_chance"));

        let rules = RulesLoader::parse("[hit]\nmin_chance = 50\nmax_chance = 50\n").unwrap();
        assert_eq!(rules.hit.max_chance, 50);
    }

    #[test]
    fn load_reports_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        std::fs::write(&path, "[ap]\nattack = \"lots\"\n").unwrap();

        let err = RulesLoader::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("rules.toml"));
    }
}
