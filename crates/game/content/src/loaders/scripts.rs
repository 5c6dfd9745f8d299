//! Decision script loader.

use std::collections::BTreeMap;
use std::path::Path;

use tactics_core::{RuleScript, ScriptBook};

use crate::loaders::{LoadResult, read_ron};

/// Loader for data-driven decision scripts from RON files.
///
/// File format: `{ "script id": (rules: [...]) }`
///
/// ```ron
/// {
///     "guard": (rules: [
///         (when: [InCombat, HostileAdjacent], then: AttackNearestHostile),
///         (when: [InCombat], then: AttackNearestHostile),
///         (then: Wander(radius: 2, chance_to_move: 30, seconds: None)),
///     ]),
/// }
/// ```
pub struct ScriptLoader;

impl ScriptLoader {
    pub fn load_rules(path: &Path) -> LoadResult<BTreeMap<String, RuleScript>> {
        read_ron(path, "script")
    }

    pub fn load(path: &Path) -> LoadResult<ScriptBook> {
        let scripts = Self::load_rules(path)?;
        tracing::debug!("loaded {} decision scripts", scripts.len());
        Ok(scripts
            .into_iter()
            .fold(ScriptBook::new(), |book, (id, script)| book.with_script(id, script)))
    }
}
