//! Save documents on disk.
//!
//! A save is the [`Element`] tree written by `Simulation::save`, stored as
//! pretty-printed RON.

use std::path::Path;

use anyhow::Context;
use ron::ser::PrettyConfig;
use tactics_core::Element;

use crate::loaders::{LoadResult, read_ron};

pub struct SaveLoader;

impl SaveLoader {
    pub fn load(path: &Path) -> LoadResult<Element> {
        read_ron(path, "save")
    }

    pub fn write(path: &Path, document: &Element) -> LoadResult<()> {
        let text = ron::ser::to_string_pretty(document, PrettyConfig::default())
            .context("failed to serialize save document")?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
    }
}
