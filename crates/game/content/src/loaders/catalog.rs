//! Item and perk catalog loader.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tactics_core::{Catalog, ItemDefinition, PerkDefinition};

use crate::loaders::{LoadResult, read_ron};

/// Item catalog structure for RON files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemCatalog {
    pub items: Vec<ItemDefinition>,
}

/// Perk catalog structure for RON files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerkCatalog {
    pub perks: Vec<PerkDefinition>,
}

/// Loader for item and perk catalogs from RON files.
pub struct CatalogLoader;

impl CatalogLoader {
    pub fn load_items(path: &Path) -> LoadResult<Vec<ItemDefinition>> {
        let catalog: ItemCatalog = read_ron(path, "item catalog")?;
        Ok(catalog.items)
    }

    pub fn load_perks(path: &Path) -> LoadResult<Vec<PerkDefinition>> {
        let catalog: PerkCatalog = read_ron(path, "perk catalog")?;
        Ok(catalog.perks)
    }

    /// Loads both files into one in-memory catalog. Later duplicates of an id
    /// replace earlier ones.
    pub fn load(items: &Path, perks: &Path) -> LoadResult<Catalog> {
        let mut catalog = Catalog::new();
        for item in Self::load_items(items)? {
            catalog.add_item(item);
        }
        for perk in Self::load_perks(perks)? {
            catalog.add_perk(perk);
        }
        Ok(catalog)
    }
}
