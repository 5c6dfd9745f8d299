//! Grid map loader.
//!
//! Loads terrain only. Entity and object placement comes from the scenario.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tactics_core::{GridMap, Position};

use crate::loaders::{LoadResult, read_ron};

/// Map data structure for RON files.
///
/// Rows use `.` for floor, `,` for rough ground and `#` for walls. The first
/// row is the top of the map.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MapDataRon {
    rows: Vec<String>,
    #[serde(default)]
    dark: Vec<Position>,
    #[serde(default)]
    isometric: bool,
    #[serde(default)]
    world_map: bool,
    #[serde(default)]
    sight_radius: Option<f32>,
}

/// Loader for map data from RON files.
pub struct MapLoader;

impl MapLoader {
    pub fn load(path: &Path) -> LoadResult<GridMap> {
        let data: MapDataRon = read_ron(path, "map")?;
        Self::build(data)
    }

    fn build(data: MapDataRon) -> LoadResult<GridMap> {
        let Some(width) = data.rows.first().map(|r| r.chars().count()) else {
            anyhow::bail!("map has no rows");
        };
        if let Some(index) = data.rows.iter().position(|r| r.chars().count() != width) {
            anyhow::bail!("map row {index} is not {width} tiles wide");
        }

        let rows: Vec<&str> = data.rows.iter().map(String::as_str).collect();
        let mut map = GridMap::from_rows(&rows)
            .isometric(data.isometric)
            .world_map(data.world_map);
        if let Some(radius) = data.sight_radius {
            map = map.with_sight_radius(radius);
        }
        for tile in data.dark {
            map.set_dark(tile, true);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactics_core::{MapOracle, Terrain};

    #[test]
    fn rows_become_terrain_from_the_top_down() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.ron");
        std::fs::write(
            &path,
            r######"(
                rows: [
                    "#####",
                    "#.,.#",
                    "#####",
                ],
                dark: [(x: 3, y: 1)],
                isometric: true,
            )"######,
        )
        .unwrap();

        let map = MapLoader::load(&path).unwrap();
        assert_eq!(map.dimensions().width, 5);
        assert_eq!(map.dimensions().height, 3);
        assert_eq!(map.terrain(Position::new(2, 1)), Terrain::Rough);
        assert_eq!(map.terrain(Position::new(0, 1)), Terrain::Wall);
        assert!(map.is_dark(Position::new(3, 1)));
        assert!(!map.is_dark(Position::new(1, 1)));
        assert!(map.is_isometric());
        assert!(!map.is_world_map());
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let data = MapDataRon {
            rows: vec!["####".into(), "#..".into()],
            dark: Vec::new(),
            isometric: false,
            world_map: false,
            sight_radius: None,
        };
        let err = MapLoader::build(data).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }
}
