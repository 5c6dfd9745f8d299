//! In-memory tile grid implementing [`MapOracle`].
//!
//! Used by the headless driver and the tests. Movement is 8-way with A*
//! search; line of sight walks a Bresenham line and stops at walls.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use crate::state::{EntityId, Position, World};

use super::{MapDimensions, MapOracle, Path, Step};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Terrain {
    #[default]
    Floor,
    /// Walkable at double move cost.
    Rough,
    Wall,
}

impl Terrain {
    pub fn is_passable(self) -> bool {
        !matches!(self, Terrain::Wall)
    }

    pub fn move_cost(self) -> i32 {
        match self {
            Terrain::Floor => 1,
            Terrain::Rough => 2,
            Terrain::Wall => i32::MAX,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridMap {
    dimensions: MapDimensions,
    tiles: Vec<Terrain>,
    dark: BTreeSet<Position>,
    isometric: bool,
    world_map: bool,
    sight_radius: f32,
}

impl GridMap {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            dimensions: MapDimensions::new(width, height),
            tiles: vec![Terrain::Floor; (width * height) as usize],
            dark: BTreeSet::new(),
            isometric: false,
            world_map: false,
            sight_radius: 12.0,
        }
    }

    /// Parses rows of `.` (floor), `,` (rough) and `#` (wall).
    /// The first row is the top of the map (highest y).
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len() as u32;
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as u32;
        let mut map = Self::new(width, height);
        for (row_index, row) in rows.iter().enumerate() {
            let y = height as i32 - 1 - row_index as i32;
            for (x, ch) in row.chars().enumerate() {
                let terrain = match ch {
                    '#' => Terrain::Wall,
                    ',' => Terrain::Rough,
                    _ => Terrain::Floor,
                };
                map.set(Position::new(x as i32, y), terrain);
            }
        }
        map
    }

    #[must_use]
    pub fn isometric(mut self, isometric: bool) -> Self {
        self.isometric = isometric;
        self
    }

    #[must_use]
    pub fn world_map(mut self, world_map: bool) -> Self {
        self.world_map = world_map;
        self
    }

    #[must_use]
    pub fn with_sight_radius(mut self, radius: f32) -> Self {
        self.sight_radius = radius;
        self
    }

    pub fn set(&mut self, tile: Position, terrain: Terrain) {
        if let Some(index) = self.index(tile) {
            self.tiles[index] = terrain;
        }
    }

    pub fn set_dark(&mut self, tile: Position, dark: bool) {
        if dark {
            self.dark.insert(tile);
        } else {
            self.dark.remove(&tile);
        }
    }

    pub fn terrain(&self, tile: Position) -> Terrain {
        self.index(tile).map_or(Terrain::Wall, |i| self.tiles[i])
    }

    fn index(&self, tile: Position) -> Option<usize> {
        self.dimensions
            .contains(tile)
            .then(|| (tile.y as u32 * self.dimensions.width + tile.x as u32) as usize)
    }

    fn neighbours(tile: Position) -> impl Iterator<Item = Position> {
        const OFFSETS: [(i32, i32); 8] = [
            (0, 1),
            (1, 1),
            (1, 0),
            (1, -1),
            (0, -1),
            (-1, -1),
            (-1, 0),
            (-1, 1),
        ];
        OFFSETS
            .into_iter()
            .map(move |(dx, dy)| Position::new(tile.x + dx, tile.y + dy))
    }

    fn heuristic(a: Position, b: Position) -> i32 {
        (a.x - b.x).abs().max((a.y - b.y).abs())
    }
}

impl MapOracle for GridMap {
    fn dimensions(&self) -> MapDimensions {
        self.dimensions
    }

    fn is_isometric(&self) -> bool {
        self.isometric
    }

    fn is_world_map(&self) -> bool {
        self.world_map
    }

    fn find_path(
        &self,
        world: &World,
        owner: EntityId,
        from: Position,
        to: Position,
    ) -> Option<Path> {
        if !self.terrain(to).is_passable() || !self.dimensions.contains(from) {
            return None;
        }
        if from == to {
            return Some(Path::new(vec![Step::new(from, 0)]));
        }

        let mut open = BinaryHeap::new();
        let mut came_from: BTreeMap<Position, Position> = BTreeMap::new();
        let mut cost_so_far: BTreeMap<Position, i32> = BTreeMap::new();
        open.push(Reverse((Self::heuristic(from, to), from)));
        cost_so_far.insert(from, 0);

        while let Some(Reverse((_, current))) = open.pop() {
            if current == to {
                break;
            }
            let current_cost = cost_so_far.get(&current).copied().unwrap_or(0);
            for next in Self::neighbours(current) {
                let terrain = self.terrain(next);
                if !terrain.is_passable() {
                    continue;
                }
                // The goal may be occupied; the walker decides whether to enter it.
                if next != to && world.is_occupied(next, owner) {
                    continue;
                }
                let new_cost = current_cost + terrain.move_cost();
                if cost_so_far.get(&next).is_none_or(|c| new_cost < *c) {
                    cost_so_far.insert(next, new_cost);
                    came_from.insert(next, current);
                    open.push(Reverse((new_cost + Self::heuristic(next, to), next)));
                }
            }
        }

        if !came_from.contains_key(&to) {
            return None;
        }

        let mut tiles = vec![to];
        let mut cursor = to;
        while let Some(prev) = came_from.get(&cursor) {
            tiles.push(*prev);
            cursor = *prev;
        }
        tiles.reverse();

        let steps = tiles
            .into_iter()
            .enumerate()
            .map(|(i, tile)| {
                let cost = if i == 0 { 0 } else { self.terrain(tile).move_cost() };
                Step::new(tile, cost)
            })
            .collect();
        Some(Path::new(steps))
    }

    fn is_blocked(&self, world: &World, owner: EntityId, tile: Position) -> bool {
        !self.terrain(tile).is_passable() || world.is_occupied(tile, owner)
    }

    fn can_see(&self, _world: &World, _viewer: EntityId, from: Position, to: Position) -> bool {
        if from.distance(to) > self.sight_radius {
            return false;
        }

        let (mut x, mut y) = (from.x, from.y);
        let dx = (to.x - from.x).abs();
        let dy = -(to.y - from.y).abs();
        let sx = if from.x < to.x { 1 } else { -1 };
        let sy = if from.y < to.y { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            let here = Position::new(x, y);
            if here == to {
                return true;
            }
            if here != from && !self.terrain(here).is_passable() {
                return false;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn is_dark(&self, tile: Position) -> bool {
        self.dark.contains(&tile)
    }
}
