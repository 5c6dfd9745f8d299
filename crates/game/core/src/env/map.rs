use crate::state::{EntityId, Position, World};

/// Map oracle: geometry, blocking, pathfinding and sight.
///
/// Every query receives the live [`World`] so implementations can take
/// dynamic occupancy into account.
pub trait MapOracle: Send + Sync {
    fn dimensions(&self) -> MapDimensions;

    fn is_isometric(&self) -> bool {
        false
    }

    /// World (travel) maps move entities faster.
    fn is_world_map(&self) -> bool {
        false
    }

    /// Path from `from` to `to`, starting with the `from` tile.
    ///
    /// The destination may be occupied; callers decide whether to keep the
    /// final step. Returns `None` when no route exists.
    fn find_path(&self, world: &World, owner: EntityId, from: Position, to: Position)
    -> Option<Path>;

    fn is_blocked(&self, world: &World, owner: EntityId, tile: Position) -> bool;

    fn can_see(&self, world: &World, viewer: EntityId, from: Position, to: Position) -> bool;

    fn is_dark(&self, _tile: Position) -> bool {
        false
    }

    fn contains(&self, position: Position) -> bool {
        self.dimensions().contains(position)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapDimensions {
    pub width: u32,
    pub height: u32,
}

impl MapDimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, position: Position) -> bool {
        position.x >= 0
            && position.y >= 0
            && position.x < self.width as i32
            && position.y < self.height as i32
    }
}

/// One node of a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Step {
    pub tile: Position,
    /// AP charged for entering this tile during strict-turn combat.
    pub move_cost: i32,
    /// Walkers stop after entering this tile even if more steps follow.
    pub end_step: bool,
}

impl Step {
    pub const fn new(tile: Position, move_cost: i32) -> Self {
        Self {
            tile,
            move_cost,
            end_step: false,
        }
    }

    #[must_use]
    pub const fn ending(mut self) -> Self {
        self.end_step = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Path {
    steps: Vec<Step>,
}

impl Path {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// Path through the given tiles with a uniform move cost.
    pub fn through(tiles: impl IntoIterator<Item = Position>, move_cost: i32) -> Self {
        Self::new(tiles.into_iter().map(|t| Step::new(t, move_cost)).collect())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn first(&self) -> Option<&Step> {
        self.steps.first()
    }

    pub fn last(&self) -> Option<&Step> {
        self.steps.last()
    }

    /// Drops up to `count` steps from the end.
    pub fn drop_last(&mut self, count: usize) {
        let keep = self.steps.len().saturating_sub(count);
        self.steps.truncate(keep);
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_last_saturates() {
        let mut path = Path::through([Position::new(0, 0), Position::new(1, 0)], 1);
        path.drop_last(5);
        assert!(path.is_empty());
    }

    #[test]
    fn dimensions_reject_negative_tiles() {
        let dims = MapDimensions::new(4, 4);
        assert!(dims.contains(Position::new(3, 3)));
        assert!(!dims.contains(Position::new(-1, 0)));
        assert!(!dims.contains(Position::new(4, 0)));
    }
}
