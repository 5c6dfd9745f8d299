use std::fmt;

/// Unique identifier for any entity or world object tracked in the world.
///
/// Actors and objects share one id space so a persisted target reference
/// never needs to know which kind it points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityId(pub u32);

impl EntityId {
    /// Reserved identifier for the lead player character.
    pub const PLAYER: Self = Self(0);

    /// Reserved identifier for world-level requests that no entity issued.
    pub const SYSTEM: Self = Self(u32::MAX);

    #[inline]
    pub const fn is_system(self) -> bool {
        self.0 == Self::SYSTEM.0
    }

    #[inline]
    pub const fn is_player(self) -> bool {
        self.0 == Self::PLAYER.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::PLAYER
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Discrete grid position expressed in tile coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance between tile coordinates.
    pub fn distance(self, other: Position) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    /// True when `other` is this tile or one of its eight neighbours.
    pub fn is_next_to_or_on(self, other: Position) -> bool {
        self.distance(other) < 2.0
    }

    pub fn to_world(self) -> WorldPos {
        WorldPos::new(self.x as f32, self.y as f32)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::ORIGIN
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Continuous position in tile units. Movement interpolates between tiles.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldPos {
    pub x: f32,
    pub y: f32,
}

impl WorldPos {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// The tile this position lies on.
    pub fn tile(self) -> Position {
        Position::new(self.x.floor() as i32, self.y.floor() as i32)
    }

    /// True when the position sits exactly on the given tile's origin.
    pub fn is_on(self, tile: Position) -> bool {
        self.x == tile.x as f32 && self.y == tile.y as f32
    }
}

impl From<Position> for WorldPos {
    fn from(value: Position) -> Self {
        value.to_world()
    }
}

/// Integer resource pool (AP, HP, SP, MP) tracked per actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceMeter {
    pub current: i32,
    pub maximum: i32,
}

impl ResourceMeter {
    pub const fn new(current: i32, maximum: i32) -> Self {
        Self { current, maximum }
    }

    pub const fn full(maximum: i32) -> Self {
        Self::new(maximum, maximum)
    }

    /// Adds (or with a negative delta, removes) points, clamped to `[0, maximum]`.
    pub fn add(&mut self, delta: i32) {
        self.current = (self.current.saturating_add(delta)).clamp(0, self.maximum);
    }

    pub fn refill(&mut self) {
        self.current = self.maximum;
    }

    pub fn is_empty(&self) -> bool {
        self.current <= 0
    }

    /// Current value as a percentage of the maximum.
    pub fn percent(&self) -> i32 {
        if self.maximum <= 0 {
            return 0;
        }
        self.current * 100 / self.maximum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_neighbours_count_as_adjacent() {
        let origin = Position::new(5, 5);
        assert!(origin.is_next_to_or_on(Position::new(6, 6)));
        assert!(origin.is_next_to_or_on(origin));
        assert!(!origin.is_next_to_or_on(Position::new(7, 5)));
    }

    #[test]
    fn meter_clamps_to_bounds() {
        let mut ap = ResourceMeter::full(10);
        ap.add(-14);
        assert_eq!(ap.current, 0);
        ap.add(25);
        assert_eq!(ap.current, 10);
        assert_eq!(ap.percent(), 100);
    }

    #[test]
    fn world_pos_tile_floors() {
        assert_eq!(WorldPos::new(3.7, 2.1).tile(), Position::new(3, 2));
        assert!(WorldPos::new(3.0, 2.0).is_on(Position::new(3, 2)));
    }
}
