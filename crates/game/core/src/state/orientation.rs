//! Eight-way facing used for movement, attack facing bonuses and animation.
//!
//! The y axis points up: `Up` is `(0, +1)`.

use strum::{AsRefStr, EnumIter, EnumString};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, AsRefStr, EnumString, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum Orientation {
    #[default]
    Up,
    UpRight,
    Right,
    DownRight,
    Down,
    DownLeft,
    Left,
    UpLeft,
}

impl Orientation {
    const RING: [Orientation; 8] = [
        Self::Up,
        Self::UpRight,
        Self::Right,
        Self::DownRight,
        Self::Down,
        Self::DownLeft,
        Self::Left,
        Self::UpLeft,
    ];

    const fn index(self) -> usize {
        self as usize
    }

    pub const fn degrees(self) -> u32 {
        self.index() as u32 * 45
    }

    pub fn clockwise(self) -> Self {
        Self::RING[(self.index() + 1) % 8]
    }

    pub fn anticlockwise(self) -> Self {
        Self::RING[(self.index() + 7) % 8]
    }

    pub fn opposite(self) -> Self {
        Self::RING[(self.index() + 4) % 8]
    }

    /// True if the two facings are no more than 45 degrees apart.
    pub fn roughly_matches(self, other: Orientation) -> bool {
        self == other || self.clockwise() == other || self.anticlockwise() == other
    }

    /// Facing needed to look along the delta `(dx, dy)`.
    ///
    /// The angle is measured clockwise from `Up` and snapped to 45 degree
    /// sectors. Isometric maps render the grid rotated, so the result is
    /// turned one more step clockwise there.
    pub fn toward_delta(isometric: bool, dx: f32, dy: f32) -> Self {
        let mut facing = Self::Up;
        if dx != 0.0 || dy != 0.0 {
            let mut angle = (dx / dy).abs().atan().to_degrees().round();
            if dx >= 0.0 && dy < 0.0 {
                angle = 180.0 - angle;
            } else if dx < 0.0 && dy < 0.0 {
                angle = 180.0 + angle;
            } else if dx < 0.0 && dy >= 0.0 {
                angle = 360.0 - angle;
            }

            let half = 22.5_f32;
            let mut bound = half;
            while bound < 337.5 && angle > bound && angle < 337.5 {
                facing = facing.clockwise();
                bound += half * 2.0;
            }
        }

        if isometric { facing.clockwise() } else { facing }
    }

    pub fn toward(isometric: bool, from: crate::state::WorldPos, to: crate::state::WorldPos) -> Self {
        Self::toward_delta(isometric, to.x - from.x, to.y - from.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn ring_navigation_is_consistent() {
        for facing in Orientation::iter() {
            assert_eq!(facing.clockwise().anticlockwise(), facing);
            assert_eq!(facing.opposite().opposite(), facing);
        }
        assert_eq!(Orientation::Up.opposite(), Orientation::Down);
        assert_eq!(Orientation::UpLeft.clockwise(), Orientation::Up);
    }

    #[test]
    fn orthogonal_deltas_snap_to_sectors() {
        assert_eq!(Orientation::toward_delta(false, 0.0, 1.0), Orientation::Up);
        assert_eq!(Orientation::toward_delta(false, 1.0, 1.0), Orientation::UpRight);
        assert_eq!(Orientation::toward_delta(false, 1.0, 0.0), Orientation::Right);
        assert_eq!(Orientation::toward_delta(false, 1.0, -1.0), Orientation::DownRight);
        assert_eq!(Orientation::toward_delta(false, 0.0, -1.0), Orientation::Down);
        assert_eq!(Orientation::toward_delta(false, -1.0, -1.0), Orientation::DownLeft);
        assert_eq!(Orientation::toward_delta(false, -1.0, 0.0), Orientation::Left);
        assert_eq!(Orientation::toward_delta(false, -1.0, 1.0), Orientation::UpLeft);
    }

    #[test]
    fn isometric_turns_one_extra_step() {
        assert_eq!(Orientation::toward_delta(true, 0.0, 1.0), Orientation::UpRight);
        assert_eq!(Orientation::toward_delta(true, -1.0, 1.0), Orientation::Up);
    }

    #[test]
    fn names_round_trip_through_strum() {
        assert_eq!(Orientation::DownLeft.as_ref(), "down_left");
        assert_eq!("up_right".parse::<Orientation>().ok(), Some(Orientation::UpRight));
    }
}
