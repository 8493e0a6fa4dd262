//! Integer grid coordinates and the nine-way compass used for headings.

use std::f64::consts::{PI, TAU};
use std::fmt;
use std::ops::{Add, Neg, Sub};

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

/// One of the eight compass headings, or `Center` for "no movement".
///
/// Discriminants are laid out so that `index % 3 - 1` and `index / 3 - 1`
/// give the x and y unit offsets, with north pointing towards larger `y`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Dir {
    SouthWest = 0,
    South,
    SouthEast,
    West,
    #[default]
    Center,
    East,
    NorthWest,
    North,
    NorthEast,
}

const ROTATE_RIGHT: [u8; 9] = [3, 0, 1, 6, 4, 2, 7, 8, 5];
const ROTATE_LEFT: [u8; 9] = [1, 2, 5, 0, 4, 8, 3, 6, 7];

impl Dir {
    /// All nine headings in discriminant order.
    pub const ALL: [Dir; 9] = [
        Dir::SouthWest,
        Dir::South,
        Dir::SouthEast,
        Dir::West,
        Dir::Center,
        Dir::East,
        Dir::NorthWest,
        Dir::North,
        Dir::NorthEast,
    ];

    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Look up a heading by discriminant.
    #[must_use]
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Uniformly sample one of the eight non-center headings.
    pub fn random8(rng: &mut dyn RngCore) -> Self {
        Dir::North.rotate(rng.random_range(0..8))
    }

    /// Rotate by `n` eighth-turns; positive is clockwise. `Center` is fixed.
    #[must_use]
    pub fn rotate(self, n: i32) -> Self {
        let mut index = self.index();
        if n < 0 {
            for _ in 0..n.unsigned_abs() {
                index = ROTATE_LEFT[index as usize];
            }
        } else {
            for _ in 0..n {
                index = ROTATE_RIGHT[index as usize];
            }
        }
        Self::ALL[index as usize]
    }

    #[must_use]
    pub fn rotate_90_cw(self) -> Self {
        self.rotate(2)
    }

    #[must_use]
    pub fn rotate_90_ccw(self) -> Self {
        self.rotate(-2)
    }

    /// Unit offset for this heading; each component is in `-1..=1`.
    #[must_use]
    pub const fn as_normalized_coord(self) -> Coord {
        let d = self as i32;
        Coord::new(d % 3 - 1, d / 3 - 1)
    }

    #[must_use]
    pub fn is_center(self) -> bool {
        self == Dir::Center
    }
}

/// Signed integer location or offset on the grid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean length truncated towards zero.
    #[must_use]
    pub fn length(self) -> i32 {
        let sq = f64::from(self.x) * f64::from(self.x) + f64::from(self.y) * f64::from(self.y);
        sq.sqrt() as i32
    }

    /// Quantize this offset to the nearest of the eight compass headings.
    #[must_use]
    pub fn as_dir(self) -> Dir {
        if self.x == 0 && self.y == 0 {
            return Dir::Center;
        }
        const CONVERSION: [Dir; 8] = [
            Dir::East,
            Dir::NorthEast,
            Dir::North,
            Dir::NorthWest,
            Dir::West,
            Dir::SouthWest,
            Dir::South,
            Dir::SouthEast,
        ];
        let mut angle = f64::from(self.y).atan2(f64::from(self.x));
        if angle < 0.0 {
            angle += TAU;
        }
        angle += PI / 8.0;
        if angle >= TAU {
            angle -= TAU;
        }
        let slice = ((angle / (TAU / 8.0)) as usize).min(7);
        CONVERSION[slice]
    }
}

impl Add for Coord {
    type Output = Coord;

    fn add(self, rhs: Coord) -> Coord {
        Coord::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Coord {
    type Output = Coord;

    fn sub(self, rhs: Coord) -> Coord {
        Coord::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Add<Dir> for Coord {
    type Output = Coord;

    fn add(self, rhs: Dir) -> Coord {
        self + rhs.as_normalized_coord()
    }
}

impl Sub<Dir> for Coord {
    type Output = Coord;

    fn sub(self, rhs: Dir) -> Coord {
        self - rhs.as_normalized_coord()
    }
}

impl Neg for Coord {
    type Output = Coord;

    fn neg(self) -> Coord {
        Coord::new(-self.x, -self.y)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn normalized_offsets_follow_compass_layout() {
        assert_eq!(Dir::SouthWest.as_normalized_coord(), Coord::new(-1, -1));
        assert_eq!(Dir::North.as_normalized_coord(), Coord::new(0, 1));
        assert_eq!(Dir::East.as_normalized_coord(), Coord::new(1, 0));
        assert_eq!(Dir::Center.as_normalized_coord(), Coord::new(0, 0));
    }

    #[test]
    fn rotation_is_clockwise_and_invertible() {
        assert_eq!(Dir::North.rotate_90_cw(), Dir::East);
        assert_eq!(Dir::North.rotate_90_ccw(), Dir::West);
        assert_eq!(Dir::NorthEast.rotate(4), Dir::SouthWest);
        assert_eq!(Dir::Center.rotate(3), Dir::Center);
        for dir in Dir::ALL {
            assert_eq!(dir.rotate(3).rotate(-3), dir);
            assert_eq!(dir.rotate(8), dir);
        }
    }

    #[test]
    fn as_dir_round_trips_unit_offsets() {
        for dir in Dir::ALL {
            assert_eq!(dir.as_normalized_coord().as_dir(), dir);
        }
        assert_eq!(Coord::new(5, 1).as_dir(), Dir::East);
        assert_eq!(Coord::new(-3, -3).as_dir(), Dir::SouthWest);
    }

    #[test]
    fn random8_never_yields_center() {
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..200 {
            assert_ne!(Dir::random8(&mut rng), Dir::Center);
        }
    }

    #[test]
    fn length_truncates() {
        assert_eq!(Coord::new(3, 4).length(), 5);
        assert_eq!(Coord::new(1, 1).length(), 1);
        assert_eq!((Coord::new(2, 2) - Dir::North).y, 1);
    }
}
