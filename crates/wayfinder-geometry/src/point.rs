//! World and grid point types.

use core::fmt;
use core::ops::{Add, Mul, Neg, Sub};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Represents a point in grid coordinates (cell indices).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct GridPoint {
    /// The x-coordinate (column index) in the grid.
    pub x: usize,
    /// The y-coordinate (row index) in the grid.
    pub y: usize,
}

impl GridPoint {
    /// Creates a new `GridPoint`.
    #[must_use]
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Signed step from `self` to `other`, one of the eight compass directions
    /// (or `(0, 0)` when the points coincide) for adjacent cells.
    #[must_use]
    pub fn offset_to(&self, other: &GridPoint) -> (isize, isize) {
        (
            other.x as isize - self.x as isize,
            other.y as isize - self.y as isize,
        )
    }
}

impl fmt::Display for GridPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

/// Represents a point (or displacement) in world coordinates.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd)]
pub struct WorldPoint {
    /// The x-coordinate.
    pub x: f32,
    /// The y-coordinate.
    pub y: f32,
}

impl WorldPoint {
    /// The origin `(0, 0)`.
    pub const ZERO: WorldPoint = WorldPoint::new(0.0, 0.0);

    /// Creates a new `WorldPoint`.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `angle` (radians, counter-clockwise from +x).
    #[must_use]
    pub fn from_angle(angle: f32) -> Self {
        Self::new(libm::cosf(angle), libm::sinf(angle))
    }

    /// Euclidean length of the vector from the origin to this point.
    #[must_use]
    pub fn length(&self) -> f32 {
        libm::sqrtf(self.length_squared())
    }

    /// Squared Euclidean length.
    #[must_use]
    pub fn length_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Distance between two points.
    #[must_use]
    pub fn distance(&self, other: &WorldPoint) -> f32 {
        (*other - *self).length()
    }

    /// Returns the vector scaled to unit length, or [`WorldPoint::ZERO`] for a
    /// zero-length vector.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let len = self.length();
        if len > f32::EPSILON {
            Self::new(self.x / len, self.y / len)
        } else {
            Self::ZERO
        }
    }

    /// Heading of the vector in radians, in `(-PI, PI]`.
    #[must_use]
    pub fn angle(&self) -> f32 {
        libm::atan2f(self.y, self.x)
    }
}

impl Add for WorldPoint {
    type Output = WorldPoint;

    fn add(self, rhs: WorldPoint) -> WorldPoint {
        WorldPoint::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for WorldPoint {
    type Output = WorldPoint;

    fn sub(self, rhs: WorldPoint) -> WorldPoint {
        WorldPoint::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for WorldPoint {
    type Output = WorldPoint;

    fn mul(self, rhs: f32) -> WorldPoint {
        WorldPoint::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for WorldPoint {
    type Output = WorldPoint;

    fn neg(self) -> WorldPoint {
        WorldPoint::new(-self.x, -self.y)
    }
}

impl fmt::Display for WorldPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}
