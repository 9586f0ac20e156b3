//! Turn boundaries: lines laid perpendicular to the direction of travel.
//!
//! A path follower keeps steering toward a waypoint until it crosses the
//! boundary placed just before it. The crossing test compares which side of
//! the line a position lies on against the side recorded when the boundary
//! was built.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::point::WorldPoint;

/// Slope substituted for an undefined (vertical) or zero gradient.
const DELTA_WHEN_ZERO: f32 = 1e5;

/// A line through `point_on_line` perpendicular to the direction from
/// `approach_point` to `point_on_line`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnBoundary {
    /// Slope of the boundary line.
    gradient: f32,
    /// Y-axis intercept of the boundary line.
    y_intercept: f32,
    /// Anchor of the line.
    point_on_line_1: WorldPoint,
    /// A second point on the line, one unit along x from the anchor.
    point_on_line_2: WorldPoint,
    /// Side of the line the approach point lies on.
    approach_side: bool,
}

impl TurnBoundary {
    /// Builds the boundary through `point_on_line`, perpendicular to the
    /// travel direction `approach_point -> point_on_line`.
    ///
    /// Coincident points (zero displacement) do not fail: the undefined slope
    /// is replaced by a large finite constant.
    ///
    /// # Arguments
    ///
    /// * `point_on_line`: Anchor of the boundary.
    /// * `approach_point`: Point the agent approaches from; its side of the
    ///   line becomes the recorded approach side.
    pub fn new(point_on_line: WorldPoint, approach_point: WorldPoint) -> Self {
        let dx = point_on_line.x - approach_point.x;
        let dy = point_on_line.y - approach_point.y;

        let gradient_perpendicular = if dx == 0.0 {
            DELTA_WHEN_ZERO
        } else {
            dy / dx
        };

        let gradient = if gradient_perpendicular == 0.0 {
            DELTA_WHEN_ZERO
        } else {
            -1.0 / gradient_perpendicular
        };

        let mut boundary = TurnBoundary {
            gradient,
            y_intercept: point_on_line.y - gradient * point_on_line.x,
            point_on_line_1: point_on_line,
            point_on_line_2: point_on_line + WorldPoint::new(1.0, gradient),
            approach_side: false,
        };
        boundary.approach_side = boundary.side(approach_point);
        boundary
    }

    /// Which half-plane `p` lies in.
    fn side(&self, p: WorldPoint) -> bool {
        let a = self.point_on_line_1;
        let b = self.point_on_line_2;
        (p.x - a.x) * (b.y - a.y) > (p.y - a.y) * (b.x - a.x)
    }

    /// Returns `true` when `p` is on the opposite side of the line from the
    /// recorded approach side.
    pub fn has_crossed_line(&self, p: WorldPoint) -> bool {
        self.side(p) != self.approach_side
    }

    /// Perpendicular distance from `p` to the boundary line.
    pub fn distance_from_point(&self, p: WorldPoint) -> f32 {
        // Intersection of the line with its perpendicular through `p`.
        let y_intercept_perpendicular = p.y - p.x / -self.gradient;
        let intersect_x = (y_intercept_perpendicular - self.y_intercept)
            / (self.gradient + 1.0 / self.gradient);
        let intersect_y = self.gradient * intersect_x + self.y_intercept;
        p.distance(&WorldPoint::new(intersect_x, intersect_y))
    }

    /// Anchor point of the line.
    pub fn anchor(&self) -> WorldPoint {
        self.point_on_line_1
    }

    /// Slope of the line.
    pub fn gradient(&self) -> f32 {
        self.gradient
    }

    /// Side recorded for the approach point.
    pub fn approach_side(&self) -> bool {
        self.approach_side
    }
}

impl fmt::Display for TurnBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TurnBoundary (anchor: {}, gradient: {:.3})",
            self.point_on_line_1, self.gradient
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crossing_vertical_travel() {
        // Travel from (0,-1) toward (0,0): the boundary is (almost) the x-axis.
        let boundary = TurnBoundary::new(WorldPoint::new(0.0, 0.0), WorldPoint::new(0.0, -1.0));
        assert!(!boundary.has_crossed_line(WorldPoint::new(0.0, -1.0)));
        assert!(boundary.has_crossed_line(WorldPoint::new(0.0, 1.0)));
    }

    #[test]
    fn test_crossing_horizontal_travel() {
        // Travel along +x into (2,1): boundary is the vertical line x = 2.
        let boundary = TurnBoundary::new(WorldPoint::new(2.0, 1.0), WorldPoint::new(0.0, 1.0));
        assert_eq!(boundary.gradient(), DELTA_WHEN_ZERO);
        assert!(!boundary.has_crossed_line(WorldPoint::new(1.5, 1.0)));
        assert!(!boundary.has_crossed_line(WorldPoint::new(1.9, 7.0)));
        assert!(boundary.has_crossed_line(WorldPoint::new(2.1, 1.0)));
        assert!(boundary.has_crossed_line(WorldPoint::new(3.0, -4.0)));
    }

    #[test]
    fn test_crossing_diagonal_travel() {
        // Travel along (1,1) into (1,1): boundary is x + y = 2.
        let boundary = TurnBoundary::new(WorldPoint::new(1.0, 1.0), WorldPoint::new(0.0, 0.0));
        assert!((boundary.gradient() + 1.0).abs() < 1e-6);
        assert!(!boundary.has_crossed_line(WorldPoint::new(0.5, 0.5)));
        assert!(!boundary.has_crossed_line(WorldPoint::new(2.0, -0.5)));
        assert!(boundary.has_crossed_line(WorldPoint::new(1.2, 1.2)));
        assert!(boundary.has_crossed_line(WorldPoint::new(-1.0, 3.5)));
    }

    #[test]
    fn test_crossing_reversed_travel() {
        // Travel along -x: the approach side flips relative to +x travel.
        let forward = TurnBoundary::new(WorldPoint::new(0.0, 0.0), WorldPoint::new(-1.0, 0.0));
        let backward = TurnBoundary::new(WorldPoint::new(0.0, 0.0), WorldPoint::new(1.0, 0.0));
        assert_ne!(forward.approach_side(), backward.approach_side());
        assert!(backward.has_crossed_line(WorldPoint::new(-0.5, 0.0)));
        assert!(!backward.has_crossed_line(WorldPoint::new(0.5, 0.0)));
    }

    #[test]
    fn test_degenerate_direction_is_finite() {
        let p = WorldPoint::new(3.0, 3.0);
        let boundary = TurnBoundary::new(p, p);
        assert!(boundary.gradient().is_finite());
        assert!(boundary.distance_from_point(WorldPoint::new(3.0, 5.0)).is_finite());
        // The approach point lies on the line itself, which counts as "not crossed".
        assert!(!boundary.has_crossed_line(p));
    }

    #[test]
    fn test_distance_from_point() {
        let boundary = TurnBoundary::new(WorldPoint::new(1.0, 1.0), WorldPoint::new(0.0, 0.0));
        // Line x + y = 2; distance from the origin is sqrt(2).
        let d = boundary.distance_from_point(WorldPoint::new(0.0, 0.0));
        assert!((d - core::f32::consts::SQRT_2).abs() < 1e-4, "distance was {}", d);
        assert!(boundary.distance_from_point(WorldPoint::new(2.0, 0.0)) < 1e-4);
    }
}
