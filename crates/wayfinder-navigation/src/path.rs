//! Smoothed paths for agents: waypoints paired with turn boundaries, and a
//! follower that tracks which waypoint an agent should steer toward.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use wayfinder_geometry::{TurnBoundary, WorldPoint};

use crate::error::NavigationError;

/// Look points with one turn boundary per point.
///
/// Boundary `i` is laid `turn_distance` before look point `i` (the last one
/// sits on the goal itself), so an agent starts turning toward the next
/// point before it reaches the current one.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    look_points: Vec<WorldPoint>,
    turn_boundaries: Vec<TurnBoundary>,
    finish_line_index: usize,
}

impl Path {
    /// Builds turn boundaries for `waypoints` as followed from `start`.
    ///
    /// # Arguments
    /// * `waypoints` - Look points in travel order, goal last.
    /// * `start` - Where the agent begins following.
    /// * `turn_distance` - How far before each waypoint the agent may turn.
    ///
    /// # Returns
    /// * `Result<Self, NavigationError>` - The path, or `EmptyPath` /
    ///   `InvalidParameter` for an empty waypoint list or a negative distance.
    pub fn new(waypoints: Vec<WorldPoint>, start: WorldPoint, turn_distance: f32) -> Result<Self, NavigationError> {
        if waypoints.is_empty() {
            return Err(NavigationError::EmptyPath);
        }
        if !(turn_distance.is_finite() && turn_distance >= 0.0) {
            return Err(NavigationError::InvalidParameter("Turn distance must be finite and non-negative"));
        }

        let finish_line_index = waypoints.len() - 1;
        let mut turn_boundaries = Vec::with_capacity(waypoints.len());
        let mut previous = start;
        for (i, &current) in waypoints.iter().enumerate() {
            let dir = (current - previous).normalized();
            let boundary_point = if i == finish_line_index {
                current
            } else {
                current - dir * turn_distance
            };
            turn_boundaries.push(TurnBoundary::new(boundary_point, previous - dir * turn_distance));
            previous = boundary_point;
        }

        Ok(Self {
            look_points: waypoints,
            turn_boundaries,
            finish_line_index,
        })
    }

    /// The waypoints to steer toward, in order.
    pub fn look_points(&self) -> &[WorldPoint] {
        &self.look_points
    }

    /// One boundary per look point.
    pub fn turn_boundaries(&self) -> &[TurnBoundary] {
        &self.turn_boundaries
    }

    /// Index of the boundary that ends the path.
    pub fn finish_line_index(&self) -> usize {
        self.finish_line_index
    }

    /// Number of look points.
    pub fn len(&self) -> usize {
        self.look_points.len()
    }

    /// Always false: a path holds at least one look point.
    pub fn is_empty(&self) -> bool {
        self.look_points.is_empty()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path [")?;
        for (i, point) in self.look_points.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{}", point)?;
        }
        write!(f, "]")
    }
}

/// Tracks progress along a [`Path`].
#[derive(Debug, Clone)]
pub struct PathFollower {
    path: Path,
    index: usize,
    finished: bool,
}

impl PathFollower {
    /// Starts following `path` from its first turn boundary.
    pub fn new(path: Path) -> Self {
        Self {
            path,
            index: 0,
            finished: false,
        }
    }

    /// Advances past every boundary `position` has crossed and returns the
    /// look point to steer toward, or `None` once the finish line is crossed.
    pub fn update(&mut self, position: WorldPoint) -> Option<WorldPoint> {
        if self.finished {
            return None;
        }
        while self.path.turn_boundaries[self.index].has_crossed_line(position) {
            if self.index == self.path.finish_line_index {
                self.finished = true;
                return None;
            }
            self.index += 1;
        }
        Some(self.path.look_points[self.index])
    }

    /// The current look point, or `None` when finished.
    pub fn look_point(&self) -> Option<WorldPoint> {
        (!self.finished).then(|| self.path.look_points[self.index])
    }

    /// Whether the finish line has been crossed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Index of the boundary currently watched.
    pub fn current_index(&self) -> usize {
        self.index
    }

    /// The path being followed.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
