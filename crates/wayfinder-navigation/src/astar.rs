/*

A* = f(n) = g(n) + h(n)

Where:
    n = a cell of the grid
    g(n) = cost from the start to n: octile step costs plus the movement
           penalty of every entered cell
    h(n) = octile distance from n to the goal
    f(n) = estimated cost of the cheapest path through n

Movement penalties are never negative, so h never overestimates and is
consistent on the 8-connected grid: the first time the goal is extracted
from the open set its g is minimal.

*/

use std::fmt;
use std::time::Instant;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;
use wayfinder_geometry::{GridPoint, WorldPoint};

use crate::grid::WorldGrid;
use crate::heap::{PriorityQueue, SearchKey};

/// Cost of an orthogonal step.
pub const STRAIGHT_COST: u32 = 10;
/// Cost of a diagonal step (10 * sqrt(2), rounded).
pub const DIAGONAL_COST: u32 = 14;

/// Why a search produced no path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PathFailure {
    /// The start cell is not walkable (or not on the grid).
    StartBlocked,
    /// The goal cell is not walkable (or not on the grid).
    GoalBlocked,
    /// The open set ran dry before the goal was reached.
    Unreachable,
}

impl fmt::Display for PathFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathFailure::StartBlocked => write!(f, "start cell is not walkable"),
            PathFailure::GoalBlocked => write!(f, "goal cell is not walkable"),
            PathFailure::Unreachable => write!(f, "goal is unreachable"),
        }
    }
}

/// Represents the result of an A* pathfinding operation with metadata.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PathResult<T> {
    /// The computed path; empty when no path was found.
    pub path: Vec<T>,
    /// Whether a path was found.
    pub success: bool,
    /// The total cost of the path (step costs plus penalties).
    pub total_cost: Option<u32>,
    /// The number of cells expanded during the search.
    pub nodes_explored: usize,
    /// Why the search failed, if it did.
    pub failure: Option<PathFailure>,
}

impl<T> PathResult<T> {
    /// Creates a new PathResult for a successful path.
    pub fn success(path: Vec<T>, total_cost: u32, nodes_explored: usize) -> Self {
        Self {
            path,
            success: true,
            total_cost: Some(total_cost),
            nodes_explored,
            failure: None,
        }
    }

    /// Creates a new PathResult for a failed path search.
    pub fn failure(reason: PathFailure, nodes_explored: usize) -> Self {
        Self {
            path: Vec::new(),
            success: false,
            total_cost: None,
            nodes_explored,
            failure: Some(reason),
        }
    }

    /// Returns true if a path was found.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// The found points, empty on failure.
    pub fn waypoints(&self) -> &[T] {
        &self.path
    }

    /// Returns the path if one was found.
    pub fn into_path(self) -> Option<Vec<T>> {
        self.success.then_some(self.path)
    }
}

impl<T> fmt::Display for PathResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failure {
            None => write!(
                f,
                "PathResult {{ success: true, path_length: {}, total_cost: {}, nodes_explored: {} }}",
                self.path.len(),
                self.total_cost.unwrap_or(0),
                self.nodes_explored
            ),
            Some(reason) => write!(
                f,
                "PathResult {{ success: false, reason: {}, nodes_explored: {} }}",
                reason, self.nodes_explored
            ),
        }
    }
}

/// Integer octile distance between two cells: diagonal steps cost 14,
/// orthogonal steps cost 10.
pub fn octile_distance(a: &GridPoint, b: &GridPoint) -> u32 {
    let dx = a.x.abs_diff(b.x) as u32;
    let dy = a.y.abs_diff(b.y) as u32;
    let (min, max) = if dx < dy { (dx, dy) } else { (dy, dx) };
    DIAGONAL_COST * min + STRAIGHT_COST * (max - min)
}

/// Per-search bookkeeping, addressed by cell index. Kept apart from the grid
/// so the grid stays immutable and shareable.
#[derive(Debug, Clone)]
struct SearchState {
    g_cost: Vec<u32>,
    h_cost: Vec<u32>,
    parent: Vec<Option<usize>>,
    closed: Vec<bool>,
    open: PriorityQueue,
}

impl SearchState {
    fn new(capacity: usize) -> Self {
        Self {
            g_cost: vec![u32::MAX; capacity],
            h_cost: vec![0; capacity],
            parent: vec![None; capacity],
            closed: vec![false; capacity],
            open: PriorityQueue::new(capacity),
        }
    }

    fn reset(&mut self, capacity: usize) {
        if self.open.capacity() != capacity {
            *self = SearchState::new(capacity);
            return;
        }
        self.g_cost.fill(u32::MAX);
        self.h_cost.fill(0);
        self.parent.fill(None);
        self.closed.fill(false);
        self.open.clear();
    }
}

/// Runs A* searches over a [`WorldGrid`].
///
/// A `Pathfinder` owns the scratch state of one search at a time and reuses
/// it across calls. Concurrent searches over the same grid each need their
/// own `Pathfinder`.
#[derive(Debug, Clone)]
pub struct Pathfinder {
    state: SearchState,
}

impl Pathfinder {
    /// Creates a pathfinder for grids with `capacity` cells.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: SearchState::new(capacity),
        }
    }

    /// Creates a pathfinder sized for `grid`.
    pub fn for_grid(grid: &WorldGrid) -> Self {
        Self::new(grid.capacity())
    }

    /// Finds a path between two world positions and reduces it to waypoints.
    ///
    /// Positions are mapped to cells with [`WorldGrid::node_index_at`]. The
    /// waypoints are the world positions of the cells where the direction of
    /// travel changes, followed by the goal cell. The start cell is not
    /// included unless it is also the goal.
    ///
    /// # Arguments
    /// * `grid` - The grid to plan in.
    /// * `start` - Starting position in world coordinates.
    /// * `goal` - Goal position in world coordinates.
    ///
    /// # Returns
    /// * `PathResult<WorldPoint>` - Waypoints and search metadata; empty on failure.
    pub fn find_path(&mut self, grid: &WorldGrid, start: WorldPoint, goal: WorldPoint) -> PathResult<WorldPoint> {
        let started = Instant::now();
        let start_index = grid.node_index_at(start);
        let goal_index = grid.node_index_at(goal);

        let result = match self.search(grid, start_index, goal_index) {
            Ok((total_cost, nodes_explored)) => {
                let cells = self.retrace(start_index, goal_index);
                PathResult::success(simplify(grid, &cells), total_cost, nodes_explored)
            }
            Err((reason, nodes_explored)) => PathResult::failure(reason, nodes_explored),
        };

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        match result.failure {
            None => debug!(
                start = %grid.node(start_index).grid,
                goal = %grid.node(goal_index).grid,
                waypoints = result.path.len(),
                total_cost = result.total_cost.unwrap_or(0),
                nodes_explored = result.nodes_explored,
                elapsed_ms,
                "Path found"
            ),
            Some(reason) => debug!(
                start = %grid.node(start_index).grid,
                goal = %grid.node(goal_index).grid,
                %reason,
                nodes_explored = result.nodes_explored,
                elapsed_ms,
                "No path"
            ),
        }
        result
    }

    /// Finds a path between two cells and returns every cell on it, start to
    /// goal inclusive.
    ///
    /// # Arguments
    /// * `grid` - The grid to plan in.
    /// * `start` - Starting cell.
    /// * `goal` - Goal cell.
    ///
    /// # Returns
    /// * `PathResult<GridPoint>` - The full cell path and search metadata.
    pub fn find_cell_path(&mut self, grid: &WorldGrid, start: GridPoint, goal: GridPoint) -> PathResult<GridPoint> {
        let Ok(start_index) = grid.index_of(start) else {
            return PathResult::failure(PathFailure::StartBlocked, 0);
        };
        let Ok(goal_index) = grid.index_of(goal) else {
            return PathResult::failure(PathFailure::GoalBlocked, 0);
        };

        match self.search(grid, start_index, goal_index) {
            Ok((total_cost, nodes_explored)) => {
                let cells = self
                    .retrace(start_index, goal_index)
                    .into_iter()
                    .map(|i| grid.node(i).grid)
                    .collect();
                PathResult::success(cells, total_cost, nodes_explored)
            }
            Err((reason, nodes_explored)) => PathResult::failure(reason, nodes_explored),
        }
    }

    /// Core A* loop. Returns the goal's cost and the number of expanded cells,
    /// or the failure reason and the number of expanded cells.
    fn search(
        &mut self,
        grid: &WorldGrid,
        start: usize,
        goal: usize,
    ) -> Result<(u32, usize), (PathFailure, usize)> {
        if !grid.node(start).walkable {
            return Err((PathFailure::StartBlocked, 0));
        }
        if !grid.node(goal).walkable {
            return Err((PathFailure::GoalBlocked, 0));
        }

        let state = &mut self.state;
        state.reset(grid.capacity());

        let goal_point = grid.node(goal).grid;
        let start_h = octile_distance(&grid.node(start).grid, &goal_point);
        state.g_cost[start] = 0;
        state.h_cost[start] = start_h;
        state.open.insert(start, SearchKey::new(0, start_h));

        let mut nodes_explored = 0;
        while let Some(current) = state.open.extract_min() {
            state.closed[current] = true;
            nodes_explored += 1;

            if current == goal {
                return Ok((state.g_cost[goal], nodes_explored));
            }

            let current_node = grid.node(current);
            for neighbor in grid.neighbors(current) {
                let neighbor_node = grid.node(neighbor);
                if !neighbor_node.walkable || state.closed[neighbor] {
                    continue;
                }

                let tentative_g = state.g_cost[current]
                    .saturating_add(octile_distance(&current_node.grid, &neighbor_node.grid))
                    .saturating_add(neighbor_node.movement_penalty);
                let is_open = state.open.contains(neighbor);

                if tentative_g < state.g_cost[neighbor] || !is_open {
                    let h = octile_distance(&neighbor_node.grid, &goal_point);
                    state.g_cost[neighbor] = tentative_g;
                    state.h_cost[neighbor] = h;
                    state.parent[neighbor] = Some(current);

                    let key = SearchKey::new(tentative_g, h);
                    if is_open {
                        state.open.decrease_key(neighbor, key);
                    } else {
                        state.open.insert(neighbor, key);
                    }
                }
            }
        }

        Err((PathFailure::Unreachable, nodes_explored))
    }

    /// Follows parent links from the goal back to the start and returns the
    /// cells in start-to-goal order.
    fn retrace(&self, start: usize, goal: usize) -> Vec<usize> {
        let mut path = vec![goal];
        let mut current = goal;
        while current != start {
            match self.state.parent[current] {
                Some(previous) => {
                    path.push(previous);
                    current = previous;
                }
                None => break,
            }
        }
        path.reverse();
        path
    }
}

/// Reduces a start-to-goal cell sequence to the cells where the direction of
/// travel changes, plus the goal. The start cell is left out because the
/// agent is already standing there; a single-cell path yields the goal.
fn simplify(grid: &WorldGrid, cells: &[usize]) -> Vec<WorldPoint> {
    if let [only] = cells {
        return vec![grid.node(*only).world];
    }

    let step = |from: usize, to: usize| grid.node(from).grid.offset_to(&grid.node(to).grid);
    let mut waypoints = Vec::new();
    for i in 1..cells.len() {
        let incoming = step(cells[i - 1], cells[i]);
        let outgoing = cells.get(i + 1).map(|&next| step(cells[i], next));
        if outgoing != Some(incoming) {
            waypoints.push(grid.node(cells[i]).world);
        }
    }
    waypoints
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerrainPenalty;
    use crate::grid::tests::grid_from_rows;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::cmp::Reverse;
    use std::collections::BinaryHeap;

    /// Exhaustive Dijkstra over the same cost model, used as a reference.
    fn reference_cost(grid: &WorldGrid, start: usize, goal: usize) -> Option<u32> {
        if !grid.node(start).walkable || !grid.node(goal).walkable {
            return None;
        }
        let mut dist = vec![u32::MAX; grid.capacity()];
        let mut queue = BinaryHeap::new();
        dist[start] = 0;
        queue.push(Reverse((0u32, start)));
        while let Some(Reverse((d, current))) = queue.pop() {
            if d > dist[current] {
                continue;
            }
            if current == goal {
                return Some(d);
            }
            for n in grid.neighbors(current) {
                let node = grid.node(n);
                if !node.walkable {
                    continue;
                }
                let cost = d + octile_distance(&grid.node(current).grid, &node.grid) + node.movement_penalty;
                if cost < dist[n] {
                    dist[n] = cost;
                    queue.push(Reverse((cost, n)));
                }
            }
        }
        None
    }

    /// Cost of walking a cell path under the search's cost model.
    fn walked_cost(grid: &WorldGrid, cells: &[GridPoint]) -> u32 {
        cells
            .windows(2)
            .map(|pair| {
                let entered = grid.node_at_grid(pair[1]).unwrap();
                octile_distance(&pair[0], &pair[1]) + entered.movement_penalty
            })
            .sum()
    }

    fn cell_center(p: GridPoint) -> WorldPoint {
        WorldPoint::new(p.x as f32 + 0.5, p.y as f32 + 0.5)
    }

    #[test]
    fn test_octile_distance() {
        assert_eq!(octile_distance(&GridPoint::new(0, 0), &GridPoint::new(3, 5)), 62);
        assert_eq!(octile_distance(&GridPoint::new(3, 5), &GridPoint::new(0, 0)), 62);
        assert_eq!(octile_distance(&GridPoint::new(2, 2), &GridPoint::new(2, 2)), 0);
        assert_eq!(octile_distance(&GridPoint::new(0, 0), &GridPoint::new(1, 1)), DIAGONAL_COST);
        assert_eq!(octile_distance(&GridPoint::new(4, 0), &GridPoint::new(0, 0)), 40);
    }

    #[test]
    fn test_straight_line_path() {
        let grid = grid_from_rows(&["......"], |_| {});
        let mut pathfinder = Pathfinder::for_grid(&grid);
        let result = pathfinder.find_path(&grid, cell_center(GridPoint::new(0, 0)), cell_center(GridPoint::new(5, 0)));

        assert!(result.is_success());
        assert_eq!(result.total_cost, Some(50));
        // A straight run collapses to the goal alone.
        assert_eq!(result.waypoints(), &[cell_center(GridPoint::new(5, 0))]);
    }

    #[test]
    fn test_waypoints_mark_direction_changes() {
        let rows = [
            "......", //
            ".####.", //
            ".#....", //
            ".#.##.", //
            "......", //
        ];
        let grid = grid_from_rows(&rows, |_| {});
        let mut pathfinder = Pathfinder::for_grid(&grid);
        let start = GridPoint::new(0, 4);
        let goal = GridPoint::new(2, 2);

        let cells = pathfinder.find_cell_path(&grid, start, goal);
        assert!(cells.is_success());
        assert_eq!(cells.path.first(), Some(&start));
        assert_eq!(cells.path.last(), Some(&goal));
        for pair in cells.path.windows(2) {
            let (dx, dy) = pair[0].offset_to(&pair[1]);
            assert!(dx.abs() <= 1 && dy.abs() <= 1 && (dx, dy) != (0, 0));
            assert!(grid.node_at_grid(pair[1]).unwrap().walkable);
        }

        let result = pathfinder.find_path(&grid, cell_center(start), cell_center(goal));
        assert!(result.is_success());
        assert_eq!(result.total_cost, cells.total_cost);
        assert_eq!(result.waypoints().last(), Some(&cell_center(goal)));

        // With the start prepended, consecutive legs never share a direction.
        let mut points = vec![start];
        points.extend(result.waypoints().iter().map(|w| grid.node_at(*w).grid));
        let directions: Vec<(isize, isize)> = points
            .windows(2)
            .map(|pair| {
                let (dx, dy) = pair[0].offset_to(&pair[1]);
                (dx.signum(), dy.signum())
            })
            .collect();
        assert!(!directions.is_empty());
        for pair in directions.windows(2) {
            assert_ne!(pair[0], pair[1], "consecutive waypoint legs share a direction");
        }
    }

    #[test]
    fn test_prefers_cheap_terrain() {
        // Crossing the expensive middle row is shorter but costs more than the detour.
        let rows = [
            ".......", //
            "#99999.", //
            ".......", //
        ];
        let grid = grid_from_rows(&rows, |c| {
            c.terrain_penalties = vec![TerrainPenalty { class: 9, penalty: 100 }];
        });
        let mut pathfinder = Pathfinder::for_grid(&grid);
        let result = pathfinder.find_cell_path(&grid, GridPoint::new(1, 0), GridPoint::new(1, 2));
        assert!(result.is_success());
        assert!(result.path.iter().all(|p| p.y != 1 || p.x == 6), "path entered expensive terrain: {:?}", result.path);
        assert_eq!(result.total_cost, reference_cost(&grid, grid.index_of(GridPoint::new(1, 0)).unwrap(), grid.index_of(GridPoint::new(1, 2)).unwrap()));
    }

    #[test]
    fn test_cost_is_optimal_on_random_worlds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..40 {
            let width = rng.random_range(4..14);
            let height = rng.random_range(4..14);
            let rows: Vec<String> = (0..height)
                .map(|_| {
                    (0..width)
                        .map(|_| match rng.random_range(0..10) {
                            0 | 1 => '#',
                            2 => '1',
                            3 => '2',
                            _ => '.',
                        })
                        .collect()
                })
                .collect();
            let row_refs: Vec<&str> = rows.iter().map(String::as_str).collect();
            let blur = rng.random_range(0..3);
            let grid = grid_from_rows(&row_refs, |c| {
                c.terrain_penalties = vec![
                    TerrainPenalty { class: 1, penalty: 15 },
                    TerrainPenalty { class: 2, penalty: 60 },
                ];
                c.blur_radius = blur;
            });

            let mut pathfinder = Pathfinder::for_grid(&grid);
            for _ in 0..10 {
                let start = GridPoint::new(rng.random_range(0..width), rng.random_range(0..height));
                let goal = GridPoint::new(rng.random_range(0..width), rng.random_range(0..height));
                let start_index = grid.index_of(start).unwrap();
                let goal_index = grid.index_of(goal).unwrap();

                let result = pathfinder.find_cell_path(&grid, start, goal);
                let expected = reference_cost(&grid, start_index, goal_index);
                assert_eq!(result.total_cost, expected, "start {} goal {}", start, goal);
                if result.is_success() {
                    assert_eq!(walked_cost(&grid, &result.path), expected.unwrap());
                    assert_eq!(result.path.first(), Some(&start));
                    assert_eq!(result.path.last(), Some(&goal));
                } else {
                    assert!(result.path.is_empty());
                }
            }
        }
    }

    #[test]
    fn test_unreachable_goal() {
        let rows = [
            ".....", //
            ".###.", //
            ".#.#.", //
            ".###.", //
            ".....", //
        ];
        let grid = grid_from_rows(&rows, |_| {});
        let mut pathfinder = Pathfinder::for_grid(&grid);
        let result = pathfinder.find_path(&grid, cell_center(GridPoint::new(0, 0)), cell_center(GridPoint::new(2, 2)));

        assert!(!result.is_success());
        assert!(result.waypoints().is_empty());
        assert_eq!(result.failure, Some(PathFailure::Unreachable));
        // Every walkable cell outside the ring gets expanded before giving up.
        assert_eq!(result.nodes_explored, 16);
        assert!(format!("{}", result).contains("success: false"));
    }

    #[test]
    fn test_blocked_endpoints_skip_search() {
        let grid = grid_from_rows(&["..#", "..."], |_| {});
        let mut pathfinder = Pathfinder::for_grid(&grid);

        let to_wall = pathfinder.find_path(&grid, cell_center(GridPoint::new(0, 0)), cell_center(GridPoint::new(2, 1)));
        assert_eq!(to_wall.failure, Some(PathFailure::GoalBlocked));
        assert_eq!(to_wall.nodes_explored, 0);
        assert!(to_wall.waypoints().is_empty());

        let from_wall = pathfinder.find_path(&grid, cell_center(GridPoint::new(2, 1)), cell_center(GridPoint::new(0, 0)));
        assert_eq!(from_wall.failure, Some(PathFailure::StartBlocked));
        assert_eq!(from_wall.nodes_explored, 0);

        let off_grid = pathfinder.find_cell_path(&grid, GridPoint::new(0, 0), GridPoint::new(9, 9));
        assert_eq!(off_grid.failure, Some(PathFailure::GoalBlocked));
    }

    #[test]
    fn test_start_equals_goal() {
        let grid = grid_from_rows(&["...", "..."], |_| {});
        let mut pathfinder = Pathfinder::for_grid(&grid);
        let here = cell_center(GridPoint::new(1, 1));
        let result = pathfinder.find_path(&grid, here, here);

        assert!(result.is_success());
        assert_eq!(result.total_cost, Some(0));
        assert_eq!(result.nodes_explored, 1);
        assert_eq!(result.waypoints(), &[here]);
    }

    #[test]
    fn test_pathfinder_is_reusable() {
        let grid = grid_from_rows(&["....", ".##.", "...."], |_| {});
        let mut pathfinder = Pathfinder::for_grid(&grid);
        let a = cell_center(GridPoint::new(0, 0));
        let b = cell_center(GridPoint::new(3, 2));

        let first = pathfinder.find_path(&grid, a, b);
        let blocked = pathfinder.find_path(&grid, a, cell_center(GridPoint::new(1, 1)));
        let again = pathfinder.find_path(&grid, a, b);
        assert!(first.is_success());
        assert!(!blocked.is_success());
        assert_eq!(first, again);

        // A pathfinder sized for another grid resizes itself.
        let mut small = Pathfinder::new(1);
        assert_eq!(small.find_path(&grid, a, b), first);
    }

    #[test]
    fn test_path_result_display() {
        let success = PathResult::success(vec![WorldPoint::ZERO], 42, 7);
        let display_str = format!("{}", success);
        assert!(display_str.contains("success: true"));
        assert!(display_str.contains("total_cost: 42"));
        assert_eq!(success.clone().into_path(), Some(vec![WorldPoint::ZERO]));

        let failure: PathResult<WorldPoint> = PathResult::failure(PathFailure::GoalBlocked, 0);
        assert!(format!("{}", failure).contains("goal cell is not walkable"));
        assert_eq!(failure.into_path(), None);
    }
}
