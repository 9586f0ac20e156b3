#![warn(missing_docs)]

//! The world grid: a rectangular array of cells annotated with walkability
//! and a smoothed movement-penalty field.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, info};
use wayfinder_geometry::{GridPoint, WorldPoint};

use crate::config::GridConfig;
use crate::error::NavigationError;

/// Identifier of a terrain kind reported by a [`WorldSampler`].
pub type TerrainClass = u32;

/// Offsets of the eight cells surrounding a cell.
const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// What the world looks like at one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellSample {
    /// Whether an agent may stand in the cell.
    pub walkable: bool,
    /// Terrain under the cell, if any was found.
    pub terrain: Option<TerrainClass>,
}

impl CellSample {
    /// A walkable cell with the given terrain.
    pub const fn walkable(terrain: Option<TerrainClass>) -> Self {
        Self { walkable: true, terrain }
    }

    /// An unwalkable cell.
    pub const fn blocked() -> Self {
        Self { walkable: false, terrain: None }
    }
}

/// Source of walkability and terrain information used to build a grid.
///
/// Implementations must be total: every query returns a sample. Failure
/// handling (for example an unclassifiable cell) stays inside the sampler.
pub trait WorldSampler {
    /// Samples the cell centered at `center` with half-extent `radius`.
    fn sample(&self, center: WorldPoint, radius: f32) -> CellSample;
}

impl<F> WorldSampler for F
where
    F: Fn(WorldPoint, f32) -> CellSample,
{
    fn sample(&self, center: WorldPoint, radius: f32) -> CellSample {
        self(center, radius)
    }
}

/// A single grid cell. Immutable once the grid is built.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Cell coordinates.
    pub grid: GridPoint,
    /// World position of the cell center.
    pub world: WorldPoint,
    /// Whether an agent may enter the cell.
    pub walkable: bool,
    /// Smoothed terrain cost of entering the cell.
    pub movement_penalty: u32,
}

/// A rectangular grid of [`Node`]s covering a world area.
///
/// Cells are stored row-major (`index = y * width + x`). Cell `(0, 0)` sits at
/// the minimum x/y corner of the world area.
#[derive(Debug, Clone)]
pub struct WorldGrid {
    /// Number of cells along x.
    width: usize,
    /// Number of cells along y.
    height: usize,
    /// Half the edge length of a cell.
    cell_radius: f32,
    /// World position of the grid center.
    center: WorldPoint,
    /// Width and height of the covered world area.
    world_size: WorldPoint,
    /// Cell storage.
    nodes: Vec<Node>,
    /// Smallest penalty in the field.
    penalty_min: u32,
    /// Largest penalty in the field.
    penalty_max: u32,
}

impl WorldGrid {
    /// Builds a grid by sampling every cell center, then blurs the penalty field.
    ///
    /// # Arguments
    /// * `config` - Grid extents, cell size, penalty table and blur radius
    /// * `sampler` - Source of walkability and terrain for each cell
    ///
    /// # Returns
    /// * `Result<Self, NavigationError>` - The built grid or an error if the config is invalid
    pub fn build<S: WorldSampler + ?Sized>(config: &GridConfig, sampler: &S) -> Result<Self, NavigationError> {
        config.validate()?;

        let diameter = config.cell_diameter();
        let width = (config.world_size.x / diameter).round() as usize;
        let height = (config.world_size.y / diameter).round() as usize;
        if width == 0 || height == 0 {
            return Err(NavigationError::InvalidDimensions(
                "World size must span at least one cell on each axis",
            ));
        }
        let Some(cell_count) = width.checked_mul(height) else {
            return Err(NavigationError::InvalidDimensions("Grid dimensions too large, would cause overflow"));
        };

        let penalties: HashMap<TerrainClass, u32> = config
            .terrain_penalties
            .iter()
            .map(|t| (t.class, t.penalty))
            .collect();

        let bottom_left = config.center - config.world_size * 0.5;
        let mut nodes = Vec::with_capacity(cell_count);
        for y in 0..height {
            for x in 0..width {
                let world = bottom_left
                    + WorldPoint::new(
                        x as f32 * diameter + config.cell_radius,
                        y as f32 * diameter + config.cell_radius,
                    );
                let sample = sampler.sample(world, config.cell_radius);
                let mut movement_penalty = sample
                    .terrain
                    .and_then(|class| penalties.get(&class).copied())
                    .unwrap_or(0);
                if !sample.walkable {
                    movement_penalty = movement_penalty.saturating_add(config.obstacle_proximity_penalty);
                }
                nodes.push(Node {
                    grid: GridPoint::new(x, y),
                    world,
                    walkable: sample.walkable,
                    movement_penalty,
                });
            }
        }

        let mut grid = WorldGrid {
            width,
            height,
            cell_radius: config.cell_radius,
            center: config.center,
            world_size: config.world_size,
            nodes,
            penalty_min: 0,
            penalty_max: 0,
        };
        grid.blur_penalties(config.blur_radius);

        info!(
            width,
            height,
            cells = cell_count,
            walkable = grid.walkable_count(),
            penalty_min = grid.penalty_min,
            penalty_max = grid.penalty_max,
            "World grid built"
        );
        Ok(grid)
    }

    /// Smooths the penalty field with a separable box blur of the given radius.
    ///
    /// Each pass slides a `2 * kernel_radius + 1` window along its axis,
    /// adding the entering sample and removing the leaving one. Samples past
    /// the edge are clamped to the nearest valid index. The blurred value is
    /// the window sum divided by the kernel area, rounded half up.
    /// Recomputes the penalty range. A radius of `0` leaves the field as is.
    pub fn blur_penalties(&mut self, kernel_radius: usize) {
        if kernel_radius > 0 {
            let (w, h) = (self.width, self.height);
            let kernel_size = (kernel_radius * 2 + 1) as u64;
            let area = kernel_size * kernel_size;
            let k = kernel_radius as isize;
            let clamp = |i: isize, len: usize| i.clamp(0, len as isize - 1) as usize;

            let mut horizontal = vec![0u64; w * h];
            for y in 0..h {
                let row = y * w;
                let mut sum: u64 = (-k..=k)
                    .map(|offset| self.nodes[row + clamp(offset, w)].movement_penalty as u64)
                    .sum();
                horizontal[row] = sum;
                for x in 1..w {
                    let remove = clamp(x as isize - k - 1, w);
                    let add = clamp(x as isize + k, w);
                    sum = sum + self.nodes[row + add].movement_penalty as u64
                        - self.nodes[row + remove].movement_penalty as u64;
                    horizontal[row + x] = sum;
                }
            }

            for x in 0..w {
                let mut sum: u64 = (-k..=k).map(|offset| horizontal[clamp(offset, h) * w + x]).sum();
                self.nodes[x].movement_penalty = ((sum + area / 2) / area) as u32;
                for y in 1..h {
                    let remove = clamp(y as isize - k - 1, h);
                    let add = clamp(y as isize + k, h);
                    sum = sum + horizontal[add * w + x] - horizontal[remove * w + x];
                    self.nodes[y * w + x].movement_penalty = ((sum + area / 2) / area) as u32;
                }
            }
            debug!(kernel_radius, "Blurred penalty field");
        }
        self.update_penalty_range();
    }

    fn update_penalty_range(&mut self) {
        let penalties = self.nodes.iter().map(|n| n.movement_penalty);
        self.penalty_min = penalties.clone().min().unwrap_or(0);
        self.penalty_max = penalties.max().unwrap_or(0);
    }

    /// Calculates the index in the node storage for a grid point.
    fn get_index(&self, p: GridPoint) -> usize {
        p.y * self.width + p.x
    }

    /// Index of the cell at grid coordinates `p`.
    ///
    /// # Returns
    /// * `Result<usize, NavigationError>` - The index or an error if out of bounds
    pub fn index_of(&self, p: GridPoint) -> Result<usize, NavigationError> {
        if p.x < self.width && p.y < self.height {
            Ok(self.get_index(p))
        } else {
            Err(NavigationError::OutOfBounds("Grid coordinates out of bounds"))
        }
    }

    /// The node at a storage index.
    ///
    /// # Panics
    /// Panics if `index >= self.capacity()`.
    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    /// The node at grid coordinates `p`.
    ///
    /// # Returns
    /// * `Result<&Node, NavigationError>` - The node or an error if out of bounds
    pub fn node_at_grid(&self, p: GridPoint) -> Result<&Node, NavigationError> {
        self.index_of(p).map(|i| &self.nodes[i])
    }

    /// Index of the cell containing a world position.
    ///
    /// Positions outside the grid are clamped to the nearest edge cell, so a
    /// valid index is always returned.
    pub fn node_index_at(&self, position: WorldPoint) -> usize {
        let percent_x = ((position.x - self.center.x + self.world_size.x / 2.0) / self.world_size.x).clamp(0.0, 1.0);
        let percent_y = ((position.y - self.center.y + self.world_size.y / 2.0) / self.world_size.y).clamp(0.0, 1.0);

        let x = (self.width as f32 * percent_x).min(self.width as f32 - 1.0).floor() as usize;
        let y = (self.height as f32 * percent_y).min(self.height as f32 - 1.0).floor() as usize;
        self.get_index(GridPoint::new(x.min(self.width - 1), y.min(self.height - 1)))
    }

    /// The node containing a world position, clamped to the grid like
    /// [`WorldGrid::node_index_at`].
    pub fn node_at(&self, position: WorldPoint) -> &Node {
        &self.nodes[self.node_index_at(position)]
    }

    /// Indices of the in-bounds cells surrounding `index` (up to eight).
    pub fn neighbors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        let p = self.nodes[index].grid;
        NEIGHBOR_OFFSETS.iter().filter_map(move |&(dx, dy)| {
            let x = p.x.checked_add_signed(dx)?;
            let y = p.y.checked_add_signed(dy)?;
            (x < self.width && y < self.height).then(|| self.get_index(GridPoint::new(x, y)))
        })
    }

    /// Total number of cells; the largest possible open set.
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Number of cells along x.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of cells along y.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Half the edge length of a cell.
    pub fn cell_radius(&self) -> f32 {
        self.cell_radius
    }

    /// Number of walkable cells.
    pub fn walkable_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.walkable).count()
    }

    /// Smallest and largest penalty in the field.
    pub fn penalty_range(&self) -> (u32, u32) {
        (self.penalty_min, self.penalty_max)
    }

    /// Penalty of a cell rescaled to `[0, 1]` over the field's range.
    pub fn normalized_penalty(&self, index: usize) -> f32 {
        let span = self.penalty_max - self.penalty_min;
        if span == 0 {
            return 0.0;
        }
        (self.nodes[index].movement_penalty - self.penalty_min) as f32 / span as f32
    }

    /// All nodes, row-major.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

impl fmt::Display for WorldGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "WorldGrid ({}x{}, cell radius: {:.3})",
            self.width, self.height, self.cell_radius
        )?;
        writeln!(f, "Center: {}, penalties: {}..={}", self.center, self.penalty_min, self.penalty_max)?;

        // Top row first so the printout matches a y-up world.
        for y in (0..self.height).rev() {
            for x in 0..self.width {
                let node = &self.nodes[self.get_index(GridPoint::new(x, y))];
                if node.walkable {
                    write!(f, "{:3} ", node.movement_penalty)?;
                } else {
                    write!(f, "  # ")?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
