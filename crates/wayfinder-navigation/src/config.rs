//! Configuration types for grid construction and the path request service.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use wayfinder_geometry::WorldPoint;

use crate::error::NavigationError;
use crate::grid::TerrainClass;

fn default_obstacle_proximity_penalty() -> u32 {
    10
}

fn default_blur_radius() -> usize {
    3
}

fn default_workers() -> usize {
    1
}

fn default_queue_capacity() -> usize {
    32
}

/// Movement penalty applied to cells of one terrain class.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerrainPenalty {
    /// Terrain class reported by the world sampler.
    pub class: TerrainClass,
    /// Additive cost of entering a cell of this class.
    pub penalty: u32,
}

/// Parameters for building a [`WorldGrid`](crate::grid::WorldGrid).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    /// World position of the center of the grid.
    #[cfg_attr(feature = "serde", serde(default))]
    pub center: WorldPoint,
    /// Width (x) and height (y) of the covered world area.
    pub world_size: WorldPoint,
    /// Half the edge length of a cell.
    pub cell_radius: f32,
    /// Terrain class to penalty table; unmapped classes cost nothing extra.
    #[cfg_attr(feature = "serde", serde(default))]
    pub terrain_penalties: Vec<TerrainPenalty>,
    /// Extra penalty for unwalkable cells, which the blur spreads onto their
    /// walkable neighbors.
    #[cfg_attr(feature = "serde", serde(default = "default_obstacle_proximity_penalty"))]
    pub obstacle_proximity_penalty: u32,
    /// Radius of the box blur applied to the penalty field. `0` disables it.
    #[cfg_attr(feature = "serde", serde(default = "default_blur_radius"))]
    pub blur_radius: usize,
}

impl GridConfig {
    /// Creates a config with the default penalties and blur radius.
    pub fn new(center: WorldPoint, world_size: WorldPoint, cell_radius: f32) -> Self {
        Self {
            center,
            world_size,
            cell_radius,
            terrain_penalties: Vec::new(),
            obstacle_proximity_penalty: default_obstacle_proximity_penalty(),
            blur_radius: default_blur_radius(),
        }
    }

    /// Edge length of a cell.
    pub fn cell_diameter(&self) -> f32 {
        self.cell_radius * 2.0
    }

    /// Checks the config for values that cannot produce a grid.
    ///
    /// # Returns
    /// * `Result<(), NavigationError>` - `Ok` if a grid can be built from this config
    pub fn validate(&self) -> Result<(), NavigationError> {
        if !(self.cell_radius.is_finite() && self.cell_radius > 0.0) {
            return Err(NavigationError::InvalidResolution("Cell radius must be positive"));
        }
        if !(self.world_size.x.is_finite() && self.world_size.x > 0.0)
            || !(self.world_size.y.is_finite() && self.world_size.y > 0.0)
        {
            return Err(NavigationError::InvalidDimensions("World size must be positive on both axes"));
        }
        Ok(())
    }
}

/// Parameters for the asynchronous path request service.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathServiceConfig {
    /// Number of blocking search workers. Each owns its own search state.
    #[cfg_attr(feature = "serde", serde(default = "default_workers"))]
    pub workers: usize,
    /// Bound on queued, not yet processed requests.
    #[cfg_attr(feature = "serde", serde(default = "default_queue_capacity"))]
    pub queue_capacity: usize,
}

impl Default for PathServiceConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
        }
    }
}
