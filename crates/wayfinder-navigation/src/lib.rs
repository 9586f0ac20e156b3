//! Grid-based navigation: world grids with smoothed terrain penalties, A*
//! search that reduces routes to waypoints, turn-boundary paths for agents to
//! follow, and an asynchronous path request service.

pub mod astar;
pub mod config;
pub mod error;
pub mod grid;
pub mod heap;
pub mod path;
pub mod request;

pub use astar::{PathFailure, PathResult, Pathfinder, octile_distance};
pub use config::{GridConfig, PathServiceConfig, TerrainPenalty};
pub use error::NavigationError;
pub use grid::{CellSample, Node, TerrainClass, WorldGrid, WorldSampler};
pub use path::{Path, PathFollower};
pub use request::{PathRequester, PathService, spawn_path_service};
