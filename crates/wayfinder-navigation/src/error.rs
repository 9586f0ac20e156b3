//! This module defines the error types used by the `wayfinder-navigation` crate.

/// Error type for navigation operations.
///
/// This enum encapsulates the errors that can occur while building a grid,
/// assembling a path or talking to the path request service. A search that
/// finds no route is not an error: it is reported through
/// [`PathResult`](crate::astar::PathResult).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NavigationError {
    /// Error for an invalid cell size.
    /// This variant is returned when a cell radius is provided that is not positive.
    #[error("Invalid grid resolution: {0}")]
    InvalidResolution(&'static str),
    /// Error for invalid grid dimensions.
    /// This variant is returned when the world size yields zero cells on an axis.
    #[error("Invalid grid dimensions: {0}")]
    InvalidDimensions(&'static str),
    /// Error for out-of-bounds access.
    /// This variant is returned when attempting to access cells outside the grid.
    #[error("Grid access out of bounds: {0}")]
    OutOfBounds(&'static str),
    /// Error for an invalid tuning parameter.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(&'static str),
    /// A path needs at least one waypoint.
    #[error("Cannot build a path from an empty waypoint list")]
    EmptyPath,
    /// The path request service stopped before answering.
    #[error("Path request service has shut down")]
    ServiceClosed,
    /// A path service worker terminated abnormally.
    #[error("Path service worker failed: {0}")]
    WorkerFailed(String),
}
