#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![doc = "A `no_std` library of 2D points, headings and turn-boundary lines."]
#![doc = ""]
#![doc = "This crate provides the world and grid point types shared by the wayfinder crates"]
#![doc = "and the perpendicular boundary line used to detect when an agent has passed a waypoint."]

use core::f32::consts::PI;

pub mod boundary;
pub mod point;

pub use boundary::TurnBoundary;
pub use point::{GridPoint, WorldPoint};

/// Normalize an angle to be within `[-PI, PI)`.
///
/// Angles at `PI` will be normalized to `-PI`.
///
/// # Arguments
///
/// * `angle`: The angle in radians to normalize.
///
/// # Returns
///
/// The normalized angle in radians.
pub fn normalize_angle(angle: f32) -> f32 {
    let a = libm::fmodf(angle, 2.0 * PI);
    if a >= PI {
        a - 2.0 * PI
    } else if a < -PI {
        a + 2.0 * PI
    } else {
        a
    }
}

/// Interpolates from heading `from` toward heading `to` along the shorter arc.
///
/// `t` is clamped to `[0, 1]`; `t = 1` returns `to` (normalized).
pub fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    let delta = normalize_angle(to - from);
    normalize_angle(from + delta * t.clamp(0.0, 1.0))
}
