//! Re-plans the agent's route while its target moves.
//!
//! The target position lives on the blackboard. Every `min_path_update_s`
//! the tracker compares it with the position of the last request and, once
//! it has moved far enough, asks the path service for a fresh path from the
//! agent's current position. The result is dropped into the agent's
//! [`PathSlot`], where the simulation thread picks it up.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use wayfinder_geometry::WorldPoint;
use wayfinder_navigation::{Path, PathRequester};

use crate::agent::{AgentConfig, PathSlot};
use crate::blackboard::{Blackboard, set_target, snapshot};

/// Pause before the first check, giving the first path time to settle.
const FIRST_UPDATE_DELAY: Duration = Duration::from_millis(300);

/// Remembers where the target was when a path was last requested.
#[derive(Debug, Clone, Copy)]
pub struct TargetTracker {
    last_requested: WorldPoint,
    threshold_sq: f32,
}

impl TargetTracker {
    pub fn new(initial: WorldPoint, threshold: f32) -> Self {
        TargetTracker {
            last_requested: initial,
            threshold_sq: threshold * threshold,
        }
    }

    /// Whether `target` has moved far enough to warrant a new path. Records
    /// it as the last requested position when it has.
    pub fn should_replan(&mut self, target: WorldPoint) -> bool {
        if (target - self.last_requested).length_squared() > self.threshold_sq {
            self.last_requested = target;
            true
        } else {
            false
        }
    }
}

/// Watches the target on `bb` and keeps `pending` supplied with paths toward
/// it. Moves the target by `config.target_velocity` each tick. Runs until the
/// task is dropped.
pub async fn track_target(requester: PathRequester, bb: Blackboard, pending: PathSlot, config: AgentConfig) {
    let period = Duration::try_from_secs_f32(config.min_path_update_s)
        .ok()
        .filter(|p| !p.is_zero())
        .unwrap_or(Duration::from_millis(200));
    let dt = period.as_secs_f32();
    let turn_distance = config.turn_distance;

    let mut tracker = TargetTracker::new(snapshot(&bb).target, config.path_update_threshold);
    tokio::time::sleep(FIRST_UPDATE_DELAY).await;
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(period_ms = period.as_millis() as u64, "Tracking target.");

    loop {
        interval.tick().await;
        if config.target_velocity != WorldPoint::ZERO {
            let moved = snapshot(&bb).target + config.target_velocity * dt;
            set_target(&bb, moved);
        }

        let state = snapshot(&bb);
        if !tracker.should_replan(state.target) {
            continue;
        }
        let start = state.pose.position;
        debug!(%start, target = %state.target, "Target moved, requesting a new path");
        let slot = Arc::clone(&pending);
        requester.request_path_with(start, state.target, move |result| match result {
            Ok(result) => match result.into_path() {
                Some(waypoints) => match Path::new(waypoints, start, turn_distance) {
                    Ok(path) => *slot.lock() = Some(path),
                    Err(e) => warn!("Discarding new path: {}", e),
                },
                None => warn!("No path to the moved target"),
            },
            Err(e) => warn!("Path request failed: {}", e),
        });
    }
}
