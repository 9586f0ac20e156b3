//! Demo agent: a fixed-rate simulation thread follows a [`Path`] by turning
//! toward the current look point and moving forward, while an async monitor
//! watches its progress.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use parking_lot::Mutex;
use serde::Deserialize;
use spin_sleep::SpinSleeper;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use wayfinder_geometry::{WorldPoint, lerp_angle};
use wayfinder_navigation::{Path, PathFollower};

use crate::blackboard::{Blackboard, Pose, raise_fault, record_step};
use crate::bus::Topic;

fn default_speed() -> f32 {
    4.0
}

fn default_turn_speed() -> f32 {
    5.0
}

fn default_turn_distance() -> f32 {
    1.0
}

fn default_rate_hz() -> u32 {
    100
}

fn default_max_duration_s() -> f32 {
    60.0
}

fn default_path_update_threshold() -> f32 {
    0.5
}

fn default_min_path_update_s() -> f32 {
    0.2
}

/// A replacement path waiting to be picked up by the simulation thread.
pub type PathSlot = Arc<Mutex<Option<Path>>>;

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    pub start: WorldPoint,
    pub target: WorldPoint,
    /// Forward speed in world units per second.
    #[serde(default = "default_speed")]
    pub speed: f32,
    /// Heading interpolation rate per second.
    #[serde(default = "default_turn_speed")]
    pub turn_speed: f32,
    /// How far before a waypoint the agent starts turning toward the next one.
    #[serde(default = "default_turn_distance")]
    pub turn_distance: f32,
    /// Simulation steps per second.
    #[serde(default = "default_rate_hz")]
    pub rate_hz: u32,
    /// The monitor gives up after this many seconds.
    #[serde(default = "default_max_duration_s")]
    pub max_duration_s: f32,
    /// The target must move further than this before a new path is requested.
    #[serde(default = "default_path_update_threshold")]
    pub path_update_threshold: f32,
    /// Seconds between checks of the target position.
    #[serde(default = "default_min_path_update_s")]
    pub min_path_update_s: f32,
    /// Drift of the target in world units per second while the agent travels.
    #[serde(default)]
    pub target_velocity: WorldPoint,
}

/// What the simulation thread publishes every step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentStatus {
    pub pose: Pose,
    pub waypoint_index: usize,
    pub finished: bool,
}

/// Turns `pose` toward `look_point` and moves it forward for `dt` seconds.
pub fn steer(pose: &Pose, look_point: WorldPoint, speed: f32, turn_speed: f32, dt: f32) -> Pose {
    let target_heading = (look_point - pose.position).angle();
    let heading = lerp_angle(pose.heading, target_heading, dt * turn_speed);
    Pose {
        position: pose.position + WorldPoint::from_angle(heading) * (speed * dt),
        heading,
    }
}

/// Starts the simulation thread with the agent at `start`. It runs until the
/// finish line is crossed or `stop` is set, publishing an [`AgentStatus`]
/// after every step. A path placed in `pending` replaces the one being
/// followed.
pub fn spawn_simulation(
    path: Path,
    start: WorldPoint,
    config: &AgentConfig,
    pending: PathSlot,
    bb: Blackboard,
    topic: Topic<AgentStatus>,
    stop: Arc<AtomicBool>,
) -> anyhow::Result<JoinHandle<()>> {
    if config.rate_hz == 0 {
        bail!("agent rate_hz must be positive");
    }
    let period = Duration::from_secs_f64(1.0 / config.rate_hz as f64);
    let dt = period.as_secs_f32();
    let (speed, turn_speed) = (config.speed, config.turn_speed);

    let handle = std::thread::Builder::new()
        .name("agent-sim".into())
        .spawn(move || {
            info!(waypoints = path.len(), "Simulation thread started.");
            let sleeper = SpinSleeper::new(1_000);
            let mut follower = PathFollower::new(path);
            // Face the first look point before moving.
            let first = follower.path().look_points()[0];
            let mut pose = Pose {
                position: start,
                heading: (first - start).angle(),
            };

            while !stop.load(Ordering::Relaxed) {
                if let Some(next) = pending.lock().take() {
                    debug!(waypoints = next.len(), "Switching to a new path");
                    follower = PathFollower::new(next);
                }
                let look_point = follower.update(pose.position);
                let waypoint_index = follower.current_index();
                match look_point {
                    Some(look_point) => pose = steer(&pose, look_point, speed, turn_speed, dt),
                    None => debug!(position = %pose.position, "Finish line crossed"),
                }
                record_step(&bb, pose, look_point, waypoint_index);
                topic.publish(AgentStatus {
                    pose,
                    waypoint_index,
                    finished: look_point.is_none(),
                });
                if look_point.is_none() {
                    break;
                }
                sleeper.sleep(period);
            }
            info!("Simulation thread stopped.");
        })
        .context("spawning simulation thread")?;
    Ok(handle)
}

/// Logs progress from `rx` until the agent finishes. Fails on timeout or if
/// the simulation stops publishing first.
pub async fn monitor(mut rx: broadcast::Receiver<Arc<AgentStatus>>, timeout: Duration) -> anyhow::Result<AgentStatus> {
    let started = Instant::now();
    let watch = async {
        let mut last_index = None;
        loop {
            match rx.recv().await {
                Ok(status) => {
                    if last_index != Some(status.waypoint_index) {
                        info!(
                            waypoint = status.waypoint_index,
                            position = %status.pose.position,
                            elapsed_s = started.elapsed().as_secs_f32(),
                            "Heading to waypoint"
                        );
                        last_index = Some(status.waypoint_index);
                    }
                    if status.finished {
                        return Ok(*status);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!("Monitor lagged by {} status messages.", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    bail!("simulation stopped before reaching the goal");
                }
            }
        }
    };
    tokio::time::timeout(timeout, watch)
        .await
        .with_context(|| format!("agent did not finish within {:?}", timeout))?
}

/// Follows `path` from `start` to its end, returning the final status.
pub async fn run_agent(
    path: Path,
    start: WorldPoint,
    config: &AgentConfig,
    bb: Blackboard,
    pending: PathSlot,
) -> anyhow::Result<AgentStatus> {
    let topic: Topic<AgentStatus> = Topic::new(64);
    let rx = topic.subscribe();
    let stop = Arc::new(AtomicBool::new(false));
    let sim = spawn_simulation(path, start, config, pending, Arc::clone(&bb), topic, Arc::clone(&stop))?;

    let timeout = Duration::try_from_secs_f32(config.max_duration_s.max(0.0)).unwrap_or(Duration::MAX);
    let outcome = monitor(rx, timeout).await;
    if let Err(e) = &outcome {
        warn!("Agent run failed: {:#}", e);
        raise_fault(&bb, "agent did not reach its goal");
        stop.store(true, Ordering::Relaxed);
    }

    tokio::task::spawn_blocking(move || sim.join())
        .await?
        .map_err(|_| anyhow::anyhow!("simulation thread panicked"))?;
    outcome
}
