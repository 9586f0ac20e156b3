use parking_lot::RwLock;
use std::{sync::Arc, time::Instant};

use wayfinder_geometry::WorldPoint;

/// Position and heading (radians, counter-clockwise from +x) of the agent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub position: WorldPoint,
    pub heading: f32,
}

#[derive(Clone)]
pub struct AgentState {
    pub pose: Pose,
    /// Where the agent is ultimately headed; may move while it travels.
    pub target: WorldPoint,
    pub look_point: Option<WorldPoint>,
    pub waypoint_index: usize,
    pub finished: bool,
    pub last_update_ts: Instant,
    pub faults: Vec<String>,
}

impl Default for AgentState {
    fn default() -> Self {
        AgentState {
            pose: Pose::default(),
            target: WorldPoint::ZERO,
            look_point: None,
            waypoint_index: 0,
            finished: false,
            last_update_ts: Instant::now(),
            faults: Vec::new(),
        }
    }
}

pub type Blackboard = Arc<RwLock<AgentState>>;

pub fn snapshot(bb: &Blackboard) -> AgentState {
    (*bb.read()).clone()
}

/// Records one simulation step.
pub fn record_step(bb: &Blackboard, pose: Pose, look_point: Option<WorldPoint>, waypoint_index: usize) {
    let mut g = bb.write();
    g.pose = pose;
    g.look_point = look_point;
    g.waypoint_index = waypoint_index;
    g.finished = look_point.is_none();
    g.last_update_ts = Instant::now();
}

pub fn set_target(bb: &Blackboard, target: WorldPoint) {
    bb.write().target = target;
}

pub fn raise_fault(bb: &Blackboard, msg: &str) {
    let mut g = bb.write();
    if !g.faults.iter().any(|s| s == msg) {
        g.faults.push(msg.to_string());
    }
}
