mod agent; // simulation thread, steering and progress monitor
mod blackboard; // shared agent state
mod bus; // broadcast topics
mod config; // TOML + environment configuration
mod replan; // follows a moving target
mod world; // demo world sampler

use std::sync::Arc;

use anyhow::{Context, bail};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use wayfinder_navigation::{Path, PathRequester, WorldGrid, spawn_path_service};

use crate::agent::PathSlot;
use crate::blackboard::{Blackboard, set_target, snapshot};
use crate::config::{AppConfig, DEFAULT_CONFIG_PATH, load_config};
use crate::world::DemoWorld;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let app = load_config(&config_path)?;
    app.grid.validate().context("invalid grid configuration")?;

    let world = DemoWorld::generate(&app.world, &app.grid, &[app.agent.start, app.agent.target]);
    debug!(obstacles = world.obstacles().len(), "Sampling demo world");
    let grid = Arc::new(WorldGrid::build(&app.grid, &world).context("building world grid")?);
    debug!("\n{}", grid);

    let (requester, service) = spawn_path_service(Arc::clone(&grid), &app.service)?;
    let outcome = run(&app, &requester).await;

    // Workers exit once the last requester is gone.
    drop(requester);
    service.join().await?;
    outcome
}

async fn run(app: &AppConfig, requester: &PathRequester) -> anyhow::Result<()> {
    let (start, target) = (app.agent.start, app.agent.target);

    let outbound = requester.request_path(start, target).await?;
    info!(%outbound, "Outbound path search finished");
    let Some(waypoints) = outbound.into_path() else {
        bail!("no path from {} to {}", start, target);
    };

    let path = Path::new(waypoints, start, app.agent.turn_distance)?;
    info!(%path, "Following path");
    let bb: Blackboard = Arc::default();
    set_target(&bb, target);
    let pending = PathSlot::default();
    let arrived = tokio::select! {
        arrived = agent::run_agent(path, start, &app.agent, Arc::clone(&bb), Arc::clone(&pending)) => arrived?,
        () = replan::track_target(requester.clone(), Arc::clone(&bb), pending, app.agent.clone()) => {
            bail!("target tracking stopped");
        }
    };
    info!(position = %arrived.pose.position, target = %snapshot(&bb).target, "Agent reached the target");

    // Head home, taking the result through a callback this time.
    set_target(&bb, start);
    let (tx, rx) = oneshot::channel();
    requester.request_path_with(arrived.pose.position, start, move |result| {
        let _ = tx.send(result);
    });
    let homeward = rx.await.context("path service dropped the callback")??;
    match homeward.into_path() {
        Some(waypoints) => {
            let path = Path::new(waypoints, arrived.pose.position, app.agent.turn_distance)?;
            info!(%path, "Returning to start");
            let back = agent::run_agent(
                path,
                arrived.pose.position,
                &app.agent,
                Arc::clone(&bb),
                PathSlot::default(),
            )
            .await?;
            info!(position = %back.pose.position, "Agent is home");
        }
        None => warn!("No path back to the start"),
    }

    let state = snapshot(&bb);
    info!(
        position = %state.pose.position,
        waypoint = state.waypoint_index,
        look_point = ?state.look_point,
        finished = state.finished,
        since_update = ?state.last_update_ts.elapsed(),
        "Final agent state"
    );
    if !state.faults.is_empty() {
        warn!(faults = ?state.faults, "Run finished with faults");
    }
    Ok(())
}
