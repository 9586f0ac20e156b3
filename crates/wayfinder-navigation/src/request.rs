//! Asynchronous path requests.
//!
//! Searches are CPU-bound and synchronous, so they run on tokio's blocking
//! pool. Callers hold a cheap, cloneable [`PathRequester`] that queues
//! `(start, goal)` pairs on a bounded channel; each worker owns its own
//! [`Pathfinder`] and answers on a oneshot channel. The grid is shared
//! read-only between workers.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wayfinder_geometry::WorldPoint;

use crate::astar::{PathResult, Pathfinder};
use crate::config::PathServiceConfig;
use crate::error::NavigationError;
use crate::grid::WorldGrid;

struct PathRequest {
    start: WorldPoint,
    goal: WorldPoint,
    respond_to: oneshot::Sender<PathResult<WorldPoint>>,
}

/// Handle for submitting path requests. Clone it freely; the service stops
/// once every requester has been dropped and the queue is drained.
#[derive(Debug, Clone)]
pub struct PathRequester {
    tx: mpsc::Sender<PathRequest>,
}

impl PathRequester {
    /// Queues a search from `start` to `goal` and waits for its result.
    ///
    /// A search that finds no path is still `Ok`; check
    /// [`PathResult::is_success`].
    ///
    /// # Returns
    /// * `Result<PathResult<WorldPoint>, NavigationError>` - The search
    ///   result, or `ServiceClosed` if no worker is left to answer.
    pub async fn request_path(
        &self,
        start: WorldPoint,
        goal: WorldPoint,
    ) -> Result<PathResult<WorldPoint>, NavigationError> {
        let (respond_to, response) = oneshot::channel();
        self.tx
            .send(PathRequest { start, goal, respond_to })
            .await
            .map_err(|_| NavigationError::ServiceClosed)?;
        response.await.map_err(|_| NavigationError::ServiceClosed)
    }

    /// Queues a search and hands the result to `callback` when it completes.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn request_path_with<F>(&self, start: WorldPoint, goal: WorldPoint, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<PathResult<WorldPoint>, NavigationError>) + Send + 'static,
    {
        let requester = self.clone();
        tokio::spawn(async move {
            callback(requester.request_path(start, goal).await);
        })
    }
}

/// The running workers of a path service.
#[derive(Debug)]
pub struct PathService {
    workers: Vec<JoinHandle<()>>,
}

impl PathService {
    /// Number of workers.
    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Waits for every worker to exit. Workers exit once all requesters are
    /// dropped and the queue is empty.
    pub async fn join(self) -> Result<(), NavigationError> {
        for worker in self.workers {
            worker
                .await
                .map_err(|e| NavigationError::WorkerFailed(e.to_string()))?;
        }
        info!("Path service stopped");
        Ok(())
    }
}

/// Starts `config.workers` blocking search workers over `grid`.
///
/// # Arguments
/// * `grid` - The grid every request searches.
/// * `config` - Worker count and request queue bound.
///
/// # Returns
/// * `Result<(PathRequester, PathService), NavigationError>` - A requester
///   and the worker handles, or `InvalidParameter` for a zero worker count or
///   queue capacity.
///
/// # Panics
/// Panics if called outside a tokio runtime.
pub fn spawn_path_service(
    grid: Arc<WorldGrid>,
    config: &PathServiceConfig,
) -> Result<(PathRequester, PathService), NavigationError> {
    if config.workers == 0 {
        return Err(NavigationError::InvalidParameter("Path service needs at least one worker"));
    }
    if config.queue_capacity == 0 {
        return Err(NavigationError::InvalidParameter("Path request queue capacity must be positive"));
    }

    let (tx, rx) = mpsc::channel(config.queue_capacity);
    let rx = Arc::new(Mutex::new(rx));

    let workers = (0..config.workers)
        .map(|worker| {
            let grid = Arc::clone(&grid);
            let rx = Arc::clone(&rx);
            tokio::task::spawn_blocking(move || run_worker(worker, &grid, &rx))
        })
        .collect();

    info!(
        workers = config.workers,
        queue_capacity = config.queue_capacity,
        "Path service started"
    );
    Ok((PathRequester { tx }, PathService { workers }))
}

fn run_worker(worker: usize, grid: &WorldGrid, rx: &Mutex<mpsc::Receiver<PathRequest>>) {
    let mut pathfinder = Pathfinder::for_grid(grid);
    loop {
        // The lock is only held while waiting, never during a search.
        let Some(request) = rx.lock().blocking_recv() else {
            break;
        };
        debug!(worker, start = %request.start, goal = %request.goal, "Processing path request");

        let result = pathfinder.find_path(grid, request.start, request.goal);
        if request.respond_to.send(result).is_err() {
            warn!(worker, "Path requester went away before the result was ready");
        }
    }
    debug!(worker, "Path worker exiting");
}
