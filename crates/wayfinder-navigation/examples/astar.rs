use std::collections::HashSet;

use tracing_subscriber::EnvFilter;
use wayfinder_geometry::{GridPoint, WorldPoint};
use wayfinder_navigation::{CellSample, GridConfig, Path, Pathfinder, TerrainPenalty, WorldGrid};

const MUD: u32 = 1;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
        .init();

    // A 10x10 world of 1m cells centered on the origin
    let mut config = GridConfig::new(WorldPoint::ZERO, WorldPoint::new(10.0, 10.0), 0.5);
    config.terrain_penalties = vec![TerrainPenalty { class: MUD, penalty: 30 }];
    config.blur_radius = 1;

    let obstacles: HashSet<(usize, usize)> = [
        (1, 1), (2, 1), (7, 1), (8, 1),
        (4, 2),
        (2, 3), (3, 3), (4, 3), (5, 3), (7, 3),
        (5, 4), (7, 4),
        (1, 5), (2, 5), (3, 5), (5, 5), (7, 5), (8, 5),
        (3, 6),
        (1, 7), (3, 7), (5, 7), (6, 7), (7, 7),
        (1, 8), (8, 8),
        (3, 9), (4, 9), (5, 9),
    ]
    .into_iter()
    .collect();

    // World position -> cell, matching the grid layout above
    let to_cell = |p: WorldPoint| ((p.x + 5.0).floor() as usize, (p.y + 5.0).floor() as usize);
    let sampler = |center: WorldPoint, _radius: f32| {
        let (x, y) = to_cell(center);
        if obstacles.contains(&(x, y)) {
            CellSample::blocked()
        } else if x == 9 && y < 5 {
            CellSample::walkable(Some(MUD))
        } else {
            CellSample::walkable(None)
        }
    };

    let grid = WorldGrid::build(&config, &sampler)?;
    println!("{}", grid);

    let start = GridPoint::new(0, 0);
    let goal = GridPoint::new(9, 9);
    let mut pathfinder = Pathfinder::for_grid(&grid);

    let cells = pathfinder.find_cell_path(&grid, start, goal);
    println!("{}", cells);
    if !cells.is_success() {
        println!("No path found.");
        return Ok(());
    }

    let start_world = grid.node_at_grid(start)?.world;
    let goal_world = grid.node_at_grid(goal)?.world;
    let result = pathfinder.find_path(&grid, start_world, goal_world);
    println!("{}", result);

    let path_cells: HashSet<(usize, usize)> = cells.path.iter().map(|p| (p.x, p.y)).collect();
    let waypoints: HashSet<(usize, usize)> = result.waypoints().iter().map(|w| to_cell(*w)).collect();

    println!("\nGrid with path (W = waypoint):");
    for y in (0..grid.height()).rev() {
        print!("{} ", y);
        for x in 0..grid.width() {
            let node = grid.node_at_grid(GridPoint::new(x, y))?;
            let symbol = if (x, y) == (start.x, start.y) {
                'S'
            } else if (x, y) == (goal.x, goal.y) {
                'G'
            } else if waypoints.contains(&(x, y)) {
                'W'
            } else if path_cells.contains(&(x, y)) {
                '*'
            } else if !node.walkable {
                'X'
            } else {
                '.'
            };
            print!("{} ", symbol);
        }
        println!();
    }
    print!("  ");
    for x in 0..grid.width() {
        print!("{} ", x);
    }
    println!();

    let path = Path::new(result.path.clone(), start_world, 0.5)?;
    println!("\n{}", path);
    for (i, boundary) in path.turn_boundaries().iter().enumerate() {
        println!("  boundary {}: {}", i, boundary);
    }

    Ok(())
}
