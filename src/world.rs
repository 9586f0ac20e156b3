//! Demo world: rectangular obstacles, terrain regions and seeded random
//! clutter, sampled cell by cell when the grid is built.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::{debug, info, warn};
use wayfinder_geometry::WorldPoint;
use wayfinder_navigation::{CellSample, GridConfig, TerrainClass, WorldSampler};

fn default_random_obstacle_size() -> f32 {
    2.0
}

fn default_clearance() -> f32 {
    1.5
}

/// Axis-aligned rectangle in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Rect {
    pub min: WorldPoint,
    pub max: WorldPoint,
}

impl Rect {
    /// Rectangle with corners in any order.
    pub fn new(a: WorldPoint, b: WorldPoint) -> Self {
        Rect {
            min: WorldPoint::new(a.x.min(b.x), a.y.min(b.y)),
            max: WorldPoint::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn contains(&self, p: WorldPoint) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Whether the open disc at `center` overlaps the rectangle.
    pub fn overlaps_circle(&self, center: WorldPoint, radius: f32) -> bool {
        let closest = WorldPoint::new(
            center.x.clamp(self.min.x, self.max.x),
            center.y.clamp(self.min.y, self.max.y),
        );
        closest.distance(&center) < radius
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TerrainRegion {
    pub min: WorldPoint,
    pub max: WorldPoint,
    pub class: TerrainClass,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorldConfig {
    #[serde(default)]
    pub obstacles: Vec<Rect>,
    #[serde(default)]
    pub terrain: Vec<TerrainRegion>,
    /// Number of extra obstacles scattered at random.
    #[serde(default)]
    pub random_obstacles: usize,
    /// Largest edge length of a random obstacle.
    #[serde(default = "default_random_obstacle_size")]
    pub random_obstacle_size: f32,
    #[serde(default)]
    pub seed: u64,
    /// Random obstacles keep at least this distance from protected points.
    #[serde(default = "default_clearance")]
    pub clearance: f32,
}

/// The sampled world.
#[derive(Debug, Clone)]
pub struct DemoWorld {
    obstacles: Vec<Rect>,
    terrain: Vec<(Rect, TerrainClass)>,
}

impl DemoWorld {
    /// Builds the world described by `config` inside the area covered by
    /// `grid`. Random obstacles never land within `config.clearance` of a
    /// point in `keep_clear`. No random obstacles are placed when `grid`
    /// does not describe a valid area.
    pub fn generate(config: &WorldConfig, grid: &GridConfig, keep_clear: &[WorldPoint]) -> Self {
        let mut obstacles: Vec<Rect> = config.obstacles.iter().map(|r| Rect::new(r.min, r.max)).collect();
        let terrain = config
            .terrain
            .iter()
            .map(|t| (Rect::new(t.min, t.max), t.class))
            .collect();

        let area = Rect::new(grid.center - grid.world_size * 0.5, grid.center + grid.world_size * 0.5);
        let min_size = grid.cell_diameter();
        let max_size = if config.random_obstacle_size.is_finite() {
            config.random_obstacle_size.max(min_size)
        } else {
            min_size
        };
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut placed = 0;
        let mut attempts = 0;
        let mut max_attempts = config.random_obstacles.saturating_mul(20);
        if config.random_obstacles > 0 && grid.validate().is_err() {
            warn!("Grid area is invalid, skipping random obstacles");
            max_attempts = 0;
        }
        while placed < config.random_obstacles && attempts < max_attempts {
            attempts += 1;
            let corner = WorldPoint::new(
                rng.random_range(area.min.x..area.max.x),
                rng.random_range(area.min.y..area.max.y),
            );
            let size = WorldPoint::new(
                rng.random_range(min_size..=max_size),
                rng.random_range(min_size..=max_size),
            );
            let candidate = Rect::new(corner, corner + size);
            if keep_clear.iter().any(|p| candidate.overlaps_circle(*p, config.clearance)) {
                continue;
            }
            obstacles.push(candidate);
            placed += 1;
        }
        if placed < config.random_obstacles {
            debug!(placed, requested = config.random_obstacles, "Gave up placing random obstacles");
        }

        info!(
            obstacles = obstacles.len(),
            random = placed,
            terrain_regions = config.terrain.len(),
            seed = config.seed,
            "Demo world generated"
        );
        DemoWorld { obstacles, terrain }
    }

    pub fn obstacles(&self) -> &[Rect] {
        &self.obstacles
    }
}

impl WorldSampler for DemoWorld {
    fn sample(&self, center: WorldPoint, radius: f32) -> CellSample {
        if self.obstacles.iter().any(|o| o.overlaps_circle(center, radius)) {
            return CellSample::blocked();
        }
        let terrain = self
            .terrain
            .iter()
            .find(|(area, _)| area.contains(center))
            .map(|&(_, class)| class);
        CellSample::walkable(terrain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfinder_navigation::WorldGrid;

    fn grid_config() -> GridConfig {
        let mut config = GridConfig::new(WorldPoint::ZERO, WorldPoint::new(20.0, 20.0), 0.5);
        config.blur_radius = 0;
        config
    }

    #[test]
    fn test_rect_overlap() {
        let rect = Rect::new(WorldPoint::new(2.0, 2.0), WorldPoint::new(0.0, 0.0));
        assert_eq!(rect.min, WorldPoint::ZERO);
        assert!(rect.overlaps_circle(WorldPoint::new(1.0, 1.0), 0.1));
        assert!(rect.overlaps_circle(WorldPoint::new(2.4, 1.0), 0.5));
        // Touching the edge is not an overlap.
        assert!(!rect.overlaps_circle(WorldPoint::new(2.5, 1.0), 0.5));
        assert!(!rect.overlaps_circle(WorldPoint::new(2.4, 2.4), 0.5));
    }

    #[test]
    fn test_sampler_blocks_obstacles_and_reports_terrain() {
        let config = WorldConfig {
            obstacles: vec![Rect::new(WorldPoint::new(-1.0, -1.0), WorldPoint::new(1.0, 1.0))],
            terrain: vec![TerrainRegion {
                min: WorldPoint::new(3.0, 3.0),
                max: WorldPoint::new(6.0, 6.0),
                class: 2,
            }],
            ..WorldConfig::default()
        };
        let world = DemoWorld::generate(&config, &grid_config(), &[]);
        assert_eq!(world.sample(WorldPoint::new(0.5, 0.5), 0.5), CellSample::blocked());
        assert_eq!(world.sample(WorldPoint::new(1.5, 0.5), 0.5), CellSample::walkable(None));
        assert_eq!(world.sample(WorldPoint::new(4.5, 4.5), 0.5), CellSample::walkable(Some(2)));
    }

    #[test]
    fn test_random_obstacles_are_seeded_and_keep_clear() {
        let config = WorldConfig {
            random_obstacles: 40,
            seed: 42,
            clearance: 2.0,
            ..WorldConfig::default()
        };
        let start = WorldPoint::new(-8.0, -8.0);
        let target = WorldPoint::new(8.0, 8.0);

        let a = DemoWorld::generate(&config, &grid_config(), &[start, target]);
        let b = DemoWorld::generate(&config, &grid_config(), &[start, target]);
        assert_eq!(a.obstacles(), b.obstacles());
        assert!(!a.obstacles().is_empty());
        for obstacle in a.obstacles() {
            assert!(!obstacle.overlaps_circle(start, 2.0));
            assert!(!obstacle.overlaps_circle(target, 2.0));
        }

        let grid = WorldGrid::build(&grid_config(), &a).unwrap();
        assert!(grid.node_at(start).walkable);
        assert!(grid.node_at(target).walkable);
        assert!(grid.walkable_count() < grid.capacity());
    }

    #[test]
    fn test_degenerate_area_places_no_random_obstacles() {
        let config = WorldConfig {
            obstacles: vec![Rect::new(WorldPoint::ZERO, WorldPoint::new(1.0, 1.0))],
            random_obstacles: 10,
            random_obstacle_size: f32::INFINITY,
            ..WorldConfig::default()
        };
        let flat = GridConfig::new(WorldPoint::ZERO, WorldPoint::new(0.0, 10.0), 0.5);
        let world = DemoWorld::generate(&config, &flat, &[]);
        assert_eq!(world.obstacles().len(), 1);

        let bad_radius = GridConfig::new(WorldPoint::ZERO, WorldPoint::new(10.0, 10.0), f32::NAN);
        assert_eq!(DemoWorld::generate(&config, &bad_radius, &[]).obstacles().len(), 1);

        // A valid area still gets its random obstacles despite the oversized setting.
        let world = DemoWorld::generate(&config, &grid_config(), &[]);
        assert_eq!(world.obstacles().len(), 11);
    }
}
