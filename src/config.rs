use anyhow::Context;
use config::{Config, Environment, File, FileFormat, Source};
use serde::Deserialize;
use tracing::{error, info};
use wayfinder_navigation::{GridConfig, PathServiceConfig};

use crate::agent::AgentConfig;
use crate::world::WorldConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Prefix of environment overrides, e.g. `WAYFINDER__GRID__CELL_RADIUS=0.25`.
const ENV_PREFIX: &str = "WAYFINDER";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub grid: GridConfig,
    #[serde(default)]
    pub world: WorldConfig,
    pub agent: AgentConfig,
    #[serde(default)]
    pub service: PathServiceConfig,
}

/// Loads the TOML file at `path` (required) with environment overrides on top.
pub fn load_config(path: &str) -> anyhow::Result<AppConfig> {
    info!("Attempting to load configuration from {}", path);

    match build(File::new(path, FileFormat::Toml).required(true)) {
        Ok(config) => {
            info!(
                width = config.grid.world_size.x,
                height = config.grid.world_size.y,
                cell_radius = config.grid.cell_radius,
                workers = config.service.workers,
                "Successfully loaded configuration"
            );
            Ok(config)
        }
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            Err(e).with_context(|| format!("loading configuration from {}", path))
        }
    }
}

fn build<S: Source + Send + Sync + 'static>(file: S) -> anyhow::Result<AppConfig> {
    let settings = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfinder_geometry::WorldPoint;

    const MINIMAL: &str = r#"
        [grid]
        world_size = { x = 30.0, y = 20.0 }
        cell_radius = 0.5

        [agent]
        start = { x = -10.0, y = -5.0 }
        target = { x = 10.0, y = 5.0 }
    "#;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = build(File::from_str(MINIMAL, FileFormat::Toml)).unwrap();
        assert_eq!(config.grid.world_size, WorldPoint::new(30.0, 20.0));
        assert_eq!(config.grid.center, WorldPoint::ZERO);
        assert_eq!(config.grid.blur_radius, 3);
        assert_eq!(config.grid.obstacle_proximity_penalty, 10);
        assert_eq!(config.service, PathServiceConfig::default());
        assert_eq!(config.world.random_obstacles, 0);
        assert_eq!(config.agent.speed, 4.0);
        assert_eq!(config.agent.rate_hz, 100);
        assert_eq!(config.agent.path_update_threshold, 0.5);
        assert_eq!(config.agent.min_path_update_s, 0.2);
        assert_eq!(config.agent.target_velocity, WorldPoint::ZERO);
    }

    #[test]
    fn test_full_config() {
        let toml = r#"
            [grid]
            center = { x = 1.0, y = 2.0 }
            world_size = { x = 10.0, y = 10.0 }
            cell_radius = 0.25
            blur_radius = 1
            terrain_penalties = [ { class = 1, penalty = 20 }, { class = 2, penalty = 5 } ]

            [world]
            random_obstacles = 4
            seed = 9
            obstacles = [ { min = { x = 0.0, y = 0.0 }, max = { x = 1.0, y = 3.0 } } ]
            terrain = [ { min = { x = -4.0, y = -4.0 }, max = { x = 0.0, y = 0.0 }, class = 1 } ]

            [agent]
            start = { x = -3.0, y = -3.0 }
            target = { x = 4.0, y = 4.0 }
            turn_distance = 0.5

            [service]
            workers = 4
        "#;
        let config = build(File::from_str(toml, FileFormat::Toml)).unwrap();
        assert_eq!(config.grid.terrain_penalties.len(), 2);
        assert_eq!(config.grid.blur_radius, 1);
        assert_eq!(config.world.obstacles.len(), 1);
        assert_eq!(config.world.terrain[0].class, 1);
        assert_eq!(config.agent.turn_distance, 0.5);
        assert_eq!(config.service.workers, 4);
        assert_eq!(config.service.queue_capacity, 32);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_config("does/not/exist.toml").is_err());
    }

    #[test]
    fn test_shipped_default_config_parses() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/", "config/default.toml");
        let config = load_config(path).unwrap();
        assert!(config.grid.validate().is_ok());
        assert_eq!(config.agent.target_velocity, WorldPoint::new(-0.4, 0.0));
    }
}
