//! # Engine Configuration
//!
//! Configuration files are TOML or RON, chosen by file extension. Every
//! field has a default, so a partial file (or none at all) is valid.
//!
//! ```toml
//! [simulation]
//! tick_rate = 20
//!
//! [collisions]
//! layers = [["FireBlast", "AirBlast"], ["AirShield"]]
//!
//! [[collisions.pairs]]
//! first = "EarthBlast"
//! second = "AirShield"
//! remove_first = true
//! remove_second = false
//! ```

use std::path::Path;
use std::time::Duration;

pub use serde::{Deserialize, Serialize};

use crate::ability::{AbilityRegistry, RegistryError};
use crate::physics::{CollisionError, CollisionLayers, RegisteredCollision};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from a `.toml` or `.ron` file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        match Format::of(path)? {
            Format::Toml => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Format::Ron => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Save configuration to a `.toml` or `.ron` file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match Format::of(path)? {
            Format::Toml => toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?,
            Format::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };

        std::fs::write(path, contents)?;
        Ok(())
    }
}

enum Format {
    Toml,
    Ron,
}

impl Format {
    fn of(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A configured ability name is not registered
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Configured collisions conflict
    #[error("Collision error: {0}")]
    Collision(#[from] CollisionError),
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tick loop settings
    pub simulation: SimulationConfig,
    /// Collision registrations
    pub collisions: CollisionConfig,
    /// Log output
    pub logging: LoggingConfig,
}

impl Config for EngineConfig {}

/// Tick loop settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Ticks per second
    pub tick_rate: u32,
    /// Run the collision pass after each update pass
    pub collisions_enabled: bool,
}

impl SimulationConfig {
    /// Length of one tick
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate.max(1)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate: 20,
            collisions_enabled: true,
        }
    }
}

/// Collision registrations by ability name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Layers from weakest to strongest
    pub layers: Vec<Vec<String>>,
    /// Explicit pairs; these override the layers
    pub pairs: Vec<CollisionPairConfig>,
}

/// One explicit colliding pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionPairConfig {
    /// First ability name
    pub first: String,
    /// Second ability name
    pub second: String,
    /// Remove the first instance on hit
    #[serde(default)]
    pub remove_first: bool,
    /// Remove the second instance on hit
    #[serde(default)]
    pub remove_second: bool,
}

impl CollisionConfig {
    /// Resolve names against `registry` into registrations
    pub fn resolve(&self, registry: &AbilityRegistry) -> Result<Vec<RegisteredCollision>, ConfigError> {
        let mut layers = CollisionLayers::new();
        for pair in &self.pairs {
            layers = layers.add(
                registry.require(&pair.first)?.clone(),
                registry.require(&pair.second)?.clone(),
                pair.remove_first,
                pair.remove_second,
            );
        }
        for layer in &self.layers {
            let abilities = layer
                .iter()
                .map(|name| registry.require(name).cloned())
                .collect::<Result<Vec<_>, _>>()?;
            layers = layers.layer(abilities);
        }
        Ok(layers.build())
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `env_logger` filter used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "info".to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::probe_type;

    fn registry() -> AbilityRegistry {
        let mut registry = AbilityRegistry::new();
        for name in ["FireBlast", "AirBlast", "AirShield", "EarthBlast"] {
            registry.register(probe_type(name)).unwrap();
        }
        registry
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.simulation.tick_rate, 20);
        assert!(config.simulation.collisions_enabled);
        assert_eq!(config.simulation.tick_duration(), Duration::from_millis(50));
        assert_eq!(config.logging.filter, "info");
        assert!(config.collisions.layers.is_empty());
    }

    #[test]
    fn test_partial_toml() {
        let config: EngineConfig = toml::from_str(
            r#"
            [simulation]
            tick_rate = 10

            [[collisions.pairs]]
            first = "EarthBlast"
            second = "AirShield"
            remove_first = true
            "#,
        )
        .unwrap();
        assert_eq!(config.simulation.tick_rate, 10);
        assert!(config.simulation.collisions_enabled);
        assert_eq!(config.collisions.pairs.len(), 1);
        assert!(config.collisions.pairs[0].remove_first);
        assert!(!config.collisions.pairs[0].remove_second);
    }

    #[test]
    fn test_ron() {
        let config: EngineConfig = ron::from_str(
            r#"(simulation: (tick_rate: 40), collisions: (layers: [["FireBlast"], ["AirShield"]]))"#,
        )
        .unwrap();
        assert_eq!(config.simulation.tick_rate, 40);
        assert_eq!(config.collisions.layers.len(), 2);
    }

    #[test]
    fn test_resolve() {
        let config = CollisionConfig {
            layers: vec![vec!["FireBlast".into(), "AirBlast".into()], vec!["AirShield".into()]],
            pairs: vec![CollisionPairConfig {
                first: "EarthBlast".into(),
                second: "AirShield".into(),
                remove_first: true,
                remove_second: false,
            }],
        };
        let registrations = config.resolve(&registry()).unwrap();
        // 1 explicit, 3 inside the first layer, 1 inside the second, 2 across
        assert_eq!(registrations.len(), 7);
        assert_eq!(registrations[0].first.name(), "EarthBlast");
    }

    #[test]
    fn test_resolve_unknown_name() {
        let config = CollisionConfig {
            layers: vec![vec!["WaterSpout".into()]],
            pairs: Vec::new(),
        };
        let err = config.resolve(&registry()).unwrap_err();
        assert!(matches!(err, ConfigError::Registry(RegistryError::UnknownAbility(name)) if name == "WaterSpout"));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("ability_engine_config_{}.toml", std::process::id()));
        let mut config = EngineConfig::default();
        config.simulation.tick_rate = 33;
        config.collisions.layers = vec![vec!["FireBlast".into()]];

        config.save_to_file(&path).unwrap();
        let loaded = EngineConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = EngineConfig::default().save_to_file("engine.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }
}
