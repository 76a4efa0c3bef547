//! Configuration system
//!
//! Collision tuning lives in [`CollisionConfig`]. Like every other config in
//! the engine it round-trips through TOML or RON via the [`Config`] trait.

pub use serde::{Serialize, Deserialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        // Try different formats
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
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

    /// A value was out of its allowed range
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        /// Name of the offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// # Collision Configuration
///
/// Tuning knobs for the collision worker and its bounding volume hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Margin added on every side of a leaf box in the BVH.
    ///
    /// Shapes that move less than this between ticks only refit, they are
    /// not re-inserted.
    pub fat_margin: f32,

    /// Upper bound on commands applied per tick (0 means drain everything queued at tick start)
    pub max_commands_per_tick: usize,

    /// Upper bound on queries answered per tick (0 means drain everything queued at tick start)
    pub max_queries_per_tick: usize,

    /// Ticks a completed result may wait unclaimed before it is discarded
    pub result_horizon_ticks: u64,

    /// Name given to the worker thread
    pub worker_thread_name: String,

    /// Length used for rays that do not specify one
    pub ray_cast_max_distance: f32,

    /// Segments per circle when drawing spheres and capsules
    pub debug_sphere_segments: u32,

    /// How many retired shapes of each type are kept for reuse
    pub shape_pool_capacity: usize,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            fat_margin: 0.1,
            max_commands_per_tick: 0,
            max_queries_per_tick: 0,
            result_horizon_ticks: 120,
            worker_thread_name: "collision-worker".to_string(),
            ray_cast_max_distance: 1.0e6,
            debug_sphere_segments: 16,
            shape_pool_capacity: 64,
        }
    }
}

impl Config for CollisionConfig {}

impl CollisionConfig {
    /// Set the BVH fattening margin
    pub fn with_fat_margin(mut self, margin: f32) -> Self {
        self.fat_margin = margin;
        self
    }

    /// Bound the commands applied per tick
    pub fn with_max_commands_per_tick(mut self, count: usize) -> Self {
        self.max_commands_per_tick = count;
        self
    }

    /// Bound the queries answered per tick
    pub fn with_max_queries_per_tick(mut self, count: usize) -> Self {
        self.max_queries_per_tick = count;
        self
    }

    /// Set how long unclaimed results survive
    pub fn with_result_horizon_ticks(mut self, ticks: u64) -> Self {
        self.result_horizon_ticks = ticks;
        self
    }

    /// Set the worker thread name
    pub fn with_worker_thread_name(mut self, name: impl Into<String>) -> Self {
        self.worker_thread_name = name.into();
        self
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fat_margin.is_finite() || self.fat_margin < 0.0 {
            return Err(ConfigError::Invalid {
                field: "fat_margin",
                reason: format!("must be finite and non-negative, got {}", self.fat_margin),
            });
        }
        if self.result_horizon_ticks == 0 {
            return Err(ConfigError::Invalid {
                field: "result_horizon_ticks",
                reason: "must be at least one tick".to_string(),
            });
        }
        if !(self.ray_cast_max_distance.is_finite() && self.ray_cast_max_distance > 0.0) {
            return Err(ConfigError::Invalid {
                field: "ray_cast_max_distance",
                reason: format!("must be finite and positive, got {}", self.ray_cast_max_distance),
            });
        }
        if self.debug_sphere_segments < 3 {
            return Err(ConfigError::Invalid {
                field: "debug_sphere_segments",
                reason: "need at least three segments".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(CollisionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = CollisionConfig::default()
            .with_fat_margin(0.5)
            .with_max_commands_per_tick(10)
            .with_max_queries_per_tick(20)
            .with_result_horizon_ticks(3)
            .with_worker_thread_name("test-worker");

        assert_eq!(config.fat_margin, 0.5);
        assert_eq!(config.max_commands_per_tick, 10);
        assert_eq!(config.max_queries_per_tick, 20);
        assert_eq!(config.result_horizon_ticks, 3);
        assert_eq!(config.worker_thread_name, "test-worker");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = CollisionConfig::default().with_fat_margin(-1.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "fat_margin", .. })
        ));

        let config = CollisionConfig::default().with_result_horizon_ticks(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_and_ron_round_trip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = CollisionConfig::default().with_fat_margin(0.25);

        let toml_path = dir.path().join("collision.toml");
        let toml_path = toml_path.to_str().expect("utf8 path");
        config.save_to_file(toml_path).expect("save toml");
        assert_eq!(CollisionConfig::load_from_file(toml_path).expect("load toml"), config);

        let ron_path = dir.path().join("collision.ron");
        let ron_path = ron_path.to_str().expect("utf8 path");
        config.save_to_file(ron_path).expect("save ron");
        assert_eq!(CollisionConfig::load_from_file(ron_path).expect("load ron"), config);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = CollisionConfig::default().save_to_file("collision.json");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
