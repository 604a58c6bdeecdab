//! Configuration system
//!
//! Engine tuning and authored scene groups are plain serde types. Anything that
//! implements [`Config`] can be read from and written to `.toml` or `.ron` files.

pub use serde::{Serialize, Deserialize};

/// Aggregate progress at which a load batch is allowed to activate
pub const DEFAULT_ACTIVATION_THRESHOLD: f32 = 0.9;

/// Highest accepted activation threshold
///
/// Loaders park a held load at 90% until activation is allowed, so a batch
/// never averages above this while the gate is closed. A larger threshold
/// would keep the gate shut forever.
pub const MAX_ACTIVATION_THRESHOLD: f32 = 0.9;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_str_with_format(&contents, path)
    }

    /// Parse configuration text, picking the format from `path`'s extension
    fn from_str_with_format(contents: &str, path: &str) -> Result<Self, ConfigError> {
        if path.ends_with(".toml") {
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
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

    /// A value parsed but is outside its allowed range
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// # Transition Engine Configuration
///
/// Tuning knobs for the transition engine. The defaults reproduce the usual
/// engine loading behaviour: activation is released at 90% aggregate progress
/// and unused assets are purged after every unload batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Aggregate progress at which every handle in a load batch is released,
    /// in `(0, MAX_ACTIVATION_THRESHOLD]`
    pub activation_threshold: f32,
    /// Ask the loader to release unused assets once an unload batch settles
    pub release_unused_after_unload: bool,
    /// Emit per-tick progress at trace level
    pub log_progress: bool,
}

impl TransitionConfig {
    /// Set the activation threshold
    #[must_use]
    pub fn with_activation_threshold(mut self, threshold: f32) -> Self {
        self.activation_threshold = threshold;
        self
    }

    /// Enable or disable releasing unused assets after unloads
    #[must_use]
    pub fn with_release_unused_after_unload(mut self, enabled: bool) -> Self {
        self.release_unused_after_unload = enabled;
        self
    }

    /// Enable or disable per-tick progress logging
    #[must_use]
    pub fn with_progress_logging(mut self, enabled: bool) -> Self {
        self.log_progress = enabled;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.activation_threshold;
        if !threshold.is_finite() || threshold <= 0.0 || threshold > MAX_ACTIVATION_THRESHOLD {
            return Err(ConfigError::InvalidValue(format!(
                "activation_threshold must be in (0, {MAX_ACTIVATION_THRESHOLD}], got {threshold}"
            )));
        }
        Ok(())
    }
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            activation_threshold: DEFAULT_ACTIVATION_THRESHOLD,
            release_unused_after_unload: true,
            log_progress: true,
        }
    }
}

impl Config for TransitionConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TransitionConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.activation_threshold - 0.9).abs() < f32::EPSILON);
        assert!(config.release_unused_after_unload);
    }

    #[test]
    fn test_threshold_out_of_range_is_rejected() {
        for bad in [0.0, -0.5, 1.5, f32::NAN] {
            let config = TransitionConfig::default().with_activation_threshold(bad);
            assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
        }
        let max = TransitionConfig::default().with_activation_threshold(MAX_ACTIVATION_THRESHOLD);
        assert!(max.validate().is_ok());
    }

    #[test]
    fn test_threshold_above_activation_hold_is_rejected() {
        for unreachable in [0.95, 1.0] {
            let config = TransitionConfig::default().with_activation_threshold(unreachable);
            assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
        }
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config = TransitionConfig::from_str_with_format(
            "activation_threshold = 0.75\n",
            "transition.toml",
        )
        .unwrap();
        assert!((config.activation_threshold - 0.75).abs() < f32::EPSILON);
        assert!(config.release_unused_after_unload);
        assert!(config.log_progress);
    }

    #[test]
    fn test_ron_config_parses() {
        let config = TransitionConfig::from_str_with_format(
            "(activation_threshold: 0.5, release_unused_after_unload: false)",
            "transition.ron",
        )
        .unwrap();
        assert!((config.activation_threshold - 0.5).abs() < f32::EPSILON);
        assert!(!config.release_unused_after_unload);
    }

    #[test]
    fn test_unknown_extension_is_unsupported() {
        let result = TransitionConfig::from_str_with_format("", "transition.json");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_save_and_reload_toml() {
        let path = std::env::temp_dir().join("scene_groups_config_test.toml");
        let path = path.to_string_lossy().to_string();
        let config = TransitionConfig::default()
            .with_activation_threshold(0.8)
            .with_progress_logging(false);

        config.save_to_file(&path).unwrap();
        let loaded = TransitionConfig::load_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, config);
    }
}
