//! Configuration for squat-coach.

use crate::coach::dispatcher::DEFAULT_ADVICE_TIMEOUT;
use crate::core::feedback::FeedbackPolicy;
use crate::core::state_machine::{MachineSettings, Thresholds, DEFAULT_DEBOUNCE_MS};
use crate::core::visibility::{VisibilityGate, DEFAULT_MIN_VISIBILITY};
use crate::pose::types::JointTriple;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Depth and standing angles
    #[serde(default)]
    pub thresholds: Thresholds,

    /// Minimum time between two transitions of the same kind
    #[serde(with = "duration_ms", default = "default_debounce")]
    pub debounce: Duration,

    /// Which joints are analyzed and required
    #[serde(default)]
    pub joints: JointConfig,

    /// Feedback policy and collaborator settings
    #[serde(default)]
    pub coaching: CoachingConfig,

    /// Path for session statistics
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// Seed for canned phrase selection; random when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_debounce() -> Duration {
    Duration::from_millis(DEFAULT_DEBOUNCE_MS)
}

fn default_data_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("squat-coach")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            debounce: default_debounce(),
            joints: JointConfig::default(),
            coaching: CoachingConfig::default(),
            data_path: default_data_path(),
            seed: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location, or defaults if absent.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load and validate a configuration file.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("squat-coach")
            .join("config.json")
    }

    /// Path of the persisted session statistics.
    pub fn stats_path(&self) -> PathBuf {
        self.data_path.join("last_session.json")
    }

    /// Check that the values describe a usable state machine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Thresholds { down_deg, up_deg } = self.thresholds;
        let in_range = |v: f64| (0.0..=180.0).contains(&v);

        if !in_range(down_deg) || !in_range(up_deg) {
            return Err(ConfigError::Invalid(format!(
                "thresholds must lie in [0, 180], got down={down_deg} up={up_deg}"
            )));
        }
        if down_deg >= up_deg {
            return Err(ConfigError::Invalid(format!(
                "down threshold ({down_deg}) must be below up threshold ({up_deg})"
            )));
        }
        if self.debounce.is_zero() {
            return Err(ConfigError::Invalid("debounce must be non-zero".to_string()));
        }
        if !(0.0..=1.0).contains(&self.joints.min_visibility) {
            return Err(ConfigError::Invalid(format!(
                "min_visibility must lie in [0, 1], got {}",
                self.joints.min_visibility
            )));
        }
        if self.coaching.advice_timeout.is_zero() || self.coaching.status_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "advice_timeout and status_interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Thresholds and debounce for the state machine.
    pub fn machine_settings(&self) -> MachineSettings {
        MachineSettings {
            thresholds: self.thresholds,
            debounce_ms: self.debounce.as_millis() as u64,
        }
    }

    /// Gate over both joint triples plus any extra required joints.
    pub fn visibility_gate(&self) -> VisibilityGate {
        VisibilityGate::new(
            &[self.joints.left, self.joints.right],
            &self.joints.extra_required,
            self.joints.min_visibility,
        )
    }

    /// Milestone and advice intervals for the feedback selector.
    pub fn feedback_policy(&self) -> FeedbackPolicy {
        FeedbackPolicy {
            milestone_every: self.coaching.milestone_every,
            advice_every: self.coaching.advice_every,
        }
    }
}

/// Joint selection for the tracked exercise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JointConfig {
    pub left: JointTriple,
    pub right: JointTriple,
    /// Joints required beyond the two triples
    #[serde(default)]
    pub extra_required: Vec<usize>,
    /// Minimum visibility score for a required joint
    pub min_visibility: f64,
}

impl Default for JointConfig {
    fn default() -> Self {
        Self {
            left: JointTriple::LEFT_KNEE,
            right: JointTriple::RIGHT_KNEE,
            extra_required: Vec::new(),
            min_visibility: DEFAULT_MIN_VISIBILITY,
        }
    }
}

/// Feedback and collaborator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachingConfig {
    pub milestone_every: u32,
    pub advice_every: u32,
    /// Ask the advice provider on claimed reps
    pub advice_enabled: bool,
    #[serde(with = "duration_ms")]
    pub advice_timeout: Duration,
    /// How often a real-time coach receives a status update
    #[serde(with = "duration_ms")]
    pub status_interval: Duration,
}

impl Default for CoachingConfig {
    fn default() -> Self {
        let policy = FeedbackPolicy::default();
        Self {
            milestone_every: policy.milestone_every,
            advice_every: policy.advice_every,
            advice_enabled: false,
            advice_timeout: DEFAULT_ADVICE_TIMEOUT,
            status_interval: Duration::from_secs(3),
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration as milliseconds.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.thresholds.down_deg, 110.0);
        assert_eq!(config.thresholds.up_deg, 150.0);
        assert_eq!(config.debounce, Duration::from_millis(1_000));
        assert_eq!(config.coaching.milestone_every, 5);
        assert_eq!(config.coaching.advice_every, 3);
        assert!(!config.coaching.advice_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_durations_serialize_as_millis() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert_eq!(json["debounce"], 1_000);
        assert_eq!(json["coaching"]["status_interval"], 3_000);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"data_path":"/tmp/sc","thresholds":{"down_deg":100.0,"up_deg":160.0}}"#)
                .unwrap();
        assert_eq!(config.thresholds.down_deg, 100.0);
        assert_eq!(config.debounce, Duration::from_millis(1_000));
        assert_eq!(config.visibility_gate().required_joints(), &[23, 24, 25, 26, 27, 28]);
    }

    #[test]
    fn test_missing_data_path_uses_default() {
        let config: Config =
            serde_json::from_str(r#"{"thresholds":{"down_deg":100.0,"up_deg":160.0}}"#).unwrap();
        assert_eq!(config.data_path, Config::default().data_path);
        assert!(config.stats_path().ends_with("squat-coach/last_session.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_inverted_thresholds() {
        let mut config = Config::default();
        config.thresholds = Thresholds {
            down_deg: 150.0,
            up_deg: 110.0,
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.thresholds = Thresholds {
            down_deg: 110.0,
            up_deg: 190.0,
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validation_rejects_zero_debounce() {
        let mut config = Config::default();
        config.debounce = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("squat-coach-config-{}", uuid::Uuid::new_v4()))
            .join("config.json");
        let mut config = Config::default();
        config.seed = Some(7);
        config.coaching.advice_enabled = true;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.seed, Some(7));
        assert!(loaded.coaching.advice_enabled);
        assert_eq!(loaded.machine_settings(), config.machine_settings());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
