// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/watchpost-rs

//! Configuration module

mod store;

pub use store::{ConfigChange, ConfigStore};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, Level};

use crate::alerts::BehaviourType;
use crate::error::ValidationErrors;
use crate::export::ExportConfig;

/// Environment variable consulted when `ai.api_key` is empty
pub const AI_KEY_ENV: &str = "WATCHPOST_AI_API_KEY";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Application version
    pub version: String,

    /// Data directory
    pub data_dir: PathBuf,

    /// Log level
    pub log_level: String,

    /// Alert simulation settings
    pub simulation: SimulationConfig,

    /// Detection and behavior thresholds
    pub monitor: MonitorConfig,

    /// Generative-AI collaborator
    pub ai: AiConfig,

    /// Alert export
    pub export: ExportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "Watchpost".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: PathBuf::from("./data"),
            log_level: "info".to_string(),
            simulation: SimulationConfig::default(),
            monitor: MonitorConfig::default(),
            ai: AiConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            // Create parent directories
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// `log_level` as a tracing level; unknown names fall back to INFO
    pub fn tracing_level(&self) -> Level {
        self.log_level.trim().parse().unwrap_or(Level::INFO)
    }

    /// Where export files land; a relative `export.path` sits under `data_dir`
    pub fn export_dir(&self) -> PathBuf {
        self.data_dir.join(&self.export.path)
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("watchpost"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// Alert simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seconds between simulation ticks
    pub tick_interval_secs: u64,

    /// Cameras alerts are attributed to
    pub cameras: Vec<String>,

    /// Synthetic person ids are drawn from 1..=person_id_max
    pub person_id_max: u32,

    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,

    /// Start with the built-in sample alerts
    pub seed_alerts: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 10,
            cameras: vec!["cam-01".to_string(), "cam-02".to_string(), "cam-03".to_string()],
            person_id_max: 10,
            seed: None,
            seed_alerts: true,
        }
    }
}

impl SimulationConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.max(1))
    }
}

/// Generative-AI collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub enabled: bool,

    /// OpenAI-compatible API root
    pub base_url: String,

    /// Bearer token; falls back to `WATCHPOST_AI_API_KEY`
    pub api_key: String,

    pub model: String,

    /// Cap on a single in-flight request
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 60,
        }
    }
}

impl AiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Configured key, or the environment fallback
    pub fn resolved_api_key(&self) -> Option<String> {
        if !self.api_key.is_empty() {
            return Some(self.api_key.clone());
        }
        std::env::var(AI_KEY_ENV).ok().filter(|k| !k.is_empty())
    }
}

/// Detection and behavior thresholds edited by operators.
///
/// Replaced as a whole through [`ConfigStore::update`]; bounds are enforced by
/// [`MonitorConfig::validate`] before that call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub detection: DetectionSettings,
    pub behavior: BehaviorSettings,
    pub camera: CameraSettings,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            detection: DetectionSettings { confidence: 0.5 },
            behavior: BehaviorSettings {
                fall: FallSettings {
                    enabled: true,
                    velocity_threshold: 0.8,
                },
                lying: DwellSettings {
                    enabled: true,
                    seconds: 3.0,
                },
                loitering: DwellSettings {
                    enabled: false,
                    seconds: 30.0,
                },
            },
            camera: CameraSettings {
                source: "0".to_string(),
                fps: 30,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSettings {
    /// Minimum confidence gate, [0, 1]
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorSettings {
    pub fall: FallSettings,
    pub lying: DwellSettings,
    pub loitering: DwellSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallSettings {
    pub enabled: bool,
    pub velocity_threshold: f64,
}

/// A behavior that triggers after a person stays put for `seconds`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DwellSettings {
    pub enabled: bool,
    pub seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    /// Device index or stream URL
    pub source: String,
    pub fps: u32,
}

impl MonitorConfig {
    /// Whether the simulator may produce `behaviour`
    pub fn is_enabled(&self, behaviour: BehaviourType) -> bool {
        match behaviour {
            BehaviourType::Fall => self.behavior.fall.enabled,
            BehaviourType::LyingMotionless => self.behavior.lying.enabled,
            BehaviourType::Loitering => self.behavior.loitering.enabled,
        }
    }

    pub fn enabled_behaviours(&self) -> Vec<BehaviourType> {
        BehaviourType::ALL
            .into_iter()
            .filter(|b| self.is_enabled(*b))
            .collect()
    }

    /// Field-level bound checks run before a config reaches the store
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if self.camera.source.trim().is_empty() {
            errors.push("camera.source", "Camera source cannot be empty.");
        }
        if !(1..=60).contains(&self.camera.fps) {
            errors.push("camera.fps", "FPS must be between 1 and 60.");
        }
        check_range(&mut errors, "detection.confidence", self.detection.confidence, 0.0, 1.0);
        check_range(
            &mut errors,
            "behavior.fall.velocity_threshold",
            self.behavior.fall.velocity_threshold,
            0.0,
            2.0,
        );
        check_range(&mut errors, "behavior.lying.seconds", self.behavior.lying.seconds, 1.0, 20.0);
        check_range(
            &mut errors,
            "behavior.loitering.seconds",
            self.behavior.loitering.seconds,
            5.0,
            120.0,
        );

        errors.into_result()
    }
}

fn check_range(errors: &mut ValidationErrors, field: &str, value: f64, min: f64, max: f64) {
    // NaN fails both comparisons
    if !(value >= min && value <= max) {
        errors.push(field, format!("Must be between {} and {}.", min, max));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(MonitorConfig::default().validate().is_ok());
        assert_eq!(
            MonitorConfig::default().enabled_behaviours(),
            vec![BehaviourType::Fall, BehaviourType::LyingMotionless]
        );
    }

    #[test]
    fn test_validation_reports_each_field() {
        let mut config = MonitorConfig::default();
        config.camera.source = "  ".to_string();
        config.camera.fps = 0;
        config.detection.confidence = 1.5;
        config.behavior.lying.seconds = 0.5;
        config.behavior.loitering.seconds = f64::NAN;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.iter().count(), 5);
        assert_eq!(errors.field("camera.source"), Some("Camera source cannot be empty."));
        assert!(errors.field("detection.confidence").is_some());
        assert!(errors.field("behavior.loitering.seconds").is_some());
        assert!(errors.field("behavior.fall.velocity_threshold").is_none());
    }

    #[test]
    fn test_tracing_level_from_log_level() {
        let mut config = Config::default();
        assert_eq!(config.tracing_level(), Level::INFO);

        config.log_level = "debug".to_string();
        assert_eq!(config.tracing_level(), Level::DEBUG);
        config.log_level = " WARN ".to_string();
        assert_eq!(config.tracing_level(), Level::WARN);
        config.log_level = "chatty".to_string();
        assert_eq!(config.tracing_level(), Level::INFO);
    }

    #[test]
    fn test_export_dir_under_data_dir() {
        let mut config = Config::default();
        assert_eq!(config.export_dir(), PathBuf::from("./data").join("exports"));

        config.data_dir = PathBuf::from("/var/lib/watchpost");
        assert_eq!(config.export_dir(), PathBuf::from("/var/lib/watchpost/exports"));

        let absolute = std::env::temp_dir().join("watchpost-out");
        config.export.path = absolute.to_string_lossy().into_owned();
        assert_eq!(config.export_dir(), absolute);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let mut config = MonitorConfig::default();
        config.detection.confidence = 1.0;
        config.behavior.fall.velocity_threshold = 0.0;
        config.behavior.lying.seconds = 20.0;
        config.behavior.loitering.seconds = 5.0;
        config.camera.fps = 60;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut created = Config::load_or_create(&path).unwrap();
        assert!(path.exists());

        created.monitor.behavior.loitering.enabled = true;
        created.monitor.behavior.fall.velocity_threshold = 1.25;
        created.monitor.camera.source = "rtsp://10.0.0.4/stream".to_string();
        created.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.monitor, created.monitor);
        assert_eq!(loaded.simulation.cameras.len(), 3);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[simulation]\ntick_interval_secs = 2\n").unwrap();
        assert_eq!(config.simulation.tick_interval(), Duration::from_secs(2));
        assert_eq!(config.simulation.person_id_max, 10);
        assert_eq!(config.monitor, MonitorConfig::default());
    }
}
