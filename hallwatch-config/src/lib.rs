use serde::Deserialize;
use std::path::Path;
use std::fs;
use thiserror::Error;

// --- Error Type ---
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

// --- Enums for Choices ---
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Push,
    Poll,
}

impl Default for TransportMode {
    fn default() -> Self {
        TransportMode::Push // Push channel preferred; poll is the fallback
    }
}

// --- Configuration Sections ---

#[derive(Deserialize, Debug, Clone)]
pub struct ServerSettings {
    pub base_url: String,
    #[serde(default = "default_room")]
    pub room: String,
}

fn default_room() -> String { "default".to_string() }

#[derive(Deserialize, Debug, Clone)]
pub struct DisplaySettings {
    #[serde(default = "default_framerate")]
    pub framerate: u32,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: f32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: f32,
    /// Emit a frame every N render ticks.
    #[serde(default = "default_output_every")]
    pub output_every: u32,
}

fn default_framerate() -> u32 { 60 }
fn default_viewport_width() -> f32 { 1920.0 }
fn default_viewport_height() -> f32 { 1080.0 }
fn default_output_every() -> u32 { 1 }

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            framerate: default_framerate(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            output_every: default_output_every(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct SyncSettings {
    #[serde(default)]
    pub transport: TransportMode,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_backoff_floor_ms")]
    pub backoff_floor_ms: u64,
    #[serde(default = "default_backoff_ceiling_ms")]
    pub backoff_ceiling_ms: u64,
    /// Consecutive push failures before the parallel poll fallback starts.
    #[serde(default = "default_failure_threshold")]
    pub push_failure_threshold: u32,
    /// Consecutive poll failures before connectivity is marked lost.
    #[serde(default = "default_failure_threshold")]
    pub poll_failure_threshold: u32,
}

fn default_poll_interval_ms() -> u64 { 2_000 }
fn default_backoff_floor_ms() -> u64 { 2_000 }
fn default_backoff_ceiling_ms() -> u64 { 30_000 }
fn default_failure_threshold() -> u32 { 3 }

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            transport: TransportMode::default(),
            poll_interval_ms: default_poll_interval_ms(),
            backoff_floor_ms: default_backoff_floor_ms(),
            backoff_ceiling_ms: default_backoff_ceiling_ms(),
            push_failure_threshold: default_failure_threshold(),
            poll_failure_threshold: default_failure_threshold(),
        }
    }
}

/// Constants for one spring-driven property.
#[derive(Deserialize, Debug, Clone, Copy)]
pub struct SpringConstants {
    pub stiffness: f32,
    pub damping: f32,
    #[serde(default = "default_mass")]
    pub mass: f32,
}

fn default_mass() -> f32 { 1.0 }

#[derive(Deserialize, Debug, Clone)]
pub struct SpringSettings {
    #[serde(default = "default_position_spring")]
    pub position: SpringConstants,
    #[serde(default = "default_scale_spring")]
    pub scale: SpringConstants,
    #[serde(default = "default_rotation_spring")]
    pub rotation: SpringConstants,
}

fn default_position_spring() -> SpringConstants {
    SpringConstants { stiffness: 170.0, damping: 26.0, mass: 1.0 }
}
fn default_scale_spring() -> SpringConstants {
    SpringConstants { stiffness: 200.0, damping: 20.0, mass: 1.0 }
}
fn default_rotation_spring() -> SpringConstants {
    SpringConstants { stiffness: 120.0, damping: 14.0, mass: 1.0 }
}

impl Default for SpringSettings {
    fn default() -> Self {
        Self {
            position: default_position_spring(),
            scale: default_scale_spring(),
            rotation: default_rotation_spring(),
        }
    }
}

// --- Top-Level Config Struct ---

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub server: ServerSettings,
    #[serde(default)]
    pub display: DisplaySettings,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub springs: SpringSettings,
}

// --- Loading Function ---

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: Config = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&content)?,
        _ => serde_json::from_str(&content)?,
    };
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.server.base_url.is_empty() {
        return Err(ConfigError::Validation("server.base_url cannot be empty.".to_string()));
    }
    if config.display.framerate == 0 {
        return Err(ConfigError::Validation("display.framerate cannot be zero.".to_string()));
    }
    if config.display.viewport_width <= 0.0 || config.display.viewport_height <= 0.0 {
        return Err(ConfigError::Validation("display viewport dimensions must be positive.".to_string()));
    }
    if config.display.output_every == 0 {
        return Err(ConfigError::Validation("display.output_every cannot be zero.".to_string()));
    }
    if config.sync.poll_interval_ms == 0 {
        return Err(ConfigError::Validation("sync.poll_interval_ms cannot be zero.".to_string()));
    }
    if config.sync.backoff_floor_ms == 0 || config.sync.backoff_floor_ms > config.sync.backoff_ceiling_ms {
        return Err(ConfigError::Validation(
            "sync backoff floor must be nonzero and no greater than the ceiling.".to_string(),
        ));
    }
    if config.sync.push_failure_threshold == 0 || config.sync.poll_failure_threshold == 0 {
        return Err(ConfigError::Validation("sync failure thresholds must be at least 1.".to_string()));
    }
    for (label, constants) in [
        ("position", &config.springs.position),
        ("scale", &config.springs.scale),
        ("rotation", &config.springs.rotation),
    ] {
        if constants.stiffness <= 0.0 || constants.damping < 0.0 || constants.mass <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "springs.{label}: stiffness and mass must be positive, damping non-negative."
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn write_config(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn load_valid_json_config() {
        let content = r#"{
          "server": { "base_url": "http://127.0.0.1:5000", "room": "247" },
          "display": { "framerate": 60, "viewport_width": 1920.0, "viewport_height": 1080.0 },
          "sync": { "transport": "push", "poll_interval_ms": 2000 }
        }"#;
        let file = write_config(".json", content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.server.room, "247");
        assert_eq!(config.display.framerate, 60);
        assert_eq!(config.sync.transport, TransportMode::Push);
        assert_eq!(config.sync.backoff_ceiling_ms, 30_000);
        assert_eq!(config.springs.position.stiffness, 170.0);
    }

    #[test]
    fn load_valid_toml_config() {
        let content = r#"
          [server]
          base_url = "http://127.0.0.1:5000"

          [sync]
          transport = "poll"
          poll_interval_ms = 1500
        "#;
        let file = write_config(".toml", content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.server.room, "default");
        assert_eq!(config.sync.transport, TransportMode::Poll);
        assert_eq!(config.sync.poll_interval_ms, 1500);
    }

    #[test]
    fn load_invalid_framerate() {
        let content = r#"{
          "server": { "base_url": "http://127.0.0.1:5000" },
          "display": { "framerate": 0 }
        }"#;
        let file = write_config(".json", content);
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn backoff_floor_above_ceiling_rejected() {
        let content = r#"{
          "server": { "base_url": "http://127.0.0.1:5000" },
          "sync": { "backoff_floor_ms": 60000, "backoff_ceiling_ms": 30000 }
        }"#;
        let file = write_config(".json", content);
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn unknown_transport_rejected_at_parse() {
        let content = r#"{
          "server": { "base_url": "http://127.0.0.1:5000" },
          "sync": { "transport": "carrier_pigeon" }
        }"#;
        let file = write_config(".json", content);
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::JsonParse(_))));
    }
}
