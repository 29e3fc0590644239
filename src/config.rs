//! Configuration for the speech synthesizer capability agent.
//!
//! This is plumbing for the demonstration binary, not part of the agent's
//! core contract: channel capacities, the focus-channel name, and the
//! shutdown drain timeout are the only knobs a deployment would plausibly
//! want to tune. Settings round-trip through TOML the same way the rest of
//! this crate's ambient configuration would in a larger deployment.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Agent-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesizerConfig {
    /// Name of the audio channel used when requesting focus (e.g. "Dialog").
    pub focus_channel: String,

    /// Capacity of the executor's task queue before `send` blocks the caller.
    pub executor_queue_capacity: usize,

    /// How long `shutdown()` waits for the executor to drain in-flight tasks
    /// before giving up and reporting shutdown-failure for anything left.
    pub shutdown_drain_timeout: Duration,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            focus_channel: "Dialog".to_string(),
            executor_queue_capacity: 64,
            shutdown_drain_timeout: Duration::from_secs(2),
        }
    }
}

impl SynthesizerConfig {
    /// Load configuration from a TOML file.
    ///
    /// Falls back to defaults (with a warning) if the file is missing or
    /// fails to parse; a capability agent should never fail to start because
    /// of a bad config file.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no config file found, using defaults");
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "loaded config");
                    config
                }
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to read config, using defaults");
                Self::default()
            }
        }
    }

    /// Save configuration to a TOML file, writing atomically (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
        }

        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        let temp_path = path.with_extension("toml.tmp");
        std::fs::write(&temp_path, &contents)
            .map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
        std::fs::rename(&temp_path, path)
            .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

        tracing::info!(path = %path.display(), "saved config");
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(std::path::PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(std::path::PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(std::path::PathBuf, std::path::PathBuf, std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = SynthesizerConfig::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("focus_channel"));
    }

    #[test]
    fn config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = SynthesizerConfig::default();
        config.focus_channel = "Communications".to_string();
        config.executor_queue_capacity = 128;
        config.save(&path).unwrap();

        let loaded = SynthesizerConfig::load(&path);
        assert_eq!(loaded.focus_channel, "Communications");
        assert_eq!(loaded.executor_queue_capacity, 128);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.toml");
        let loaded = SynthesizerConfig::load(&path);
        assert_eq!(loaded.focus_channel, "Dialog");
    }
}
