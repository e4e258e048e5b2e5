//! Application configuration management.
//!
//! Handles loading, saving, and validating cotrace configuration including:
//! - Backend base URL
//! - Active encounter encoding version (deployment-time choice)
//! - Event retention window
//! - Exposure state windows
//! - Agent scheduling intervals

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Wire encoding version for encounter batches.
///
/// Chosen once per deployment, never per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingVersion {
    /// Legacy encoding: per-sample RSSI offsets in whole seconds.
    V1,
    /// Current encoding: per-sample absolute timestamps.
    V2,
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CotraceConfig {
    /// Backend base URL.
    pub base_url: String,

    /// Active encounter encoding version.
    pub encoding: EncodingVersion,

    /// Maximum age, in days, an event may remain in the ledger.
    pub retention_days: i64,

    /// Minutes between retention eviction runs.
    pub eviction_interval_mins: u64,

    /// Minutes between upload attempts.
    pub upload_interval_mins: u64,

    /// Exposure state windows.
    pub windows: WindowsConfig,
}

/// Fixed windows for the exposure state machine, in days.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowsConfig {
    /// How long an exposure keeps the user in the exposed state.
    pub exposure_days: i64,

    /// How long self-reported symptoms keep the user in the symptomatic state.
    pub symptomatic_days: i64,

    /// Isolation window applied when a positive test result arrives.
    pub positive_isolation_days: i64,

    /// Observation window after a symptomatic/exposed period elapses.
    pub recovery_days: i64,

    /// Re-evaluation interval while in the default state.
    pub default_days: i64,
}

impl Default for CotraceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.cotrace.example".to_string(),
            encoding: EncodingVersion::V2,
            retention_days: 30,
            eviction_interval_mins: 60,
            upload_interval_mins: 60,
            windows: WindowsConfig::default(),
        }
    }
}

impl Default for WindowsConfig {
    fn default() -> Self {
        Self {
            exposure_days: 14,
            symptomatic_days: 7,
            positive_isolation_days: 7,
            recovery_days: 1,
            default_days: 1,
        }
    }
}

impl CotraceConfig {
    /// Load configuration from the given path, falling back to defaults when
    /// the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or
    /// validated.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self =
                toml::from_str(&content).map_err(|e| CoreError::ConfigParse(e.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the given path, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| CoreError::ConfigParse(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    ///
    /// On Linux deployments: `/etc/cotrace/config.toml`.
    /// Elsewhere: the platform config directory.
    pub fn default_path() -> Result<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            Ok(PathBuf::from("/etc/cotrace/config.toml"))
        }
        #[cfg(not(target_os = "linux"))]
        {
            let dirs = directories::ProjectDirs::from("", "", "cotrace").ok_or_else(|| {
                CoreError::Storage("Cannot determine config directory".to_string())
            })?;
            Ok(dirs.config_dir().join("config.toml"))
        }
    }

    /// Retention window as a duration.
    #[must_use]
    pub fn retention_window(&self) -> Duration {
        Duration::days(self.retention_days)
    }

    fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(CoreError::ConfigValidation("base_url is empty".to_string()));
        }
        if self.retention_days <= 0 {
            return Err(CoreError::ConfigValidation(format!(
                "retention_days must be positive, got {}",
                self.retention_days
            )));
        }
        // Zero intervals would wedge the agent scheduling loops.
        let intervals = [
            ("eviction_interval_mins", self.eviction_interval_mins),
            ("upload_interval_mins", self.upload_interval_mins),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(CoreError::ConfigValidation(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        self.windows.validate()
    }
}

impl WindowsConfig {
    fn validate(&self) -> Result<()> {
        let windows = [
            ("exposure_days", self.exposure_days),
            ("symptomatic_days", self.symptomatic_days),
            ("positive_isolation_days", self.positive_isolation_days),
            ("recovery_days", self.recovery_days),
            ("default_days", self.default_days),
        ];
        for (name, value) in windows {
            if value <= 0 {
                return Err(CoreError::ConfigValidation(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CotraceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.encoding, EncodingVersion::V2);
        assert_eq!(config.retention_days, 30);
    }

    #[test]
    fn test_load_missing_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = CotraceConfig::load_or_default(&path).unwrap();
        assert_eq!(config.retention_days, CotraceConfig::default().retention_days);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = CotraceConfig::default();
        config.retention_days = 21;
        config.encoding = EncodingVersion::V1;
        config.save(&path).unwrap();

        let reloaded = CotraceConfig::load_or_default(&path).unwrap();
        assert_eq!(reloaded.retention_days, 21);
        assert_eq!(reloaded.encoding, EncodingVersion::V1);
    }

    #[test]
    fn test_invalid_retention_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = CotraceConfig::default();
        config.retention_days = 0;
        // Bypass validation by writing the raw document.
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let err = CotraceConfig::load_or_default(&path).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = CotraceConfig::default();
        config.eviction_interval_mins = 0;
        config.upload_interval_mins = 0;
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let err = CotraceConfig::load_or_default(&path).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "retention_days = [nonsense").unwrap();

        let err = CotraceConfig::load_or_default(&path).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_retention_window_duration() {
        let config = CotraceConfig::default();
        assert_eq!(config.retention_window(), Duration::days(30));
    }
}
