use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::env_vars::expand_env_vars;
use crate::config::sources::{LinuxSources, MacSources, WatchedFile, WindowsSources};
use crate::constants::{
    APP_NAME, DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_LOOKBACK_HOURS, DEFAULT_MAX_HASH_SIZE_MB,
};
use crate::error::TriageError;

/// Where each platform strategy looks for its sources
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct SourcePaths {
    pub linux: LinuxSources,
    pub macos: MacSources,
    pub windows: WindowsSources,
}

/// Runtime configuration, loaded from YAML
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TriageConfig {
    pub version: String,
    pub description: String,
    /// SQLite database receiving collected records
    pub database_path: String,
    pub command_timeout_secs: u64,
    /// Window for log queries that accept one
    pub lookback_hours: u64,
    pub hash_executables: bool,
    pub max_hash_size_mb: u64,
    pub sources: SourcePaths,
    /// Replaces the built-in sensitive file table when set
    pub sensitive_files: Option<Vec<WatchedFile>>,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            description: format!("Default {} configuration", APP_NAME),
            database_path: format!("{}.db", APP_NAME),
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            lookback_hours: DEFAULT_LOOKBACK_HOURS,
            hash_executables: true,
            max_hash_size_mb: DEFAULT_MAX_HASH_SIZE_MB,
            sources: SourcePaths::default(),
            sensitive_files: None,
        }
    }
}

impl TriageConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: TriageConfig =
            serde_yaml::from_str(&content).context("Failed to parse YAML config")?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save_to_yaml_file(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .context(format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(path, yaml).context(format!("Failed to write config to {}", path.display()))?;

        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Expand environment variables in every configured path
    pub fn process_environment_variables(&mut self) {
        let expand_all = |paths: &mut Vec<String>| {
            for p in paths.iter_mut() {
                *p = expand_env_vars(p);
            }
        };

        self.database_path = expand_env_vars(&self.database_path);

        let linux = &mut self.sources.linux;
        expand_all(&mut linux.auth_logs);
        expand_all(&mut linux.crontabs);
        expand_all(&mut linux.cron_dirs);
        expand_all(&mut linux.autostart_dirs);
        expand_all(&mut linux.systemd_unit_dirs);
        linux.apt_history = expand_env_vars(&linux.apt_history);
        linux.dnf_history = expand_env_vars(&linux.dnf_history);
        linux.passwd = expand_env_vars(&linux.passwd);

        let macos = &mut self.sources.macos;
        expand_all(&mut macos.rdp_logs);
        expand_all(&mut macos.crontabs);
        expand_all(&mut macos.launch_dirs);
        macos.passwd = expand_env_vars(&macos.passwd);

        let windows = &mut self.sources.windows;
        expand_all(&mut windows.startup_dirs);
        windows.event_log_dir = expand_env_vars(&windows.event_log_dir);

        if let Some(files) = self.sensitive_files.as_mut() {
            for f in files.iter_mut() {
                f.path = expand_env_vars(&f.path);
            }
        }
    }

    /// Reject values no collection could run with
    pub fn validate(&self) -> std::result::Result<(), TriageError> {
        if self.command_timeout_secs == 0 {
            return Err(TriageError::Config("command_timeout_secs must be at least 1".to_string()));
        }
        if self.lookback_hours == 0 {
            return Err(TriageError::Config("lookback_hours must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Create a default configuration YAML file
    pub fn create_default_config_file(path: &Path) -> Result<()> {
        TriageConfig::default().save_to_yaml_file(path)
    }
}

/// Load the configuration at `config_path`, or the defaults when no path is
/// given or the file does not exist.
pub fn load_or_default(config_path: Option<&Path>) -> Result<TriageConfig> {
    match config_path {
        Some(path) if path.exists() => TriageConfig::from_yaml_file(path),
        Some(path) => {
            info!("Config {} not found, using defaults", path.display());
            Ok(TriageConfig::default())
        }
        None => Ok(TriageConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_round_trip() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested/triage.yaml");

        let mut config = TriageConfig::default();
        config.lookback_hours = 72;
        config.sources.linux.auth_logs = vec!["/tmp/auth.log".to_string()];
        config.save_to_yaml_file(&path)?;

        let loaded = TriageConfig::from_yaml_file(&path)?;
        assert_eq!(loaded, config);
        Ok(())
    }

    #[test]
    fn test_partial_yaml_uses_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("partial.yaml");
        fs::write(&path, "command_timeout_secs: 5\nsources:\n  linux:\n    passwd: /tmp/passwd\n")?;

        let loaded = TriageConfig::from_yaml_file(&path)?;
        assert_eq!(loaded.command_timeout_secs, 5);
        assert_eq!(loaded.lookback_hours, DEFAULT_LOOKBACK_HOURS);
        assert_eq!(loaded.sources.linux.passwd, "/tmp/passwd");
        assert_eq!(loaded.sources.linux.auth_logs, LinuxSources::default().auth_logs);
        Ok(())
    }

    #[test]
    fn test_load_or_default_missing_file() -> Result<()> {
        let config = load_or_default(Some(Path::new("/definitely/not/here.yaml")))?;
        assert_eq!(config, TriageConfig::default());
        Ok(())
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = TriageConfig::default();
        assert!(config.validate().is_ok());
        config.command_timeout_secs = 0;
        assert!(matches!(config.validate(), Err(TriageError::Config(_))));
    }
}
