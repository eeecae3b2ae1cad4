use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Retry policy for UI readiness polling
///
/// The Play Store needs time to render before its buttons appear in the
/// uiautomator dump, so element lookups poll with a fixed delay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of dump-and-search attempts
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before each attempt (ms)
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_delay_ms() -> u64 {
    1000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

/// Debloat run configuration: the three package lists plus tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebloatConfig {
    /// Device serial. If unset, the single connected device is used.
    #[serde(default)]
    pub device: Option<String>,

    /// Directory for extracted APK backups. Supports a leading `~`.
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,

    #[serde(default)]
    pub retry: RetryPolicy,

    /// Packages to disable in place
    #[serde(default)]
    pub freeze: Vec<String>,

    /// Packages to back up and uninstall
    #[serde(default)]
    pub uninstall: Vec<String>,

    /// Packages to install from the Play Store
    #[serde(default)]
    pub install: Vec<String>,
}

fn default_backup_dir() -> String {
    "~/.droidsweep/apk-backup".to_string()
}

impl Default for DebloatConfig {
    fn default() -> Self {
        Self {
            device: None,
            backup_dir: default_backup_dir(),
            retry: RetryPolicy::default(),
            freeze: Vec::new(),
            uninstall: Vec::new(),
            install: Vec::new(),
        }
    }
}

impl DebloatConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: DebloatConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Backup directory with `~` expanded to the home directory
    pub fn backup_path(&self) -> PathBuf {
        expand_home(&self.backup_dir)
    }
}

/// Default config file location: ~/.droidsweep/config.yaml
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".droidsweep")
        .join("config.yaml")
}

/// Expand a leading `~` or `~/` to the user's home directory
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay_ms, 1000);
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
device: "192.168.1.50:5555"
backup_dir: /tmp/backups
retry:
  max_attempts: 3
  delay_ms: 500
freeze:
  - com.example.bloat
uninstall:
  - com.example.junk
install:
  - org.example.useful
"#;
        let config: DebloatConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.device.as_deref(), Some("192.168.1.50:5555"));
        assert_eq!(config.backup_dir, "/tmp/backups");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.delay_ms, 500);
        assert_eq!(config.freeze, vec!["com.example.bloat"]);
        assert_eq!(config.uninstall, vec!["com.example.junk"]);
        assert_eq!(config.install, vec!["org.example.useful"]);
    }

    #[test]
    fn test_parse_minimal_config_uses_defaults() {
        let yaml = "freeze:\n  - com.example.bloat\n";
        let config: DebloatConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.device.is_none());
        assert_eq!(config.backup_dir, "~/.droidsweep/apk-backup");
        assert_eq!(config.retry, RetryPolicy::default());
        assert!(config.uninstall.is_empty());
        assert!(config.install.is_empty());
    }

    #[test]
    fn test_expand_home_passthrough() {
        assert_eq!(expand_home("/tmp/x"), PathBuf::from("/tmp/x"));
        assert_eq!(expand_home("relative/dir"), PathBuf::from("relative/dir"));
    }

    #[test]
    fn test_expand_home_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/backups"), home.join("backups"));
            assert_eq!(expand_home("~"), home);
        }
    }
}
