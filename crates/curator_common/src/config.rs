//! Configuration management for curatord.
//!
//! Loads settings from /etc/curator/config.toml or uses defaults.
//! Rules are plain `[[collection]]` tables so operators can add one
//! without touching the daemon section.

use crate::rules::{MatchMode, MatchRule};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/curator/config.toml";

/// Default daemon socket path
pub const SOCKET_PATH: &str = "/run/curator/curator.sock";

/// Daemon settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Unix socket the daemon listens on
    #[serde(default = "default_socket_path")]
    pub socket_path: String,

    /// Library snapshot file the catalog adapter reads
    #[serde(default = "default_library_snapshot")]
    pub library_snapshot: String,

    /// Collections file the store adapter owns
    #[serde(default = "default_collections_path")]
    pub collections_path: String,

    /// Hours between scheduled reconciliation passes
    #[serde(default = "default_sync_interval")]
    pub sync_interval_hours: u64,
}

fn default_socket_path() -> String {
    SOCKET_PATH.to_string()
}

fn default_library_snapshot() -> String {
    "/var/lib/curator/library.json".to_string()
}

fn default_collections_path() -> String {
    "/var/lib/curator/collections.json".to_string()
}

fn default_sync_interval() -> u64 {
    24
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            library_snapshot: default_library_snapshot(),
            collections_path: default_collections_path(),
            sync_interval_hours: default_sync_interval(),
        }
    }
}

/// One `[[collection]]` entry from the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionRule {
    #[serde(default)]
    pub terms: Vec<String>,

    #[serde(default)]
    pub mode: MatchMode,

    /// Explicit collection title; derived from the first term if absent
    #[serde(default)]
    pub title: Option<String>,
}

impl CollectionRule {
    /// Normalized rule the engine runs with.
    pub fn to_rule(&self) -> MatchRule {
        MatchRule::new(self.terms.clone(), self.mode, self.title.clone())
    }
}

fn default_collections() -> Vec<CollectionRule> {
    vec![
        CollectionRule {
            terms: vec!["christmas".to_string()],
            mode: MatchMode::Any,
            title: None,
        },
        CollectionRule {
            terms: vec!["halloween".to_string()],
            mode: MatchMode::Any,
            title: None,
        },
    ]
}

/// Full daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,

    #[serde(default = "default_collections", rename = "collection")]
    pub collections: Vec<CollectionRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon: DaemonConfig::default(),
            collections: default_collections(),
        }
    }
}

impl Config {
    /// Load config from the standard path, or return defaults.
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_PATH).unwrap_or_else(|e| {
            warn!("Config not found, using defaults: {}", e);
            Config::default()
        })
    }

    /// Load config from a specific path.
    pub fn load_from_path(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded config from {}", path);
        Ok(config)
    }

    /// Normalized rules in configured order.
    pub fn rules(&self) -> Vec<MatchRule> {
        self.collections.iter().map(|c| c.to_rule()).collect()
    }

    /// Seconds between scheduled passes; zero disables the scheduler.
    pub fn sync_interval_secs(&self) -> u64 {
        self.daemon.sync_interval_hours.saturating_mul(3600)
    }

    /// Non-fatal problems with the configured rules.
    ///
    /// The daemon logs these at startup and runs anyway; a broken rule is
    /// skipped per pass, never a reason to refuse to start.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.daemon.sync_interval_hours == 0 {
            warnings.push(
                "sync_interval_hours is 0; scheduled passes are disabled (on-demand sync still runs)"
                    .to_string(),
            );
        }

        let rules = self.rules();

        for (idx, rule) in rules.iter().enumerate() {
            if !rule.is_actionable() {
                match rule.display_title() {
                    Some(title) => warnings.push(format!(
                        "collection {} ('{}') has no usable terms and will only clear stale members",
                        idx + 1,
                        title
                    )),
                    None => warnings.push(format!(
                        "collection {} has no usable terms and no title; it will be skipped",
                        idx + 1
                    )),
                }
            }
        }

        for (i, a) in rules.iter().enumerate() {
            let Some(title_a) = a.display_title() else {
                continue;
            };
            for (j, b) in rules.iter().enumerate().skip(i + 1) {
                if let Some(title_b) = b.display_title() {
                    if crate::names_match(&title_a, &title_b) {
                        warnings.push(format!(
                            "collections {} and {} both resolve to title '{}'; they will fight over one collection",
                            i + 1,
                            j + 1,
                            title_a
                        ));
                    }
                }
            }
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.daemon.socket_path, SOCKET_PATH);
        assert_eq!(config.daemon.sync_interval_hours, 24);
        let rules = config.rules();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].terms, vec!["christmas".to_string()]);
        assert_eq!(rules[1].terms, vec!["halloween".to_string()]);
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[daemon]
sync_interval_hours = 6

[[collection]]
terms = ["christmas", "snow"]

[[collection]]
terms = ["horror", "comedy"]
mode = "all"
title = "Scary Laughs"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.daemon.sync_interval_hours, 6);
        // Defaults for missing daemon fields
        assert_eq!(config.daemon.socket_path, SOCKET_PATH);

        let rules = config.rules();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].mode, MatchMode::Any);
        assert_eq!(rules[1].mode, MatchMode::All);
        assert_eq!(rules[1].display_title().unwrap(), "Scary Laughs");
    }

    #[test]
    fn test_config_without_collections_gets_defaults() {
        let toml_str = r#"
[daemon]
sync_interval_hours = 12
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.collections.len(), 2);
        assert_eq!(config.sync_interval_secs(), 12 * 3600);
    }

    #[test]
    fn test_validate_flags_empty_rules() {
        let toml_str = r#"
[[collection]]
terms = ["  "]

[[collection]]
terms = [" "]
title = "Kept Title"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        let warnings = config.validate();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("no usable terms and no title"));
        assert!(warnings[1].contains("Kept Title"));
    }

    #[test]
    fn test_validate_flags_duplicate_titles() {
        let toml_str = r#"
[[collection]]
terms = ["christmas"]

[[collection]]
terms = ["xmas"]
title = "christmas collection"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        let warnings = config.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("fight over one collection"));
    }

    #[test]
    fn test_validate_accepts_default_config() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn test_validate_flags_zero_sync_interval() {
        let toml_str = r#"
[daemon]
sync_interval_hours = 0
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.sync_interval_secs(), 0);

        let warnings = config.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("scheduled passes are disabled"));
    }

    #[test]
    fn test_sync_interval_secs_saturates() {
        let mut config = Config::default();
        config.daemon.sync_interval_hours = u64::MAX;
        assert_eq!(config.sync_interval_secs(), u64::MAX);
    }
}
