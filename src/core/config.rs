//! Environment-driven bot configuration
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub key_file: PathBuf,
    pub database_path: String,
    pub audio_dir: PathBuf,
    pub audio_config_path: PathBuf,
    pub announce_channel_id: Option<u64>,
    pub log_level: String,
    pub reauth_interval: Duration,
    pub command_prefix: String,
    pub rate_limit_max: usize,
    pub rate_limit_window: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup (used by tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| -> String {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let discord_token = lookup("DISCORD_TOKEN")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow!("DISCORD_TOKEN must be set"))?;

        let announce_channel_id = match lookup("ANNOUNCE_CHANNEL_ID").filter(|v| !v.trim().is_empty())
        {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("ANNOUNCE_CHANNEL_ID is not a channel id: {raw}"))?,
            ),
            None => None,
        };

        let reauth_secs: u64 = var("REAUTH_INTERVAL_SECS", "3600")
            .parse()
            .context("REAUTH_INTERVAL_SECS must be a number of seconds")?;
        if reauth_secs == 0 {
            return Err(anyhow!("REAUTH_INTERVAL_SECS must be greater than zero"));
        }

        let rate_limit_max: usize = var("RATE_LIMIT_MAX", "5")
            .parse()
            .context("RATE_LIMIT_MAX must be a number")?;
        let rate_limit_window_secs: u64 = var("RATE_LIMIT_WINDOW_SECS", "10")
            .parse()
            .context("RATE_LIMIT_WINDOW_SECS must be a number of seconds")?;

        Ok(Config {
            discord_token,
            key_file: PathBuf::from(var("KEY_FILE", "./sotbot.key")),
            database_path: var("DATABASE_PATH", "./sotbot.db"),
            audio_dir: PathBuf::from(var("AUDIO_DIR", "./media/audio")),
            audio_config_path: PathBuf::from(var("AUDIO_CONFIG_PATH", "audio.yaml")),
            announce_channel_id,
            log_level: var("LOG_LEVEL", "info"),
            reauth_interval: Duration::from_secs(reauth_secs),
            command_prefix: var("COMMAND_PREFIX", "!"),
            rate_limit_max,
            rate_limit_window: Duration::from_secs(rate_limit_window_secs),
        })
    }
}

/// Clip name to file mapping, read from YAML:
///
/// ```yaml
/// clips:
///   horn: airhorn.dca
///   bell: ship_bell.dca
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AudioConfig {
    #[serde(default)]
    pub clips: BTreeMap<String, String>,
}

impl AudioConfig {
    /// Load the mapping; a missing file means no clips
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read audio config {}", path.display()))?;
        let config: AudioConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Invalid audio config {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("DISCORD_TOKEN", "abc")])).unwrap();
        assert_eq!(config.discord_token, "abc");
        assert_eq!(config.key_file, PathBuf::from("./sotbot.key"));
        assert_eq!(config.database_path, "./sotbot.db");
        assert_eq!(config.announce_channel_id, None);
        assert_eq!(config.reauth_interval, Duration::from_secs(3600));
        assert_eq!(config.command_prefix, "!");
    }

    #[test]
    fn test_token_required() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("DISCORD_TOKEN", "  ")])).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "abc"),
            ("KEY_FILE", "/var/lib/sotbot/key"),
            ("ANNOUNCE_CHANNEL_ID", "123456789"),
            ("REAUTH_INTERVAL_SECS", "60"),
        ]))
        .unwrap();
        assert_eq!(config.key_file, PathBuf::from("/var/lib/sotbot/key"));
        assert_eq!(config.announce_channel_id, Some(123456789));
        assert_eq!(config.reauth_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        assert!(Config::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "abc"),
            ("ANNOUNCE_CHANNEL_ID", "general")
        ]))
        .is_err());
        assert!(Config::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "abc"),
            ("REAUTH_INTERVAL_SECS", "0")
        ]))
        .is_err());
    }

    #[test]
    fn test_audio_config_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audio.yaml");
        std::fs::write(&path, "clips:\n  horn: airhorn.dca\n  bell: bell.dca\n").unwrap();

        let config = AudioConfig::load(&path).unwrap();
        assert_eq!(config.clips.len(), 2);
        assert_eq!(config.clips["horn"], "airhorn.dca");
    }

    #[test]
    fn test_audio_config_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let config = AudioConfig::load(&dir.path().join("nope.yaml")).unwrap();
        assert!(config.clips.is_empty());
    }

    #[test]
    fn test_audio_config_invalid_yaml_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audio.yaml");
        std::fs::write(&path, "clips: [not, a, map]\n").unwrap();
        assert!(AudioConfig::load(&path).is_err());
    }
}
