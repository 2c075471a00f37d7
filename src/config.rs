// Configuration: API credentials and the session file location.
//
// Values come from an optional JSON settings file in the user's config
// directory, overridden by the process environment (a `.env` file in the
// working directory is loaded into the environment first).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const API_ID_VAR: &str = "API_ID";
pub const API_HASH_VAR: &str = "API_HASH";
pub const SESSION_VAR: &str = "TGCLOUD_SESSION";

/// On-disk settings. Every field is optional so the environment can fill
/// in whatever is missing.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct Settings {
    pub api_id: Option<i32>,
    pub api_hash: Option<String>,
    pub session_path: Option<PathBuf>,
}

impl Settings {
    /// `<config dir>/tgcloud/settings.json`, when a config dir is known.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tgcloud").join("settings.json"))
    }

    /// Read settings from `path`. A missing file yields empty settings.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("Parsing settings file {}", path.display()))
    }
}

/// Resolved configuration used to build the Telegram client.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_id: i32,
    pub api_hash: String,
    pub session_path: PathBuf,
}

impl Config {
    /// Load `.env`, the settings file and the environment, in that order of
    /// increasing precedence.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let settings = match Settings::default_path() {
            Some(path) => Settings::load(&path)?,
            None => Settings::default(),
        };
        Self::from_sources(settings, |key| std::env::var(key).ok())
    }

    /// Merge `settings` with values returned by `env`.
    pub fn from_sources<F>(settings: Settings, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_id = match env(API_ID_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<i32>()
                .with_context(|| format!("{API_ID_VAR} must be an integer, got {raw:?}"))?,
            None => settings
                .api_id
                .with_context(|| format!("{API_ID_VAR} is not set"))?,
        };
        let api_hash = env(API_HASH_VAR)
            .or(settings.api_hash)
            .filter(|hash| !hash.trim().is_empty())
            .with_context(|| format!("{API_HASH_VAR} is not set"))?;
        let session_path = env(SESSION_VAR)
            .map(PathBuf::from)
            .or(settings.session_path)
            .unwrap_or_else(default_session_path);

        Ok(Config {
            api_id,
            api_hash,
            session_path,
        })
    }
}

/// Session file in the user's home directory.
fn default_session_path() -> PathBuf {
    let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.join(".tgcloud.session")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn environment_only() {
        let config = Config::from_sources(
            Settings::default(),
            env_of(&[("API_ID", "12345"), ("API_HASH", "abcdef"), ("TGCLOUD_SESSION", "/tmp/s")]),
        )
        .unwrap();
        assert_eq!(config.api_id, 12345);
        assert_eq!(config.api_hash, "abcdef");
        assert_eq!(config.session_path, PathBuf::from("/tmp/s"));
    }

    #[test]
    fn environment_overrides_settings() {
        let settings = Settings {
            api_id: Some(1),
            api_hash: Some("from-file".into()),
            session_path: Some(PathBuf::from("file.session")),
        };
        let config = Config::from_sources(settings, env_of(&[("API_HASH", "from-env")])).unwrap();
        assert_eq!(config.api_id, 1);
        assert_eq!(config.api_hash, "from-env");
        assert_eq!(config.session_path, PathBuf::from("file.session"));
    }

    #[test]
    fn default_session_lives_in_home() {
        let config =
            Config::from_sources(Settings::default(), env_of(&[("API_ID", "7"), ("API_HASH", "h")])).unwrap();
        assert!(config.session_path.ends_with(".tgcloud.session"));
    }

    #[test]
    fn missing_credentials_are_errors() {
        let err = Config::from_sources(Settings::default(), env_of(&[("API_HASH", "h")])).unwrap_err();
        assert!(err.to_string().contains("API_ID"));

        let err = Config::from_sources(Settings::default(), env_of(&[("API_ID", "7"), ("API_HASH", " ")]))
            .unwrap_err();
        assert!(err.to_string().contains("API_HASH"));
    }

    #[test]
    fn non_numeric_api_id_is_an_error() {
        let err = Config::from_sources(Settings::default(), env_of(&[("API_ID", "abc"), ("API_HASH", "h")]))
            .unwrap_err();
        assert!(err.to_string().contains("integer"));
    }

    #[test]
    fn settings_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        assert_eq!(Settings::load(&path).unwrap(), Settings::default());

        std::fs::write(&path, r#"{"api_id": 99, "api_hash": "xyz"}"#).unwrap();
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.api_id, Some(99));
        assert_eq!(settings.api_hash.as_deref(), Some("xyz"));
        assert_eq!(settings.session_path, None);

        std::fs::write(&path, "not json").unwrap();
        assert!(Settings::load(&path).is_err());
    }
}
