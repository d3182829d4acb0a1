use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::StaleReplyPolicy;
use crate::store::SessionConfig;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8001/chat";

/// Environment variable that overrides the configured endpoint.
pub const ENDPOINT_ENV: &str = "TUTOR_ENDPOINT";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greeting: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale_replies: Option<StaleReplyPolicy>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Endpoint precedence: command-line flag, then `TUTOR_ENDPOINT`, then the
    /// config file, then [`DEFAULT_ENDPOINT`].
    pub fn resolve_endpoint(&self, flag: Option<&str>) -> String {
        self.resolve_endpoint_with(flag, std::env::var(ENDPOINT_ENV).ok())
    }

    fn resolve_endpoint_with(&self, flag: Option<&str>, env: Option<String>) -> String {
        flag.map(str::to_string)
            .or(env.filter(|e| !e.trim().is_empty()))
            .or_else(|| self.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
    }

    pub fn session(&self) -> SessionConfig {
        let defaults = SessionConfig::default();
        SessionConfig {
            greeting: self
                .greeting
                .clone()
                .filter(|g| !g.trim().is_empty())
                .unwrap_or(defaults.greeting),
            stale_replies: self.stale_replies.unwrap_or(defaults.stale_replies),
        }
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("tutor").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DEFAULT_GREETING;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            endpoint: Some("http://tutor.local:9000/chat".to_string()),
            greeting: Some("Hola".to_string()),
            stale_replies: Some(StaleReplyPolicy::Discard),
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_endpoint_precedence() {
        let config = Config {
            endpoint: Some("http://from-file/chat".to_string()),
            ..Config::new()
        };

        assert_eq!(
            config.resolve_endpoint_with(
                Some("http://from-flag/chat"),
                Some("http://from-env/chat".into())
            ),
            "http://from-flag/chat"
        );
        assert_eq!(
            config.resolve_endpoint_with(None, Some("http://from-env/chat".into())),
            "http://from-env/chat"
        );
        assert_eq!(config.resolve_endpoint_with(None, None), "http://from-file/chat");
        assert_eq!(Config::new().resolve_endpoint_with(None, Some(" ".into())), DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_session_defaults() {
        let session = Config::new().session();
        assert_eq!(session.greeting, DEFAULT_GREETING);
        assert_eq!(session.stale_replies, StaleReplyPolicy::Append);

        let blank = Config {
            greeting: Some("  ".to_string()),
            ..Config::new()
        };
        assert_eq!(blank.session().greeting, DEFAULT_GREETING);
    }
}
