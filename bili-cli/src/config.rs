use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bili_wbi::WbiConfig;
use serde::{Deserialize, Serialize};

/// Contents of the optional TOML config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub wbi: WbiConfig,
}

impl AppConfig {
    /// `<config_dir>/bili-wbi/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("bili-wbi").join("config.toml"))
    }

    /// Loads `path`, or the default file if it exists, or the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_config() {
        let config = AppConfig::parse(
            r#"
            [wbi]
            max_retries = 5
            timeout_secs = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.wbi.max_retries, 5);
        assert_eq!(config.wbi.timeout_secs, 10);
        assert_eq!(config.wbi.retry_base_delay_ms, 1000);
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(AppConfig::parse("").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        assert!(AppConfig::load(Some(Path::new("/nonexistent/bili-wbi.toml"))).is_err());
    }
}
