use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use murmur_core::CoreConfig;
use serde::{Deserialize, Serialize};

/// CLI configuration that can be loaded from a JSON file.
///
/// Every field is optional in the file; missing backend values fall back to
/// `MURMUR_*` environment variables when the core config is assembled.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl CliConfig {
    /// Load config from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: CliConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Explicit path if given (must exist), else the default location if
    /// present, else an empty config.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("murmur").join("config.json"))
    }

    fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("murmur")
    }

    /// Assemble the core config, filling gaps from the environment.
    pub fn into_core_config(self) -> Result<CoreConfig> {
        let backend_url = self
            .backend_url
            .or_else(|| std::env::var("MURMUR_BACKEND_URL").ok())
            .context("backend URL not configured (set backendUrl or MURMUR_BACKEND_URL)")?;
        let backend_key = self
            .backend_key
            .or_else(|| std::env::var("MURMUR_BACKEND_KEY").ok())
            .context("backend key not configured (set backendKey or MURMUR_BACKEND_KEY)")?;
        let user_id = self
            .user_id
            .or_else(|| std::env::var("MURMUR_USER_ID").ok())
            .context("user id not configured (set userId or MURMUR_USER_ID)")?;
        let data_dir = self.data_dir.unwrap_or_else(Self::default_data_dir);

        let mut config = CoreConfig::new(data_dir, backend_url, backend_key, user_id);
        if let Some(token) = self
            .access_token
            .or_else(|| std::env::var("MURMUR_ACCESS_TOKEN").ok())
        {
            config = config.with_access_token(token);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_with_camel_case_keys() {
        let json = r#"{
            "backendUrl": "https://backend.example.com",
            "backendKey": "anon-key",
            "userId": "u1",
            "dataDir": "/tmp/murmur-test"
        }"#;
        let config: CliConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.backend_url.as_deref(), Some("https://backend.example.com"));
        assert_eq!(config.user_id.as_deref(), Some("u1"));
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/murmur-test")));
        assert!(config.access_token.is_none());
    }

    #[test]
    fn test_full_config_builds_core_config() {
        let config = CliConfig {
            backend_url: Some("https://backend.example.com".to_string()),
            backend_key: Some("anon-key".to_string()),
            access_token: Some("jwt".to_string()),
            user_id: Some("u1".to_string()),
            data_dir: Some(PathBuf::from("/tmp/murmur-test")),
        };
        let core = config.into_core_config().unwrap();
        assert_eq!(core.backend_url, "https://backend.example.com");
        assert_eq!(core.user_id, "u1");
        assert!(core.is_authenticated());
    }

    #[test]
    fn test_missing_file_resolves_to_empty_config() {
        // No explicit path and (almost certainly) no default file in test
        // environments with a scratch HOME; absent values stay None.
        let config = CliConfig::resolve(None).unwrap_or_default();
        let _ = config; // resolve must not error when nothing exists
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(CliConfig::load(&path).is_err());
    }
}
