use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LibrarySearchError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
    #[default]
    Stdio,
    Http,
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    #[serde(default)]
    pub mode: ServerMode,
    #[serde(default)]
    pub http_addr: Option<String>,
    #[serde(default)]
    pub http_port: Option<u16>,
}

impl ServerConfig {
    /// `addr:port` the HTTP transport binds, defaulting to `0.0.0.0:3000`.
    pub fn http_bind(&self) -> String {
        format!(
            "{}:{}",
            self.http_addr.as_deref().unwrap_or("0.0.0.0"),
            self.http_port.unwrap_or(3000)
        )
    }

    pub fn serves_http(&self) -> bool {
        matches!(self.mode, ServerMode::Http | ServerMode::Both)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./library_mcp.sqlite")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "max_limit")]
    pub max_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: max_limit(),
        }
    }
}

fn default_limit() -> usize {
    10
}

fn max_limit() -> usize {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

impl Config {
    /// Load from a `.yaml`/`.yml` or `.json` file; other extensions are tried as YAML.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LibrarySearchError::ConfigError(format!("read {} failed: {e}", path.display()))
        })?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let cfg: Config = if is_json {
            serde_json::from_str(&raw)
                .map_err(|e| LibrarySearchError::ConfigError(format!("invalid json config: {e}")))?
        } else {
            serde_yaml::from_str(&raw)
                .map_err(|e| LibrarySearchError::ConfigError(format!("invalid yaml config: {e}")))?
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.search.max_limit == 0 {
            return Err(LibrarySearchError::ConfigError(
                "search.max_limit must be >= 1".into(),
            ));
        }
        if self.search.default_limit == 0 || self.search.default_limit > self.search.max_limit {
            return Err(LibrarySearchError::ConfigError(format!(
                "search.default_limit must be within 1..={}",
                self.search.max_limit
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn yaml_config_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg.yaml");
        std::fs::write(&path, "server:\n  mode: http\n  http_port: 8080\n").unwrap();

        let cfg = Config::load_from_path(&path).unwrap();
        assert_eq!(cfg.server.mode, ServerMode::Http);
        assert_eq!(cfg.server.http_port, Some(8080));
        assert_eq!(cfg.server.http_bind(), "0.0.0.0:8080");
        assert!(cfg.server.serves_http());
        assert_eq!(cfg.search.default_limit, 10);
        assert_eq!(cfg.search.max_limit, 50);
        assert_eq!(cfg.store.db_path, PathBuf::from("./library_mcp.sqlite"));
    }

    #[test]
    fn json_config_is_detected_by_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, r#"{"store": {"db_path": "/tmp/x.sqlite"}}"#).unwrap();

        let cfg = Config::load_from_path(&path).unwrap();
        assert_eq!(cfg.server.mode, ServerMode::Stdio);
        assert!(!cfg.server.serves_http());
        assert_eq!(cfg.store.db_path, PathBuf::from("/tmp/x.sqlite"));
    }

    #[test]
    fn default_limit_above_max_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg.yaml");
        std::fs::write(&path, "search:\n  default_limit: 60\n").unwrap();

        let err = Config::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("default_limit"));
    }
}
