// src/config/dashboard.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::topics::{FileSource, HttpSource, TopicSource};

pub const DEFAULT_DASHBOARD_CONFIG_PATH: &str = "config/dashboard.toml";
pub const DEFAULT_DATA_PATH: &str = "public/data/latest.json";

pub const ENV_DASHBOARD_CONFIG_PATH: &str = "DASHBOARD_CONFIG_PATH";
pub const ENV_SOURCE_URL: &str = "TOPICS_SOURCE_URL";
pub const ENV_SOURCE_PATH: &str = "TOPICS_SOURCE_PATH";
pub const ENV_STALE_CHECK_SECS: &str = "STALE_CHECK_SECS";
pub const ENV_METRICS: &str = "DASHBOARD_METRICS";
pub const ENV_STATIC_DIR: &str = "DASHBOARD_STATIC_DIR";

fn default_connect_timeout_secs() -> u64 {
    4
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_stale_check_secs() -> u64 {
    60
}
fn default_static_dir() -> String {
    "public".to_string()
}
fn default_metrics() -> bool {
    true
}

/// Where `latest.json` comes from. `url` wins over `path` when both are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default = "default_stale_check_secs")]
    pub stale_check_secs: u64,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    #[serde(default = "default_metrics")]
    pub metrics: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig {
                url: None,
                path: None,
                connect_timeout_secs: default_connect_timeout_secs(),
                request_timeout_secs: default_request_timeout_secs(),
            },
            stale_check_secs: default_stale_check_secs(),
            static_dir: default_static_dir(),
            metrics: default_metrics(),
        }
    }
}

impl DashboardConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: DashboardConfig = toml::from_str(s).context("parsing dashboard config")?;
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading dashboard config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $DASHBOARD_CONFIG_PATH (must exist)
    /// 2) config/dashboard.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_DASHBOARD_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!(
                    "{ENV_DASHBOARD_CONFIG_PATH} points to non-existent path {}",
                    pb.display()
                ));
            }
            Self::load_from_file(&pb)?
        } else {
            let pb = PathBuf::from(DEFAULT_DASHBOARD_CONFIG_PATH);
            if pb.exists() {
                Self::load_from_file(&pb)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env();
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        if let Some(url) = non_empty_env(ENV_SOURCE_URL) {
            self.source.url = Some(url);
        }
        if let Some(path) = non_empty_env(ENV_SOURCE_PATH) {
            self.source.path = Some(path);
            // an explicit path beats a URL from the file
            if non_empty_env(ENV_SOURCE_URL).is_none() {
                self.source.url = None;
            }
        }
        if let Some(secs) = non_empty_env(ENV_STALE_CHECK_SECS).and_then(|v| v.parse().ok()) {
            self.stale_check_secs = secs;
        }
        if let Some(v) = non_empty_env(ENV_METRICS) {
            self.metrics = matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "on");
        }
        if let Some(dir) = non_empty_env(ENV_STATIC_DIR) {
            self.static_dir = dir;
        }
        self.sanitize();
    }

    fn sanitize(&mut self) {
        if self.stale_check_secs == 0 {
            self.stale_check_secs = default_stale_check_secs();
        }
        if self.source.request_timeout_secs == 0 {
            self.source.request_timeout_secs = default_request_timeout_secs();
        }
        if self.source.connect_timeout_secs == 0 {
            self.source.connect_timeout_secs = default_connect_timeout_secs();
        }
    }

    pub fn stale_check_interval(&self) -> Duration {
        Duration::from_secs(self.stale_check_secs)
    }

    /// Build the configured data source.
    pub fn build_source(&self) -> Result<Arc<dyn TopicSource>> {
        let source: Arc<dyn TopicSource> = match &self.source.url {
            Some(url) => Arc::new(HttpSource::new(
                url.clone(),
                Duration::from_secs(self.source.connect_timeout_secs),
                Duration::from_secs(self.source.request_timeout_secs),
            )?),
            None => Arc::new(FileSource::new(
                self.source
                    .path
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DATA_PATH.to_string()),
            )),
        };
        Ok(source)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn clear_env() {
        for k in [
            ENV_DASHBOARD_CONFIG_PATH,
            ENV_SOURCE_URL,
            ENV_SOURCE_PATH,
            ENV_STALE_CHECK_SECS,
            ENV_METRICS,
            ENV_STATIC_DIR,
        ] {
            env::remove_var(k);
        }
    }

    #[test]
    fn parses_full_toml() {
        let toml = r#"
stale_check_secs = 30
static_dir = "dist"
metrics = false

[source]
url = "https://example.com/data/latest.json"
connect_timeout_secs = 2
request_timeout_secs = 5
"#;
        let cfg = DashboardConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.stale_check_secs, 30);
        assert_eq!(cfg.static_dir, "dist");
        assert!(!cfg.metrics);
        assert_eq!(
            cfg.source.url.as_deref(),
            Some("https://example.com/data/latest.json")
        );
        assert_eq!(cfg.source.request_timeout_secs, 5);
        assert_eq!(cfg.build_source().unwrap().name(), "http");
    }

    #[test]
    fn empty_toml_gives_defaults_and_zero_is_sanitized() {
        let cfg = DashboardConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, DashboardConfig::default());
        assert_eq!(cfg.build_source().unwrap().name(), "file");

        let cfg = DashboardConfig::from_toml_str("stale_check_secs = 0").unwrap();
        assert_eq!(cfg.stale_check_secs, 60);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(DashboardConfig::from_toml_str("stale_check_secs = \"soon\"").is_err());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        // Run in a temp CWD so the repo's own config/ doesn't interfere
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        clear_env();

        let cfg = DashboardConfig::load_default().unwrap();
        assert_eq!(cfg, DashboardConfig::default());

        let p = tmp.path().join("dash.toml");
        fs::write(&p, "stale_check_secs = 15\n[source]\npath = \"a.json\"\n").unwrap();
        env::set_var(ENV_DASHBOARD_CONFIG_PATH, p.display().to_string());
        let cfg = DashboardConfig::load_default().unwrap();
        assert_eq!(cfg.stale_check_secs, 15);
        assert_eq!(cfg.source.path.as_deref(), Some("a.json"));

        env::set_var(ENV_SOURCE_URL, "http://localhost:9/latest.json");
        env::set_var(ENV_STALE_CHECK_SECS, "5");
        env::set_var(ENV_METRICS, "off");
        let cfg = DashboardConfig::load_default().unwrap();
        assert_eq!(
            cfg.source.url.as_deref(),
            Some("http://localhost:9/latest.json")
        );
        assert_eq!(cfg.stale_check_secs, 5);
        assert!(!cfg.metrics);

        // An explicit path drops a URL that only came from the file.
        env::remove_var(ENV_SOURCE_URL);
        let remote = tmp.path().join("remote.toml");
        fs::write(&remote, "[source]\nurl = \"http://file.example/latest.json\"\n").unwrap();
        env::set_var(ENV_DASHBOARD_CONFIG_PATH, remote.display().to_string());
        env::set_var(ENV_SOURCE_PATH, "local/latest.json");
        let cfg = DashboardConfig::load_default().unwrap();
        assert_eq!(cfg.source.url, None);
        assert_eq!(cfg.source.path.as_deref(), Some("local/latest.json"));
        assert_eq!(cfg.build_source().unwrap().name(), "file");

        // ...but a URL from the environment still wins.
        env::set_var(ENV_SOURCE_URL, "http://localhost:9/latest.json");
        let cfg = DashboardConfig::load_default().unwrap();
        assert_eq!(
            cfg.source.url.as_deref(),
            Some("http://localhost:9/latest.json")
        );
        assert_eq!(cfg.source.path.as_deref(), Some("local/latest.json"));
        assert_eq!(cfg.build_source().unwrap().name(), "http");

        env::set_var(ENV_DASHBOARD_CONFIG_PATH, tmp.path().join("missing.toml"));
        assert!(DashboardConfig::load_default().is_err());

        clear_env();
        env::set_current_dir(&old).unwrap();
    }
}
