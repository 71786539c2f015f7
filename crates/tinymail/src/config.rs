use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;
use tinymail_core::ClientConfig;

pub(crate) const DEFAULT_SERVER: &str = "http://localhost:9009";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub(crate) server: String,
    pub(crate) email: Option<String>,
    pub(crate) timeout_secs: u64,
    pub(crate) client: ClientConfig,
    #[serde(skip)]
    pub(crate) password: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            email: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            client: ClientConfig::default(),
            password: None,
        }
    }
}

impl AppConfig {
    pub(crate) fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid tinymail.toml")
    }

    /// `TINYMAIL_SERVER`, `TINYMAIL_EMAIL` and `TINYMAIL_PASSWORD` win over the file.
    pub(crate) fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(server) = var("TINYMAIL_SERVER").filter(|v| !v.trim().is_empty()) {
            self.server = server;
        }
        if let Some(email) = var("TINYMAIL_EMAIL").filter(|v| !v.trim().is_empty()) {
            self.email = Some(email);
        }
        if let Some(password) = var("TINYMAIL_PASSWORD") {
            self.password = Some(password);
        }
    }
}

fn xdg_config_dir() -> PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn config_path_candidates() -> Vec<PathBuf> {
    vec![
        PathBuf::from("tinymail.toml"),
        xdg_config_dir().join("tinymail").join("tinymail.toml"),
    ]
}

pub(crate) fn load_config() -> Result<AppConfig> {
    let mut config = AppConfig::default();
    for path in config_path_candidates() {
        if !path.exists() {
            continue;
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        config = AppConfig::parse(&content)?;
        log::debug!("loaded config from {}", path.display());
        break;
    }
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}
