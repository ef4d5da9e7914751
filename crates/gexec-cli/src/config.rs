use std::{
    fs,
    path::{Path, PathBuf},
};

use color_eyre::Result;
use dirs::config_dir;
use gexec_storage::Passphrase;
use serde::{Deserialize, Serialize};

const ENV_PASSPHRASE: &str = "GEXEC_ENCRYPT_PASSPHRASE";
const ENV_DATA_DIR: &str = "GEXEC_DATA_DIR";

/// User-level configuration loaded from `~/.config/gexec/config.toml` (platform-specific).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Override for the row store directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub encrypt: EncryptConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct EncryptConfig {
    /// Literal key, `file://<path>` or `base64://<data>`; must resolve to 16, 24 or 32 bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive; `RUST_LOG` wins when set.
    pub level: String,
    pub pretty: bool,
    pub color: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            pretty: false,
            color: true,
        }
    }
}

impl Config {
    /// Apply `GEXEC_*` overrides from the given lookup.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(passphrase) = lookup(ENV_PASSPHRASE).filter(|v| !v.is_empty()) {
            self.encrypt.passphrase = Some(passphrase);
        }
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        self
    }
}

/// Load config from the default path plus environment overrides.
pub fn load() -> Result<Config> {
    let path = default_path()?;
    Ok(load_from_path(path)?.with_env(|key| std::env::var(key).ok()))
}

/// Load config from a given path; if missing or empty, return defaults.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config = toml::from_str(&contents)?;
    Ok(cfg)
}

/// Resolve the default config path (platform aware).
pub fn default_path() -> Result<PathBuf> {
    let base = config_dir().ok_or_else(|| color_eyre::eyre::eyre!("no config dir available"))?;
    Ok(base.join("gexec").join("config.toml"))
}

/// Create a config file at `path` unless one is already there. Only values
/// from the file itself are written, never `GEXEC_*` overrides; a missing
/// passphrase is filled with a generated one.
pub fn init_at(path: &Path) -> Result<PathBuf> {
    let mut config = load_from_path(path)?;
    if config.encrypt.passphrase.is_none() {
        config.encrypt.passphrase = Some(Passphrase::generate());
    }
    write_to_path_if_missing(&config, path)
}

fn write_to_path_if_missing(config: &Config, path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(config)?;
    fs::write(path, body)?;
    Ok(path.to_path_buf())
}
