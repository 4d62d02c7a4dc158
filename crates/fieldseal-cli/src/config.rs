use std::{
    fs,
    path::{Path, PathBuf},
};

use color_eyre::Result;
use dirs::config_dir;
use fieldseal_storage::field_cipher::EnvelopeFormat;
use serde::{Deserialize, Serialize};

/// User-level configuration loaded from `~/.config/fieldseal/config.toml` (platform-specific).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Override for the file store root.
    pub data_dir: Option<PathBuf>,
    /// Envelope layout used when sealing new values.
    #[serde(default)]
    pub envelope_format: EnvelopeFormat,
    /// Record store selection.
    pub store: Option<StoreConfig>,
    /// Where the field key comes from.
    pub key: Option<KeyConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    pub cluster_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct KeyConfig {
    #[serde(default)]
    pub source: KeySource,
    /// Base64 of 16 bytes; read when `source = "inline"`.
    pub value: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    #[default]
    Keyring,
    Inline,
}

impl Config {
    pub fn backend(&self) -> StoreBackend {
        self.store.as_ref().map(|s| s.backend).unwrap_or_default()
    }

    pub fn cluster_name(&self) -> String {
        self.store
            .as_ref()
            .and_then(|s| s.cluster_name.clone())
            .unwrap_or_else(|| "fieldseal".to_string())
    }
}

/// Load config from the default path; if missing, return defaults.
pub fn load() -> Result<Config> {
    let path = default_path()?;
    load_from_path(path)
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
    Ok(base.join("fieldseal").join("config.toml"))
}

/// Write the given config to the default path unless a file is already there.
pub fn write_default_if_missing(config: &Config) -> Result<PathBuf> {
    let path = default_path()?;
    write_to_path_if_missing(config, &path)
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
