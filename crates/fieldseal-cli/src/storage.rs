use std::path::PathBuf;

use crate::config::{Config, KeySource, StoreBackend};
use color_eyre::Result;
use dirs::data_dir;
use fieldseal_core::store::{InMemoryStore, RecordStore};
use fieldseal_storage::{
    field_cipher::FieldCipher,
    file_store::FileStore,
    key_provider::{KeyProvider, KeyringProvider, StaticKeyProvider},
};
use tracing::debug;

/// Environment variable holding a base64 field key; wins over the config file.
pub const KEY_ENV: &str = "FIELDSEAL_KEY";

/// Resolve the default data directory for Fieldseal.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("fieldseal"))
}

/// Connect to the record store selected by config.
pub fn connect(config: &Config) -> Result<Box<dyn RecordStore>> {
    match config.backend() {
        StoreBackend::Memory => {
            debug!("using in-memory record store");
            Ok(Box::new(InMemoryStore::new()))
        }
        StoreBackend::File => {
            let root = match &config.data_dir {
                Some(root) => root.clone(),
                None => default_data_dir()?,
            };
            debug!(?root, cluster = %config.cluster_name(), "opening file record store");
            let store = FileStore::connect(root, config.cluster_name())
                .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
            Ok(Box::new(store))
        }
    }
}

/// Pick the key provider: environment override, then config.
pub fn key_provider(config: &Config, env_key: Option<String>) -> Result<Box<dyn KeyProvider>> {
    if let Some(encoded) = env_key {
        return Ok(Box::new(
            StaticKeyProvider::from_base64("env", &encoded)
                .map_err(|e| color_eyre::eyre::eyre!("{KEY_ENV}: {e}"))?,
        ));
    }

    let key_cfg = config.key.clone().unwrap_or_default();
    match key_cfg.source {
        KeySource::Inline => {
            let encoded = key_cfg.value.ok_or_else(|| {
                color_eyre::eyre::eyre!("key.source is \"inline\" but key.value is not set")
            })?;
            Ok(Box::new(
                StaticKeyProvider::from_base64("config", &encoded)
                    .map_err(|e| color_eyre::eyre::eyre!("key.value: {e}"))?,
            ))
        }
        KeySource::Keyring => Ok(Box::new(KeyringProvider::new("fieldseal", "field-key"))),
    }
}

/// Build the field cipher from the configured key and envelope format.
pub async fn cipher_from_config(config: &Config) -> Result<FieldCipher> {
    let provider = key_provider(config, std::env::var(KEY_ENV).ok())?;
    cipher_from_provider(provider.as_ref(), config).await
}

pub async fn cipher_from_provider(
    provider: &dyn KeyProvider,
    config: &Config,
) -> Result<FieldCipher> {
    let material = provider
        .get_or_create()
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    debug!(key_id = %material.id, format = ?config.envelope_format, "field key loaded");
    Ok(FieldCipher::with_format(material.key, config.envelope_format))
}

/// Helper for tests: the sample key used across the CLI tests.
#[cfg(test)]
pub fn test_cipher() -> FieldCipher {
    use fieldseal_storage::field_cipher::FieldKey;
    FieldCipher::new(FieldKey::new(*b"1324151512412414"))
}
