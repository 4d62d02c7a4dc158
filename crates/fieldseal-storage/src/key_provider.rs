use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use thiserror::Error;

use crate::field_cipher::{FieldKey, KEY_LEN};

/// Key material used for field encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    /// Identifier for logging (never log key bytes).
    pub id: String,
    /// 128-bit field key.
    pub key: FieldKey,
}

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("keyring error: {0}")]
    Keyring(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("generation error: {0}")]
    Generation(String),
}

/// Provides the field key (OS keychain or configuration in production; memory in tests).
#[async_trait]
pub trait KeyProvider: Send + Sync {
    async fn get_or_create(&self) -> Result<KeyMaterial, KeyError>;
}

/// OS keyring-backed provider. Generates and stores a key on first use.
pub struct KeyringProvider {
    service: String,
    account: String,
}

impl KeyringProvider {
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }
}

#[async_trait]
impl KeyProvider for KeyringProvider {
    async fn get_or_create(&self) -> Result<KeyMaterial, KeyError> {
        // Keyring operations are synchronous; wrap in async for trait compatibility.
        let entry = keyring::Entry::new(&self.service, &self.account)
            .map_err(|err| KeyError::Keyring(err.to_string()))?;

        if let Some(existing) = stored_key(entry.get_password())? {
            return Ok(existing);
        }

        let material = generate_key("keyring");
        entry
            .set_password(&encode_key(&material.key))
            .map_err(|e| KeyError::Keyring(e.to_string()))?;
        Ok(material)
    }
}

/// Provider for a key supplied up front, e.g. from configuration or the environment.
#[derive(Debug, Clone)]
pub struct StaticKeyProvider {
    material: KeyMaterial,
}

impl StaticKeyProvider {
    pub fn new(id: impl Into<String>, key: FieldKey) -> Self {
        Self {
            material: KeyMaterial { id: id.into(), key },
        }
    }

    /// Build from a base64-encoded 16-byte key.
    pub fn from_base64(id: impl Into<String>, encoded: &str) -> Result<Self, KeyError> {
        let id = id.into();
        let material = decode_key(&id, encoded.trim())?;
        Ok(Self { material })
    }
}

#[async_trait]
impl KeyProvider for StaticKeyProvider {
    async fn get_or_create(&self) -> Result<KeyMaterial, KeyError> {
        Ok(self.material.clone())
    }
}

/// In-memory key provider for tests and ephemeral sessions.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKeyProvider {
    inner: Arc<Mutex<Option<KeyMaterial>>>,
}

#[async_trait]
impl KeyProvider for InMemoryKeyProvider {
    async fn get_or_create(&self) -> Result<KeyMaterial, KeyError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|err| KeyError::Generation(format!("lock poisoned: {err}")))?;

        if let Some(existing) = guard.clone() {
            return Ok(existing);
        }

        let material = generate_key("memory");
        *guard = Some(material.clone());
        Ok(material)
    }
}

/// Interpret a keyring lookup. `None` only for a missing entry; every other
/// keyring failure is an error and the stored key is left alone.
fn stored_key(lookup: Result<String, keyring::Error>) -> Result<Option<KeyMaterial>, KeyError> {
    match lookup {
        Ok(secret) => decode_key("keyring", &secret).map(Some),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(err) => Err(KeyError::Keyring(err.to_string())),
    }
}

fn generate_key(id: &str) -> KeyMaterial {
    KeyMaterial {
        id: id.to_string(),
        key: FieldKey::generate(),
    }
}

/// Base64 form of a key, as stored in the keyring or written into configuration.
pub fn encode_key(key: &FieldKey) -> String {
    general_purpose::STANDARD.encode(key.as_bytes())
}

fn decode_key(id: &str, secret: &str) -> Result<KeyMaterial, KeyError> {
    let bytes = general_purpose::STANDARD
        .decode(secret)
        .map_err(|e| KeyError::Decode(e.to_string()))?;

    if bytes.len() != KEY_LEN {
        return Err(KeyError::Decode(format!(
            "expected {KEY_LEN} bytes, got {}",
            bytes.len()
        )));
    }

    let key = FieldKey::from_slice(&bytes).map_err(|e| KeyError::Decode(e.to_string()))?;
    Ok(KeyMaterial {
        id: id.to_string(),
        key,
    })
}
