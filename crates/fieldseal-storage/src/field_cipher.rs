//! Field-level encryption for individual record columns.
//!
//! Envelope layout, before base64 (standard alphabet, padded):
//!
//! ```text
//! legacy: [ iv (16) ][ AES-128-CBC ciphertext of PKCS#7-padded UTF-8 ]
//! tagged: [ version (1) ][ algorithm (1) ][ iv (16) ][ ciphertext ]
//! ```
//!
//! The legacy layout carries no identifier; key and algorithm are agreed out of band.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// AES-128 key size in bytes.
pub const KEY_LEN: usize = 16;
/// AES block size, which is also the IV size.
pub const BLOCK_LEN: usize = 16;

const TAGGED_VERSION: u8 = 0x01;
const ALG_AES128_CBC_PKCS7: u8 = 0x01;
const TAG_LEN: usize = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncryptionError {
    #[error("invalid key length: expected 16 bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("random IV generation failed: {0}")]
    Randomness(String),
}

/// Decryption failures.
///
/// Structural problems with the envelope are reported precisely. Anything that
/// goes wrong after the block cipher runs (bad padding, invalid UTF-8) is
/// reported as [`DecryptionError::Rejected`] whether the cause is a wrong key or
/// corrupted data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecryptionError {
    #[error("invalid key length: expected 16 bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("envelope is not valid base64")]
    Encoding,
    #[error("envelope is shorter than one block ({0} bytes)")]
    Truncated(usize),
    #[error("ciphertext length {0} is not a positive multiple of the block size")]
    Misaligned(usize),
    #[error("unsupported envelope format (version {version}, algorithm {algorithm})")]
    UnsupportedFormat { version: u8, algorithm: u8 },
    #[error("envelope rejected: wrong key or corrupted data")]
    Rejected,
}

/// Envelope layout written by a [`FieldCipher`].
///
/// A `Tagged` cipher still reads legacy envelopes: the two-byte header makes a
/// tagged envelope `2 mod 16` bytes long, a legacy one `0 mod 16`. A `Legacy`
/// cipher reads only legacy envelopes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeFormat {
    /// `base64(iv || ciphertext)`.
    #[default]
    Legacy,
    /// `base64(version || algorithm || iv || ciphertext)`.
    Tagged,
}

/// 16-byte field key, zeroed on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct FieldKey([u8; KEY_LEN]);

impl FieldKey {
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, EncryptionError> {
        let arr: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| EncryptionError::InvalidKeyLength(bytes.len()))?;
        Ok(Self(arr))
    }

    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FieldKey(<redacted>)")
    }
}

/// Encrypts and decrypts string fields with one key and envelope format.
#[derive(Debug, Clone)]
pub struct FieldCipher {
    key: FieldKey,
    format: EnvelopeFormat,
}

impl FieldCipher {
    pub fn new(key: FieldKey) -> Self {
        Self::with_format(key, EnvelopeFormat::Legacy)
    }

    pub fn with_format(key: FieldKey, format: EnvelopeFormat) -> Self {
        Self { key, format }
    }

    pub fn format(&self) -> EnvelopeFormat {
        self.format
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        let mut out = Vec::new();
        if self.format == EnvelopeFormat::Tagged {
            out.extend_from_slice(&[TAGGED_VERSION, ALG_AES128_CBC_PKCS7]);
        }
        seal_into(self.key.as_bytes(), plaintext.as_bytes(), &mut out)?;
        Ok(STANDARD.encode(out))
    }

    pub fn decrypt(&self, envelope: &str) -> Result<String, DecryptionError> {
        let bytes = STANDARD
            .decode(envelope)
            .map_err(|_| DecryptionError::Encoding)?;

        let body = match self.format {
            EnvelopeFormat::Tagged if bytes.len() % BLOCK_LEN == TAG_LEN => strip_tag(&bytes)?,
            EnvelopeFormat::Legacy | EnvelopeFormat::Tagged => &bytes[..],
        };
        open(self.key.as_bytes(), body)
    }
}

/// Encrypt one field into a legacy envelope.
pub fn encrypt(key: &[u8], plaintext: &str) -> Result<String, EncryptionError> {
    let mut out = Vec::new();
    seal_into(key, plaintext.as_bytes(), &mut out)?;
    Ok(STANDARD.encode(out))
}

/// Decrypt a legacy envelope produced by [`encrypt`].
pub fn decrypt(key: &[u8], envelope: &str) -> Result<String, DecryptionError> {
    let bytes = STANDARD
        .decode(envelope)
        .map_err(|_| DecryptionError::Encoding)?;
    open(key, &bytes)
}

fn seal_into(key: &[u8], plaintext: &[u8], out: &mut Vec<u8>) -> Result<(), EncryptionError> {
    if key.len() != KEY_LEN {
        return Err(EncryptionError::InvalidKeyLength(key.len()));
    }

    let mut iv = [0u8; BLOCK_LEN];
    OsRng
        .try_fill_bytes(&mut iv)
        .map_err(|e| EncryptionError::Randomness(e.to_string()))?;

    let cipher = Aes128CbcEnc::new_from_slices(key, &iv)
        .map_err(|_| EncryptionError::InvalidKeyLength(key.len()))?;
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    out.reserve(BLOCK_LEN + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    Ok(())
}

fn strip_tag(bytes: &[u8]) -> Result<&[u8], DecryptionError> {
    if bytes.len() < TAG_LEN {
        return Err(DecryptionError::Truncated(bytes.len()));
    }
    let (version, algorithm) = (bytes[0], bytes[1]);
    if version != TAGGED_VERSION || algorithm != ALG_AES128_CBC_PKCS7 {
        return Err(DecryptionError::UnsupportedFormat { version, algorithm });
    }
    Ok(&bytes[TAG_LEN..])
}

fn open(key: &[u8], bytes: &[u8]) -> Result<String, DecryptionError> {
    if key.len() != KEY_LEN {
        return Err(DecryptionError::InvalidKeyLength(key.len()));
    }
    if bytes.len() < BLOCK_LEN {
        return Err(DecryptionError::Truncated(bytes.len()));
    }

    let (iv, ciphertext) = bytes.split_at(BLOCK_LEN);
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(DecryptionError::Misaligned(ciphertext.len()));
    }

    let cipher = Aes128CbcDec::new_from_slices(key, iv)
        .map_err(|_| DecryptionError::InvalidKeyLength(key.len()))?;
    let plaintext = cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| DecryptionError::Rejected)?;

    String::from_utf8(plaintext).map_err(|_| DecryptionError::Rejected)
}
