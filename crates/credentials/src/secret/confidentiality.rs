//! Confidentiality services used by the secret codec.
//!
//! The codec only needs `encrypt`/`decrypt`. [`AesGcmConfidentialityService`] is
//! the bundled implementation: AES-256-GCM with a random nonce per call, keyed
//! by a purpose key derived from a [`MasterKey`] with HKDF-SHA256. Where the
//! master key is stored, and how it rotates, is up to the host.

use std::fmt;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::config::SecretsConfig;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfidentialityError {
    #[error("Encryption failed: {0}")]
    Encrypt(String),

    #[error("Decryption failed: {0}")]
    Decrypt(String),

    #[error("Invalid key material: {0}")]
    InvalidKey(String),
}

/// Encrypts and decrypts opaque byte payloads.
///
/// Implementations must be safe to share across threads and should produce
/// different ciphertext for repeated encryptions of the same plaintext.
pub trait ConfidentialityService: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, ConfidentialityError>;

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, ConfidentialityError>;
}

/// Process-wide root key from which purpose keys are derived.
pub struct MasterKey {
    bytes: Zeroizing<[u8; KEY_LEN]>,
}

impl MasterKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            bytes: Zeroizing::new(bytes),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ConfidentialityError> {
        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            ConfidentialityError::InvalidKey(format!(
                "master key must be {KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self::from_bytes(bytes))
    }

    /// Generates a fresh random master key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self::from_bytes(bytes)
    }

    /// Derives the key for one purpose, so unrelated consumers never share a key.
    pub fn derive(&self, purpose: &str) -> Result<Zeroizing<[u8; KEY_LEN]>, ConfidentialityError> {
        let hkdf = Hkdf::<Sha256>::new(None, self.bytes.as_slice());
        let mut derived = Zeroizing::new([0u8; KEY_LEN]);
        hkdf.expand(purpose.as_bytes(), derived.as_mut_slice())
            .map_err(|error| ConfidentialityError::InvalidKey(error.to_string()))?;
        Ok(derived)
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

/// AES-256-GCM service producing `nonce || ciphertext || tag`.
pub struct AesGcmConfidentialityService {
    cipher: Aes256Gcm,
}

impl AesGcmConfidentialityService {
    pub fn new(master: &MasterKey, purpose: &str) -> Result<Self, ConfidentialityError> {
        let key = master.derive(purpose)?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_slice()));
        Ok(Self { cipher })
    }

    /// Builds the service for the configured secret purpose.
    pub fn from_config(master: &MasterKey, config: &SecretsConfig) -> Result<Self, ConfidentialityError> {
        Self::new(master, &config.key_purpose)
    }
}

impl fmt::Debug for AesGcmConfidentialityService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AesGcmConfidentialityService")
            .finish_non_exhaustive()
    }
}

impl ConfidentialityService for AesGcmConfidentialityService {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, ConfidentialityError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|error| ConfidentialityError::Encrypt(error.to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(nonce.as_slice());
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, ConfidentialityError> {
        if ciphertext.len() < NONCE_LEN + TAG_LEN {
            return Err(ConfidentialityError::Decrypt(
                "ciphertext too short".to_string(),
            ));
        }
        let (nonce, sealed) = ciphertext.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| ConfidentialityError::Decrypt("authentication failed".to_string()))
    }
}
