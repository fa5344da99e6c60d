use std::fmt;
use std::sync::Arc;

use super::confidentiality::{ConfidentialityError, ConfidentialityService};
use super::encoding::decode_any;
use super::envelope;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Encrypted secret could not be decrypted")]
    Decrypt(#[source] ConfidentialityError),

    #[error("Decrypted secret is not valid UTF-8")]
    NotUtf8,
}

/// Encodes secret bytes into envelopes and decodes envelopes or legacy forms back.
///
/// Holds nothing but the shared confidentiality service, so clones are cheap
/// and concurrent calls never contend.
#[derive(Clone)]
pub struct SecretCodec {
    service: Arc<dyn ConfidentialityService>,
}

impl SecretCodec {
    pub fn new(service: Arc<dyn ConfidentialityService>) -> Self {
        Self { service }
    }

    /// Encrypts `plaintext` and wraps it in the canonical envelope.
    ///
    /// Every call encrypts afresh; no ciphertext is reused between calls.
    pub fn encode_bytes(&self, plaintext: &[u8]) -> Result<String, ConfidentialityError> {
        let ciphertext = self.service.encrypt(plaintext)?;
        envelope::seal(&ciphertext)
    }

    /// Decodes an envelope or a legacy encoding.
    ///
    /// Legacy text is decoded with the first base64 flavor that accepts it and
    /// otherwise taken as raw UTF-8 bytes. Only envelopes reach the service.
    pub fn decode_envelope(&self, text: &str) -> Result<Vec<u8>, DecodeError> {
        match envelope::open(text) {
            Some(ciphertext) => self.service.decrypt(&ciphertext).map_err(|error| {
                log::warn!("failed to decrypt secret envelope: {error}");
                DecodeError::Decrypt(error)
            }),
            None => Ok(decode_legacy(text)),
        }
    }

    pub fn is_envelope(&self, text: &str) -> bool {
        envelope::is_envelope(text)
    }
}

impl fmt::Debug for SecretCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretCodec").finish_non_exhaustive()
    }
}

fn decode_legacy(text: &str) -> Vec<u8> {
    match decode_any(text) {
        Some((flavor, bytes)) => {
            log::trace!("decoded legacy secret as {flavor:?}");
            bytes
        }
        None => text.as_bytes().to_vec(),
    }
}
