//! Secret value types.
//!
//! Both types keep their plaintext in zeroized storage, print as `[REDACTED]`
//! and compare in constant time. The encrypted form is produced on demand and
//! never cached, so two calls yield two different envelopes.

use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::codec::{DecodeError, SecretCodec};
use super::confidentiality::ConfidentialityError;
use super::envelope;

const REDACTED: &str = "[REDACTED]";

/// A binary secret such as a key file or keystore.
#[derive(Clone)]
pub struct SecretBytes {
    data: Zeroizing<Vec<u8>>,
}

impl SecretBytes {
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Zeroizing::new(data.into()),
        }
    }

    /// Reads a stored value: envelopes are decrypted, anything else is a legacy encoding.
    pub fn from_string(text: &str, codec: &SecretCodec) -> Result<Self, DecodeError> {
        codec.decode_envelope(text).map(Self::from_bytes)
    }

    pub fn plain_data(&self) -> &[u8] {
        &self.data
    }

    pub fn encrypted_data(&self, codec: &SecretCodec) -> Result<String, ConfidentialityError> {
        codec.encode_bytes(&self.data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True if `text` looks like an encrypted secret rather than a legacy value.
    pub fn is_secret_bytes(text: &str) -> bool {
        envelope::is_envelope(text)
    }
}

impl PartialEq for SecretBytes {
    fn eq(&self, other: &Self) -> bool {
        self.data.as_slice().ct_eq(other.data.as_slice()).into()
    }
}

impl Eq for SecretBytes {}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Display for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

/// A textual secret such as a password or token.
#[derive(Clone)]
pub struct Secret {
    value: Zeroizing<String>,
}

impl Secret {
    pub fn from_plain(value: impl Into<String>) -> Self {
        Self {
            value: Zeroizing::new(value.into()),
        }
    }

    /// Reads a stored value. Text that is not an envelope is the plaintext itself.
    pub fn from_string(text: &str, codec: &SecretCodec) -> Result<Self, DecodeError> {
        if !envelope::is_envelope(text) {
            return Ok(Self::from_plain(text));
        }
        let bytes = Zeroizing::new(codec.decode_envelope(text)?);
        let value = std::str::from_utf8(&bytes).map_err(|_| DecodeError::NotUtf8)?;
        Ok(Self::from_plain(value))
    }

    pub fn plain_text(&self) -> &str {
        &self.value
    }

    pub fn encrypted_value(&self, codec: &SecretCodec) -> Result<String, ConfidentialityError> {
        codec.encode_bytes(self.value.as_bytes())
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn is_secret(text: &str) -> bool {
        envelope::is_envelope(text)
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.value.as_bytes().ct_eq(other.value.as_bytes()).into()
    }
}

impl Eq for Secret {}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}
