//! Secret encoding.
//!
//! This module turns secret bytes into an encrypted, storage-safe envelope and back:
//! - Base64 sub-encodings accepted on read (standard, URL-safe, chunked)
//! - The `{...}` envelope framing and its structural classifier
//! - The codec that ties the envelope to an injected confidentiality service
//! - `Secret` and `SecretBytes` value types that never reveal their plaintext

mod codec;
mod confidentiality;
mod encoding;
mod envelope;
mod value;

pub use codec::{DecodeError, SecretCodec};
pub use confidentiality::{
    AesGcmConfidentialityService, ConfidentialityError, ConfidentialityService, MasterKey,
};
pub use encoding::{decode_any, Base64Flavor, CHUNK_WIDTH};
pub use envelope::is_envelope;
pub use value::{Secret, SecretBytes};
