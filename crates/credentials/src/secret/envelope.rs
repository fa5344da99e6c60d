//! Envelope framing for encrypted secrets.
//!
//! An envelope is `{` + base64(frame) + `}` where the frame is
//!
//! ```text
//! +---------+----------------------+-------------------+
//! | version | ciphertext length    | ciphertext        |
//! | 1 byte  | 4 bytes, big endian  | length bytes      |
//! +---------+----------------------+-------------------+
//! ```
//!
//! Recognition is structural: delimiters, a base64 body in any accepted
//! flavor, a known version byte and a length field that accounts for every
//! remaining byte. Arbitrary text passes all of these only by accident, so
//! the classification is probabilistic rather than absolute.

use super::confidentiality::ConfidentialityError;
use super::encoding::{decode_any, Base64Flavor};

const PREFIX: char = '{';
const SUFFIX: char = '}';
const PAYLOAD_V1: u8 = 0x01;
const HEADER_LEN: usize = 1 + 4;

/// Wraps ciphertext in the canonical envelope form.
pub(crate) fn seal(ciphertext: &[u8]) -> Result<String, ConfidentialityError> {
    let mut frame = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    frame.push(PAYLOAD_V1);
    frame.extend_from_slice(&frame_length(ciphertext.len())?.to_be_bytes());
    frame.extend_from_slice(ciphertext);

    let body = Base64Flavor::Standard.encode(&frame);
    let mut envelope = String::with_capacity(body.len() + 2);
    envelope.push(PREFIX);
    envelope.push_str(&body);
    envelope.push(SUFFIX);
    Ok(envelope)
}

/// The length field is 32 bits wide.
fn frame_length(len: usize) -> Result<u32, ConfidentialityError> {
    u32::try_from(len).map_err(|_| {
        ConfidentialityError::Encrypt(format!(
            "ciphertext of {len} bytes exceeds the {} byte envelope limit",
            u32::MAX
        ))
    })
}

/// Extracts the ciphertext if `text` is structurally an envelope.
pub(crate) fn open(text: &str) -> Option<Vec<u8>> {
    let body = text.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
    let (_, frame) = decode_any(body)?;
    if frame.len() < HEADER_LEN || frame[0] != PAYLOAD_V1 {
        return None;
    }

    let declared = u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]) as usize;
    if declared != frame.len() - HEADER_LEN {
        return None;
    }

    Some(frame[HEADER_LEN..].to_vec())
}

/// Returns true if `text` has the envelope structure. Never decrypts.
pub fn is_envelope(text: &str) -> bool {
    open(text).is_some()
}
