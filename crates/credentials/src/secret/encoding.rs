//! Base64 sub-encodings accepted when reading secrets.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine;

/// Line width used by chunked base64.
pub const CHUNK_WIDTH: usize = 76;

const CHUNK_SEPARATOR: &str = "\r\n";

const LENIENT_PADDING: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);

const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT_PADDING);

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT_PADDING);

/// A textual base64 form a secret may have been written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Base64Flavor {
    /// Standard alphabet, padded, single line. The canonical form.
    Standard,
    /// URL-safe alphabet, unpadded, single line.
    UrlSafe,
    /// Standard alphabet wrapped at [`CHUNK_WIDTH`] with CRLF line endings.
    Chunked,
    /// URL-safe alphabet wrapped at [`CHUNK_WIDTH`] with CRLF line endings.
    ChunkedUrlSafe,
}

impl Base64Flavor {
    /// Decode strategies, tried in order until one succeeds.
    ///
    /// New formats are appended; existing entries keep their position.
    pub const DECODE_ORDER: [Base64Flavor; 4] = [
        Self::Standard,
        Self::UrlSafe,
        Self::Chunked,
        Self::ChunkedUrlSafe,
    ];

    pub fn is_chunked(self) -> bool {
        matches!(self, Self::Chunked | Self::ChunkedUrlSafe)
    }

    pub fn encode(self, bytes: &[u8]) -> String {
        match self {
            Self::Standard => STANDARD.encode(bytes),
            Self::UrlSafe => URL_SAFE_NO_PAD.encode(bytes),
            Self::Chunked => chunk_lines(&STANDARD.encode(bytes)),
            Self::ChunkedUrlSafe => chunk_lines(&URL_SAFE_NO_PAD.encode(bytes)),
        }
    }

    /// Decodes `text` if it is valid in this flavor.
    ///
    /// Single-line flavors reject any whitespace; chunked flavors only apply
    /// to text that actually contains line breaks.
    pub fn decode(self, text: &str) -> Option<Vec<u8>> {
        if self.is_chunked() {
            if !text.contains(['\r', '\n']) {
                return None;
            }
            let joined: String = text.chars().filter(|ch| !matches!(ch, '\r' | '\n')).collect();
            self.engine().decode(joined).ok()
        } else {
            if text.contains(|ch: char| ch.is_ascii_whitespace()) {
                return None;
            }
            self.engine().decode(text).ok()
        }
    }

    fn engine(self) -> &'static GeneralPurpose {
        match self {
            Self::Standard | Self::Chunked => &STANDARD_LENIENT,
            Self::UrlSafe | Self::ChunkedUrlSafe => &URL_SAFE_LENIENT,
        }
    }
}

/// Decodes `text` with the first flavor in [`Base64Flavor::DECODE_ORDER`] that accepts it.
pub fn decode_any(text: &str) -> Option<(Base64Flavor, Vec<u8>)> {
    Base64Flavor::DECODE_ORDER
        .into_iter()
        .find_map(|flavor| flavor.decode(text).map(|bytes| (flavor, bytes)))
}

fn chunk_lines(encoded: &str) -> String {
    let mut out = String::with_capacity(encoded.len() + encoded.len() / CHUNK_WIDTH * 2 + 2);
    // Base64 output is ASCII, so byte chunks are valid str boundaries.
    for line in encoded.as_bytes().chunks(CHUNK_WIDTH) {
        out.push_str(&String::from_utf8_lossy(line));
        out.push_str(CHUNK_SEPARATOR);
    }
    out
}
