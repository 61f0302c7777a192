//! Base64 helpers shared by the upload client and the upload handler.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::{DecodeError, Engine};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Matches a data-URI header such as `data:application/pdf;base64,`
    static ref DATA_URI_PREFIX: Regex = Regex::new(r"^data:[^,]*,").unwrap();
}

/// Standard alphabet, accepting content with or without trailing `=`.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Remove a leading data-URI header, if any.
pub fn strip_data_uri_prefix(encoded: &str) -> &str {
    match DATA_URI_PREFIX.find(encoded) {
        Some(m) => &encoded[m.end()..],
        None => encoded,
    }
}

/// Pad with `=` up to a multiple of four characters.
pub fn pad_base64(encoded: &str) -> String {
    let mut padded = encoded.to_string();
    let remainder = padded.len() % 4;
    if remainder > 0 {
        padded.push_str(&"=".repeat(4 - remainder));
    }
    padded
}

/// Strip any data-URI header and always pad.
pub fn normalize_base64(encoded: &str) -> String {
    pad_base64(strip_data_uri_prefix(encoded.trim()))
}

/// Encode raw file bytes into the transport form sent to the upload endpoint.
pub fn encode_file_content(bytes: &[u8]) -> String {
    normalize_base64(&STANDARD.encode(bytes))
}

/// Decode transport content back to bytes.
///
/// Tolerates a data-URI header, embedded whitespace and missing padding.
pub fn decode_file_content(encoded: &str) -> Result<Vec<u8>, DecodeError> {
    let body: String = strip_data_uri_prefix(encoded.trim())
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    LENIENT.decode(body)
}
