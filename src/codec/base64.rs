//! Base64 helpers
//!
//! Share links use every base64 flavor in circulation: standard or URL-safe
//! alphabet, with or without padding, sometimes with stray line breaks.
//! Decoding accepts all of them; encoding picks the form each protocol expects.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use tracing::trace;

use crate::error::{LinkError, Result};

// ============================================================================
// Decoding
// ============================================================================

/// Decodes base64 content, trying multiple variants
///
/// Attempts, in order: standard, URL-safe, URL-safe without padding, then
/// standard and URL-safe again with padding added. Whitespace is removed
/// first.
pub fn decode_base64_loose(content: &str) -> Result<Vec<u8>> {
    let cleaned: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    trace!(
        "Attempting Base64 decode, cleaned length: {} bytes",
        cleaned.len()
    );

    if let Ok(decoded) = STANDARD.decode(&cleaned) {
        return Ok(decoded);
    }

    if let Ok(decoded) = URL_SAFE.decode(&cleaned) {
        return Ok(decoded);
    }

    if let Ok(decoded) = URL_SAFE_NO_PAD.decode(&cleaned) {
        return Ok(decoded);
    }

    let padded = add_base64_padding(&cleaned);
    if let Ok(decoded) = STANDARD.decode(&padded) {
        trace!("Decoded using standard Base64 with added padding");
        return Ok(decoded);
    }
    if let Ok(decoded) = URL_SAFE.decode(&padded) {
        trace!("Decoded using URL-safe Base64 with added padding");
        return Ok(decoded);
    }

    Err(LinkError::encoding("content is not valid base64"))
}

/// Decodes base64 content into a UTF-8 string.
pub fn decode_base64_utf8(content: &str) -> Result<String> {
    let bytes = decode_base64_loose(content)?;
    String::from_utf8(bytes)
        .map_err(|_| LinkError::encoding("base64 payload is not valid UTF-8"))
}

/// Adds `=` padding until the length is a multiple of 4
pub fn add_base64_padding(s: &str) -> String {
    let mut result = s.to_string();
    while !result.len().is_multiple_of(4) {
        result.push('=');
    }
    result
}

/// Checks whether a string uses only base64 characters (either alphabet).
pub fn is_base64_alphabet(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| {
            c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=' || c == '-' || c == '_'
        })
}

// ============================================================================
// Encoding
// ============================================================================

/// Standard alphabet with padding
pub fn encode_base64(content: &str) -> String {
    STANDARD.encode(content)
}

/// URL-safe alphabet without padding, as SIP002 recommends
pub fn encode_base64_url(content: &str) -> String {
    URL_SAFE_NO_PAD.encode(content)
}
