// crates/toolgate-mcp/src/signing.rs
// ============================================================================
// Module: Canonical Signing
// Description: Canonical parameter signing for the OpenAPI channel.
// Purpose: Produce and verify HMAC-SHA1 signatures over sorted parameters.
// Dependencies: base64, hmac, sha1, subtle, uuid
// ============================================================================

//! ## Overview
//! Both sides of the signed channel share one canonical algorithm: collect
//! the parameters as a flat string map, sort keys byte-wise ascending, join
//! as `key=value&...` with each key and value percent-encoded in the legacy
//! dialect, percent-encode the joined string once more as a whole, and HMAC
//! the result with SHA-1 keyed by the shared secret, Base64-encoded. The
//! double encoding is load-bearing: the verifying side recomputes the same
//! bytes, and the backend expects them.
//!
//! ## Invariants
//! - Signing is deterministic and independent of input key order.
//! - The encoded alphabet keeps `A-Z a-z 0-9 . - _ ~` literal and emits
//!   uppercase `%XX` escapes for every other byte.
//! - Nonces are unique and time-ordered; uniqueness is the load-bearing
//!   property.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64;
use hmac::Hmac;
use hmac::Mac;
use sha1::Sha1;
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Signature method constant carried in signed requests.
pub const SIGNATURE_METHOD: &str = "HmacSHA1";

/// Query parameter and header name for the access key identifier.
pub const PARAM_ACCESS_KEY_ID: &str = "AccessKeyId";
/// Query parameter and header name for the signature value.
pub const PARAM_SIGNATURE: &str = "Signature";
/// Query parameter and header name for the signature method.
pub const PARAM_SIGNATURE_METHOD: &str = "SignatureMethod";
/// Query parameter and header name for the signature nonce.
pub const PARAM_SIGNATURE_NONCE: &str = "SignatureNonce";

/// Keyed HMAC over SHA-1 used by the signed channel.
type HmacSha1 = Hmac<Sha1>;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Signing failures.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The secret could not be loaded into the keyed hash.
    #[error("invalid signing key")]
    InvalidKey,
}

// ============================================================================
// SECTION: Canonical String
// ============================================================================

/// Percent-encodes a value in the legacy dialect.
///
/// Keeps `A-Z a-z 0-9 . - _ ~` literal and emits uppercase `%XX` escapes
/// for every other byte of the UTF-8 encoding, space included.
#[must_use]
pub fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'-' | b'_' | b'~' => {
                encoded.push(char::from(byte));
            }
            _ => {
                encoded.push('%');
                encoded.push(hex_digit(byte >> 4));
                encoded.push(hex_digit(byte & 0x0F));
            }
        }
    }
    encoded
}

/// Returns the uppercase hex digit for a nibble.
const fn hex_digit(nibble: u8) -> char {
    match nibble {
        0..=9 => (b'0' + nibble) as char,
        _ => (b'A' + nibble - 10) as char,
    }
}

/// Joins parameters as `key=value&...` with keys sorted byte-wise ascending
/// and each key and value percent-encoded.
#[must_use]
pub fn sorted_params_str(params: &BTreeMap<String, String>) -> String {
    let mut joined = String::new();
    for (key, value) in params {
        if !joined.is_empty() {
            joined.push('&');
        }
        joined.push_str(&percent_encode(key));
        joined.push('=');
        joined.push_str(&percent_encode(value));
    }
    joined
}

/// Composes the string to sign: the sorted parameter string percent-encoded
/// once more as a whole.
#[must_use]
pub fn compose_string_to_sign(params: &BTreeMap<String, String>) -> String {
    percent_encode(&sorted_params_str(params))
}

// ============================================================================
// SECTION: Signatures
// ============================================================================

/// Signs a composed string with the shared secret.
///
/// # Errors
///
/// Returns [`SigningError`] when the secret cannot key the hash.
pub fn sign_string(string_to_sign: &str, secret: &str) -> Result<String, SigningError> {
    let mut mac =
        HmacSha1::new_from_slice(secret.as_bytes()).map_err(|_| SigningError::InvalidKey)?;
    mac.update(string_to_sign.as_bytes());
    Ok(Base64.encode(mac.finalize().into_bytes()))
}

/// Compares two signatures in constant time.
#[must_use]
pub fn signatures_match(supplied: &str, expected: &str) -> bool {
    supplied.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Generates a fresh time-ordered unique nonce.
#[must_use]
pub fn generate_nonce() -> String {
    Uuid::now_v7().to_string()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
