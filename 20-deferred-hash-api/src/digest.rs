//! One-way digest applied to submitted values.

use base64::{Engine as _, engine::general_purpose::URL_SAFE};
use sha2::{Digest as _, Sha512};

/// Returns the URL-safe, padded base64 encoding of the SHA-512 of `value`.
///
/// The output is always 88 characters long.
pub fn digest(value: &str) -> String {
    let hash = Sha512::digest(value.as_bytes());
    URL_SAFE.encode(hash)
}
