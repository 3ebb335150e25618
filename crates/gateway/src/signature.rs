//! Webhook signatures: lowercase hex HMAC-SHA512 of the raw body.

use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;

type HmacSha512 = Hmac<Sha512>;

/// Signs `payload` with `secret`.
pub fn sign(secret: &str, payload: &[u8]) -> String {
    // HMAC accepts keys of any length
    let mut mac = match HmacSha512::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Compares `signature` with the expected one in constant time.
///
/// Hex case and surrounding whitespace are ignored.
pub fn verify(secret: &str, payload: &[u8], signature: &str) -> bool {
    let expected = sign(secret, payload);
    let provided = signature.trim().to_ascii_lowercase();
    if expected.is_empty() {
        return false;
    }
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}
