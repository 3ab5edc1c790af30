//! Payzone signing schemes
//!
//! The paywall and the notification channel use two unrelated constructions:
//!
//! * outbound: `sha256(secret || payload)`, a plain digest with the secret as prefix
//! * inbound: `HMAC-SHA256(key, raw_body)`
//!
//! They are deliberately exposed as separate functions. Feeding one scheme's output to the
//! other never verifies.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tracing::error;

type HmacSha256 = Hmac<Sha256>;

/// Lowercase hex SHA-256 of `secret_key` immediately followed by `payload`.
///
/// `payload` must be the exact bytes that will be transmitted to the paywall.
pub fn sign_outbound(secret_key: &str, payload: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret_key.as_bytes());
    hasher.update(payload);
    hex::encode(hasher.finalize())
}

/// Checks `provided_signature` against `HMAC-SHA256(secret_key, raw_body)`.
///
/// `raw_body` must be the request body exactly as received. The comparison runs in
/// constant time over the decoded digest; a header that is not hex never verifies.
pub fn verify_inbound(secret_key: &str, raw_body: &[u8], provided_signature: &str) -> bool {
    let provided = match hex::decode(provided_signature.trim()) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    match keyed_mac(secret_key, raw_body) {
        Some(mac) => mac.verify_slice(&provided).is_ok(),
        None => false,
    }
}

/// Lowercase hex `HMAC-SHA256(secret_key, body)`, the value the provider sends in
/// `X-Callback-Signature`. Used to sign replayed or simulated notifications.
///
/// Returns an empty string, which [`verify_inbound`] never accepts, if the MAC cannot be keyed.
pub fn inbound_signature(secret_key: &str, body: &[u8]) -> String {
    keyed_mac(secret_key, body)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default()
}

fn keyed_mac(secret_key: &str, body: &[u8]) -> Option<HmacSha256> {
    match HmacSha256::new_from_slice(secret_key.as_bytes()) {
        Ok(mut mac) => {
            mac.update(body);
            Some(mac)
        }
        Err(e) => {
            error!("Failed to initialise HMAC: {}", e);
            None
        }
    }
}
