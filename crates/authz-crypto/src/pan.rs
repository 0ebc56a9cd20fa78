//! PAN hashing. Card directory lookups and stored requests reference a
//! card by `panHash`, never by the raw number.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of a PAN, optionally salted with a deployment
/// pepper so the hash table can't be rainbow-attacked from a leaked DB
/// dump alone.
pub fn hash_pan(pan: &str, pepper: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pepper.as_bytes());
    hasher.update(pan.as_bytes());
    hex::encode(hasher.finalize())
}

/// Mask a PAN for display/logging: first 6 and last 4 digits visible,
/// everything else replaced with `*`. Never log the unmasked PAN.
pub fn mask_pan(pan: &str) -> String {
    let digits: Vec<char> = pan.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 10 {
        return "*".repeat(digits.len());
    }
    let prefix: String = digits[..6].iter().collect();
    let suffix: String = digits[digits.len() - 4..].iter().collect();
    let masked_len = digits.len() - 10;
    format!("{}{}{}", prefix, "*".repeat(masked_len), suffix)
}
