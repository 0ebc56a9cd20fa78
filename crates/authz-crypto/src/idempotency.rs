//! Deterministic request-id derivation from a client idempotency key.
//!
//! Two submissions carrying the same idempotency key must resolve to the
//! same [`RequestId`] so the orchestrator's per-request linearization and
//! duplicate-detection logic see them as the same request, without a
//! round trip to storage first. A cryptographic hash truncated to 63 bits
//! gives collision resistance far beyond what a 32-bit string hashCode
//! fold could offer, at the same cost.

use authz_types::RequestId;

/// Fold a client idempotency key into a stable, positive [`RequestId`].
///
/// Uses BLAKE3 rather than a simple fold-and-multiply hashCode: two
/// unrelated keys differing by one byte must not collide in the low 63
/// bits, which a weak rolling hash cannot guarantee at this volume.
pub fn request_id_from_idempotency_key(idempotency_key: &str) -> RequestId {
    let digest = blake3::hash(idempotency_key.as_bytes());
    let bytes = digest.as_bytes();
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[0..8]);
    let raw = i64::from_be_bytes(buf);
    RequestId::from(raw & i64::MAX)
}
