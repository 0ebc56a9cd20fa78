//! authz-crypto - hashing primitives for the card authorization center.
//!
//! Two concerns live here: deriving a deterministic [`authz_types::RequestId`]
//! from a client-supplied idempotency key, and hashing a PAN for storage
//! and comparison. Neither the raw PAN nor the idempotency key is ever
//! logged by callers of this crate.

pub mod idempotency;
pub mod pan;

pub use idempotency::request_id_from_idempotency_key;
pub use pan::hash_pan;
