//! Strongly typed 64-bit identifiers.
//!
//! Opaque 64-bit integer identifiers rather than UUIDs: the generation
//! strategy is free as long as it is globally unique and reasonably
//! monotonic for index locality. `next_id` below folds a timestamp and a
//! per-process counter into a positive i64, which is sufficient for the
//! in-memory/test stores in this repo; a production deployment would
//! swap it for a database sequence or a Snowflake generator without
//! touching any type below.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// Macro to generate ID newtypes over i64, preventing accidental mixing
/// of different identifier spaces (request vs. decision vs. hold, etc.).
macro_rules! define_id_type {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Allocate a new process-unique identifier.
            pub fn new() -> Self {
                Self(next_id())
            }

            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(v: i64) -> Self {
                Self(v)
            }
        }
    };
}

define_id_type!(RequestId, "Unique identifier for an AuthorizationRequest");
define_id_type!(DecisionId, "Unique identifier for an AuthorizationDecision");
define_id_type!(HoldId, "Unique identifier for an AuthorizationHold");
define_id_type!(CardId, "Unique identifier for a card, as resolved by the card directory");
define_id_type!(AccountId, "Unique identifier for a ledger account");
define_id_type!(AccountSpaceId, "Unique identifier for a ledger sub-account partition");
define_id_type!(MerchantId, "Unique identifier for a merchant");
define_id_type!(SpendingWindowId, "Unique identifier for a spending window counter row");

static COUNTER: AtomicI64 = AtomicI64::new(1);

/// Fold a monotonic millisecond timestamp and a per-process sequence into
/// a positive i64 with good index locality: newer IDs sort after older ones.
fn next_id() -> i64 {
    let millis = chrono::Utc::now().timestamp_millis().max(0);
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed) & 0xFFF;
    ((millis << 12) | seq) & i64::MAX
}
