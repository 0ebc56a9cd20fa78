//! authz-core - cross-cutting primitives shared by every evaluator and
//! service in the card authorization center: the component-agnostic
//! failure taxonomy, a pluggable clock, and a retry/backoff helper for
//! calls to external collaborators.

pub mod clock;
pub mod failure;
pub mod keyed_lock;
pub mod retry;

pub use clock::{Clock, SystemClock};
pub use failure::FailureKind;
pub use keyed_lock::KeyedLock;
pub use retry::{retry_with_backoff, RetryConfig};
