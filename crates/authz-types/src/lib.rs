//! authz-types - canonical domain types for the card authorization center.
//!
//! Zero dependencies on other `authz-*` crates. Every type in this crate is
//! the as-written data model from the specification: the request/decision
//! pair, the authorization hold, the spending-window counter, and the
//! balance snapshot value object.

pub mod balance;
pub mod card;
pub mod decision;
pub mod hold;
pub mod ids;
pub mod money;
pub mod request;
pub mod spending_window;

pub use balance::*;
pub use card::*;
pub use decision::*;
pub use hold::*;
pub use ids::*;
pub use money::*;
pub use request::*;
pub use spending_window::*;
