pub mod decision;
pub mod hold;
pub mod mock;
pub mod request;
pub mod spending_window;

pub use decision::{DecisionRepo, DecisionStore};
pub use hold::PgHoldStore;
pub use mock::{InMemoryDecisionStore, InMemoryRequestStore};
pub use request::{RequestRepo, RequestStore};
pub use spending_window::PgSpendingWindowStore;
