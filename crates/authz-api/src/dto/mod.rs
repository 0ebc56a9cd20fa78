//! Wire DTOs for the authorization HTTP surface: camelCase JSON shapes
//! distinct from the snake_case domain types in `authz-types`, mapped by
//! explicit `From`/`TryFrom` impls the same way `authz-db::models` maps
//! domain types onto database rows.

pub mod decision;
pub mod hold;
pub mod request;

pub use decision::*;
pub use hold::*;
pub use request::*;
