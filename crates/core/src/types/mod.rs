//! Shared type definitions.

mod id;
mod price;
mod role;

pub use price::Price;
pub use role::Role;

// Re-export all ID types defined via the `define_id!` macro.
pub use id::*;
