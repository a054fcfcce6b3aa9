//! Resource stores: local persisted snapshots of server resources.
//!
//! Each store owns one collection, a loading flag, and an error slot.
//! Operations follow a common protocol: set loading and clear the error,
//! call the gateway, reconcile the local snapshot (server wins on
//! success), persist, and return a fixed-shape [`Outcome`].
//!
//! Stores differ in how they treat failures: the cart degrades to local
//! mutations so the UI keeps working without a backend; products and
//! auth surface failures and never mutate locally on a failed remote
//! call.
//!
//! Operations take `&mut self`, so two mutations on one store cannot
//! interleave - dispatch order is completion order per store.

mod auth;
mod cart;
mod products;

pub use auth::AuthStore;
pub use cart::{CartStore, NewCartItem};
pub use products::ProductStore;

/// Fixed-shape result of a store operation.
///
/// User-visible behavior is always this success/failure message pair,
/// never a raw error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Whether the operation took effect (locally or remotely).
    pub success: bool,
    /// Human-readable message for the UI.
    pub message: String,
}

impl Outcome {
    /// A successful outcome.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// A failed outcome.
    #[must_use]
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
