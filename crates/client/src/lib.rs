//! Vitrine client-state layer.
//!
//! Local, persisted snapshots of the storefront's server resources
//! (products, cart, auth session) plus the REST gateway that keeps them
//! synchronized. Consumers (UI screens) read store snapshots and invoke
//! store operations; they never talk to the backend directly.
//!
//! # Architecture
//!
//! - [`persist`] - injectable snapshot store (the serialization boundary)
//! - [`session`] - bearer-token extraction and validation from the
//!   persisted session blob
//! - [`gateway`] - thin HTTP wrapper returning a uniform
//!   success/failure envelope for every call
//! - [`stores`] - the cart, product, and auth resource stores
//!
//! # Degraded mode
//!
//! The cart is designed to work with an optionally-present backend: if a
//! cart endpoint is missing, unauthorized, or unreachable, the mutation
//! is applied to the local snapshot anyway and the UI stays functional.
//! Product and auth operations, by contrast, surface such failures and
//! never let the local catalog silently diverge from the server.
//!
//! # Example
//!
//! ```rust,ignore
//! use vitrine_client::config::StoreConfig;
//! use vitrine_client::gateway::ApiClient;
//! use vitrine_client::persist;
//! use vitrine_client::session::TokenStore;
//! use vitrine_client::stores::{CartStore, NewCartItem};
//!
//! let config = StoreConfig::from_env()?;
//! let snapshots = persist::open(&config)?;
//! let client = ApiClient::new(&config, TokenStore::new(snapshots.clone()))?;
//!
//! let mut cart = CartStore::new(client, snapshots);
//! cart.add_item(NewCartItem {
//!     product_id: "p1".into(),
//!     name: "Widget".into(),
//!     price: "10".parse()?,
//!     image: "/widget.png".into(),
//! }).await;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod gateway;
pub mod persist;
pub mod session;
pub mod stores;

pub use config::StoreConfig;
pub use error::{FailureClass, GatewayError, StorageError};
pub use gateway::{ApiClient, Envelope};
pub use session::TokenStore;
pub use stores::{AuthStore, CartStore, ProductStore};
