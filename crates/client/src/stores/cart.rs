//! Cart store.
//!
//! The cart works against an optionally-present backend: every mutation
//! is applied to the local snapshot first, then synced to the server on
//! a best-effort basis. A degraded backend (missing endpoint,
//! unauthenticated session, unreachable host) never surfaces as a
//! user-facing cart error.
//!
//! Invariants:
//! - a line's quantity is >= 1 while the line exists
//! - at most one line per product id
//! - adding an existing product increments its quantity by exactly 1

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, instrument, warn};

use vitrine_core::{Price, ProductId};

use crate::gateway::{ApiClient, CartLine, Envelope};
use crate::persist::{SnapshotStore, keys, unwrap_state, versioned};
use crate::stores::Outcome;

/// Caller-supplied display fields for a product being added to the cart.
///
/// Copied into the line at add-time; the line is not re-synced to the
/// product catalog afterward.
#[derive(Debug, Clone)]
pub struct NewCartItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub image: String,
}

/// Local persisted snapshot of the shopping cart.
pub struct CartStore {
    client: ApiClient,
    snapshots: Arc<dyn SnapshotStore>,
    items: Vec<CartLine>,
    loading: bool,
    error: Option<String>,
    warned_degraded: bool,
}

impl CartStore {
    /// Create a cart store, hydrating from the persisted snapshot.
    #[must_use]
    pub fn new(client: ApiClient, snapshots: Arc<dyn SnapshotStore>) -> Self {
        let items = hydrate(snapshots.as_ref());
        Self {
            client,
            snapshots,
            items,
            loading: false,
            error: None,
            warned_degraded: false,
        }
    }

    /// Current cart lines.
    #[must_use]
    pub fn items(&self) -> &[CartLine] {
        &self.items
    }

    /// Whether an operation is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Last surfaced error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Sum of price x quantity over all lines. Recomputed on demand.
    #[must_use]
    pub fn get_total_price(&self) -> Price {
        self.items
            .iter()
            .fold(Price::ZERO, |total, line| total + line.subtotal())
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Replace the local snapshot with the server-side cart.
    ///
    /// If the cart backend is unavailable, the local snapshot is kept
    /// as-is - this is not an error.
    #[instrument(skip(self))]
    pub async fn fetch_cart(&mut self) -> Outcome {
        self.begin();
        let envelope = self.client.fetch_cart().await;
        match envelope.data {
            Some(lines) if envelope.success => {
                // Server wins; drop anything that violates the quantity
                // invariant.
                self.items = lines.into_iter().filter(|l| l.quantity >= 1).collect();
                self.persist();
            }
            _ => self.note_degraded(&envelope),
        }
        self.loading = false;
        Outcome::ok("")
    }

    /// Add one unit of a product to the cart.
    ///
    /// Upserts locally (existing line: quantity + 1, otherwise a new
    /// line with quantity 1), then best-effort syncs the add remotely.
    #[instrument(skip(self, item), fields(product_id = %item.product_id))]
    pub async fn add_item(&mut self, item: NewCartItem) -> Outcome {
        self.begin();
        let product_id = item.product_id.clone();
        self.apply_upsert(item);

        let envelope = self.client.cart_add(&product_id, 1).await;
        self.note_degraded(&envelope);

        self.loading = false;
        Outcome::ok("Item added to cart")
    }

    /// Remove a product's line from the cart. Removing an absent id is a
    /// no-op.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_item(&mut self, product_id: &ProductId) -> Outcome {
        self.begin();
        self.items.retain(|line| &line.product_id != product_id);
        self.persist();

        let envelope = self.client.cart_remove(product_id).await;
        self.note_degraded(&envelope);

        self.loading = false;
        Outcome::ok("Item removed from cart")
    }

    /// Set a line's quantity to exactly `quantity`.
    ///
    /// A quantity of zero removes the line entirely. Updating an absent
    /// id creates nothing.
    #[instrument(skip(self), fields(product_id = %product_id, quantity))]
    pub async fn update_quantity(&mut self, product_id: &ProductId, quantity: u32) -> Outcome {
        if quantity == 0 {
            return self.remove_item(product_id).await;
        }

        self.begin();
        let mut present = false;
        for line in &mut self.items {
            if &line.product_id == product_id {
                line.quantity = quantity;
                present = true;
            }
        }
        if present {
            self.persist();
        }

        let envelope = self.client.cart_update_quantity(product_id, quantity).await;
        self.note_degraded(&envelope);

        self.loading = false;
        Outcome::ok("")
    }

    /// Empty the local cart. No remote call - used on logout and after
    /// checkout.
    pub fn clear_cart(&mut self) {
        self.items.clear();
        self.persist();
    }

    /// Complete a purchase.
    ///
    /// Placeholder for a real order-placement call: the current backend
    /// has no order service, so checkout is a client-side transition
    /// that empties the cart.
    #[instrument(skip(self))]
    pub async fn checkout(&mut self) -> Outcome {
        self.clear_cart();
        Outcome::ok("Order placed")
    }

    // =========================================================================
    // Local mutation / persistence
    // =========================================================================

    fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Local upsert: increment an existing line by 1, or append a new
    /// line with quantity 1 copying the caller-supplied display fields.
    fn apply_upsert(&mut self, item: NewCartItem) {
        if let Some(line) = self
            .items
            .iter_mut()
            .find(|line| line.product_id == item.product_id)
        {
            line.quantity += 1;
        } else {
            self.items.push(CartLine {
                product_id: item.product_id,
                name: item.name,
                price: item.price,
                image: item.image,
                quantity: 1,
            });
        }
        self.persist();
    }

    /// Log (once) when the cart backend is degraded. The local mutation
    /// has already been applied, so no error is surfaced.
    fn note_degraded<T>(&mut self, envelope: &Envelope<T>) {
        if envelope.success {
            return;
        }
        if envelope.is_degraded_backend() {
            if !self.warned_degraded {
                warn!(
                    status = ?envelope.status,
                    "cart backend unavailable, using local snapshot"
                );
                self.warned_degraded = true;
            }
        } else {
            debug!(message = %envelope.message, "cart sync rejected, keeping local snapshot");
        }
    }

    fn persist(&self) {
        let blob = versioned(json!({ "items": self.items }));
        if let Err(e) = self.snapshots.save(keys::CART, &blob) {
            warn!(error = %e, "failed to persist cart snapshot");
        }
    }
}

fn hydrate(snapshots: &dyn SnapshotStore) -> Vec<CartLine> {
    let Ok(Some(blob)) = snapshots.load(keys::CART) else {
        return Vec::new();
    };
    let Some(items) = unwrap_state(&blob).get("items") else {
        return Vec::new();
    };
    match serde_json::from_value::<Vec<CartLine>>(items.clone()) {
        Ok(lines) => lines.into_iter().filter(|l| l.quantity >= 1).collect(),
        Err(e) => {
            warn!(error = %e, "discarding unreadable cart snapshot");
            Vec::new()
        }
    }
}
