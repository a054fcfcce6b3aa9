//! Product store.
//!
//! The server is the source of truth for the catalog: fetches replace
//! the local snapshot, and mutations reconcile it only when the remote
//! call succeeded. Failures are surfaced to the caller - the catalog
//! never silently diverges from the server the way the cart is allowed
//! to.

use std::sync::Arc;

use serde_json::json;
use tracing::{instrument, warn};

use vitrine_core::ProductId;

use crate::gateway::{ApiClient, NewProduct, Product, ProductPatch, ProductQuery};
use crate::persist::{SnapshotStore, keys, unwrap_state, versioned};
use crate::stores::Outcome;

/// Local persisted snapshot of the product catalog.
pub struct ProductStore {
    client: ApiClient,
    snapshots: Arc<dyn SnapshotStore>,
    products: Vec<Product>,
    loading: bool,
    error: Option<String>,
    search_term: String,
    selected_category: Option<String>,
}

impl ProductStore {
    /// Create a product store, hydrating from the persisted snapshot.
    #[must_use]
    pub fn new(client: ApiClient, snapshots: Arc<dyn SnapshotStore>) -> Self {
        let products = hydrate(snapshots.as_ref());
        Self {
            client,
            snapshots,
            products,
            loading: false,
            error: None,
            search_term: String::new(),
            selected_category: None,
        }
    }

    /// Current product snapshot.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
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

    /// Set the local search term (used by [`Self::filtered_products`]).
    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    /// Set the category filter; `None` shows all categories.
    pub fn set_selected_category(&mut self, category: Option<String>) {
        self.selected_category = category;
    }

    /// Pure read combining the snapshot with the current search term
    /// (case-insensitive substring over name and description) and the
    /// selected category.
    #[must_use]
    pub fn filtered_products(&self) -> Vec<&Product> {
        let term = self.search_term.to_lowercase();
        self.products
            .iter()
            .filter(|p| {
                let matches_search = term.is_empty()
                    || p.name.to_lowercase().contains(&term)
                    || p.description.to_lowercase().contains(&term);
                let matches_category = self
                    .selected_category
                    .as_ref()
                    .is_none_or(|c| p.category.as_ref() == Some(c));
                matches_search && matches_category
            })
            .collect()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Fetch the full product list.
    #[instrument(skip(self))]
    pub async fn fetch_products(&mut self) -> Outcome {
        self.list(ProductQuery::default()).await
    }

    /// Fetch the product list filtered server-side by name.
    ///
    /// The term is also kept locally so [`Self::filtered_products`]
    /// stays consistent with what was requested.
    #[instrument(skip(self), fields(term = %term))]
    pub async fn search_products(&mut self, term: &str) -> Outcome {
        self.search_term = term.to_owned();
        let name = if term.is_empty() {
            None
        } else {
            Some(term.to_owned())
        };
        self.list(ProductQuery {
            name,
            ..ProductQuery::default()
        })
        .await
    }

    async fn list(&mut self, query: ProductQuery) -> Outcome {
        self.begin();
        let envelope = self.client.fetch_products(&query).await;
        self.loading = false;

        match envelope.data {
            Some(products) if envelope.success => {
                self.products = products;
                self.persist();
                Outcome::ok("")
            }
            _ => self.fail(envelope.message),
        }
    }

    /// Create a product and append the server's entity to the snapshot.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn add_product(&mut self, product: NewProduct) -> Outcome {
        self.begin();
        let envelope = self.client.create_product(product).await;
        self.loading = false;

        match envelope.data {
            Some(created) if envelope.success => {
                self.products.push(created);
                self.persist();
                Outcome::ok("Product added successfully")
            }
            _ => self.fail(envelope.message),
        }
    }

    /// Update a product, patching the local copy by id on success.
    ///
    /// Prefers the server's authoritative returned entity; falls back to
    /// applying the patch locally when the backend only acks.
    #[instrument(skip(self, patch), fields(id = %id))]
    pub async fn update_product(&mut self, id: &ProductId, patch: ProductPatch) -> Outcome {
        self.begin();
        let envelope = self.client.update_product(id, patch.clone()).await;
        self.loading = false;

        if !envelope.success {
            return self.fail(envelope.message);
        }

        let returned = envelope.data.flatten();
        for product in &mut self.products {
            if &product.id == id {
                match &returned {
                    Some(entity) => *product = entity.clone(),
                    None => patch.apply_to(product),
                }
            }
        }
        self.persist();
        Outcome::ok("Product updated successfully")
    }

    /// Delete a product, removing it from the snapshot on success.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn delete_product(&mut self, id: &ProductId) -> Outcome {
        self.begin();
        let envelope = self.client.delete_product(id).await;
        self.loading = false;

        if !envelope.success {
            return self.fail(envelope.message);
        }

        self.products.retain(|product| &product.id != id);
        self.persist();
        Outcome::ok("Product removed successfully")
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    fn fail(&mut self, message: String) -> Outcome {
        self.error = Some(message.clone());
        Outcome::err(message)
    }

    fn persist(&self) {
        let blob = versioned(json!({ "products": self.products }));
        if let Err(e) = self.snapshots.save(keys::PRODUCTS, &blob) {
            warn!(error = %e, "failed to persist product snapshot");
        }
    }
}

fn hydrate(snapshots: &dyn SnapshotStore) -> Vec<Product> {
    let Ok(Some(blob)) = snapshots.load(keys::PRODUCTS) else {
        return Vec::new();
    };
    let Some(products) = unwrap_state(&blob).get("products") else {
        return Vec::new();
    };
    match serde_json::from_value(products.clone()) {
        Ok(products) => products,
        Err(e) => {
            warn!(error = %e, "discarding unreadable product snapshot");
            Vec::new()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::persist::MemorySnapshotStore;
    use crate::session::TokenStore;
    use vitrine_core::Price;

    fn degraded_client(snapshots: Arc<MemorySnapshotStore>) -> ApiClient {
        let config = StoreConfig::with_api_url("http://127.0.0.1:9").unwrap();
        ApiClient::new(&config, TokenStore::new(snapshots)).unwrap()
    }

    fn product(id: &str, name: &str, description: &str, category: Option<&str>) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_owned(),
            description: description.to_owned(),
            price: Price::new("10".parse().unwrap()),
            image: "/p.png".to_owned(),
            category: category.map(str::to_owned),
            stock: None,
            created_at: None,
        }
    }

    fn store_with(products: Vec<Product>) -> ProductStore {
        let snapshots = Arc::new(MemorySnapshotStore::new());
        let mut store = ProductStore::new(degraded_client(snapshots.clone()), snapshots);
        store.products = products;
        store
    }

    #[test]
    fn test_filtered_products_case_insensitive_name_and_description() {
        let mut store = store_with(vec![
            product("1", "iPhone 15 Pro", "Advanced chip", None),
            product("2", "MacBook Air", "Thin laptop with advanced battery", None),
            product("3", "Headphones", "Noise cancelling", None),
        ]);

        store.set_search_term("ADVANCED");
        let found = store.filtered_products();
        assert_eq!(found.len(), 2);

        store.set_search_term("macbook");
        assert_eq!(store.filtered_products().len(), 1);

        store.set_search_term("");
        assert_eq!(store.filtered_products().len(), 3);
    }

    #[test]
    fn test_filtered_products_category() {
        let mut store = store_with(vec![
            product("1", "Phone", "", Some("Smartphones")),
            product("2", "Laptop", "", Some("Notebooks")),
            product("3", "Uncategorized", "", None),
        ]);

        store.set_selected_category(Some("Smartphones".to_owned()));
        let found = store.filtered_products();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.as_str(), "1");

        store.set_selected_category(None);
        assert_eq!(store.filtered_products().len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_failure_surfaces_error_and_keeps_snapshot() {
        let mut store = store_with(vec![product("1", "Kept", "", None)]);
        let outcome = store.fetch_products().await;
        assert!(!outcome.success);
        assert!(store.error().is_some());
        // No local divergence: the old snapshot is untouched.
        assert_eq!(store.products().len(), 1);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_mutations_do_not_apply_locally_on_failure() {
        let mut store = store_with(vec![product("1", "Kept", "", None)]);

        let outcome = store
            .add_product(NewProduct {
                name: "New".to_owned(),
                description: String::new(),
                price: Price::ZERO,
                category: None,
                stock: None,
                image: None,
            })
            .await;
        assert!(!outcome.success);
        assert_eq!(store.products().len(), 1);

        let outcome = store.delete_product(&ProductId::new("1")).await;
        assert!(!outcome.success);
        assert_eq!(store.products().len(), 1);

        let outcome = store
            .update_product(&ProductId::new("1"), ProductPatch::default())
            .await;
        assert!(!outcome.success);
        assert_eq!(store.products()[0].name, "Kept");
    }

    #[tokio::test]
    async fn test_hydration_roundtrip() {
        let snapshots = Arc::new(MemorySnapshotStore::new());
        let mut store = ProductStore::new(degraded_client(snapshots.clone()), snapshots.clone());
        store.products = vec![product("1", "Persisted", "", None)];
        store.persist();

        let reloaded = ProductStore::new(degraded_client(snapshots.clone()), snapshots);
        assert_eq!(reloaded.products().len(), 1);
        assert_eq!(reloaded.products()[0].name, "Persisted");
    }
}
