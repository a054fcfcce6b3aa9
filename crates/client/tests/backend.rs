//! Integration tests against an in-process fixture backend.
//!
//! The fixture is a small axum router bound to an ephemeral port. It
//! deliberately implements only part of the API surface: auth and
//! products exist, the cart endpoints do not. That shape exercises the
//! split behavior of the stores - the cart keeps working locally while
//! products and auth talk to the real routes.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};

use vitrine_client::gateway::{ApiClient, ProductPatch};
use vitrine_client::persist::MemorySnapshotStore;
use vitrine_client::session::TokenStore;
use vitrine_client::stores::{AuthStore, CartStore, NewCartItem, ProductStore};
use vitrine_client::{FailureClass, StoreConfig};
use vitrine_core::{Price, ProductId};

// =============================================================================
// Fixture backend
// =============================================================================

fn bearer_token() -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = json!({
        "sub": "42",
        "role": "admin",
        "exp": chrono::Utc::now().timestamp() + 3600,
    });
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
    format!("{header}.{payload}.fixture-signature")
}

async fn login(Json(credentials): Json<Value>) -> Response {
    if credentials.get("password").and_then(Value::as_str) != Some("secret") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid credentials" })),
        )
            .into_response();
    }
    Json(json!({
        "user": {
            "id": 42,
            "name": "Ana",
            "email": "ana@example.com",
        },
        "token": bearer_token(),
    }))
    .into_response()
}

/// Product list in the envelope layout, with deliberately messy entities
/// (numeric id, `image_url` alias, missing fields).
async fn list_products() -> Json<Value> {
    Json(json!({
        "products": [
            {
                "id": 1,
                "name": "Berry Jam",
                "description": "House made",
                "price": "12.50",
                "image_url": "/jam.png",
                "category": "Pantry",
            },
            { "id": 2, "price": 3.25 },
        ]
    }))
}

async fn update_product(Path(id): Path<String>) -> Response {
    match id.as_str() {
        // Bare ack, no entity in the body.
        "1" => StatusCode::OK.into_response(),
        _ => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": "Price must be positive" })),
        )
            .into_response(),
    }
}

/// Spawn the fixture on an ephemeral port and return its base URL.
async fn spawn_backend() -> String {
    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/products", get(list_products))
        .route("/products/{id}", put(update_product));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client_for(base_url: &str, snapshots: Arc<MemorySnapshotStore>) -> ApiClient {
    let config = StoreConfig::with_api_url(base_url).unwrap();
    ApiClient::new(&config, TokenStore::new(snapshots)).unwrap()
}

// =============================================================================
// Auth
// =============================================================================

#[tokio::test]
async fn test_login_populates_and_persists_session() {
    let base_url = spawn_backend().await;
    let snapshots = Arc::new(MemorySnapshotStore::new());
    let client = client_for(&base_url, snapshots.clone());

    let mut auth = AuthStore::new(client.clone(), snapshots.clone());
    assert!(!auth.is_authenticated());

    let outcome = auth.login("ana@example.com", "secret").await;
    assert!(outcome.success, "{}", outcome.message);

    let user = auth.current_user().unwrap();
    assert_eq!(user.id.as_str(), "42");
    assert_eq!(user.email, "ana@example.com");
    assert!(auth.is_authenticated());
    assert!(auth.is_admin());

    // The session survives a restart of the store layer.
    let reloaded = AuthStore::new(client, snapshots);
    assert_eq!(reloaded.current_user().unwrap().name, "Ana");
}

#[tokio::test]
async fn test_login_rejection_surfaces_error_without_session() {
    let base_url = spawn_backend().await;
    let snapshots = Arc::new(MemorySnapshotStore::new());
    let mut auth = AuthStore::new(client_for(&base_url, snapshots.clone()), snapshots);

    let outcome = auth.login("ana@example.com", "wrong").await;
    assert!(!outcome.success);
    assert!(auth.error().is_some());
    assert!(auth.current_user().is_none());
    assert!(!auth.is_authenticated());
}

// =============================================================================
// Products
// =============================================================================

#[tokio::test]
async fn test_fetch_products_normalizes_wire_entities() {
    let base_url = spawn_backend().await;
    let snapshots = Arc::new(MemorySnapshotStore::new());
    let mut products = ProductStore::new(client_for(&base_url, snapshots.clone()), snapshots);

    let outcome = products.fetch_products().await;
    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(products.products().len(), 2);

    let jam = &products.products()[0];
    assert_eq!(jam.id.as_str(), "1");
    assert_eq!(jam.image, "/jam.png");
    assert_eq!(jam.price, Price::new("12.50".parse().unwrap()));

    // Sparse entity gets display defaults rather than being dropped.
    let sparse = &products.products()[1];
    assert_eq!(sparse.id.as_str(), "2");
    assert_eq!(sparse.name, "Unknown Product");
    assert_eq!(sparse.price, Price::new("3.25".parse().unwrap()));
}

#[tokio::test]
async fn test_update_product_ack_applies_patch_locally() {
    let base_url = spawn_backend().await;
    let snapshots = Arc::new(MemorySnapshotStore::new());
    let mut products = ProductStore::new(client_for(&base_url, snapshots.clone()), snapshots);
    products.fetch_products().await;

    let patch = ProductPatch {
        name: Some("Renamed Jam".to_owned()),
        ..ProductPatch::default()
    };
    let outcome = products.update_product(&ProductId::new("1"), patch).await;
    assert!(outcome.success, "{}", outcome.message);

    let jam = products
        .products()
        .iter()
        .find(|p| p.id.as_str() == "1")
        .unwrap();
    assert_eq!(jam.name, "Renamed Jam");
    // Untouched fields keep their fetched values.
    assert_eq!(jam.description, "House made");
}

#[tokio::test]
async fn test_update_product_rejection_surfaces_message() {
    let base_url = spawn_backend().await;
    let snapshots = Arc::new(MemorySnapshotStore::new());
    let mut products = ProductStore::new(client_for(&base_url, snapshots.clone()), snapshots);
    products.fetch_products().await;

    let outcome = products
        .update_product(&ProductId::new("2"), ProductPatch::default())
        .await;
    assert!(!outcome.success);
    assert!(outcome.message.contains("Price must be positive"));
    assert!(products.error().is_some());

    // The local snapshot is untouched on failure.
    let sparse = products
        .products()
        .iter()
        .find(|p| p.id.as_str() == "2")
        .unwrap();
    assert_eq!(sparse.name, "Unknown Product");
}

// =============================================================================
// Cart against missing endpoints
// =============================================================================

#[tokio::test]
async fn test_cart_works_without_cart_routes() {
    let base_url = spawn_backend().await;
    let snapshots = Arc::new(MemorySnapshotStore::new());
    let mut cart = CartStore::new(client_for(&base_url, snapshots.clone()), snapshots);

    // The fixture has no cart routes, so every sync gets a 404. The
    // mutation still lands locally and no error is surfaced.
    let outcome = cart
        .add_item(NewCartItem {
            product_id: ProductId::new("p1"),
            name: "Berry Jam".to_owned(),
            price: Price::new("12.50".parse().unwrap()),
            image: "/jam.png".to_owned(),
        })
        .await;
    assert!(outcome.success);
    assert_eq!(cart.items().len(), 1);
    assert_eq!(cart.items()[0].quantity, 1);
    assert!(cart.error().is_none());

    // Fetch cannot reach a cart backend either; the local line survives.
    cart.fetch_cart().await;
    assert_eq!(cart.items().len(), 1);
}

#[tokio::test]
async fn test_missing_endpoint_classified_as_degraded() {
    let base_url = spawn_backend().await;
    let snapshots = Arc::new(MemorySnapshotStore::new());
    let client = client_for(&base_url, snapshots);

    let envelope = client.cart_add(&ProductId::new("p1"), 1).await;
    assert!(!envelope.success);
    assert_eq!(envelope.status, Some(404));
    assert_eq!(envelope.failure_class(), Some(FailureClass::Missing));
    assert!(envelope.is_degraded_backend());
}
