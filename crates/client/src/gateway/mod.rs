//! REST gateway client.
//!
//! Thin HTTP wrapper for all resource operations. Every call attaches the
//! current bearer token when one is present and returns a uniform
//! [`Envelope`] - transport and server errors are both captured into that
//! shape, never surfaced as raw errors. The gateway normalizes; only the
//! store layer decides behavior per failure class.

mod types;

pub use types::{
    CartLine, ImageSource, NewProduct, NewUser, PLACEHOLDER_IMAGE, Product, ProductPatch,
    ProductQuery, extract_session,
};

use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::{DeserializeOwned, Error as _};
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use vitrine_core::ProductId;

use crate::config::StoreConfig;
use crate::error::{FailureClass, GatewayError};
use crate::session::{Session, TokenStore};
use types::{WireCart, WireProduct, WireProductList};

/// Longest response-body excerpt included in error messages and logs.
const BODY_EXCERPT_LEN: usize = 200;

// =============================================================================
// Envelope
// =============================================================================

/// Uniform result of every gateway call.
#[derive(Debug)]
pub struct Envelope<T> {
    /// Whether the call succeeded.
    pub success: bool,
    /// Payload on success.
    pub data: Option<T>,
    /// Human-readable failure message; empty on success.
    pub message: String,
    /// HTTP status of the failure, when one was received.
    pub status: Option<u16>,
    class: Option<FailureClass>,
}

impl<T> Envelope<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: String::new(),
            status: None,
            class: None,
        }
    }

    fn err(error: &GatewayError) -> Self {
        Self {
            success: false,
            data: None,
            message: error.to_string(),
            status: error.status(),
            class: Some(error.class()),
        }
    }

    /// Failure classification, present when `success` is false.
    #[must_use]
    pub const fn failure_class(&self) -> Option<FailureClass> {
        self.class
    }

    /// Whether this failure indicates a degraded backend (missing
    /// endpoint, unauthenticated session, or unreachable host).
    #[must_use]
    pub fn is_degraded_backend(&self) -> bool {
        self.class.is_some_and(FailureClass::is_degraded_backend)
    }
}

impl<T> From<Result<T, GatewayError>> for Envelope<T> {
    fn from(result: Result<T, GatewayError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(error) => {
                debug!(error = %error, "gateway call failed");
                Self::err(&error)
            }
        }
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the storefront REST API.
///
/// Cheap to clone; all calls return an [`Envelope`] and never a raw
/// transport error.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenStore,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Transport` if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(config: &StoreConfig, tokens: TokenStore) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url: config.api_url.as_str().trim_end_matches('/').to_owned(),
                tokens,
            }),
        })
    }

    /// Token store this client reads credentials from.
    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    /// Build a request with the bearer token attached when present.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.inner.base_url);
        let builder = self.inner.http.request(method, url);
        match self.inner.tokens.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and decode the JSON body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, GatewayError> {
        let body = self.send_raw(builder).await?;
        match serde_json::from_str(&body) {
            Ok(data) => Ok(data),
            Err(e) => {
                warn!(
                    error = %e,
                    body = %excerpt(&body),
                    "failed to decode backend response"
                );
                Err(GatewayError::Decode(e))
            }
        }
    }

    /// Send a request and parse the body leniently: an empty body becomes
    /// `Value::Null` (some ack endpoints return nothing).
    async fn send_value(&self, builder: RequestBuilder) -> Result<Value, GatewayError> {
        let body = self.send_raw(builder).await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(GatewayError::Decode)
    }

    /// Send a request, discarding the body.
    async fn send_ack(&self, builder: RequestBuilder) -> Result<(), GatewayError> {
        self.send_raw(builder).await.map(|_| ())
    }

    /// Send a request, map non-success statuses into the error taxonomy,
    /// and return the body text.
    async fn send_raw(&self, builder: RequestBuilder) -> Result<String, GatewayError> {
        let response = builder.send().await?;
        let status = response.status();
        let path = response.url().path().to_owned();

        // Read the body first for better error diagnostics.
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        debug!(status = %status, path = %path, body = %excerpt(&body), "backend returned non-success status");

        match status {
            StatusCode::UNAUTHORIZED => Err(GatewayError::Unauthorized),
            StatusCode::NOT_FOUND => Err(GatewayError::NotImplemented(path)),
            s if s.is_client_error() => Err(GatewayError::Validation(failure_message(&body))),
            s => Err(GatewayError::Server(s.as_u16(), failure_message(&body))),
        }
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Log in with email and password.
    ///
    /// The response shape is tolerant: user and token may be nested in
    /// several layouts (see [`extract_session`]).
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Envelope<Session> {
        let result = async {
            let body = self
                .send_value(
                    self.request(Method::POST, "/auth/login")
                        .json(&json!({ "email": email, "password": password })),
                )
                .await?;
            extract_session(&body).ok_or_else(|| {
                GatewayError::Decode(serde_json::Error::custom(
                    "login response did not contain a user and token",
                ))
            })
        }
        .await;
        result.into()
    }

    /// Register a new user.
    ///
    /// Some backends answer with a session, others with a bare ack; the
    /// envelope carries `Some(session)` only in the former case.
    #[instrument(skip(self, user), fields(email = %user.email))]
    pub async fn register(&self, user: &NewUser) -> Envelope<Option<Session>> {
        let result = async {
            let body = self
                .send_value(self.request(Method::POST, "/auth/register").json(user))
                .await?;
            Ok(extract_session(&body))
        }
        .await;
        result.into()
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Fetch the product list, optionally filtered server-side by name.
    #[instrument(skip(self))]
    pub async fn fetch_products(&self, query: &ProductQuery) -> Envelope<Vec<Product>> {
        let mut builder = self.request(Method::GET, "/products");
        if let Some(name) = &query.name {
            builder = builder.query(&[("name", name.as_str())]);
        }
        if let Some(page) = query.page {
            builder = builder.query(&[("page", page)]);
        }
        if let Some(limit) = query.limit {
            builder = builder.query(&[("limit", limit)]);
        }

        let result = self
            .send_json::<WireProductList>(builder)
            .await
            .map(WireProductList::normalize);
        result.into()
    }

    /// Create a product. The payload is multipart form content because
    /// the image may be a remote reference or raw file bytes.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create_product(&self, product: NewProduct) -> Envelope<Product> {
        let result = async {
            let mut form = Form::new()
                .text("name", product.name)
                .text("description", product.description)
                .text("price", product.price.to_string());
            if let Some(category) = product.category {
                form = form.text("category", category);
            }
            if let Some(stock) = product.stock {
                form = form.text("stock", stock.to_string());
            }
            form = attach_image(form, product.image)?;

            let wire: WireProduct = self
                .send_json(self.request(Method::POST, "/products").multipart(form))
                .await?;
            Ok(wire.normalize())
        }
        .await;
        result.into()
    }

    /// Update a product. Only the fields present in the patch are sent.
    ///
    /// Backends that answer with a bare ack instead of the updated
    /// entity yield `Some(None)` data; the store then applies the patch
    /// locally.
    #[instrument(skip(self, patch), fields(id = %id))]
    pub async fn update_product(
        &self,
        id: &ProductId,
        patch: ProductPatch,
    ) -> Envelope<Option<Product>> {
        let result = async {
            let mut form = Form::new();
            if let Some(name) = patch.name {
                form = form.text("name", name);
            }
            if let Some(description) = patch.description {
                form = form.text("description", description);
            }
            if let Some(price) = patch.price {
                form = form.text("price", price.to_string());
            }
            if let Some(category) = patch.category {
                form = form.text("category", category);
            }
            if let Some(stock) = patch.stock {
                form = form.text("stock", stock.to_string());
            }
            form = attach_image(form, patch.image)?;

            let path = format!("/products/{id}");
            let body = self
                .send_value(self.request(Method::PUT, &path).multipart(form))
                .await?;
            Ok(serde_json::from_value::<WireProduct>(body)
                .ok()
                .map(WireProduct::normalize))
        }
        .await;
        result.into()
    }

    /// Delete a product.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn delete_product(&self, id: &ProductId) -> Envelope<()> {
        let path = format!("/products/{id}");
        self.send_ack(self.request(Method::DELETE, &path)).await.into()
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Fetch the server-side cart, normalized into cart lines.
    #[instrument(skip(self))]
    pub async fn fetch_cart(&self) -> Envelope<Vec<CartLine>> {
        let result = self
            .send_json::<WireCart>(self.request(Method::GET, "/cart"))
            .await
            .map(WireCart::normalize);
        result.into()
    }

    /// Add a product to the server-side cart.
    #[instrument(skip(self), fields(product_id = %product_id, quantity))]
    pub async fn cart_add(&self, product_id: &ProductId, quantity: u32) -> Envelope<()> {
        self.send_ack(
            self.request(Method::POST, "/cart/add-product")
                .json(&json!({ "productId": product_id, "quantity": quantity })),
        )
        .await
        .into()
    }

    /// Remove a product from the server-side cart.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn cart_remove(&self, product_id: &ProductId) -> Envelope<()> {
        self.send_ack(
            self.request(Method::DELETE, "/cart/remove-product")
                .json(&json!({ "productId": product_id })),
        )
        .await
        .into()
    }

    /// Set a line's quantity in the server-side cart.
    #[instrument(skip(self), fields(product_id = %product_id, quantity))]
    pub async fn cart_update_quantity(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Envelope<()> {
        self.send_ack(
            self.request(Method::PATCH, "/cart/update-quantity")
                .json(&json!({ "productId": product_id, "quantity": quantity })),
        )
        .await
        .into()
    }

    /// Clear the server-side cart.
    #[instrument(skip(self))]
    pub async fn cart_clear(&self) -> Envelope<()> {
        self.send_ack(self.request(Method::DELETE, "/cart/clear"))
            .await
            .into()
    }
}

/// Attach an image to a multipart form, as a text part (remote URL) or a
/// file part (raw bytes).
fn attach_image(form: Form, image: Option<ImageSource>) -> Result<Form, GatewayError> {
    match image {
        None => Ok(form),
        Some(ImageSource::Url(url)) => Ok(form.text("image", url)),
        Some(ImageSource::Bytes {
            file_name,
            content,
            content_type,
        }) => {
            let mut part = Part::bytes(content).file_name(file_name);
            if let Some(mime) = content_type {
                part = part.mime_str(&mime)?;
            }
            Ok(form.part("image", part))
        }
    }
}

/// Pull a human-readable message out of a failure body: a JSON
/// `{ message }` field when present, otherwise a truncated excerpt.
fn failure_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| excerpt(body))
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_LEN).collect()
}
