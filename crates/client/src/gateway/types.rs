//! Domain and wire types for the storefront REST API.
//!
//! The backend is partially unreliable by design, so response shapes are
//! normalized here: product lists may arrive bare or wrapped in an
//! envelope object, images may live under an `imageUrl` alias, and the
//! login response nests user and token in several possible layouts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use vitrine_core::{Price, ProductId};

use crate::session::{Session, extract_token};

/// Image shown when the backend provides none.
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg";

// =============================================================================
// Products
// =============================================================================

/// A catalog product. The server is the source of truth; local copies
/// are a cache reconciled on fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Server-assigned product id.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Long description.
    #[serde(default)]
    pub description: String,
    /// Unit price.
    pub price: Price,
    /// Image URI.
    #[serde(default)]
    pub image: String,
    /// Optional category label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Units in stock, when the backend reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    /// Creation timestamp, when the backend reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Payload for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub category: Option<String>,
    pub stock: Option<u32>,
    pub image: Option<ImageSource>,
}

/// Partial payload for updating a product. `None` fields are left
/// untouched server-side.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub category: Option<String>,
    pub stock: Option<u32>,
    pub image: Option<ImageSource>,
}

impl ProductPatch {
    /// Apply this patch to a local product copy.
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name.clone_from(name);
        }
        if let Some(description) = &self.description {
            product.description.clone_from(description);
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(category) = &self.category {
            product.category = Some(category.clone());
        }
        if let Some(stock) = self.stock {
            product.stock = Some(stock);
        }
        if let Some(ImageSource::Url(url)) = &self.image {
            product.image.clone_from(url);
        }
    }
}

/// Product image payload: either a reference to a remote image or raw
/// binary content. The gateway encodes both as multipart form content so
/// callers never branch on transport encoding.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Remote image reference.
    Url(String),
    /// Raw image content uploaded as a file part.
    Bytes {
        file_name: String,
        content: Vec<u8>,
        content_type: Option<String>,
    },
}

/// Query parameters for the product list endpoint.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    /// Server-side name filter.
    pub name: Option<String>,
    /// One-based page index.
    pub page: Option<u32>,
    /// Page size.
    pub limit: Option<u32>,
}

// Wire shape: a product as the backend sends it, with the `imageUrl`
// alias the older backend used.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireProduct {
    id: Value,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    price: Option<Price>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    stock: Option<u32>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl WireProduct {
    /// Normalize into the domain [`Product`]: `image` wins over the
    /// `imageUrl` alias, missing display fields get safe defaults.
    pub(crate) fn normalize(self) -> Product {
        Product {
            id: ProductId::new(id_to_string(&self.id)),
            name: self.name.unwrap_or_else(|| "Unknown Product".to_owned()),
            description: self.description.unwrap_or_default(),
            price: self.price.unwrap_or(Price::ZERO),
            image: self
                .image
                .or(self.image_url)
                .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_owned()),
            category: self.category,
            stock: self.stock,
            created_at: self.created_at,
        }
    }
}

// Wire shape: the list endpoint returns either a bare array or an
// envelope object containing one.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireProductList {
    Bare(Vec<WireProduct>),
    Envelope { products: Vec<WireProduct> },
}

impl WireProductList {
    pub(crate) fn normalize(self) -> Vec<Product> {
        let items = match self {
            Self::Bare(items) | Self::Envelope { products: items } => items,
        };
        items.into_iter().map(WireProduct::normalize).collect()
    }
}

// =============================================================================
// Cart
// =============================================================================

/// One line of the cart.
///
/// Display fields are copied from the product at add-time; the line keeps
/// functioning even if the product is later removed server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Product this line refers to (weak reference).
    pub product_id: ProductId,
    /// Display name copied at add-time.
    pub name: String,
    /// Unit price copied at add-time.
    pub price: Price,
    /// Image URI copied at add-time.
    pub image: String,
    /// Always >= 1 while the line exists.
    pub quantity: u32,
}

impl CartLine {
    /// Price times quantity for this line.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.price.times(self.quantity)
    }
}

// Wire shape: `GET /cart` returns `{ items: [{ product, quantity }] }`.
#[derive(Debug, Deserialize)]
pub(crate) struct WireCart {
    #[serde(default)]
    items: Vec<WireCartItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireCartItem {
    #[serde(default)]
    product: Option<WireProduct>,
    #[serde(default)]
    product_id: Option<Value>,
    #[serde(default)]
    quantity: Option<u32>,
}

impl WireCart {
    /// Normalize into cart lines, dropping items with no usable product
    /// reference or a zero quantity.
    pub(crate) fn normalize(self) -> Vec<CartLine> {
        self.items
            .into_iter()
            .filter_map(|item| {
                let quantity = item.quantity.unwrap_or(1).max(1);
                match (item.product, item.product_id) {
                    // Cart display resolves the `imageUrl` alias first;
                    // the catalog path is the reverse (see
                    // [`WireProduct::normalize`]).
                    (Some(product), _) => Some(CartLine {
                        product_id: ProductId::new(id_to_string(&product.id)),
                        name: product
                            .name
                            .unwrap_or_else(|| "Unknown Product".to_owned()),
                        price: product.price.unwrap_or(Price::ZERO),
                        image: product
                            .image_url
                            .or(product.image)
                            .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_owned()),
                        quantity,
                    }),
                    (None, Some(id)) => Some(CartLine {
                        product_id: ProductId::new(id_to_string(&id)),
                        name: "Unknown Product".to_owned(),
                        price: Price::ZERO,
                        image: PLACEHOLDER_IMAGE.to_owned(),
                        quantity,
                    }),
                    (None, None) => None,
                }
            })
            .collect()
    }
}

// =============================================================================
// Auth
// =============================================================================

/// Registration payload.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub cpf: String,
}

/// Extract a [`Session`] from a login (or registration) response.
///
/// The backend has shipped several layouts: `{ user, token }`,
/// `{ user: { ..., token } }`, `{ data: { user, token } }`, and flat
/// user fields at the root. The token is located with the same
/// credential search used for persisted blobs; user fields are read from
/// the first object that carries an id.
#[must_use]
pub fn extract_session(body: &Value) -> Option<Session> {
    let token = extract_token(body)?;

    let user = ["/user", "/data/user", "/state/user"]
        .iter()
        .find_map(|pointer| body.pointer(pointer).filter(|u| u.get("id").is_some()))
        .or_else(|| body.get("id").map(|_| body))?;

    Some(Session {
        id: vitrine_core::UserId::new(id_to_string(user.get("id")?)),
        name: string_field(user, "name"),
        email: string_field(user, "email"),
        cpf: string_field(user, "cpf"),
        phone: string_field(user, "phone"),
        token,
    })
}

fn string_field(obj: &Value, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

/// Backend ids arrive as strings or numbers; normalize to a string.
fn id_to_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    fn token() -> String {
        let seg = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        format!("{seg}.{seg}.sig")
    }

    #[test]
    fn test_product_list_bare_and_envelope_normalize_identically() {
        let bare = json!([
            { "id": "p1", "name": "Widget", "price": 10.5, "imageUrl": "/w.png" }
        ]);
        let envelope = json!({ "products": [
            { "id": "p1", "name": "Widget", "price": 10.5, "imageUrl": "/w.png" }
        ]});

        let from_bare: Vec<Product> =
            serde_json::from_value::<WireProductList>(bare).unwrap().normalize();
        let from_env: Vec<Product> =
            serde_json::from_value::<WireProductList>(envelope).unwrap().normalize();

        assert_eq!(from_bare.len(), 1);
        assert_eq!(from_env.len(), 1);
        let (a, b) = (&from_bare[0], &from_env[0]);
        assert_eq!(a.id, b.id);
        // imageUrl alias populated the image field in both.
        assert_eq!(a.image, "/w.png");
        assert_eq!(b.image, "/w.png");
    }

    #[test]
    fn test_product_image_field_wins_over_alias() {
        let wire: WireProduct = serde_json::from_value(json!({
            "id": 7, "name": "X", "price": "3.00",
            "image": "/primary.png", "imageUrl": "/alias.png"
        }))
        .unwrap();
        let product = wire.normalize();
        assert_eq!(product.id.as_str(), "7");
        assert_eq!(product.image, "/primary.png");
    }

    #[test]
    fn test_product_missing_image_gets_placeholder() {
        let wire: WireProduct =
            serde_json::from_value(json!({ "id": "p2", "name": "Y", "price": 1 })).unwrap();
        assert_eq!(wire.normalize().image, PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_cart_normalization() {
        let wire: WireCart = serde_json::from_value(json!({
            "items": [
                { "product": { "id": "p1", "name": "W", "price": 10, "imageUrl": "/w.png" },
                  "quantity": 2 },
                { "productId": "p2" },
                { "quantity": 3 }
            ]
        }))
        .unwrap();
        let lines = wire.normalize();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].product_id.as_str(), "p1");
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(lines[0].image, "/w.png");
        // Bare product reference falls back to display defaults.
        assert_eq!(lines[1].product_id.as_str(), "p2");
        assert_eq!(lines[1].quantity, 1);
        assert_eq!(lines[1].name, "Unknown Product");
    }

    #[test]
    fn test_cart_prefers_image_url_alias_over_image() {
        // The server-side cart keeps the alias fresher than the copied
        // image field, so the alias wins in the cart path.
        let wire: WireCart = serde_json::from_value(json!({
            "items": [
                { "product": { "id": "p1", "name": "W", "price": 10,
                               "image": "/stale.png", "imageUrl": "/fresh.png" },
                  "quantity": 1 }
            ]
        }))
        .unwrap();
        assert_eq!(wire.normalize()[0].image, "/fresh.png");

        // The catalog path is unchanged: `image` still wins there.
        let wire: WireProduct = serde_json::from_value(json!({
            "id": "p1", "price": 10,
            "image": "/stale.png", "imageUrl": "/fresh.png"
        }))
        .unwrap();
        assert_eq!(wire.normalize().image, "/stale.png");
    }

    #[test]
    fn test_extract_session_layouts() {
        let t = token();
        let layouts = [
            json!({ "user": { "id": "u1", "name": "Ana", "email": "a@b.c" }, "token": t }),
            json!({ "user": { "id": "u1", "name": "Ana", "email": "a@b.c", "token": t } }),
            json!({ "data": { "user": { "id": "u1", "name": "Ana", "email": "a@b.c" }, "token": t } }),
            json!({ "id": "u1", "name": "Ana", "email": "a@b.c", "token": t }),
        ];
        for body in &layouts {
            let session = extract_session(body).unwrap();
            assert_eq!(session.id.as_str(), "u1");
            assert_eq!(session.token, t);
            assert_eq!(session.email, "a@b.c");
        }
    }

    #[test]
    fn test_extract_session_numeric_id_and_missing_token() {
        let t = token();
        let session =
            extract_session(&json!({ "user": { "id": 42, "email": "a@b.c" }, "token": t }))
                .unwrap();
        assert_eq!(session.id.as_str(), "42");

        // No credential-shaped token anywhere: no session.
        assert!(extract_session(&json!({ "user": { "id": 1 }, "token": "nope" })).is_none());
    }

    #[test]
    fn test_patch_apply() {
        let mut product = Product {
            id: ProductId::new("p1"),
            name: "Old".to_owned(),
            description: "d".to_owned(),
            price: Price::ZERO,
            image: "/old.png".to_owned(),
            category: None,
            stock: None,
            created_at: None,
        };
        let patch = ProductPatch {
            name: Some("New".to_owned()),
            price: Some(Price::new("5".parse().unwrap())),
            image: Some(ImageSource::Url("/new.png".to_owned())),
            ..ProductPatch::default()
        };
        patch.apply_to(&mut product);
        assert_eq!(product.name, "New");
        assert_eq!(product.image, "/new.png");
        assert_eq!(product.description, "d");
    }
}
