//! Session and bearer-token handling.
//!
//! The auth session is persisted as a named blob (see
//! [`persist::keys::AUTH`]) whose schema has drifted across client
//! versions. Token extraction therefore runs an ordered chain of shape
//! matchers over the blob - each tolerated layout is explicit and
//! individually testable - with a bounded deep scan as the last resort.
//!
//! All decode failures are absorbed into safe defaults (`None` / `false`).
//! Admin capability is fail-closed: an unrecognized or undecodable
//! payload never grants it.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use vitrine_core::{Role, UserId};

use crate::persist::{SnapshotStore, keys};

/// Maximum nesting depth for the deep token scan.
const DEEP_SCAN_DEPTH: usize = 8;

/// The authenticated user's session, as persisted in the auth blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Server-assigned user id.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Brazilian taxpayer number.
    #[serde(default)]
    pub cpf: String,
    /// Phone number.
    #[serde(default)]
    pub phone: String,
    /// Opaque bearer token.
    pub token: String,
}

impl Session {
    /// Coarse role derived from the bearer token's claims.
    #[must_use]
    pub fn role(&self) -> Role {
        if is_admin_token(&self.token) {
            Role::Admin
        } else {
            Role::Unspecified
        }
    }
}

// =============================================================================
// Token shape matchers
// =============================================================================

/// One tolerated layout of the persisted session blob.
struct ShapeMatcher {
    /// JSON pointer description, for logging.
    name: &'static str,
    /// Extract a candidate token string from the blob.
    extract: fn(&Value) -> Option<&str>,
}

/// Ordered chain of tolerated session-blob layouts.
///
/// Tried in order; the first *credential-shaped* match wins. The chain
/// covers the current layout first, then the shapes older client
/// versions persisted.
const SHAPE_MATCHERS: &[ShapeMatcher] = &[
    ShapeMatcher {
        name: "state.user.token",
        extract: |v| v.pointer("/state/user/token").and_then(Value::as_str),
    },
    ShapeMatcher {
        name: "user.token",
        extract: |v| v.pointer("/user/token").and_then(Value::as_str),
    },
    ShapeMatcher {
        name: "state.token",
        extract: |v| v.pointer("/state/token").and_then(Value::as_str),
    },
    ShapeMatcher {
        name: "token",
        extract: |v| v.get("token").and_then(Value::as_str),
    },
];

/// Extract a bearer token from a persisted session blob.
///
/// Runs the matcher chain, then falls back to a bounded depth-first scan
/// for any credential-shaped string. Returns `None` when nothing
/// plausible is found.
#[must_use]
pub fn extract_token(blob: &Value) -> Option<String> {
    for matcher in SHAPE_MATCHERS {
        if let Some(candidate) = (matcher.extract)(blob)
            && is_credential_shaped(candidate)
        {
            tracing::debug!(shape = matcher.name, "token matched session shape");
            return Some(candidate.to_owned());
        }
    }

    // Schema drift fallback: scan nested fields for anything
    // credential-shaped.
    let found = deep_scan(blob, DEEP_SCAN_DEPTH);
    if found.is_some() {
        tracing::debug!("token found by deep scan of session blob");
    }
    found
}

fn deep_scan(value: &Value, depth: usize) -> Option<String> {
    if depth == 0 {
        return None;
    }
    match value {
        Value::String(s) if is_credential_shaped(s) => Some(s.clone()),
        Value::Object(map) => map.values().find_map(|v| deep_scan(v, depth - 1)),
        Value::Array(items) => items.iter().find_map(|v| deep_scan(v, depth - 1)),
        _ => None,
    }
}

/// Whether a string looks like a bearer credential: three dot-delimited
/// segments whose first segment decodes to valid JSON.
#[must_use]
pub fn is_credential_shaped(candidate: &str) -> bool {
    let segments: Vec<&str> = candidate.split('.').collect();
    if segments.len() != 3 {
        return false;
    }
    segments
        .first()
        .is_some_and(|header| decode_json_segment(header).is_some())
}

// =============================================================================
// Claim inspection (pure, fail-closed)
// =============================================================================

/// Decode a token's payload (middle segment) as JSON claims.
///
/// Returns `None` for anything that is not a three-segment token with a
/// JSON payload.
#[must_use]
pub fn decode_claims(token: &str) -> Option<Value> {
    let payload = token.split('.').nth(1)?;
    if token.split('.').count() != 3 {
        return None;
    }
    decode_json_segment(payload)
}

/// Whether a token's `exp` claim (seconds since epoch) is in the past.
///
/// A missing `exp` claim means the token never expires. Decode failure is
/// treated as expired (fail-closed).
#[must_use]
pub fn is_token_expired(token: &str) -> bool {
    let Some(claims) = decode_claims(token) else {
        return true;
    };
    match claims.get("exp").and_then(Value::as_i64) {
        Some(exp) => exp <= chrono::Utc::now().timestamp(),
        None => false,
    }
}

/// Whether a token's claims indicate an elevated role.
///
/// Recognized shapes: `role: "admin"` (case-insensitive), a `roles` list
/// containing `"admin"`, or a boolean `isAdmin` / `admin` flag. Anything
/// else - including an undecodable token - is not admin.
#[must_use]
pub fn is_admin_token(token: &str) -> bool {
    let Some(claims) = decode_claims(token) else {
        return false;
    };

    if claims
        .get("role")
        .and_then(Value::as_str)
        .is_some_and(|role| role.eq_ignore_ascii_case("admin"))
    {
        return true;
    }

    if claims
        .get("roles")
        .and_then(Value::as_array)
        .is_some_and(|roles| roles.iter().any(|r| r.as_str() == Some("admin")))
    {
        return true;
    }

    claims.get("isAdmin").and_then(Value::as_bool) == Some(true)
        || claims.get("admin").and_then(Value::as_bool) == Some(true)
}

/// Base64url-decode a token segment and parse it as JSON.
///
/// Tolerates padded input and the standard alphabet, since older backends
/// were not consistent about the encoding.
fn decode_json_segment(segment: &str) -> Option<Value> {
    let trimmed = segment.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

// =============================================================================
// TokenStore
// =============================================================================

/// Read-only view of the persisted session's bearer credential.
///
/// The session blob is exclusively owned by the auth store; this type
/// only reads it.
#[derive(Clone)]
pub struct TokenStore {
    snapshots: Arc<dyn SnapshotStore>,
}

impl TokenStore {
    /// Create a token store reading from the given snapshot store.
    #[must_use]
    pub fn new(snapshots: Arc<dyn SnapshotStore>) -> Self {
        Self { snapshots }
    }

    /// The current bearer token, if a plausible one is persisted.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        let blob = self.snapshots.load(keys::AUTH).ok().flatten()?;
        extract_token(&blob)
    }

    /// Whether a non-expired token is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some_and(|token| !is_token_expired(&token))
    }

    /// Whether the current token carries a recognized admin indicator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.token().is_some_and(|token| is_admin_token(&token))
    }
}
