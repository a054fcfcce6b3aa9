//! Coarse-grained session role.

use serde::{Deserialize, Serialize};

/// Role derived from the session's bearer token.
///
/// Anything that is not positively recognized as an elevated role is
/// `Unspecified` - ambiguous or malformed claims never grant `Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// No recognized elevated role.
    #[default]
    Unspecified,
    /// Elevated role: may manage the product catalog.
    Admin,
}

impl Role {
    /// Whether this role grants catalog-management capability.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}
