//! Auth store.
//!
//! Exclusively owns the persisted session blob. A session is created on
//! successful login (or registration when the backend answers with one),
//! persisted across restarts, and destroyed on logout or when an expired
//! token is detected at hydration time.
//!
//! Auth failures are surfaced to the caller; there is no local fallback
//! for authentication.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::gateway::{ApiClient, NewUser};
use crate::persist::{SnapshotStore, keys, unwrap_state, versioned};
use crate::session::{Session, is_token_expired};
use crate::stores::{CartStore, Outcome};

/// Local persisted auth session.
pub struct AuthStore {
    client: ApiClient,
    snapshots: Arc<dyn SnapshotStore>,
    user: Option<Session>,
    loading: bool,
    error: Option<String>,
}

impl AuthStore {
    /// Create an auth store, hydrating from the persisted session.
    ///
    /// A persisted session whose token has expired is dropped and its
    /// blob removed - the user must log in again.
    #[must_use]
    pub fn new(client: ApiClient, snapshots: Arc<dyn SnapshotStore>) -> Self {
        let user = hydrate(snapshots.as_ref());
        Self {
            client,
            snapshots,
            user,
            loading: false,
            error: None,
        }
    }

    /// The logged-in user's session, if any.
    #[must_use]
    pub const fn current_user(&self) -> Option<&Session> {
        self.user.as_ref()
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

    /// Whether a non-expired bearer token is persisted.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.client.tokens().is_authenticated()
    }

    /// Whether the persisted token carries a recognized admin indicator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.client.tokens().is_admin()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Log in with email and password, persisting the session on success.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&mut self, email: &str, password: &str) -> Outcome {
        self.begin();
        let envelope = self.client.login(email, password).await;
        self.loading = false;

        match envelope.data {
            Some(session) if envelope.success => {
                self.set_session(session);
                Outcome::ok("Login successful")
            }
            _ => self.fail(envelope.message),
        }
    }

    /// Register a new user.
    ///
    /// When the backend answers with a session, the user is logged in
    /// immediately; otherwise the caller should follow up with
    /// [`Self::login`].
    #[instrument(skip(self, user), fields(email = %user.email))]
    pub async fn register(&mut self, user: &NewUser) -> Outcome {
        self.begin();
        let envelope = self.client.register(user).await;
        self.loading = false;

        if !envelope.success {
            return self.fail(envelope.message);
        }

        if let Some(session) = envelope.data.flatten() {
            self.set_session(session);
        }
        Outcome::ok("Registration successful")
    }

    /// Log out: destroy the session and empty the cart.
    ///
    /// The cart is passed in explicitly - stores do not reach into each
    /// other through ambient state.
    #[instrument(skip(self, cart))]
    pub fn logout(&mut self, cart: &mut CartStore) {
        self.user = None;
        self.error = None;
        if let Err(e) = self.snapshots.remove(keys::AUTH) {
            warn!(error = %e, "failed to remove persisted session");
        }
        cart.clear_cart();
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

    fn set_session(&mut self, session: Session) {
        let blob = versioned(json!({ "user": session }));
        if let Err(e) = self.snapshots.save(keys::AUTH, &blob) {
            warn!(error = %e, "failed to persist session");
        }
        self.user = Some(session);
    }
}

fn hydrate(snapshots: &dyn SnapshotStore) -> Option<Session> {
    let blob = snapshots.load(keys::AUTH).ok().flatten()?;
    let user = unwrap_state(&blob).get("user")?;
    let session: Session = match serde_json::from_value(user.clone()) {
        Ok(session) => session,
        Err(e) => {
            debug!(error = %e, "persisted session unreadable, ignoring");
            return None;
        }
    };

    if is_token_expired(&session.token) {
        debug!("persisted session expired, removing");
        let _ = snapshots.remove(keys::AUTH);
        return None;
    }
    Some(session)
}
