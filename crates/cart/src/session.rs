//! Session resolution.
//!
//! Determines whether the current actor is a guest or an authenticated user
//! by reading the session record the identity layer leaves in local storage.
//! Resolution can never fail: any read problem resolves to guest. The host
//! re-invokes [`SessionResolver::resolve`] on external change notifications
//! (e.g. a cross-tab storage event) and hands the verdict to
//! `CartManager::apply_session`, which owns the reload side effects.

use tracing::debug;

use fernway_core::ActorSession;

use crate::local::JsonFileStore;

/// Resolves the current actor from the stored session record.
#[derive(Debug, Clone)]
pub struct SessionResolver {
    store: JsonFileStore,
}

impl SessionResolver {
    /// Create a resolver over the local record store.
    #[must_use]
    pub const fn new(store: JsonFileStore) -> Self {
        Self { store }
    }

    /// Resolve the current actor.
    ///
    /// Absent, unreadable, or malformed session records all resolve to
    /// [`ActorSession::Guest`]; this never errors.
    #[must_use]
    pub fn resolve(&self) -> ActorSession {
        match self.store.read_session() {
            Some(user) => {
                debug!(user_id = %user.id, "resolved authenticated session");
                ActorSession::Authenticated(user)
            }
            None => ActorSession::Guest,
        }
    }
}
