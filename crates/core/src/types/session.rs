//! Session-related types.
//!
//! The cart subsystem only needs to know who the current actor is; how they
//! authenticated is someone else's problem.

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Stored identity of an authenticated user.
///
/// Minimal data persisted in the session record; absence of a record means
/// the actor is a guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// User's durable identity in the remote store.
    pub id: UserId,
    /// User's email address, when the identity store recorded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name, when the identity store recorded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl SessionUser {
    /// Create a session user with just an identity.
    #[must_use]
    pub const fn new(id: UserId) -> Self {
        Self {
            id,
            email: None,
            display_name: None,
        }
    }
}

/// The current actor, as seen by the cart subsystem.
///
/// A guest's cart lives only on the local device; an authenticated user's
/// cart lives in the remote store, keyed by their identity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActorSession {
    /// No durable identity; cart is local-only.
    #[default]
    Guest,
    /// Identity known; cart is remote-backed.
    Authenticated(SessionUser),
}

impl ActorSession {
    /// The authenticated user's id, when there is one.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Guest => None,
            Self::Authenticated(user) => Some(user.id),
        }
    }

    /// Whether the actor is authenticated.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}
