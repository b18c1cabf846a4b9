//! Cart subsystem error type.
//!
//! Only errors the caller can act on surface here. Remote store failures are
//! deliberately absent: they are absorbed by the manager's local fallback and
//! reported through `tracing`, because losing a cart is judged worse than
//! transient inconsistency with the backend.

use thiserror::Error;

use fernway_core::ItemValidationError;

/// Errors surfaced by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Malformed input, e.g. an add with no item identity. The operation was
    /// a no-op.
    #[error("invalid item: {0}")]
    InvalidItem(#[from] ItemValidationError),

    /// The manager has not been initialized with a session yet.
    #[error("cart manager is not initialized")]
    Uninitialized,
}
