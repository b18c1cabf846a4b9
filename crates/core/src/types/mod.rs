//! Core types for Fernway.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod item;
pub mod session;

pub use cart::CartState;
pub use id::*;
pub use item::{
    CartItem, CartItemInput, FALLBACK_CATEGORY, FALLBACK_UNIT_PRICE, ItemValidationError,
    MAX_QUANTITY, MIN_QUANTITY, clamp_quantity, sanitize_price,
};
pub use session::{ActorSession, SessionUser};
