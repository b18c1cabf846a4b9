//! Cart item model, quantity clamp rules, and input defaulting.
//!
//! A [`CartItem`] is the unit of cart content. Items arrive from the UI as a
//! loosely-typed [`CartItemInput`] (display fields optional, price possibly
//! missing); validation and defaulting happen exactly once, in
//! [`CartItem::from_input`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::{ItemId, RowId};

/// Minimum quantity a cart item can hold.
pub const MIN_QUANTITY: u32 = 1;

/// Maximum quantity a cart item can hold.
pub const MAX_QUANTITY: u32 = 99;

/// Category shown when an item carries none.
pub const FALLBACK_CATEGORY: &str = "General";

/// Unit price (minor units) used when an item's price is absent or invalid.
pub const FALLBACK_UNIT_PRICE: i64 = 2500;

/// Clamp a requested quantity into the valid `[MIN_QUANTITY, MAX_QUANTITY]`
/// range.
///
/// Callers treat requests below 1 as removal before clamping; this function
/// only answers "what quantity does a surviving item get".
#[must_use]
pub fn clamp_quantity(requested: i64) -> u32 {
    let capped = requested.clamp(i64::from(MIN_QUANTITY), i64::from(MAX_QUANTITY));
    // Range is 1..=99, conversion cannot fail.
    u32::try_from(capped).unwrap_or(MIN_QUANTITY)
}

/// Error validating a [`CartItemInput`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ItemValidationError {
    /// The input carried no item identity.
    #[error("cart item input is missing an item id")]
    MissingItemId,
}

/// Loosely-typed cart item as submitted by UI surfaces.
///
/// Everything except the item identity is optional; absent fields fall back
/// to the defaults in [`CartItem::from_input`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartItemInput {
    /// Identity of the underlying service/product.
    pub item_id: Option<ItemId>,
    /// Display title.
    pub title: Option<String>,
    /// Display category.
    pub category: Option<String>,
    /// Display description.
    pub description: Option<String>,
    /// Service/SKU number, when the catalog carries one.
    pub number: Option<String>,
    /// Unit price in minor units.
    pub unit_price: Option<i64>,
}

impl CartItemInput {
    /// Convenience constructor for an input with just an identity.
    #[must_use]
    pub const fn with_id(item_id: ItemId) -> Self {
        Self {
            item_id: Some(item_id),
            title: None,
            category: None,
            description: None,
            number: None,
            unit_price: None,
        }
    }
}

/// The unit of cart content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Identity of the underlying service/product. Stable across stores.
    pub item_id: ItemId,
    /// Display title.
    pub title: String,
    /// Display category (defaulted to [`FALLBACK_CATEGORY`]).
    pub category: String,
    /// Display description (defaulted to empty).
    pub description: String,
    /// Service/SKU number, carried through to the remote row.
    pub number: Option<String>,
    /// Unit price in minor units, non-negative.
    pub unit_price: i64,
    /// Quantity, always within `[MIN_QUANTITY, MAX_QUANTITY]`.
    pub quantity: u32,
    /// Durable row backing this item. Present only when remote-backed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_row_id: Option<RowId>,
}

impl CartItem {
    /// Validate an input and build a cart item at quantity 1, applying the
    /// defaulting rules for display fields and price.
    ///
    /// # Errors
    ///
    /// Returns [`ItemValidationError::MissingItemId`] when the input carries
    /// no item identity.
    pub fn from_input(input: CartItemInput) -> Result<Self, ItemValidationError> {
        let item_id = input.item_id.ok_or(ItemValidationError::MissingItemId)?;

        Ok(Self {
            item_id,
            title: input.title.unwrap_or_default(),
            category: input
                .category
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| FALLBACK_CATEGORY.to_owned()),
            description: input.description.unwrap_or_default(),
            number: input.number,
            unit_price: sanitize_price(input.unit_price),
            quantity: MIN_QUANTITY,
            remote_row_id: None,
        })
    }

    /// Increment quantity by one, capped at [`MAX_QUANTITY`].
    pub fn increment(&mut self) {
        self.quantity = (self.quantity + 1).min(MAX_QUANTITY);
    }

    /// Set quantity to a clamped value.
    pub fn set_quantity(&mut self, requested: i64) {
        self.quantity = clamp_quantity(requested);
    }

    /// Line total in minor units.
    #[must_use]
    pub const fn line_total(&self) -> i64 {
        self.unit_price * self.quantity as i64
    }
}

/// Apply the fallback price rule: absent or negative prices become
/// [`FALLBACK_UNIT_PRICE`]. The single invalid-price policy for every path
/// an item enters the cart through, UI input and remote rows alike.
#[must_use]
pub fn sanitize_price(price: Option<i64>) -> i64 {
    match price {
        Some(p) if p >= 0 => p,
        _ => FALLBACK_UNIT_PRICE,
    }
}
