//! In-memory cart state.
//!
//! [`CartState`] is the full set of [`CartItem`]s for the current actor.
//! Invariant: at most one item per distinct [`ItemId`]. Serialized form is a
//! bare array so the local record matches the wire shape consumers expect.

use serde::{Deserialize, Serialize};

use super::id::{ItemId, RowId};
use super::item::CartItem;

/// The full cart contents for the current actor.
///
/// Insertion order is preserved for display purposes. All mutation goes
/// through the methods below, which uphold the one-item-per-id invariant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartState {
    items: Vec<CartItem>,
}

impl CartState {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart from items, keeping the first occurrence of each id.
    #[must_use]
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let mut state = Self::new();
        for item in items {
            if !state.contains(item.item_id) {
                state.items.push(item);
            }
        }
        state
    }

    /// All items, in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Look up an item by id.
    #[must_use]
    pub fn get(&self, item_id: ItemId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.item_id == item_id)
    }

    /// Membership test.
    #[must_use]
    pub fn contains(&self, item_id: ItemId) -> bool {
        self.get(item_id).is_some()
    }

    /// Number of distinct items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cart holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of quantities across all items.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Sum of `unit_price * quantity` in minor units. Never negative: prices
    /// are sanitized non-negative on the way in.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Insert a new item, or increment the existing one with the same id
    /// (capped). Returns the item's resulting quantity.
    pub fn insert_or_increment(&mut self, item: CartItem) -> u32 {
        if let Some(existing) = self.get_mut(item.item_id) {
            existing.increment();
            return existing.quantity;
        }
        let quantity = item.quantity;
        self.items.push(item);
        quantity
    }

    /// Set an item's quantity to a clamped value. Returns `false` when the
    /// item is not present.
    pub fn set_quantity(&mut self, item_id: ItemId, requested: i64) -> bool {
        self.get_mut(item_id).is_some_and(|item| {
            item.set_quantity(requested);
            true
        })
    }

    /// Remove an item, returning it when it was present.
    pub fn remove(&mut self, item_id: ItemId) -> Option<CartItem> {
        let index = self.items.iter().position(|i| i.item_id == item_id)?;
        Some(self.items.remove(index))
    }

    /// Remove all items.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Attach a durable row id to an item, once the remote store has minted
    /// one. No-op when the item has since been removed.
    pub fn attach_row_id(&mut self, item_id: ItemId, row_id: RowId) {
        if let Some(item) = self.get_mut(item_id) {
            item.remote_row_id = Some(row_id);
        }
    }

    fn get_mut(&mut self, item_id: ItemId) -> Option<&mut CartItem> {
        self.items.iter_mut().find(|i| i.item_id == item_id)
    }
}

impl IntoIterator for CartState {
    type Item = CartItem;
    type IntoIter = std::vec::IntoIter<CartItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
