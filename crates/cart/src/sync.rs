//! Guest-to-user cart merge at login.
//!
//! Runs exactly once per guest-to-authenticated transition (the Cart Manager
//! edge-triggers it from `apply_session`). Overlapping items sum quantities,
//! capped; items the remote store rejects are skipped rather than aborting
//! the whole merge — a partial merge beats losing the login.

use tracing::{info, instrument, warn};

use fernway_core::{CartItem, CartState, MAX_QUANTITY, RowId, UserId};

use crate::local::LocalCartStore;
use crate::remote::{NewCartRow, RemoteCartStore, RemoteError};

/// Result of a merge.
#[derive(Debug)]
pub struct MergeOutcome {
    /// Canonical cart state after the merge (remote reload, or the merged
    /// view assembled locally when the reload itself failed).
    pub state: CartState,
    /// Items merged into the remote cart.
    pub merged: usize,
    /// Items skipped on remote failure; these stay in the local record and
    /// remain visible in `state`.
    pub skipped: usize,
    /// Whether the local cart record was deleted.
    pub local_cleared: bool,
}

/// Merges a guest cart into a user's remote cart.
pub struct SyncEngine<'a, R, L> {
    remote: &'a R,
    local: &'a L,
}

impl<'a, R: RemoteCartStore, L: LocalCartStore> SyncEngine<'a, R, L> {
    /// Create a sync engine over the two stores.
    #[must_use]
    pub const fn new(remote: &'a R, local: &'a L) -> Self {
        Self { remote, local }
    }

    /// Merge `guest_cart` into the remote cart for `user`.
    ///
    /// Per item: an existing `(user, item)` row gets
    /// `min(existing + local, 99)`; a missing one is inserted with the local
    /// item's full attributes and quantity. Items failing with a
    /// [`RemoteError`] are skipped and kept in the local record; the record
    /// is deleted only when every item merged cleanly. Canonical state is
    /// reloaded from the remote store afterwards, with skipped items overlaid
    /// so they stay visible to the user.
    #[instrument(skip(self, guest_cart), fields(user_id = %user, items = guest_cart.len()))]
    pub async fn merge(&self, user: UserId, guest_cart: CartState) -> MergeOutcome {
        // Optimistic merged view, used when the final reload fails.
        let mut merged_view = guest_cart.clone();
        let mut skipped_items: Vec<CartItem> = Vec::new();
        let mut merged = 0usize;

        for item in guest_cart.items() {
            match self.merge_item(user, item).await {
                Ok((row_id, combined)) => {
                    merged += 1;
                    merged_view.set_quantity(item.item_id, i64::from(combined));
                    merged_view.attach_row_id(item.item_id, row_id);
                }
                Err(e) => {
                    skipped_items.push(item.clone());
                    warn!(item_id = %item.item_id, error = %e, "skipping item during cart merge");
                }
            }
        }
        let skipped = skipped_items.len();

        // The guest cart is only fully represented remotely when nothing was
        // skipped; keep the record otherwise so the unmerged items survive.
        let local_cleared = skipped == 0;
        if local_cleared {
            self.local.clear();
        }

        let state = match self.remote.fetch_all(user).await {
            Ok(rows) => {
                // Skipped items ride along with the reloaded rows; on an id
                // collision the remote row wins.
                let mut items: Vec<CartItem> = rows.into_iter().map(CartItem::from).collect();
                items.extend(skipped_items);
                CartState::from_items(items)
            }
            Err(e) => {
                warn!(error = %e, "reload after merge failed, keeping merged view");
                merged_view
            }
        };

        info!(merged, skipped, local_cleared, "guest cart merge finished");

        MergeOutcome {
            state,
            merged,
            skipped,
            local_cleared,
        }
    }

    /// Merge a single item, returning its durable row id and resulting
    /// remote quantity.
    async fn merge_item(&self, user: UserId, item: &CartItem) -> Result<(RowId, u32), RemoteError> {
        match self.remote.find_row(user, item.item_id).await? {
            Some(existing) => {
                let combined = existing
                    .quantity_clamped()
                    .saturating_add(item.quantity)
                    .min(MAX_QUANTITY);
                self.remote.set_quantity(user, existing.id, combined).await?;
                Ok((existing.id, combined))
            }
            None => {
                let row = NewCartRow::from_item(user, item);
                let row_id = self.remote.insert_row(&row).await?;
                Ok((row_id, item.quantity))
            }
        }
    }
}
