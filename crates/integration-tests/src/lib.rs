//! Integration test support for Fernway.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p fernway-integration-tests
//! ```
//!
//! The scenarios exercise the whole cart subsystem end to end: the real
//! on-disk [`JsonFileStore`](fernway_cart::JsonFileStore) under a temp
//! directory, and [`MemoryRemoteStore`] standing in for the managed backend
//! so tests can flip it into failure modes no live backend offers on demand.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use uuid::Uuid;

use fernway_cart::{CartRow, NewCartRow, RemoteCartStore, RemoteError};
use fernway_core::{ItemId, RowId, UserId};

/// In-memory stand-in for the managed backend's cart table.
///
/// Cheaply cloneable; all clones share one row set. `fail_everything` makes
/// every subsequent operation raise a `RemoteError`, `fail_item` poisons a
/// single item id to drive partial-merge scenarios, and `fail_fetch_all`
/// breaks only reads to drive reload-failure scenarios.
#[derive(Clone, Default)]
pub struct MemoryRemoteStore {
    inner: Arc<MemoryRemoteStoreInner>,
}

#[derive(Default)]
struct MemoryRemoteStoreInner {
    rows: Mutex<Vec<CartRow>>,
    fail_all: AtomicBool,
    fail_fetch_all: AtomicBool,
    fail_items: Mutex<Vec<ItemId>>,
}

impl MemoryRemoteStore {
    /// Make every subsequent operation fail.
    pub fn fail_everything(&self) {
        self.inner.fail_all.store(true, Ordering::SeqCst);
    }

    /// Restore normal service.
    pub fn recover(&self) {
        self.inner.fail_all.store(false, Ordering::SeqCst);
        self.inner.fail_fetch_all.store(false, Ordering::SeqCst);
    }

    /// Make only `fetch_all` fail, leaving row mutations healthy. Drives the
    /// reload-after-merge failure path.
    pub fn fail_fetch_all(&self) {
        self.inner.fail_fetch_all.store(true, Ordering::SeqCst);
    }

    /// Make operations touching one item fail, leaving the rest healthy.
    pub fn fail_item(&self, item: ItemId) {
        lock(&self.inner.fail_items).push(item);
    }

    /// Seed a durable row, returning its id.
    pub fn seed_row(&self, user: UserId, item: ItemId, quantity: i64, price: i64) -> RowId {
        let id = RowId::new(Uuid::new_v4());
        lock(&self.inner.rows).push(CartRow {
            id,
            user_id: user,
            item_id: item,
            title: format!("Service {item}"),
            category: "General".to_owned(),
            price,
            number: None,
            quantity,
            description: String::new(),
            updated_at: None,
        });
        id
    }

    /// Current quantity of the `(user, item)` row, if any.
    #[must_use]
    pub fn quantity_of(&self, user: UserId, item: ItemId) -> Option<i64> {
        lock(&self.inner.rows)
            .iter()
            .find(|r| r.user_id == user && r.item_id == item)
            .map(|r| r.quantity)
    }

    /// Number of rows for a user.
    #[must_use]
    pub fn rows_for(&self, user: UserId) -> usize {
        lock(&self.inner.rows)
            .iter()
            .filter(|r| r.user_id == user)
            .count()
    }

    fn check(&self, item: Option<ItemId>) -> Result<(), RemoteError> {
        let poisoned = item.is_some_and(|item| lock(&self.inner.fail_items).contains(&item));
        if self.inner.fail_all.load(Ordering::SeqCst) || poisoned {
            return Err(RemoteError::MissingRow);
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl RemoteCartStore for MemoryRemoteStore {
    async fn fetch_all(&self, user: UserId) -> Result<Vec<CartRow>, RemoteError> {
        self.check(None)?;
        if self.inner.fail_fetch_all.load(Ordering::SeqCst) {
            return Err(RemoteError::MissingRow);
        }
        Ok(lock(&self.inner.rows)
            .iter()
            .filter(|r| r.user_id == user)
            .cloned()
            .collect())
    }

    async fn find_row(&self, user: UserId, item: ItemId) -> Result<Option<CartRow>, RemoteError> {
        self.check(Some(item))?;
        Ok(lock(&self.inner.rows)
            .iter()
            .find(|r| r.user_id == user && r.item_id == item)
            .cloned())
    }

    async fn insert_row(&self, row: &NewCartRow) -> Result<RowId, RemoteError> {
        self.check(Some(row.item_id))?;
        let id = RowId::new(Uuid::new_v4());
        lock(&self.inner.rows).push(CartRow {
            id,
            user_id: row.user_id,
            item_id: row.item_id,
            title: row.title.clone(),
            category: row.category.clone(),
            price: row.price,
            number: row.number.clone(),
            quantity: i64::from(row.quantity),
            description: row.description.clone(),
            updated_at: None,
        });
        Ok(id)
    }

    async fn set_quantity(&self, user: UserId, row: RowId, quantity: u32) -> Result<(), RemoteError> {
        self.check(None)?;
        let mut rows = lock(&self.inner.rows);
        if let Some(r) = rows.iter_mut().find(|r| r.user_id == user && r.id == row) {
            r.quantity = i64::from(quantity);
        }
        Ok(())
    }

    async fn delete_row(&self, user: UserId, row: RowId) -> Result<(), RemoteError> {
        self.check(None)?;
        lock(&self.inner.rows).retain(|r| !(r.user_id == user && r.id == row));
        Ok(())
    }

    async fn delete_all(&self, user: UserId) -> Result<(), RemoteError> {
        self.check(None)?;
        lock(&self.inner.rows).retain(|r| r.user_id != user);
        Ok(())
    }
}
