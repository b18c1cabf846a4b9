//! Cart manager: single owner of in-memory cart state.
//!
//! Every mutation applies to in-memory state synchronously (optimistic),
//! then dispatches persistence without awaiting it: guests get a synchronous
//! local save, authenticated users get a detached remote task whose only
//! allowed failure effect is a local fallback save — never a rollback. The
//! guest/authenticated branch lives here and only here; callers never decide
//! which store to target.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::{debug, instrument, warn};

use fernway_core::{ActorSession, CartItem, CartItemInput, CartState, ItemId, clamp_quantity};

use crate::error::CartError;
use crate::local::LocalCartStore;
use crate::remote::{NewCartRow, RemoteCartStore};
use crate::sync::SyncEngine;

/// Explicit confirmation signal for [`CartManager::clear`].
///
/// Clearing is destructive and irreversible; the call site must present the
/// user's decision rather than a bare boolean that is too easy to hardcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearConfirmation {
    /// The user confirmed the destructive clear.
    Confirmed,
    /// The user backed out; nothing happens.
    Cancelled,
}

/// Manager lifecycle.
#[derive(Debug, Clone)]
enum Phase {
    Uninitialized,
    Ready(ActorSession),
}

struct ManagerState {
    phase: Phase,
    cart: CartState,
}

struct ManagerInner<R, L> {
    remote: R,
    local: L,
    state: Mutex<ManagerState>,
    /// Detached persistence tasks still in flight.
    pending: Mutex<usize>,
    idle: Notify,
}

impl<R, L: LocalCartStore> ManagerInner<R, L> {
    fn lock_state(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist the current in-memory state locally. The degraded path for
    /// every remote failure.
    fn fallback_save(&self) {
        let snapshot = self.lock_state().cart.clone();
        self.local.save(&snapshot);
    }
}

/// The single owner of in-memory cart state.
///
/// Cheaply cloneable via `Arc`; hand clones to UI consumers. All mutations
/// are synchronous against in-memory state, so the caller's view updates
/// before (and regardless of) any network round trip.
pub struct CartManager<R, L> {
    inner: Arc<ManagerInner<R, L>>,
}

impl<R, L> Clone for CartManager<R, L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R, L> CartManager<R, L>
where
    R: RemoteCartStore + 'static,
    L: LocalCartStore + 'static,
{
    /// Create an uninitialized manager over the two stores.
    #[must_use]
    pub fn new(remote: R, local: L) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                remote,
                local,
                state: Mutex::new(ManagerState {
                    phase: Phase::Uninitialized,
                    cart: CartState::new(),
                }),
                pending: Mutex::new(0),
                idle: Notify::new(),
            }),
        }
    }

    /// Enter `Ready` for `session`, loading cart state from the
    /// session-appropriate store: local for guests, remote for authenticated
    /// users (falling back to local with a warning when the remote store is
    /// unreachable).
    #[instrument(skip(self, session), fields(authenticated = session.is_authenticated()))]
    pub async fn initialize(&self, session: ActorSession) {
        let cart = self.load_for(&session).await;
        let mut state = self.inner.lock_state();
        state.phase = Phase::Ready(session);
        state.cart = cart;
    }

    /// Apply a freshly resolved session, reconciling state across the
    /// transition. Guest to authenticated runs the one-time cart merge;
    /// authenticated to guest (logout) rebuilds from local storage, leaving
    /// the user's durable rows untouched server-side for their next login.
    /// Unchanged sessions are a no-op.
    pub async fn apply_session(&self, session: ActorSession) {
        let current = match &self.inner.lock_state().phase {
            Phase::Uninitialized => None,
            Phase::Ready(current) => Some(current.clone()),
        };

        match (current, session) {
            (None, next) => self.initialize(next).await,
            (Some(ActorSession::Guest), ActorSession::Authenticated(user)) => {
                let guest_cart = self.inner.lock_state().cart.clone();
                let outcome = SyncEngine::new(&self.inner.remote, &self.inner.local)
                    .merge(user.id, guest_cart)
                    .await;
                let mut state = self.inner.lock_state();
                state.phase = Phase::Ready(ActorSession::Authenticated(user));
                state.cart = outcome.state;
            }
            (Some(ActorSession::Authenticated(_)), ActorSession::Guest) => {
                let cart = self.inner.local.load();
                let mut state = self.inner.lock_state();
                state.phase = Phase::Ready(ActorSession::Guest);
                state.cart = cart;
            }
            (Some(ActorSession::Guest), ActorSession::Guest) => {}
            (Some(ActorSession::Authenticated(prev)), ActorSession::Authenticated(next)) => {
                // A different user in the same slot is a fresh login, not a
                // guest transition; there is no guest cart to merge.
                if prev.id != next.id {
                    self.initialize(ActorSession::Authenticated(next)).await;
                }
            }
        }
    }

    /// Add an item to the cart.
    ///
    /// Applies optimistically: an existing item's quantity increments
    /// (capped), a new one inserts at quantity 1 with defaulted display
    /// fields. Guests persist locally; authenticated carts dispatch a
    /// detached remote upsert that attaches the durable row id on success
    /// and degrades to a local save on failure. The caller's view always
    /// reflects the optimistic result.
    ///
    /// # Errors
    ///
    /// [`CartError::InvalidItem`] when the input has no item identity (the
    /// operation is a no-op); [`CartError::Uninitialized`] before
    /// [`initialize`](Self::initialize).
    #[instrument(skip(self, input), fields(item_id = ?input.item_id))]
    pub fn add(&self, input: CartItemInput) -> Result<(), CartError> {
        let item = CartItem::from_input(input)?;
        let item_id = item.item_id;

        let (session, snapshot) = {
            let mut state = self.inner.lock_state();
            let Phase::Ready(session) = &state.phase else {
                return Err(CartError::Uninitialized);
            };
            let session = session.clone();
            let quantity = state.cart.insert_or_increment(item);
            debug!(%item_id, quantity, "applied optimistic add");
            (session, state.cart.clone())
        };

        match session {
            ActorSession::Guest => self.inner.local.save(&snapshot),
            ActorSession::Authenticated(user) => {
                let Some(current) = snapshot.get(item_id).cloned() else {
                    return Ok(());
                };
                let inner = Arc::clone(&self.inner);
                self.spawn_persist(async move {
                    let attrs = NewCartRow::from_item(user.id, &current);
                    match inner.remote.upsert_quantity(user.id, &attrs).await {
                        Ok(row_id) => {
                            inner.lock_state().cart.attach_row_id(item_id, row_id);
                        }
                        Err(e) => {
                            warn!(%item_id, error = %e, "remote add failed, saving cart locally");
                            inner.fallback_save();
                        }
                    }
                });
            }
        }

        Ok(())
    }

    /// Set an item's quantity, clamped to `[1, 99]`. A requested quantity
    /// below 1 is equivalent to [`remove`](Self::remove). Unknown items are
    /// a no-op. Remote failure degrades to a local save, same as `add`.
    ///
    /// # Errors
    ///
    /// [`CartError::Uninitialized`] before [`initialize`](Self::initialize).
    #[instrument(skip(self), fields(item_id = %item_id, requested))]
    pub fn update_quantity(&self, item_id: ItemId, requested: i64) -> Result<(), CartError> {
        if requested < 1 {
            return self.remove(item_id);
        }
        let clamped = clamp_quantity(requested);

        let (session, row_id, snapshot) = {
            let mut state = self.inner.lock_state();
            let Phase::Ready(session) = &state.phase else {
                return Err(CartError::Uninitialized);
            };
            let session = session.clone();
            if !state.cart.set_quantity(item_id, requested) {
                return Ok(());
            }
            let row_id = state.cart.get(item_id).and_then(|i| i.remote_row_id);
            (session, row_id, state.cart.clone())
        };

        match (session, row_id) {
            (ActorSession::Guest, _) => self.inner.local.save(&snapshot),
            (ActorSession::Authenticated(user), Some(row)) => {
                let inner = Arc::clone(&self.inner);
                self.spawn_persist(async move {
                    if let Err(e) = inner.remote.set_quantity(user.id, row, clamped).await {
                        warn!(%item_id, error = %e, "remote quantity update failed, saving cart locally");
                        inner.fallback_save();
                    }
                });
            }
            // No durable row yet (the add's upsert has not landed); the
            // local record is the best durability available.
            (ActorSession::Authenticated(_), None) => self.inner.local.save(&snapshot),
        }

        Ok(())
    }

    /// Remove an item. The in-memory removal is always honored; a failing
    /// remote delete is logged and the current state saved locally.
    ///
    /// # Errors
    ///
    /// [`CartError::Uninitialized`] before [`initialize`](Self::initialize).
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub fn remove(&self, item_id: ItemId) -> Result<(), CartError> {
        let (session, removed, snapshot) = {
            let mut state = self.inner.lock_state();
            let Phase::Ready(session) = &state.phase else {
                return Err(CartError::Uninitialized);
            };
            let session = session.clone();
            let removed = state.cart.remove(item_id);
            (session, removed, state.cart.clone())
        };

        let Some(removed) = removed else {
            return Ok(());
        };

        match session {
            ActorSession::Guest => self.inner.local.save(&snapshot),
            ActorSession::Authenticated(user) => match removed.remote_row_id {
                Some(row) => {
                    let inner = Arc::clone(&self.inner);
                    self.spawn_persist(async move {
                        if let Err(e) = inner.remote.delete_row(user.id, row).await {
                            warn!(%item_id, error = %e, "remote delete failed, saving cart locally");
                            inner.fallback_save();
                        }
                    });
                }
                None => self.inner.local.save(&snapshot),
            },
        }

        Ok(())
    }

    /// Empty the cart. Destructive and irreversible, so it only runs with
    /// [`ClearConfirmation::Confirmed`]; returns whether it executed.
    /// Clears the local record regardless of session, so a stale guest cart
    /// cannot resurface later; authenticated carts also dispatch a detached
    /// remote delete-all.
    ///
    /// # Errors
    ///
    /// [`CartError::Uninitialized`] before [`initialize`](Self::initialize).
    #[instrument(skip(self))]
    pub fn clear(&self, confirmation: ClearConfirmation) -> Result<bool, CartError> {
        if confirmation == ClearConfirmation::Cancelled {
            debug!("clear not confirmed, leaving cart untouched");
            return Ok(false);
        }

        let session = {
            let mut state = self.inner.lock_state();
            let Phase::Ready(session) = &state.phase else {
                return Err(CartError::Uninitialized);
            };
            let session = session.clone();
            state.cart.clear();
            session
        };

        self.inner.local.clear();

        if let ActorSession::Authenticated(user) = session {
            let inner = Arc::clone(&self.inner);
            self.spawn_persist(async move {
                if let Err(e) = inner.remote.delete_all(user.id).await {
                    // In-memory and local are already empty; the orphaned
                    // rows surface again at next login and can be cleared
                    // then.
                    warn!(error = %e, "remote delete-all failed");
                }
            });
        }

        Ok(true)
    }

    /// Sum of `unit_price * quantity` in minor units. Never negative.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.inner.lock_state().cart.total()
    }

    /// Sum of quantities, for badge display.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.inner.lock_state().cart.count()
    }

    /// Membership test.
    #[must_use]
    pub fn contains(&self, item_id: ItemId) -> bool {
        self.inner.lock_state().cart.contains(item_id)
    }

    /// Read-only snapshot of the current cart state.
    #[must_use]
    pub fn snapshot(&self) -> CartState {
        self.inner.lock_state().cart.clone()
    }

    /// The session the manager is ready for, if initialized.
    #[must_use]
    pub fn session(&self) -> Option<ActorSession> {
        match &self.inner.lock_state().phase {
            Phase::Uninitialized => None,
            Phase::Ready(session) => Some(session.clone()),
        }
    }

    /// Wait until every detached persistence task has settled. Used by
    /// shutdown paths and tests; UI callers never need it.
    pub async fn flush(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if *self
                .inner
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                == 0
            {
                return;
            }
            notified.await;
        }
    }

    async fn load_for(&self, session: &ActorSession) -> CartState {
        match session {
            ActorSession::Guest => self.inner.local.load(),
            ActorSession::Authenticated(user) => {
                match self.inner.remote.fetch_all(user.id).await {
                    Ok(rows) => {
                        CartState::from_items(rows.into_iter().map(CartItem::from).collect())
                    }
                    Err(e) => {
                        warn!(user_id = %user.id, error = %e, "remote load failed, using local cart");
                        self.inner.local.load()
                    }
                }
            }
        }
    }

    /// Detach a persistence task, keeping the pending count accurate so
    /// [`flush`](Self::flush) can await quiescence.
    fn spawn_persist<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        *inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner) += 1;

        tokio::spawn(async move {
            task.await;
            let mut pending = inner
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            *pending -= 1;
            let idle = *pending == 0;
            drop(pending);
            if idle {
                inner.idle.notify_waiters();
            }
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::remote::{CartRow, RemoteError};
    use fernway_core::{RowId, SessionUser, UserId};
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicBool, Ordering};
    use uuid::Uuid;

    // =========================================================================
    // In-memory fakes
    // =========================================================================

    #[derive(Default)]
    struct MemoryLocalInner {
        record: Mutex<Option<CartState>>,
    }

    #[derive(Clone, Default)]
    struct MemoryLocal {
        inner: Arc<MemoryLocalInner>,
    }

    impl MemoryLocal {
        fn record(&self) -> Option<CartState> {
            self.inner.record.lock().unwrap().clone()
        }

        fn seed(&self, cart: CartState) {
            *self.inner.record.lock().unwrap() = Some(cart);
        }
    }

    impl LocalCartStore for MemoryLocal {
        fn load(&self) -> CartState {
            self.record().unwrap_or_default()
        }

        fn save(&self, cart: &CartState) {
            *self.inner.record.lock().unwrap() = Some(cart.clone());
        }

        fn clear(&self) {
            *self.inner.record.lock().unwrap() = None;
        }
    }

    #[derive(Default)]
    struct MemoryRemoteInner {
        rows: Mutex<Vec<CartRow>>,
        fail: AtomicBool,
    }

    #[derive(Clone, Default)]
    struct MemoryRemote {
        inner: Arc<MemoryRemoteInner>,
    }

    impl MemoryRemote {
        fn fail_everything(&self) {
            self.inner.fail.store(true, Ordering::SeqCst);
        }

        fn check(&self) -> Result<(), RemoteError> {
            if self.inner.fail.load(Ordering::SeqCst) {
                return Err(RemoteError::Status {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    body: "remote store unavailable".to_owned(),
                });
            }
            Ok(())
        }

        fn seed_row(&self, user: UserId, item: ItemId, quantity: i64) -> RowId {
            let id = RowId::new(Uuid::new_v4());
            self.inner.rows.lock().unwrap().push(CartRow {
                id,
                user_id: user,
                item_id: item,
                title: String::new(),
                category: "General".to_owned(),
                price: 100,
                number: None,
                quantity,
                description: String::new(),
                updated_at: None,
            });
            id
        }

        fn quantity_of(&self, user: UserId, item: ItemId) -> Option<i64> {
            self.inner
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.user_id == user && r.item_id == item)
                .map(|r| r.quantity)
        }

        fn row_count(&self) -> usize {
            self.inner.rows.lock().unwrap().len()
        }
    }

    impl RemoteCartStore for MemoryRemote {
        async fn fetch_all(&self, user: UserId) -> Result<Vec<CartRow>, RemoteError> {
            self.check()?;
            Ok(self
                .inner
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.user_id == user)
                .cloned()
                .collect())
        }

        async fn find_row(&self, user: UserId, item: ItemId) -> Result<Option<CartRow>, RemoteError> {
            self.check()?;
            Ok(self
                .inner
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.user_id == user && r.item_id == item)
                .cloned())
        }

        async fn insert_row(&self, row: &NewCartRow) -> Result<RowId, RemoteError> {
            self.check()?;
            let id = RowId::new(Uuid::new_v4());
            self.inner.rows.lock().unwrap().push(CartRow {
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
            self.check()?;
            let mut rows = self.inner.rows.lock().unwrap();
            if let Some(r) = rows.iter_mut().find(|r| r.user_id == user && r.id == row) {
                r.quantity = i64::from(quantity);
            }
            Ok(())
        }

        async fn delete_row(&self, user: UserId, row: RowId) -> Result<(), RemoteError> {
            self.check()?;
            self.inner
                .rows
                .lock()
                .unwrap()
                .retain(|r| !(r.user_id == user && r.id == row));
            Ok(())
        }

        async fn delete_all(&self, user: UserId) -> Result<(), RemoteError> {
            self.check()?;
            self.inner.rows.lock().unwrap().retain(|r| r.user_id != user);
            Ok(())
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn input(id: i32, price: i64) -> CartItemInput {
        CartItemInput {
            unit_price: Some(price),
            ..CartItemInput::with_id(ItemId::new(id))
        }
    }

    fn manager() -> (CartManager<MemoryRemote, MemoryLocal>, MemoryRemote, MemoryLocal) {
        let remote = MemoryRemote::default();
        let local = MemoryLocal::default();
        let manager = CartManager::new(remote.clone(), local.clone());
        (manager, remote, local)
    }

    fn auth_session() -> (ActorSession, UserId) {
        let id = UserId::new(Uuid::new_v4());
        (ActorSession::Authenticated(SessionUser::new(id)), id)
    }

    // =========================================================================
    // Guest behavior
    // =========================================================================

    #[tokio::test]
    async fn test_add_accumulates_quantity() {
        let (manager, _remote, _local) = manager();
        manager.initialize(ActorSession::Guest).await;

        for expected in 1..=3u32 {
            manager.add(input(1, 100)).unwrap();
            assert_eq!(manager.count(), expected);
        }
        assert_eq!(manager.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_add_requires_item_id() {
        let (manager, _remote, _local) = manager();
        manager.initialize(ActorSession::Guest).await;

        let err = manager.add(CartItemInput::default()).unwrap_err();
        assert!(matches!(err, CartError::InvalidItem(_)));
        assert_eq!(manager.count(), 0);
    }

    #[tokio::test]
    async fn test_operations_require_initialization() {
        let (manager, _remote, _local) = manager();
        assert!(matches!(
            manager.add(input(1, 100)),
            Err(CartError::Uninitialized)
        ));
        assert!(matches!(
            manager.clear(ClearConfirmation::Confirmed),
            Err(CartError::Uninitialized)
        ));
        assert_eq!(manager.total(), 0);
        assert!(manager.session().is_none());
    }

    #[tokio::test]
    async fn test_total_and_count() {
        let (manager, _remote, _local) = manager();
        manager.initialize(ActorSession::Guest).await;

        manager.add(input(1, 100)).unwrap();
        manager.add(input(1, 100)).unwrap();
        manager.add(input(2, 50)).unwrap();
        manager.update_quantity(ItemId::new(2), 3).unwrap();

        assert_eq!(manager.total(), 350);
        assert_eq!(manager.count(), 5);
        assert!(manager.contains(ItemId::new(1)));
        assert!(!manager.contains(ItemId::new(9)));
    }

    #[tokio::test]
    async fn test_update_quantity_clamps() {
        let (manager, _remote, _local) = manager();
        manager.initialize(ActorSession::Guest).await;
        manager.add(input(1, 100)).unwrap();

        manager.update_quantity(ItemId::new(1), 500).unwrap();
        assert_eq!(manager.count(), 99);

        manager.update_quantity(ItemId::new(1), 7).unwrap();
        assert_eq!(manager.count(), 7);
    }

    #[tokio::test]
    async fn test_update_quantity_below_one_removes() {
        let (manager, _remote, _local) = manager();
        manager.initialize(ActorSession::Guest).await;
        manager.add(input(1, 100)).unwrap();

        manager.update_quantity(ItemId::new(1), 0).unwrap();
        assert!(!manager.contains(ItemId::new(1)));
        assert_eq!(manager.count(), 0);
    }

    #[tokio::test]
    async fn test_guest_mutations_persist_locally() {
        let (manager, _remote, local) = manager();
        manager.initialize(ActorSession::Guest).await;

        manager.add(input(1, 100)).unwrap();
        manager.add(input(2, 50)).unwrap();
        assert_eq!(local.record(), Some(manager.snapshot()));

        manager.remove(ItemId::new(2)).unwrap();
        assert_eq!(local.record(), Some(manager.snapshot()));
    }

    #[tokio::test]
    async fn test_guest_cart_survives_reload() {
        let (manager, remote, local) = manager();
        manager.initialize(ActorSession::Guest).await;
        manager.add(input(1, 100)).unwrap();
        manager.add(input(2, 50)).unwrap();
        let before = manager.snapshot();

        // A fresh manager over the same local store sees the same cart.
        let reloaded = CartManager::new(remote, local);
        reloaded.initialize(ActorSession::Guest).await;
        assert_eq!(reloaded.snapshot(), before);
    }

    // =========================================================================
    // Authenticated behavior
    // =========================================================================

    #[tokio::test]
    async fn test_authenticated_add_upserts_and_attaches_row_id() {
        let (manager, remote, _local) = manager();
        let (session, user) = auth_session();
        manager.initialize(session).await;

        manager.add(input(1, 100)).unwrap();
        manager.flush().await;

        assert_eq!(remote.quantity_of(user, ItemId::new(1)), Some(1));
        let snapshot = manager.snapshot();
        assert!(snapshot.get(ItemId::new(1)).unwrap().remote_row_id.is_some());

        manager.add(input(1, 100)).unwrap();
        manager.flush().await;
        assert_eq!(remote.quantity_of(user, ItemId::new(1)), Some(2));
        assert_eq!(remote.row_count(), 1);
    }

    #[tokio::test]
    async fn test_authenticated_remove_deletes_row() {
        let (manager, remote, _local) = manager();
        let (session, user) = auth_session();
        remote.seed_row(user, ItemId::new(1), 2);
        manager.initialize(session).await;
        assert_eq!(manager.count(), 2);

        manager.remove(ItemId::new(1)).unwrap();
        manager.flush().await;

        assert_eq!(manager.count(), 0);
        assert_eq!(remote.row_count(), 0);
    }

    #[tokio::test]
    async fn test_authenticated_update_sets_remote_quantity() {
        let (manager, remote, _local) = manager();
        let (session, user) = auth_session();
        remote.seed_row(user, ItemId::new(1), 2);
        manager.initialize(session).await;

        manager.update_quantity(ItemId::new(1), 5).unwrap();
        manager.flush().await;

        assert_eq!(remote.quantity_of(user, ItemId::new(1)), Some(5));
    }

    #[tokio::test]
    async fn test_remote_failure_degrades_to_local() {
        let (manager, remote, local) = manager();
        let (session, _user) = auth_session();
        manager.initialize(session).await;
        remote.fail_everything();

        manager.add(input(1, 100)).unwrap();
        manager.add(input(1, 100)).unwrap();
        manager.add(input(2, 50)).unwrap();
        manager.update_quantity(ItemId::new(2), 3).unwrap();
        manager.remove(ItemId::new(1)).unwrap();
        manager.flush().await;

        // The user's view is correct regardless of the dead backend.
        assert_eq!(manager.count(), 3);
        assert_eq!(manager.total(), 150);
        // And the local store holds an equivalent snapshot.
        assert_eq!(local.record(), Some(manager.snapshot()));
        assert_eq!(remote.row_count(), 0);
    }

    // =========================================================================
    // Clear
    // =========================================================================

    #[tokio::test]
    async fn test_clear_requires_confirmation() {
        let (manager, _remote, local) = manager();
        manager.initialize(ActorSession::Guest).await;
        manager.add(input(1, 100)).unwrap();

        assert!(!manager.clear(ClearConfirmation::Cancelled).unwrap());
        assert_eq!(manager.count(), 1);
        assert!(local.record().is_some());
    }

    #[tokio::test]
    async fn test_clear_empties_memory_local_and_remote() {
        let (manager, remote, local) = manager();
        let (session, user) = auth_session();
        remote.seed_row(user, ItemId::new(1), 2);
        local.seed(CartState::new());
        manager.initialize(session).await;

        assert!(manager.clear(ClearConfirmation::Confirmed).unwrap());
        manager.flush().await;

        assert_eq!(manager.count(), 0);
        assert!(local.record().is_none());
        assert_eq!(remote.row_count(), 0);
    }

    // =========================================================================
    // Session transitions
    // =========================================================================

    #[tokio::test]
    async fn test_login_merges_guest_cart() {
        let (manager, remote, local) = manager();
        let (session, user) = auth_session();
        remote.seed_row(user, ItemId::new(1), 1);

        manager.initialize(ActorSession::Guest).await;
        manager.add(input(1, 100)).unwrap();
        manager.add(input(1, 100)).unwrap();

        manager.apply_session(session).await;

        assert_eq!(remote.quantity_of(user, ItemId::new(1)), Some(3));
        assert_eq!(manager.snapshot().get(ItemId::new(1)).unwrap().quantity, 3);
        assert!(local.record().is_none());
    }

    #[tokio::test]
    async fn test_logout_rebuilds_from_local() {
        let (manager, remote, local) = manager();
        let (session, user) = auth_session();
        remote.seed_row(user, ItemId::new(1), 2);
        manager.initialize(session).await;
        assert_eq!(manager.count(), 2);

        manager.apply_session(ActorSession::Guest).await;

        // Remote rows are abandoned client-side but remain server-side.
        assert_eq!(manager.snapshot(), local.load());
        assert_eq!(remote.row_count(), 1);
        assert_eq!(manager.session(), Some(ActorSession::Guest));
    }

    #[tokio::test]
    async fn test_unchanged_session_is_a_noop() {
        let (manager, _remote, _local) = manager();
        manager.initialize(ActorSession::Guest).await;
        manager.add(input(1, 100)).unwrap();

        manager.apply_session(ActorSession::Guest).await;
        assert_eq!(manager.count(), 1);
    }
}
