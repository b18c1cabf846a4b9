//! Fernway cart and session synchronization.
//!
//! A shopping cart that exists before the user is known. Guests accumulate a
//! cart on the local device; once they authenticate, the guest cart is merged
//! into their remote cart and the remote store becomes the source of truth.
//! When the remote store is unreachable, every operation degrades to local
//! persistence so the user never loses a cart to a network blip.
//!
//! # Architecture
//!
//! - [`local`] - On-device JSON record store (survives reloads, no network)
//! - [`remote`] - Durable per-user cart rows on the managed backend
//! - [`session`] - Resolves the current actor (guest vs authenticated)
//! - [`manager`] - Single owner of in-memory cart state; optimistic-first
//! - [`sync`] - One-time guest-to-user cart merge at login
//!
//! All mutations apply to in-memory state synchronously and dispatch
//! persistence as a detached task; a remote failure is only ever a
//! durability problem, never a correctness problem for what the user sees.
//!
//! # Example
//!
//! ```rust,ignore
//! use fernway_cart::{CartManager, HttpRemoteStore, JsonFileStore, SessionResolver};
//!
//! let config = CartSyncConfig::from_env()?;
//! let store = JsonFileStore::new(&config.local);
//! let remote = HttpRemoteStore::new(&config.remote);
//! let resolver = SessionResolver::new(store.clone());
//!
//! let cart = CartManager::new(remote, store);
//! cart.initialize(resolver.resolve()).await;
//! cart.add(CartItemInput::with_id(ItemId::new(3)))?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod local;
pub mod manager;
pub mod remote;
pub mod session;
pub mod sync;

pub use config::{CartSyncConfig, ConfigError, LocalStoreConfig, RemoteStoreConfig};
pub use error::CartError;
pub use local::{JsonFileStore, LocalCartStore};
pub use manager::{CartManager, ClearConfirmation};
pub use remote::{CartRow, HttpRemoteStore, NewCartRow, RemoteCartStore, RemoteError};
pub use session::SessionResolver;
pub use sync::{MergeOutcome, SyncEngine};
