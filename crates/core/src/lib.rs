//! Fernway Core - Shared types library.
//!
//! This crate provides common types used across all Fernway components:
//! - `cart` - Cart and session synchronization subsystem
//! - `integration-tests` - End-to-end scenario tests
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no network clients. This
//! keeps it lightweight and allows it to be used anywhere, including inside
//! store adapters that must not depend on the cart subsystem itself.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, cart item and cart state model, session model

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
