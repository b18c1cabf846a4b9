//! Durable per-user cart rows on the managed backend.
//!
//! # Architecture
//!
//! - PostgREST-style JSON rows over HTTPS via `reqwest`
//! - Rows keyed by `(user_id, item_id)`; filters are query parameters
//! - This adapter reports failures; the Cart Manager decides fallback
//!
//! `upsert_quantity` is a read-then-branch: it is not atomic against
//! concurrent writers from other tabs/devices of the same user, and
//! last-writer-wins on the quantity field is the accepted semantics.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use fernway_core::{CartItem, ItemId, MAX_QUANTITY, RowId, UserId, clamp_quantity, sanitize_price};

use crate::config::RemoteStoreConfig;

/// Errors that can occur when reaching or writing the remote store.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed (connectivity, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote store answered with a non-success status.
    #[error("remote store returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: StatusCode,
        /// Response body, truncated for logging.
        body: String,
    },

    /// Response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// An insert reported success but returned no row.
    #[error("remote store returned no row for insert")]
    MissingRow,
}

/// A durable cart row as stored remotely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartRow {
    /// Durable row identity, minted by the remote store.
    pub id: RowId,
    /// Owning user.
    pub user_id: UserId,
    /// Identity of the underlying service/product.
    pub item_id: ItemId,
    /// Display title.
    pub title: String,
    /// Display category.
    pub category: String,
    /// Unit price in minor units.
    pub price: i64,
    /// Service/SKU number, when the catalog carries one.
    #[serde(default)]
    pub number: Option<String>,
    /// Quantity as stored; clamp on the way into memory, not here.
    pub quantity: i64,
    /// Display description.
    #[serde(default)]
    pub description: String,
    /// Last write timestamp, set by the remote store.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CartRow {
    /// Row quantity clamped into the valid range.
    #[must_use]
    pub fn quantity_clamped(&self) -> u32 {
        clamp_quantity(self.quantity)
    }
}

impl From<CartRow> for CartItem {
    fn from(row: CartRow) -> Self {
        Self {
            item_id: row.item_id,
            title: row.title,
            category: row.category,
            description: row.description,
            number: row.number,
            unit_price: sanitize_price(Some(row.price)),
            quantity: clamp_quantity(row.quantity),
            remote_row_id: Some(row.id),
        }
    }
}

/// Insert payload for a new durable row. The remote store mints `id` and
/// `updated_at`.
#[derive(Debug, Clone, Serialize)]
pub struct NewCartRow {
    /// Owning user.
    pub user_id: UserId,
    /// Identity of the underlying service/product.
    pub item_id: ItemId,
    /// Display title.
    pub title: String,
    /// Display category.
    pub category: String,
    /// Unit price in minor units.
    pub price: i64,
    /// Service/SKU number.
    pub number: Option<String>,
    /// Quantity to insert at.
    pub quantity: u32,
    /// Display description.
    pub description: String,
}

impl NewCartRow {
    /// Build an insert payload from an in-memory item, carrying the item's
    /// current quantity.
    #[must_use]
    pub fn from_item(user_id: UserId, item: &CartItem) -> Self {
        Self {
            user_id,
            item_id: item.item_id,
            title: item.title.clone(),
            category: item.category.clone(),
            price: item.unit_price,
            number: item.number.clone(),
            quantity: item.quantity,
            description: item.description.clone(),
        }
    }
}

/// Durable cart row operations, all scoped to `(user_id, item_id)`.
///
/// Futures are `Send` so the Cart Manager can detach persistence onto the
/// runtime. Implementors report every failure as [`RemoteError`]; fallback
/// behavior is the manager's decision, not this adapter's.
pub trait RemoteCartStore: Send + Sync {
    /// Fetch all rows for a user. Empty vec when the user has none.
    fn fetch_all(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<Vec<CartRow>, RemoteError>> + Send;

    /// Find the row for `(user, item)`, if one exists.
    fn find_row(
        &self,
        user: UserId,
        item: ItemId,
    ) -> impl Future<Output = Result<Option<CartRow>, RemoteError>> + Send;

    /// Insert a new row, returning the minted row id.
    fn insert_row(
        &self,
        row: &NewCartRow,
    ) -> impl Future<Output = Result<RowId, RemoteError>> + Send;

    /// Set a row's quantity. The caller clamps to `[1, 99]` beforehand.
    fn set_quantity(
        &self,
        user: UserId,
        row: RowId,
        quantity: u32,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Delete one row.
    fn delete_row(
        &self,
        user: UserId,
        row: RowId,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Delete every row belonging to the user.
    fn delete_all(&self, user: UserId) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Increment the `(user, item)` row's quantity by one (capped), inserting
    /// a fresh row at quantity 1 when none exists. Returns the row id either
    /// way.
    ///
    /// Read-then-branch, not atomic: two tabs racing here end up
    /// last-writer-wins on the quantity field.
    fn upsert_quantity(
        &self,
        user: UserId,
        attrs: &NewCartRow,
    ) -> impl Future<Output = Result<RowId, RemoteError>> + Send {
        async move {
            match self.find_row(user, attrs.item_id).await? {
                Some(existing) => {
                    let next = (existing.quantity_clamped() + 1).min(MAX_QUANTITY);
                    self.set_quantity(user, existing.id, next).await?;
                    Ok(existing.id)
                }
                None => {
                    let fresh = NewCartRow {
                        quantity: 1,
                        ..attrs.clone()
                    };
                    self.insert_row(&fresh).await
                }
            }
        }
    }
}

// =============================================================================
// HttpRemoteStore
// =============================================================================

/// Remote store client for a PostgREST-style managed backend.
///
/// Cheaply cloneable; all clones share one HTTP connection pool.
#[derive(Clone)]
pub struct HttpRemoteStore {
    inner: Arc<HttpRemoteStoreInner>,
}

struct HttpRemoteStoreInner {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpRemoteStore {
    /// Create a new remote store client.
    #[must_use]
    pub fn new(config: &RemoteStoreConfig) -> Self {
        let endpoint = format!(
            "{}/rest/v1/{}",
            config.base_url.trim_end_matches('/'),
            config.table
        );

        Self {
            inner: Arc::new(HttpRemoteStoreInner {
                client: reqwest::Client::new(),
                endpoint,
                api_key: config.api_key.expose_secret().to_string(),
            }),
        }
    }

    fn request(&self, method: reqwest::Method, query: &[(&str, String)]) -> reqwest::RequestBuilder {
        self.inner
            .client
            .request(method, &self.inner.endpoint)
            .query(query)
            .header("apikey", &self.inner.api_key)
            .bearer_auth(&self.inner.api_key)
            .header("Content-Type", "application/json")
    }

    /// Map non-success statuses to `RemoteError::Status` with a truncated
    /// body for diagnostics.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(500)
            .collect::<String>();
        tracing::error!(status = %status, body = %body, "remote store returned non-success status");
        Err(RemoteError::Status { status, body })
    }

    async fn fetch_rows(&self, query: &[(&str, String)]) -> Result<Vec<CartRow>, RemoteError> {
        let response = self.request(reqwest::Method::GET, query).send().await?;
        let response = Self::check(response).await?;
        let raw = response.text().await?;
        Ok(serde_json::from_str(&raw)?)
    }
}

fn eq_filter(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

impl RemoteCartStore for HttpRemoteStore {
    #[instrument(skip(self), fields(user_id = %user))]
    async fn fetch_all(&self, user: UserId) -> Result<Vec<CartRow>, RemoteError> {
        self.fetch_rows(&[
            ("user_id", eq_filter(user)),
            ("select", "*".to_owned()),
        ])
        .await
    }

    #[instrument(skip(self), fields(user_id = %user, item_id = %item))]
    async fn find_row(&self, user: UserId, item: ItemId) -> Result<Option<CartRow>, RemoteError> {
        let rows = self
            .fetch_rows(&[
                ("user_id", eq_filter(user)),
                ("item_id", eq_filter(item)),
                ("select", "*".to_owned()),
                ("limit", "1".to_owned()),
            ])
            .await?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self, row), fields(user_id = %row.user_id, item_id = %row.item_id))]
    async fn insert_row(&self, row: &NewCartRow) -> Result<RowId, RemoteError> {
        let response = self
            .request(reqwest::Method::POST, &[])
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await?;
        let response = Self::check(response).await?;

        let raw = response.text().await?;
        let inserted: Vec<CartRow> = serde_json::from_str(&raw)?;
        inserted
            .into_iter()
            .next()
            .map(|r| r.id)
            .ok_or(RemoteError::MissingRow)
    }

    #[instrument(skip(self), fields(user_id = %user, row_id = %row))]
    async fn set_quantity(&self, user: UserId, row: RowId, quantity: u32) -> Result<(), RemoteError> {
        let response = self
            .request(
                reqwest::Method::PATCH,
                &[("user_id", eq_filter(user)), ("id", eq_filter(row))],
            )
            .header("Prefer", "return=minimal")
            .json(&serde_json::json!({ "quantity": quantity }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %user, row_id = %row))]
    async fn delete_row(&self, user: UserId, row: RowId) -> Result<(), RemoteError> {
        let response = self
            .request(
                reqwest::Method::DELETE,
                &[("user_id", eq_filter(user)), ("id", eq_filter(row))],
            )
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %user))]
    async fn delete_all(&self, user: UserId) -> Result<(), RemoteError> {
        let response = self
            .request(reqwest::Method::DELETE, &[("user_id", eq_filter(user))])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
