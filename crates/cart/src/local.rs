//! On-device cart record store.
//!
//! The local store is the guest cart's only home and every remote failure's
//! landing pad. It must never block the UI and never propagate an error:
//! loads treat malformed records as absent, saves are best-effort and logged.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use fernway_core::{CartState, SessionUser};

use crate::config::LocalStoreConfig;

/// Error writing or reading a local record. Internal only: the public
/// contract swallows these after logging.
#[derive(Debug, Error)]
pub enum LocalStoreError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be serialized.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// On-device persistent storage for the cart and session records.
///
/// Only invoked when the actor is a guest, or as a fallback when a remote
/// operation fails.
pub trait LocalCartStore: Send + Sync {
    /// Load the persisted cart. Returns an empty cart when no record or a
    /// malformed record exists.
    fn load(&self) -> CartState;

    /// Persist the cart wholesale. Best-effort: failures are logged and
    /// swallowed, never propagated.
    fn save(&self, cart: &CartState);

    /// Remove the persisted cart record. Best-effort.
    fn clear(&self);
}

/// Local store backed by one JSON file per well-known key under a data
/// directory. The cart record is a serialized array, read and written
/// wholesale (no partial updates).
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    data_dir: PathBuf,
    cart_key: String,
    session_key: String,
}

impl JsonFileStore {
    /// Create a store over the configured data directory.
    #[must_use]
    pub fn new(config: &LocalStoreConfig) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
            cart_key: config.cart_key.clone(),
            session_key: config.session_key.clone(),
        }
    }

    /// Read the session record, if a well-formed one exists.
    ///
    /// Absence and corruption both read as `None`: the Session Resolver must
    /// never fail, only fall back to guest.
    #[must_use]
    pub fn read_session(&self) -> Option<SessionUser> {
        self.read_record(&self.session_key)
    }

    /// Write the session record. Best-effort, same contract as cart saves.
    pub fn write_session(&self, user: &SessionUser) {
        if let Err(e) = self.write_record(&self.session_key, user) {
            warn!(error = %e, "failed to persist session record");
        }
    }

    /// Remove the session record. Best-effort.
    pub fn clear_session(&self) {
        self.remove_record(&self.session_key);
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}.json"))
    }

    fn read_record<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.record_path(key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                debug!(key, error = %e, "failed to read local record");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                // Malformed records are treated as absent, never fatal.
                debug!(key, error = %e, "malformed local record, treating as absent");
                None
            }
        }
    }

    fn write_record<T: Serialize>(&self, key: &str, value: &T) -> Result<(), LocalStoreError> {
        fs::create_dir_all(&self.data_dir)?;
        let raw = serde_json::to_string(value)?;
        fs::write(self.record_path(key), raw)?;
        Ok(())
    }

    fn remove_record(&self, key: &str) {
        let path = self.record_path(key);
        if let Err(e) = fs::remove_file(&path)
            && e.kind() != ErrorKind::NotFound
        {
            warn!(key, path = %path.display(), error = %e, "failed to remove local record");
        }
    }

    #[cfg(test)]
    pub(crate) fn cart_path(&self) -> PathBuf {
        self.record_path(&self.cart_key)
    }
}

impl LocalCartStore for JsonFileStore {
    fn load(&self) -> CartState {
        self.read_record(&self.cart_key).unwrap_or_default()
    }

    fn save(&self, cart: &CartState) {
        if let Err(e) = self.write_record(&self.cart_key, cart) {
            warn!(error = %e, "failed to persist local cart record");
        }
    }

    fn clear(&self) {
        self.remove_record(&self.cart_key);
    }
}

/// Build a store rooted at an explicit directory with default keys. Handy for
/// hosts that manage their own config.
impl From<&Path> for JsonFileStore {
    fn from(data_dir: &Path) -> Self {
        let defaults = LocalStoreConfig::default();
        Self {
            data_dir: data_dir.to_path_buf(),
            cart_key: defaults.cart_key,
            session_key: defaults.session_key,
        }
    }
}
