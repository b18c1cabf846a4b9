//! Cart subsystem configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `FERNWAY_REMOTE_URL` - Base URL of the managed backend
//! - `FERNWAY_REMOTE_API_KEY` - API key for the managed backend
//!
//! ## Optional
//! - `FERNWAY_REMOTE_TABLE` - Cart table name (default: `cart_items`)
//! - `FERNWAY_DATA_DIR` - Local record directory (default: `.fernway`)
//! - `FERNWAY_CART_KEY` - Well-known local cart record key (default: `fernway_cart`)
//! - `FERNWAY_SESSION_KEY` - Well-known session record key (default: `fernway_session`)

use std::collections::HashMap;
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Cart subsystem configuration.
#[derive(Debug, Clone)]
pub struct CartSyncConfig {
    /// Remote store (managed backend) configuration.
    pub remote: RemoteStoreConfig,
    /// Local record store configuration.
    pub local: LocalStoreConfig,
}

/// Remote store configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct RemoteStoreConfig {
    /// Base URL of the managed backend (e.g., `https://xyz.example.co`).
    pub base_url: String,
    /// API key sent as `apikey` and bearer token.
    pub api_key: SecretString,
    /// Table holding durable cart rows.
    pub table: String,
}

impl std::fmt::Debug for RemoteStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStoreConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("table", &self.table)
            .finish()
    }
}

/// Local record store configuration.
#[derive(Debug, Clone)]
pub struct LocalStoreConfig {
    /// Directory holding the JSON records.
    pub data_dir: PathBuf,
    /// Well-known key for the serialized cart record.
    pub cart_key: String,
    /// Well-known key for the session record.
    pub session_key: String,
}

impl Default for LocalStoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".fernway"),
            cart_key: "fernway_cart".to_owned(),
            session_key: "fernway_session".to_owned(),
        }
    }
}

impl CartSyncConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API key fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            remote: RemoteStoreConfig::from_env()?,
            local: LocalStoreConfig::from_env(),
        })
    }
}

impl RemoteStoreConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = get_required_env("FERNWAY_REMOTE_URL")?;
        Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("FERNWAY_REMOTE_URL".to_owned(), e.to_string())
        })?;

        Ok(Self {
            base_url,
            api_key: get_validated_secret("FERNWAY_REMOTE_API_KEY")?,
            table: get_env_or_default("FERNWAY_REMOTE_TABLE", "cart_items"),
        })
    }
}

impl LocalStoreConfig {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_dir: std::env::var("FERNWAY_DATA_DIR")
                .map_or(defaults.data_dir, PathBuf::from),
            cart_key: get_env_or_default("FERNWAY_CART_KEY", &defaults.cart_key),
            session_key: get_env_or_default("FERNWAY_SESSION_KEY", &defaults.session_key),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real API keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the backend."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
