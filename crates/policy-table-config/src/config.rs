// crates/policy-table-config/src/config.rs
// ============================================================================
// Module: Policy Table Configuration
// Description: Configuration loading, validation, and store wiring.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: policy-table-core, policy-table-sqlite, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The `[adapter]` table maps onto [`AdapterOptions`]; the `[store]` table
//! selects the backing row store. Invalid configuration fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use policy_table_core::AdapterError;
use policy_table_core::AdapterOptions;
use policy_table_core::InMemoryRowStore;
use policy_table_core::PolicyStore;
use policy_table_core::RowStore;
use policy_table_core::RowStoreError;
use policy_table_sqlite::SqliteJournalMode;
use policy_table_sqlite::SqliteRowStore;
use policy_table_sqlite::SqliteRowStoreConfig;
use policy_table_sqlite::SqliteSyncMode;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "policy-table.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "POLICY_TABLE_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default busy timeout (ms) for the sqlite store.
const DEFAULT_STORE_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Policy table configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTableConfig {
    /// Adapter options.
    #[serde(default)]
    pub adapter: AdapterOptions,
    /// Backing row store selection.
    #[serde(default)]
    pub store: StoreConfig,
}

impl PolicyTableConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit `path`, then `POLICY_TABLE_CONFIG`, then
    /// `policy-table.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config = Self::from_toml(content)?;
        tracing::debug!(path = %resolved.display(), "loaded policy table config");
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.adapter.validate().map_err(|err| ConfigError::Invalid(err.to_string()))?;
        self.store.validate()
    }
}

/// Backing row store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid("memory store must not set path".to_string()));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite store requires path".to_string())
                })?;
                validate_store_path(path)
            }
        }
    }

    /// Builds the `SQLite` row store configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when no path is configured.
    pub fn sqlite_config(&self) -> Result<SqliteRowStoreConfig, ConfigError> {
        let path = self
            .path
            .clone()
            .ok_or_else(|| ConfigError::Invalid("sqlite store requires path".to_string()))?;
        Ok(SqliteRowStoreConfig {
            path,
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
        })
    }
}

/// Backing row store type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Use the in-memory store.
    #[default]
    Memory,
    /// Use the `SQLite`-backed durable store.
    Sqlite,
}

/// Returns the default busy timeout for the sqlite store.
const fn default_store_busy_timeout_ms() -> u64 {
    DEFAULT_STORE_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Store Wiring
// ============================================================================

/// Opens the configured row store and returns a ready policy store.
///
/// The policy table is created when missing.
///
/// # Errors
///
/// Returns [`ConfigError`] when the configuration is invalid or the store
/// cannot be opened.
pub async fn open_policy_store(config: &PolicyTableConfig) -> Result<PolicyStore, ConfigError> {
    config.validate()?;
    let rows: Arc<dyn RowStore> = match config.store.store_type {
        StoreType::Memory => Arc::new(InMemoryRowStore::new()),
        StoreType::Sqlite => {
            let sqlite = SqliteRowStore::open(&config.store.sqlite_config()?)
                .map_err(|err| ConfigError::Store(AdapterError::Store(RowStoreError::from(err))))?;
            Arc::new(sqlite)
        }
    };
    let store = PolicyStore::open(rows, config.adapter.clone()).await?;
    tracing::info!(
        table = store.table_name(),
        backend = ?config.store.store_type,
        "opened policy store"
    );
    Ok(store)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// Configured store could not be opened.
    #[error("config store error: {0}")]
    Store(#[from] AdapterError),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the caller or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    if path.components().any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH)
    {
        return Err(ConfigError::Invalid("config path component too long".to_string()));
    }
    Ok(())
}

/// Validates the configured sqlite database path.
fn validate_store_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid("store path must be non-empty".to_string()));
    }
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("store path exceeds max length".to_string()));
    }
    if path.components().any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH)
    {
        return Err(ConfigError::Invalid("store path component too long".to_string()));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
