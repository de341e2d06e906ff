// crates/policy-table-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Row Store
// Description: Durable RowStore backed by a single SQLite connection.
// Purpose: Persist policy rows in a fixed-width table with WAL durability.
// Dependencies: policy-table-core, rusqlite, serde, thiserror, tokio, tracing
// ============================================================================

//! ## Overview
//! This module implements [`RowStore`] using `SQLite`. Every policy table has
//! the fixed layout `id INTEGER PRIMARY KEY AUTOINCREMENT, ptype TEXT,
//! v0..v5 TEXT`. Statements run on the blocking thread pool against one
//! connection serialized through a mutex.
//!
//! Table names are validated as plain identifiers and double-quoted before
//! they reach SQL text; row values are always bound as parameters.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use policy_table_core::FIELD_COLUMNS;
use policy_table_core::PolicyRow;
use policy_table_core::RowPredicate;
use policy_table_core::RowStore;
use policy_table_core::RowStoreError;
use policy_table_core::validate_table_name;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use rusqlite::params_from_iter;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Bound values per stored row (`ptype` plus six fields).
const VALUES_PER_ROW: usize = 7;
/// Maximum rows bound into one multi-row `INSERT`.
///
/// Keeps each statement under the engine's 32766 bound-parameter limit.
const MAX_ROWS_PER_STATEMENT: usize = 500;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` row store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteRowStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteRowStoreConfig {
    /// Builds a configuration for `path` with default pragmas.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` row store errors.
///
/// # Invariants
/// - Error messages avoid embedding row values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Invalid configuration or input.
    #[error("sqlite store invalid input: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for RowStoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Backend(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

impl From<rusqlite::Error> for SqliteStoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Db(error.to_string())
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed row store.
///
/// # Invariants
/// - Connection access is serialized through a mutex.
/// - After [`RowStore::close`] every call fails with [`RowStoreError::Closed`].
#[derive(Clone)]
pub struct SqliteRowStore {
    /// Shared connection; `None` once closed.
    connection: Arc<Mutex<Option<Connection>>>,
}

impl SqliteRowStore {
    /// Opens an `SQLite`-backed row store at the configured path.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path is unsafe or the database
    /// cannot be opened.
    pub fn open(config: &SqliteRowStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let connection = open_connection(config)?;
        tracing::debug!(path = %config.path.display(), "opened sqlite row store");
        Ok(Self::from_connection(connection))
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the connection cannot be created.
    pub fn open_in_memory() -> Result<Self, SqliteStoreError> {
        let connection = Connection::open_in_memory()?;
        connection.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
        Ok(Self::from_connection(connection))
    }

    /// Wraps an already-configured connection.
    fn from_connection(connection: Connection) -> Self {
        Self {
            connection: Arc::new(Mutex::new(Some(connection))),
        }
    }

    /// Runs `f` against the connection on the blocking thread pool.
    async fn with_connection<T, F>(&self, f: F) -> Result<T, RowStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, SqliteStoreError> + Send + 'static,
    {
        let shared = Arc::clone(&self.connection);
        let outcome = tokio::task::spawn_blocking(move || {
            let mut guard = shared
                .lock()
                .map_err(|_| RowStoreError::Io("sqlite connection mutex poisoned".to_string()))?;
            let connection = guard.as_mut().ok_or(RowStoreError::Closed)?;
            f(connection).map_err(RowStoreError::from)
        })
        .await;
        outcome.map_err(|err| RowStoreError::Io(format!("sqlite worker failed: {err}")))?
    }
}

#[async_trait]
impl RowStore for SqliteRowStore {
    async fn has_table(&self, table: &str) -> Result<bool, RowStoreError> {
        let table = table.to_string();
        self.with_connection(move |connection| {
            let found: Option<i64> = connection
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    params![table],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    async fn create_policy_table(&self, table: &str) -> Result<(), RowStoreError> {
        let quoted = quoted_table(table)?;
        self.with_connection(move |connection| {
            let columns =
                FIELD_COLUMNS.iter().map(|column| format!("{column} TEXT")).collect::<Vec<_>>();
            connection.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {quoted} (id INTEGER PRIMARY KEY AUTOINCREMENT, \
                 ptype TEXT, {});",
                columns.join(", ")
            ))?;
            Ok(())
        })
        .await
    }

    async fn drop_table_if_exists(&self, table: &str) -> Result<(), RowStoreError> {
        let quoted = quoted_table(table)?;
        self.with_connection(move |connection| {
            connection.execute_batch(&format!("DROP TABLE IF EXISTS {quoted};"))?;
            Ok(())
        })
        .await
    }

    async fn select_all(&self, table: &str) -> Result<Vec<PolicyRow>, RowStoreError> {
        let quoted = quoted_table(table)?;
        self.with_connection(move |connection| {
            let mut statement = connection.prepare(&format!(
                "SELECT id, ptype, {} FROM {quoted} ORDER BY id",
                FIELD_COLUMNS.join(", ")
            ))?;
            let rows = statement.query_map([], |row| {
                Ok(PolicyRow {
                    id: row.get(0)?,
                    ptype: row.get(1)?,
                    v0: row.get(2)?,
                    v1: row.get(3)?,
                    v2: row.get(4)?,
                    v3: row.get(5)?,
                    v4: row.get(6)?,
                    v5: row.get(7)?,
                })
            })?;
            let rows = rows.collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
    }

    async fn insert(&self, table: &str, rows: &[PolicyRow]) -> Result<(), RowStoreError> {
        if rows.is_empty() {
            return Ok(());
        }
        let quoted = quoted_table(table)?;
        let rows = rows.to_vec();
        self.with_connection(move |connection| {
            let tx = connection.transaction()?;
            for batch in rows.chunks(MAX_ROWS_PER_STATEMENT) {
                tx.execute(
                    &insert_statement(&quoted, batch.len()),
                    params_from_iter(batch.iter().flat_map(row_values)),
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn delete_where(
        &self,
        table: &str,
        predicate: &RowPredicate,
    ) -> Result<u64, RowStoreError> {
        let quoted = quoted_table(table)?;
        let (clause, values) = where_clause(predicate);
        self.with_connection(move |connection| {
            let removed = connection
                .execute(&format!("DELETE FROM {quoted}{clause}"), params_from_iter(values))?;
            Ok(u64::try_from(removed).unwrap_or(u64::MAX))
        })
        .await
    }

    async fn close(&self) -> Result<(), RowStoreError> {
        let shared = Arc::clone(&self.connection);
        let outcome = tokio::task::spawn_blocking(move || {
            let mut guard = shared
                .lock()
                .map_err(|_| RowStoreError::Io("sqlite connection mutex poisoned".to_string()))?;
            let connection = guard.take().ok_or(RowStoreError::Closed)?;
            connection.close().map_err(|(_, err)| RowStoreError::Backend(err.to_string()))
        })
        .await;
        outcome.map_err(|err| RowStoreError::Io(format!("sqlite worker failed: {err}")))??;
        tracing::debug!("closed sqlite row store");
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates `table` and returns it as a quoted SQL identifier.
fn quoted_table(table: &str) -> Result<String, RowStoreError> {
    validate_table_name(table)?;
    Ok(format!("\"{table}\""))
}

/// Builds a multi-row `INSERT` for `rows` rows into `quoted`.
fn insert_statement(quoted: &str, rows: usize) -> String {
    let placeholders = vec!["?"; VALUES_PER_ROW].join(", ");
    let tuples = vec![format!("({placeholders})"); rows].join(", ");
    format!("INSERT INTO {quoted} (ptype, {}) VALUES {tuples}", FIELD_COLUMNS.join(", "))
}

/// Returns the bound values of `row` in column order.
fn row_values(row: &PolicyRow) -> [Option<&str>; VALUES_PER_ROW] {
    let [v0, v1, v2, v3, v4, v5] = row.fields();
    [row.ptype.as_deref(), v0, v1, v2, v3, v4, v5]
}

/// Builds a `WHERE` clause and its bound values from `predicate`.
///
/// An empty predicate yields an empty clause, which matches every row.
fn where_clause(predicate: &RowPredicate) -> (String, Vec<String>) {
    let constraints = predicate.constraints();
    if constraints.is_empty() {
        return (String::new(), Vec::new());
    }
    let mut terms = Vec::with_capacity(constraints.len());
    let mut values = Vec::with_capacity(constraints.len());
    for (position, (column, value)) in constraints.into_iter().enumerate() {
        terms.push(format!("{column} = ?{}", position + 1));
        values.push(value.to_string());
    }
    (format!(" WHERE {}", terms.join(" AND ")), values)
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    if path.components().any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH)
    {
        return Err(SqliteStoreError::Invalid(
            "store path contains an overlong component".to_string(),
        ));
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection and applies the configured pragmas.
fn open_connection(config: &SqliteRowStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))?;
    connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    Ok(connection)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
