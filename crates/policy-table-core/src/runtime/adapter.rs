// crates/policy-table-core/src/runtime/adapter.rs
// ============================================================================
// Module: Policy Store
// Description: Table lifecycle and batched CRUD for policy rules.
// Purpose: Bridge an engine's rule set and a row store with bounded batching.
// Dependencies: crate::{core, interfaces}, futures-util, serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`PolicyStore`] is the adapter a policy-enforcement engine talks to. It uses
//! the row codec for every translation and applies two adapter-level bounds:
//! inserts in [`crate::BatchPolicyAdapter::add_policies`] are split into
//! sequential chunks of `chunk_size` rows, and deletes in
//! [`crate::BatchPolicyAdapter::remove_policies`] run concurrently in groups
//! of `concurrent_deletes`.
//!
//! ## Invariants
//! - Rows are never updated in place; changes are delete + insert.
//! - Group N of concurrent deletes settles before group N+1 starts.
//! - `save_policy` encodes the whole rule set before touching the table.
//! - No locking or retries: concurrent writers rely on the row store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::CsvLineLoader;
use crate::core::FieldRendering;
use crate::core::GROUPING_SECTION;
use crate::core::MAX_RULE_FIELDS;
use crate::core::POLICY_SECTION;
use crate::core::PolicyLineLoader;
use crate::core::PolicyRow;
use crate::core::RowPredicate;
use crate::core::RuleSet;
use crate::core::decode_row;
use crate::core::encode_filter;
use crate::core::encode_rule;
use crate::core::rule_predicate;
use crate::interfaces::BatchPolicyAdapter;
use crate::interfaces::PolicyAdapter;
use crate::interfaces::RowStore;
use crate::interfaces::RowStoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default policy table name.
pub const DEFAULT_TABLE_NAME: &str = "policies";
/// Default maximum rows per insert statement in `add_policies`.
pub const DEFAULT_CHUNK_SIZE: usize = 100;
/// Default maximum simultaneous deletes in `remove_policies`.
pub const DEFAULT_CONCURRENT_DELETES: usize = 5;
/// Maximum accepted table name length.
const MAX_TABLE_NAME_LENGTH: usize = 64;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Policy adapter errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// Backing row store failure.
    #[error("policy store error: {0}")]
    Store(#[from] RowStoreError),
    /// Adapter options failed validation.
    #[error("invalid adapter options: {0}")]
    InvalidOptions(String),
    /// Rule set lacks a section the adapter persists.
    #[error("invalid rule set: {0}")]
    InvalidModel(String),
    /// Rule arity is outside the storable range.
    #[error("invalid rule: {0}")]
    InvalidRule(String),
}

// ============================================================================
// SECTION: Options
// ============================================================================

/// Adapter options recognized at construction.
///
/// # Invariants
/// - `table_name` is a plain SQL identifier (see [`validate_table_name`]).
/// - `chunk_size` and `concurrent_deletes` are greater than zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterOptions {
    /// Storage table name.
    #[serde(default = "default_table_name")]
    pub table_name: String,
    /// Maximum rows per insert statement in `add_policies`.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Maximum simultaneous deletes in `remove_policies`.
    #[serde(default = "default_concurrent_deletes")]
    pub concurrent_deletes: usize,
    /// Field dropping rule used when rendering policy lines on load.
    #[serde(default)]
    pub field_rendering: FieldRendering,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            table_name: default_table_name(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            concurrent_deletes: DEFAULT_CONCURRENT_DELETES,
            field_rendering: FieldRendering::default(),
        }
    }
}

impl AdapterOptions {
    /// Returns options targeting `table_name`.
    #[must_use]
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidOptions`] when a value is out of range.
    pub fn validate(&self) -> Result<(), AdapterError> {
        validate_table_name(&self.table_name)
            .map_err(|err| AdapterError::InvalidOptions(err.to_string()))?;
        if self.chunk_size == 0 {
            return Err(AdapterError::InvalidOptions(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.concurrent_deletes == 0 {
            return Err(AdapterError::InvalidOptions(
                "concurrent_deletes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Returns the default table name.
fn default_table_name() -> String {
    DEFAULT_TABLE_NAME.to_string()
}

/// Returns the default insert chunk size.
const fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

/// Returns the default delete concurrency bound.
const fn default_concurrent_deletes() -> usize {
    DEFAULT_CONCURRENT_DELETES
}

/// Validates that `name` is a plain SQL identifier safe to interpolate.
///
/// # Errors
///
/// Returns [`RowStoreError::Invalid`] when the name is empty, too long, or
/// contains characters outside `[A-Za-z0-9_]` (or starts with a digit).
pub fn validate_table_name(name: &str) -> Result<(), RowStoreError> {
    if name.is_empty() {
        return Err(RowStoreError::Invalid("table name must not be empty".to_string()));
    }
    if name.len() > MAX_TABLE_NAME_LENGTH {
        return Err(RowStoreError::Invalid(format!(
            "table name exceeds {MAX_TABLE_NAME_LENGTH} characters"
        )));
    }
    if name.starts_with(|ch: char| ch.is_ascii_digit()) {
        return Err(RowStoreError::Invalid("table name must not start with a digit".to_string()));
    }
    if !name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
        return Err(RowStoreError::Invalid(format!("table name {name} is not a plain identifier")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Policy Store
// ============================================================================

/// Policy adapter over a shared row store.
///
/// # Invariants
/// - The row store is shared; only [`PolicyStore::close`] releases it.
/// - Operations after `close` fail with whatever the row store reports.
#[derive(Clone)]
pub struct PolicyStore {
    /// Backing row store.
    store: Arc<dyn RowStore>,
    /// Validated adapter options.
    options: AdapterOptions,
    /// Injected policy line loader used on load.
    loader: Arc<dyn PolicyLineLoader>,
}

impl PolicyStore {
    /// Creates an adapter over `store` without touching storage.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidOptions`] when `options` fail validation.
    pub fn new(store: Arc<dyn RowStore>, options: AdapterOptions) -> Result<Self, AdapterError> {
        options.validate()?;
        Ok(Self {
            store,
            options,
            loader: Arc::new(CsvLineLoader),
        })
    }

    /// Creates an adapter and ensures the policy table exists.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when options are invalid or table creation fails.
    pub async fn open(
        store: Arc<dyn RowStore>,
        options: AdapterOptions,
    ) -> Result<Self, AdapterError> {
        let adapter = Self::new(store, options)?;
        adapter.create_table().await?;
        Ok(adapter)
    }

    /// Replaces the line loader used to append loaded rows into a rule set.
    #[must_use]
    pub fn with_line_loader(mut self, loader: Arc<dyn PolicyLineLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Returns the adapter options.
    #[must_use]
    pub const fn options(&self) -> &AdapterOptions {
        &self.options
    }

    /// Returns the storage table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.options.table_name
    }

    /// Creates the policy table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Store`] when introspection or creation fails.
    pub async fn create_table(&self) -> Result<(), AdapterError> {
        let table = self.table_name();
        if self.store.has_table(table).await? {
            tracing::debug!(table, "policy table already present");
            return Ok(());
        }
        self.store.create_policy_table(table).await?;
        tracing::info!(table, "created policy table");
        Ok(())
    }

    /// Drops the policy table if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Store`] when the drop fails.
    pub async fn drop_table(&self) -> Result<(), AdapterError> {
        let table = self.table_name();
        self.store.drop_table_if_exists(table).await?;
        tracing::info!(table, "dropped policy table");
        Ok(())
    }

    /// Releases the backing row store.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Store`] when teardown fails.
    pub async fn close(&self) -> Result<(), AdapterError> {
        self.store.close().await?;
        tracing::debug!(table = self.table_name(), "closed policy store");
        Ok(())
    }

    /// Replaces all stored rules, reporting the failure cause.
    ///
    /// The rule set is validated and encoded first; the table is then dropped,
    /// recreated, and filled with a single insert (skipped when empty).
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the rule set is unusable or any storage
    /// step fails. A storage failure may leave the table empty or partial.
    pub async fn try_save_policy(&self, rules: &RuleSet) -> Result<(), AdapterError> {
        let rows = collect_rows(rules)?;
        self.drop_table().await?;
        self.create_table().await?;
        let table = self.table_name();
        if rows.is_empty() {
            tracing::debug!(table, "saved empty policy");
            return Ok(());
        }
        self.store.insert(table, &rows).await?;
        tracing::info!(table, rows = rows.len(), "saved policy");
        Ok(())
    }

    /// Deletes every row matching a raw sparse predicate.
    ///
    /// An empty predicate deletes every row.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Store`] when the delete fails.
    pub async fn remove_policies_where(
        &self,
        predicate: &RowPredicate,
    ) -> Result<u64, AdapterError> {
        let table = self.table_name();
        let removed = self.store.delete_where(table, predicate).await?;
        tracing::debug!(table, removed, "removed policies by predicate");
        Ok(removed)
    }
}

#[async_trait]
impl PolicyAdapter for PolicyStore {
    async fn load_policy(&self, rules: &mut RuleSet) -> Result<(), AdapterError> {
        let table = self.table_name();
        let rows = self.store.select_all(table).await?;
        let mut skipped = 0_usize;
        for row in &rows {
            if row.ptype.is_none() {
                skipped += 1;
                continue;
            }
            decode_row(row, self.options.field_rendering, self.loader.as_ref(), rules);
        }
        if skipped > 0 {
            tracing::debug!(table, skipped, "skipped rows without a policy type");
        }
        tracing::debug!(table, rows = rows.len(), "loaded policy");
        Ok(())
    }

    async fn save_policy(&self, rules: &RuleSet) -> bool {
        match self.try_save_policy(rules).await {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(table = self.table_name(), %error, "policy save failed");
                false
            }
        }
    }

    async fn add_policy(
        &self,
        _sec: &str,
        ptype: &str,
        rule: &[String],
    ) -> Result<(), AdapterError> {
        ensure_rule_arity(rule)?;
        let row = encode_rule(ptype, rule);
        self.store.insert(self.table_name(), std::slice::from_ref(&row)).await?;
        Ok(())
    }

    async fn remove_policy(
        &self,
        _sec: &str,
        ptype: &str,
        rule: &[String],
    ) -> Result<u64, AdapterError> {
        ensure_rule_arity(rule)?;
        let predicate = rule_predicate(&encode_rule(ptype, rule));
        Ok(self.store.delete_where(self.table_name(), &predicate).await?)
    }

    async fn remove_filtered_policy(
        &self,
        _sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[String],
    ) -> Result<u64, AdapterError> {
        let predicate = encode_filter(ptype, field_index, field_values);
        let table = self.table_name();
        let removed = self.store.delete_where(table, &predicate).await?;
        tracing::debug!(table, ptype, field_index, removed, "removed filtered policies");
        Ok(removed)
    }
}

#[async_trait]
impl BatchPolicyAdapter for PolicyStore {
    async fn add_policies(
        &self,
        _sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<(), AdapterError> {
        let rows = encode_rules(ptype, rules)?;
        let table = self.table_name();
        for (index, chunk) in rows.chunks(self.options.chunk_size).enumerate() {
            self.store.insert(table, chunk).await?;
            tracing::debug!(table, chunk = index, rows = chunk.len(), "inserted policy chunk");
        }
        Ok(())
    }

    async fn remove_policies(
        &self,
        _sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<u64, AdapterError> {
        let predicates: Vec<RowPredicate> =
            encode_rules(ptype, rules)?.iter().map(rule_predicate).collect();
        let table = self.table_name();
        let mut removed = 0_u64;
        for (index, group) in predicates.chunks(self.options.concurrent_deletes).enumerate() {
            let results =
                join_all(group.iter().map(|predicate| self.store.delete_where(table, predicate)))
                    .await;
            for result in results {
                removed = removed.saturating_add(result?);
            }
            tracing::debug!(table, group = index, deletes = group.len(), "removed policy group");
        }
        Ok(removed)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects rules that cannot be stored in the fixed six-field row.
fn ensure_rule_arity(rule: &[String]) -> Result<(), AdapterError> {
    if rule.is_empty() || rule.len() > MAX_RULE_FIELDS {
        return Err(AdapterError::InvalidRule(format!(
            "rule must carry 1 to {MAX_RULE_FIELDS} values, got {}",
            rule.len()
        )));
    }
    Ok(())
}

/// Encodes every rule for one policy type.
fn encode_rules(ptype: &str, rules: &[Vec<String>]) -> Result<Vec<PolicyRow>, AdapterError> {
    rules
        .iter()
        .map(|rule| {
            ensure_rule_arity(rule)?;
            Ok(encode_rule(ptype, rule))
        })
        .collect()
}

/// Encodes every rule in the permission and grouping sections.
fn collect_rows(rules: &RuleSet) -> Result<Vec<PolicyRow>, AdapterError> {
    let mut rows = Vec::with_capacity(rules.rule_count());
    for sec in [POLICY_SECTION, GROUPING_SECTION] {
        let section = rules.section(sec).ok_or_else(|| {
            AdapterError::InvalidModel(format!("rule set is missing section {sec}"))
        })?;
        for (ptype, assertion) in section {
            rows.extend(encode_rules(ptype, &assertion.policy)?);
        }
    }
    Ok(rows)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
