// crates/policy-table-core/src/interfaces/mod.rs
// ============================================================================
// Module: Policy Table Interfaces
// Description: Backend-agnostic row storage and engine-facing adapter contracts.
// Purpose: Define the seams between the adapter, SQL engines, and policy engines.
// Dependencies: crate::core, async-trait, thiserror
// ============================================================================

//! ## Overview
//! [`RowStore`] is the minimal table-scoped surface the adapter consumes from
//! a SQL engine: schema introspection and mutation, select-all, insert, and
//! delete-where. [`PolicyAdapter`] and [`BatchPolicyAdapter`] are the
//! capability set a policy-enforcement engine expects from a storage backend.
//!
//! ## Invariants
//! - Row stores never assign meaning to `ptype` or positional values.
//! - Row stores do not retry; failures surface to the adapter unchanged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use thiserror::Error;

use crate::core::PolicyRow;
use crate::core::RowPredicate;
use crate::core::RuleSet;
use crate::runtime::AdapterError;

// ============================================================================
// SECTION: Row Store
// ============================================================================

/// Row store errors.
///
/// # Invariants
/// - Messages never embed full row contents.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RowStoreError {
    /// I/O failure reaching the backing store.
    #[error("row store io error: {0}")]
    Io(String),
    /// Backing engine rejected the operation.
    #[error("row store backend error: {0}")]
    Backend(String),
    /// Invalid input such as a malformed table name.
    #[error("row store invalid input: {0}")]
    Invalid(String),
    /// The store was closed.
    #[error("row store closed")]
    Closed,
}

/// Table-scoped row storage consumed by the policy adapter.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Returns true when `table` exists.
    ///
    /// # Errors
    ///
    /// Returns [`RowStoreError`] when introspection fails.
    async fn has_table(&self, table: &str) -> Result<bool, RowStoreError>;

    /// Creates `table` with the fixed policy schema (`id`, `ptype`, `v0..v5`).
    ///
    /// # Errors
    ///
    /// Returns [`RowStoreError`] when schema mutation fails.
    async fn create_policy_table(&self, table: &str) -> Result<(), RowStoreError>;

    /// Drops `table` if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`RowStoreError`] when schema mutation fails.
    async fn drop_table_if_exists(&self, table: &str) -> Result<(), RowStoreError>;

    /// Returns every row in `table` in storage order.
    ///
    /// # Errors
    ///
    /// Returns [`RowStoreError`] when the query fails.
    async fn select_all(&self, table: &str) -> Result<Vec<PolicyRow>, RowStoreError>;

    /// Inserts `rows` atomically: either every row is stored or none is.
    ///
    /// # Errors
    ///
    /// Returns [`RowStoreError`] when the insert fails.
    async fn insert(&self, table: &str, rows: &[PolicyRow]) -> Result<(), RowStoreError>;

    /// Deletes every row matching `predicate` and returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns [`RowStoreError`] when the delete fails.
    async fn delete_where(
        &self,
        table: &str,
        predicate: &RowPredicate,
    ) -> Result<u64, RowStoreError>;

    /// Releases the underlying connection.
    ///
    /// # Errors
    ///
    /// Returns [`RowStoreError`] when teardown fails.
    async fn close(&self) -> Result<(), RowStoreError>;
}

// ============================================================================
// SECTION: Engine Adapter Contracts
// ============================================================================

/// Storage capability set expected by a policy-enforcement engine.
#[async_trait]
pub trait PolicyAdapter: Send + Sync {
    /// Appends every stored rule into `rules`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the stored rows cannot be read.
    async fn load_policy(&self, rules: &mut RuleSet) -> Result<(), AdapterError>;

    /// Replaces all stored rules with the `p` and `g` sections of `rules`.
    ///
    /// Returns false on any failure; the stored table may be inconsistent.
    async fn save_policy(&self, rules: &RuleSet) -> bool;

    /// Stores one rule.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the rule is malformed or the insert fails.
    async fn add_policy(
        &self,
        sec: &str,
        ptype: &str,
        rule: &[String],
    ) -> Result<(), AdapterError>;

    /// Deletes rows matching `rule` and returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the rule is malformed or the delete fails.
    async fn remove_policy(
        &self,
        sec: &str,
        ptype: &str,
        rule: &[String],
    ) -> Result<u64, AdapterError>;

    /// Deletes rows whose fields starting at `field_index` equal `field_values`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the delete fails.
    async fn remove_filtered_policy(
        &self,
        sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[String],
    ) -> Result<u64, AdapterError>;
}

/// Bulk extensions to [`PolicyAdapter`].
#[async_trait]
pub trait BatchPolicyAdapter: PolicyAdapter {
    /// Stores many rules in bounded insert chunks.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when a rule is malformed or a chunk insert fails.
    async fn add_policies(
        &self,
        sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<(), AdapterError>;

    /// Deletes many rules with bounded delete concurrency.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when a rule is malformed or a delete fails.
    async fn remove_policies(
        &self,
        sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<u64, AdapterError>;
}
