// crates/policy-table-core/src/runtime/memory.rs
// ============================================================================
// Module: In-Memory Row Store
// Description: Simple in-memory row store for tests and examples.
// Purpose: Provide a deterministic RowStore implementation without a SQL engine.
// Dependencies: crate::{core, interfaces}, async-trait
// ============================================================================

//! ## Overview
//! This module provides a simple in-memory implementation of [`RowStore`] for
//! tests and local demos. Tables keep rows in insertion order and assign
//! auto-incrementing ids the way a SQL engine would. It is not intended for
//! production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::PolicyRow;
use crate::core::RowPredicate;
use crate::interfaces::RowStore;
use crate::interfaces::RowStoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Rows and id sequence for one table.
#[derive(Debug, Default)]
struct MemoryTable {
    /// Last id handed out.
    last_id: i64,
    /// Rows in insertion order.
    rows: Vec<PolicyRow>,
}

/// Shared in-memory state.
#[derive(Debug, Default)]
struct MemoryState {
    /// Tables keyed by name.
    tables: BTreeMap<String, MemoryTable>,
    /// Set once `close` has been called.
    closed: bool,
}

/// In-memory row store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRowStore {
    /// Table map protected by a mutex.
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRowStore {
    /// Creates an empty in-memory row store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against the locked state, failing once the store is closed.
    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut MemoryState) -> Result<T, RowStoreError>,
    ) -> Result<T, RowStoreError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| RowStoreError::Io("in-memory row store mutex poisoned".to_string()))?;
        if guard.closed {
            return Err(RowStoreError::Closed);
        }
        f(&mut guard)
    }
}

/// Returns the named table or a missing-table error.
fn table_mut<'a>(
    state: &'a mut MemoryState,
    table: &str,
) -> Result<&'a mut MemoryTable, RowStoreError> {
    state
        .tables
        .get_mut(table)
        .ok_or_else(|| RowStoreError::Backend(format!("no such table: {table}")))
}

#[async_trait]
impl RowStore for InMemoryRowStore {
    async fn has_table(&self, table: &str) -> Result<bool, RowStoreError> {
        self.with_state(|state| Ok(state.tables.contains_key(table)))
    }

    async fn create_policy_table(&self, table: &str) -> Result<(), RowStoreError> {
        self.with_state(|state| {
            state.tables.entry(table.to_string()).or_default();
            Ok(())
        })
    }

    async fn drop_table_if_exists(&self, table: &str) -> Result<(), RowStoreError> {
        self.with_state(|state| {
            state.tables.remove(table);
            Ok(())
        })
    }

    async fn select_all(&self, table: &str) -> Result<Vec<PolicyRow>, RowStoreError> {
        self.with_state(|state| Ok(table_mut(state, table)?.rows.clone()))
    }

    async fn insert(&self, table: &str, rows: &[PolicyRow]) -> Result<(), RowStoreError> {
        self.with_state(|state| {
            let target = table_mut(state, table)?;
            for row in rows {
                target.last_id += 1;
                target.rows.push(PolicyRow {
                    id: Some(target.last_id),
                    ..row.clone()
                });
            }
            Ok(())
        })
    }

    async fn delete_where(
        &self,
        table: &str,
        predicate: &RowPredicate,
    ) -> Result<u64, RowStoreError> {
        self.with_state(|state| {
            let target = table_mut(state, table)?;
            let before = target.rows.len();
            target.rows.retain(|row| !predicate.matches(row));
            let removed = before - target.rows.len();
            Ok(u64::try_from(removed).unwrap_or(u64::MAX))
        })
    }

    async fn close(&self) -> Result<(), RowStoreError> {
        self.with_state(|state| {
            state.tables.clear();
            state.closed = true;
            Ok(())
        })
    }
}
