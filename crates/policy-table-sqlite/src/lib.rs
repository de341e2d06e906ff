// crates/policy-table-sqlite/src/lib.rs
// ============================================================================
// Module: Policy Table SQLite Library
// Description: Public API surface for the SQLite row store.
// Purpose: Expose the SQLite-backed RowStore and its configuration.
// Dependencies: crate::store
// ============================================================================

//! ## Overview
//! `SQLite` backend for the policy table adapter. [`SqliteRowStore`]
//! implements [`policy_table_core::RowStore`] over a single mutex-guarded
//! connection, running each statement on the blocking thread pool.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteJournalMode;
pub use store::SqliteRowStore;
pub use store::SqliteRowStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteSyncMode;
