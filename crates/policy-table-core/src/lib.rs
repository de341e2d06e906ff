// crates/policy-table-core/src/lib.rs
// ============================================================================
// Module: Policy Table Core Library
// Description: Public API surface for the policy table adapter core.
// Purpose: Expose the row codec, rule model, storage interfaces, and adapter.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Policy Table core persists access-control policy rules in a fixed-width
//! relational table. It translates variable-arity rule tuples into rows and
//! back, and performs bulk load/save/add/remove operations with chunked
//! inserts and bounded delete concurrency. The SQL engine itself is consumed
//! through the [`RowStore`] interface.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::BatchPolicyAdapter;
pub use interfaces::PolicyAdapter;
pub use interfaces::RowStore;
pub use interfaces::RowStoreError;
pub use runtime::AdapterError;
pub use runtime::AdapterOptions;
pub use runtime::DEFAULT_CHUNK_SIZE;
pub use runtime::DEFAULT_CONCURRENT_DELETES;
pub use runtime::DEFAULT_TABLE_NAME;
pub use runtime::InMemoryRowStore;
pub use runtime::PolicyStore;
pub use runtime::validate_table_name;
