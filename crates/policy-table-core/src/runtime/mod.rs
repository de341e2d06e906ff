// crates/policy-table-core/src/runtime/mod.rs
// ============================================================================
// Module: Policy Table Runtime
// Description: Policy store orchestration and the in-memory row store.
// Purpose: Execute load/save/add/remove against any row store.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement the [`PolicyStore`] adapter, which owns table
//! lifecycle and the chunking/concurrency policies for bulk operations, and a
//! simple in-memory [`crate::RowStore`] for tests and local demos.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod adapter;
pub mod memory;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use adapter::AdapterError;
pub use adapter::AdapterOptions;
pub use adapter::DEFAULT_CHUNK_SIZE;
pub use adapter::DEFAULT_CONCURRENT_DELETES;
pub use adapter::DEFAULT_TABLE_NAME;
pub use adapter::PolicyStore;
pub use adapter::validate_table_name;
pub use memory::InMemoryRowStore;
