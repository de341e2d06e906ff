// crates/policy-table-config/src/lib.rs
// ============================================================================
// Module: Policy Table Config Library
// Description: Configuration model, validation, and store wiring.
// Purpose: Single source of truth for policy-table.toml semantics.
// Dependencies: policy-table-core, policy-table-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `policy-table-config` loads `policy-table.toml`, validates it fail-closed,
//! and opens a ready [`policy_table_core::PolicyStore`] over the configured
//! backing row store.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
