// crates/policy-table-core/src/core/mod.rs
// ============================================================================
// Module: Policy Table Core Types
// Description: Row records, predicates, the rule model, and the row codec.
// Purpose: Provide the canonical tuple <-> row mapping used by every store.
// Dependencies: serde, tracing
// ============================================================================

//! ## Overview
//! Core types define the fixed-width policy row, sparse row predicates, the
//! in-memory rule set owned by the enforcement engine, and the pure codec that
//! translates between them. Nothing in this module performs I/O.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod codec;
pub mod model;
pub mod row;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use codec::FieldRendering;
pub use codec::decode_row;
pub use codec::encode_filter;
pub use codec::encode_rule;
pub use codec::render_policy_line;
pub use codec::rule_predicate;
pub use model::Assertion;
pub use model::CsvLineLoader;
pub use model::GROUPING_SECTION;
pub use model::POLICY_SECTION;
pub use model::PolicyLineLoader;
pub use model::RuleSet;
pub use row::FIELD_COLUMNS;
pub use row::FilterSpec;
pub use row::MAX_RULE_FIELDS;
pub use row::PolicyRow;
pub use row::PolicyRule;
pub use row::RowPredicate;
