// crates/policy-table-core/src/core/codec.rs
// ============================================================================
// Module: Row Codec
// Description: Pure translation between rule tuples, rows, and predicates.
// Purpose: Implement the tuple <-> fixed-width row mapping exactly once.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The codec maps a `(ptype, values)` rule tuple onto the fixed six-field row
//! and back, and maps filter descriptors onto sparse row predicates. All
//! functions are deterministic and perform no I/O.
//!
//! ## Invariants
//! - Position `i` maps to field `vi`; values past the sixth are not stored.
//! - Filters only constrain positions inside the supplied value range.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::model::PolicyLineLoader;
use crate::core::model::RuleSet;
use crate::core::row::MAX_RULE_FIELDS;
use crate::core::row::PolicyRow;
use crate::core::row::RowPredicate;

// ============================================================================
// SECTION: Line Rendering
// ============================================================================

/// Controls which stored fields are dropped when rendering a policy line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRendering {
    /// Drop unset, empty, and `"0"` fields. Lossy for those values.
    #[default]
    SkipFalsy,
    /// Drop unset fields only.
    SkipNull,
}

impl FieldRendering {
    /// Returns true when a stored value is kept in the rendered line.
    #[must_use]
    pub fn keeps(self, value: &str) -> bool {
        match self {
            Self::SkipFalsy => !value.is_empty() && value != "0",
            Self::SkipNull => true,
        }
    }
}

// ============================================================================
// SECTION: Encoding
// ============================================================================

/// Encodes a rule tuple into a row.
///
/// Positions past the sixth are ignored; unused positions stay `None`.
#[must_use]
pub fn encode_rule<S: AsRef<str>>(ptype: &str, values: &[S]) -> PolicyRow {
    let mut row = PolicyRow {
        ptype: Some(ptype.to_string()),
        ..PolicyRow::default()
    };
    for (index, value) in values.iter().enumerate().take(MAX_RULE_FIELDS) {
        if let Some(slot) = row.field_mut(index) {
            *slot = Some(value.as_ref().to_string());
        }
    }
    row
}

/// Encodes a filter descriptor into a sparse predicate.
///
/// `field_values[k]` constrains position `field_index + k` when that position
/// exists; every other position is left unconstrained.
#[must_use]
pub fn encode_filter<S: AsRef<str>>(
    ptype: &str,
    field_index: usize,
    field_values: &[S],
) -> RowPredicate {
    let mut predicate = RowPredicate::for_ptype(ptype);
    for (offset, value) in field_values.iter().enumerate() {
        let Some(position) = field_index.checked_add(offset) else {
            break;
        };
        if position >= MAX_RULE_FIELDS {
            break;
        }
        predicate = predicate.with_field(position, value.as_ref());
    }
    predicate
}

/// Builds the full-match predicate for an encoded row.
///
/// Only populated positions are constrained, so a short rule also matches
/// longer rows sharing its prefix.
#[must_use]
pub fn rule_predicate(row: &PolicyRow) -> RowPredicate {
    let mut predicate = RowPredicate::new();
    if let Some(ptype) = row.ptype.as_deref() {
        predicate = predicate.with_ptype(ptype);
    }
    for (index, value) in row.fields().into_iter().enumerate() {
        if let Some(value) = value {
            predicate = predicate.with_field(index, value);
        }
    }
    predicate
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Renders a row as the canonical `"ptype, v0, v1, ..."` policy line.
///
/// The separator after the policy type is always present, so a row whose
/// values are all dropped renders as `"ptype, "` and loads as one empty value.
#[must_use]
pub fn render_policy_line(row: &PolicyRow, rendering: FieldRendering) -> String {
    let kept: Vec<&str> =
        row.fields().into_iter().flatten().filter(|value| rendering.keeps(value)).collect();
    format!("{}, {}", row.ptype.as_deref().unwrap_or_default(), kept.join(", "))
}

/// Renders a row and feeds the line into the rule set through `loader`.
pub fn decode_row(
    row: &PolicyRow,
    rendering: FieldRendering,
    loader: &dyn PolicyLineLoader,
    rules: &mut RuleSet,
) {
    let line = render_policy_line(row, rendering);
    loader.load_policy_line(&line, rules);
}

// ============================================================================
// SECTION: Tests
// ============================================================================
