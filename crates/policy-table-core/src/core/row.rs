// crates/policy-table-core/src/core/row.rs
// ============================================================================
// Module: Policy Rows
// Description: Fixed-width policy rows, sparse row predicates, and rule records.
// Purpose: Provide the storage-boundary shapes shared by all row stores.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`PolicyRow`] is the fixed 8-column record persisted by every row store:
//! a surrogate id, the policy type, and six positional value fields. A
//! [`RowPredicate`] is a sparse partial row used to select rows for deletion.
//! [`PolicyRule`] is the in-memory tagged record converted to and from rows
//! only at the storage boundary.
//!
//! ## Invariants
//! - Position `i` of a rule always maps to field `vi`.
//! - Unused positions are `None`, never the empty string.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::codec::encode_filter;
use crate::core::codec::encode_rule;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum number of positional values a rule may carry.
pub const MAX_RULE_FIELDS: usize = 6;

/// Column names for the positional value fields, indexed by position.
pub const FIELD_COLUMNS: [&str; MAX_RULE_FIELDS] = ["v0", "v1", "v2", "v3", "v4", "v5"];

// ============================================================================
// SECTION: Policy Row
// ============================================================================

/// One stored policy row.
///
/// # Invariants
/// - `id` is assigned by storage and is `None` for rows built by the codec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRow {
    /// Surrogate identifier assigned by storage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Policy type discriminator (`p`, `g`, `p2`, ...).
    pub ptype: Option<String>,
    /// Positional value 0.
    pub v0: Option<String>,
    /// Positional value 1.
    pub v1: Option<String>,
    /// Positional value 2.
    pub v2: Option<String>,
    /// Positional value 3.
    pub v3: Option<String>,
    /// Positional value 4.
    pub v4: Option<String>,
    /// Positional value 5.
    pub v5: Option<String>,
}

impl PolicyRow {
    /// Returns the value stored at `index`, if the position exists and is set.
    #[must_use]
    pub fn field(&self, index: usize) -> Option<&str> {
        match index {
            0 => self.v0.as_deref(),
            1 => self.v1.as_deref(),
            2 => self.v2.as_deref(),
            3 => self.v3.as_deref(),
            4 => self.v4.as_deref(),
            5 => self.v5.as_deref(),
            _ => None,
        }
    }

    /// Returns the slot for position `index`, or `None` past the last field.
    pub const fn field_mut(&mut self, index: usize) -> Option<&mut Option<String>> {
        match index {
            0 => Some(&mut self.v0),
            1 => Some(&mut self.v1),
            2 => Some(&mut self.v2),
            3 => Some(&mut self.v3),
            4 => Some(&mut self.v4),
            5 => Some(&mut self.v5),
            _ => None,
        }
    }

    /// Returns all six positional values in order.
    #[must_use]
    pub fn fields(&self) -> [Option<&str>; MAX_RULE_FIELDS] {
        [
            self.v0.as_deref(),
            self.v1.as_deref(),
            self.v2.as_deref(),
            self.v3.as_deref(),
            self.v4.as_deref(),
            self.v5.as_deref(),
        ]
    }
}

// ============================================================================
// SECTION: Row Predicate
// ============================================================================

/// Sparse partial-row constraint used for conditional deletion.
///
/// # Invariants
/// - Absent entries are unconstrained; an empty predicate matches every row.
/// - Present entries match by exact string equality.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowPredicate {
    /// Required policy type, if constrained.
    ptype: Option<String>,
    /// Required positional values, if constrained.
    fields: [Option<String>; MAX_RULE_FIELDS],
}

impl RowPredicate {
    /// Creates an empty predicate that matches every row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a predicate constrained to a single policy type.
    #[must_use]
    pub fn for_ptype(ptype: impl Into<String>) -> Self {
        Self::new().with_ptype(ptype)
    }

    /// Constrains the policy type.
    #[must_use]
    pub fn with_ptype(mut self, ptype: impl Into<String>) -> Self {
        self.ptype = Some(ptype.into());
        self
    }

    /// Constrains the value at `index`. Indices past the last field are ignored.
    #[must_use]
    pub fn with_field(mut self, index: usize, value: impl Into<String>) -> Self {
        if let Some(slot) = self.fields.get_mut(index) {
            *slot = Some(value.into());
        }
        self
    }

    /// Returns the constrained policy type.
    #[must_use]
    pub fn ptype(&self) -> Option<&str> {
        self.ptype.as_deref()
    }

    /// Returns the constrained value at `index`.
    #[must_use]
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).and_then(Option::as_deref)
    }

    /// Returns true when the predicate constrains nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ptype.is_none() && self.fields.iter().all(Option::is_none)
    }

    /// Returns `(column, value)` pairs for every constrained column, `ptype` first.
    #[must_use]
    pub fn constraints(&self) -> Vec<(&'static str, &str)> {
        let mut constraints = Vec::with_capacity(MAX_RULE_FIELDS + 1);
        if let Some(ptype) = self.ptype.as_deref() {
            constraints.push(("ptype", ptype));
        }
        for (column, value) in FIELD_COLUMNS.iter().zip(self.fields.iter()) {
            if let Some(value) = value.as_deref() {
                constraints.push((*column, value));
            }
        }
        constraints
    }

    /// Returns true when `row` satisfies every constrained column.
    #[must_use]
    pub fn matches(&self, row: &PolicyRow) -> bool {
        if let Some(ptype) = self.ptype.as_deref()
            && row.ptype.as_deref() != Some(ptype)
        {
            return false;
        }
        self.fields.iter().enumerate().all(|(index, expected)| match expected.as_deref() {
            Some(expected) => row.field(index) == Some(expected),
            None => true,
        })
    }
}

// ============================================================================
// SECTION: Rule Records
// ============================================================================

/// Tagged in-memory rule record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Policy type discriminator.
    pub ptype: String,
    /// Ordered positional values (at most [`MAX_RULE_FIELDS`] are stored).
    pub values: Vec<String>,
}

impl PolicyRule {
    /// Creates a rule record.
    #[must_use]
    pub fn new(ptype: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            ptype: ptype.into(),
            values,
        }
    }

    /// Encodes the rule into a storage row.
    #[must_use]
    pub fn to_row(&self) -> PolicyRow {
        encode_rule(&self.ptype, &self.values)
    }

    /// Rebuilds a rule from a row.
    ///
    /// Values are read positionally and stop at the first unset field. Rows
    /// without a policy type yield `None`.
    #[must_use]
    pub fn from_row(row: &PolicyRow) -> Option<Self> {
        let ptype = row.ptype.clone()?;
        let values = row.fields().into_iter().map_while(|value| value.map(str::to_string)).collect();
        Some(Self {
            ptype,
            values,
        })
    }
}

/// Filter descriptor for wildcard-style deletion.
///
/// `field_values[k]` constrains absolute position `field_index + k`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Policy type to match.
    pub ptype: String,
    /// Absolute position of the first constrained field.
    pub field_index: usize,
    /// Values for consecutive positions starting at `field_index`.
    pub field_values: Vec<String>,
}

impl FilterSpec {
    /// Creates a filter descriptor.
    #[must_use]
    pub fn new(ptype: impl Into<String>, field_index: usize, field_values: Vec<String>) -> Self {
        Self {
            ptype: ptype.into(),
            field_index,
            field_values,
        }
    }

    /// Builds the sparse row predicate for this filter.
    #[must_use]
    pub fn to_predicate(&self) -> RowPredicate {
        encode_filter(&self.ptype, self.field_index, &self.field_values)
    }
}
