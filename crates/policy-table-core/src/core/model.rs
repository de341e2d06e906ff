// crates/policy-table-core/src/core/model.rs
// ============================================================================
// Module: Rule Model
// Description: In-memory rule set and the policy line loading capability.
// Purpose: Give the adapter a concrete model to read on save and append to on load.
// Dependencies: serde, tracing
// ============================================================================

//! ## Overview
//! A [`RuleSet`] groups rule tuples by top-level section (`p`, `g`) and policy
//! type. It is owned by the enforcement engine: the adapter only reads it
//! during save and appends into it during load.
//!
//! Lines are loaded through the injected [`PolicyLineLoader`] capability so the
//! codec never reaches into a specific engine implementation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Section holding permission rules.
pub const POLICY_SECTION: &str = "p";
/// Section holding role/group inheritance rules.
pub const GROUPING_SECTION: &str = "g";

// ============================================================================
// SECTION: Rule Set
// ============================================================================

/// Ordered rule tuples stored for one policy type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    /// Rule tuples in insertion order.
    pub policy: Vec<Vec<String>>,
}

/// Section -> policy type -> rules.
///
/// # Invariants
/// - Sections are declared up front; rules are never added to undeclared sections.
/// - Policy types are created on demand inside a declared section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Declared sections keyed by section name.
    sections: BTreeMap<String, BTreeMap<String, Assertion>>,
}

impl RuleSet {
    /// Creates a rule set with the `p` and `g` sections declared.
    #[must_use]
    pub fn new() -> Self {
        Self::with_sections([POLICY_SECTION, GROUPING_SECTION])
    }

    /// Creates a rule set declaring exactly the given sections.
    #[must_use]
    pub fn with_sections<I, S>(sections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sections: sections.into_iter().map(|name| (name.into(), BTreeMap::new())).collect(),
        }
    }

    /// Returns the policy types declared under `sec`.
    #[must_use]
    pub fn section(&self, sec: &str) -> Option<&BTreeMap<String, Assertion>> {
        self.sections.get(sec)
    }

    /// Appends a rule. Returns false when the section is not declared.
    pub fn add_rule(&mut self, sec: &str, ptype: &str, rule: Vec<String>) -> bool {
        let Some(section) = self.sections.get_mut(sec) else {
            return false;
        };
        section.entry(ptype.to_string()).or_default().policy.push(rule);
        true
    }

    /// Returns the rules stored for `ptype` under `sec`.
    #[must_use]
    pub fn rules(&self, sec: &str, ptype: &str) -> &[Vec<String>] {
        self.sections
            .get(sec)
            .and_then(|section| section.get(ptype))
            .map_or(&[], |assertion| assertion.policy.as_slice())
    }

    /// Returns true when `rule` is stored for `ptype` under `sec`.
    #[must_use]
    pub fn has_rule(&self, sec: &str, ptype: &str, rule: &[String]) -> bool {
        self.rules(sec, ptype).iter().any(|stored| stored.as_slice() == rule)
    }

    /// Returns the number of rules across every section.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.sections
            .values()
            .flat_map(BTreeMap::values)
            .map(|assertion| assertion.policy.len())
            .sum()
    }

    /// Removes every rule while keeping declared sections and policy types.
    pub fn clear_policy(&mut self) {
        for assertion in self.sections.values_mut().flat_map(BTreeMap::values_mut) {
            assertion.policy.clear();
        }
    }
}

// ============================================================================
// SECTION: Line Loading
// ============================================================================

/// Capability that parses a `"ptype, v0, v1, ..."` line into a rule set.
pub trait PolicyLineLoader: Send + Sync {
    /// Parses `line` and appends the resulting rule to `rules`.
    fn load_policy_line(&self, line: &str, rules: &mut RuleSet);
}

/// Comma-separated line loader.
///
/// # Invariants
/// - Blank lines and lines starting with `#` are ignored.
/// - A trailing empty token is kept as an empty value.
/// - The section is the first character of the policy type.
/// - Lines targeting an undeclared section are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvLineLoader;

impl PolicyLineLoader for CsvLineLoader {
    fn load_policy_line(&self, line: &str, rules: &mut RuleSet) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return;
        }
        let mut tokens = line.split(',').map(str::trim);
        let Some(ptype) = tokens.next() else {
            return;
        };
        let Some(first) = ptype.chars().next() else {
            return;
        };
        let sec = &ptype[.. first.len_utf8()];
        let rule: Vec<String> = tokens.map(str::to_string).collect();
        if !rules.add_rule(sec, ptype, rule) {
            tracing::debug!(ptype, "policy line targets an undeclared section");
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
