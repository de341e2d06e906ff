// crates/policy-table-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Temporary config files and invalid-result assertions.
// Purpose: Share fixture plumbing across config test suites.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::io::Write;

use policy_table_config::ConfigError;
use policy_table_config::PolicyTableConfig;
use tempfile::NamedTempFile;

/// Result type used by config tests.
pub type TestResult = Result<(), String>;

/// Writes `content` to a temporary `.toml` file.
pub fn write_config(content: &str) -> Result<NamedTempFile, String> {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .map_err(|err| err.to_string())?;
    file.write_all(content.as_bytes()).map_err(|err| err.to_string())?;
    Ok(file)
}

/// Asserts that `result` failed with a message containing `needle`.
pub fn assert_invalid(result: Result<PolicyTableConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}
