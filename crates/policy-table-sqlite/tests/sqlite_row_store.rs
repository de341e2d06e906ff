// crates/policy-table-sqlite/tests/sqlite_row_store.rs
// ============================================================================
// Module: SQLite Row Store Tests
// Description: Policy adapter behavior against a real SQLite database.
// Purpose: Validate schema layout, path safety, chunked inserts, filtered
//          deletes, full-replace save, and close semantics on disk.
// ============================================================================

//! ## Overview
//! Integration tests for [`SqliteRowStore`]:
//! - Table layout and idempotent creation
//! - Path safety checks (empty path, directory rejection)
//! - Bulk add/remove through [`PolicyStore`] and multi-statement inserts
//! - Save/load round trip and persistence across reopen

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::path::Path;
use std::sync::Arc;

use policy_table_core::AdapterError;
use policy_table_core::AdapterOptions;
use policy_table_core::BatchPolicyAdapter;
use policy_table_core::PolicyAdapter;
use policy_table_core::PolicyStore;
use policy_table_core::RowPredicate;
use policy_table_core::RowStore;
use policy_table_core::RowStoreError;
use policy_table_core::RuleSet;
use policy_table_core::encode_rule;
use policy_table_sqlite::SqliteJournalMode;
use policy_table_sqlite::SqliteRowStore;
use policy_table_sqlite::SqliteRowStoreConfig;
use policy_table_sqlite::SqliteStoreError;
use policy_table_sqlite::SqliteSyncMode;
use rusqlite::Connection;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn rule(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

fn store_at(path: &Path) -> SqliteRowStore {
    SqliteRowStore::open(&SqliteRowStoreConfig::new(path)).expect("open sqlite store")
}

async fn policy_store_at(path: &Path, options: AdapterOptions) -> PolicyStore {
    PolicyStore::open(Arc::new(store_at(path)), options).await.expect("open policy store")
}

fn column_names(path: &Path, table: &str) -> Vec<String> {
    let connection = Connection::open(path).unwrap();
    let mut statement = connection.prepare(&format!("PRAGMA table_info(\"{table}\")")).unwrap();
    statement
        .query_map([], |row| row.get::<_, String>(1))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

fn row_count(path: &Path, table: &str) -> i64 {
    let connection = Connection::open(path).unwrap();
    connection
        .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| row.get(0))
        .unwrap()
}

// ============================================================================
// SECTION: Schema and Paths
// ============================================================================

#[tokio::test]
async fn open_creates_fixed_width_policy_table() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("policies.db");
    let store = policy_store_at(&path, AdapterOptions::default()).await;

    assert_eq!(
        column_names(&path, "policies"),
        vec!["id", "ptype", "v0", "v1", "v2", "v3", "v4", "v5"]
    );
    store.close().await.unwrap();
}

#[tokio::test]
async fn create_table_is_idempotent_and_keeps_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("policies.db");
    let store = policy_store_at(&path, AdapterOptions::default()).await;
    store.add_policy("p", "p", &rule(&["alice", "data1", "read"])).await.unwrap();

    store.create_table().await.unwrap();

    assert_eq!(row_count(&path, "policies"), 1);
}

#[test]
fn open_rejects_empty_path() {
    let result = SqliteRowStore::open(&SqliteRowStoreConfig::new(""));

    assert!(matches!(result, Err(SqliteStoreError::Invalid(_))));
}

#[test]
fn open_rejects_directory_path() {
    let dir = TempDir::new().unwrap();
    let result = SqliteRowStore::open(&SqliteRowStoreConfig::new(dir.path()));

    assert!(matches!(result, Err(SqliteStoreError::Invalid(_))));
}

#[test]
fn open_honors_delete_journal_mode() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("policies.db");
    let config = SqliteRowStoreConfig {
        journal_mode: SqliteJournalMode::Delete,
        sync_mode: SqliteSyncMode::Normal,
        ..SqliteRowStoreConfig::new(&path)
    };
    let _store = SqliteRowStore::open(&config).unwrap();

    let connection = Connection::open(&path).unwrap();
    let mode: String = connection.query_row("PRAGMA journal_mode", [], |row| row.get(0)).unwrap();
    assert_eq!(mode, "delete");
}

#[tokio::test]
async fn custom_table_name_is_used() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("policies.db");
    let store = policy_store_at(&path, AdapterOptions::default().with_table_name("casbin")).await;
    store.add_policy("g", "g", &rule(&["alice", "admin"])).await.unwrap();

    assert_eq!(row_count(&path, "casbin"), 1);
    assert!(!store_at(&path).has_table("policies").await.unwrap());
}

// ============================================================================
// SECTION: Bulk Operations
// ============================================================================

#[tokio::test]
async fn add_policies_persists_every_chunk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("policies.db");
    let store = policy_store_at(&path, AdapterOptions::default()).await;
    let rules: Vec<Vec<String>> =
        (0 .. 250).map(|index| rule(&[&format!("user{index}"), "resource", "read"])).collect();

    store.add_policies("p", "p", &rules).await.unwrap();

    let mut loaded = RuleSet::new();
    store.load_policy(&mut loaded).await.unwrap();
    assert_eq!(loaded.rules("p", "p").len(), 250);
    assert_eq!(loaded.rules("p", "p")[0], rule(&["user0", "resource", "read"]));
}

#[tokio::test]
async fn remove_policies_deletes_every_listed_rule() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("policies.db");
    let store = policy_store_at(&path, AdapterOptions::default()).await;
    let rules: Vec<Vec<String>> =
        (0 .. 12).map(|index| rule(&[&format!("user{index}"), "resource", "read"])).collect();
    store.add_policies("p", "p", &rules).await.unwrap();
    store.add_policy("p", "p", &rule(&["keeper", "resource", "read"])).await.unwrap();

    let removed = store.remove_policies("p", "p", &rules).await.unwrap();

    assert_eq!(removed, 12);
    assert_eq!(row_count(&path, "policies"), 1);
}

#[tokio::test]
async fn remove_filtered_policy_matches_from_field_index() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("policies.db");
    let store = policy_store_at(&path, AdapterOptions::default()).await;
    store.add_policy("p", "p", &rule(&["alice", "data1", "read"])).await.unwrap();
    store.add_policy("p", "p", &rule(&["bob", "data1", "read"])).await.unwrap();
    store.add_policy("p", "p", &rule(&["bob", "data2", "write"])).await.unwrap();

    let removed =
        store.remove_filtered_policy("p", "p", 1, &rule(&["data1", "read"])).await.unwrap();

    assert_eq!(removed, 2);
    let mut loaded = RuleSet::new();
    store.load_policy(&mut loaded).await.unwrap();
    assert_eq!(loaded.rules("p", "p"), &[rule(&["bob", "data2", "write"])][..]);
}

#[tokio::test]
async fn empty_predicate_clears_the_table() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("policies.db");
    let rows = store_at(&path);
    rows.create_policy_table("policies").await.unwrap();
    rows.insert(
        "policies",
        &[encode_rule("p", &["alice", "data1", "read"]), encode_rule("g", &["alice", "admin"])],
    )
    .await
    .unwrap();

    let removed = rows.delete_where("policies", &RowPredicate::new()).await.unwrap();

    assert_eq!(removed, 2);
    assert!(rows.select_all("policies").await.unwrap().is_empty());
}

// ============================================================================
// SECTION: Save and Load
// ============================================================================

#[tokio::test]
async fn save_replaces_rows_and_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("policies.db");
    let store = policy_store_at(&path, AdapterOptions::default()).await;
    store.add_policy("p", "p", &rule(&["stale", "data", "read"])).await.unwrap();

    let mut rules = RuleSet::new();
    rules.add_rule("p", "p", rule(&["alice", "data1", "read"]));
    rules.add_rule("p", "p2", rule(&["carol", "tenant1", "data3", "read"]));
    rules.add_rule("g", "g", rule(&["alice", "admin"]));
    assert!(store.save_policy(&rules).await);
    store.close().await.unwrap();

    let reopened = policy_store_at(&path, AdapterOptions::default()).await;
    let mut loaded = RuleSet::new();
    reopened.load_policy(&mut loaded).await.unwrap();
    assert_eq!(loaded, rules);
}

#[tokio::test]
async fn rows_keep_insertion_ids() {
    let rows = SqliteRowStore::open_in_memory().unwrap();
    rows.create_policy_table("policies").await.unwrap();
    rows.insert("policies", &[encode_rule("p", &["a"]), encode_rule("p", &["b"])]).await.unwrap();

    let stored = rows.select_all("policies").await.unwrap();

    assert_eq!(stored.iter().map(|row| row.id).collect::<Vec<_>>(), vec![Some(1), Some(2)]);
    assert_eq!(stored[1].v0.as_deref(), Some("b"));
    assert_eq!(stored[1].v1, None);
}

#[tokio::test]
async fn large_insert_spans_several_statements_in_one_transaction() {
    let rows = SqliteRowStore::open_in_memory().unwrap();
    rows.create_policy_table("policies").await.unwrap();
    let batch: Vec<_> = (0 .. 1_200)
        .map(|index| encode_rule("p", &[format!("user{index}"), "resource".to_string()]))
        .collect();

    rows.insert("policies", &batch).await.unwrap();

    let stored = rows.select_all("policies").await.unwrap();
    assert_eq!(stored.len(), 1_200);
    assert_eq!(stored[1_199].id, Some(1_200));
    assert_eq!(stored[1_199].v0.as_deref(), Some("user1199"));
    assert_eq!(stored[1_199].v2, None);
}

#[tokio::test]
async fn insert_into_missing_table_reports_backend_error() {
    let rows = SqliteRowStore::open_in_memory().unwrap();

    let result = rows.insert("policies", &[encode_rule("p", &["alice"])]).await;

    assert!(matches!(result, Err(RowStoreError::Backend(_))));
    assert!(!rows.has_table("policies").await.unwrap());
}

// ============================================================================
// SECTION: Close
// ============================================================================

#[tokio::test]
async fn operations_after_close_report_closed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("policies.db");
    let store = policy_store_at(&path, AdapterOptions::default()).await;
    store.close().await.unwrap();

    let error = store.add_policy("p", "p", &rule(&["alice", "data1", "read"])).await.unwrap_err();

    assert_eq!(error, AdapterError::Store(RowStoreError::Closed));
}
