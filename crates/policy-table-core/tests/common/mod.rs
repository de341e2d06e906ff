// crates/policy-table-core/tests/common/mod.rs
// =============================================================================
// Module: Policy Store Test Helpers
// Description: Recording row store and rule builders shared by test suites.
// Purpose: Observe insert batching and delete concurrency, and inject failures.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use policy_table_core::InMemoryRowStore;
use policy_table_core::PolicyRow;
use policy_table_core::RowPredicate;
use policy_table_core::RowStore;
use policy_table_core::RowStoreError;

/// Snapshot of delete scheduling observed by [`RecordingRowStore`].
#[derive(Debug, Clone, Default)]
pub struct DeleteTrace {
    /// Deletes currently awaiting the inner store.
    pub in_flight: usize,
    /// Highest number of simultaneous deletes observed.
    pub max_in_flight: usize,
    /// Deletes that have finished.
    pub completed: usize,
    /// For each delete in start order, how many had finished when it started.
    pub completed_at_start: Vec<usize>,
}

/// Row store wrapper that records insert batch sizes and delete overlap.
pub struct RecordingRowStore {
    /// Store receiving the delegated calls.
    inner: InMemoryRowStore,
    /// Row count of every insert call, in order.
    insert_batches: Mutex<Vec<usize>>,
    /// Delete scheduling trace.
    deletes: Mutex<DeleteTrace>,
    /// Artificial latency applied to each delete.
    delete_delay: Duration,
}

impl RecordingRowStore {
    /// Creates a recorder with no artificial delete latency.
    pub fn new() -> Self {
        Self::with_delete_delay(Duration::ZERO)
    }

    /// Creates a recorder that holds each delete open for `delete_delay`.
    pub fn with_delete_delay(delete_delay: Duration) -> Self {
        Self {
            inner: InMemoryRowStore::new(),
            insert_batches: Mutex::new(Vec::new()),
            deletes: Mutex::new(DeleteTrace::default()),
            delete_delay,
        }
    }

    /// Returns the row count of every insert call so far.
    pub fn insert_batches(&self) -> Vec<usize> {
        self.insert_batches.lock().unwrap().clone()
    }

    /// Returns the delete scheduling trace so far.
    pub fn delete_trace(&self) -> DeleteTrace {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl RowStore for RecordingRowStore {
    async fn has_table(&self, table: &str) -> Result<bool, RowStoreError> {
        self.inner.has_table(table).await
    }

    async fn create_policy_table(&self, table: &str) -> Result<(), RowStoreError> {
        self.inner.create_policy_table(table).await
    }

    async fn drop_table_if_exists(&self, table: &str) -> Result<(), RowStoreError> {
        self.inner.drop_table_if_exists(table).await
    }

    async fn select_all(&self, table: &str) -> Result<Vec<PolicyRow>, RowStoreError> {
        self.inner.select_all(table).await
    }

    async fn insert(&self, table: &str, rows: &[PolicyRow]) -> Result<(), RowStoreError> {
        self.insert_batches.lock().unwrap().push(rows.len());
        self.inner.insert(table, rows).await
    }

    async fn delete_where(
        &self,
        table: &str,
        predicate: &RowPredicate,
    ) -> Result<u64, RowStoreError> {
        {
            let mut trace = self.deletes.lock().unwrap();
            let completed = trace.completed;
            trace.completed_at_start.push(completed);
            trace.in_flight += 1;
            trace.max_in_flight = trace.max_in_flight.max(trace.in_flight);
        }
        tokio::time::sleep(self.delete_delay).await;
        let result = self.inner.delete_where(table, predicate).await;
        {
            let mut trace = self.deletes.lock().unwrap();
            trace.in_flight -= 1;
            trace.completed += 1;
        }
        result
    }

    async fn close(&self) -> Result<(), RowStoreError> {
        self.inner.close().await
    }
}

/// Row store call that [`FailingRowStore`] rejects once armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    /// Fail the n-th insert (1-based) after arming.
    Insert(usize),
    /// Fail the n-th delete (1-based) after arming, without deleting.
    Delete(usize),
    /// Fail every drop after arming.
    Drop,
    /// Fail every table creation after arming.
    Create,
}

/// Row store wrapper that injects a backend failure at one call site.
///
/// Calls delegate untouched until [`FailingRowStore::arm`]; call counters
/// start at arming time.
pub struct FailingRowStore {
    /// Store receiving the delegated calls.
    inner: InMemoryRowStore,
    /// Call to reject.
    fail_point: FailPoint,
    /// Set once failures should be injected.
    armed: AtomicBool,
    /// Inserts attempted since arming.
    insert_calls: AtomicUsize,
    /// Deletes attempted since arming.
    delete_calls: AtomicUsize,
}

impl FailingRowStore {
    /// Creates a disarmed wrapper failing at `fail_point`.
    pub fn new(fail_point: FailPoint) -> Self {
        Self {
            inner: InMemoryRowStore::new(),
            fail_point,
            armed: AtomicBool::new(false),
            insert_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// Starts injecting failures and counting calls.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Returns the number of inserts attempted since arming.
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    /// Returns the number of deletes attempted since arming.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Returns true when failures are being injected.
    fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Error returned for every injected failure.
    fn injected(call: &str) -> RowStoreError {
        RowStoreError::Backend(format!("injected {call} failure"))
    }
}

#[async_trait]
impl RowStore for FailingRowStore {
    async fn has_table(&self, table: &str) -> Result<bool, RowStoreError> {
        self.inner.has_table(table).await
    }

    async fn create_policy_table(&self, table: &str) -> Result<(), RowStoreError> {
        if self.is_armed() && self.fail_point == FailPoint::Create {
            return Err(Self::injected("create"));
        }
        self.inner.create_policy_table(table).await
    }

    async fn drop_table_if_exists(&self, table: &str) -> Result<(), RowStoreError> {
        if self.is_armed() && self.fail_point == FailPoint::Drop {
            return Err(Self::injected("drop"));
        }
        self.inner.drop_table_if_exists(table).await
    }

    async fn select_all(&self, table: &str) -> Result<Vec<PolicyRow>, RowStoreError> {
        self.inner.select_all(table).await
    }

    async fn insert(&self, table: &str, rows: &[PolicyRow]) -> Result<(), RowStoreError> {
        if self.is_armed() {
            let call = self.insert_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_point == FailPoint::Insert(call) {
                return Err(Self::injected("insert"));
            }
        }
        self.inner.insert(table, rows).await
    }

    async fn delete_where(
        &self,
        table: &str,
        predicate: &RowPredicate,
    ) -> Result<u64, RowStoreError> {
        if self.is_armed() {
            let call = self.delete_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_point == FailPoint::Delete(call) {
                return Err(Self::injected("delete"));
            }
        }
        self.inner.delete_where(table, predicate).await
    }

    async fn close(&self) -> Result<(), RowStoreError> {
        self.inner.close().await
    }
}

/// Builds a rule tuple from string slices.
pub fn rule(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

/// Builds `count` distinct three-field rules.
pub fn numbered_rules(count: usize) -> Vec<Vec<String>> {
    (0 .. count).map(|index| rule(&[&format!("user{index}"), "resource", "read"])).collect()
}
