//! In-memory storage for tests.

use crate::environment::{Clock, SystemClock};
use crate::error::{StorageError, StorageResult};
use crate::normalize::normalize_all;
use crate::storage::{CarolStorage, ClaimOutcome, InsertOutcome};
use crate::stores::table::{CatalogTable, SubmissionTable};
use crate::types::{CarolId, CatalogItem, NewSubmission, RawCatalogItem, Submission, Team};
use futures::future::{BoxFuture, FutureExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory [`CarolStorage`].
///
/// Clones share the same tables.
#[derive(Clone)]
pub struct InMemoryStorage {
    catalog: Arc<Mutex<CatalogTable>>,
    submissions: Arc<Mutex<SubmissionTable>>,
    clock: Arc<dyn Clock>,
    fail_submission_writes: Arc<AtomicBool>,
}

impl InMemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            catalog: Arc::new(Mutex::new(CatalogTable::default())),
            submissions: Arc::new(Mutex::new(SubmissionTable::default())),
            clock: Arc::new(SystemClock),
            fail_submission_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a store holding `items`.
    #[must_use]
    pub fn with_catalog(items: &[CatalogItem]) -> Self {
        Self::with_raw_catalog(items.iter().map(RawCatalogItem::from).collect())
    }

    /// Create a store holding raw, un-normalized rows.
    #[must_use]
    pub fn with_raw_catalog(rows: Vec<RawCatalogItem>) -> Self {
        let store = Self::new();
        if let Ok(mut catalog) = store.catalog.lock() {
            *catalog = CatalogTable::new(rows);
        }
        store
    }

    /// Use `clock` for submission timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Make every subsequent submission insert fail.
    pub fn fail_submission_writes(&self, fail: bool) {
        self.fail_submission_writes.store(fail, Ordering::SeqCst);
    }

    /// Current catalog, normalized and ordered by id.
    #[must_use]
    pub fn catalog(&self) -> Vec<CatalogItem> {
        self.catalog
            .lock()
            .map(|table| normalize_all(&table.sorted_rows()))
            .unwrap_or_default()
    }

    /// Current submissions, newest first.
    #[must_use]
    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions
            .lock()
            .map(|table| table.newest_first())
            .unwrap_or_default()
    }

    fn with_catalog_table<T>(&self, f: impl FnOnce(&mut CatalogTable) -> T) -> StorageResult<T> {
        let mut table = self
            .catalog
            .lock()
            .map_err(|_| StorageError::Unavailable("catalog lock poisoned".to_string()))?;
        Ok(f(&mut table))
    }

    fn with_submission_table<T>(
        &self,
        f: impl FnOnce(&mut SubmissionTable) -> T,
    ) -> StorageResult<T> {
        let mut table = self
            .submissions
            .lock()
            .map_err(|_| StorageError::Unavailable("submission lock poisoned".to_string()))?;
        Ok(f(&mut table))
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl CarolStorage for InMemoryStorage {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn read_all_catalog_items(&self) -> BoxFuture<'_, StorageResult<Vec<RawCatalogItem>>> {
        let result = self.with_catalog_table(|table| table.sorted_rows());
        async move { result }.boxed()
    }

    fn upsert_catalog_items(&self, items: Vec<CatalogItem>) -> BoxFuture<'_, StorageResult<()>> {
        let result = self.with_catalog_table(|table| table.upsert(items));
        async move { result }.boxed()
    }

    fn claim_item<'a>(
        &'a self,
        id: CarolId,
        branch: &'a str,
        team: Team,
    ) -> BoxFuture<'a, StorageResult<ClaimOutcome>> {
        let result = self.with_catalog_table(|table| table.claim(id, branch, team));
        async move { result }.boxed()
    }

    fn release_item<'a>(&'a self, id: CarolId, branch: &'a str) -> BoxFuture<'a, StorageResult<bool>> {
        let result = self.with_catalog_table(|table| table.release(id, branch));
        async move { result }.boxed()
    }

    fn insert_item(&self, item: CatalogItem) -> BoxFuture<'_, StorageResult<InsertOutcome>> {
        let result = self.with_catalog_table(|table| table.insert(&item));
        async move { result }.boxed()
    }

    fn insert_submission(&self, submission: NewSubmission) -> BoxFuture<'_, StorageResult<Submission>> {
        let result = if self.fail_submission_writes.load(Ordering::SeqCst) {
            Err(StorageError::Database("submissions table unavailable".to_string()))
        } else {
            let now = self.clock.now();
            self.with_submission_table(|table| table.insert(submission, now))
        };
        async move { result }.boxed()
    }

    fn read_all_submissions(&self) -> BoxFuture<'_, StorageResult<Vec<Submission>>> {
        let result = self.with_submission_table(|table| table.newest_first());
        async move { result }.boxed()
    }

    fn read_submissions_by_branch<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, StorageResult<Vec<Submission>>> {
        let result = self.with_submission_table(|table| table.by_branch(name));
        async move { result }.boxed()
    }

    fn delete_submissions_by_branch<'a>(&'a self, name: &'a str) -> BoxFuture<'a, StorageResult<u64>> {
        let result = self.with_submission_table(|table| table.delete_by_branch(name));
        async move { result }.boxed()
    }

    fn reset_catalog_items_by_branch<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, StorageResult<u64>> {
        let result = self.with_catalog_table(|table| table.reset_branch(name));
        async move { result }.boxed()
    }
}
