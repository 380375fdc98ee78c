//! Storage that fails every call, for exercising fallback paths.

use crate::error::{StorageError, StorageResult};
use crate::storage::{CarolStorage, ClaimOutcome, InsertOutcome};
use crate::types::{CarolId, CatalogItem, NewSubmission, RawCatalogItem, Submission, Team};
use futures::future::{BoxFuture, FutureExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A [`CarolStorage`] whose every operation returns
/// [`StorageError::Database`]. Counts the calls it receives.
#[derive(Debug, Clone, Default)]
pub struct FailingStorage {
    calls: Arc<AtomicUsize>,
}

impl FailingStorage {
    /// Create a new failing store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of operations attempted so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T: Send + 'static>(&self) -> BoxFuture<'static, StorageResult<T>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        async { Err(StorageError::Database("connection refused".to_string())) }.boxed()
    }
}

impl CarolStorage for FailingStorage {
    fn backend(&self) -> &'static str {
        "failing"
    }

    fn read_all_catalog_items(&self) -> BoxFuture<'_, StorageResult<Vec<RawCatalogItem>>> {
        self.fail()
    }

    fn upsert_catalog_items(&self, _items: Vec<CatalogItem>) -> BoxFuture<'_, StorageResult<()>> {
        self.fail()
    }

    fn claim_item<'a>(
        &'a self,
        _id: CarolId,
        _branch: &'a str,
        _team: Team,
    ) -> BoxFuture<'a, StorageResult<ClaimOutcome>> {
        self.fail()
    }

    fn release_item<'a>(&'a self, _id: CarolId, _branch: &'a str) -> BoxFuture<'a, StorageResult<bool>> {
        self.fail()
    }

    fn insert_item(&self, _item: CatalogItem) -> BoxFuture<'_, StorageResult<InsertOutcome>> {
        self.fail()
    }

    fn insert_submission(&self, _submission: NewSubmission) -> BoxFuture<'_, StorageResult<Submission>> {
        self.fail()
    }

    fn read_all_submissions(&self) -> BoxFuture<'_, StorageResult<Vec<Submission>>> {
        self.fail()
    }

    fn read_submissions_by_branch<'a>(
        &'a self,
        _name: &'a str,
    ) -> BoxFuture<'a, StorageResult<Vec<Submission>>> {
        self.fail()
    }

    fn delete_submissions_by_branch<'a>(&'a self, _name: &'a str) -> BoxFuture<'a, StorageResult<u64>> {
        self.fail()
    }

    fn reset_catalog_items_by_branch<'a>(
        &'a self,
        _name: &'a str,
    ) -> BoxFuture<'a, StorageResult<u64>> {
        self.fail()
    }
}
