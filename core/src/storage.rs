//! Storage collaborator contract.
//!
//! [`CarolStorage`] is the single seam between the reservation rules and the
//! persistence tiers. Catalog reads return raw records; callers normalize
//! them. Writes take canonical [`CatalogItem`]s.
//!
//! Note: methods return `BoxFuture` instead of using `async fn` so the trait
//! stays dyn-compatible and a tier can be chosen at runtime.

use crate::error::StorageResult;
use crate::types::{CarolId, CatalogItem, NewSubmission, RawCatalogItem, Submission, Team};
use futures::future::BoxFuture;

/// Outcome of a compare-and-swap claim on one carol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The carol moved from unclaimed to claimed; the updated item is returned.
    Claimed(CatalogItem),
    /// The carol was already claimed; nothing changed.
    AlreadyClaimed {
        /// Current claimant (empty if the stored row has no branch)
        branch: String,
    },
    /// No carol has this id.
    Missing,
}

/// Outcome of inserting a new catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The item was stored.
    Inserted,
    /// Another item already uses the id; nothing changed.
    IdTaken,
}

/// Persistence operations for the catalog and the submission log.
pub trait CarolStorage: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Read every catalog record, pre-normalization, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot be read.
    fn read_all_catalog_items(&self) -> BoxFuture<'_, StorageResult<Vec<RawCatalogItem>>>;

    /// Insert or update catalog items keyed by id.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    fn upsert_catalog_items(&self, items: Vec<CatalogItem>) -> BoxFuture<'_, StorageResult<()>>;

    /// Claim one carol for `branch`/`team`, only if it is currently unclaimed.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails; a lost race is reported through
    /// [`ClaimOutcome::AlreadyClaimed`], not as an error.
    fn claim_item<'a>(
        &'a self,
        id: CarolId,
        branch: &'a str,
        team: Team,
    ) -> BoxFuture<'a, StorageResult<ClaimOutcome>>;

    /// Release one carol, only if it is still claimed by `branch` (exact match).
    ///
    /// Returns whether anything changed.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails.
    fn release_item<'a>(&'a self, id: CarolId, branch: &'a str) -> BoxFuture<'a, StorageResult<bool>>;

    /// Insert a new catalog item, only if its id is unused.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails.
    fn insert_item(&self, item: CatalogItem) -> BoxFuture<'_, StorageResult<InsertOutcome>>;

    /// Append a submission; the log assigns `id` and `submitted_at`.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    fn insert_submission(&self, submission: NewSubmission) -> BoxFuture<'_, StorageResult<Submission>>;

    /// All submissions, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot be read.
    fn read_all_submissions(&self) -> BoxFuture<'_, StorageResult<Vec<Submission>>>;

    /// Submissions whose branch name equals `name` exactly, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot be read.
    fn read_submissions_by_branch<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, StorageResult<Vec<Submission>>>;

    /// Delete every submission for `name` (trimmed, case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns error if the delete fails.
    fn delete_submissions_by_branch<'a>(&'a self, name: &'a str) -> BoxFuture<'a, StorageResult<u64>>;

    /// Release every carol claimed by `name` (trimmed, case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns error if the update fails.
    fn reset_catalog_items_by_branch<'a>(&'a self, name: &'a str)
        -> BoxFuture<'a, StorageResult<u64>>;
}
