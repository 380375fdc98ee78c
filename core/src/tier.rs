//! Storage-tier selection.
//!
//! Where reads and writes land depends on two facts about the deployment:
//! whether a durable remote store is configured, and whether the process runs
//! in a restricted (managed, ephemeral-filesystem) context.
//!
//! ```text
//!                    │ unrestricted                 │ restricted
//! ───────────────────┼──────────────────────────────┼──────────────────────
//!  remote configured │ remote, local file fallback  │ remote only, failures
//!                    │ (warns), seed empty catalog  │ are fatal
//!                    │ from the local file          │
//! ───────────────────┼──────────────────────────────┼──────────────────────
//!  no remote         │ local file only              │ configuration error
//! ```
//!
//! The plan is decided once at startup and wrapped in a [`TieredStorage`],
//! which is itself a [`CarolStorage`].

use crate::error::{ConfigError, StorageResult};
use crate::normalize::normalize_all;
use crate::storage::{CarolStorage, ClaimOutcome, InsertOutcome};
use crate::types::{CarolId, CatalogItem, NewSubmission, RawCatalogItem, Submission, Team};
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;

/// Facts about the runtime that decide the storage plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deployment {
    /// A remote store is configured
    pub remote_configured: bool,
    /// The runtime's local filesystem is not durable or shared
    pub restricted: bool,
}

/// Which tiers serve storage calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoragePlan {
    /// Remote store only; failures propagate.
    RemoteOnly,
    /// Remote store first, local file store when it fails.
    RemoteWithLocalFallback,
    /// Local file store only.
    LocalOnly,
}

impl Deployment {
    /// Decide the storage plan.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RemoteRequired`] for a restricted runtime without
    /// a remote store.
    pub const fn plan(self) -> Result<StoragePlan, ConfigError> {
        match (self.remote_configured, self.restricted) {
            (true, true) => Ok(StoragePlan::RemoteOnly),
            (true, false) => Ok(StoragePlan::RemoteWithLocalFallback),
            (false, true) => Err(ConfigError::RemoteRequired),
            (false, false) => Ok(StoragePlan::LocalOnly),
        }
    }
}

enum Tiers {
    RemoteOnly(Arc<dyn CarolStorage>),
    RemoteWithFallback {
        remote: Arc<dyn CarolStorage>,
        local: Arc<dyn CarolStorage>,
    },
    LocalOnly(Arc<dyn CarolStorage>),
}

/// A [`CarolStorage`] that routes every call according to a [`StoragePlan`].
pub struct TieredStorage {
    tiers: Tiers,
}

impl TieredStorage {
    /// Build the tiered store for a deployment.
    ///
    /// `remote` is the configured remote store, if any; `local` is the file
    /// store used in unrestricted runtimes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RemoteRequired`] when `restricted` is set and no
    /// remote store is given.
    pub fn select(
        restricted: bool,
        remote: Option<Arc<dyn CarolStorage>>,
        local: Arc<dyn CarolStorage>,
    ) -> Result<Self, ConfigError> {
        let deployment = Deployment {
            remote_configured: remote.is_some(),
            restricted,
        };
        let tiers = match (deployment.plan()?, remote) {
            (StoragePlan::RemoteOnly, Some(remote)) => Tiers::RemoteOnly(remote),
            (StoragePlan::RemoteWithLocalFallback, Some(remote)) => {
                Tiers::RemoteWithFallback { remote, local }
            }
            // plan() only yields remote plans when a remote store was given
            (_, _) => Tiers::LocalOnly(local),
        };
        let storage = Self { tiers };
        tracing::info!(plan = ?storage.plan(), "Storage plan selected");
        Ok(storage)
    }

    /// The plan this store follows.
    #[must_use]
    pub const fn plan(&self) -> StoragePlan {
        match self.tiers {
            Tiers::RemoteOnly(_) => StoragePlan::RemoteOnly,
            Tiers::RemoteWithFallback { .. } => StoragePlan::RemoteWithLocalFallback,
            Tiers::LocalOnly(_) => StoragePlan::LocalOnly,
        }
    }

    /// Run `op` against the tiers in plan order.
    fn route<'a, T, F>(&'a self, operation: &'static str, op: F) -> BoxFuture<'a, StorageResult<T>>
    where
        T: Send + 'a,
        F: Fn(&'a dyn CarolStorage) -> BoxFuture<'a, StorageResult<T>> + Send + 'a,
    {
        async move {
            match &self.tiers {
                Tiers::LocalOnly(local) => op(local.as_ref()).await,
                Tiers::RemoteOnly(remote) => op(remote.as_ref()).await.inspect_err(|error| {
                    tracing::error!(
                        operation,
                        backend = remote.backend(),
                        %error,
                        "Remote store failed in restricted runtime"
                    );
                }),
                Tiers::RemoteWithFallback { remote, local } => match op(remote.as_ref()).await {
                    Ok(value) => Ok(value),
                    Err(error) => {
                        tracing::warn!(
                            operation,
                            backend = remote.backend(),
                            %error,
                            "Remote store failed, falling back to local file store (local development only)"
                        );
                        op(local.as_ref()).await
                    }
                },
            }
        }
        .boxed()
    }
}

impl CarolStorage for TieredStorage {
    fn backend(&self) -> &'static str {
        match &self.tiers {
            Tiers::RemoteOnly(remote) | Tiers::RemoteWithFallback { remote, .. } => remote.backend(),
            Tiers::LocalOnly(local) => local.backend(),
        }
    }

    fn read_all_catalog_items(&self) -> BoxFuture<'_, StorageResult<Vec<RawCatalogItem>>> {
        async move {
            let rows = self
                .route("read_all_catalog_items", |s| s.read_all_catalog_items())
                .await?;
            if let Tiers::RemoteWithFallback { remote, local } = &self.tiers {
                if rows.is_empty() {
                    let seeded = local.read_all_catalog_items().await?;
                    if !seeded.is_empty() {
                        tracing::info!(
                            count = seeded.len(),
                            "No carols in remote store, seeding it from local file data"
                        );
                        if let Err(error) = remote.upsert_catalog_items(normalize_all(&seeded)).await {
                            tracing::warn!(
                                backend = remote.backend(),
                                %error,
                                "Failed to seed remote store; run the migrate command"
                            );
                        }
                    }
                    return Ok(seeded);
                }
            }
            Ok(rows)
        }
        .boxed()
    }

    fn upsert_catalog_items(&self, items: Vec<CatalogItem>) -> BoxFuture<'_, StorageResult<()>> {
        self.route("upsert_catalog_items", move |s| {
            s.upsert_catalog_items(items.clone())
        })
    }

    fn claim_item<'a>(
        &'a self,
        id: CarolId,
        branch: &'a str,
        team: Team,
    ) -> BoxFuture<'a, StorageResult<ClaimOutcome>> {
        self.route("claim_item", move |s| s.claim_item(id, branch, team))
    }

    fn release_item<'a>(&'a self, id: CarolId, branch: &'a str) -> BoxFuture<'a, StorageResult<bool>> {
        self.route("release_item", move |s| s.release_item(id, branch))
    }

    fn insert_item(&self, item: CatalogItem) -> BoxFuture<'_, StorageResult<InsertOutcome>> {
        self.route("insert_item", move |s| s.insert_item(item.clone()))
    }

    fn insert_submission(&self, submission: NewSubmission) -> BoxFuture<'_, StorageResult<Submission>> {
        self.route("insert_submission", move |s| {
            s.insert_submission(submission.clone())
        })
    }

    fn read_all_submissions(&self) -> BoxFuture<'_, StorageResult<Vec<Submission>>> {
        self.route("read_all_submissions", |s| s.read_all_submissions())
    }

    fn read_submissions_by_branch<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, StorageResult<Vec<Submission>>> {
        self.route("read_submissions_by_branch", move |s| {
            s.read_submissions_by_branch(name)
        })
    }

    fn delete_submissions_by_branch<'a>(&'a self, name: &'a str) -> BoxFuture<'a, StorageResult<u64>> {
        self.route("delete_submissions_by_branch", move |s| {
            s.delete_submissions_by_branch(name)
        })
    }

    fn reset_catalog_items_by_branch<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, StorageResult<u64>> {
        self.route("reset_catalog_items_by_branch", move |s| {
            s.reset_catalog_items_by_branch(name)
        })
    }
}
