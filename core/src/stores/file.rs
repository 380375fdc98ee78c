//! Local JSON file store.
//!
//! Keeps the catalog in `<dir>/carols.json` and the submission log in
//! `<dir>/submissions.json`. This is the local tier: the whole store for
//! development without a database, and the fallback/seed source when a remote
//! store is configured in an unrestricted runtime.
//!
//! Files are read with a leading UTF-8 BOM tolerated and written as pretty
//! JSON without one. Each operation loads, mutates and saves under one
//! in-process lock.

use super::table::{CatalogTable, SubmissionTable};
use crate::environment::Clock;
use crate::error::{StorageError, StorageResult};
use crate::storage::{CarolStorage, ClaimOutcome, InsertOutcome};
use crate::types::{CarolId, CatalogItem, NewSubmission, RawCatalogItem, Submission, Team};
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

const CATALOG_FILE: &str = "carols.json";
const SUBMISSIONS_FILE: &str = "submissions.json";
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// File-backed [`CarolStorage`].
pub struct JsonFileStore {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Creates a store rooted at `dir`. Nothing is touched until first use.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            clock,
            lock: Mutex::new(()),
        }
    }

    /// Path of the catalog file.
    #[must_use]
    pub fn catalog_path(&self) -> PathBuf {
        self.dir.join(CATALOG_FILE)
    }

    /// Path of the submissions file.
    #[must_use]
    pub fn submissions_path(&self) -> PathBuf {
        self.dir.join(SUBMISSIONS_FILE)
    }

    async fn load_catalog(&self) -> StorageResult<CatalogTable> {
        let rows: Vec<RawCatalogItem> = read_json_array(&self.catalog_path()).await?;
        Ok(CatalogTable::new(rows))
    }

    async fn save_catalog(&self, table: &CatalogTable) -> StorageResult<()> {
        write_json(&self.dir, &self.catalog_path(), &table.sorted_rows()).await
    }

    async fn load_submissions(&self) -> StorageResult<SubmissionTable> {
        let rows: Vec<Submission> = read_json_array(&self.submissions_path()).await?;
        Ok(SubmissionTable::new(rows))
    }

    async fn save_submissions(&self, table: &SubmissionTable) -> StorageResult<()> {
        write_json(&self.dir, &self.submissions_path(), table.rows()).await
    }
}

/// Reads a JSON array, treating a missing file as empty.
async fn read_json_array<T: DeserializeOwned>(path: &Path) -> StorageResult<Vec<T>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Data file does not exist, treating as empty");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(StorageError::Io(format!(
                "Failed to read {}: {e}",
                path.display()
            )))
        }
    };
    let contents = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);
    if contents.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(contents).map_err(|e| {
        StorageError::Serialization(format!("Failed to parse {}: {e}", path.display()))
    })
}

/// Writes pretty JSON (no BOM) through a temporary file and a rename.
async fn write_json<T: Serialize + ?Sized>(dir: &Path, path: &Path, value: &T) -> StorageResult<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| StorageError::Io(format!("Failed to create {}: {e}", dir.display())))?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json)
        .await
        .map_err(|e| StorageError::Io(format!("Failed to write {}: {e}", tmp.display())))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| StorageError::Io(format!("Failed to replace {}: {e}", path.display())))?;
    tracing::debug!(path = %path.display(), "Data file saved");
    Ok(())
}

impl CarolStorage for JsonFileStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    fn read_all_catalog_items(&self) -> BoxFuture<'_, StorageResult<Vec<RawCatalogItem>>> {
        async move {
            let _guard = self.lock.lock().await;
            match self.load_catalog().await {
                Ok(table) => Ok(table.sorted_rows()),
                // An unreadable fixture reads as an empty catalog; writes still fail loudly.
                Err(StorageError::Serialization(message)) => {
                    tracing::error!(%message, "Error reading carols file");
                    Ok(Vec::new())
                }
                Err(other) => Err(other),
            }
        }
        .boxed()
    }

    fn upsert_catalog_items(&self, items: Vec<CatalogItem>) -> BoxFuture<'_, StorageResult<()>> {
        async move {
            let _guard = self.lock.lock().await;
            let mut table = self.load_catalog().await?;
            table.upsert(items);
            self.save_catalog(&table).await
        }
        .boxed()
    }

    fn claim_item<'a>(
        &'a self,
        id: CarolId,
        branch: &'a str,
        team: Team,
    ) -> BoxFuture<'a, StorageResult<ClaimOutcome>> {
        async move {
            let _guard = self.lock.lock().await;
            let mut table = self.load_catalog().await?;
            let outcome = table.claim(id, branch, team);
            if matches!(outcome, ClaimOutcome::Claimed(_)) {
                self.save_catalog(&table).await?;
            }
            Ok(outcome)
        }
        .boxed()
    }

    fn release_item<'a>(&'a self, id: CarolId, branch: &'a str) -> BoxFuture<'a, StorageResult<bool>> {
        async move {
            let _guard = self.lock.lock().await;
            let mut table = self.load_catalog().await?;
            let released = table.release(id, branch);
            if released {
                self.save_catalog(&table).await?;
            }
            Ok(released)
        }
        .boxed()
    }

    fn insert_item(&self, item: CatalogItem) -> BoxFuture<'_, StorageResult<InsertOutcome>> {
        async move {
            let _guard = self.lock.lock().await;
            let mut table = self.load_catalog().await?;
            let outcome = table.insert(&item);
            if outcome == InsertOutcome::Inserted {
                self.save_catalog(&table).await?;
            }
            Ok(outcome)
        }
        .boxed()
    }

    fn insert_submission(&self, submission: NewSubmission) -> BoxFuture<'_, StorageResult<Submission>> {
        async move {
            let _guard = self.lock.lock().await;
            let mut table = self.load_submissions().await?;
            let stored = table.insert(submission, self.clock.now());
            self.save_submissions(&table).await?;
            Ok(stored)
        }
        .boxed()
    }

    fn read_all_submissions(&self) -> BoxFuture<'_, StorageResult<Vec<Submission>>> {
        async move {
            let _guard = self.lock.lock().await;
            Ok(self.load_submissions().await?.newest_first())
        }
        .boxed()
    }

    fn read_submissions_by_branch<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, StorageResult<Vec<Submission>>> {
        async move {
            let _guard = self.lock.lock().await;
            Ok(self.load_submissions().await?.by_branch(name))
        }
        .boxed()
    }

    fn delete_submissions_by_branch<'a>(&'a self, name: &'a str) -> BoxFuture<'a, StorageResult<u64>> {
        async move {
            let _guard = self.lock.lock().await;
            let mut table = self.load_submissions().await?;
            let deleted = table.delete_by_branch(name);
            if deleted > 0 {
                self.save_submissions(&table).await?;
            }
            Ok(deleted)
        }
        .boxed()
    }

    fn reset_catalog_items_by_branch<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, StorageResult<u64>> {
        async move {
            let _guard = self.lock.lock().await;
            let mut table = self.load_catalog().await?;
            let reset = table.reset_branch(name);
            if reset > 0 {
                self.save_catalog(&table).await?;
            }
            Ok(reset)
        }
        .boxed()
    }
}
