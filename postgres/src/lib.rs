//! `PostgreSQL` remote store for carol reservations.
//!
//! This crate provides the durable remote tier: a [`CarolStorage`]
//! implementation over two tables, `carols` and `submissions`. It supports:
//!
//! - Per-row compare-and-swap claims (`UPDATE ... WHERE selected IS NOT TRUE`)
//! - Drift-tolerant catalog reads (rows are read as JSON and normalized by the core)
//! - Decoding of legacy diagnostics embedded in `custom_carol_text`
//! - Connection pooling and embedded migrations
//!
//! # Example
//!
//! ```no_run
//! use carol_reservations_core::{AppConfig, CarolStorage};
//! use carol_reservations_postgres::PostgresCarolStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::from_env();
//! if let Some(database) = &config.storage.database {
//!     let store = PostgresCarolStore::connect(database).await?;
//!     store.migrate().await?;
//!     println!("{} carols", store.read_all_catalog_items().await?.len());
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use carol_reservations_core::diagnostics::decode_custom_text;
use carol_reservations_core::error::{StorageError, StorageResult};
use carol_reservations_core::{
    CarolId, CarolStorage, CatalogItem, ClaimOutcome, DatabaseConfig, InsertOutcome,
    NewSubmission, RawCatalogItem, Submission, Team,
};
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Row shape of the `submissions` table.
type SubmissionRow = (
    i64,
    String,
    String,
    Vec<i64>,
    Option<String>,
    serde_json::Value,
    DateTime<Utc>,
);

const SUBMISSION_COLUMNS: &str =
    "id, branch_name, team, carol_ids, custom_carol_text, diagnostics, submitted_at";

/// Map a sqlx error to a [`StorageError`], keeping pool exhaustion and
/// connection loss distinguishable from query failures.
fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> StorageError {
    move |e| match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StorageError::Unavailable(format!("{context}: {e}"))
        }
        other => StorageError::Database(format!("{context}: {other}")),
    }
}

/// `PostgreSQL`-backed [`CarolStorage`].
#[derive(Clone)]
pub struct PostgresCarolStore {
    pool: PgPool,
}

impl PostgresCarolStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using the pool settings in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] if no connection can be made.
    pub async fn connect(config: &DatabaseConfig) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .connect(&config.url)
            .await
            .map_err(|e| StorageError::Unavailable(format!("Failed to connect: {e}")))?;
        tracing::info!(max_connections = config.max_connections, "Connected to PostgreSQL");
        Ok(Self::from_pool(pool))
    }

    /// Build a pool that connects on first use.
    ///
    /// Startup does not block on the database; an unreachable server surfaces
    /// as [`StorageError::Unavailable`] on the first operation instead.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] if the URL cannot be parsed.
    pub fn connect_lazy(config: &DatabaseConfig) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .connect_lazy(&config.url)
            .map_err(|e| StorageError::Unavailable(format!("Invalid database URL: {e}")))?;
        Ok(Self::from_pool(pool))
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns error if migrations fail.
    pub async fn migrate(&self) -> StorageResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Database(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_submissions(
        &self,
        filter: &str,
        branch: Option<&str>,
    ) -> StorageResult<Vec<Submission>> {
        let sql = format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions {filter} ORDER BY submitted_at DESC, id DESC"
        );
        let mut query = sqlx::query_as::<_, SubmissionRow>(&sql);
        if let Some(branch) = branch {
            query = query.bind(branch);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to read submissions"))?;
        Ok(rows.into_iter().filter_map(submission_from_row).collect())
    }
}

/// Build a [`Submission`] from a row, splitting legacy diagnostics out of the
/// custom text. Rows with an unknown team are skipped.
fn submission_from_row(row: SubmissionRow) -> Option<Submission> {
    let (id, branch_name, team, carol_ids, custom_carol_text, diagnostics, submitted_at) = row;
    let team = match team.parse::<Team>() {
        Ok(team) => team,
        Err(error) => {
            tracing::warn!(submission_id = id, %error, "Skipping submission with unknown team");
            return None;
        }
    };

    let decoded = decode_custom_text(custom_carol_text.as_deref());
    let mut all_diagnostics: Vec<String> = serde_json::from_value(diagnostics).unwrap_or_default();
    all_diagnostics.extend(decoded.diagnostics);

    Some(Submission {
        id,
        branch_name,
        team,
        carol_ids: carol_ids.into_iter().map(CarolId::new).collect(),
        custom_carol_text: decoded.text,
        diagnostics: all_diagnostics,
        submitted_at,
    })
}

impl CarolStorage for PostgresCarolStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    fn read_all_catalog_items(&self) -> BoxFuture<'_, StorageResult<Vec<RawCatalogItem>>> {
        async move {
            // Rows travel as JSON so drifted column types reach the normalizer intact.
            let rows: Vec<(serde_json::Value,)> =
                sqlx::query_as("SELECT to_jsonb(c) FROM carols c ORDER BY c.id")
                    .fetch_all(&self.pool)
                    .await
                    .map_err(db_error("Failed to read carols"))?;
            rows.into_iter()
                .map(|(row,)| {
                    serde_json::from_value(row)
                        .map_err(|e| StorageError::Serialization(format!("Bad carol row: {e}")))
                })
                .collect()
        }
        .boxed()
    }

    fn upsert_catalog_items(&self, items: Vec<CatalogItem>) -> BoxFuture<'_, StorageResult<()>> {
        async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(db_error("Failed to begin transaction"))?;
            for item in items.iter().filter(|item| item.id.is_assigned()) {
                sqlx::query(
                    "INSERT INTO carols (id, name, selected, branch, team)
                     VALUES ($1, $2, $3, $4, $5)
                     ON CONFLICT (id) DO UPDATE SET
                        name = EXCLUDED.name,
                        selected = EXCLUDED.selected,
                        branch = EXCLUDED.branch,
                        team = EXCLUDED.team",
                )
                .bind(item.id.get())
                .bind(&item.name)
                .bind(item.selected)
                .bind(item.branch.as_deref())
                .bind(item.team.map(Team::as_str))
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to upsert carol"))?;
            }
            tx.commit()
                .await
                .map_err(db_error("Failed to commit carols"))?;
            tracing::debug!(count = items.len(), "Carols upserted");
            Ok(())
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
            let claimed: Option<(i64, Option<String>)> = sqlx::query_as(
                "UPDATE carols SET selected = TRUE, branch = $2, team = $3
                 WHERE id = $1 AND selected IS NOT TRUE
                 RETURNING id, name",
            )
            .bind(id.get())
            .bind(branch)
            .bind(team.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to claim carol"))?;

            if let Some((id, name)) = claimed {
                let mut item = CatalogItem::unclaimed(CarolId::new(id), name.unwrap_or_default());
                item.claim(branch, team);
                return Ok(ClaimOutcome::Claimed(item));
            }

            let holder: Option<(Option<String>,)> =
                sqlx::query_as("SELECT branch FROM carols WHERE id = $1")
                    .bind(id.get())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(db_error("Failed to read carol"))?;
            Ok(match holder {
                Some((branch,)) => ClaimOutcome::AlreadyClaimed {
                    branch: branch.unwrap_or_default(),
                },
                None => ClaimOutcome::Missing,
            })
        }
        .boxed()
    }

    fn release_item<'a>(&'a self, id: CarolId, branch: &'a str) -> BoxFuture<'a, StorageResult<bool>> {
        async move {
            let result = sqlx::query(
                "UPDATE carols SET selected = FALSE, branch = NULL, team = NULL
                 WHERE id = $1 AND selected IS TRUE AND branch = $2",
            )
            .bind(id.get())
            .bind(branch)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to release carol"))?;
            Ok(result.rows_affected() > 0)
        }
        .boxed()
    }

    fn insert_item(&self, item: CatalogItem) -> BoxFuture<'_, StorageResult<InsertOutcome>> {
        async move {
            let result = sqlx::query(
                "INSERT INTO carols (id, name, selected, branch, team)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (id) DO NOTHING",
            )
            .bind(item.id.get())
            .bind(&item.name)
            .bind(item.selected)
            .bind(item.branch.as_deref())
            .bind(item.team.map(Team::as_str))
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to insert carol"))?;
            Ok(if result.rows_affected() == 1 {
                InsertOutcome::Inserted
            } else {
                InsertOutcome::IdTaken
            })
        }
        .boxed()
    }

    fn insert_submission(&self, submission: NewSubmission) -> BoxFuture<'_, StorageResult<Submission>> {
        async move {
            let carol_ids: Vec<i64> = submission.carol_ids.iter().map(|id| id.get()).collect();
            let (id, submitted_at): (i64, DateTime<Utc>) = sqlx::query_as(
                "INSERT INTO submissions (branch_name, team, carol_ids, custom_carol_text, diagnostics)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING id, submitted_at",
            )
            .bind(&submission.branch_name)
            .bind(submission.team.as_str())
            .bind(carol_ids)
            .bind(submission.custom_carol_text.as_deref())
            .bind(serde_json::json!(submission.diagnostics))
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to save submission"))?;

            tracing::debug!(submission_id = id, branch = %submission.branch_name, "Submission saved");
            Ok(Submission::from_new(id, submission, submitted_at))
        }
        .boxed()
    }

    fn read_all_submissions(&self) -> BoxFuture<'_, StorageResult<Vec<Submission>>> {
        self.fetch_submissions("", None).boxed()
    }

    fn read_submissions_by_branch<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, StorageResult<Vec<Submission>>> {
        self.fetch_submissions("WHERE branch_name = $1", Some(name))
            .boxed()
    }

    fn delete_submissions_by_branch<'a>(&'a self, name: &'a str) -> BoxFuture<'a, StorageResult<u64>> {
        async move {
            let result = sqlx::query(
                "DELETE FROM submissions WHERE UPPER(TRIM(branch_name)) = UPPER(TRIM($1))",
            )
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete submissions"))?;
            Ok(result.rows_affected())
        }
        .boxed()
    }

    fn reset_catalog_items_by_branch<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, StorageResult<u64>> {
        async move {
            let result = sqlx::query(
                "UPDATE carols SET selected = FALSE, branch = NULL, team = NULL
                 WHERE selected IS TRUE AND UPPER(TRIM(branch)) = UPPER(TRIM($1))",
            )
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to reset carols"))?;
            Ok(result.rows_affected())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(team: &str, custom: Option<&str>, diagnostics: serde_json::Value) -> SubmissionRow {
        (
            7,
            "Kelaniya".to_string(),
            team.to_string(),
            vec![1, 2],
            custom.map(ToString::to_string),
            diagnostics,
            DateTime::<Utc>::UNIX_EPOCH,
        )
    }

    #[test]
    fn test_legacy_diagnostics_are_split_from_custom_text() {
        let submission = submission_from_row(row(
            "Team 1",
            Some("O Holy Night\n__ERRORS__:[\"late write\"]"),
            serde_json::json!(["from column"]),
        ));
        let submission = submission.as_ref();
        assert_eq!(
            submission.and_then(|s| s.custom_carol_text.as_deref()),
            Some("O Holy Night")
        );
        assert_eq!(
            submission.map(|s| s.diagnostics.clone()),
            Some(vec!["from column".to_string(), "late write".to_string()])
        );
    }

    #[test]
    fn test_unknown_team_rows_are_skipped() {
        assert!(submission_from_row(row("Team 3", None, serde_json::json!([]))).is_none());
    }
}
