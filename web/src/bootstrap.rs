//! Storage wiring shared by the server and the admin CLI.

use anyhow::Context;
use carol_reservations_core::{
    environment::SystemClock, stores::JsonFileStore, CarolStorage, DatabaseConfig,
    ReservationService, StorageConfig, TieredStorage,
};
use carol_reservations_postgres::PostgresCarolStore;
use std::sync::Arc;

/// The local JSON file store under `config.data_dir`.
#[must_use]
pub fn local_store(config: &StorageConfig) -> JsonFileStore {
    JsonFileStore::new(config.data_dir.clone(), Arc::new(SystemClock))
}

/// Open the remote store and bring its schema up to date.
///
/// The pool connects lazily, so an unreachable database does not stop
/// startup. A failed migration is logged and left to surface per request.
///
/// # Errors
///
/// Returns an error if the database URL is malformed.
pub async fn remote_store(config: &DatabaseConfig, restricted: bool) -> anyhow::Result<PostgresCarolStore> {
    let store = PostgresCarolStore::connect_lazy(config).context("Failed to configure PostgreSQL pool")?;
    if let Err(e) = store.migrate().await {
        if restricted {
            tracing::error!(error = %e, "Schema migration failed; requests will fail until the database is reachable");
        } else {
            tracing::warn!(error = %e, "Schema migration failed; the local file store will serve as fallback");
        }
    }
    Ok(store)
}

/// Select storage tiers for `config`.
///
/// # Errors
///
/// Returns an error if the runtime is restricted and no database is
/// configured, or if the database URL is malformed.
pub async fn storage(config: &StorageConfig) -> anyhow::Result<TieredStorage> {
    let local: Arc<dyn CarolStorage> = Arc::new(local_store(config));
    let remote: Option<Arc<dyn CarolStorage>> = match &config.database {
        Some(database) => {
            let store: Arc<dyn CarolStorage> = Arc::new(remote_store(database, config.restricted).await?);
            Some(store)
        }
        None => None,
    };
    Ok(TieredStorage::select(config.restricted, remote, local)?)
}

/// Build the reservation service over the tiers selected for `config`.
///
/// # Errors
///
/// See [`storage`].
pub async fn reservation_service(config: &StorageConfig) -> anyhow::Result<ReservationService> {
    let storage = storage(config).await?;
    Ok(ReservationService::new(Arc::new(storage)))
}
