//! # Carol Reservations Core
//!
//! Reservation core for a shared carol catalog. Branches reserve exactly two
//! carols (one of which may be a free-text substitute) for one of two team
//! slots, and every successful reservation is recorded as a submission.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────┐
//! │     ReservationService     │  ← validate, claim, record
//! ├──────────────┬─────────────┤
//! │  slots       │ normalize   │  ← pure rules over catalog snapshots
//! ├──────────────┴─────────────┤
//! │  TieredStorage             │  ← remote / local-fallback policy
//! ├──────────────┬─────────────┤
//! │  PostgreSQL  │ JsonFile    │  ← CarolStorage implementations
//! └──────────────┴─────────────┘
//! ```
//!
//! # Claim Safety
//!
//! Carols are claimed one at a time with a compare-and-swap on the
//! `selected` flag (unclaimed → claimed only). A transaction that loses a
//! race releases whatever it already claimed, so two branches can never both
//! hold the same carol and no request is ever partially applied.
//!
//! # Example
//!
//! ```no_run
//! use carol_reservations_core::{
//!     environment::SystemClock, stores::JsonFileStore, ReservationRequest, ReservationService,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = Arc::new(JsonFileStore::new("data", Arc::new(SystemClock)));
//! let service = ReservationService::new(storage);
//!
//! let receipt = service
//!     .reserve(ReservationRequest {
//!         carol_ids: vec![1, 2],
//!         branch_name: "Kelaniya".to_string(),
//!         custom_text: None,
//!         team: "Team 1".to_string(),
//!     })
//!     .await?;
//! println!("Claimed {} carols", receipt.count);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod normalize;
pub mod reservation;
pub mod slots;
pub mod storage;
pub mod stores;
pub mod tier;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

pub use config::{AppConfig, DatabaseConfig, ServerConfig, StorageConfig};
pub use error::{ConfigError, ReservationError, StorageError, ValidationError};
pub use normalize::{normalize, normalize_all};
pub use reservation::{
    BranchReset, ItemProblem, ReservationReceipt, ReservationRequest, ReservationService,
    ReservationWarning,
};
pub use slots::{resolve_team_slots, TeamSlots};
pub use storage::{CarolStorage, ClaimOutcome, InsertOutcome};
pub use tier::{Deployment, StoragePlan, TieredStorage};
pub use types::{CarolId, CatalogItem, NewSubmission, RawCatalogItem, Submission, Team};

/// Environment traits for dependency injection.
///
/// External dependencies (currently only time) are abstracted behind traits so
/// that stores can be driven deterministically in tests.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
