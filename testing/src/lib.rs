//! # Carol Reservations Testing
//!
//! Testing utilities and helpers for carol reservations.
//!
//! This crate provides:
//! - Deterministic [`Clock`] implementations
//! - Catalog fixtures
//! - A builder for reservation requests
//! - Assertion helpers for catalog state
//! - proptest strategies for drifted catalog records
//!
//! ## Example
//!
//! ```
//! use carol_reservations_core::{mocks::InMemoryStorage, ReservationService};
//! use carol_reservations_testing::{fixtures, helpers::reserve};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let storage = InMemoryStorage::with_catalog(&fixtures::seed_catalog());
//! let service = ReservationService::new(Arc::new(storage.clone()));
//!
//! let receipt = service
//!     .reserve(reserve("Kelaniya").team("Team 1").carols([1, 2]).build())
//!     .await;
//! assert!(receipt.is_ok());
//! # }
//! ```

use carol_reservations_core::environment::Clock;
use chrono::{DateTime, Utc};

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use carol_reservations_testing::mocks::FixedClock;
    /// use carol_reservations_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that advances one second per reading, so records written in
    /// sequence get distinct, ordered timestamps.
    #[derive(Debug)]
    pub struct SteppingClock {
        start: DateTime<Utc>,
        ticks: AtomicI64,
    }

    impl SteppingClock {
        /// Create a clock whose first reading is `start`
        #[must_use]
        pub const fn new(start: DateTime<Utc>) -> Self {
            Self {
                start,
                ticks: AtomicI64::new(0),
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
            self.start + chrono::Duration::seconds(tick)
        }
    }

    /// 2025-12-01 00:00:00 UTC
    #[must_use]
    pub fn test_time() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_764_547_200, 0).unwrap_or_default()
    }

    /// Create a default fixed clock for tests (2025-12-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_time())
    }
}

/// Catalog fixtures.
pub mod fixtures {
    use carol_reservations_core::{CarolId, CatalogItem, RawCatalogItem, Team};
    use serde_json::json;

    const SEEDED_NAMES: [&str; 19] = [
        "Silent Night",
        "Joy to the World",
        "Hark! The Herald Angels Sing",
        "O Come, All Ye Faithful",
        "O Little Town of Bethlehem",
        "Away in a Manger",
        "The First Noel",
        "God Rest Ye Merry, Gentlemen",
        "Angels We Have Heard on High",
        "We Three Kings",
        "Deck the Halls",
        "It Came Upon the Midnight Clear",
        "Good King Wenceslas",
        "O Holy Night",
        "What Child Is This?",
        "Go Tell It on the Mountain",
        "Once in Royal David's City",
        "In the Bleak Midwinter",
        "Ding Dong Merrily on High",
    ];

    /// The full seeded catalog: ids 1 to 19, all unclaimed.
    #[must_use]
    pub fn seed_catalog() -> Vec<CatalogItem> {
        SEEDED_NAMES
            .iter()
            .zip(1..)
            .map(|(name, id)| CatalogItem::unclaimed(CarolId::new(id), *name))
            .collect()
    }

    /// The two-carol catalog used by the reservation scenarios.
    #[must_use]
    pub fn two_carols() -> Vec<CatalogItem> {
        vec![
            CatalogItem::unclaimed(CarolId::new(1), "Silent Night"),
            CatalogItem::unclaimed(CarolId::new(2), "Joy to the World"),
        ]
    }

    /// A carol already claimed by `branch` for `team`.
    #[must_use]
    pub fn claimed(id: i64, name: &str, branch: &str, team: Team) -> CatalogItem {
        let mut item = CatalogItem::unclaimed(CarolId::new(id), name);
        item.claim(branch, team);
        item
    }

    /// Rows in the drifted shapes older stores left behind.
    #[must_use]
    pub fn drifted_rows() -> Vec<RawCatalogItem> {
        vec![
            RawCatalogItem {
                id: json!("1"),
                name: json!("Silent Night"),
                selected: json!("false"),
                branch: json!(""),
                team: json!(null),
            },
            RawCatalogItem {
                id: json!(2.0),
                name: json!("Joy to the World"),
                selected: json!(0),
                ..RawCatalogItem::default()
            },
            RawCatalogItem {
                id: json!(3),
                name: json!("Hark! The Herald Angels Sing"),
                selected: json!("1"),
                branch: json!("Kandy"),
                team: json!("Team 2"),
            },
        ]
    }
}

/// Test helpers and utilities.
pub mod helpers {
    use carol_reservations_core::{CarolId, CatalogItem, ReservationRequest, Team};

    /// Builder for [`ReservationRequest`].
    #[derive(Debug, Clone)]
    pub struct RequestBuilder {
        request: ReservationRequest,
    }

    /// Start a request for `branch`, defaulting to `"Team 1"` and no carols.
    #[must_use]
    pub fn reserve(branch: &str) -> RequestBuilder {
        RequestBuilder {
            request: ReservationRequest {
                carol_ids: Vec::new(),
                branch_name: branch.to_string(),
                custom_text: None,
                team: Team::Team1.as_str().to_string(),
            },
        }
    }

    impl RequestBuilder {
        /// Set the carols to claim
        #[must_use]
        pub fn carols(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
            self.request.carol_ids = ids.into_iter().collect();
            self
        }

        /// Set the free-text substitute
        #[must_use]
        pub fn custom(mut self, text: &str) -> Self {
            self.request.custom_text = Some(text.to_string());
            self
        }

        /// Set the team as raw text
        #[must_use]
        pub fn team(mut self, team: &str) -> Self {
            self.request.team = team.to_string();
            self
        }

        /// Finish the request
        #[must_use]
        pub fn build(self) -> ReservationRequest {
            self.request
        }
    }

    /// Assert that carol `id` is claimed by `branch` for `team`.
    ///
    /// # Panics
    ///
    /// Panics if the carol is missing or held differently.
    #[track_caller]
    pub fn assert_claimed_by(catalog: &[CatalogItem], id: i64, branch: &str, team: Team) {
        let item = find(catalog, id);
        assert!(item.selected, "carol {id} should be claimed");
        assert_eq!(item.branch.as_deref(), Some(branch), "carol {id} branch");
        assert_eq!(item.team, Some(team), "carol {id} team");
    }

    /// Assert that carol `id` is unclaimed.
    ///
    /// # Panics
    ///
    /// Panics if the carol is missing or claimed.
    #[track_caller]
    pub fn assert_unclaimed(catalog: &[CatalogItem], id: i64) {
        let item = find(catalog, id);
        assert!(!item.selected, "carol {id} should be unclaimed");
        assert_eq!(item.branch, None, "carol {id} branch");
        assert_eq!(item.team, None, "carol {id} team");
    }

    #[track_caller]
    #[allow(clippy::panic)]
    fn find(catalog: &[CatalogItem], id: i64) -> &CatalogItem {
        catalog
            .iter()
            .find(|item| item.id == CarolId::new(id))
            .unwrap_or_else(|| panic!("carol {id} not in catalog"))
    }

    /// Install a test-writer tracing subscriber (once per process).
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("carol_reservations=debug")
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use carol_reservations_core::RawCatalogItem;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    /// Ids as numbers, integral floats, text, or junk.
    pub fn raw_id() -> impl Strategy<Value = Value> {
        prop_oneof![
            (-5i64..200).prop_map(|n| json!(n)),
            (0i64..200).prop_map(|n| json!(n as f64)),
            (0i64..200).prop_map(|n| json!(n.to_string())),
            (0i64..200).prop_map(|n| json!(format!(" {n} "))),
            Just(Value::Null),
            Just(json!("abc")),
            Just(json!(true)),
        ]
    }

    /// `selected` flags in every shape stores have produced.
    pub fn raw_selected() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<bool>().prop_map(|b| json!(b)),
            Just(json!("true")),
            Just(json!("false")),
            Just(json!("1")),
            Just(json!("0")),
            (0i64..3).prop_map(|n| json!(n)),
            Just(Value::Null),
        ]
    }

    /// Optional text columns: present, empty, null, or the wrong type.
    pub fn raw_text(values: &'static [&'static str]) -> impl Strategy<Value = Value> {
        prop_oneof![
            proptest::sample::select(values).prop_map(|s| json!(s)),
            Just(json!("")),
            Just(Value::Null),
            Just(json!(7)),
        ]
    }

    /// Arbitrary drifted catalog records.
    pub fn raw_catalog_item() -> impl Strategy<Value = RawCatalogItem> {
        (
            raw_id(),
            prop_oneof![Just(json!("Silent Night")), Just(json!(42)), Just(Value::Null)],
            raw_selected(),
            raw_text(&["Kelaniya", "KANDY", " Galle "]),
            raw_text(&["Team 1", "Team 2", "team 1", "Team 3"]),
        )
            .prop_map(|(id, name, selected, branch, team)| RawCatalogItem {
                id,
                name,
                selected,
                branch,
                team,
            })
    }
}

// Re-export commonly used items
pub use mocks::{test_clock, FixedClock, SteppingClock};
