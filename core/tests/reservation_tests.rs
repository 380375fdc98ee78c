//! End-to-end reservation behaviour over the in-memory and file stores.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use carol_reservations_core::error::StorageResult;
use carol_reservations_core::mocks::InMemoryStorage;
use carol_reservations_core::stores::JsonFileStore;
use carol_reservations_core::{
    CarolId, CarolStorage, CatalogItem, ClaimOutcome, InsertOutcome, ItemProblem, NewSubmission,
    RawCatalogItem, ReservationError, ReservationService, StorageError, Submission, Team,
    TieredStorage, ValidationError,
};
use carol_reservations_testing::fixtures::{claimed, seed_catalog, two_carols};
use carol_reservations_testing::helpers::{assert_claimed_by, assert_unclaimed, init_tracing, reserve};
use carol_reservations_testing::mocks::test_time;
use carol_reservations_testing::{test_clock, SteppingClock};
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;

fn service_over(items: &[CatalogItem]) -> (InMemoryStorage, ReservationService) {
    init_tracing();
    let storage = InMemoryStorage::with_catalog(items).with_clock(Arc::new(test_clock()));
    let service = ReservationService::new(Arc::new(storage.clone()));
    (storage, service)
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_two_regular_carols_are_claimed_and_recorded() {
    let (storage, service) = service_over(&two_carols());

    let receipt = service
        .reserve(reserve("Kelaniya").team("Team 1").carols([1, 2]).build())
        .await
        .unwrap();

    assert_eq!(receipt.count, 2);
    let catalog = storage.catalog();
    assert_claimed_by(&catalog, 1, "Kelaniya", Team::Team1);
    assert_claimed_by(&catalog, 2, "Kelaniya", Team::Team1);

    let submissions = storage.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].carol_ids, vec![CarolId::new(1), CarolId::new(2)]);
    assert_eq!(submissions[0].custom_carol_text, None);
}

#[tokio::test]
async fn test_repeating_a_team_is_rejected() {
    let (_, service) = service_over(&two_carols());
    let request = reserve("Kelaniya").team("Team 1").carols([1, 2]).build();
    service.reserve(request.clone()).await.unwrap();

    let err = service.reserve(request).await.unwrap_err();

    assert_eq!(
        err,
        ReservationError::Validation(ValidationError::TeamAlreadyClaimed {
            branch: "Kelaniya".to_string(),
            team: Team::Team1,
        })
    );
    assert!(err.to_string().ends_with("already selected Team 1."));
}

#[tokio::test]
async fn test_custom_substitute_becomes_catalog_item_20() {
    let (storage, service) = service_over(&two_carols());

    let receipt = service
        .reserve(
            reserve("Kelaniya")
                .team("Team 2")
                .carols([1])
                .custom("O Holy Night")
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(receipt.count, 2);
    let custom = receipt.items.last().unwrap();
    assert_eq!(custom.id, CarolId::new(20));
    assert_eq!(custom.name, "O Holy Night");

    let catalog = storage.catalog();
    assert_claimed_by(&catalog, 20, "Kelaniya", Team::Team2);
    let submission = receipt.submission.unwrap();
    assert_eq!(submission.carol_ids, vec![CarolId::new(1)]);
    assert_eq!(submission.custom_carol_text.as_deref(), Some("O Holy Night"));
}

// ============================================================================
// Invariants
// ============================================================================

#[tokio::test]
async fn test_exactly_two_selections_are_required() {
    for ids in 0..=4_i64 {
        for custom in [None, Some("O Holy Night")] {
            let (storage, service) = service_over(&seed_catalog());
            let mut request = reserve("Galle").carols(1..=ids);
            if let Some(text) = custom {
                request = request.custom(text);
            }
            let total = usize::try_from(ids).unwrap() + usize::from(custom.is_some());

            let result = service.reserve(request.build()).await;

            if total == 2 {
                assert!(result.is_ok(), "{ids} ids, custom {custom:?}");
            } else {
                assert_eq!(
                    result.unwrap_err(),
                    ReservationError::Validation(ValidationError::SelectionCount { count: total }),
                    "{ids} ids, custom {custom:?}"
                );
                assert!(storage.catalog().iter().all(|item| !item.selected));
                assert!(storage.submissions().is_empty());
            }
        }
    }
}

#[tokio::test]
async fn test_no_double_claim() {
    let (storage, service) = service_over(&seed_catalog());
    service
        .reserve(reserve("Kelaniya").carols([1, 2]).build())
        .await
        .unwrap();

    let err = service
        .reserve(reserve("Kandy").carols([2, 3]).build())
        .await
        .unwrap_err();

    assert_eq!(
        err.reasons(),
        vec!["Carol \"Joy to the World\" has already been selected by branch \"Kelaniya\"".to_string()]
    );
    let catalog = storage.catalog();
    assert_claimed_by(&catalog, 2, "Kelaniya", Team::Team1);
    assert_unclaimed(&catalog, 3);
}

#[tokio::test]
async fn test_team_exclusivity() {
    let (_, service) = service_over(&seed_catalog());
    service
        .reserve(reserve("Kelaniya").team("Team 1").carols([1, 2]).build())
        .await
        .unwrap();

    let again = service
        .reserve(reserve("Kelaniya").team("Team 1").carols([3, 4]).build())
        .await;
    assert!(matches!(
        again,
        Err(ReservationError::Validation(ValidationError::TeamAlreadyClaimed { .. }))
    ));

    service
        .reserve(reserve("Kelaniya").team("Team 2").carols([3, 4]).build())
        .await
        .unwrap();

    let slots = service.team_slots("Kelaniya").await.unwrap();
    assert!(slots.available.is_empty());
}

#[tokio::test]
async fn test_custom_id_follows_highest_existing_id() {
    let mut items = seed_catalog();
    items.push(claimed(27, "Carol of the Bells", "Matara", Team::Team1));
    let (_, service) = service_over(&items);

    let receipt = service
        .reserve(reserve("Kelaniya").carols([5]).custom("Mary's Boy Child").build())
        .await
        .unwrap();

    assert_eq!(receipt.items[1].id, CarolId::new(28));
}

#[tokio::test]
async fn test_unknown_carol_on_empty_catalog_adds_nothing() {
    let (storage, service) = service_over(&[]);

    let err = service
        .reserve(reserve("Kelaniya").carols([1]).custom("Mary's Boy Child").build())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ReservationError::Conflicts(vec![ItemProblem::NotFound { id: CarolId::new(1) }])
    );
    assert!(storage.catalog().is_empty());
}

#[tokio::test]
async fn test_reset_releases_claims_case_insensitively() {
    init_tracing();
    let storage = InMemoryStorage::with_catalog(&seed_catalog())
        .with_clock(Arc::new(SteppingClock::new(test_time())));
    let service = ReservationService::new(Arc::new(storage.clone()));
    service
        .reserve(reserve("Kelaniya").team("Team 1").carols([1, 2]).build())
        .await
        .unwrap();
    service
        .reserve(reserve("Kelaniya").team("Team 2").carols([3]).custom("Mary's Boy Child").build())
        .await
        .unwrap();
    service
        .reserve(reserve("Kandy").carols([4, 5]).build())
        .await
        .unwrap();

    let reset = service.reset_branch("KELANIYA").await.unwrap();

    assert_eq!(reset.submissions_deleted, 2);
    assert_eq!(reset.carols_reset, 4);
    let catalog = storage.catalog();
    assert!(catalog.iter().all(|item| !item.claimed_by_ignore_case("KELANIYA")));
    assert_claimed_by(&catalog, 4, "Kandy", Team::Team1);
    assert!(service.submissions(Some("KELANIYA")).await.unwrap().is_empty());
    assert!(service.submissions(Some("Kelaniya")).await.unwrap().is_empty());

    // The branch can reserve again once reset.
    service
        .reserve(reserve("Kelaniya").team("Team 1").carols([1, 2]).build())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_submissions_are_listed_newest_first() {
    init_tracing();
    let storage = InMemoryStorage::with_catalog(&seed_catalog())
        .with_clock(Arc::new(SteppingClock::new(test_time())));
    let service = ReservationService::new(Arc::new(storage));
    for (branch, ids) in [("Kelaniya", [1, 2]), ("Kandy", [3, 4]), ("Galle", [5, 6])] {
        service
            .reserve(reserve(branch).carols(ids).build())
            .await
            .unwrap();
    }

    let all = service.submissions(None).await.unwrap();
    let branches: Vec<&str> = all.iter().map(|s| s.branch_name.as_str()).collect();
    assert_eq!(branches, vec!["Galle", "Kandy", "Kelaniya"]);
    assert_eq!(service.submissions(Some("Kandy")).await.unwrap().len(), 1);
}

// ============================================================================
// Lost races
// ============================================================================

/// Storage whose claim on one carol is always beaten by a rival branch.
struct RacingStorage {
    inner: InMemoryStorage,
    contested: CarolId,
}

impl CarolStorage for RacingStorage {
    fn backend(&self) -> &'static str {
        "racing"
    }

    fn read_all_catalog_items(&self) -> BoxFuture<'_, StorageResult<Vec<RawCatalogItem>>> {
        self.inner.read_all_catalog_items()
    }

    fn upsert_catalog_items(
        &self,
        items: Vec<CatalogItem>,
    ) -> BoxFuture<'_, StorageResult<()>> {
        self.inner.upsert_catalog_items(items)
    }

    fn claim_item<'a>(
        &'a self,
        id: CarolId,
        branch: &'a str,
        team: Team,
    ) -> BoxFuture<'a, StorageResult<ClaimOutcome>> {
        async move {
            if id == self.contested {
                self.inner.claim_item(id, "Rival", Team::Team2).await?;
            }
            self.inner.claim_item(id, branch, team).await
        }
        .boxed()
    }

    fn release_item<'a>(
        &'a self,
        id: CarolId,
        branch: &'a str,
    ) -> BoxFuture<'a, StorageResult<bool>> {
        self.inner.release_item(id, branch)
    }

    fn insert_item(
        &self,
        item: CatalogItem,
    ) -> BoxFuture<'_, StorageResult<InsertOutcome>> {
        self.inner.insert_item(item)
    }

    fn insert_submission(
        &self,
        submission: NewSubmission,
    ) -> BoxFuture<'_, StorageResult<Submission>> {
        self.inner.insert_submission(submission)
    }

    fn read_all_submissions(&self) -> BoxFuture<'_, StorageResult<Vec<Submission>>> {
        self.inner.read_all_submissions()
    }

    fn read_submissions_by_branch<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, StorageResult<Vec<Submission>>> {
        self.inner.read_submissions_by_branch(name)
    }

    fn delete_submissions_by_branch<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, StorageResult<u64>> {
        self.inner.delete_submissions_by_branch(name)
    }

    fn reset_catalog_items_by_branch<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, StorageResult<u64>> {
        self.inner.reset_catalog_items_by_branch(name)
    }
}

#[tokio::test]
async fn test_lost_race_rolls_back_earlier_claims() {
    init_tracing();
    let inner = InMemoryStorage::with_catalog(&seed_catalog());
    let service = ReservationService::new(Arc::new(RacingStorage {
        inner: inner.clone(),
        contested: CarolId::new(2),
    }));

    let err = service
        .reserve(reserve("Kelaniya").carols([1, 2]).build())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ReservationError::Conflicts(vec![ItemProblem::AlreadyClaimed {
            id: CarolId::new(2),
            name: "Joy to the World".to_string(),
            branch: "Rival".to_string(),
        }])
    );
    let catalog = inner.catalog();
    assert_unclaimed(&catalog, 1);
    assert_claimed_by(&catalog, 2, "Rival", Team::Team2);
    assert!(inner.submissions().is_empty());
}

#[tokio::test]
async fn test_taken_custom_id_moves_to_the_next_one() {
    init_tracing();
    let inner = InMemoryStorage::with_catalog(&two_carols());
    let service = ReservationService::new(Arc::new(inner.clone()));

    // Simulate a concurrent writer that grabbed id 20 after our snapshot was taken.
    let racing = RacingInsert {
        inner: inner.clone(),
    };
    let service_racing = ReservationService::new(Arc::new(racing));
    let receipt = service_racing
        .reserve(reserve("Kelaniya").carols([1]).custom("O Holy Night").build())
        .await
        .unwrap();

    assert_eq!(receipt.items[1].id, CarolId::new(21));
    assert_eq!(service.catalog().await.unwrap().len(), 4);
}

/// Storage where id 20 is taken by another writer right before our insert.
struct RacingInsert {
    inner: InMemoryStorage,
}

impl CarolStorage for RacingInsert {
    fn backend(&self) -> &'static str {
        "racing-insert"
    }

    fn read_all_catalog_items(&self) -> BoxFuture<'_, StorageResult<Vec<RawCatalogItem>>> {
        self.inner.read_all_catalog_items()
    }

    fn upsert_catalog_items(
        &self,
        items: Vec<CatalogItem>,
    ) -> BoxFuture<'_, StorageResult<()>> {
        self.inner.upsert_catalog_items(items)
    }

    fn claim_item<'a>(
        &'a self,
        id: CarolId,
        branch: &'a str,
        team: Team,
    ) -> BoxFuture<'a, StorageResult<ClaimOutcome>> {
        self.inner.claim_item(id, branch, team)
    }

    fn release_item<'a>(
        &'a self,
        id: CarolId,
        branch: &'a str,
    ) -> BoxFuture<'a, StorageResult<bool>> {
        self.inner.release_item(id, branch)
    }

    fn insert_item(
        &self,
        item: CatalogItem,
    ) -> BoxFuture<'_, StorageResult<InsertOutcome>> {
        async move {
            let rival = claimed(20, "The Little Drummer Boy", "Matara", Team::Team1);
            self.inner.insert_item(rival).await?;
            self.inner.insert_item(item).await
        }
        .boxed()
    }

    fn insert_submission(
        &self,
        submission: NewSubmission,
    ) -> BoxFuture<'_, StorageResult<Submission>> {
        self.inner.insert_submission(submission)
    }

    fn read_all_submissions(&self) -> BoxFuture<'_, StorageResult<Vec<Submission>>> {
        self.inner.read_all_submissions()
    }

    fn read_submissions_by_branch<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, StorageResult<Vec<Submission>>> {
        self.inner.read_submissions_by_branch(name)
    }

    fn delete_submissions_by_branch<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, StorageResult<u64>> {
        self.inner.delete_submissions_by_branch(name)
    }

    fn reset_catalog_items_by_branch<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, StorageResult<u64>> {
        self.inner.reset_catalog_items_by_branch(name)
    }
}

// ============================================================================
// Storage tiers
// ============================================================================

#[tokio::test]
async fn test_empty_remote_is_seeded_and_holds_the_claims() {
    init_tracing();
    let remote = InMemoryStorage::new();
    let local = InMemoryStorage::with_catalog(&two_carols());
    let remote_store: Arc<dyn CarolStorage> = Arc::new(remote.clone());
    let local_store: Arc<dyn CarolStorage> = Arc::new(local.clone());
    let storage = TieredStorage::select(false, Some(remote_store), local_store).unwrap();
    let service = ReservationService::new(Arc::new(storage));

    let receipt = service
        .reserve(reserve("Kelaniya").carols([1, 2]).build())
        .await
        .unwrap();

    assert_eq!(receipt.count, 2);
    let catalog = remote.catalog();
    assert_eq!(catalog.len(), 2);
    assert_claimed_by(&catalog, 1, "Kelaniya", Team::Team1);
    assert_claimed_by(&catalog, 2, "Kelaniya", Team::Team1);
    assert_eq!(remote.submissions().len(), 1);
    assert_unclaimed(&local.catalog(), 1);
}

/// Serves reads and submissions but cannot write catalog rows.
struct ClaimsDownStorage {
    inner: InMemoryStorage,
}

fn claims_down() -> StorageError {
    StorageError::Database("connection reset by peer".to_string())
}

impl CarolStorage for ClaimsDownStorage {
    fn backend(&self) -> &'static str {
        "claims-down"
    }

    fn read_all_catalog_items(&self) -> BoxFuture<'_, StorageResult<Vec<RawCatalogItem>>> {
        self.inner.read_all_catalog_items()
    }

    fn upsert_catalog_items(
        &self,
        _items: Vec<CatalogItem>,
    ) -> BoxFuture<'_, StorageResult<()>> {
        async { Err(claims_down()) }.boxed()
    }

    fn claim_item<'a>(
        &'a self,
        _id: CarolId,
        _branch: &'a str,
        _team: Team,
    ) -> BoxFuture<'a, StorageResult<ClaimOutcome>> {
        async { Err(claims_down()) }.boxed()
    }

    fn release_item<'a>(
        &'a self,
        _id: CarolId,
        _branch: &'a str,
    ) -> BoxFuture<'a, StorageResult<bool>> {
        async { Err(claims_down()) }.boxed()
    }

    fn insert_item(
        &self,
        _item: CatalogItem,
    ) -> BoxFuture<'_, StorageResult<InsertOutcome>> {
        async { Err(claims_down()) }.boxed()
    }

    fn insert_submission(
        &self,
        submission: NewSubmission,
    ) -> BoxFuture<'_, StorageResult<Submission>> {
        self.inner.insert_submission(submission)
    }

    fn read_all_submissions(&self) -> BoxFuture<'_, StorageResult<Vec<Submission>>> {
        self.inner.read_all_submissions()
    }

    fn read_submissions_by_branch<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, StorageResult<Vec<Submission>>> {
        self.inner.read_submissions_by_branch(name)
    }

    fn delete_submissions_by_branch<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, StorageResult<u64>> {
        self.inner.delete_submissions_by_branch(name)
    }

    fn reset_catalog_items_by_branch<'a>(
        &'a self,
        _name: &'a str,
    ) -> BoxFuture<'a, StorageResult<u64>> {
        async { Err(claims_down()) }.boxed()
    }
}

#[tokio::test]
async fn test_claims_fall_back_to_local_when_remote_fails_mid_reservation() {
    init_tracing();
    let remote = InMemoryStorage::with_catalog(&two_carols());
    let local = InMemoryStorage::with_catalog(&two_carols());
    let remote_store: Arc<dyn CarolStorage> = Arc::new(ClaimsDownStorage { inner: remote.clone() });
    let local_store: Arc<dyn CarolStorage> = Arc::new(local.clone());
    let storage = TieredStorage::select(false, Some(remote_store), local_store).unwrap();
    let service = ReservationService::new(Arc::new(storage));

    service
        .reserve(reserve("Kelaniya").carols([1]).custom("O Holy Night").build())
        .await
        .unwrap();

    let catalog = local.catalog();
    assert_claimed_by(&catalog, 1, "Kelaniya", Team::Team1);
    assert_claimed_by(&catalog, 20, "Kelaniya", Team::Team1);
    assert_unclaimed(&remote.catalog(), 1);
    assert_eq!(remote.catalog().len(), 2);
}

// ============================================================================
// File store
// ============================================================================

#[tokio::test]
async fn test_reservation_over_file_store() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path(), Arc::new(test_clock()));
    store.upsert_catalog_items(two_carols()).await.unwrap();
    let service = ReservationService::new(Arc::new(store));

    service
        .reserve(reserve("Kelaniya").carols([1]).custom("O Holy Night").build())
        .await
        .unwrap();

    let reopened = ReservationService::new(Arc::new(JsonFileStore::new(dir.path(), Arc::new(test_clock()))));
    let catalog = reopened.catalog().await.unwrap();
    assert_eq!(catalog.len(), 3);
    assert_claimed_by(&catalog, 20, "Kelaniya", Team::Team1);
    assert_unclaimed(&catalog, 2);

    let submissions = reopened.submissions(Some("Kelaniya")).await.unwrap();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].submitted_at, test_time());
}
