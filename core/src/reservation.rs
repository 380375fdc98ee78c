//! Reservation transaction.
//!
//! A reservation claims exactly two carols for a branch and one of its team
//! slots. One of the two may be a free-text substitute, which becomes a new
//! catalog item.
//!
//! # Flow
//!
//! 1. Request-level checks, in order, first failure wins:
//!    branch name, selection count, custom text, team, team slot.
//! 2. Item-level checks against a catalog snapshot, all problems collected.
//! 3. Commit: one compare-and-swap claim per carol. A lost race releases the
//!    claims already made and reports the conflict.
//! 4. The custom substitute is inserted at the next free id.
//! 5. One submission is appended. A failed append does not undo the claims;
//!    it is reported as a [`ReservationWarning`].

use crate::error::{ReservationError, StorageError, ValidationError};
use crate::normalize::normalize_all;
use crate::slots::{resolve_team_slots, TeamSlots};
use crate::storage::{CarolStorage, ClaimOutcome, InsertOutcome};
use crate::types::{CarolId, CatalogItem, NewSubmission, Submission, Team};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

pub use crate::error::ItemProblem;

/// How many successive ids a custom substitute may try before giving up.
const MAX_CUSTOM_ID_ATTEMPTS: usize = 8;

/// Number of selections every reservation must add up to.
const REQUIRED_SELECTIONS: usize = 2;

/// A reservation as submitted by a caller.
///
/// Fields are kept as supplied; [`ReservationService::reserve`] validates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRequest {
    /// Carols to claim
    pub carol_ids: Vec<i64>,
    /// Claiming branch
    pub branch_name: String,
    /// Free-text substitute; counts as a selection when non-empty
    pub custom_text: Option<String>,
    /// Team slot, `"Team 1"` or `"Team 2"`
    pub team: String,
}

/// Non-fatal issues with an otherwise successful reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ReservationWarning {
    /// The carols are claimed but no submission record was written.
    AuditNotRecorded {
        /// Storage failure detail
        reason: String,
    },
}

/// Result of a successful reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationReceipt {
    /// Items now claimed by this reservation, including any custom substitute
    pub items: Vec<CatalogItem>,
    /// Number of items claimed
    pub count: usize,
    /// The recorded submission, absent if the audit write failed
    pub submission: Option<Submission>,
    /// Non-fatal issues
    pub warnings: Vec<ReservationWarning>,
}

/// Result of resetting a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchReset {
    /// Submissions removed
    pub submissions_deleted: u64,
    /// Carols released
    pub carols_reset: u64,
}

/// Request checks that pass before any storage is read.
struct CheckedRequest {
    branch: String,
    ids: Vec<i64>,
    custom: Option<String>,
    team: Team,
}

/// Reservation operations over a [`CarolStorage`].
#[derive(Clone)]
pub struct ReservationService {
    storage: Arc<dyn CarolStorage>,
}

impl ReservationService {
    /// Creates a service over `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn CarolStorage>) -> Self {
        Self { storage }
    }

    /// The underlying storage.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn CarolStorage> {
        &self.storage
    }

    /// The whole catalog, normalized and ordered by id.
    ///
    /// # Errors
    ///
    /// Returns error if the catalog cannot be read.
    pub async fn catalog(&self) -> Result<Vec<CatalogItem>, StorageError> {
        let mut items = normalize_all(&self.storage.read_all_catalog_items().await?);
        items.sort_by_key(|item| item.id);
        Ok(items)
    }

    /// Team-slot availability for a branch.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::BranchNameRequired`] for a blank name, or a
    /// storage error.
    pub async fn team_slots(&self, branch_name: &str) -> Result<TeamSlots, ReservationError> {
        if branch_name.trim().is_empty() {
            return Err(ValidationError::BranchNameRequired.into());
        }
        Ok(resolve_team_slots(self.storage.as_ref(), branch_name).await?)
    }

    /// Submissions, newest first; only `branch_name`'s (exact match) when given.
    ///
    /// # Errors
    ///
    /// Returns error if the log cannot be read.
    pub async fn submissions(&self, branch_name: Option<&str>) -> Result<Vec<Submission>, StorageError> {
        match branch_name {
            Some(name) => self.storage.read_submissions_by_branch(name).await,
            None => self.storage.read_all_submissions().await,
        }
    }

    /// Delete a branch's submissions and release its carols, matching the
    /// name case-insensitively. Irreversible.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::BranchNameRequired`] for a blank name, or a
    /// storage error.
    #[tracing::instrument(skip(self), fields(branch = %branch_name))]
    pub async fn reset_branch(&self, branch_name: &str) -> Result<BranchReset, ReservationError> {
        if branch_name.trim().is_empty() {
            return Err(ValidationError::BranchNameRequired.into());
        }
        let submissions_deleted = self.storage.delete_submissions_by_branch(branch_name).await?;
        let carols_reset = self.storage.reset_catalog_items_by_branch(branch_name).await?;
        tracing::warn!(submissions_deleted, carols_reset, "Branch data reset");
        Ok(BranchReset {
            submissions_deleted,
            carols_reset,
        })
    }

    /// Reserve two carols for a branch and team.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::Validation`] when a request-level check fails
    /// - [`ReservationError::Conflicts`] listing every unavailable carol
    /// - [`ReservationError::Storage`] when a store call fails
    ///
    /// Nothing is left claimed when an error is returned.
    #[tracing::instrument(skip(self, request), fields(branch = %request.branch_name, team = %request.team))]
    pub async fn reserve(&self, request: ReservationRequest) -> Result<ReservationReceipt, ReservationError> {
        let request = check_request(request)?;

        let slots = resolve_team_slots(self.storage.as_ref(), &request.branch).await?;
        if !slots.is_available(request.team) {
            return Err(ValidationError::TeamAlreadyClaimed {
                branch: request.branch,
                team: request.team,
            }
            .into());
        }

        let catalog = normalize_all(&self.storage.read_all_catalog_items().await?);
        let candidates = check_items(&catalog, &request.ids)?;

        let mut claimed = self.claim_all(&candidates, &request.branch, request.team).await?;
        let regular_ids: Vec<CarolId> = claimed.iter().map(|item| item.id).collect();

        if let Some(text) = &request.custom {
            match self
                .insert_custom(&catalog, text, &request.branch, request.team)
                .await
            {
                Ok(item) => claimed.push(item),
                Err(error) => {
                    self.release_all(&claimed, &request.branch).await;
                    return Err(error.into());
                }
            }
        }

        let mut warnings = Vec::new();
        let submission = match self
            .storage
            .insert_submission(NewSubmission {
                branch_name: request.branch.clone(),
                team: request.team,
                carol_ids: regular_ids,
                custom_carol_text: request.custom.clone(),
                diagnostics: Vec::new(),
            })
            .await
        {
            Ok(submission) => Some(submission),
            Err(error) => {
                tracing::warn!(%error, "Carols claimed but submission was not recorded");
                warnings.push(ReservationWarning::AuditNotRecorded {
                    reason: error.to_string(),
                });
                None
            }
        };

        tracing::info!(count = claimed.len(), "Reservation committed");
        Ok(ReservationReceipt {
            count: claimed.len(),
            items: claimed,
            submission,
            warnings,
        })
    }

    /// Claim every candidate, releasing earlier claims if any one fails.
    async fn claim_all(
        &self,
        candidates: &[CatalogItem],
        branch: &str,
        team: Team,
    ) -> Result<Vec<CatalogItem>, ReservationError> {
        let mut claimed = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let outcome = self.storage.claim_item(candidate.id, branch, team).await;
            let problem = match outcome {
                Ok(ClaimOutcome::Claimed(item)) => {
                    claimed.push(item);
                    continue;
                }
                Ok(ClaimOutcome::AlreadyClaimed { branch: holder }) => {
                    ReservationError::Conflicts(vec![ItemProblem::AlreadyClaimed {
                        id: candidate.id,
                        name: candidate.name.clone(),
                        branch: holder,
                    }])
                }
                Ok(ClaimOutcome::Missing) => {
                    ReservationError::Conflicts(vec![ItemProblem::NotFound { id: candidate.id }])
                }
                Err(error) => ReservationError::Storage(error),
            };
            tracing::warn!(carol_id = candidate.id.get(), error = %problem, "Claim failed, rolling back");
            self.release_all(&claimed, branch).await;
            return Err(problem);
        }
        Ok(claimed)
    }

    /// Insert the custom substitute at the next free id.
    async fn insert_custom(
        &self,
        catalog: &[CatalogItem],
        text: &str,
        branch: &str,
        team: Team,
    ) -> Result<CatalogItem, StorageError> {
        let mut next = next_custom_id(catalog);
        for _ in 0..MAX_CUSTOM_ID_ATTEMPTS {
            let Some(id) = next else {
                return Err(StorageError::Unavailable("no id left for the custom carol".to_string()));
            };
            let mut item = CatalogItem::unclaimed(id, text);
            item.claim(branch, team);
            match self.storage.insert_item(item.clone()).await? {
                InsertOutcome::Inserted => {
                    tracing::debug!(carol_id = id.get(), "Custom carol added");
                    return Ok(item);
                }
                InsertOutcome::IdTaken => {
                    tracing::debug!(carol_id = id.get(), "Custom carol id taken, trying next");
                    next = id.next();
                }
            }
        }
        Err(StorageError::Unavailable(
            "could not allocate an id for the custom carol".to_string(),
        ))
    }

    async fn release_all(&self, claimed: &[CatalogItem], branch: &str) {
        for item in claimed {
            match self.storage.release_item(item.id, branch).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!(carol_id = item.id.get(), "Claim was no longer held during rollback");
                }
                Err(error) => {
                    tracing::error!(carol_id = item.id.get(), %error, "Failed to release claim during rollback");
                }
            }
        }
    }
}

/// The id a new custom carol gets: one past the highest id in the catalog,
/// and never inside the seeded range. `None` once ids are exhausted.
#[must_use]
pub fn next_custom_id(catalog: &[CatalogItem]) -> Option<CarolId> {
    catalog
        .iter()
        .map(|item| item.id)
        .filter(|id| id.is_assigned())
        .fold(CarolId::MAX_SEEDED, std::cmp::max)
        .next()
}

fn check_request(request: ReservationRequest) -> Result<CheckedRequest, ValidationError> {
    let branch = request.branch_name.trim();
    if branch.is_empty() {
        return Err(ValidationError::BranchNameRequired);
    }

    let custom = request.custom_text.filter(|text| !text.is_empty());
    let count = request.carol_ids.len() + usize::from(custom.is_some());
    if count != REQUIRED_SELECTIONS {
        return Err(ValidationError::SelectionCount { count });
    }

    let custom = custom.map(|text| text.trim().to_string());
    if custom.as_deref().is_some_and(str::is_empty) {
        return Err(ValidationError::BlankCustomText);
    }

    let team = request
        .team
        .parse::<Team>()
        .map_err(|_| ValidationError::InvalidTeam { team: request.team.clone() })?;

    Ok(CheckedRequest {
        branch: branch.to_string(),
        ids: request.carol_ids,
        custom,
        team,
    })
}

/// Resolve every requested id against the snapshot, collecting all problems.
fn check_items(catalog: &[CatalogItem], ids: &[i64]) -> Result<Vec<CatalogItem>, ReservationError> {
    let mut seen = HashSet::new();
    let mut problems = Vec::new();
    let mut candidates = Vec::with_capacity(ids.len());

    for &raw_id in ids {
        let id = CarolId::new(raw_id);
        if !seen.insert(id) {
            problems.push(ItemProblem::Duplicate { id });
            continue;
        }
        let Some(item) = catalog.iter().find(|item| id.is_assigned() && item.id == id) else {
            problems.push(ItemProblem::NotFound { id });
            continue;
        };
        if item.selected {
            problems.push(ItemProblem::AlreadyClaimed {
                id,
                name: item.name.clone(),
                branch: item.branch.clone().unwrap_or_default(),
            });
            continue;
        }
        candidates.push(item.clone());
    }

    if problems.is_empty() {
        Ok(candidates)
    } else {
        Err(ReservationError::Conflicts(problems))
    }
}
