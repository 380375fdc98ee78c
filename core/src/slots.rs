//! Team-slot occupancy for a branch.
//!
//! A branch occupies a team slot once any claimed carol or any recorded
//! submission names that team against it. Branch names are compared exactly
//! (after trimming), unlike branch reset, which ignores case.

use crate::error::StorageResult;
use crate::normalize::normalize_all;
use crate::storage::CarolStorage;
use crate::types::Team;
use serde::Serialize;
use std::collections::BTreeSet;

/// Occupied and available team slots for one branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamSlots {
    /// Teams the branch already holds
    pub occupied: BTreeSet<Team>,
    /// Teams still open to the branch, in [`Team::ALL`] order
    pub available: Vec<Team>,
}

impl TeamSlots {
    /// Builds the view from the set of occupied teams.
    #[must_use]
    pub fn from_occupied(occupied: BTreeSet<Team>) -> Self {
        let available = Team::ALL
            .into_iter()
            .filter(|team| !occupied.contains(team))
            .collect();
        Self {
            occupied,
            available,
        }
    }

    /// Whether `team` is still open to the branch.
    #[must_use]
    pub fn is_available(&self, team: Team) -> bool {
        self.available.contains(&team)
    }
}

/// Resolve which team slots `branch_name` occupies.
///
/// # Errors
///
/// Returns error if the catalog or the submission log cannot be read.
pub async fn resolve_team_slots(
    storage: &dyn CarolStorage,
    branch_name: &str,
) -> StorageResult<TeamSlots> {
    let branch = branch_name.trim();
    let mut occupied = BTreeSet::new();

    let items = normalize_all(&storage.read_all_catalog_items().await?);
    occupied.extend(
        items
            .iter()
            .filter(|item| item.selected && item.branch.as_deref().map(str::trim) == Some(branch))
            .filter_map(|item| item.team),
    );

    let submissions = storage.read_submissions_by_branch(branch).await?;
    occupied.extend(submissions.iter().map(|s| s.team));

    tracing::debug!(branch, ?occupied, "Resolved team slots");
    Ok(TeamSlots::from_occupied(occupied))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::InMemoryStorage;
    use crate::types::{CarolId, CatalogItem, NewSubmission};

    fn claimed(id: i64, branch: &str, team: Team) -> CatalogItem {
        let mut item = CatalogItem::unclaimed(CarolId::new(id), format!("Carol {id}"));
        item.claim(branch, team);
        item
    }

    #[tokio::test]
    async fn test_fresh_branch_has_both_slots() {
        let storage = InMemoryStorage::with_catalog(&[CatalogItem::unclaimed(CarolId::new(1), "Silent Night")]);
        let slots = resolve_team_slots(&storage, "Kelaniya").await.unwrap();
        assert!(slots.occupied.is_empty());
        assert_eq!(slots.available, vec![Team::Team1, Team::Team2]);
    }

    #[tokio::test]
    async fn test_claimed_items_occupy_slots_by_exact_name() {
        let storage = InMemoryStorage::with_catalog(&[
            claimed(1, "Kelaniya", Team::Team1),
            claimed(2, "KELANIYA", Team::Team2),
        ]);

        let slots = resolve_team_slots(&storage, " Kelaniya ").await.unwrap();
        assert_eq!(slots.occupied, BTreeSet::from([Team::Team1]));
        assert_eq!(slots.available, vec![Team::Team2]);
        assert!(!slots.is_available(Team::Team1));
    }

    #[tokio::test]
    async fn test_submissions_occupy_slots() {
        let storage = InMemoryStorage::new();
        storage
            .insert_submission(NewSubmission {
                branch_name: "Kandy".to_string(),
                team: Team::Team2,
                carol_ids: vec![CarolId::new(3)],
                custom_carol_text: Some("O Holy Night".to_string()),
                diagnostics: Vec::new(),
            })
            .await
            .unwrap();

        let slots = resolve_team_slots(&storage, "Kandy").await.unwrap();
        assert_eq!(slots.available, vec![Team::Team1]);
    }
}
