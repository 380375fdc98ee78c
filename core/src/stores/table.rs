//! In-process catalog and submission tables.
//!
//! Shared by the JSON file store and the in-memory store. Rows are kept in the
//! raw shape they were loaded in; a row is rewritten in canonical form only
//! when an operation touches it.

use crate::normalize::normalize;
use crate::storage::{ClaimOutcome, InsertOutcome};
use crate::types::{
    same_branch_ignore_case, CarolId, CatalogItem, NewSubmission, RawCatalogItem, Submission, Team,
};
use chrono::{DateTime, Utc};

/// Catalog rows.
#[derive(Debug, Clone, Default)]
pub(crate) struct CatalogTable {
    rows: Vec<RawCatalogItem>,
}

impl CatalogTable {
    pub(crate) const fn new(rows: Vec<RawCatalogItem>) -> Self {
        Self { rows }
    }

    pub(crate) fn rows(&self) -> &[RawCatalogItem] {
        &self.rows
    }

    /// Rows ordered by normalized id.
    pub(crate) fn sorted_rows(&self) -> Vec<RawCatalogItem> {
        let mut rows = self.rows.clone();
        rows.sort_by_key(|raw| normalize(raw).id);
        rows
    }

    fn position(&self, id: CarolId) -> Option<usize> {
        if !id.is_assigned() {
            return None;
        }
        self.rows.iter().position(|raw| normalize(raw).id == id)
    }

    pub(crate) fn upsert(&mut self, items: Vec<CatalogItem>) {
        for item in items {
            if !item.id.is_assigned() {
                tracing::warn!(name = %item.name, "Skipping catalog item without a usable id");
                continue;
            }
            let raw = RawCatalogItem::from(&item);
            match self.position(item.id) {
                Some(index) => self.rows[index] = raw,
                None => self.rows.push(raw),
            }
        }
    }

    pub(crate) fn claim(&mut self, id: CarolId, branch: &str, team: Team) -> ClaimOutcome {
        let Some(index) = self.position(id) else {
            return ClaimOutcome::Missing;
        };
        let mut item = normalize(&self.rows[index]);
        if item.selected {
            return ClaimOutcome::AlreadyClaimed {
                branch: item.branch.unwrap_or_default(),
            };
        }
        item.claim(branch, team);
        self.rows[index] = RawCatalogItem::from(&item);
        ClaimOutcome::Claimed(item)
    }

    pub(crate) fn release(&mut self, id: CarolId, branch: &str) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        let mut item = normalize(&self.rows[index]);
        if !item.selected || item.branch.as_deref() != Some(branch) {
            return false;
        }
        item.release();
        self.rows[index] = RawCatalogItem::from(&item);
        true
    }

    pub(crate) fn insert(&mut self, item: &CatalogItem) -> InsertOutcome {
        if !item.id.is_assigned() || self.position(item.id).is_some() {
            return InsertOutcome::IdTaken;
        }
        self.rows.push(RawCatalogItem::from(item));
        InsertOutcome::Inserted
    }

    pub(crate) fn reset_branch(&mut self, name: &str) -> u64 {
        let mut reset = 0;
        for raw in &mut self.rows {
            let mut item = normalize(raw);
            if item.claimed_by_ignore_case(name) {
                item.release();
                *raw = RawCatalogItem::from(&item);
                reset += 1;
            }
        }
        reset
    }
}

/// Submission rows.
#[derive(Debug, Clone, Default)]
pub(crate) struct SubmissionTable {
    rows: Vec<Submission>,
}

impl SubmissionTable {
    pub(crate) const fn new(rows: Vec<Submission>) -> Self {
        Self { rows }
    }

    pub(crate) fn rows(&self) -> &[Submission] {
        &self.rows
    }

    pub(crate) fn insert(&mut self, new: NewSubmission, now: DateTime<Utc>) -> Submission {
        let id = self.rows.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        let submission = Submission::from_new(id, new, now);
        self.rows.push(submission.clone());
        submission
    }

    pub(crate) fn newest_first(&self) -> Vec<Submission> {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at).then(b.id.cmp(&a.id)));
        rows
    }

    pub(crate) fn by_branch(&self, name: &str) -> Vec<Submission> {
        self.newest_first()
            .into_iter()
            .filter(|s| s.branch_name == name)
            .collect()
    }

    pub(crate) fn delete_by_branch(&mut self, name: &str) -> u64 {
        let before = self.rows.len();
        self.rows
            .retain(|s| !same_branch_ignore_case(&s.branch_name, name));
        (before - self.rows.len()) as u64
    }
}
