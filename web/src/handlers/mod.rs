//! HTTP request handlers.
//!
//! This module contains all HTTP handlers organized by resource.

pub mod admin;
pub mod carols;
pub mod health;
pub mod submissions;

use serde::Deserialize;

// Re-export common handler utilities
pub use health::health_check;

/// `?branchName=` query parameter shared by several endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchQuery {
    /// Branch name as supplied
    pub branch_name: Option<String>,
}

impl BranchQuery {
    /// The branch name, if present and not blank.
    #[must_use]
    pub fn branch(&self) -> Option<&str> {
        self.branch_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}
