//! Administrative endpoints.

use super::BranchQuery;
use crate::{AppError, AppState, WebResult};
use axum::{
    extract::{Query, State},
    Json,
};
use carol_reservations_core::BranchReset;
use serde::Serialize;

/// Outcome of a branch reset.
#[derive(Debug, Serialize)]
pub struct ResetBranchResponse {
    /// Confirmation naming the branch
    pub message: String,
    /// Counts of removed submissions and released carols
    #[serde(flatten)]
    pub reset: BranchReset,
}

/// Delete a branch's submissions and release its carols.
///
/// Branch matching ignores case and surrounding whitespace. Not
/// authenticated; deploy behind an access-controlled network.
///
/// # Endpoint
///
/// ```text
/// DELETE /api/admin/reset-branch?branchName=KELANIYA
/// ```
///
/// # Errors
///
/// Returns 400 without a branch name, 503 if storage is unavailable.
pub async fn reset_branch(
    State(state): State<AppState>,
    Query(query): Query<BranchQuery>,
) -> WebResult<Json<ResetBranchResponse>> {
    let branch = query
        .branch()
        .ok_or_else(|| AppError::bad_request("Branch name is required. Use ?branchName=KELANIYA"))?;

    let reset = state.service.reset_branch(branch).await?;
    Ok(Json(ResetBranchResponse {
        message: format!("Successfully reset data for branch: {branch}"),
        reset,
    }))
}
