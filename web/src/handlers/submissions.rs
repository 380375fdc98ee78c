//! Submission log endpoint.

use super::BranchQuery;
use crate::{AppState, WebResult};
use axum::{
    extract::{Query, State},
    Json,
};
use carol_reservations_core::Submission;

/// List submissions newest first, optionally for one branch.
///
/// The branch filter is an exact match on the trimmed name.
///
/// # Endpoint
///
/// ```text
/// GET /api/submissions[?branchName=Kelaniya]
/// ```
///
/// # Errors
///
/// Returns 503 if storage is unavailable.
pub async fn list_submissions(
    State(state): State<AppState>,
    Query(query): Query<BranchQuery>,
) -> WebResult<Json<Vec<Submission>>> {
    Ok(Json(state.service.submissions(query.branch()).await?))
}
