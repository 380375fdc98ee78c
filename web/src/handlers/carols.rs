//! Catalog endpoints: listing, team availability and bulk reservation.

use super::BranchQuery;
use crate::{AppError, AppState, WebResult};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use carol_reservations_core::{
    CatalogItem, ReservationRequest, ReservationWarning, Submission, Team,
};
use serde::{Deserialize, Serialize};

/// Message returned after a successful reservation.
pub const SELECTED_MESSAGE: &str = "Carol selection submitted successfully";

/// List the catalog, sorted by id.
///
/// # Endpoint
///
/// ```text
/// GET /api/carols
/// ```
///
/// # Errors
///
/// Returns 503 if storage is unavailable.
pub async fn list_carols(State(state): State<AppState>) -> WebResult<Json<Vec<CatalogItem>>> {
    Ok(Json(state.service.catalog().await?))
}

/// Team availability for one branch.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchTeamsResponse {
    /// Branch as queried (trimmed)
    pub branch_name: String,
    /// Slots the branch already holds
    pub selected_teams: Vec<Team>,
    /// Slots still open to the branch
    pub available_teams: Vec<Team>,
    /// Whether "Team 1" is open
    pub can_select_team1: bool,
    /// Whether "Team 2" is open
    pub can_select_team2: bool,
}

/// Which team slots a branch may still claim.
///
/// # Endpoint
///
/// ```text
/// GET /api/carols/branch-teams?branchName=Kelaniya
/// ```
///
/// # Errors
///
/// Returns 400 without a branch name, 503 if storage is unavailable.
pub async fn branch_teams(
    State(state): State<AppState>,
    Query(query): Query<BranchQuery>,
) -> WebResult<Json<BranchTeamsResponse>> {
    let branch = query
        .branch()
        .ok_or_else(|| AppError::bad_request("Branch name is required"))?;

    let slots = state.service.team_slots(branch).await?;
    Ok(Json(BranchTeamsResponse {
        branch_name: branch.to_string(),
        can_select_team1: slots.is_available(Team::Team1),
        can_select_team2: slots.is_available(Team::Team2),
        selected_teams: slots.occupied.into_iter().collect(),
        available_teams: slots.available,
    }))
}

/// Body of a bulk reservation.
///
/// Missing fields default to empty so the service reports the specific
/// validation failure instead of a generic parse error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectBulkBody {
    /// Regular carols to claim
    #[serde(default)]
    pub carol_ids: Vec<i64>,
    /// Claiming branch
    #[serde(default)]
    pub branch_name: String,
    /// Free-text substitute
    #[serde(default)]
    pub custom_carol_text: Option<String>,
    /// `"Team 1"` or `"Team 2"`
    #[serde(default)]
    pub team: String,
}

impl From<SelectBulkBody> for ReservationRequest {
    fn from(body: SelectBulkBody) -> Self {
        Self {
            carol_ids: body.carol_ids,
            branch_name: body.branch_name,
            custom_text: body.custom_carol_text,
            team: body.team,
        }
    }
}

/// Successful bulk reservation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectBulkResponse {
    /// Fixed confirmation message
    pub message: &'static str,
    /// Number of carols claimed
    pub selected_count: usize,
    /// The claimed carols, custom substitute included
    pub carols: Vec<CatalogItem>,
    /// The recorded submission
    pub submission: Option<Submission>,
    /// Non-fatal issues
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ReservationWarning>,
}

/// Reserve exactly two carols for a branch and team.
///
/// # Endpoint
///
/// ```text
/// POST /api/carols/select/bulk
/// {"carolIds": [1, 2], "branchName": "Kelaniya", "team": "Team 1"}
/// ```
///
/// # Errors
///
/// Returns 400 for malformed bodies and validation failures, 409 with one
/// reason per carol when any carol cannot be claimed, and 503 if storage is
/// unavailable.
pub async fn select_bulk(
    State(state): State<AppState>,
    body: Result<Json<SelectBulkBody>, JsonRejection>,
) -> WebResult<Json<SelectBulkResponse>> {
    let Json(body) = body.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    let receipt = state.service.reserve(body.into()).await?;
    Ok(Json(SelectBulkResponse {
        message: SELECTED_MESSAGE,
        selected_count: receipt.count,
        carols: receipt.items,
        submission: receipt.submission,
        warnings: receipt.warnings,
    }))
}
