//! Router configuration.
//!
//! Builds the complete axum router with all endpoints.

use crate::handlers::{admin, carols, health_check, submissions};
use crate::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

/// Build the complete axum router.
///
/// Every request gets an `x-request-id` (kept if the client sent one), is
/// traced, and echoes the id back on the response.
pub fn build_router(state: AppState) -> Router {
    // API routes
    let api_routes = Router::new()
        .route("/carols", get(carols::list_carols))
        .route("/carols/branch-teams", get(carols::branch_teams))
        .route("/carols/select/bulk", post(carols::select_bulk))
        .route("/submissions", get(submissions::list_submissions))
        .route("/admin/reset-branch", delete(admin::reset_branch));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}
