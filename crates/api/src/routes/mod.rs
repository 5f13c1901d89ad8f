pub mod health;
pub mod picture;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /pictures                              upload (POST), random draw (GET)
/// /pictures/annotated-batch              dataset zip export (GET)
/// /pictures/{id}                         get, apply votes (PATCH)
/// /pictures/{id}/metadata                annotation state (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/pictures", picture::router())
}
