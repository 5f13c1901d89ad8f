//! Route definitions for the `/pictures` resource.

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;

use crate::handlers::{dataset, picture};
use crate::state::AppState;

/// Largest accepted capture upload.
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Routes mounted at `/pictures`.
///
/// ```text
/// GET, POST   /                    random draw, upload
/// GET         /annotated-batch     dataset export
/// GET, PATCH  /{id}                get, apply votes
/// GET         /{id}/metadata       annotation state
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(picture::get_random)
                .post(picture::create)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/annotated-batch", get(dataset::export_annotated_batch))
        .route("/{id}", get(picture::get_by_id).patch(picture::apply_votes))
        .route("/{id}/metadata", get(picture::get_metadata))
}
