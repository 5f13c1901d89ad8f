use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use waterbowl_core::crop::CropError;
use waterbowl_core::error::CoreError;
use waterbowl_core::packaging::PackagingError;
use waterbowl_db::repositories::VoteUpdateError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `waterbowl_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Dataset archive creation failed.
    #[error(transparent)]
    Packaging(#[from] PackagingError),

    /// The uploaded capture could not be cropped.
    #[error(transparent)]
    Crop(#[from] CropError),

    /// Nothing matched a query that is not keyed by id.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<VoteUpdateError> for AppError {
    fn from(err: VoteUpdateError) -> Self {
        match err {
            VoteUpdateError::Vote(core) => AppError::Core(core),
            VoteUpdateError::Database(db) => AppError::Database(db),
        }
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::InvalidVote(msg) => {
                    (StatusCode::BAD_REQUEST, "INVALID_VOTE", msg.clone())
                }
            },

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- Packaging errors ---
            AppError::Packaging(PackagingError::MissingSourceFile {
                picture_id, class, ..
            }) => (
                StatusCode::NOT_FOUND,
                "MISSING_SOURCE_FILE",
                format!("Image file for picture {picture_id} ({class} class) is missing"),
            ),
            AppError::Packaging(err) => {
                tracing::error!(error = %err, "Dataset packaging failed");
                internal()
            }

            // --- Crop errors ---
            AppError::Crop(err @ (CropError::Decode(_) | CropError::OutOfBounds(_))) => {
                (StatusCode::BAD_REQUEST, "INVALID_PICTURE", err.to_string())
            }
            AppError::Crop(err) => {
                tracing::error!(error = %err, "Crop encoding failed");
                internal()
            }

            // --- HTTP-specific errors ---
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Check constraint violations (negative counters) map to 400.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL check constraint violation: error code 23514
            if db_err.code().as_deref() == Some("23514") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                return (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    format!("Value violates check constraint: {constraint}"),
                );
            }
            tracing::error!(error = %db_err, "Database error");
            internal()
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}
