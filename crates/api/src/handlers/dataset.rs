//! Handler for exporting human-labelled pictures as a training dataset.

use axum::extract::{Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use waterbowl_core::attribute::{Attribute, PictureType};
use waterbowl_core::packaging::{DatasetEntry, DatasetPackager, DatasetRecord, MetadataRow};
use waterbowl_core::selection::{select_by_class, PictureClass};
use waterbowl_db::repositories::PictureRepo;
use waterbowl_db::DbPool;

use crate::error::{AppError, AppResult};
use crate::query::AnnotatedBatchParams;
use crate::state::AppState;

/// Sample up to `limit` pictures of `class` and pair each with its crop.
async fn sample_class(
    pool: &DbPool,
    picture_type: PictureType,
    attribute: Attribute,
    class: PictureClass,
    limit: i64,
) -> AppResult<Vec<DatasetRecord>> {
    let candidates = PictureRepo::list_by_class(pool, attribute, class).await?;

    let mut rng = rand::rng();
    let records = select_by_class(
        &candidates,
        attribute,
        class == PictureClass::Positive,
        limit,
        &mut rng,
    )
    .into_iter()
    .map(|row| {
        DatasetRecord::new(
            row.picture.id,
            row.picture.image_path(picture_type),
            row.flatten(),
        )
    })
    .collect();
    Ok(records)
}

fn split(records: Vec<DatasetRecord>, rows: &mut Vec<MetadataRow>) -> Vec<DatasetEntry> {
    records
        .into_iter()
        .map(|record| {
            rows.push(record.metadata);
            record.entry
        })
        .collect()
}

/// GET /api/v1/pictures/annotated-batch
///
/// Zip archive of `picture_type` crops split into `{picture_type}_true` and
/// `{picture_type}_false` directories by the consensus label for the
/// attribute, plus a `picture_data.csv` metadata file. Returns 404 when
/// neither requested class has any pictures.
pub async fn export_annotated_batch(
    State(state): State<AppState>,
    Query(params): Query<AnnotatedBatchParams>,
) -> AppResult<impl IntoResponse> {
    let attribute = params.attribute();
    let picture_type = params.picture_type;

    let mut positive = Vec::new();
    if params.wants(PictureClass::Positive) {
        positive = sample_class(
            &state.pool,
            picture_type,
            attribute,
            PictureClass::Positive,
            params.limit,
        )
        .await?;
    }
    let mut negative = Vec::new();
    if params.wants(PictureClass::Negative) {
        negative = sample_class(
            &state.pool,
            picture_type,
            attribute,
            PictureClass::Negative,
            params.limit,
        )
        .await?;
    }

    if positive.is_empty() && negative.is_empty() {
        return Err(AppError::NotFound(format!(
            "No human-labelled pictures found for {attribute}"
        )));
    }

    let mut rows = Vec::with_capacity(positive.len() + negative.len());
    let positive = split(positive, &mut rows);
    let negative = split(negative, &mut rows);
    let (positive_count, negative_count) = (positive.len(), negative.len());

    let (file_name, bytes) = tokio::task::spawn_blocking(move || -> AppResult<_> {
        let archive =
            DatasetPackager::new().package(&positive, &negative, &rows, picture_type.as_str())?;
        let bytes = archive.read_bytes().map_err(|e| AppError::InternalError(e.to_string()))?;
        let file_name = archive.file_name().to_string();
        if let Err(e) = archive.close() {
            tracing::warn!(error = %e, "Failed to remove dataset archive");
        }
        Ok((file_name, bytes))
    })
    .await
    .map_err(|e| AppError::InternalError(format!("Packaging task failed: {e}")))??;

    tracing::info!(
        %attribute,
        %picture_type,
        positive = positive_count,
        negative = negative_count,
        bytes = bytes.len(),
        "Dataset exported"
    );

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, "application/zip".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    ))
}
