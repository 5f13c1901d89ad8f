//! Handlers for the `/pictures` resource: upload, random draw, lookup and votes.

use std::io;
use std::path::{Path, PathBuf};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path as UrlPath, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::DateTime;
use waterbowl_core::attribute::PictureType;
use waterbowl_core::consensus::VoteBatch;
use waterbowl_core::crop::{crop_file_name, crop_regions, RegionCrop};
use waterbowl_core::error::CoreError;
use waterbowl_core::retrieval::select_random;
use waterbowl_core::types::{DbId, Timestamp};
use waterbowl_db::models::picture::{CreatePicture, Picture, PictureAnnotation};
use waterbowl_db::repositories::PictureRepo;

use crate::error::{AppError, AppResult};
use crate::query::RandomPictureParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Response header carrying the drawn picture's flattened metadata as JSON.
pub const PICTURE_METADATA_HEADER: &str = "picturemetadata";

fn picture_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Picture",
        id,
    })
}

/// Parse a form timestamp given as (fractional) seconds since the epoch.
fn parse_timestamp(raw: &str) -> AppResult<(f64, Timestamp)> {
    let invalid = || AppError::Core(CoreError::Validation(format!("Invalid timestamp '{raw}'")));
    let secs: f64 = raw.trim().parse().map_err(|_| invalid())?;
    if !secs.is_finite() {
        return Err(invalid());
    }
    let micros = (secs * 1_000_000.0).round() as i64;
    let timestamp = DateTime::from_timestamp_micros(micros).ok_or_else(invalid)?;
    Ok((secs, timestamp))
}

/// Write every crop under `dir`, removing already-written files on failure.
async fn write_crops(
    dir: &Path,
    crops: &[RegionCrop],
    timestamp: f64,
) -> io::Result<Vec<(PictureType, PathBuf)>> {
    let mut written = Vec::with_capacity(crops.len());
    for crop in crops {
        let path = dir.join(crop_file_name(crop.picture_type, timestamp));
        if let Err(e) = tokio::fs::write(&path, &crop.jpeg).await {
            remove_files(written.iter().map(|(_, p)| p)).await;
            return Err(e);
        }
        written.push((crop.picture_type, path));
    }
    Ok(written)
}

async fn remove_files<'a>(paths: impl Iterator<Item = &'a PathBuf>) {
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove crop file");
        }
    }
}

fn stored_path(written: &[(PictureType, PathBuf)], picture_type: PictureType) -> AppResult<String> {
    written
        .iter()
        .find(|(t, _)| *t == picture_type)
        .map(|(_, p)| p.to_string_lossy().into_owned())
        .ok_or_else(|| AppError::InternalError(format!("No {picture_type} crop was produced")))
}

/// POST /api/v1/pictures
///
/// Multipart form with a `picture` file and a `timestamp` field (seconds since
/// the epoch). The capture is cut into one grayscale crop per bowl region,
/// the crops are stored under the pictures directory, and a picture with a
/// zeroed annotation row is created.
pub async fn create(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<Picture>>)> {
    let mut upload: Option<Vec<u8>> = None;
    let mut timestamp: Option<(f64, Timestamp)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "picture" => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                upload = Some(data.to_vec());
            }
            "timestamp" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                timestamp = Some(parse_timestamp(&text)?);
            }
            _ => {}
        }
    }

    let upload =
        upload.ok_or_else(|| AppError::BadRequest("Missing required 'picture' field".into()))?;
    let (secs, picture_timestamp) = timestamp
        .ok_or_else(|| AppError::BadRequest("Missing required 'timestamp' field".into()))?;

    let crops = tokio::task::spawn_blocking(move || crop_regions(&upload))
        .await
        .map_err(|e| AppError::InternalError(format!("Crop task failed: {e}")))??;

    let written = write_crops(&state.config.pictures_dir, &crops, secs)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to store crops: {e}")))?;

    let input = CreatePicture {
        water_picture: stored_path(&written, PictureType::WaterBowl)?,
        food_picture: stored_path(&written, PictureType::FoodBowl)?,
        picture_timestamp,
    };

    let created = match PictureRepo::create(&state.pool, &input).await {
        Ok(created) => created,
        Err(e) => {
            remove_files(written.iter().map(|(_, p)| p)).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        picture_id = created.picture.id,
        timestamp = %created.picture.picture_timestamp,
        "Picture created"
    );
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: created.picture,
        }),
    ))
}

/// GET /api/v1/pictures
///
/// Draw one picture uniformly at random among those passing `limit` for the
/// attribute, and return its crop for `picture_type` as `image/jpeg`. The
/// flattened picture and annotation fields are sent as JSON in the
/// `PictureMetadata` header.
pub async fn get_random(
    State(state): State<AppState>,
    Query(params): Query<RandomPictureParams>,
) -> AppResult<impl IntoResponse> {
    let attribute = params.attribute();
    let candidates =
        PictureRepo::list_by_retrieval_limit(&state.pool, attribute, params.limit).await?;

    let picked = {
        let mut rng = rand::rng();
        select_random(&candidates, attribute, params.limit, &mut rng).map(|a| a.picture_id)
    };
    let id = picked.ok_or_else(|| {
        AppError::NotFound(format!(
            "No pictures found with limit '{}' for {attribute}",
            params.limit
        ))
    })?;

    let row = PictureRepo::find_with_annotation(&state.pool, id)
        .await?
        .ok_or_else(|| picture_not_found(id))?;

    let path = row.picture.image_path(params.picture_type);
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!(
                "No picture file associated with picture {id}"
            )));
        }
        Err(e) => return Err(AppError::InternalError(e.to_string())),
    };

    let metadata = serde_json::to_string(&row.flatten())
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    let metadata = HeaderValue::from_str(&metadata)
        .map_err(|e| AppError::InternalError(format!("Unencodable metadata header: {e}")))?;

    tracing::debug!(
        picture_id = id,
        %attribute,
        limit = %params.limit,
        picture_type = %params.picture_type,
        "Random picture drawn"
    );

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static("image/jpeg")),
            (HeaderName::from_static(PICTURE_METADATA_HEADER), metadata),
        ],
        bytes,
    ))
}

/// GET /api/v1/pictures/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<DbId>,
) -> AppResult<Json<DataResponse<Picture>>> {
    let picture = PictureRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| picture_not_found(id))?;
    Ok(Json(DataResponse { data: picture }))
}

/// GET /api/v1/pictures/{id}/metadata
///
/// Current vote counters and labels for the picture.
pub async fn get_metadata(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<DbId>,
) -> AppResult<Json<DataResponse<PictureAnnotation>>> {
    let annotation = PictureRepo::annotation_for(&state.pool, id)
        .await?
        .ok_or_else(|| picture_not_found(id))?;
    Ok(Json(DataResponse { data: annotation }))
}

/// Unwrap a vote body. Well-formed JSON whose counters are not integers is an
/// invalid vote; anything else is a plain bad request.
fn vote_batch(payload: Result<Json<VoteBatch>, JsonRejection>) -> AppResult<VoteBatch> {
    match payload {
        Ok(Json(batch)) => Ok(batch),
        Err(JsonRejection::JsonDataError(err)) => {
            Err(CoreError::InvalidVote(err.body_text()).into())
        }
        Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
    }
}

/// PATCH /api/v1/pictures/{id}
///
/// Body holds per-counter increments (`human_water_yes`, `human_cat_no`, ...);
/// omitted fields count as zero. The whole batch is applied atomically or
/// rejected.
pub async fn apply_votes(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<DbId>,
    payload: Result<Json<VoteBatch>, JsonRejection>,
) -> AppResult<Json<DataResponse<PictureAnnotation>>> {
    let votes = vote_batch(payload)?.votes();
    let annotation = PictureRepo::apply_votes(&state.pool, id, &votes)
        .await?
        .ok_or_else(|| picture_not_found(id))?;

    tracing::info!(
        picture_id = id,
        votes = votes.len(),
        water_in_bowl = annotation.water_in_bowl,
        food_in_bowl = annotation.food_in_bowl,
        cat_at_bowl = annotation.cat_at_bowl,
        "Votes applied"
    );
    Ok(Json(DataResponse { data: annotation }))
}
