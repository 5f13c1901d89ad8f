//! HTTP-level integration tests for picture upload, retrieval and votes.

mod common;

use axum::http::StatusCode;
use common::{body_bytes, body_json, build_test_app, get, patch_json, post_capture, upload};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_stores_one_crop_per_region(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(pool.clone(), dir.path());
    let response = post_capture(app, Some(&common::capture_png()), Some("1700000000.5")).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let picture = &json["data"];
    assert!(picture["id"].is_number());

    let water = picture["water_picture"].as_str().unwrap();
    let food = picture["food_picture"].as_str().unwrap();
    assert!(std::path::Path::new(water).is_file());
    assert!(std::path::Path::new(food).is_file());

    let water_name = std::path::Path::new(water).file_name().unwrap().to_str().unwrap();
    assert!(water_name.starts_with("water_1700000000.5_"));
    let food_name = std::path::Path::new(food).file_name().unwrap().to_str().unwrap();
    assert!(food_name.starts_with("food_1700000000.5_"));

    let crop = image::open(water).unwrap();
    assert_eq!((crop.width(), crop.height()), (700, 700));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn whole_second_upload_names_keep_fraction(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(pool, dir.path());
    let response = post_capture(app, Some(&common::capture_png()), Some("1700000000")).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let water = json["data"]["water_picture"].as_str().unwrap();
    let water_name = std::path::Path::new(water).file_name().unwrap().to_str().unwrap();
    assert!(water_name.starts_with("water_1700000000.0_"), "{water_name}");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn tiny_timestamp_upload_is_stored(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(pool, dir.path());
    let response = post_capture(app, Some(&common::capture_png()), Some("1e-300")).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn out_of_range_timestamp_is_validation_error(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(pool, dir.path());
    let response = post_capture(app, Some(&common::capture_png()), Some("1e300")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_starts_with_zeroed_counters(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let id = upload(&pool, dir.path(), "1700000000").await;

    let app = build_test_app(pool, dir.path());
    let response = get(app, &format!("/api/v1/pictures/{id}/metadata")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["picture_id"], id);
    assert_eq!(data["water_in_bowl"], false);
    assert_eq!(data["human_cat_yes"], 0);
    assert_eq!(data["human_food_no"], 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_without_timestamp_is_rejected(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(pool, dir.path());
    let response = post_capture(app, Some(&common::capture_png()), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_of_non_image_is_rejected(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(pool, dir.path());
    let response = post_capture(app, Some(b"definitely not a png"), Some("1700000000")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_PICTURE");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn get_picture_by_id(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let id = upload(&pool, dir.path(), "1700000000").await;

    let app = build_test_app(pool, dir.path());
    let response = get(app, &format!("/api/v1/pictures/{id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["id"], id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_picture_returns_404(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();

    let app = build_test_app(pool.clone(), dir.path());
    let response = get(app, "/api/v1/pictures/999999").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");

    let app = build_test_app(pool, dir.path());
    let response = get(app, "/api/v1/pictures/999999/metadata").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Random retrieval
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn random_picture_returns_crop_and_metadata_header(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let id = upload(&pool, dir.path(), "1700000000").await;

    let app = build_test_app(pool, dir.path());
    let response = get(app, "/api/v1/pictures?picture_type=food_bowl").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/jpeg");

    let metadata: serde_json::Value =
        serde_json::from_str(response.headers()["picturemetadata"].to_str().unwrap()).unwrap();
    assert_eq!(metadata["id"], id);
    assert_eq!(metadata["human_food_yes"], 0);

    let crop = image::load_from_memory(&body_bytes(response).await).unwrap();
    assert_eq!((crop.width(), crop.height()), (700, 700));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn random_picture_honours_retrieval_limit(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let id = upload(&pool, dir.path(), "1700000000").await;

    let app = build_test_app(pool.clone(), dir.path());
    let response = get(app, "/api/v1/pictures?limit=human_annotated").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let app = build_test_app(pool.clone(), dir.path());
    let response = patch_json(
        app,
        &format!("/api/v1/pictures/{id}"),
        json!({"human_water_no": 1}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Default limit is no_annotation: the only picture is now annotated for water.
    let app = build_test_app(pool.clone(), dir.path());
    let response = get(app, "/api/v1/pictures").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Still unannotated for the cat attribute.
    let app = build_test_app(pool.clone(), dir.path());
    let response = get(app, "/api/v1/pictures?attribute=cat").await;
    assert_eq!(response.status(), StatusCode::OK);

    let app = build_test_app(pool, dir.path());
    let response = get(app, "/api/v1/pictures?limit=human_annotated").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn random_picture_with_unknown_limit_is_rejected(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(pool, dir.path());
    let response = get(app, "/api/v1/pictures?limit=recent").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.contains("none, no_annotation, human_annotated"), "{body}");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn random_picture_with_unknown_picture_type_is_rejected(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(pool, dir.path());
    let response = get(app, "/api/v1/pictures?picture_type=cat_bowl").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.contains("water_bowl, food_bowl"), "{body}");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn random_picture_with_deleted_file_returns_404(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    upload(&pool, dir.path(), "1700000000").await;
    for entry in std::fs::read_dir(dir.path()).unwrap() {
        let path = entry.unwrap().path();
        if path.file_name().unwrap().to_str().unwrap().starts_with("water_") {
            std::fs::remove_file(path).unwrap();
        }
    }

    let app = build_test_app(pool, dir.path());
    let response = get(app, "/api/v1/pictures").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Votes
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn votes_update_counters_and_labels(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let id = upload(&pool, dir.path(), "1700000000").await;

    let app = build_test_app(pool.clone(), dir.path());
    let response = patch_json(
        app,
        &format!("/api/v1/pictures/{id}"),
        json!({"human_water_yes": 2, "human_water_no": 1, "human_cat_no": 1}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["human_water_yes"], 2);
    assert_eq!(data["water_in_bowl"], true);
    assert_eq!(data["cat_at_bowl"], false);

    // A tie flips the label back to false.
    let app = build_test_app(pool, dir.path());
    let response = patch_json(
        app,
        &format!("/api/v1/pictures/{id}"),
        json!({"human_water_no": 1}),
    )
    .await;
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["human_water_no"], 2);
    assert_eq!(data["water_in_bowl"], false);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn negative_increment_rejects_whole_batch(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let id = upload(&pool, dir.path(), "1700000000").await;

    let app = build_test_app(pool.clone(), dir.path());
    let response = patch_json(
        app,
        &format!("/api/v1/pictures/{id}"),
        json!({"human_food_yes": 3, "human_food_no": -1}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_VOTE");

    let app = build_test_app(pool, dir.path());
    let response = get(app, &format!("/api/v1/pictures/{id}/metadata")).await;
    assert_eq!(body_json(response).await["data"]["human_food_yes"], 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn fractional_increment_is_invalid_vote(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let id = upload(&pool, dir.path(), "1700000000").await;

    let app = build_test_app(pool.clone(), dir.path());
    let response = patch_json(
        app,
        &format!("/api/v1/pictures/{id}"),
        json!({"human_cat_yes": 1, "human_water_yes": 1.5}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_VOTE");

    let app = build_test_app(pool, dir.path());
    let response = get(app, &format!("/api/v1/pictures/{id}/metadata")).await;
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["human_water_yes"], 0);
    assert_eq!(data["human_cat_yes"], 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn malformed_vote_body_is_bad_request(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let id = upload(&pool, dir.path(), "1700000000").await;

    let app = build_test_app(pool, dir.path());
    let request = axum::http::Request::builder()
        .method(axum::http::Method::PATCH)
        .uri(format!("/api/v1/pictures/{id}"))
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{\"human_cat_yes\": "))
        .unwrap();
    let response = common::send(app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn votes_on_missing_picture_return_404(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(pool, dir.path());
    let response = patch_json(app, "/api/v1/pictures/999999", json!({"human_cat_yes": 1})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
