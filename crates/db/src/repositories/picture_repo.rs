//! Repository for the `pictures` and `picture_annotations` tables.

use sqlx::PgPool;
use waterbowl_core::attribute::Attribute;
use waterbowl_core::consensus::{apply_votes, Vote};
use waterbowl_core::error::CoreError;
use waterbowl_core::retrieval::RetrievalLimit;
use waterbowl_core::selection::PictureClass;
use waterbowl_core::types::DbId;

use crate::models::picture::{CreatePicture, Picture, PictureAnnotation, PictureWithAnnotation};

/// Column list for the `pictures` table.
const COLUMNS: &str = "id, water_picture, food_picture, picture_timestamp, created_at";

/// Column list for the `picture_annotations` table.
const ANNOTATION_COLUMNS: &str = "picture_id, water_in_bowl, food_in_bowl, cat_at_bowl, \
    human_water_yes, human_water_no, human_food_yes, human_food_no, \
    human_cat_yes, human_cat_no, updated_at";

/// Column list for the picture/annotation join.
const JOINED_COLUMNS: &str = "p.id, p.water_picture, p.food_picture, p.picture_timestamp, \
    p.created_at, a.picture_id, a.water_in_bowl, a.food_in_bowl, a.cat_at_bowl, \
    a.human_water_yes, a.human_water_no, a.human_food_yes, a.human_food_no, \
    a.human_cat_yes, a.human_cat_no, a.updated_at";

/// Counter and label columns backing one attribute.
struct AttributeColumns {
    yes: &'static str,
    no: &'static str,
    label: &'static str,
}

fn attribute_columns(attribute: Attribute) -> AttributeColumns {
    match attribute {
        Attribute::Water => AttributeColumns {
            yes: "human_water_yes",
            no: "human_water_no",
            label: "water_in_bowl",
        },
        Attribute::Food => AttributeColumns {
            yes: "human_food_yes",
            no: "human_food_no",
            label: "food_in_bowl",
        },
        Attribute::Cat => AttributeColumns {
            yes: "human_cat_yes",
            no: "human_cat_no",
            label: "cat_at_bowl",
        },
    }
}

/// SQL predicate over `picture_annotations` for a retrieval limit.
fn retrieval_predicate(attribute: Attribute, limit: RetrievalLimit) -> String {
    let cols = attribute_columns(attribute);
    match limit {
        RetrievalLimit::None => "TRUE".to_string(),
        RetrievalLimit::Unannotated => format!("{} = 0 AND {} = 0", cols.yes, cols.no),
        RetrievalLimit::Annotated => format!("({} > 0 OR {} > 0)", cols.yes, cols.no),
    }
}

/// SQL predicate over `picture_annotations` (aliased `a`) for an export class.
fn class_predicate(attribute: Attribute, class: PictureClass) -> String {
    let cols = attribute_columns(attribute);
    match class {
        PictureClass::Positive => format!("a.{} = TRUE", cols.label),
        PictureClass::Negative => format!("a.{} = FALSE AND a.{} > 0", cols.label, cols.no),
    }
}

/// Failure modes of a vote update.
#[derive(Debug, thiserror::Error)]
pub enum VoteUpdateError {
    #[error(transparent)]
    Vote(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Provides persistence for pictures and their vote counters.
pub struct PictureRepo;

impl PictureRepo {
    /// Insert a picture and its zeroed annotation row in one transaction.
    pub async fn create(
        pool: &PgPool,
        input: &CreatePicture,
    ) -> Result<PictureWithAnnotation, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let insert_picture = format!(
            "INSERT INTO pictures (water_picture, food_picture, picture_timestamp) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        let picture = sqlx::query_as::<_, Picture>(&insert_picture)
            .bind(&input.water_picture)
            .bind(&input.food_picture)
            .bind(input.picture_timestamp)
            .fetch_one(&mut *tx)
            .await?;

        let insert_annotation = format!(
            "INSERT INTO picture_annotations (picture_id) VALUES ($1) \
             RETURNING {ANNOTATION_COLUMNS}"
        );
        let annotation = sqlx::query_as::<_, PictureAnnotation>(&insert_annotation)
            .bind(picture.id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(PictureWithAnnotation {
            picture,
            annotation,
        })
    }

    /// Find a picture by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Picture>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pictures WHERE id = $1");
        sqlx::query_as::<_, Picture>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a picture together with its annotation row.
    pub async fn find_with_annotation(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<PictureWithAnnotation>, sqlx::Error> {
        let query = format!(
            "SELECT {JOINED_COLUMNS} FROM pictures p \
             JOIN picture_annotations a ON a.picture_id = p.id \
             WHERE p.id = $1"
        );
        sqlx::query_as::<_, PictureWithAnnotation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the annotation row for a picture.
    pub async fn annotation_for(
        pool: &PgPool,
        picture_id: DbId,
    ) -> Result<Option<PictureAnnotation>, sqlx::Error> {
        let query =
            format!("SELECT {ANNOTATION_COLUMNS} FROM picture_annotations WHERE picture_id = $1");
        sqlx::query_as::<_, PictureAnnotation>(&query)
            .bind(picture_id)
            .fetch_optional(pool)
            .await
    }

    /// Apply a batch of votes to a picture's counters.
    ///
    /// The annotation row is locked with `SELECT ... FOR UPDATE` for the whole
    /// read-modify-write, so concurrent votes on the same picture serialize and
    /// none are lost. Returns `Ok(None)` if the picture does not exist. An
    /// invalid vote aborts the transaction before anything is written.
    pub async fn apply_votes(
        pool: &PgPool,
        picture_id: DbId,
        votes: &[Vote],
    ) -> Result<Option<PictureAnnotation>, VoteUpdateError> {
        let mut tx = pool.begin().await?;

        let select = format!(
            "SELECT {ANNOTATION_COLUMNS} FROM picture_annotations \
             WHERE picture_id = $1 FOR UPDATE"
        );
        let Some(current) = sqlx::query_as::<_, PictureAnnotation>(&select)
            .bind(picture_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let next = apply_votes(&current.state(), votes)?;

        let update = format!(
            "UPDATE picture_annotations SET \
                water_in_bowl = $2, food_in_bowl = $3, cat_at_bowl = $4, \
                human_water_yes = $5, human_water_no = $6, \
                human_food_yes = $7, human_food_no = $8, \
                human_cat_yes = $9, human_cat_no = $10, \
                updated_at = NOW() \
             WHERE picture_id = $1 \
             RETURNING {ANNOTATION_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, PictureAnnotation>(&update)
            .bind(picture_id)
            .bind(next.water.label)
            .bind(next.food.label)
            .bind(next.cat.label)
            .bind(next.water.yes_count)
            .bind(next.water.no_count)
            .bind(next.food.yes_count)
            .bind(next.food.no_count)
            .bind(next.cat.yes_count)
            .bind(next.cat.no_count)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(picture_id, votes = votes.len(), "Votes applied");
        Ok(Some(updated))
    }

    /// Snapshot of annotation rows passing `limit` for `attribute`.
    ///
    /// Ordered by picture id; random choice is left to the caller.
    pub async fn list_by_retrieval_limit(
        pool: &PgPool,
        attribute: Attribute,
        limit: RetrievalLimit,
    ) -> Result<Vec<PictureAnnotation>, sqlx::Error> {
        let query = format!(
            "SELECT {ANNOTATION_COLUMNS} FROM picture_annotations \
             WHERE {} \
             ORDER BY picture_id",
            retrieval_predicate(attribute, limit)
        );
        sqlx::query_as::<_, PictureAnnotation>(&query)
            .fetch_all(pool)
            .await
    }

    /// Snapshot of pictures in `class` for `attribute`.
    ///
    /// Ordered by picture id; sampling and capping are left to the caller.
    pub async fn list_by_class(
        pool: &PgPool,
        attribute: Attribute,
        class: PictureClass,
    ) -> Result<Vec<PictureWithAnnotation>, sqlx::Error> {
        let query = format!(
            "SELECT {JOINED_COLUMNS} FROM pictures p \
             JOIN picture_annotations a ON a.picture_id = p.id \
             WHERE {} \
             ORDER BY p.id",
            class_predicate(attribute, class)
        );
        sqlx::query_as::<_, PictureWithAnnotation>(&query)
            .fetch_all(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrieval_predicates_use_attribute_columns() {
        assert_eq!(retrieval_predicate(Attribute::Cat, RetrievalLimit::None), "TRUE");
        assert_eq!(
            retrieval_predicate(Attribute::Water, RetrievalLimit::Unannotated),
            "human_water_yes = 0 AND human_water_no = 0"
        );
        assert_eq!(
            retrieval_predicate(Attribute::Food, RetrievalLimit::Annotated),
            "(human_food_yes > 0 OR human_food_no > 0)"
        );
    }

    #[test]
    fn negative_class_predicate_requires_no_votes() {
        assert_eq!(
            class_predicate(Attribute::Cat, PictureClass::Negative),
            "a.cat_at_bowl = FALSE AND a.human_cat_no > 0"
        );
        assert_eq!(
            class_predicate(Attribute::Water, PictureClass::Positive),
            "a.water_in_bowl = TRUE"
        );
    }
}
