//! Picture and annotation models.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use waterbowl_core::attribute::PictureType;
use waterbowl_core::consensus::{AnnotationState, VoteTally};
use waterbowl_core::packaging::{annotation_columns, MetadataRow};
use waterbowl_core::retrieval::Annotated;
use waterbowl_core::types::{DbId, Timestamp};

/// A row from the `pictures` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Picture {
    pub id: DbId,
    pub water_picture: String,
    pub food_picture: String,
    pub picture_timestamp: Timestamp,
    pub created_at: Timestamp,
}

impl Picture {
    /// Stored crop for the given region.
    pub fn image_path(&self, picture_type: PictureType) -> &Path {
        match picture_type {
            PictureType::WaterBowl => Path::new(&self.water_picture),
            PictureType::FoodBowl => Path::new(&self.food_picture),
        }
    }
}

/// DTO for inserting a picture. The annotation row is created alongside it.
#[derive(Debug, Deserialize)]
pub struct CreatePicture {
    pub water_picture: String,
    pub food_picture: String,
    pub picture_timestamp: Timestamp,
}

/// A row from the `picture_annotations` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PictureAnnotation {
    pub picture_id: DbId,
    pub water_in_bowl: bool,
    pub food_in_bowl: bool,
    pub cat_at_bowl: bool,
    pub human_water_yes: i64,
    pub human_water_no: i64,
    pub human_food_yes: i64,
    pub human_food_no: i64,
    pub human_cat_yes: i64,
    pub human_cat_no: i64,
    pub updated_at: Timestamp,
}

impl PictureAnnotation {
    /// Vote state rebuilt from the stored counters.
    ///
    /// Labels are re-derived from the counters rather than read from the row.
    pub fn state(&self) -> AnnotationState {
        AnnotationState {
            water: VoteTally::from_counts(self.human_water_yes, self.human_water_no),
            food: VoteTally::from_counts(self.human_food_yes, self.human_food_no),
            cat: VoteTally::from_counts(self.human_cat_yes, self.human_cat_no),
        }
    }
}

impl Annotated for PictureAnnotation {
    fn annotation(&self) -> AnnotationState {
        self.state()
    }
}

/// A picture joined with its annotation row.
#[derive(Debug, Clone, FromRow)]
pub struct PictureWithAnnotation {
    #[sqlx(flatten)]
    pub picture: Picture,
    #[sqlx(flatten)]
    pub annotation: PictureAnnotation,
}

impl PictureWithAnnotation {
    /// Picture fields followed by every annotation column, as one flat row.
    pub fn flatten(&self) -> MetadataRow {
        let mut row = MetadataRow::new();
        row.insert("id".to_string(), json!(self.picture.id));
        row.insert("water_picture".to_string(), json!(self.picture.water_picture));
        row.insert("food_picture".to_string(), json!(self.picture.food_picture));
        row.insert(
            "picture_timestamp".to_string(),
            json!(self.picture.picture_timestamp.to_rfc3339()),
        );
        row.extend(annotation_columns(&self.annotation.state()));
        row
    }
}

impl Annotated for PictureWithAnnotation {
    fn annotation(&self) -> AnnotationState {
        self.annotation.state()
    }
}
