//! Transient pairing of a stored crop with its flattened metadata.

use std::path::{Path, PathBuf};

use serde_json::json;

use crate::attribute::Attribute;
use crate::consensus::AnnotationState;
use crate::packaging::metadata::MetadataRow;
use crate::types::DbId;

/// A picture's crop file as referenced by an export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetEntry {
    pub picture_id: DbId,
    pub image_path: PathBuf,
}

impl DatasetEntry {
    pub fn new(picture_id: DbId, image_path: impl Into<PathBuf>) -> Self {
        Self {
            picture_id,
            image_path: image_path.into(),
        }
    }

    /// File name the crop keeps inside the archive.
    pub fn file_name(&self) -> Option<&str> {
        self.image_path.file_name().and_then(|n| n.to_str())
    }
}

/// Entry plus metadata row. Lives only for the duration of one export.
#[derive(Debug, Clone)]
pub struct DatasetRecord {
    pub entry: DatasetEntry,
    pub metadata: MetadataRow,
}

impl DatasetRecord {
    /// Build a record whose row starts with `filename` and `picture_id`,
    /// followed by `extra` columns in order.
    pub fn new(picture_id: DbId, image_path: &Path, extra: MetadataRow) -> Self {
        let entry = DatasetEntry::new(picture_id, image_path);
        let mut metadata = MetadataRow::new();
        metadata.insert(
            "filename".to_string(),
            json!(entry.file_name().unwrap_or_default()),
        );
        metadata.insert("picture_id".to_string(), json!(picture_id));
        for (key, value) in extra {
            metadata.entry(key).or_insert(value);
        }
        Self { entry, metadata }
    }
}

/// Flatten an annotation state into columns: the three labels, then the
/// yes/no counters per attribute.
pub fn annotation_columns(state: &AnnotationState) -> MetadataRow {
    let mut row = MetadataRow::new();
    for attribute in Attribute::ALL {
        row.insert(
            attribute.label_name().to_string(),
            json!(state.tally(attribute).label),
        );
    }
    for attribute in Attribute::ALL {
        let tally = state.tally(attribute);
        row.insert(format!("human_{attribute}_yes"), json!(tally.yes_count));
        row.insert(format!("human_{attribute}_no"), json!(tally.no_count));
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::VoteTally;

    #[test]
    fn annotation_columns_are_labels_then_counters() {
        let state = AnnotationState {
            water: VoteTally::from_counts(2, 1),
            ..Default::default()
        };
        let row = annotation_columns(&state);
        let keys: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "water_in_bowl",
                "food_in_bowl",
                "cat_at_bowl",
                "human_water_yes",
                "human_water_no",
                "human_food_yes",
                "human_food_no",
                "human_cat_yes",
                "human_cat_no",
            ]
        );
        assert_eq!(row["water_in_bowl"], json!(true));
        assert_eq!(row["human_water_no"], json!(1));
    }

    #[test]
    fn record_leads_with_filename_and_id() {
        let record = DatasetRecord::new(
            7,
            Path::new("/pictures/water_1.5_abc.jpeg"),
            annotation_columns(&AnnotationState::default()),
        );
        let keys: Vec<&str> = record.metadata.keys().take(3).map(String::as_str).collect();
        assert_eq!(keys, vec!["filename", "picture_id", "water_in_bowl"]);
        assert_eq!(record.metadata["filename"], json!("water_1.5_abc.jpeg"));
        assert_eq!(record.entry.picture_id, 7);
    }

    #[test]
    fn extra_columns_do_not_override_leading_ones() {
        let mut extra = MetadataRow::new();
        extra.insert("picture_id".to_string(), json!(99));
        let record = DatasetRecord::new(1, Path::new("a.jpeg"), extra);
        assert_eq!(record.metadata["picture_id"], json!(1));
    }
}
