//! Query parameter types for the picture endpoints.

use serde::Deserialize;
use waterbowl_core::attribute::{Attribute, PictureType};
use waterbowl_core::retrieval::RetrievalLimit;
use waterbowl_core::selection::{PictureClass, DEFAULT_EXPORT_LIMIT};

/// `GET /pictures?picture_type=&attribute=&limit=`
///
/// `attribute` defaults to the one tied to `picture_type`.
#[derive(Debug, Default, Deserialize)]
pub struct RandomPictureParams {
    #[serde(default)]
    pub picture_type: PictureType,
    pub attribute: Option<Attribute>,
    #[serde(default)]
    pub limit: RetrievalLimit,
}

impl RandomPictureParams {
    pub fn attribute(&self) -> Attribute {
        self.attribute
            .unwrap_or_else(|| self.picture_type.default_attribute())
    }
}

/// `GET /pictures/annotated-batch?picture_type=&attribute=&picture_class=&limit=`
///
/// No `picture_class` means both classes. `limit` caps each class; values
/// `<= 0` mean unbounded.
#[derive(Debug, Deserialize)]
pub struct AnnotatedBatchParams {
    #[serde(default)]
    pub picture_type: PictureType,
    pub attribute: Option<Attribute>,
    pub picture_class: Option<PictureClass>,
    #[serde(default = "default_export_limit")]
    pub limit: i64,
}

fn default_export_limit() -> i64 {
    DEFAULT_EXPORT_LIMIT
}

impl AnnotatedBatchParams {
    pub fn attribute(&self) -> Attribute {
        self.attribute
            .unwrap_or_else(|| self.picture_type.default_attribute())
    }

    /// Whether `class` should be included in the export.
    pub fn wants(&self, class: PictureClass) -> bool {
        self.picture_class.map_or(true, |wanted| wanted == class)
    }
}
