//! Dataset export packaging.
//!
//! Turns two class lists of stored crops plus their metadata rows into a
//! single zip archive:
//!
//! ```text
//! {class_name}_true/     positive crops (omitted when empty)
//! {class_name}_false/    negative crops (omitted when empty)
//! picture_data.csv       one row per picture
//! ```
//!
//! All intermediate files live in scoped temporary directories that are
//! removed on every exit path. It does NOT depend on the database crate;
//! callers pass in a snapshot of picture references.

pub mod archive;
pub mod metadata;
pub mod record;

use std::path::PathBuf;

use crate::selection::PictureClass;
use crate::types::DbId;

pub use archive::{DatasetArchive, DatasetPackager};
pub use metadata::{build_metadata_csv, MetadataRow, METADATA_FILE_NAME};
pub use record::{annotation_columns, DatasetEntry, DatasetRecord};

/// Packaging error type.
#[derive(Debug, thiserror::Error)]
pub enum PackagingError {
    #[error("Source image for {class} picture {picture_id} not found: {}", path.display())]
    MissingSourceFile {
        picture_id: DbId,
        class: PictureClass,
        path: PathBuf,
    },

    #[error("Invalid dataset entry: {0}")]
    InvalidEntry(String),

    #[error("Packaging I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive creation failed: {0}")]
    Archive(#[from] zip::result::ZipError),
}
