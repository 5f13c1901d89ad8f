//! Class-partitioned zip archive creation with scoped temporary storage.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::packaging::metadata::{build_metadata_csv, MetadataRow, METADATA_FILE_NAME};
use crate::packaging::record::DatasetEntry;
use crate::packaging::PackagingError;
use crate::selection::PictureClass;

/// Prefix for the working area holding class directories before zipping.
const WORKDIR_PREFIX: &str = "dataset-work-";

/// Prefix for the directory holding the finished archive.
const ARCHIVE_DIR_PREFIX: &str = "dataset-archive-";

/// A finished dataset archive.
///
/// The zip lives in its own temporary directory, separate from the working
/// area it was built from. Dropping the handle deletes it.
#[derive(Debug)]
pub struct DatasetArchive {
    dir: TempDir,
    path: PathBuf,
}

impl DatasetArchive {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("dataset.zip")
    }

    /// Read the whole archive into memory.
    pub fn read_bytes(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }

    /// Delete the archive now, surfacing any removal error.
    pub fn close(self) -> io::Result<()> {
        self.dir.close()
    }
}

/// Builds dataset archives.
///
/// Scratch directories are created under `scratch_root` (the system temp
/// directory by default). Blocking I/O: call from a blocking context.
#[derive(Debug, Clone, Default)]
pub struct DatasetPackager {
    scratch_root: Option<PathBuf>,
}

impl DatasetPackager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create scratch directories under `root` instead of the system temp dir.
    pub fn with_scratch_root(root: impl Into<PathBuf>) -> Self {
        Self {
            scratch_root: Some(root.into()),
        }
    }

    fn scratch_dir(&self, prefix: &str) -> io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix);
        match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    }

    /// Package `positive` and `negative` crops plus `metadata` rows into a zip.
    ///
    /// Each non-empty class gets a `{class_name}_true` / `{class_name}_false`
    /// directory holding copies of its crops under their original file names.
    /// Every source file is checked before anything is copied; the first
    /// missing one fails with [`PackagingError::MissingSourceFile`]. On any
    /// error all scratch state is removed before returning.
    pub fn package(
        &self,
        positive: &[DatasetEntry],
        negative: &[DatasetEntry],
        metadata: &[MetadataRow],
        class_name: &str,
    ) -> Result<DatasetArchive, PackagingError> {
        let classes = [
            (PictureClass::Positive, positive),
            (PictureClass::Negative, negative),
        ];

        for (class, entries) in &classes {
            verify_sources(*class, entries)?;
        }

        let workdir = self.scratch_dir(WORKDIR_PREFIX)?;
        let mut class_dirs = Vec::new();
        for (class, entries) in &classes {
            if entries.is_empty() {
                continue;
            }
            let dir_name = format!("{class_name}_{}", class.suffix());
            copy_class(*class, entries, &workdir.path().join(&dir_name))?;
            class_dirs.push(dir_name);
        }

        fs::write(
            workdir.path().join(METADATA_FILE_NAME),
            build_metadata_csv(metadata),
        )?;

        let archive_dir = self.scratch_dir(ARCHIVE_DIR_PREFIX)?;
        let archive_path = archive_dir
            .path()
            .join(format!("{}.zip", uuid::Uuid::new_v4()));
        write_zip(workdir.path(), &class_dirs, &archive_path)?;

        tracing::info!(
            class_name,
            positive = positive.len(),
            negative = negative.len(),
            rows = metadata.len(),
            archive = %archive_path.display(),
            "Dataset archive packaged"
        );

        // `workdir` is dropped here; only the archive directory survives.
        Ok(DatasetArchive {
            dir: archive_dir,
            path: archive_path,
        })
    }
}

fn missing(class: PictureClass, entry: &DatasetEntry) -> PackagingError {
    PackagingError::MissingSourceFile {
        picture_id: entry.picture_id,
        class,
        path: entry.image_path.clone(),
    }
}

fn verify_sources(class: PictureClass, entries: &[DatasetEntry]) -> Result<(), PackagingError> {
    let mut seen = HashSet::new();
    for entry in entries {
        if !entry.image_path.is_file() {
            tracing::warn!(
                picture_id = entry.picture_id,
                %class,
                path = %entry.image_path.display(),
                "Dataset source image missing"
            );
            return Err(missing(class, entry));
        }
        let name = entry.file_name().ok_or_else(|| {
            PackagingError::InvalidEntry(format!(
                "picture {} has no usable file name: {}",
                entry.picture_id,
                entry.image_path.display()
            ))
        })?;
        if !seen.insert(name) {
            return Err(PackagingError::InvalidEntry(format!(
                "duplicate file name '{name}' in {class} class (picture {})",
                entry.picture_id
            )));
        }
    }
    Ok(())
}

fn copy_class(
    class: PictureClass,
    entries: &[DatasetEntry],
    dir: &Path,
) -> Result<(), PackagingError> {
    fs::create_dir(dir)?;
    for entry in entries {
        // Names were validated in `verify_sources`.
        let name = entry.file_name().unwrap_or_default();
        match fs::copy(&entry.image_path, dir.join(name)) {
            Ok(_) => {}
            // Deleted between verification and copy.
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(missing(class, entry)),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Zip the class directories and the metadata file under `root`.
fn write_zip(root: &Path, class_dirs: &[String], dest: &Path) -> Result<(), PackagingError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(File::create(dest)?);

    for dir_name in class_dirs {
        zip.add_directory(format!("{dir_name}/"), options)?;

        let mut files: Vec<PathBuf> = fs::read_dir(root.join(dir_name))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<_, _>>()?;
        files.sort();

        for file in files {
            let name = file.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            zip.start_file(format!("{dir_name}/{name}"), options)?;
            zip.write_all(&fs::read(&file)?)?;
        }
    }

    zip.start_file(METADATA_FILE_NAME, options)?;
    zip.write_all(&fs::read(root.join(METADATA_FILE_NAME))?)?;

    zip.finish()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
