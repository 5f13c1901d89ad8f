//! Region crops of an uploaded station capture.
//!
//! Each upload is decoded once and cut into one grayscale JPEG per
//! [`PictureType`] using the fixed crop windows. Windows that extend past the
//! image edge are clamped to the image bounds.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

use crate::attribute::{CropWindow, PictureType};

/// JPEG quality for stored crops.
pub const CROP_JPEG_QUALITY: u8 = 100;

#[derive(Debug, thiserror::Error)]
pub enum CropError {
    #[error("Could not decode uploaded image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Could not encode crop: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Crop window for {0} lies outside the image")]
    OutOfBounds(PictureType),
}

/// One encoded crop.
#[derive(Debug, Clone)]
pub struct RegionCrop {
    pub picture_type: PictureType,
    pub jpeg: Vec<u8>,
}

/// Crop a decoded image to `window`, clamped to its bounds.
fn crop_window(
    image: &DynamicImage,
    picture_type: PictureType,
    window: CropWindow,
) -> Result<DynamicImage, CropError> {
    if window.x >= image.width() || window.y >= image.height() {
        return Err(CropError::OutOfBounds(picture_type));
    }
    Ok(image.crop_imm(window.x, window.y, window.width, window.height))
}

fn encode_grayscale_jpeg(image: &DynamicImage) -> Result<Vec<u8>, CropError> {
    let gray = image.to_luma8();
    let mut out = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut out, CROP_JPEG_QUALITY);
    gray.write_with_encoder(encoder).map_err(CropError::Encode)?;
    Ok(out.into_inner())
}

/// Decode `bytes` and produce a grayscale JPEG crop for every region.
///
/// CPU bound: call from a blocking context.
pub fn crop_regions(bytes: &[u8]) -> Result<Vec<RegionCrop>, CropError> {
    let image = image::load_from_memory(bytes).map_err(CropError::Decode)?;

    PictureType::ALL
        .into_iter()
        .map(|picture_type| {
            let cropped = crop_window(&image, picture_type, picture_type.crop_window())?;
            Ok(RegionCrop {
                picture_type,
                jpeg: encode_grayscale_jpeg(&cropped)?,
            })
        })
        .collect()
}

/// Stored file name for a crop: `{prefix}_{timestamp}_{uuid}.jpeg`.
///
/// The timestamp keeps a fractional part (`1700000000.0`) and switches to
/// exponent notation at the extremes, so the name stays short for any finite
/// value.
pub fn crop_file_name(picture_type: PictureType, timestamp: f64) -> String {
    format!(
        "{}_{timestamp:?}_{}.jpeg",
        picture_type.file_prefix(),
        uuid::Uuid::new_v4().simple()
    )
}
