//! Image decoding and resizing for image layers.

use std::path::Path;

use image::{RgbaImage, imageops::FilterType};

use crate::error::PhomemoError;

/// The image decode/resize collaborator.
pub trait ImageSource {
    /// Decode the file at `path` into RGBA.
    fn load(&self, path: &Path) -> Result<RgbaImage, PhomemoError>;

    /// Resample to exactly `width` x `height`.
    fn resize(&self, image: &RgbaImage, width: u32, height: u32) -> RgbaImage;
}

/// [`ImageSource`] backed by the `image` crate, resampling with Lanczos3.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodedImages;

impl ImageSource for DecodedImages {
    fn load(&self, path: &Path) -> Result<RgbaImage, PhomemoError> {
        let decoded = image::open(path).map_err(|e| {
            PhomemoError::Image(format!("Failed to decode {}: {}", path.display(), e))
        })?;
        Ok(decoded.to_rgba8())
    }

    fn resize(&self, image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
        image::imageops::resize(image, width.max(1), height.max(1), FilterType::Lanczos3)
    }
}
