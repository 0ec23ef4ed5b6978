//! Split tall images into bands of bounded height.
//!
//! Long labels are sent band by band so that no single transfer overruns
//! the link. Bands are full width, taken top to bottom, and the last one may
//! be shorter. Stacking them back together gives the original exactly.

use image::{ImageBuffer, Pixel, imageops};

/// Cut `image` into bands of at most `max_height` rows.
///
/// Returns the image unchanged (as a single band) when `max_height <= 0` or
/// the image already fits.
///
/// ## Example
///
/// ```
/// use image::GrayImage;
/// use phomemo_layout::render::slice::slice;
///
/// let img = GrayImage::new(576, 3000);
/// let heights: Vec<u32> = slice(&img, 1400).iter().map(|b| b.height()).collect();
/// assert_eq!(heights, vec![1400, 1400, 200]);
/// ```
pub fn slice<P>(
    image: &ImageBuffer<P, Vec<P::Subpixel>>,
    max_height: i64,
) -> Vec<ImageBuffer<P, Vec<P::Subpixel>>>
where
    P: Pixel + 'static,
{
    if max_height <= 0 || i64::from(image.height()) <= max_height {
        return vec![image.clone()];
    }

    let band = max_height as u32;
    let width = image.width();
    let height = image.height();

    (0..height)
        .step_by(band as usize)
        .map(|top| {
            let rows = band.min(height - top);
            imageops::crop_imm(image, 0, top, width, rows).to_image()
        })
        .collect()
}
