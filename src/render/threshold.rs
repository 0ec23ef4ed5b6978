//! # Binarization
//!
//! Thermal heads only know "burn" and "don't burn". The composed RGBA image
//! is reduced to luminance and cut at a fixed threshold.
//!
//! ## Luminance
//!
//! ITU-R 601-2 luma, in 16-bit fixed point:
//!
//! ```text
//! L = (R * 19595 + G * 38470 + B * 7471 + 0x8000) >> 16
//! ```
//!
//! Alpha is ignored; by this stage the image has been flattened onto the
//! canvas background.
//!
//! ## Cutoff
//!
//! `L < threshold` → ink, `L >= threshold` → paper. A pixel exactly at the
//! threshold stays white.

use image::{GrayImage, ImageBuffer, Luma, Rgba, RgbaImage};

use super::slice;

/// A 1-bit image stored one byte per pixel: 0 = ink, 255 = paper.
///
/// Only constructible through [`binarize`] or [`Bilevel::from_fn`], so every
/// pixel is one of the two values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bilevel(GrayImage);

impl Bilevel {
    pub const INK: u8 = 0;
    pub const PAPER: u8 = 255;

    /// Build from a predicate returning `true` for ink.
    pub fn from_fn(width: u32, height: u32, mut ink: impl FnMut(u32, u32) -> bool) -> Self {
        Self(ImageBuffer::from_fn(width, height, |x, y| {
            Luma([if ink(x, y) { Self::INK } else { Self::PAPER }])
        }))
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.0.height()
    }

    #[inline]
    pub fn is_ink(&self, x: u32, y: u32) -> bool {
        self.0.get_pixel(x, y).0[0] == Self::INK
    }

    /// Bands of at most `max_height` rows. See [`slice::slice`].
    pub fn slice(&self, max_height: i64) -> Vec<Bilevel> {
        slice::slice(&self.0, max_height)
            .into_iter()
            .map(Bilevel)
            .collect()
    }
}

/// ITU-R 601-2 luma of an RGBA pixel (alpha ignored).
#[inline]
pub fn luminance(pixel: &Rgba<u8>) -> u8 {
    let [r, g, b, _] = pixel.0;
    ((r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16) as u8
}

/// Convert to 1-bit: ink where luminance is strictly below `threshold`.
pub fn binarize(image: &RgbaImage, threshold: u8) -> Bilevel {
    Bilevel::from_fn(image.width(), image.height(), |x, y| {
        luminance(image.get_pixel(x, y)) < threshold
    })
}
