//! # Orientation
//!
//! The print head is a fixed number of dots wide, so whatever the layout
//! produced has to end up exactly that wide. Rotation comes first, then the
//! width fit:
//!
//! | Mode    | Rotation                                   |
//! |---------|--------------------------------------------|
//! | `none`  | never                                      |
//! | `auto`  | 90° clockwise when the image is landscape  |
//! | `cw90`  | always 90° clockwise                       |
//! | `ccw90` | always 90° counter-clockwise               |
//!
//! Width fit: a narrower image is centered on white, a wider one is scaled
//! down uniformly (Lanczos3), an exact match is left alone.

use std::fmt;

use image::{Rgba, RgbaImage, imageops};
use log::debug;
use serde::{Deserialize, Serialize, Serializer};

use super::compositor::paint_over;

/// Rotation policy from `output.rotate`.
///
/// Parsing is lenient: `"0"` and `"false"` mean [`RotateMode::None`], and
/// anything unrecognized falls back to [`RotateMode::Auto`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawRotate")]
pub enum RotateMode {
    None,
    #[default]
    Auto,
    Cw90,
    Ccw90,
}

impl RotateMode {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "0" | "false" => RotateMode::None,
            "cw90" => RotateMode::Cw90,
            "ccw90" => RotateMode::Ccw90,
            _ => RotateMode::Auto,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RotateMode::None => "none",
            RotateMode::Auto => "auto",
            RotateMode::Cw90 => "cw90",
            RotateMode::Ccw90 => "ccw90",
        }
    }
}

impl fmt::Display for RotateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RotateMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Whatever JSON scalar the document used for `rotate`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawRotate {
    Text(String),
    Flag(bool),
    Number(i64),
}

impl From<RawRotate> for RotateMode {
    fn from(raw: RawRotate) -> Self {
        match raw {
            RawRotate::Text(s) => RotateMode::parse(&s),
            RawRotate::Flag(b) => RotateMode::parse(&b.to_string()),
            RawRotate::Number(n) => RotateMode::parse(&n.to_string()),
        }
    }
}

/// Rotate per `mode`, then fit to exactly `width` columns.
pub fn normalize(image: RgbaImage, mode: RotateMode, width: u32) -> RgbaImage {
    let rotated = match mode {
        RotateMode::None => image,
        RotateMode::Auto if image.width() > image.height() => imageops::rotate90(&image),
        RotateMode::Auto => image,
        RotateMode::Cw90 => imageops::rotate90(&image),
        RotateMode::Ccw90 => imageops::rotate270(&image),
    };
    fit_width(rotated, width)
}

/// Pad (centered, white) or shrink `image` to `width` columns.
pub fn fit_width(image: RgbaImage, width: u32) -> RgbaImage {
    let (w, h) = image.dimensions();
    if w == width {
        return image;
    }

    if w < width {
        let mut padded = RgbaImage::from_pixel(width, h, Rgba([255, 255, 255, 255]));
        paint_over(&mut padded, &image, i64::from((width - w) / 2), 0);
        return padded;
    }

    let new_h = ((u64::from(h) * u64::from(width)) / u64::from(w)).max(1) as u32;
    debug!("scaling {}x{} down to {}x{}", w, h, width, new_h);
    imageops::resize(&image, width, new_h, imageops::FilterType::Lanczos3)
}
