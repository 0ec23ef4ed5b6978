//! Layout job types.
//!
//! These mirror the JSON document one to one. Defaults follow the printer
//! profile; fields left out of a layer fall back to the canvas defaults at
//! resolve time.

use std::path::PathBuf;

use image::Rgba;
use serde::Deserialize;

use super::color::Color;
use crate::error::PhomemoError;
use crate::printer::{DEFAULT_CHUNK_ROWS, DEFAULT_SLICE_HEIGHT, DEFAULT_THRESHOLD};
use crate::render::orientation::RotateMode;
use crate::text::{Align, WrapMode};

fn default_margin() -> u32 {
    20
}

fn default_font_size() -> f32 {
    32.0
}

fn default_line_spacing() -> f32 {
    1.2
}

fn default_opacity() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_threshold() -> u8 {
    DEFAULT_THRESHOLD
}

fn default_slice_height() -> u32 {
    DEFAULT_SLICE_HEIGHT
}

fn default_chunk_rows() -> i64 {
    DEFAULT_CHUNK_ROWS.into()
}

/// Any JSON integer, saturated into `i64` so the raster encoder can reject
/// it with a protocol error instead of serde failing first.
fn saturating_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    let number = serde_json::Number::deserialize(deserializer)?;
    match (number.as_i64(), number.as_u64()) {
        (Some(n), _) => Ok(n),
        (None, Some(_)) => Ok(i64::MAX),
        _ => Err(D::Error::custom(format!("expected integer, got {}", number))),
    }
}

/// One print request.
#[derive(Debug, Clone, Deserialize)]
pub struct LayoutJob {
    pub canvas: CanvasConfig,
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub output: OutputConfig,
}

impl LayoutJob {
    /// Deserialize from an already-validated JSON document.
    ///
    /// Anything serde still rejects (an unknown layer `type`, a wrong field
    /// type) is reported as a configuration error.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, PhomemoError> {
        Self::deserialize(value).map_err(|e| PhomemoError::Configuration(e.to_string()))
    }
}

/// Canvas settings and the defaults shared by text layers.
///
/// There is no width: the canvas is always as wide as the printer.
#[derive(Debug, Clone, Deserialize)]
pub struct CanvasConfig {
    /// Fixed height. Derived from the layers when absent.
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub background_color: Color,
    #[serde(default = "default_margin")]
    pub margin: u32,
    #[serde(default)]
    pub font_path: Option<PathBuf>,
    #[serde(default)]
    pub fallback_fonts: Vec<PathBuf>,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default = "default_line_spacing")]
    pub line_spacing: f32,
    #[serde(default)]
    pub wrap_style: WrapMode,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            height: None,
            background_color: Color::default(),
            margin: default_margin(),
            font_path: None,
            fallback_fonts: Vec::new(),
            font_size: default_font_size(),
            line_spacing: default_line_spacing(),
            wrap_style: WrapMode::default(),
        }
    }
}

/// A layer, tagged by `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Layer {
    Text(TextLayer),
    Image(ImageLayer),
}

/// Top-left corner of a layer on the canvas. Missing axes take the layer's default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub x: Option<i64>,
    #[serde(default)]
    pub y: Option<i64>,
}

impl Position {
    pub fn resolve(position: Option<&Position>, default: (i64, i64)) -> (i64, i64) {
        match position {
            Some(p) => (p.x.unwrap_or(default.0), p.y.unwrap_or(default.1)),
            None => default,
        }
    }
}

/// Outline around text glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Stroke {
    #[serde(default)]
    pub width: f32,
    #[serde(default = "Color::white")]
    pub color: Color,
}

impl Stroke {
    pub fn rgba(&self) -> Rgba<u8> {
        self.color.0
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextLayer {
    /// Inline content. Exactly one of `text` / `text_file` must be set.
    #[serde(default)]
    pub text: Option<String>,
    /// UTF-8 file holding the content.
    #[serde(default)]
    pub text_file: Option<PathBuf>,
    #[serde(default)]
    pub font_path: Option<PathBuf>,
    #[serde(default)]
    pub fallback_fonts: Option<Vec<PathBuf>>,
    #[serde(default)]
    pub font_size: Option<f32>,
    #[serde(default)]
    pub line_spacing: Option<f32>,
    #[serde(default)]
    pub wrap_style: Option<WrapMode>,
    /// Layer box width. Defaults to the canvas width minus both margins.
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub align: Align,
    #[serde(default)]
    pub stroke: Option<Stroke>,
    /// Defaults to `(margin, margin)`.
    #[serde(default)]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageLayer {
    pub path: PathBuf,
    #[serde(default)]
    pub scale: Option<f32>,
    #[serde(default)]
    pub max_width: Option<f32>,
    #[serde(default)]
    pub max_height: Option<f32>,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    /// Defaults to `(0, 0)`.
    #[serde(default)]
    pub position: Option<Position>,
}

/// What to do with the composed image.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_threshold")]
    pub threshold: u8,
    #[serde(default = "default_slice_height")]
    pub slice_height: u32,
    /// Rows per raster block. Kept signed and wide so every out-of-range
    /// value reaches the protocol check instead of failing deserialization.
    #[serde(default = "default_chunk_rows", deserialize_with = "saturating_i64")]
    pub chunk_rows: i64,
    #[serde(default)]
    pub rotate: RotateMode,
    /// Where to write the preview PNG.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub send_to_printer: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            slice_height: default_slice_height(),
            chunk_rows: default_chunk_rows(),
            rotate: RotateMode::default(),
            path: None,
            send_to_printer: true,
        }
    }
}
