//! # Text Layout
//!
//! The compositor never shapes or rasterizes glyphs itself. It talks to a
//! [`TextLayout`] engine through three calls:
//!
//! ```text
//! wrap(text, width, font)      → lines
//! measure(lines, font)         → (width, height)
//! draw(lines, font, style)     → RGBA buffer
//! ```
//!
//! [`GlyphEngine`] is the default engine, built on `ab_glyph`. Tests and
//! callers with their own font stack can substitute any implementation.

pub mod glyph;

use std::path::PathBuf;

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::PhomemoError;

pub use glyph::GlyphEngine;

/// How a paragraph is broken into lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapMode {
    /// Break between words; a word wider than the line is broken by character.
    Word,
    /// Break anywhere. Suits CJK text without spaces.
    #[default]
    Character,
}

/// Horizontal placement of each line inside the layer box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// A resolved font reference.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    /// Primary font file (`.ttf`, `.otf`, or first face of a `.ttc`).
    pub path: PathBuf,
    /// Consulted in order for characters the primary font lacks.
    pub fallbacks: Vec<PathBuf>,
    /// Pixel size.
    pub size: f32,
    /// Baseline-to-baseline distance as a multiple of `size`.
    pub line_spacing: f32,
}

/// Outline drawn around glyphs before the fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    /// Radius in pixels.
    pub width: f32,
    pub color: Rgba<u8>,
}

/// Box and paint for [`TextLayout::draw`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub width: u32,
    pub height: u32,
    pub align: Align,
    pub fill: Rgba<u8>,
    pub stroke: Option<StrokeStyle>,
}

/// The text-layout collaborator.
pub trait TextLayout {
    /// Break one paragraph (no newlines) into lines no wider than `width`.
    fn wrap(
        &self,
        text: &str,
        width: u32,
        font: &FontSpec,
        mode: WrapMode,
    ) -> Result<Vec<String>, PhomemoError>;

    /// Bounding size of `lines` laid out top to bottom.
    fn measure(&self, lines: &[String], font: &FontSpec) -> Result<(u32, u32), PhomemoError>;

    /// Render `lines` onto a transparent buffer of `style.width` x `style.height`.
    fn draw(
        &self,
        lines: &[String],
        font: &FontSpec,
        style: &TextStyle,
    ) -> Result<RgbaImage, PhomemoError>;
}
