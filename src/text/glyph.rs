//! TTF/OTF text rendering with `ab_glyph`.
//!
//! Glyphs are rasterized into an anti-aliased coverage buffer, optionally
//! dilated into a stroke, then painted onto a transparent RGBA buffer.
//! Characters missing from the primary font are looked up in the fallback
//! fonts in order.
//!
//! Font files are parsed once per engine and shared between calls.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ab_glyph::{Font, FontArc, GlyphId, PxScale, ScaleFont, point};
use image::{Rgba, RgbaImage};
use log::debug;

use super::{Align, FontSpec, StrokeStyle, TextLayout, TextStyle, WrapMode};
use crate::error::PhomemoError;
use crate::render::compositor::blend_pixel;

/// Default [`TextLayout`] implementation.
#[derive(Default)]
pub struct GlyphEngine {
    fonts: Mutex<HashMap<PathBuf, FontArc>>,
}

impl fmt::Debug for GlyphEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cached = self.fonts.lock().map(|fonts| fonts.len()).unwrap_or(0);
        f.debug_struct("GlyphEngine").field("cached_fonts", &cached).finish()
    }
}

impl GlyphEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parsed font for `path`, read from disk on first use.
    fn font(&self, path: &Path) -> Result<FontArc, PhomemoError> {
        let mut fonts = self.fonts.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(font) = fonts.get(path) {
            return Ok(font.clone());
        }
        let font = load_font(path)?;
        debug!("loaded font {}", path.display());
        fonts.insert(path.to_path_buf(), font.clone());
        Ok(font)
    }

    fn stack(&self, spec: &FontSpec) -> Result<FontStack, PhomemoError> {
        let mut fonts = Vec::with_capacity(1 + spec.fallbacks.len());
        fonts.push(self.font(&spec.path)?);
        for fallback in &spec.fallbacks {
            fonts.push(self.font(fallback)?);
        }
        Ok(FontStack {
            fonts,
            scale: PxScale::from(spec.size.max(1.0)),
        })
    }
}

/// A primary font plus fallbacks.
struct FontStack {
    fonts: Vec<FontArc>,
    scale: PxScale,
}

fn load_font(path: &Path) -> Result<FontArc, PhomemoError> {
    let data = fs::read(path).map_err(|e| {
        PhomemoError::Configuration(format!("cannot read font {}: {}", path.display(), e))
    })?;
    // Index 0 picks the first face of a collection and is ignored for plain fonts
    let font = ab_glyph::FontVec::try_from_vec_and_index(data, 0).map_err(|e| {
        PhomemoError::Configuration(format!("invalid font {}: {}", path.display(), e))
    })?;
    Ok(FontArc::new(font))
}

impl FontStack {
    /// Font index and glyph for `ch`; the primary's `.notdef` if nobody has it.
    fn pick(&self, ch: char) -> (usize, GlyphId) {
        for (i, font) in self.fonts.iter().enumerate() {
            let id = font.glyph_id(ch);
            if id.0 != 0 {
                return (i, id);
            }
        }
        (0, self.fonts[0].glyph_id(ch))
    }

    fn ascent(&self) -> f32 {
        self.fonts[0].as_scaled(self.scale).ascent()
    }

    fn line_height(&self) -> f32 {
        let scaled = self.fonts[0].as_scaled(self.scale);
        scaled.ascent() - scaled.descent()
    }

    /// Glyph positions along a line starting at x = 0.
    fn layout_line(&self, line: &str) -> (Vec<(usize, GlyphId, f32)>, f32) {
        let mut glyphs = Vec::with_capacity(line.len());
        let mut caret = 0.0f32;
        let mut previous: Option<(usize, GlyphId)> = None;

        for ch in line.chars() {
            let (font_idx, id) = self.pick(ch);
            let scaled = self.fonts[font_idx].as_scaled(self.scale);
            if let Some((prev_idx, prev_id)) = previous
                && prev_idx == font_idx
            {
                caret += scaled.kern(prev_id, id);
            }
            glyphs.push((font_idx, id, caret));
            caret += scaled.h_advance(id);
            previous = Some((font_idx, id));
        }

        (glyphs, caret)
    }

    fn line_width(&self, line: &str) -> f32 {
        self.layout_line(line).1
    }
}

/// Greedy character wrap. Every line gets at least one character.
fn wrap_characters(text: &str, width: f32, line_width: &impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        let mut candidate = current.clone();
        candidate.push(ch);
        if !current.is_empty() && line_width(&candidate) > width {
            lines.push(std::mem::take(&mut current));
            current.push(ch);
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Greedy word wrap. A word wider than the line is broken by character.
fn wrap_words(text: &str, width: f32, line_width: &impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if line_width(&candidate) <= width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if line_width(word) <= width {
            current = word.to_string();
        } else {
            let mut pieces = wrap_characters(word, width, line_width);
            current = pieces.pop().unwrap_or_default();
            lines.extend(pieces);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Left edge of a line of `line_width` inside a box of `box_width`.
fn line_origin(align: Align, box_width: f32, line_width: f32) -> f32 {
    match align {
        Align::Left => 0.0,
        Align::Center => (box_width - line_width) / 2.0,
        Align::Right => box_width - line_width,
    }
}

/// First line's full height, then one `advance` per further line.
fn block_height(line_height: f32, advance: f32, lines: usize) -> f32 {
    match lines {
        0 => 0.0,
        n => line_height + advance * (n - 1) as f32,
    }
}

/// Grow `coverage` by `radius` pixels (max over a disk).
fn dilate(coverage: &[f32], width: usize, height: usize, radius: f32) -> Vec<f32> {
    let r = radius.ceil() as i64;
    let r2 = radius * radius;
    let mut out = vec![0.0f32; coverage.len()];
    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let mut best = 0.0f32;
            for dy in -r..=r {
                let sy = y + dy;
                if sy < 0 || sy >= height as i64 {
                    continue;
                }
                for dx in -r..=r {
                    let sx = x + dx;
                    if sx < 0 || sx >= width as i64 || (dx * dx + dy * dy) as f32 > r2 {
                        continue;
                    }
                    best = best.max(coverage[sy as usize * width + sx as usize]);
                }
            }
            out[y as usize * width + x as usize] = best;
        }
    }
    out
}

fn with_alpha(color: Rgba<u8>, coverage: f32) -> Rgba<u8> {
    let [r, g, b, a] = color.0;
    Rgba([r, g, b, (a as f32 * coverage.clamp(0.0, 1.0)).round() as u8])
}

impl TextLayout for GlyphEngine {
    fn wrap(
        &self,
        text: &str,
        width: u32,
        font: &FontSpec,
        mode: WrapMode,
    ) -> Result<Vec<String>, PhomemoError> {
        let stack = self.stack(font)?;
        let width = width.max(1) as f32;
        let measure = |line: &str| stack.line_width(line);
        Ok(match mode {
            WrapMode::Word => wrap_words(text, width, &measure),
            WrapMode::Character => wrap_characters(text, width, &measure),
        })
    }

    fn measure(&self, lines: &[String], font: &FontSpec) -> Result<(u32, u32), PhomemoError> {
        if lines.is_empty() {
            return Ok((0, 0));
        }
        let stack = self.stack(font)?;
        let width = lines
            .iter()
            .map(|line| stack.line_width(line))
            .fold(0.0f32, f32::max);
        let advance = font.size * font.line_spacing;
        let height = block_height(stack.line_height(), advance, lines.len());
        Ok((width.ceil() as u32, height.ceil() as u32))
    }

    fn draw(
        &self,
        lines: &[String],
        font: &FontSpec,
        style: &TextStyle,
    ) -> Result<RgbaImage, PhomemoError> {
        let stack = self.stack(font)?;
        let width = style.width as usize;
        let height = style.height as usize;
        let mut coverage = vec![0.0f32; width * height];

        let advance = font.size * font.line_spacing;
        let ascent = stack.ascent();

        for (i, line) in lines.iter().enumerate() {
            let (glyphs, line_width) = stack.layout_line(line);
            let origin_x = line_origin(style.align, style.width as f32, line_width);
            let baseline = ascent + advance * i as f32;

            for (font_idx, id, x) in glyphs {
                let glyph = id.with_scale_and_position(stack.scale, point(origin_x + x, baseline));
                let Some(outlined) = stack.fonts[font_idx].outline_glyph(glyph) else {
                    continue;
                };
                let bounds = outlined.px_bounds();
                outlined.draw(|px, py, c| {
                    let x = px as i64 + bounds.min.x as i64;
                    let y = py as i64 + bounds.min.y as i64;
                    if x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height {
                        let idx = y as usize * width + x as usize;
                        coverage[idx] = (coverage[idx] + c).min(1.0);
                    }
                });
            }
        }

        let mut image = RgbaImage::new(style.width, style.height);

        if let Some(StrokeStyle { width: radius, color }) = style.stroke
            && radius > 0.0
        {
            let outline = dilate(&coverage, width, height, radius);
            for (idx, pixel) in image.pixels_mut().enumerate() {
                if outline[idx] > 0.0 {
                    *pixel = with_alpha(color, outline[idx]);
                }
            }
        }

        for (idx, pixel) in image.pixels_mut().enumerate() {
            if coverage[idx] > 0.0 {
                blend_pixel(pixel, with_alpha(style.fill, coverage[idx]));
            }
        }

        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every character is 10px wide.
    fn fixed(line: &str) -> f32 {
        line.chars().count() as f32 * 10.0
    }

    /// Skips when the system font is not installed.
    fn dejavu() -> Option<FontSpec> {
        let path = PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf");
        path.is_file().then(|| FontSpec {
            path,
            fallbacks: vec![],
            size: 40.0,
            line_spacing: 1.5,
        })
    }

    fn missing_font() -> FontSpec {
        FontSpec {
            path: PathBuf::from("/nonexistent/font.ttf"),
            fallbacks: vec![],
            size: 32.0,
            line_spacing: 1.2,
        }
    }

    #[test]
    fn test_missing_font_is_configuration_error() {
        let engine = GlyphEngine::new();
        let err = engine
            .wrap("hello", 100, &missing_font(), WrapMode::Word)
            .unwrap_err();
        assert!(matches!(err, PhomemoError::Configuration(_)));
        assert!(err.to_string().contains("/nonexistent/font.ttf"));
    }

    #[test]
    fn test_measure_no_lines_skips_font_loading() {
        let engine = GlyphEngine::new();
        assert_eq!(engine.measure(&[], &missing_font()).unwrap(), (0, 0));
    }

    #[test]
    fn test_wrap_words_greedy() {
        // 6 characters per line
        let lines = wrap_words("aa bb cc dd", 60.0, &fixed);
        assert_eq!(lines, vec!["aa bb", "cc dd"]);

        let lines = wrap_words("  spaced   out  ", 60.0, &fixed);
        assert_eq!(lines, vec!["spaced", "out"]);
    }

    #[test]
    fn test_wrap_words_breaks_long_word() {
        let lines = wrap_words("hi abcdefghij ok", 40.0, &fixed);
        assert_eq!(lines, vec!["hi", "abcd", "efgh", "ij", "ok"]);
    }

    #[test]
    fn test_wrap_words_long_word_tail_joins_next_word() {
        let lines = wrap_words("abcdef x", 40.0, &fixed);
        assert_eq!(lines, vec!["abcd", "ef x"]);
    }

    #[test]
    fn test_wrap_characters() {
        let lines = wrap_characters("日本語のテキスト", 30.0, &fixed);
        assert_eq!(lines, vec!["日本語", "のテキ", "スト"]);

        // Narrower than one character still makes progress
        let lines = wrap_characters("abc", 5.0, &fixed);
        assert_eq!(lines, vec!["a", "b", "c"]);

        assert!(wrap_characters("", 30.0, &fixed).is_empty());
    }

    #[test]
    fn test_line_origin() {
        assert_eq!(line_origin(Align::Left, 100.0, 40.0), 0.0);
        assert_eq!(line_origin(Align::Center, 100.0, 40.0), 30.0);
        assert_eq!(line_origin(Align::Right, 100.0, 40.0), 60.0);
        // Lines wider than the box overhang to the left
        assert_eq!(line_origin(Align::Right, 100.0, 140.0), -40.0);
    }

    #[test]
    fn test_block_height() {
        assert_eq!(block_height(46.5, 60.0, 0), 0.0);
        assert_eq!(block_height(46.5, 60.0, 1), 46.5);
        assert_eq!(block_height(46.5, 60.0, 3), 166.5);
    }

    #[test]
    fn test_fonts_are_cached() {
        let Some(font) = dejavu() else { return };
        let engine = GlyphEngine::new();
        engine.wrap("a", 100, &font, WrapMode::Word).unwrap();
        engine.measure(&["a".to_string()], &font).unwrap();
        assert_eq!(engine.fonts.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_real_font_layout() {
        let Some(font) = dejavu() else { return };
        let engine = GlyphEngine::new();

        let lines = engine
            .wrap("the quick brown fox jumps", 200, &font, WrapMode::Word)
            .unwrap();
        assert!(lines.len() > 1);
        let (width, height) = engine.measure(&lines, &font).unwrap();
        assert!(width <= 200);
        // Each extra line adds size * line_spacing
        let (_, one) = engine.measure(&lines[..1], &font).unwrap();
        let expected = one as f32 + 60.0 * (lines.len() - 1) as f32;
        assert!((height as f32 - expected).abs() <= 1.0);

        let style = |align| TextStyle {
            width: 300,
            height: 60,
            align,
            fill: Rgba([0, 0, 0, 255]),
            stroke: None,
        };
        let ink_columns = |image: &RgbaImage| {
            let cols: Vec<u32> = (0..image.width())
                .filter(|&x| (0..image.height()).any(|y| image.get_pixel(x, y).0[3] > 0))
                .collect();
            (cols[0], cols[cols.len() - 1])
        };
        let line = vec!["ab".to_string()];
        let (left, _) = ink_columns(&engine.draw(&line, &font, &style(Align::Left)).unwrap());
        let (center, _) = ink_columns(&engine.draw(&line, &font, &style(Align::Center)).unwrap());
        let (_, right) = ink_columns(&engine.draw(&line, &font, &style(Align::Right)).unwrap());
        assert!(left < 10);
        assert!(center > 100 && center < 150);
        assert!(right > 290);
    }

    #[test]
    fn test_dilate_spreads_single_pixel() {
        let mut coverage = vec![0.0f32; 25];
        coverage[12] = 1.0; // centre of 5x5
        let out = dilate(&coverage, 5, 5, 1.0);
        // 4-neighbours and centre are covered, corners of the 3x3 are not (disk)
        assert_eq!(out[12], 1.0);
        assert_eq!(out[7], 1.0);
        assert_eq!(out[11], 1.0);
        assert_eq!(out[6], 0.0);
        assert_eq!(out[0], 0.0);
    }

    #[test]
    fn test_with_alpha_scales_alpha_only() {
        assert_eq!(with_alpha(Rgba([10, 20, 30, 255]), 0.5), Rgba([10, 20, 30, 128]));
        assert_eq!(with_alpha(Rgba([0, 0, 0, 255]), 2.0), Rgba([0, 0, 0, 255]));
    }
}
