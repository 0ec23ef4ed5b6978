//! # Layout Compositor
//!
//! Resolves every layer of a [`LayoutJob`], sizes the canvas, and paints the
//! layers over the background in declaration order.
//!
//! ## Canvas Height
//!
//! The height is derived after all layers are resolved, because a text
//! layer's height depends on how many lines the text engine wrapped it into.
//! An explicit `canvas.height` only raises it:
//!
//! ```text
//! derived = max over layers of (offset.y + rendered height) + margin
//! height  = max(canvas.height, derived)
//! ```
//!
//! Canvases taller than [`MAX_CANVAS_HEIGHT`] are refused before allocation.
//!
//! ## Blending
//!
//! Porter-Duff "source over" per pixel. A fully transparent source pixel
//! leaves the destination untouched.

use std::path::Path;

use image::{Rgba, RgbaImage};
use log::debug;

use super::resolve::{LayerResolver, RenderedLayer};
use super::source::ImageSource;
use crate::document::{LayoutJob, OutputConfig};
use crate::error::PhomemoError;
use crate::printer::{MAX_CANVAS_HEIGHT, PrinterConfig};
use crate::text::TextLayout;

/// Blend `src` over `dst` in place.
#[inline]
pub fn blend_pixel(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let sa = src.0[3];
    if sa == 0 {
        return;
    }
    if sa == 255 {
        *dst = src;
        return;
    }

    let sa = sa as f32 / 255.0;
    let da = dst.0[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    let mut out = [0u8; 4];
    for c in 0..3 {
        let sc = src.0[c] as f32;
        let dc = dst.0[c] as f32;
        out[c] = ((sc * sa + dc * da * (1.0 - sa)) / out_a).round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round() as u8;
    *dst = Rgba(out);
}

/// Paint `layer` over `base` with its top-left corner at `(x, y)`.
///
/// Parts falling outside `base` (including negative offsets) are clipped.
pub fn paint_over(base: &mut RgbaImage, layer: &RgbaImage, x: i64, y: i64) {
    let (bw, bh) = (base.width() as i64, base.height() as i64);
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = x.saturating_add(layer.width() as i64).min(bw);
    let y1 = y.saturating_add(layer.height() as i64).min(bh);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    for ty in y0..y1 {
        for tx in x0..x1 {
            let src = *layer.get_pixel((tx - x) as u32, (ty - y) as u32);
            blend_pixel(base.get_pixel_mut(tx as u32, ty as u32), src);
        }
    }
}

/// Canvas height derived from resolved layers: lowest layer bottom plus margin.
///
/// Saturates instead of overflowing; callers check the result against
/// [`MAX_CANVAS_HEIGHT`].
pub fn derived_height(layers: &[RenderedLayer], margin: u32) -> u64 {
    let bottom = layers
        .iter()
        .map(|l| l.offset.1.saturating_add(l.pixels.height() as i64))
        .max()
        .unwrap_or(0)
        .max(0);
    (bottom as u64).saturating_add(margin as u64).max(1)
}

/// Composes a layout onto a canvas of the printer's fixed width.
pub struct LayoutCompositor<'a> {
    resolver: LayerResolver<'a>,
    width: u32,
}

impl<'a> LayoutCompositor<'a> {
    /// `base_dir` anchors relative font, text and image paths.
    pub fn new(
        printer: PrinterConfig,
        text: &'a dyn TextLayout,
        images: &'a dyn ImageSource,
        base_dir: &Path,
    ) -> Self {
        Self {
            resolver: LayerResolver::new(text, images, printer.width_dots, base_dir),
            width: printer.width_dots,
        }
    }

    /// Render the job to a single RGBA image and hand back its output settings.
    ///
    /// ## Errors
    ///
    /// Any layer that fails to resolve aborts the whole job; there is no
    /// partial render.
    pub fn compose(&self, job: &LayoutJob) -> Result<(RgbaImage, OutputConfig), PhomemoError> {
        if job.layers.is_empty() {
            return Err(PhomemoError::Configuration(
                "layout must contain at least one layer".to_string(),
            ));
        }

        let rendered = job
            .layers
            .iter()
            .enumerate()
            .map(|(i, layer)| {
                self.resolver
                    .resolve(layer, &job.canvas)
                    .map_err(|e| match e {
                        PhomemoError::Configuration(msg) => {
                            PhomemoError::Configuration(format!("layers/{}: {}", i, msg))
                        }
                        other => other,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        // An explicit height is a minimum; layers below it still grow the canvas
        let derived = derived_height(&rendered, job.canvas.margin);
        let height = derived.max(job.canvas.height.map_or(0, u64::from));
        if height > u64::from(MAX_CANVAS_HEIGHT) {
            return Err(PhomemoError::Configuration(format!(
                "canvas height {} exceeds the maximum of {} dots",
                height, MAX_CANVAS_HEIGHT
            )));
        }
        let height = height as u32;
        debug!("canvas {}x{} with {} layer(s)", self.width, height, rendered.len());

        let mut canvas = RgbaImage::from_pixel(self.width, height, job.canvas.background_color.0);
        for layer in &rendered {
            paint_over(&mut canvas, &layer.pixels, layer.offset.0, layer.offset.1);
        }

        Ok((canvas, job.output.clone()))
    }
}
