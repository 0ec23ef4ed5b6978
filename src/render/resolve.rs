//! Turn one declarative [`Layer`] into a positioned RGBA buffer.
//!
//! Glyph work goes to the [`TextLayout`] engine and decoding to the
//! [`ImageSource`]; this module only picks parameters, sizes the buffers
//! and applies opacity.

use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use log::debug;

use super::source::ImageSource;
use crate::document::{CanvasConfig, ImageLayer, Layer, Position, TextLayer};
use crate::error::PhomemoError;
use crate::printer::MAX_CANVAS_HEIGHT;
use crate::text::{FontSpec, StrokeStyle, TextLayout, TextStyle};

const TEXT_FILL: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// A layer's pixels and where its top-left corner sits on the canvas.
#[derive(Debug, Clone)]
pub struct RenderedLayer {
    pub pixels: RgbaImage,
    pub offset: (i64, i64),
}

pub struct LayerResolver<'a> {
    text: &'a dyn TextLayout,
    images: &'a dyn ImageSource,
    canvas_width: u32,
    base_dir: PathBuf,
}

impl<'a> LayerResolver<'a> {
    pub fn new(
        text: &'a dyn TextLayout,
        images: &'a dyn ImageSource,
        canvas_width: u32,
        base_dir: &Path,
    ) -> Self {
        Self {
            text,
            images,
            canvas_width,
            base_dir: base_dir.to_path_buf(),
        }
    }

    pub fn resolve(
        &self,
        layer: &Layer,
        canvas: &CanvasConfig,
    ) -> Result<RenderedLayer, PhomemoError> {
        match layer {
            Layer::Text(text) => self.resolve_text(text, canvas),
            Layer::Image(image) => self.resolve_image(image),
        }
    }

    /// Relative paths are taken from the job document's directory.
    fn locate(&self, path: &Path) -> PathBuf {
        self.base_dir.join(path)
    }

    /// Refuse buffers larger than a full-length canvas before they are drawn.
    fn check_size(&self, width: u32, height: u32) -> Result<(), PhomemoError> {
        let budget = u64::from(self.canvas_width) * u64::from(MAX_CANVAS_HEIGHT);
        if height > MAX_CANVAS_HEIGHT || u64::from(width) * u64::from(height) > budget {
            return Err(PhomemoError::Configuration(format!(
                "text layer of {}x{} dots is too large to render",
                width, height
            )));
        }
        Ok(())
    }

    fn content(&self, layer: &TextLayer) -> Result<String, PhomemoError> {
        match (&layer.text, &layer.text_file) {
            (Some(text), None) => Ok(text.clone()),
            (None, Some(file)) => {
                let path = self.locate(file);
                let bytes = fs::read(&path).map_err(|e| {
                    PhomemoError::Configuration(format!(
                        "cannot read text_file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                String::from_utf8(bytes).map_err(|_| {
                    PhomemoError::Configuration(format!(
                        "text_file {} is not valid UTF-8",
                        path.display()
                    ))
                })
            }
            (Some(_), Some(_)) => Err(PhomemoError::Configuration(
                "text layer takes either text or text_file, not both".to_string(),
            )),
            (None, None) => Err(PhomemoError::Configuration(
                "text layer needs text or text_file".to_string(),
            )),
        }
    }

    fn font(&self, layer: &TextLayer, canvas: &CanvasConfig) -> Result<FontSpec, PhomemoError> {
        let path = layer
            .font_path
            .as_ref()
            .or(canvas.font_path.as_ref())
            .ok_or_else(|| {
                PhomemoError::Configuration(
                    "no font_path on the layer or the canvas".to_string(),
                )
            })?;
        let fallbacks = layer
            .fallback_fonts
            .as_ref()
            .unwrap_or(&canvas.fallback_fonts)
            .iter()
            .map(|p| self.locate(p))
            .collect();

        Ok(FontSpec {
            path: self.locate(path),
            fallbacks,
            size: layer.font_size.unwrap_or(canvas.font_size),
            line_spacing: layer.line_spacing.unwrap_or(canvas.line_spacing),
        })
    }

    fn resolve_text(
        &self,
        layer: &TextLayer,
        canvas: &CanvasConfig,
    ) -> Result<RenderedLayer, PhomemoError> {
        let content = self.content(layer)?;
        let font = self.font(layer, canvas)?;
        let wrap = layer.wrap_style.unwrap_or(canvas.wrap_style);
        let width = layer
            .width
            .unwrap_or_else(|| {
                self.canvas_width
                    .saturating_sub(canvas.margin.saturating_mul(2))
            })
            .max(1);

        let mut lines = Vec::new();
        for paragraph in content.lines() {
            if paragraph.is_empty() {
                lines.push(String::new());
                continue;
            }
            let wrapped = self.text.wrap(paragraph, width, &font, wrap)?;
            if wrapped.is_empty() {
                lines.push(String::new());
            } else {
                lines.extend(wrapped);
            }
        }
        if lines.is_empty() {
            lines.push(String::new());
        }

        let (_, measured) = self.text.measure(&lines, &font)?;
        let height = measured.max(font.size as u32).max(1);
        self.check_size(width, height)?;

        let stroke = layer
            .stroke
            .filter(|s| s.width > 0.0)
            .map(|s| StrokeStyle {
                width: s.width,
                color: s.rgba(),
            });
        let style = TextStyle {
            width,
            height,
            align: layer.align,
            fill: TEXT_FILL,
            stroke,
        };
        let pixels = self.text.draw(&lines, &font, &style)?;

        let margin = i64::from(canvas.margin);
        let offset = Position::resolve(layer.position.as_ref(), (margin, margin));
        debug!(
            "text layer: {} line(s), {}x{} at {:?}",
            lines.len(),
            width,
            height,
            offset
        );
        Ok(RenderedLayer { pixels, offset })
    }

    fn resolve_image(&self, layer: &ImageLayer) -> Result<RenderedLayer, PhomemoError> {
        let path = self.locate(&layer.path);
        if !path.is_file() {
            return Err(PhomemoError::Configuration(format!(
                "image not found: {}",
                path.display()
            )));
        }
        let mut img = self.images.load(&path)?;

        // Each step only shrinks and keeps the aspect ratio
        if let Some(scale) = layer.scale
            && scale > 0.0
            && scale < 1.0
        {
            let w = (img.width() as f32 * scale) as u32;
            let h = (img.height() as f32 * scale) as u32;
            img = self.images.resize(&img, w.max(1), h.max(1));
        }
        if let Some(max_w) = layer.max_width
            && max_w >= 1.0
            && img.width() as f32 > max_w
        {
            let ratio = max_w / img.width() as f32;
            let h = (img.height() as f32 * ratio) as u32;
            img = self.images.resize(&img, max_w as u32, h.max(1));
        }
        if let Some(max_h) = layer.max_height
            && max_h >= 1.0
            && img.height() as f32 > max_h
        {
            let ratio = max_h / img.height() as f32;
            let w = (img.width() as f32 * ratio) as u32;
            img = self.images.resize(&img, w.max(1), max_h as u32);
        }

        let opacity = layer.opacity.clamp(0.0, 1.0);
        if opacity < 1.0 {
            for pixel in img.pixels_mut() {
                pixel.0[3] = (pixel.0[3] as f32 * opacity) as u8;
            }
        }

        let offset = Position::resolve(layer.position.as_ref(), (0, 0));
        debug!(
            "image layer {}: {}x{} at {:?}",
            path.display(),
            img.width(),
            img.height(),
            offset
        );
        Ok(RenderedLayer {
            pixels: img,
            offset,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::document::Stroke;
    use crate::text::WrapMode;
    use std::cell::RefCell;

    /// Each character is 10px wide, each line `size * line_spacing` tall.
    /// Records the calls it receives.
    #[derive(Default)]
    pub(crate) struct BoxText {
        pub wrapped: RefCell<Vec<(String, u32)>>,
        pub styles: RefCell<Vec<TextStyle>>,
    }

    impl TextLayout for BoxText {
        fn wrap(
            &self,
            text: &str,
            width: u32,
            _font: &FontSpec,
            _mode: WrapMode,
        ) -> Result<Vec<String>, PhomemoError> {
            self.wrapped.borrow_mut().push((text.to_string(), width));
            let per_line = (width / 10).max(1) as usize;
            let chars: Vec<char> = text.chars().collect();
            Ok(chars
                .chunks(per_line)
                .map(|c| c.iter().collect())
                .collect())
        }

        fn measure(
            &self,
            lines: &[String],
            font: &FontSpec,
        ) -> Result<(u32, u32), PhomemoError> {
            let w = lines.iter().map(|l| l.chars().count() as u32 * 10).max();
            let h = lines.len() as f32 * font.size * font.line_spacing;
            Ok((w.unwrap_or(0), h as u32))
        }

        fn draw(
            &self,
            _lines: &[String],
            _font: &FontSpec,
            style: &TextStyle,
        ) -> Result<RgbaImage, PhomemoError> {
            self.styles.borrow_mut().push(*style);
            Ok(RgbaImage::from_pixel(style.width, style.height, style.fill))
        }
    }

    /// Serves a fixed image for any existing path.
    pub(crate) struct SolidImages(pub RgbaImage);

    impl ImageSource for SolidImages {
        fn load(&self, _path: &Path) -> Result<RgbaImage, PhomemoError> {
            Ok(self.0.clone())
        }

        fn resize(&self, _image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
            RgbaImage::from_pixel(width, height, *self.0.get_pixel(0, 0))
        }
    }

    fn canvas() -> CanvasConfig {
        CanvasConfig {
            font_path: Some(PathBuf::from("font.ttf")),
            font_size: 50.0,
            line_spacing: 1.0,
            ..CanvasConfig::default()
        }
    }

    fn text_layer(text: &str) -> Layer {
        Layer::Text(TextLayer {
            text: Some(text.to_string()),
            ..TextLayer::default()
        })
    }

    fn image_layer(configure: impl FnOnce(&mut ImageLayer)) -> Layer {
        let mut layer = ImageLayer {
            path: PathBuf::from("Cargo.toml"),
            scale: None,
            max_width: None,
            max_height: None,
            opacity: 1.0,
            position: None,
        };
        configure(&mut layer);
        Layer::Image(layer)
    }

    fn crate_dir() -> &'static Path {
        Path::new(env!("CARGO_MANIFEST_DIR"))
    }

    #[test]
    fn test_text_defaults_to_margin_box() {
        let text = BoxText::default();
        let images = SolidImages(RgbaImage::new(1, 1));
        let resolver = LayerResolver::new(&text, &images, 576, crate_dir());

        let layer = resolver.resolve(&text_layer("hi\n\nthere"), &canvas()).unwrap();
        assert_eq!(layer.offset, (20, 20));
        // three paragraph lines at 50px each
        assert_eq!(layer.pixels.dimensions(), (536, 150));

        let wrapped = text.wrapped.borrow();
        assert_eq!(wrapped.len(), 2);
        assert_eq!(wrapped[0], ("hi".to_string(), 536));
    }

    #[test]
    fn test_text_height_floored_to_font_size() {
        let text = BoxText::default();
        let images = SolidImages(RgbaImage::new(1, 1));
        let resolver = LayerResolver::new(&text, &images, 576, crate_dir());

        let mut canvas = canvas();
        canvas.line_spacing = 0.1;
        let layer = resolver.resolve(&text_layer(""), &canvas).unwrap();
        assert_eq!(layer.pixels.height(), 50);
    }

    #[test]
    fn test_text_layer_overrides() {
        let text = BoxText::default();
        let images = SolidImages(RgbaImage::new(1, 1));
        let resolver = LayerResolver::new(&text, &images, 576, crate_dir());

        let layer = Layer::Text(TextLayer {
            text: Some("abc".to_string()),
            width: Some(100),
            font_size: Some(20.0),
            stroke: Some(Stroke {
                width: 2.0,
                color: crate::document::Color::black(),
            }),
            position: Some(Position {
                x: Some(-5),
                y: None,
            }),
            ..TextLayer::default()
        });
        let rendered = resolver.resolve(&layer, &canvas()).unwrap();
        assert_eq!(rendered.offset, (-5, 20));
        assert_eq!(rendered.pixels.dimensions(), (100, 20));

        let style = text.styles.borrow()[0];
        assert_eq!(style.stroke.map(|s| s.width), Some(2.0));
        assert_eq!(style.fill, TEXT_FILL);
    }

    #[test]
    fn test_zero_width_stroke_is_dropped() {
        let text = BoxText::default();
        let images = SolidImages(RgbaImage::new(1, 1));
        let resolver = LayerResolver::new(&text, &images, 576, crate_dir());

        let layer = Layer::Text(TextLayer {
            text: Some("a".to_string()),
            stroke: Some(Stroke {
                width: 0.0,
                color: crate::document::Color::black(),
            }),
            ..TextLayer::default()
        });
        resolver.resolve(&layer, &canvas()).unwrap();
        assert_eq!(text.styles.borrow()[0].stroke, None);
    }

    #[test]
    fn test_huge_margin_collapses_text_box() {
        let text = BoxText::default();
        let images = SolidImages(RgbaImage::new(1, 1));
        let resolver = LayerResolver::new(&text, &images, 576, crate_dir());

        let mut canvas = canvas();
        canvas.margin = 3_000_000_000;
        let layer = resolver.resolve(&text_layer("x"), &canvas).unwrap();
        assert_eq!(layer.pixels.width(), 1);
        assert_eq!(layer.offset, (3_000_000_000, 3_000_000_000));
    }

    #[test]
    fn test_oversized_text_refused_before_drawing() {
        let text = BoxText::default();
        let images = SolidImages(RgbaImage::new(1, 1));
        let resolver = LayerResolver::new(&text, &images, 576, crate_dir());

        // 1000 one-character lines of 200px each
        let layer = Layer::Text(TextLayer {
            text: Some("x\n".repeat(1000)),
            font_size: Some(200.0),
            ..TextLayer::default()
        });
        let err = resolver.resolve(&layer, &canvas()).unwrap_err();
        assert!(matches!(err, PhomemoError::Configuration(_)));
        assert!(text.styles.borrow().is_empty());
    }

    #[test]
    fn test_text_source_errors() {
        let text = BoxText::default();
        let images = SolidImages(RgbaImage::new(1, 1));
        let resolver = LayerResolver::new(&text, &images, 576, crate_dir());

        let neither = Layer::Text(TextLayer::default());
        assert!(matches!(
            resolver.resolve(&neither, &canvas()),
            Err(PhomemoError::Configuration(_))
        ));

        let both = Layer::Text(TextLayer {
            text: Some("a".to_string()),
            text_file: Some(PathBuf::from("Cargo.toml")),
            ..TextLayer::default()
        });
        assert!(matches!(
            resolver.resolve(&both, &canvas()),
            Err(PhomemoError::Configuration(_))
        ));

        let missing = Layer::Text(TextLayer {
            text_file: Some(PathBuf::from("does/not/exist.txt")),
            ..TextLayer::default()
        });
        assert!(matches!(
            resolver.resolve(&missing, &canvas()),
            Err(PhomemoError::Configuration(_))
        ));
    }

    #[test]
    fn test_missing_font_is_configuration_error() {
        let text = BoxText::default();
        let images = SolidImages(RgbaImage::new(1, 1));
        let resolver = LayerResolver::new(&text, &images, 576, crate_dir());

        let err = resolver
            .resolve(&text_layer("hi"), &CanvasConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("font_path"));
    }

    #[test]
    fn test_text_file_read_relative_to_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("body.txt"), "héllo").unwrap();
        std::fs::write(dir.path().join("bad.txt"), [0xFF, 0xFE, 0x00]).unwrap();

        let text = BoxText::default();
        let images = SolidImages(RgbaImage::new(1, 1));
        let resolver = LayerResolver::new(&text, &images, 576, dir.path());

        let layer = Layer::Text(TextLayer {
            text_file: Some(PathBuf::from("body.txt")),
            ..TextLayer::default()
        });
        resolver.resolve(&layer, &canvas()).unwrap();
        assert_eq!(text.wrapped.borrow()[0].0, "héllo");

        let bad = Layer::Text(TextLayer {
            text_file: Some(PathBuf::from("bad.txt")),
            ..TextLayer::default()
        });
        let err = resolver.resolve(&bad, &canvas()).unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn test_image_scaling_only_shrinks() {
        let text = BoxText::default();
        let images = SolidImages(RgbaImage::from_pixel(400, 200, Rgba([0, 0, 0, 255])));
        let resolver = LayerResolver::new(&text, &images, 576, crate_dir());
        let c = canvas();

        let grow = image_layer(|l| l.scale = Some(2.0));
        assert_eq!(resolver.resolve(&grow, &c).unwrap().pixels.dimensions(), (400, 200));

        let half = image_layer(|l| l.scale = Some(0.5));
        assert_eq!(resolver.resolve(&half, &c).unwrap().pixels.dimensions(), (200, 100));

        let capped = image_layer(|l| {
            l.max_width = Some(100.0);
            l.max_height = Some(20.0);
        });
        assert_eq!(resolver.resolve(&capped, &c).unwrap().pixels.dimensions(), (40, 20));

        let loose = image_layer(|l| l.max_width = Some(1000.0));
        assert_eq!(resolver.resolve(&loose, &c).unwrap().pixels.dimensions(), (400, 200));
    }

    #[test]
    fn test_image_opacity_and_position() {
        let text = BoxText::default();
        let images = SolidImages(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 200])));
        let resolver = LayerResolver::new(&text, &images, 576, crate_dir());

        let layer = image_layer(|l| {
            l.opacity = 0.5;
            l.position = Some(Position {
                x: None,
                y: Some(30),
            });
        });
        let rendered = resolver.resolve(&layer, &canvas()).unwrap();
        assert_eq!(rendered.offset, (0, 30));
        assert_eq!(rendered.pixels.get_pixel(0, 0).0[3], 100);
    }

    #[test]
    fn test_missing_image_is_configuration_error() {
        let text = BoxText::default();
        let images = SolidImages(RgbaImage::new(1, 1));
        let resolver = LayerResolver::new(&text, &images, 576, crate_dir());

        let layer = image_layer(|l| l.path = PathBuf::from("nope.png"));
        assert!(matches!(
            resolver.resolve(&layer, &canvas()),
            Err(PhomemoError::Configuration(_))
        ));
    }
}
