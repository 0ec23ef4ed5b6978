//! # Printer Configuration
//!
//! This module defines the hardware specification of the supported label
//! printer and the job defaults that depend on it.
//!
//! ## Supported Printers
//!
//! | Model | Width (dots) | Resolution | Max rows per block |
//! |-------|--------------|------------|--------------------|
//! | M02 Pro | 576 | 300 DPI | 256 |
//!
//! ## Usage
//!
//! ```
//! use phomemo_layout::printer::PrinterConfig;
//!
//! let config = PrinterConfig::M02_PRO;
//! assert_eq!(config.width_dots, 576);
//! assert_eq!(config.width_bytes, 72);
//! ```

/// Luminance cutoff used when a job does not set `output.threshold`.
pub const DEFAULT_THRESHOLD: u8 = 128;

/// Band height used when a job does not set `output.slice_height`.
///
/// Long bands stall the Bluetooth link on this device; 1400 rows is roughly
/// 12cm of paper at 300 DPI.
pub const DEFAULT_SLICE_HEIGHT: u32 = 1400;

/// Rows per raster block used when a job does not set `output.chunk_rows`.
pub const DEFAULT_CHUNK_ROWS: u16 = 200;

/// Tallest canvas or layer buffer accepted, in dots.
///
/// About 8.5m of paper at 300 DPI. Anything taller is refused before the
/// buffer is allocated.
pub const MAX_CANVAS_HEIGHT: u32 = 100_000;

/// Upper bound for any single length in a job document (margin, text box
/// width), in dots.
pub const MAX_LENGTH_DOTS: u32 = 10_000;

/// Largest font size accepted, in pixels.
pub const MAX_FONT_SIZE: f32 = 2_000.0;

/// # Printer Configuration
///
/// Defines the hardware characteristics of a thermal label printer.
///
/// ## Physical Properties
///
/// - **width_dots**: Printable width in dots. Every raster sent to the
///   device must be exactly this wide.
/// - **width_bytes**: Width in bytes (width_dots / 8)
/// - **dpi**: Resolution in dots per inch
///
/// ## Link Tuning
///
/// - **max_chunk_rows**: Upper bound on rows per raster block. The block
///   marker stores `rows - 1` in a single byte, so this is at most 256.
///
/// ## Calculations
///
/// ```text
/// dots_per_mm = dpi / 25.4
/// width_mm = width_dots / dots_per_mm
///
/// For M02 Pro:
///   dots_per_mm = 300 / 25.4 ≈ 11.8
///   width_mm = 576 / 11.8 ≈ 48.8mm
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrinterConfig {
    /// Printer model name
    pub name: &'static str,

    /// Print width in dots (pixels)
    pub width_dots: u32,

    /// Print width in bytes (width_dots / 8)
    pub width_bytes: u32,

    /// Resolution in dots per inch
    pub dpi: u16,

    /// Maximum rows per raster block
    pub max_chunk_rows: u16,
}

impl PrinterConfig {
    /// # Phomemo M02 Pro Configuration
    ///
    /// 53mm paper, 300 DPI mini label printer.
    ///
    /// ## Print Area
    ///
    /// ```text
    /// ├──── 48.8mm printable ────┤
    /// │        576 dots          │
    /// ```
    ///
    /// Anything longer than the printable width has to be laid out along
    /// the feed direction (image height), not across it.
    pub const M02_PRO: Self = Self {
        name: "Phomemo M02 Pro",
        width_dots: 576,
        width_bytes: 72,
        dpi: 300,
        max_chunk_rows: 256,
    };

    /// Calculate dots per millimeter
    ///
    /// ## Example
    ///
    /// ```
    /// use phomemo_layout::printer::PrinterConfig;
    ///
    /// let config = PrinterConfig::M02_PRO;
    /// assert!((config.dots_per_mm() - 11.81).abs() < 0.01);
    /// ```
    #[inline]
    pub fn dots_per_mm(&self) -> f32 {
        self.dpi as f32 / 25.4
    }

    /// Calculate print width in millimeters
    #[inline]
    pub fn width_mm(&self) -> f32 {
        self.width_dots as f32 / self.dots_per_mm()
    }

    /// Convert millimeters to dots
    #[inline]
    pub fn mm_to_dots(&self, mm: f32) -> u32 {
        (mm * self.dots_per_mm()).round().max(0.0) as u32
    }

    /// Most pixels a single canvas or layer buffer may hold.
    ///
    /// ```
    /// use phomemo_layout::printer::PrinterConfig;
    ///
    /// assert_eq!(PrinterConfig::M02_PRO.max_pixels(), 57_600_000);
    /// ```
    #[inline]
    pub fn max_pixels(&self) -> u64 {
        self.width_dots as u64 * MAX_CANVAS_HEIGHT as u64
    }

    /// Convert dots to millimeters
    #[inline]
    pub fn dots_to_mm(&self, dots: u32) -> f32 {
        dots as f32 / self.dots_per_mm()
    }
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self::M02_PRO
    }
}
