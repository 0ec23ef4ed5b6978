//! # Raster Block Encoding
//!
//! Converts 1-bit bands into the block format the printer accepts.
//!
//! ## Block Layout
//!
//! ```text
//! 1D 76 30 00  wb 00  (n-1) 00  row[0] row[1] ... row[n-1]
//! └── MAGIC ─┘  │      │        └── n rows of wb bytes ──┘
//!               │      └── row count minus one (one byte, so n ≤ 256)
//!               └── width in bytes (72 for 576 dots)
//! ```
//!
//! ## Bit Packing
//!
//! Each row byte covers 8 horizontal dots:
//! - Bit 7 (MSB) = leftmost dot (column `8*i`)
//! - Bit 0 (LSB) = rightmost dot (column `8*i + 7`)
//! - 1 = ink, 0 = paper
//!
//! ```text
//! Byte value 0xF0 = 11110000 = ████░░░░
//! Byte value 0x0F = 00001111 = ░░░░████
//! ```
//!
//! ## Escaping
//!
//! A packed byte equal to `0x0A` is sent as `0x14`. See [`escape`].

use super::commands::{LF, LF_SUBSTITUTE, RASTER_MAGIC};
use crate::error::PhomemoError;
use crate::printer::PrinterConfig;
use crate::render::Bilevel;

/// Most rows a single block can describe: the marker stores `rows - 1` in one byte.
pub const MAX_BLOCK_ROWS: u32 = 256;

/// Length of a block marker in bytes.
pub const MARKER_LEN: usize = RASTER_MAGIC.len() + 4;

/// One transmissible unit: a marker followed by `rows.len()` packed rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBlock {
    pub width_bytes: u8,
    /// Packed and escaped rows, each `width_bytes` long.
    pub rows: Vec<Vec<u8>>,
}

impl RasterBlock {
    /// Number of rows in this block, in `1..=256`.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn marker(&self) -> [u8; MARKER_LEN] {
        block_marker(self.width_bytes, self.row_count())
    }

    /// Marker plus row data, ready for the link.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MARKER_LEN + self.width_bytes as usize * self.rows.len());
        out.extend_from_slice(&self.marker());
        for row in &self.rows {
            out.extend_from_slice(row);
        }
        out
    }
}

/// Build the fixed-prefix marker for a block of `rows` rows.
///
/// ## Example
///
/// ```
/// use phomemo_layout::protocol::raster::block_marker;
///
/// assert_eq!(
///     block_marker(72, 200),
///     [0x1D, 0x76, 0x30, 0x00, 72, 0x00, 199, 0x00]
/// );
/// ```
pub fn block_marker(width_bytes: u8, rows: usize) -> [u8; MARKER_LEN] {
    debug_assert!(
        (1..=MAX_BLOCK_ROWS as usize).contains(&rows),
        "block row count must be in 1..=256, got {}",
        rows
    );
    let [m0, m1, m2, m3] = RASTER_MAGIC;
    [m0, m1, m2, m3, width_bytes, 0x00, (rows - 1) as u8, 0x00]
}

/// Rewrite a packed byte that collides with the link control byte.
#[inline]
pub const fn escape(byte: u8) -> u8 {
    if byte == LF { LF_SUBSTITUTE } else { byte }
}

/// Pack row `y` of a bilevel image into escaped bytes.
///
/// The image width must be a multiple of 8; trailing dots of a partial byte
/// would otherwise be dropped.
pub fn pack_row(image: &Bilevel, y: u32) -> Vec<u8> {
    let width_bytes = image.width() / 8;
    let mut row = Vec::with_capacity(width_bytes as usize);
    for byte_idx in 0..width_bytes {
        let mut byte = 0u8;
        for bit in 0..8 {
            if image.is_ink(byte_idx * 8 + bit, y) {
                byte |= 1 << (7 - bit);
            }
        }
        row.push(escape(byte));
    }
    row
}

/// Reject block sizes outside `1..=max_rows`.
///
/// `max_rows` is itself capped at [`MAX_BLOCK_ROWS`], the most the marker
/// byte can express.
pub fn check_chunk_rows(chunk_rows: i64, max_rows: u32) -> Result<u32, PhomemoError> {
    let max_rows = max_rows.min(MAX_BLOCK_ROWS);
    match u32::try_from(chunk_rows) {
        Ok(rows) if (1..=max_rows).contains(&rows) => Ok(rows),
        _ => Err(PhomemoError::Protocol(format!(
            "chunk_rows must be between 1 and {}, got {}",
            max_rows, chunk_rows
        ))),
    }
}

/// Splits bands into raster blocks for one printer.
///
/// Construction checks the block size; [`RasterEncoder::check_width`] checks
/// each image. Both run before anything reaches the link.
#[derive(Debug, Clone, Copy)]
pub struct RasterEncoder {
    config: PrinterConfig,
    chunk_rows: u32,
}

impl RasterEncoder {
    /// `chunk_rows` must fall in `1..=config.max_chunk_rows`.
    pub fn new(config: PrinterConfig, chunk_rows: i64) -> Result<Self, PhomemoError> {
        if config.width_dots % 8 != 0 || config.width_bytes > u8::MAX as u32 {
            return Err(PhomemoError::Protocol(format!(
                "{} width of {} dots cannot be framed as whole marker bytes",
                config.name, config.width_dots
            )));
        }
        Ok(Self {
            config,
            chunk_rows: check_chunk_rows(chunk_rows, config.max_chunk_rows.into())?,
        })
    }

    #[inline]
    pub fn chunk_rows(&self) -> u32 {
        self.chunk_rows
    }

    #[inline]
    pub fn width_bytes(&self) -> u8 {
        self.config.width_bytes as u8
    }

    /// The raster must be exactly as wide as the printable area.
    pub fn check_width(&self, image: &Bilevel) -> Result<(), PhomemoError> {
        if image.width() != self.config.width_dots {
            return Err(PhomemoError::Protocol(format!(
                "image width must be {}px for {}, got {}px",
                self.config.width_dots,
                self.config.name,
                image.width()
            )));
        }
        Ok(())
    }

    /// Split one band into blocks of at most `chunk_rows` rows, top to bottom.
    pub fn blocks(&self, band: &Bilevel) -> Result<Vec<RasterBlock>, PhomemoError> {
        self.check_width(band)?;

        let height = band.height();
        let mut blocks = Vec::with_capacity(height.div_ceil(self.chunk_rows) as usize);
        let mut start = 0;
        while start < height {
            let end = (start + self.chunk_rows).min(height);
            blocks.push(RasterBlock {
                width_bytes: self.width_bytes(),
                rows: (start..end).map(|y| pack_row(band, y)).collect(),
            });
            start = end;
        }
        Ok(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stripes(width: u32, height: u32) -> Bilevel {
        // Ink on even columns: every packed byte is 0b1010_1010
        Bilevel::from_fn(width, height, |x, _| x % 2 == 0)
    }

    #[test]
    fn test_block_marker_row_count_byte() {
        assert_eq!(block_marker(72, 1)[6], 0);
        assert_eq!(block_marker(72, 100)[6], 99);
        assert_eq!(block_marker(72, 256)[6], 255);
    }

    #[test]
    fn test_block_marker_layout() {
        let marker = block_marker(72, 17);
        assert_eq!(&marker[..4], &RASTER_MAGIC);
        assert_eq!(marker[4], 72);
        assert_eq!(marker[5], 0);
        assert_eq!(marker[7], 0);
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(0x0A), 0x14);
        assert_eq!(escape(0x14), 0x14);
        assert_eq!(escape(0x0B), 0x0B);
        assert_eq!(escape(0xFF), 0xFF);
    }

    #[test]
    fn test_pack_row_msb_is_leftmost() {
        // Only the very first dot is inked
        let img = Bilevel::from_fn(16, 1, |x, _| x == 0);
        assert_eq!(pack_row(&img, 0), vec![0x80, 0x00]);

        // Only column 15 is inked (last bit of the second byte)
        let img = Bilevel::from_fn(16, 1, |x, _| x == 15);
        assert_eq!(pack_row(&img, 0), vec![0x00, 0x01]);
    }

    #[test]
    fn test_pack_row_escapes_line_feed() {
        // 0x0A = 0000_1010: ink at bit positions 4 and 6 → columns 4 and 6
        let img = Bilevel::from_fn(8, 1, |x, _| x == 4 || x == 6);
        assert_eq!(pack_row(&img, 0), vec![0x14]);
    }

    #[test]
    fn test_pack_row_paper_is_zero() {
        let img = Bilevel::from_fn(24, 1, |_, _| false);
        assert_eq!(pack_row(&img, 0), vec![0, 0, 0]);
    }

    #[test]
    fn test_chunk_rows_range() {
        assert!(check_chunk_rows(0, 256).is_err());
        assert_eq!(check_chunk_rows(1, 256).unwrap(), 1);
        assert_eq!(check_chunk_rows(256, 256).unwrap(), 256);
        for rows in [257, -1, i64::MIN, i64::MAX] {
            assert!(matches!(check_chunk_rows(rows, 256), Err(PhomemoError::Protocol(_))));
        }
    }

    #[test]
    fn test_chunk_rows_follow_printer_limit() {
        let narrow = PrinterConfig {
            max_chunk_rows: 64,
            ..PrinterConfig::M02_PRO
        };
        assert!(RasterEncoder::new(narrow, 64).is_ok());
        let err = RasterEncoder::new(narrow, 65).unwrap_err();
        assert!(err.to_string().contains("between 1 and 64"));

        // The marker byte still caps a profile that claims more
        let wide = PrinterConfig {
            max_chunk_rows: 1000,
            ..PrinterConfig::M02_PRO
        };
        assert!(RasterEncoder::new(wide, 257).is_err());
    }

    #[test]
    fn test_blocks_split_at_chunk_rows() {
        let encoder = RasterEncoder::new(PrinterConfig::M02_PRO, 200).unwrap();
        let band = stripes(576, 450);
        let blocks = encoder.blocks(&band).unwrap();
        let counts: Vec<usize> = blocks.iter().map(|b| b.row_count()).collect();
        assert_eq!(counts, vec![200, 200, 50]);
        assert!(blocks.iter().all(|b| b.width_bytes == 72));
        assert!(blocks[0].rows.iter().all(|r| r.len() == 72 && r.iter().all(|&b| b == 0xAA)));
    }

    #[test]
    fn test_block_bytes() {
        let encoder = RasterEncoder::new(PrinterConfig::M02_PRO, 256).unwrap();
        let band = stripes(576, 3);
        let blocks = encoder.blocks(&band).unwrap();
        assert_eq!(blocks.len(), 1);
        let bytes = blocks[0].to_bytes();
        assert_eq!(bytes.len(), MARKER_LEN + 72 * 3);
        assert_eq!(&bytes[..MARKER_LEN], &[0x1D, 0x76, 0x30, 0x00, 72, 0, 2, 0]);
    }

    #[test]
    fn test_wrong_width_rejected() {
        let encoder = RasterEncoder::new(PrinterConfig::M02_PRO, 200).unwrap();
        let band = stripes(384, 10);
        let err = encoder.blocks(&band).unwrap_err();
        assert!(err.to_string().contains("576"));
        assert!(err.to_string().contains("384"));
    }
}
