//! # Phomemo ESC/POS Command Constants
//!
//! The M02 family speaks a small subset of ESC/POS plus a handful of
//! vendor `US` (0x1F) sequences. Only what is needed to frame raster data is
//! defined here; the byte sequences are fixed by the device and must be
//! reproduced exactly.
//!
//! ## Job Framing
//!
//! ```text
//! HEADER
//!   GS v 0 \0 xL 00 (rows-1) 00  row data...   ← one raster block
//!   ...
//!   FEED [FEED]                                 ← after each slice
//! FEED
//! FOOTER
//! ```

// ============================================================================
// ESCAPE SEQUENCE CONSTANTS
// ============================================================================

/// ESC (Escape) - Command prefix byte
pub const ESC: u8 = 0x1B;

/// GS (Group Separator) - Extended command prefix, used by raster graphics
pub const GS: u8 = 0x1D;

/// US (Unit Separator) - Vendor command prefix for Phomemo devices
pub const US: u8 = 0x1F;

/// LF (Line Feed)
///
/// The link treats this byte as protocol-significant, so it must never
/// appear inside packed raster rows.
pub const LF: u8 = 0x0A;

/// Replacement for [`LF`] inside raster row data.
///
/// The substitution flips two dots in the affected byte; the device accepts
/// the result and the difference is not visible on paper.
pub const LF_SUBSTITUTE: u8 = 0x14;

// ============================================================================
// JOB FRAMING
// ============================================================================

/// # Job Header
///
/// | Bytes | Meaning |
/// |-------|---------|
/// | `1B 40` | ESC @ - initialize |
/// | `1B 61 01` | ESC a 1 - center justification |
/// | `1F 11 02 04` | vendor: set print density/concentration |
pub const HEADER: [u8; 9] = [ESC, b'@', ESC, b'a', 0x01, US, 0x11, 0x02, 0x04];

/// # Paper Feed (ESC d 2)
///
/// Prints the buffer and feeds two lines.
pub const FEED: [u8; 3] = [ESC, b'd', 0x02];

/// # Job Footer
///
/// Two feeds followed by the vendor end-of-job sequence that makes the
/// printer advance to the label gap and report status.
pub const FOOTER: [u8; 18] = [
    ESC, b'd', 0x02, ESC, b'd', 0x02, US, 0x11, 0x08, US, 0x11, 0x0E, US, 0x11, 0x07, US, 0x11,
    0x09,
];

/// # Raster Block Prefix (GS v 0 m)
///
/// Followed by `xL xH yL yH` and the row data. `m = 0` selects normal density.
pub const RASTER_MAGIC: [u8; 4] = [GS, b'v', b'0', 0x00];
