//! # Phomemo Raster Protocol
//!
//! This module turns a 1-bit image into the escaped, block-framed byte
//! stream understood by Phomemo M02-family label printers.
//!
//! ## Module Structure
//!
//! - [`commands`]: Fixed device byte sequences (header, feed, footer, block magic)
//! - [`raster`]: Row packing, escaping and block framing
//! - [`transmit`](mod@transmit): Job sequencing onto a link
//!
//! ## Usage Example
//!
//! ```
//! use phomemo_layout::printer::PrinterConfig;
//! use phomemo_layout::protocol;
//! use phomemo_layout::render::Bilevel;
//!
//! // A 576x40 image with a solid bar across the top 8 rows
//! let image = Bilevel::from_fn(576, 40, |_, y| y < 8);
//!
//! let mut bytes: Vec<u8> = Vec::new();
//! let heights = protocol::transmit(&mut bytes, &image, 1400, 200, &PrinterConfig::M02_PRO)?;
//!
//! assert_eq!(heights, vec![40]);
//! assert_eq!(&bytes[..2], &[0x1B, 0x40]);
//! # Ok::<(), phomemo_layout::PhomemoError>(())
//! ```

pub mod commands;
pub mod raster;
pub mod transmit;

pub use raster::{RasterBlock, RasterEncoder};
pub use transmit::transmit;
