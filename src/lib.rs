//! # phomemo-layout - Label Layouts for Phomemo Thermal Printers
//!
//! phomemo-layout turns a declarative JSON label layout into a 1-bit raster
//! and streams it to a Phomemo label printer over Bluetooth. It provides:
//!
//! - **Layout**: text and image layers composed on a printer-wide canvas
//! - **Orientation**: automatic or forced rotation, fitted to the head width
//! - **Protocol**: escaped, block-framed raster transmission
//! - **Transport**: RFCOMM sockets and pre-bound `/dev/rfcommN` devices
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use phomemo_layout::{
//!     LayoutJobPipeline,
//!     pipeline::RunOptions,
//!     transport::PrinterTarget,
//! };
//!
//! let pipeline = LayoutJobPipeline::default();
//! let options = RunOptions {
//!     target: Some(PrinterTarget::Rfcomm {
//!         address: "DC:0D:30:AA:BB:CC".to_string(),
//!         channel: 1,
//!     }),
//!     dry_run: false,
//! };
//!
//! let result = pipeline.run(Path::new("label.json"), &options)?;
//! println!("sent {:?}", result.slice_heights);
//!
//! # Ok::<(), phomemo_layout::PhomemoError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`document`] | Job document types, colors, schema validation |
//! | [`render`] | Compositing, orientation, thresholding, slicing |
//! | [`text`] | Text layout collaborator and the `ab_glyph` engine |
//! | [`protocol`] | Raster framing and transmission |
//! | [`transport`] | Printer links |
//! | [`printer`] | Printer configurations |
//! | [`pipeline`] | End-to-end job runner |
//! | [`error`] | Error types |
//!
//! ## Supported Printers
//!
//! Currently tested with:
//! - Phomemo M02 Pro (576 dots, 300 DPI, Bluetooth)

pub mod document;
pub mod error;
pub mod pipeline;
pub mod printer;
pub mod protocol;
pub mod render;
pub mod text;
pub mod transport;

// Re-exports for convenience
pub use error::PhomemoError;
pub use pipeline::LayoutJobPipeline;
pub use printer::PrinterConfig;
