//! # Printer Module
//!
//! This module provides printer-specific configurations and job defaults.
//!
//! ## Modules
//!
//! - [`config`]: Printer hardware specifications

pub mod config;

pub use config::{
    DEFAULT_CHUNK_ROWS, DEFAULT_SLICE_HEIGHT, DEFAULT_THRESHOLD, MAX_CANVAS_HEIGHT, MAX_FONT_SIZE,
    MAX_LENGTH_DOTS, PrinterConfig,
};
