//! # Rendering Module
//!
//! Everything between a parsed [`LayoutJob`](crate::document::LayoutJob) and
//! a 1-bit image ready for the raster encoder.
//!
//! ## Stages
//!
//! - [`resolve`]: one layer → positioned RGBA buffer
//! - [`compositor`]: all layers → one canvas of printer width
//! - [`orientation`]: rotation policy and width fit
//! - [`threshold`]: luminance cutoff to black/white
//! - [`slice`]: tall images → bounded bands
//! - [`source`]: image decode/resize collaborator
//!
//! ## Usage Example
//!
//! ```
//! use image::{Rgba, RgbaImage};
//! use phomemo_layout::render::{binarize, orientation::{normalize, RotateMode}};
//!
//! // A landscape label is turned upright and fitted to the head
//! let composed = RgbaImage::from_pixel(800, 400, Rgba([100, 100, 100, 255]));
//! let upright = normalize(composed, RotateMode::Auto, 576);
//! assert_eq!(upright.width(), 576);
//!
//! let bilevel = binarize(&upright, 128);
//! assert!(bilevel.is_ink(300, 10));
//! ```

pub mod compositor;
pub mod orientation;
pub mod resolve;
pub mod slice;
pub mod source;
pub mod threshold;

pub use compositor::LayoutCompositor;
pub use orientation::{RotateMode, normalize};
pub use resolve::{LayerResolver, RenderedLayer};
pub use source::{DecodedImages, ImageSource};
pub use threshold::{Bilevel, binarize};
