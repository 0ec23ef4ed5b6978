//! # Layout Job Document
//!
//! The JSON a caller hands in, in three forms:
//!
//! - raw [`serde_json::Value`], checked by [`LayoutValidator`]
//! - typed [`LayoutJob`], deserialized after validation passes
//! - [`Color`] values parsed out of hex or named strings
//!
//! ```
//! use phomemo_layout::document::{LayoutJob, LayoutValidator};
//! use serde_json::json;
//!
//! let raw = json!({
//!     "canvas": {"font_path": "fonts/NotoSansJP.ttf"},
//!     "layers": [{"type": "text", "text": "Hello"}],
//!     "output": {"rotate": "none"}
//! });
//! LayoutValidator::shared().validate(&raw)?;
//! let job = LayoutJob::from_value(&raw)?;
//! assert_eq!(job.layers.len(), 1);
//! # Ok::<(), phomemo_layout::PhomemoError>(())
//! ```

pub mod color;
pub mod types;
pub mod validate;

pub use color::{Color, parse_color};
pub use types::*;
pub use validate::LayoutValidator;
