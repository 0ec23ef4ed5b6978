//! # Error Types
//!
//! This module defines error types used throughout the phomemo-layout library.
//!
//! Every failure is fatal for the job that raised it. Nothing here is retried
//! internally; a caller that wants another attempt submits a new job.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// A single schema violation: where in the document, and what is wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Slash-separated path into the document (`layers/0/font_size`), or `(root)`.
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            path: if path.is_empty() {
                "(root)".to_string()
            } else {
                path
            },
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "- {}: {}", self.path, self.message)
    }
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Main error type for phomemo-layout operations
#[derive(Debug, Error)]
pub enum PhomemoError {
    /// The input document failed the schema check. Nothing was rendered.
    #[error("layout job schema validation failed:\n{}", format_violations(.0))]
    Validation(Vec<Violation>),

    /// The document is well-formed but cannot be resolved (missing font,
    /// missing image file, text layer without content, ...).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The raster handed to the encoder does not fit the wire format.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Opening or writing to the printer link failed.
    #[error("Transmission error: {0}")]
    Transmission(String),

    /// Image decode or encode failure
    #[error("Image error: {0}")]
    Image(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON input
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<image::ImageError> for PhomemoError {
    fn from(e: image::ImageError) -> Self {
        PhomemoError::Image(e.to_string())
    }
}
