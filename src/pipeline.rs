//! # Job Pipeline
//!
//! One call takes a job document from disk to paper:
//!
//! ```text
//! read JSON → validate → compose → orient → [preview PNG] → binarize → [transmit]
//! ```
//!
//! The printer connection is opened only after everything before it has
//! succeeded, and is closed (dropped) on every path out of the transmit step.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use log::info;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::document::{LayoutJob, LayoutValidator};
use crate::error::PhomemoError;
use crate::printer::PrinterConfig;
use crate::protocol::{RasterEncoder, transmit};
use crate::render::{
    DecodedImages, ImageSource, LayoutCompositor, RotateMode, binarize, normalize,
};
use crate::text::{GlyphEngine, TextLayout};
use crate::transport::{Connect, PrinterTarget};

/// Caller-side switches for [`LayoutJobPipeline::run`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Where to print. Required unless the job ends up not being sent.
    pub target: Option<PrinterTarget>,
    /// Render and write the preview, never transmit.
    pub dry_run: bool,
}

/// Printer details safe to report. The address itself is never included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrinterInfo {
    pub configured: bool,
    pub kind: Option<&'static str>,
    pub channel: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobInfo {
    pub threshold: u8,
    pub slice_height: u32,
    pub chunk_rows: i64,
    pub rotate: RotateMode,
    /// Size of the oriented image.
    pub width: u32,
    pub height: u32,
    pub dry_run: bool,
    /// Whether the job was actually sent (document flag and not a dry run).
    pub send_to_printer: bool,
    pub printer: PrinterInfo,
    pub reason_not_printed: Option<String>,
}

/// Outcome of one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobResult {
    pub preview_path: Option<PathBuf>,
    pub printed: bool,
    /// Heights of the bands sent, in order. `None` when nothing was sent.
    pub slice_heights: Option<Vec<u32>>,
    pub info: JobInfo,
}

/// Runs layout jobs against one printer model.
pub struct LayoutJobPipeline {
    printer: PrinterConfig,
    text: Box<dyn TextLayout>,
    images: Box<dyn ImageSource>,
}

impl Default for LayoutJobPipeline {
    fn default() -> Self {
        Self::new(
            PrinterConfig::M02_PRO,
            Box::new(GlyphEngine::new()),
            Box::new(DecodedImages),
        )
    }
}

impl LayoutJobPipeline {
    pub fn new(
        printer: PrinterConfig,
        text: Box<dyn TextLayout>,
        images: Box<dyn ImageSource>,
    ) -> Self {
        Self {
            printer,
            text,
            images,
        }
    }

    /// Run the job stored at `job_path`.
    ///
    /// Relative paths inside the document resolve against the file's directory.
    pub fn run(&self, job_path: &Path, options: &RunOptions) -> Result<JobResult, PhomemoError> {
        let raw = fs::read_to_string(job_path)?;
        let document: Value = serde_json::from_str(&raw)?;
        let base_dir = job_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        let connector = options.target.as_ref().map(|t| t as &dyn Connect);
        self.run_document(&document, base_dir, options.dry_run, connector)
    }

    /// Run an in-memory document.
    pub fn run_document(
        &self,
        document: &Value,
        base_dir: &Path,
        dry_run: bool,
        connector: Option<&dyn Connect>,
    ) -> Result<JobResult, PhomemoError> {
        LayoutValidator::shared().validate(document)?;
        let job = LayoutJob::from_value(document)?;

        let compositor =
            LayoutCompositor::new(self.printer, self.text.as_ref(), self.images.as_ref(), base_dir);
        let (composed, output) = compositor.compose(&job)?;
        let oriented = normalize(composed, output.rotate, self.printer.width_dots);

        let preview_path = match (&output.path, dry_run) {
            (Some(path), _) => Some(save_preview(&oriented, &base_dir.join(path))?),
            (None, true) => Some(save_preview(&oriented, &temp_preview_path())?),
            (None, false) => None,
        };

        let bilevel = binarize(&oriented, output.threshold);
        let send = output.send_to_printer && !dry_run;

        let slice_heights = if send {
            let connector = connector.ok_or_else(|| {
                PhomemoError::Configuration(
                    "send_to_printer is set but no printer address or device was given"
                        .to_string(),
                )
            })?;
            // Reject bad framing parameters before touching the link
            RasterEncoder::new(self.printer, output.chunk_rows)?;

            let mut link = connector.connect()?;
            let heights = transmit(
                link.as_mut(),
                &bilevel,
                i64::from(output.slice_height),
                output.chunk_rows,
                &self.printer,
            )?;
            Some(heights)
        } else {
            None
        };

        let reason_not_printed = match (send, dry_run) {
            (true, _) => None,
            (false, true) => Some("dry_run=true (preview only)".to_string()),
            (false, false) => Some("output.send_to_printer=false".to_string()),
        };

        info!(
            "job done: {}x{}, printed={}, preview={:?}",
            bilevel.width(),
            bilevel.height(),
            send,
            preview_path
        );

        Ok(JobResult {
            preview_path,
            printed: send,
            slice_heights,
            info: JobInfo {
                threshold: output.threshold,
                slice_height: output.slice_height,
                chunk_rows: output.chunk_rows,
                rotate: output.rotate,
                width: bilevel.width(),
                height: bilevel.height(),
                dry_run,
                send_to_printer: send,
                printer: PrinterInfo {
                    configured: connector.is_some(),
                    kind: connector.map(|c| c.kind()),
                    channel: connector.and_then(|c| c.channel()),
                },
                reason_not_printed,
            },
        })
    }
}

fn temp_preview_path() -> PathBuf {
    env::temp_dir().join(format!("phomemo_preview_{}.png", Uuid::new_v4().simple()))
}

/// Write `image` as PNG, creating parent directories. Returns the absolute path.
fn save_preview(image: &RgbaImage, path: &Path) -> Result<PathBuf, PhomemoError> {
    let path = std::path::absolute(path)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    image.save_with_format(&path, ImageFormat::Png)?;
    Ok(path)
}
