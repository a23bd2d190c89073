// this_file: crates/fontval-core/src/traits.rs

//! The contracts that bind engines, validators and report writers together
//!
//! - [`RasterBackend`] - the capability set every rasterization engine offers
//! - [`TableValidator`] - structural checks for one sfnt table at a time
//! - [`ReportWriter`] - turns collected results into report bytes

use std::io::Write;
use std::sync::Arc;

use crate::{
    cancel::CancellationToken,
    devmetrics::DevMetricsResult,
    driver::FontReport,
    error::Result,
    types::{FaceInfo, GlyphExtents, GlyphId, Tag},
    RasterRunConfig,
};

/// One rasterization engine behind a uniform surface
///
/// A backend owns at most one face at a time. Opening a face releases the
/// previous one first. Every per-glyph query answers for the pixel size
/// last selected with [`set_pixel_size`](RasterBackend::set_pixel_size).
///
/// Cancellation is cooperative: the two tokens returned by
/// [`raster_cancel_token`](RasterBackend::raster_cancel_token) and
/// [`metrics_cancel_token`](RasterBackend::metrics_cancel_token) may be
/// cloned to another thread and set there; the backend polls them.
pub trait RasterBackend: Send {
    /// Short engine name for logs and reports
    fn name(&self) -> &'static str;

    /// Open face `face_index` from an sfnt byte stream, releasing any held face
    fn open_face(&mut self, data: Arc<[u8]>, face_index: u32) -> Result<FaceInfo>;

    /// Release the held face, if any
    fn close_face(&mut self);

    /// The face currently held
    fn face(&self) -> Option<&FaceInfo>;

    /// Rasterize the active face at every size in `config`
    ///
    /// Anomalies go to `errors(name, details)` and count toward
    /// [`error_count`](RasterBackend::error_count); `progress(text)` is
    /// called as sizes and modes advance. Returns `Ok(true)` unless the
    /// engine hit a fatal internal fault.
    fn run_raster_test(
        &mut self,
        config: &RasterRunConfig,
        errors: &mut dyn FnMut(&str, &str),
        progress: &mut dyn FnMut(&str),
    ) -> Result<bool>;

    /// Select a pixel size on the active face
    ///
    /// Non-scalable faces only accept sizes they carry a strike for; any
    /// other request fails with `UnsupportedFixedSize` and keeps the
    /// previous selection.
    fn set_pixel_size(&mut self, x: u16, y: u16) -> Result<()>;

    /// The last successfully selected pixel size
    fn pixel_size(&self) -> Option<(u16, u16)>;

    /// Rasterized advance width in pixels at the selected size
    fn glyph_advance(&mut self, glyph_id: GlyphId) -> Result<f32>;

    /// Linearly scaled advance width in pixels at the selected size
    fn linear_advance(&mut self, glyph_id: GlyphId) -> Result<f32>;

    /// Rasterized vertical extent at the selected size; `None` without ink
    fn glyph_extents(&mut self, glyph_id: GlyphId) -> Result<Option<GlyphExtents>>;

    fn raster_cancel_token(&self) -> CancellationToken;

    fn metrics_cancel_token(&self) -> CancellationToken;

    /// Ask a running raster test to stop at the next glyph or size
    fn cancel_raster_test(&self) {
        self.raster_cancel_token().cancel();
    }

    /// Ask a running metrics computation to stop at the next glyph or height
    fn cancel_metrics_computation(&self) {
        self.metrics_cancel_token().cancel();
    }

    /// Anomalies seen since construction or the last reset
    fn error_count(&self) -> u32;

    fn reset_error_count(&mut self);
}

/// Where a table validator reads its input from
pub struct TableContext<'a> {
    pub data: &'a [u8],
    pub face_index: u32,
    /// Device metrics synthesized for this face, when requested
    pub dev_metrics: Option<&'a DevMetricsResult>,
}

/// How bad a diagnostic is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// Result of checking one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOutcome {
    pub tag: Tag,
    pub diagnostics: Vec<Diagnostic>,
}

impl TableOutcome {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            diagnostics: Vec::new(),
        }
    }

    pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            message: message.into(),
        });
    }

    pub fn passed(&self) -> bool {
        self.diagnostics
            .iter()
            .all(|d| d.severity < Severity::Error)
    }
}

/// Per-table structural checks, supplied by the caller
pub trait TableValidator {
    fn name(&self) -> &'static str;

    /// Check one table of the face in `ctx`
    fn validate_table(&self, ctx: &TableContext<'_>, tag: Tag) -> Result<TableOutcome>;
}

/// Renders a finished font report
pub trait ReportWriter {
    fn write_report(&mut self, report: &FontReport, out: &mut dyn Write) -> Result<()>;
}
