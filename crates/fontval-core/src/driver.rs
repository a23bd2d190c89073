// this_file: crates/fontval-core/src/driver.rs

//! The validation run: fonts in, report files out, callbacks throughout
//!
//! [`ValidationRunDriver::run`] walks a batch of font files. Per font it
//! asks for a report name, creates the file, raster-tests and table-tests
//! every face, then hands the collected [`FontReport`] to the
//! [`ReportWriter`]. The driver owns the file lifecycle; the writer owns the
//! bytes.
//!
//! ```text
//! Idle -> Opening -> RasterTesting -> TableTesting -> Reporting -> Idle
//!            \______________\_______________\____________\-> Aborted
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{
    cancel::{CancelHandle, CancellationToken},
    devmetrics::{synthesize, DevMetricsResult, MetricsComparison},
    error::{FontvalError, ReportError, Result},
    params::ValidatorParameters,
    report::{ReportDestination, ReportFileEntry},
    sfnt,
    traits::{RasterBackend, ReportWriter, TableContext, TableOutcome, TableValidator},
    types::{Anomaly, Tag},
};

/// Lifecycle events of a run, delivered in order on the running thread
///
/// Every hook has an empty default so front ends implement only what
/// they display.
pub trait DriverCallbacks {
    /// A font failed (the batch continues) or the run could not start
    fn on_exception(&mut self, _error: &FontvalError) {}

    /// `index` is zero-based
    fn on_begin_font_test(&mut self, _font: &Path, _index: usize, _total: usize) {}

    fn on_begin_raster_test(&mut self, _label: &str) {}

    fn on_begin_table_test(&mut self, _tag: Tag) {}

    fn on_test_progress(&mut self, _text: &str) {}

    fn on_open_report_file(&mut self, _report: &Path, _font: &Path) {}

    fn on_close_report_file(&mut self, _report: &Path) {}

    fn on_cancel(&mut self) {}

    fn on_reports_ready(&mut self) {}

    /// Where the report for `font` should go
    fn report_file_name(&mut self, font: &Path, destination: &ReportDestination) -> Result<PathBuf> {
        destination.report_path(font)
    }
}

/// Where the driver is within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Opening,
    RasterTesting,
    TableTesting,
    Reporting,
    Aborted,
}

/// Raster-test results for one face
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterOutcome {
    /// False when the engine hit a fatal internal fault
    pub completed: bool,
    pub anomalies: Vec<Anomaly>,
}

/// Everything collected for one face
#[derive(Debug, Clone)]
pub struct FaceReport {
    pub face_index: u32,
    pub num_glyphs: u16,
    pub backend: &'static str,
    /// `None` when raster testing is disabled
    pub raster: Option<RasterOutcome>,
    pub dev_metrics: Option<DevMetricsResult>,
    pub metrics_comparison: Vec<MetricsComparison>,
    pub tables: Vec<TableOutcome>,
}

impl FaceReport {
    pub fn tables_failed(&self) -> usize {
        self.tables.iter().filter(|t| !t.passed()).count()
    }
}

/// Everything collected for one font file
#[derive(Debug, Clone)]
pub struct FontReport {
    pub font_path: PathBuf,
    pub faces: Vec<FaceReport>,
}

impl FontReport {
    pub fn tables_failed(&self) -> usize {
        self.faces.iter().map(FaceReport::tables_failed).sum()
    }

    pub fn anomaly_count(&self) -> usize {
        self.faces
            .iter()
            .filter_map(|f| f.raster.as_ref())
            .map(|r| r.anomalies.len())
            .sum()
    }
}

/// What a finished (or aborted) run amounts to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Fonts whose report was written
    pub fonts_tested: usize,
    /// Fonts that raised an exception
    pub fonts_failed: usize,
    /// Table checks that ended with an error diagnostic
    pub tables_failed: usize,
    /// Backend anomaly tally at the end of the run
    pub raster_errors: u32,
    pub cancelled: bool,
    pub reports: Vec<ReportFileEntry>,
}

enum FontOutcome {
    Finished(FontReport),
    Cancelled,
}

/// Runs a batch of fonts through one backend, one validator and one writer
pub struct ValidationRunDriver<'a> {
    backend: &'a mut dyn RasterBackend,
    validator: Option<&'a dyn TableValidator>,
    writer: &'a mut dyn ReportWriter,
    params: ValidatorParameters,
    destination: ReportDestination,
    cancel: CancellationToken,
    state: RunState,
}

impl<'a> ValidationRunDriver<'a> {
    pub fn new(
        backend: &'a mut dyn RasterBackend,
        writer: &'a mut dyn ReportWriter,
        params: ValidatorParameters,
        destination: ReportDestination,
    ) -> Self {
        Self {
            backend,
            validator: None,
            writer,
            params,
            destination,
            cancel: CancellationToken::new(),
            state: RunState::Idle,
        }
    }

    pub fn with_validator(mut self, validator: &'a dyn TableValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn params(&self) -> &ValidatorParameters {
        &self.params
    }

    pub fn destination(&self) -> &ReportDestination {
        &self.destination
    }

    /// A handle that cancels this driver's runs from any thread
    ///
    /// Covers the run itself plus the backend's raster and metrics loops.
    /// The flags are cleared when the next run starts.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle::new([
            self.cancel.clone(),
            self.backend.raster_cancel_token(),
            self.backend.metrics_cancel_token(),
        ])
    }

    /// Validate `fonts` in order
    ///
    /// Returns `Err` only when the run cannot start (invalid configuration
    /// or an unwritable report destination); per-font failures are
    /// reported through [`DriverCallbacks::on_exception`] and counted.
    pub fn run(&mut self, fonts: &[PathBuf], callbacks: &mut dyn DriverCallbacks) -> Result<RunSummary> {
        let handle = self.cancel_handle();
        handle.reset();
        self.backend.reset_error_count();

        if let Err(e) = self.preflight() {
            log::warn!("Run aborted before the first font: {e}");
            callbacks.on_exception(&e);
            self.state = RunState::Aborted;
            return Err(e);
        }

        log::info!(
            "Validating {} font(s) with the {} backend",
            fonts.len(),
            self.backend.name()
        );

        let mut summary = RunSummary::default();
        for (index, font) in fonts.iter().enumerate() {
            if handle.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            callbacks.on_begin_font_test(font, index, fonts.len());

            match self.process_font(font, &handle, callbacks) {
                Ok(Some((entry, tables_failed))) => {
                    summary.fonts_tested += 1;
                    summary.tables_failed += tables_failed;
                    summary.reports.push(entry);
                }
                Ok(None) => {
                    summary.cancelled = true;
                    break;
                }
                Err(e) => {
                    log::warn!("{}: {e}", font.display());
                    summary.fonts_failed += 1;
                    callbacks.on_exception(&e);
                }
            }
            self.backend.close_face();
        }

        summary.raster_errors = self.backend.error_count();
        if summary.cancelled {
            log::info!("Run cancelled after {} font(s)", summary.fonts_tested);
            callbacks.on_cancel();
            self.state = RunState::Aborted;
        } else {
            callbacks.on_reports_ready();
            self.state = RunState::Idle;
        }

        let removed = self.destination.cleanup(&summary.reports);
        if removed > 0 {
            log::debug!("Removed {removed} temporary report(s)");
        }
        Ok(summary)
    }

    fn preflight(&self) -> Result<()> {
        if self.params.raster_testing {
            self.params.raster.validate()?;
        }
        self.destination.probe()
    }

    /// One font, from report creation to report close
    ///
    /// `Ok(None)` means the run was cancelled and the report discarded.
    fn process_font(
        &mut self,
        font: &Path,
        handle: &CancelHandle,
        callbacks: &mut dyn DriverCallbacks,
    ) -> Result<Option<(ReportFileEntry, usize)>> {
        self.state = RunState::Opening;
        let report_path = callbacks.report_file_name(font, &self.destination)?;
        let file = File::create(&report_path).map_err(|source| ReportError::DirectoryWrite {
            path: report_path.clone(),
            source,
        })?;
        callbacks.on_open_report_file(&report_path, font);

        let outcome = match self.test_font(font, handle, callbacks) {
            Ok(outcome) => outcome,
            Err(e) => {
                // No report file survives a failed font
                drop(file);
                discard(&report_path);
                return Err(e);
            }
        };
        let report = match outcome {
            FontOutcome::Finished(report) => report,
            FontOutcome::Cancelled => {
                drop(file);
                discard(&report_path);
                return Ok(None);
            }
        };

        self.state = RunState::Reporting;
        let mut out = BufWriter::new(file);
        if let Err(e) = self.writer.write_report(&report, &mut out) {
            log::warn!("{}", ReportError::Transform(e.to_string()));
        }
        out.flush()?;
        drop(out);
        callbacks.on_close_report_file(&report_path);

        let entry = ReportFileEntry {
            report: report_path,
            font: font.to_path_buf(),
        };
        Ok(Some((entry, report.tables_failed())))
    }

    fn test_font(
        &mut self,
        font: &Path,
        handle: &CancelHandle,
        callbacks: &mut dyn DriverCallbacks,
    ) -> Result<FontOutcome> {
        let data: Arc<[u8]> = fs::read(font)?.into();
        let face_count = sfnt::face_count(&data)?;
        let label = font
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| font.display().to_string());

        let mut report = FontReport {
            font_path: font.to_path_buf(),
            faces: Vec::with_capacity(face_count as usize),
        };

        for face_index in 0..face_count {
            if handle.is_cancelled() {
                return Ok(FontOutcome::Cancelled);
            }
            self.state = RunState::Opening;
            let info = self.backend.open_face(Arc::clone(&data), face_index)?;
            log::debug!(
                "{label}: face {face_index}, {} glyphs, {} units/em",
                info.num_glyphs,
                info.units_per_em
            );

            let mut face = FaceReport {
                face_index,
                num_glyphs: info.num_glyphs,
                backend: self.backend.name(),
                raster: None,
                dev_metrics: None,
                metrics_comparison: Vec::new(),
                tables: Vec::new(),
            };

            self.state = RunState::RasterTesting;
            if self.params.raster_testing {
                let face_label = if face_count > 1 {
                    format!("{label} (face {} of {face_count})", face_index + 1)
                } else {
                    label.clone()
                };
                callbacks.on_begin_raster_test(&face_label);

                let mut anomalies = Vec::new();
                let completed = self.backend.run_raster_test(
                    &self.params.raster,
                    &mut |name, details| {
                        log::debug!("Raster anomaly {name}: {details}");
                        anomalies.push(Anomaly {
                            name: name.to_string(),
                            details: details.to_string(),
                        });
                    },
                    &mut |text| callbacks.on_test_progress(text),
                )?;
                face.raster = Some(RasterOutcome {
                    completed,
                    anomalies,
                });
                if handle.is_cancelled() {
                    return Ok(FontOutcome::Cancelled);
                }
            }

            if self.params.dev_metrics.any() {
                let token = self.backend.metrics_cancel_token();
                let result = synthesize(
                    &mut *self.backend,
                    &self.params.dev_metrics,
                    &token,
                    &mut |text| callbacks.on_test_progress(text),
                )?;
                if let Some(result) = result {
                    if result.cancelled || handle.is_cancelled() {
                        return Ok(FontOutcome::Cancelled);
                    }
                    face.metrics_comparison = result.compare_with_font(&data, face_index)?;
                    face.dev_metrics = Some(result);
                }
            }

            self.state = RunState::TableTesting;
            let present = sfnt::table_tags(&data, face_index)?;
            for tag in self.params.tables_to_test(&present) {
                if handle.is_cancelled() {
                    return Ok(FontOutcome::Cancelled);
                }
                callbacks.on_begin_table_test(tag);
                if let Some(validator) = self.validator {
                    let ctx = TableContext {
                        data: &data,
                        face_index,
                        dev_metrics: face.dev_metrics.as_ref(),
                    };
                    let outcome = validator.validate_table(&ctx, tag)?;
                    face.tables.push(outcome);
                }
            }

            report.faces.push(face);
        }

        Ok(FontOutcome::Finished(report))
    }
}

fn discard(report: &Path) {
    if let Err(e) = fs::remove_file(report) {
        log::warn!("Failed to remove {}: {e}", report.display());
    }
}
