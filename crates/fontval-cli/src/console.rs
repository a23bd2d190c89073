// this_file: crates/fontval-cli/src/console.rs

//! Console sink for driver events

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fontval::prelude::{DriverCallbacks, FontvalError};
use fontval::types::Tag;

/// Prints run progress the way a terminal user expects to read it
#[derive(Debug, Default)]
pub struct ConsoleCallbacks {
    /// Per-test chatter ("Begin Raster Test", "Table Test", "Progress")
    pub verbose: bool,
    /// Copy every finished report to stdout
    pub report_stdout: bool,
    /// Reports closed so far, in order
    pub reports: Vec<PathBuf>,
    pub errors: usize,
}

impl ConsoleCallbacks {
    pub fn new(verbose: bool, report_stdout: bool) -> Self {
        Self {
            verbose,
            report_stdout,
            ..Self::default()
        }
    }

    fn echo_report(report: &Path) {
        match fs::read(report) {
            Ok(bytes) => {
                let mut stdout = io::stdout().lock();
                if let Err(e) = stdout.write_all(&bytes).and_then(|()| stdout.flush()) {
                    log::warn!("Failed to copy report to stdout: {e}");
                }
            }
            Err(e) => eprintln!("Error: cannot read {}: {e}", report.display()),
        }
    }
}

impl DriverCallbacks for ConsoleCallbacks {
    fn on_exception(&mut self, error: &FontvalError) {
        self.errors += 1;
        eprintln!("Error: {error}");
    }

    fn on_begin_font_test(&mut self, font: &Path, index: usize, total: usize) {
        if !self.report_stdout {
            println!("{} (file {} of {total})", font.display(), index + 1);
        }
    }

    fn on_begin_raster_test(&mut self, label: &str) {
        if self.verbose {
            println!("Begin Raster Test: {label}");
        }
    }

    fn on_begin_table_test(&mut self, tag: Tag) {
        if self.verbose {
            println!("Table Test: {tag}");
        }
    }

    fn on_test_progress(&mut self, text: &str) {
        if self.verbose {
            println!("Progress: {text}");
        }
    }

    fn on_close_report_file(&mut self, report: &Path) {
        self.reports.push(report.to_path_buf());
        if self.report_stdout {
            Self::echo_report(report);
        } else {
            println!("Complete: {}", report.display());
        }
    }

    fn on_cancel(&mut self) {
        println!("Cancelled");
    }

    fn on_reports_ready(&mut self) {
        if !self.report_stdout {
            println!("Reports are ready!");
        }
    }
}
