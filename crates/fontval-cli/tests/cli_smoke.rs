// this_file: crates/fontval-cli/tests/cli_smoke.rs

//! CLI Smoke Tests
//!
//! Integration tests for the fontval CLI commands:
//! - `info`: Display version, backends and tables
//! - `validate`: Validate fonts and write reports
//! - `devmetrics`: Synthesize hdmx, LTSH and VDMX
//!
//! Tests cover both success cases and failure cases (bad input, missing fonts).

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use fontval_core::testing::{simple_font, TestGlyph};

fn fontval(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fontval"))
        .args(args)
        .output()
        .expect("Failed to execute fontval")
}

/// Create a scratch directory unique to this test
fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("fontval_cli_{}_{name}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Write a small TrueType font into `dir`
fn sample_font(dir: &Path) -> PathBuf {
    let glyphs = [
        TestGlyph::empty(500),
        TestGlyph::rect(600, 50, -100, 550, 700),
        TestGlyph::rect(250, 20, 0, 230, 500),
    ];
    let path = dir.join("sample.ttf");
    fs::write(&path, simple_font(1000, &glyphs)).unwrap();
    path
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// ============================================================================
// Info Command Tests
// ============================================================================

#[test]
fn test_info_help() {
    let output = fontval(&["info", "--help"]);
    assert!(output.status.success(), "info --help should succeed");
    assert!(
        stdout(&output).contains("Display version"),
        "Help should describe the command"
    );
}

#[test]
fn test_info_backends() {
    let output = fontval(&["info", "--backends"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("hinted"), "{text}");
    assert!(text.contains("linear"), "{text}");
}

#[test]
fn test_info_tables() {
    let output = fontval(&["info", "--tables"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("OS/2"));
}

#[test]
fn test_version_flag() {
    let output = fontval(&["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

// ============================================================================
// Validate Command Tests
// ============================================================================

#[test]
fn test_validate_writes_report_next_to_font() {
    let dir = scratch("font_dir");
    let font = sample_font(&dir);

    let output = fontval(&[
        "validate",
        "-f",
        font.to_str().unwrap(),
        "--report-in-font-dir",
    ]);
    let text = stdout(&output);
    assert!(output.status.success(), "{text}");
    assert!(text.contains("(file 1 of 1)"), "{text}");
    assert!(text.contains("Complete:"), "{text}");
    assert!(text.contains("Reports are ready!"), "{text}");

    let report = fs::read_to_string(dir.join("sample.ttf.report.xml")).unwrap();
    assert!(report.starts_with("<?xml"));
    assert!(report.contains(r#"<TableTest tag="head" passed="true">"#), "{report}");
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_validate_report_stdout() {
    let dir = scratch("stdout");
    let font = sample_font(&dir);

    let output = fontval(&[
        "validate",
        "-f",
        font.to_str().unwrap(),
        "--report-stdout",
        "--no-raster-tests",
        "--backend",
        "linear",
    ]);
    let text = stdout(&output);
    assert!(output.status.success(), "{text}");
    assert!(text.contains("<FontValidatorReport"), "{text}");
    assert!(!text.contains("Reports are ready!"));
    // Temporary reports never land next to the font
    assert!(!dir.join("sample.ttf.report.xml").exists());
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_validate_unwritable_report_dir() {
    let dir = scratch("bad_dir");
    let font = sample_font(&dir);
    let missing = dir.join("does").join("not").join("exist");

    let output = fontval(&[
        "validate",
        "-f",
        font.to_str().unwrap(),
        "--report-dir",
        missing.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    assert!(
        !stdout(&output).contains("(file 1 of"),
        "no font should start when the destination is unusable"
    );
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_validate_missing_font_fails() {
    let dir = scratch("missing");
    let output = fontval(&[
        "validate",
        "-f",
        dir.join("nope.ttf").to_str().unwrap(),
        "--temporary-reports",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_validate_unknown_backend() {
    let output = fontval(&["validate", "-f", "x.ttf", "--backend", "gdi"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown backend"));
}

#[test]
fn test_validate_without_files_is_a_usage_error() {
    let output = fontval(&["validate"]);
    assert!(!output.status.success());
}

// ============================================================================
// Devmetrics Command Tests
// ============================================================================

#[test]
fn test_devmetrics_writes_tables() {
    let dir = scratch("devmetrics");
    let font = sample_font(&dir);
    let out = dir.join("out");

    let output = fontval(&[
        "devmetrics",
        font.to_str().unwrap(),
        "--hdmx",
        "--ltsh",
        "--backend",
        "linear",
        "--out-dir",
        out.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", stdout(&output));

    let hdmx = fs::read(out.join("hdmx.bin")).unwrap();
    // version 0, 42 records (9..=50 ppem)
    assert_eq!(&hdmx[..4], &[0, 0, 0, 42]);
    let ltsh = fs::read(out.join("LTSH.bin")).unwrap();
    // Linear scaling is linear from the first height
    assert_eq!(ltsh, vec![0, 0, 0, 3, 1, 1, 1]);
    assert!(!out.join("VDMX.bin").exists());
    assert!(stdout(&output).contains("not present in the font"));
    fs::remove_dir_all(&dir).unwrap();
}
