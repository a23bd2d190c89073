// this_file: crates/fontval-cli/src/commands/validate.rs

//! Validate command implementation
//!
//! Builds the validator parameters from the parameter file and the
//! command line, then runs the batch through the driver.

use std::fs;
use std::path::Path;

use fontval::prelude::*;
use fontval::sfnt::parse_tag;

use crate::checksum::ChecksumValidator;
use crate::cli::ValidateArgs;
use crate::console::ConsoleCallbacks;
use crate::error::{CliError, Result};
use crate::report_xml::XmlReportWriter;

pub fn run(args: &ValidateArgs, quiet: bool) -> Result<RunSummary> {
    let params = parameters(args)?;
    let destination = destination(args);
    let kind: BackendKind = args.backend.parse()?;
    log::debug!("Destination {destination:?}, backend {kind}");

    let mut backend = fontval::create_backend(kind)?;
    let mut writer = XmlReportWriter;
    let validator = ChecksumValidator;
    let mut console = ConsoleCallbacks::new(!quiet && !args.report_stdout, args.report_stdout);

    let summary = ValidationRunDriver::new(backend.as_mut(), &mut writer, params, destination)
        .with_validator(&validator)
        .run(&args.files, &mut console)
        .map_err(|e| {
            // Already printed through on_exception
            log::debug!("Run did not start: {e}");
            CliError::Aborted
        })?;

    if !quiet && !args.report_stdout {
        println!(
            "{} font(s) tested, {} failed, {} table(s) failed, {} raster anomalies",
            summary.fonts_tested, summary.fonts_failed, summary.tables_failed, summary.raster_errors
        );
    }
    Ok(summary)
}

/// Parameter file first, then the command-line switches on top
fn parameters(args: &ValidateArgs) -> Result<ValidatorParameters> {
    let mut params = match &args.test_parms {
        Some(path) => load_parameters(path)?,
        None => ValidatorParameters::default(),
    };

    if args.all_tables {
        params.set_all_tables();
    }
    if args.only_tables {
        params.clear_tables();
    }
    if args.no_raster_tests {
        params.set_raster_testing(false);
    }
    if args.dev_metrics {
        params.dev_metrics.hdmx = true;
        params.dev_metrics.ltsh = true;
        params.dev_metrics.vdmx = true;
    }

    for entry in &args.tables {
        apply_table(&mut params, entry)?;
    }
    Ok(params)
}

fn load_parameters(path: &Path) -> Result<ValidatorParameters> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|source| CliError::Parameters {
        path: path.to_path_buf(),
        source,
    })
}

/// `+tag` or a bare tag adds, `-tag` removes
fn apply_table(params: &mut ValidatorParameters, entry: &str) -> Result<()> {
    let (remove, name) = match entry.as_bytes().first() {
        Some(b'-') => (true, &entry[1..]),
        Some(b'+') => (false, &entry[1..]),
        _ => (false, entry),
    };
    let tag = parse_tag(name).ok_or_else(|| CliError::BadTag(entry.to_string()))?;

    if remove {
        if params.remove_table(tag) == 0 {
            return Err(CliError::BadTag(format!("{name} (not in the table list)")));
        }
    } else if params.tests_all_tables() {
        log::debug!("{tag} is already covered by all tables");
    } else {
        params.add_table(tag);
    }
    Ok(())
}

fn destination(args: &ValidateArgs) -> ReportDestination {
    if args.report_stdout || args.temporary_reports {
        ReportDestination::Temporary
    } else if let Some(dir) = &args.report_dir {
        ReportDestination::FixedDir(dir.clone())
    } else if args.report_in_font_dir {
        ReportDestination::SameDirAsFont
    } else {
        ReportDestination::UserDesktop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use fontval::types::Tag;

    fn validate_args(extra: &[&str]) -> ValidateArgs {
        let mut argv = vec!["fontval", "validate", "-f", "a.ttf"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Validate(args) => args,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_removing_from_all_tables() {
        let params = parameters(&validate_args(&["--table", "-glyf"])).unwrap();
        let tables = params.tables.unwrap();
        assert!(!tables.contains(&Tag::new(b"glyf")));
        assert!(tables.contains(&Tag::new(b"head")));
    }

    #[test]
    fn test_only_tables_then_add() {
        let params =
            parameters(&validate_args(&["--only-tables", "-t", "+head", "-t", "cvt"])).unwrap();
        assert_eq!(
            params.tables,
            Some(vec![Tag::new(b"head"), Tag::new(b"cvt ")])
        );
    }

    #[test]
    fn test_removing_unknown_table_fails() {
        let err = parameters(&validate_args(&["--only-tables", "-t", "-head"])).unwrap_err();
        assert!(matches!(err, CliError::BadTag(_)));
    }

    #[test]
    fn test_adding_to_all_tables_is_a_no_op() {
        let params = parameters(&validate_args(&["-t", "+head"])).unwrap();
        assert!(params.tests_all_tables());
    }

    #[test]
    fn test_report_stdout_uses_temporary_reports() {
        let args = validate_args(&["--report-stdout", "--report-dir", "/tmp"]);
        assert_eq!(destination(&args), ReportDestination::Temporary);
        assert_eq!(
            destination(&validate_args(&[])),
            ReportDestination::UserDesktop
        );
    }

    #[test]
    fn test_flags_override_parameter_file() {
        let path = std::env::temp_dir().join(format!("fontval_parms_{}.json", std::process::id()));
        fs::write(
            &path,
            r#"{ "raster_testing": true, "tables": ["head", "OS/2"] }"#,
        )
        .unwrap();
        let args = validate_args(&[
            "--test-parms",
            path.to_str().unwrap(),
            "--no-raster-tests",
        ]);
        let params = parameters(&args).unwrap();
        fs::remove_file(&path).unwrap();

        assert!(!params.raster_testing);
        assert_eq!(params.tables, Some(vec![Tag::new(b"head"), Tag::new(b"OS/2")]));
    }
}
