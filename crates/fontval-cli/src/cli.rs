// this_file: crates/fontval-cli/src/cli.rs

//! CLI argument definitions using Clap v4

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// fontval - font table and rasterization consistency checks
#[derive(Parser, Debug)]
#[command(name = "fontval")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Debug-level logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Only print errors and the final summary
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate fonts and write one report per font
    #[command(alias = "v")]
    Validate(ValidateArgs),

    /// Synthesize hdmx, LTSH and VDMX for one font
    #[command(alias = "dm")]
    Devmetrics(DevmetricsArgs),

    /// Display version, compiled backends and known tables
    #[command(alias = "i")]
    Info(InfoArgs),
}

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Font files to validate (.ttf, .otf, .ttc)
    #[arg(short = 'f', long = "file", required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// Add (+tag) or remove (-tag) a table; a bare tag adds it
    ///
    /// Examples:
    ///   --table -glyf --table -loca   Skip the two largest tables
    ///   --only-tables --table +head   Test nothing but head
    #[arg(
        short = 't',
        long = "table",
        action = ArgAction::Append,
        allow_hyphen_values = true,
        verbatim_doc_comment
    )]
    pub tables: Vec<String>,

    /// Test every table the font carries (default)
    #[arg(long, conflicts_with = "only_tables")]
    pub all_tables: bool,

    /// Start from an empty table list; use with --table +tag
    #[arg(long)]
    pub only_tables: bool,

    /// Skip the raster tests
    #[arg(long)]
    pub no_raster_tests: bool,

    /// Also synthesize hdmx, LTSH and VDMX and compare them with the font
    #[arg(long)]
    pub dev_metrics: bool,

    /// Write reports into this directory
    #[arg(long, group = "destination")]
    pub report_dir: Option<PathBuf>,

    /// Write each report next to its font
    #[arg(long, group = "destination")]
    pub report_in_font_dir: bool,

    /// Write reports to the temp area and delete them when done
    #[arg(long, group = "destination")]
    pub temporary_reports: bool,

    /// Print each report to stdout after it is written
    #[arg(long)]
    pub report_stdout: bool,

    /// JSON file with validator parameters
    #[arg(long = "test-parms", value_name = "FILE")]
    pub test_parms: Option<PathBuf>,

    /// Rasterization backend: hinted, linear
    #[arg(short = 'b', long, default_value = "hinted")]
    pub backend: String,
}

/// Arguments for the devmetrics command
#[derive(Args, Debug)]
pub struct DevmetricsArgs {
    /// Font file
    pub font: PathBuf,

    /// Face index for collections
    #[arg(short = 'y', long = "face-index", default_value = "0")]
    pub face_index: u32,

    /// Synthesize hdmx
    #[arg(long)]
    pub hdmx: bool,

    /// Synthesize LTSH
    #[arg(long)]
    pub ltsh: bool,

    /// Synthesize VDMX
    #[arg(long)]
    pub vdmx: bool,

    /// Directory for hdmx.bin, LTSH.bin and VDMX.bin
    #[arg(short = 'o', long = "out-dir")]
    pub out_dir: Option<PathBuf>,

    /// Rasterization backend: hinted, linear
    #[arg(short = 'b', long, default_value = "hinted")]
    pub backend: String,
}

/// Arguments for the info command
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// List compiled backends only
    #[arg(long)]
    pub backends: bool,

    /// List known table tags only
    #[arg(long)]
    pub tables: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_table_removals_parse() {
        let cli = Cli::parse_from([
            "fontval", "validate", "-f", "a.ttf", "--table", "-glyf", "-t", "+head",
        ]);
        let Commands::Validate(args) = cli.command else {
            panic!("expected validate");
        };
        assert_eq!(args.tables, vec!["-glyf", "+head"]);
        assert_eq!(args.files, vec![PathBuf::from("a.ttf")]);
    }

    #[test]
    fn test_destinations_conflict() {
        let result = Cli::try_parse_from([
            "fontval",
            "validate",
            "-f",
            "a.ttf",
            "--report-in-font-dir",
            "--temporary-reports",
        ]);
        assert!(result.is_err());
    }
}
