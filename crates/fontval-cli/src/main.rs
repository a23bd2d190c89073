// this_file: crates/fontval-cli/src/main.rs

//! fontval CLI: validate fonts, synthesize device metrics, list backends

mod checksum;
mod cli;
mod commands;
mod console;
mod error;
mod report_xml;

use std::process::ExitCode;

use clap::Parser;

use cli::{Cli, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let outcome = match &cli.command {
        Commands::Validate(args) => commands::validate::run(args, cli.quiet)
            .map(|summary| summary.fonts_failed == 0 && !summary.cancelled),
        Commands::Devmetrics(args) => commands::devmetrics::run(args, cli.quiet).map(|_| true),
        Commands::Info(args) => {
            commands::info::run(args);
            Ok(true)
        }
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
