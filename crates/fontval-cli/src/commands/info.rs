// this_file: crates/fontval-cli/src/commands/info.rs

//! Info command implementation
//!
//! Displays the version, compiled backends and known tables.

use fontval::params::KNOWN_TABLES;
use fontval::{available_backends, BackendKind};

use crate::cli::InfoArgs;

pub fn run(args: &InfoArgs) {
    let show_all = !args.backends && !args.tables;

    println!("fontval v{}", env!("CARGO_PKG_VERSION"));
    println!();

    if show_all || args.backends {
        print_backends();
        if show_all {
            println!();
        }
    }

    if show_all || args.tables {
        print_tables();
    }
}

fn print_backends() {
    println!("Backends:");
    let compiled = available_backends();
    for kind in BackendKind::ALL {
        let description = match kind {
            BackendKind::Hinted => "skrifa outlines with TrueType or auto hinting",
            BackendKind::Linear => "linear scaling of design metrics (reference)",
        };
        if compiled.contains(&kind) {
            println!("  {:<8} - {description}", kind.name());
        } else {
            println!("  {:<8} - not compiled", kind.name());
        }
    }
}

fn print_tables() {
    println!("Valid table names (note the space after \"CFF \" and \"cvt \"):");
    println!("  {}", KNOWN_TABLES.join(","));
}
