// this_file: crates/fontval-cli/src/commands/mod.rs

//! Subcommand implementations

pub mod devmetrics;
pub mod info;
pub mod validate;
