// this_file: crates/fontval-cli/src/error.rs

//! Errors the CLI can end with

use std::path::PathBuf;

use fontval::error::FontvalError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Fontval(#[from] FontvalError),

    #[error("Invalid parameter file {}: {source}", path.display())]
    Parameters {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Validation aborted")]
    Aborted,

    #[error("Invalid table tag '{0}'")]
    BadTag(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
