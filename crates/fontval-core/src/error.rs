// this_file: crates/fontval-core/src/error.rs

//! Error types for fontval

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FontvalError>;

/// Main error type for fontval
#[derive(Debug, Error)]
pub enum FontvalError {
    #[error("Feature not compiled: {0}")]
    FeatureNotCompiled(String),

    #[error("Face open failed: {0}")]
    FaceOpen(#[from] FaceOpenError),

    #[error("Rasterization failed: {0}")]
    Raster(#[from] RasterError),

    #[error("Report failed: {0}")]
    Report(#[from] ReportError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Table encoding failed: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl FontvalError {
    /// True when the error is the recoverable "size not in any strike" case
    pub fn is_unsupported_fixed_size(&self) -> bool {
        matches!(self, FontvalError::Raster(RasterError::UnsupportedFixedSize { .. }))
    }
}

/// Face opening errors
#[derive(Debug, Error)]
pub enum FaceOpenError {
    #[error("face index {index} out of range (file holds {count} faces)")]
    IndexOutOfRange { index: u32, count: u32 },

    #[error("not a recognized sfnt structure")]
    InvalidData,

    #[error("face has neither outlines nor bitmap strikes")]
    NoGlyphData,
}

/// Rasterizer errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RasterError {
    #[error("No active face")]
    NoActiveFace,

    #[error("No pixel size selected")]
    NoPixelSize,

    #[error("Fixed pixel size {x}x{y} not available on a non-scalable face")]
    UnsupportedFixedSize { x: u16, y: u16 },

    #[error("Glyph {0} out of range")]
    GlyphOutOfRange(u32),

    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Report destination and post-processing errors
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Report directory {} is not writable: {source}", path.display())]
    DirectoryWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Report transform failed: {0}")]
    Transform(String),

    #[error("No report destination available: {0}")]
    NoDestination(String),
}
