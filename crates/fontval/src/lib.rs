// this_file: crates/fontval/src/lib.rs

//! fontval - rasterization consistency checks for OpenType fonts
//!
//! This crate bundles the core with whichever rasterization backends were
//! compiled in and picks one at runtime by [`BackendKind`].
//!
//! # Example
//!
//! ```ignore
//! use fontval::prelude::*;
//!
//! let mut backend = fontval::create_backend(BackendKind::Hinted)?;
//! let mut writer = MyWriter::default();
//! let mut driver = ValidationRunDriver::new(
//!     backend.as_mut(),
//!     &mut writer,
//!     ValidatorParameters::default(),
//!     ReportDestination::Temporary,
//! );
//! let summary = driver.run(&fonts, &mut callbacks)?;
//! ```
//!
//! # Feature Flags
//!
//! - `raster-hinted`: skrifa outlines run through the font's hinting (default)
//! - `raster-linear`: purely linear scaling, the reference (default)
//! - `serde`: serialization of parameters and results

use std::fmt;
use std::str::FromStr;

pub use fontval_core::{
    cancel, devmetrics, driver, error, params, report, sfnt, tables, traits, types,
    ClearTypeFlags, RasterRunConfig, RenderModes, Transform,
};

use fontval_core::{error::Result, FontvalError, RasterBackend};

#[cfg(feature = "raster-hinted")]
pub use fontval_raster_hinted as raster_hinted;

#[cfg(feature = "raster-linear")]
pub use fontval_raster_linear as raster_linear;

/// The rasterization engines a run can use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendKind {
    /// Hinted outlines, what a screen shows
    #[default]
    Hinted,
    /// Linearly scaled outlines, the reference
    Linear,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::Hinted, BackendKind::Linear];

    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Hinted => "hinted",
            BackendKind::Linear => "linear",
        }
    }

    /// Whether this binary was built with the backend
    pub fn is_available(self) -> bool {
        match self {
            BackendKind::Hinted => cfg!(feature = "raster-hinted"),
            BackendKind::Linear => cfg!(feature = "raster-linear"),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = FontvalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hinted" | "native" => Ok(BackendKind::Hinted),
            "linear" | "reference" => Ok(BackendKind::Linear),
            other => Err(FontvalError::ConfigError(format!(
                "unknown backend '{other}' (expected hinted or linear)"
            ))),
        }
    }
}

/// Backends compiled into this build, in preference order
pub fn available_backends() -> Vec<BackendKind> {
    BackendKind::ALL
        .into_iter()
        .filter(|kind| kind.is_available())
        .collect()
}

/// Build a fresh backend instance of the given kind
pub fn create_backend(kind: BackendKind) -> Result<Box<dyn RasterBackend>> {
    log::debug!("Creating {kind} backend");
    match kind {
        #[cfg(feature = "raster-hinted")]
        BackendKind::Hinted => Ok(Box::new(fontval_raster_hinted::HintedRasterizer::new())),
        #[cfg(feature = "raster-linear")]
        BackendKind::Linear => Ok(Box::new(fontval_raster_linear::LinearRasterizer::new())),
        #[allow(unreachable_patterns)]
        other => Err(FontvalError::FeatureNotCompiled(format!(
            "raster-{}",
            other.name()
        ))),
    }
}

/// Common imports for typical usage
pub mod prelude {
    pub use crate::BackendKind;
    pub use fontval_core::{
        driver::{FontReport, FaceReport},
        error::{FontvalError, Result},
        CancellationToken, DevMetricsRequest, DevMetricsResult, DriverCallbacks,
        RasterBackend, RasterRunConfig, ReportDestination, ReportWriter, RunSummary,
        TableValidator, ValidationRunDriver, ValidatorParameters,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend_names() {
        assert_eq!("hinted".parse::<BackendKind>().unwrap(), BackendKind::Hinted);
        assert_eq!("Linear".parse::<BackendKind>().unwrap(), BackendKind::Linear);
        assert!(matches!(
            "gdi".parse::<BackendKind>(),
            Err(FontvalError::ConfigError(_))
        ));
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for kind in BackendKind::ALL {
            assert_eq!(kind.to_string().parse::<BackendKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_create_available_backends() {
        for kind in available_backends() {
            let backend = create_backend(kind).unwrap();
            assert_eq!(backend.name(), kind.name());
            assert!(backend.face().is_none());
        }
    }

    #[cfg(not(feature = "raster-linear"))]
    #[test]
    fn test_missing_backend_is_reported() {
        assert!(matches!(
            create_backend(BackendKind::Linear),
            Err(FontvalError::FeatureNotCompiled(_))
        ));
    }
}
