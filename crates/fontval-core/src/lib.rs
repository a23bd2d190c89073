// this_file: crates/fontval-core/src/lib.rs

//! Fontval Core: rasterization consistency checks for sfnt fonts
//!
//! Fonts go in, reports come out. Between the two sit a rasterizer that
//! scales every glyph at every requested size, a synthesizer that turns
//! those measurements into `hdmx`, `LTSH` and `VDMX` tables, and a driver
//! that walks a batch of fonts while telling the caller what it is doing.
//!
//! ## The Run
//!
//! For every font in the batch the driver:
//!
//! 1. **Opens** each face on the active [`RasterBackend`]
//! 2. **Raster-tests** it under the configured sizes and modes
//! 3. **Synthesizes** device metrics when requested
//! 4. **Table-tests** it through a [`TableValidator`]
//! 5. **Reports** by handing the collected results to a [`ReportWriter`]
//!
//! Each step is announced through [`DriverCallbacks`], which is the only
//! protocol a front end needs to implement.
//!
//! ## The Traits That Power Everything
//!
//! - [`RasterBackend`] - one capability set, several engines
//! - [`TableValidator`] - per-table structural checks
//! - [`ReportWriter`] - turns a [`driver::FontReport`] into bytes
//! - [`DriverCallbacks`] - lifecycle events for CLI, GUI or tests

pub mod cancel;
pub mod devmetrics;
pub mod driver;
pub mod error;
#[cfg(feature = "outline")]
pub mod outline;
pub mod params;
pub mod report;
pub mod sfnt;
pub mod tables;
pub mod traits;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cancel::{CancelHandle, CancellationToken};
pub use devmetrics::{synthesize, DevMetricsRequest, DevMetricsResult};
pub use driver::{DriverCallbacks, RunState, RunSummary, ValidationRunDriver};
pub use error::{FontvalError, Result};
pub use params::ValidatorParameters;
pub use report::ReportDestination;
pub use traits::{RasterBackend, ReportWriter, TableValidator};

use bitflags::bitflags;

/// The data structures shared by backends, synthesizer and driver
pub mod types {
    pub use read_fonts::types::Tag;

    /// Zero-based index of a glyph within a face
    pub type GlyphId = u32;

    /// Font bounding box from `head`, in design units
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct DesignBounds {
        pub x_min: f32,
        pub y_min: f32,
        pub x_max: f32,
        pub y_max: f32,
    }

    /// What a backend knows about the face it currently holds
    #[derive(Debug, Clone, PartialEq)]
    pub struct FaceInfo {
        pub face_index: u32,
        pub num_glyphs: u16,
        pub units_per_em: u16,
        /// False for bitmap-only faces
        pub scalable: bool,
        /// Available strike ppems, ascending
        pub fixed_sizes: Vec<u16>,
        pub bounds: Option<DesignBounds>,
    }

    impl FaceInfo {
        /// Whether `set_pixel_size(x, y)` can succeed on this face
        pub fn supports_pixel_size(&self, x: u16, y: u16) -> bool {
            self.scalable || (x == y && self.fixed_sizes.contains(&y))
        }

        pub fn check_glyph(&self, glyph_id: GlyphId) -> crate::Result<()> {
            if glyph_id < self.num_glyphs as u32 {
                Ok(())
            } else {
                Err(crate::error::RasterError::GlyphOutOfRange(glyph_id).into())
            }
        }
    }

    /// Vertical extent of one rasterized glyph, in whole pixels
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GlyphExtents {
        pub y_max: i16,
        pub y_min: i16,
    }

    /// One rasterization anomaly: informational, never fatal
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Anomaly {
        pub name: String,
        pub details: String,
    }
}

bitflags! {
    /// Rendering modes a raster test runs under
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct RenderModes: u8 {
        const BLACK_AND_WHITE = 1 << 0;
        const GRAYSCALE = 1 << 1;
        const CLEARTYPE = 1 << 2;
    }
}

bitflags! {
    /// ClearType sub-flags, meaningful only with [`RenderModes::CLEARTYPE`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct ClearTypeFlags: u32 {
        const COMPATIBLE_WIDTHS = 1 << 0;
        const BGR = 1 << 1;
        const VERTICAL = 1 << 2;
        const FRACTIONAL = 1 << 3;
    }
}

/// Geometric transform applied to outlines during a raster test
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Transform {
    pub stretch_x: f32,
    pub stretch_y: f32,
    /// Counter-clockwise, in degrees
    pub rotation: f32,
    /// Horizontal shear, in degrees
    pub skew: f32,
    /// Row-major 2×2 matrix applied last
    pub matrix: [[f32; 2]; 2],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            stretch_x: 1.0,
            stretch_y: 1.0,
            rotation: 0.0,
            skew: 0.0,
            matrix: [[1.0, 0.0], [0.0, 1.0]],
        }
    }
}

impl Transform {
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    /// Affine coefficients `[a, b, c, d, e, f]` where
    /// `x' = a·x + c·y + e` and `y' = b·x + d·y + f`
    ///
    /// Composition order: stretch, then skew, then rotation, then matrix.
    pub fn coefficients(&self) -> [f64; 6] {
        let stretch = [
            [self.stretch_x as f64, 0.0],
            [0.0, self.stretch_y as f64],
        ];
        let skew = [[1.0, (self.skew as f64).to_radians().tan()], [0.0, 1.0]];
        let (sin, cos) = (self.rotation as f64).to_radians().sin_cos();
        let rotation = [[cos, -sin], [sin, cos]];
        let matrix = [
            [self.matrix[0][0] as f64, self.matrix[0][1] as f64],
            [self.matrix[1][0] as f64, self.matrix[1][1] as f64],
        ];

        let m = mul2(matrix, mul2(rotation, mul2(skew, stretch)));
        [m[0][0], m[1][0], m[0][1], m[1][1], 0.0, 0.0]
    }
}

fn mul2(a: [[f64; 2]; 2], b: [[f64; 2]; 2]) -> [[f64; 2]; 2] {
    [
        [
            a[0][0] * b[0][0] + a[0][1] * b[1][0],
            a[0][0] * b[0][1] + a[0][1] * b[1][1],
        ],
        [
            a[1][0] * b[0][0] + a[1][1] * b[1][0],
            a[1][0] * b[0][1] + a[1][1] * b[1][1],
        ],
    ]
}

/// How a raster test should run; fixed for the duration of a run
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RasterRunConfig {
    /// Device resolution in dots per inch
    pub resolution_x: u16,
    pub resolution_y: u16,
    /// Point sizes, tested in the given order
    pub point_sizes: Vec<u16>,
    pub transform: Transform,
    pub modes: RenderModes,
    pub cleartype_flags: ClearTypeFlags,
}

impl Default for RasterRunConfig {
    fn default() -> Self {
        Self {
            resolution_x: 96,
            resolution_y: 96,
            point_sizes: (4..=72).collect(),
            transform: Transform::default(),
            modes: RenderModes::all(),
            cleartype_flags: ClearTypeFlags::empty(),
        }
    }
}

impl RasterRunConfig {
    /// Reject configurations that cannot produce a meaningful run
    pub fn validate(&self) -> Result<()> {
        if self.modes.is_empty() {
            return Err(FontvalError::ConfigError(
                "at least one rendering mode must be set".into(),
            ));
        }
        if self.resolution_x == 0 || self.resolution_y == 0 {
            return Err(FontvalError::ConfigError(format!(
                "invalid resolution {}x{}",
                self.resolution_x, self.resolution_y
            )));
        }
        if self.point_sizes.contains(&0) {
            return Err(FontvalError::ConfigError("point sizes must be positive".into()));
        }
        Ok(())
    }

    /// Pixels per em along x and y for a point size at this resolution
    pub fn ppem(&self, point_size: u16) -> (f32, f32) {
        let points = point_size as f32;
        (
            points * self.resolution_x as f32 / 72.0,
            points * self.resolution_y as f32 / 72.0,
        )
    }
}
