// this_file: backends/fontval-raster-hinted/src/lib.rs

//! Hinted rasterizer: what a screen actually shows
//!
//! Outlines come from skrifa and run through the font's own TrueType
//! instructions (or the autohinter, depending on the rendering mode) at
//! each pixel size. Advance widths are read from the hinted phantom
//! points, vertical extents from the kurbo bounding box of the hinted
//! outline. Bitmap-only faces answer from their strikes.

mod hinting;

pub use hinting::HintProfile;

use std::sync::Arc;

use fontval_core::{
    error::{RasterError, Result},
    outline::{path_extents, LoadedFace, PathPen},
    traits::RasterBackend,
    types::{FaceInfo, GlyphExtents, GlyphId},
    CancellationToken, RasterRunConfig,
};
use hinting::HintCache;
use kurbo::{Affine, BezPath, Rect, Shape};
use skrifa::{
    bitmap::{BitmapStrikes, Origin},
    instance::{LocationRef, Size},
    outline::DrawSettings,
    MetadataProvider,
};

/// Extents may overshoot the font bounding box by this much before it counts
const BBOX_TOLERANCE_PX: f64 = 1.0;

/// Rasterization backend that applies hinting
pub struct HintedRasterizer {
    active: Option<LoadedFace>,
    pixel_size: Option<(u16, u16)>,
    hinting: HintCache,
    raster_cancel: CancellationToken,
    metrics_cancel: CancellationToken,
    errors: u32,
}

impl HintedRasterizer {
    pub fn new() -> Self {
        Self {
            active: None,
            pixel_size: None,
            hinting: HintCache::default(),
            raster_cancel: CancellationToken::new(),
            metrics_cancel: CancellationToken::new(),
            errors: 0,
        }
    }

    /// Keep up to `capacity` hinting instances alive between calls
    pub fn with_cache_capacity(capacity: usize) -> Self {
        Self {
            hinting: HintCache::new(capacity),
            ..Self::new()
        }
    }

    fn active(&self) -> Result<&LoadedFace> {
        self.active
            .as_ref()
            .ok_or_else(|| RasterError::NoActiveFace.into())
    }

    fn selected(&self) -> Result<(&LoadedFace, u16, u16)> {
        let active = self.active()?;
        let (x, y) = self.pixel_size.ok_or(RasterError::NoPixelSize)?;
        Ok((active, x, y))
    }

    /// Draw one glyph hinted at `ppem`, falling back to unhinted when the
    /// hinting instance cannot be built
    fn draw_hinted(
        &mut self,
        glyph_id: GlyphId,
        ppem: f32,
        path: &mut BezPath,
    ) -> Result<Option<f32>> {
        let active = self.active.as_ref().ok_or(RasterError::NoActiveFace)?;
        let font = active.font()?;
        let outlines = font.outline_glyphs();
        let Some(glyph) = outlines.get(skrifa::GlyphId::new(glyph_id)) else {
            return Ok(None);
        };
        let settings = match self.hinting.get(&outlines, ppem, HintProfile::Metrics) {
            Some(instance) => DrawSettings::hinted(instance, false),
            None => DrawSettings::unhinted(Size::new(ppem), LocationRef::default()),
        };
        let metrics = glyph
            .draw(settings, &mut PathPen(path))
            .map_err(|e| RasterError::BackendError(format!("glyph {glyph_id}: {e}")))?;
        Ok(metrics.advance_width)
    }
}

impl Default for HintedRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterBackend for HintedRasterizer {
    fn name(&self) -> &'static str {
        "hinted"
    }

    fn open_face(&mut self, data: Arc<[u8]>, face_index: u32) -> Result<FaceInfo> {
        self.close_face();
        let face = LoadedFace::open(data, face_index)?;
        log::debug!(
            "Opened face {face_index}: {} glyphs, scalable={}, strikes={:?}",
            face.info.num_glyphs,
            face.info.scalable,
            face.info.fixed_sizes
        );
        let info = face.info.clone();
        self.active = Some(face);
        Ok(info)
    }

    fn close_face(&mut self) {
        self.active = None;
        self.pixel_size = None;
        self.hinting.clear();
    }

    fn face(&self) -> Option<&FaceInfo> {
        self.active.as_ref().map(|a| &a.info)
    }

    fn run_raster_test(
        &mut self,
        config: &RasterRunConfig,
        errors: &mut dyn FnMut(&str, &str),
        progress: &mut dyn FnMut(&str),
    ) -> Result<bool> {
        config.validate()?;
        let active = self.active.as_ref().ok_or(RasterError::NoActiveFace)?;
        let font = active.font()?;
        let info = &active.info;
        let outlines = font.outline_glyphs();
        let transform = Affine::new(config.transform.coefficients());
        let profiles = HintProfile::for_modes(config.modes, config.cleartype_flags);

        let mut anomalies = 0u32;
        let mut report = |name: &str, details: String| {
            anomalies += 1;
            errors(name, &details);
        };

        'sizes: for &point in &config.point_sizes {
            if self.raster_cancel.is_cancelled() {
                break;
            }
            let (ppem_x, ppem_y) = config.ppem(point);
            let view = transform * Affine::scale_non_uniform((ppem_x / ppem_y) as f64, 1.0);
            let limit = info.bounds.map(|b| {
                let scale = (ppem_y / info.units_per_em as f32) as f64;
                view.transform_rect_bbox(Rect::new(
                    b.x_min as f64 * scale,
                    b.y_min as f64 * scale,
                    b.x_max as f64 * scale,
                    b.y_max as f64 * scale,
                ))
            });

            for (label, profile) in &profiles {
                progress(&format!("{point} pt ({ppem_y:.1} ppem), {label}"));
                if !info.scalable {
                    if !info.fixed_sizes.contains(&(ppem_y.round() as u16)) {
                        log::debug!("No strike for {ppem_y} ppem");
                    }
                    continue;
                }

                let instance = self.hinting.get(&outlines, ppem_y, *profile);
                if instance.is_none() {
                    report(
                        "hinting_setup_failed",
                        format!("{label} hinting could not be set up at {point} pt"),
                    );
                }

                for gid in 0..info.num_glyphs as u32 {
                    if self.raster_cancel.is_cancelled() {
                        break 'sizes;
                    }
                    let Some(glyph) = outlines.get(skrifa::GlyphId::new(gid)) else {
                        report("missing_outline", format!("glyph {gid} has no outline"));
                        continue;
                    };
                    let settings = match instance {
                        Some(instance) => DrawSettings::hinted(instance, false),
                        None => DrawSettings::unhinted(Size::new(ppem_y), LocationRef::default()),
                    };
                    let mut path = BezPath::new();
                    if let Err(e) = glyph.draw(settings, &mut PathPen(&mut path)) {
                        report(
                            "outline_decode_failed",
                            format!("glyph {gid} at {point} pt, {label}: {e}"),
                        );
                        continue;
                    }
                    if path.elements().is_empty() {
                        continue;
                    }

                    let bbox = (view * path).bounding_box();
                    if !(bbox.x0.is_finite()
                        && bbox.y0.is_finite()
                        && bbox.x1.is_finite()
                        && bbox.y1.is_finite())
                    {
                        report(
                            "non_finite_coordinates",
                            format!("glyph {gid} at {point} pt, {label}"),
                        );
                        continue;
                    }
                    if let Some(limit) = limit {
                        if escapes(bbox, limit) {
                            report(
                                "extent_outside_font_bbox",
                                format!(
                                    "glyph {gid} at {point} pt, {label}: ({:.1}, {:.1})-({:.1}, {:.1})",
                                    bbox.x0, bbox.y0, bbox.x1, bbox.y1
                                ),
                            );
                        }
                    }
                }
            }
        }

        self.errors += anomalies;
        Ok(true)
    }

    fn set_pixel_size(&mut self, x: u16, y: u16) -> Result<()> {
        let info = &self.active()?.info;
        if x == 0 || y == 0 {
            return Err(RasterError::BackendError(format!("invalid pixel size {x}x{y}")).into());
        }
        if !info.supports_pixel_size(x, y) {
            return Err(RasterError::UnsupportedFixedSize { x, y }.into());
        }
        self.pixel_size = Some((x, y));
        Ok(())
    }

    fn pixel_size(&self) -> Option<(u16, u16)> {
        self.pixel_size
    }

    fn glyph_advance(&mut self, glyph_id: GlyphId) -> Result<f32> {
        let (active, x, _) = self.selected()?;
        active.info.check_glyph(glyph_id)?;

        if !active.info.scalable {
            let strike_advance = {
                let font = active.font()?;
                BitmapStrikes::new(&font)
                    .glyph_for_size(Size::new(x as f32), skrifa::GlyphId::new(glyph_id))
                    .and_then(|g| g.advance.map(|a| a * x as f32 / g.ppem_x))
            };
            return match strike_advance {
                Some(advance) => Ok(advance),
                None => self.linear_advance(glyph_id),
            };
        }

        let mut path = BezPath::new();
        match self.draw_hinted(glyph_id, x as f32, &mut path) {
            Ok(Some(advance)) => Ok(advance),
            Ok(None) => self.linear_advance(glyph_id),
            Err(e) => {
                log::debug!("Hinted advance unavailable, using linear: {e}");
                self.linear_advance(glyph_id)
            }
        }
    }

    fn linear_advance(&mut self, glyph_id: GlyphId) -> Result<f32> {
        let (active, x, _) = self.selected()?;
        active.info.check_glyph(glyph_id)?;
        let font = active.font()?;
        Ok(font
            .glyph_metrics(Size::new(x as f32), LocationRef::default())
            .advance_width(skrifa::GlyphId::new(glyph_id))
            .unwrap_or(0.0))
    }

    fn glyph_extents(&mut self, glyph_id: GlyphId) -> Result<Option<GlyphExtents>> {
        let (active, _, y) = self.selected()?;
        active.info.check_glyph(glyph_id)?;

        if !active.info.scalable {
            let font = active.font()?;
            let strikes = BitmapStrikes::new(&font);
            let extents = strikes
                .glyph_for_size(Size::new(y as f32), skrifa::GlyphId::new(glyph_id))
                .filter(|g| g.height > 0)
                .map(|g| {
                    let scale = y as f32 / g.ppem_y;
                    let height = g.height as f32 * scale;
                    let top = match g.placement_origin {
                        Origin::TopLeft => (g.bearing_y - g.inner_bearing_y) * scale,
                        Origin::BottomLeft => (g.bearing_y - g.inner_bearing_y) * scale + height,
                    };
                    GlyphExtents {
                        y_max: top.ceil() as i16,
                        y_min: (top - height).floor() as i16,
                    }
                });
            return Ok(extents);
        }

        let mut path = BezPath::new();
        self.draw_hinted(glyph_id, y as f32, &mut path)?;
        Ok(path_extents(&path))
    }

    fn raster_cancel_token(&self) -> CancellationToken {
        self.raster_cancel.clone()
    }

    fn metrics_cancel_token(&self) -> CancellationToken {
        self.metrics_cancel.clone()
    }

    fn error_count(&self) -> u32 {
        self.errors
    }

    fn reset_error_count(&mut self) {
        self.errors = 0;
    }
}

fn escapes(bbox: Rect, limit: Rect) -> bool {
    bbox.x0 < limit.x0 - BBOX_TOLERANCE_PX
        || bbox.y0 < limit.y0 - BBOX_TOLERANCE_PX
        || bbox.x1 > limit.x1 + BBOX_TOLERANCE_PX
        || bbox.y1 > limit.y1 + BBOX_TOLERANCE_PX
}
