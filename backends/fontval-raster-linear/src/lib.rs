// this_file: backends/fontval-raster-linear/src/lib.rs

//! Linear rasterizer: outlines scaled without any grid fitting
//!
//! This is the reference the hinted backend is measured against. Advances
//! and extents come straight from the design metrics multiplied by
//! `ppem / units_per_em`, so every answer is exactly what a linearly
//! scaling renderer would produce.

use std::sync::Arc;

use fontval_core::{
    error::{RasterError, Result},
    outline::{LoadedFace, PathPen},
    traits::RasterBackend,
    types::{FaceInfo, GlyphExtents, GlyphId},
    CancellationToken, RasterRunConfig,
};
use kurbo::{Affine, BezPath, Shape};
use skrifa::{
    instance::{LocationRef, Size},
    outline::DrawSettings,
    FontRef, MetadataProvider,
};

/// Rasterization backend without hinting
pub struct LinearRasterizer {
    active: Option<LoadedFace>,
    pixel_size: Option<(u16, u16)>,
    raster_cancel: CancellationToken,
    metrics_cancel: CancellationToken,
    errors: u32,
}

impl LinearRasterizer {
    pub fn new() -> Self {
        Self {
            active: None,
            pixel_size: None,
            raster_cancel: CancellationToken::new(),
            metrics_cancel: CancellationToken::new(),
            errors: 0,
        }
    }

    fn selected(&self) -> Result<(FontRef<'_>, &FaceInfo, u16, u16)> {
        let active = self.active.as_ref().ok_or(RasterError::NoActiveFace)?;
        let (x, y) = self.pixel_size.ok_or(RasterError::NoPixelSize)?;
        Ok((active.font()?, &active.info, x, y))
    }
}

impl Default for LinearRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterBackend for LinearRasterizer {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn open_face(&mut self, data: Arc<[u8]>, face_index: u32) -> Result<FaceInfo> {
        self.close_face();
        let face = LoadedFace::open(data, face_index)?;
        log::debug!(
            "Opened face {face_index}: {} glyphs at {} upem",
            face.info.num_glyphs,
            face.info.units_per_em
        );
        let info = face.info.clone();
        self.active = Some(face);
        Ok(info)
    }

    fn close_face(&mut self) {
        self.active = None;
        self.pixel_size = None;
    }

    fn face(&self) -> Option<&FaceInfo> {
        self.active.as_ref().map(|a| &a.info)
    }

    /// Only checks that every outline decodes to finite coordinates; with no
    /// hinting there is nothing else to go wrong
    fn run_raster_test(
        &mut self,
        config: &RasterRunConfig,
        errors: &mut dyn FnMut(&str, &str),
        progress: &mut dyn FnMut(&str),
    ) -> Result<bool> {
        config.validate()?;
        let active = self.active.as_ref().ok_or(RasterError::NoActiveFace)?;
        let font = active.font()?;
        let outlines = font.outline_glyphs();
        let transform = Affine::new(config.transform.coefficients());

        if !active.info.scalable {
            log::info!("Bitmap-only face, nothing to scale");
            return Ok(true);
        }

        let mut anomalies = 0u32;
        'sizes: for &point in &config.point_sizes {
            if self.raster_cancel.is_cancelled() {
                break;
            }
            let (ppem_x, ppem_y) = config.ppem(point);
            progress(&format!("{point} pt ({ppem_y:.1} ppem), unhinted"));
            let view = transform * Affine::scale_non_uniform((ppem_x / ppem_y) as f64, 1.0);

            for gid in 0..active.info.num_glyphs as u32 {
                if self.raster_cancel.is_cancelled() {
                    break 'sizes;
                }
                let Some(glyph) = outlines.get(skrifa::GlyphId::new(gid)) else {
                    anomalies += 1;
                    errors("missing_outline", &format!("glyph {gid} has no outline"));
                    continue;
                };
                let mut path = BezPath::new();
                let settings = DrawSettings::unhinted(Size::new(ppem_y), LocationRef::default());
                if let Err(e) = glyph.draw(settings, &mut PathPen(&mut path)) {
                    anomalies += 1;
                    errors(
                        "outline_decode_failed",
                        &format!("glyph {gid} at {point} pt: {e}"),
                    );
                    continue;
                }
                if path.elements().is_empty() {
                    continue;
                }
                let bbox = (view * path).bounding_box();
                if ![bbox.x0, bbox.y0, bbox.x1, bbox.y1]
                    .iter()
                    .all(|v| v.is_finite())
                {
                    anomalies += 1;
                    errors("non_finite_coordinates", &format!("glyph {gid} at {point} pt"));
                }
            }
        }

        self.errors += anomalies;
        Ok(true)
    }

    fn set_pixel_size(&mut self, x: u16, y: u16) -> Result<()> {
        let info = &self.active.as_ref().ok_or(RasterError::NoActiveFace)?.info;
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
        self.linear_advance(glyph_id)
    }

    fn linear_advance(&mut self, glyph_id: GlyphId) -> Result<f32> {
        let (font, info, x, _) = self.selected()?;
        info.check_glyph(glyph_id)?;
        Ok(font
            .glyph_metrics(Size::new(x as f32), LocationRef::default())
            .advance_width(skrifa::GlyphId::new(glyph_id))
            .unwrap_or(0.0))
    }

    fn glyph_extents(&mut self, glyph_id: GlyphId) -> Result<Option<GlyphExtents>> {
        let (font, info, _, y) = self.selected()?;
        info.check_glyph(glyph_id)?;
        if !info.scalable {
            return Ok(None);
        }
        let bounds = font
            .glyph_metrics(Size::new(y as f32), LocationRef::default())
            .bounds(skrifa::GlyphId::new(glyph_id));
        Ok(bounds
            .filter(|b| b.y_max > b.y_min || b.x_max > b.x_min)
            .map(|b| GlyphExtents {
                y_max: b.y_max.ceil() as i16,
                y_min: b.y_min.floor() as i16,
            }))
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name() {
        assert_eq!(LinearRasterizer::default().name(), "linear");
    }
}
