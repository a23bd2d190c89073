// this_file: crates/fontval-core/src/outline.rs

//! Skrifa glue shared by the outline backends
//!
//! Face loading, the [`FaceInfo`] read at open time, and a pen that turns
//! drawn outlines into kurbo paths.

use std::sync::Arc;

use kurbo::{BezPath, Shape};
use skrifa::{
    bitmap::BitmapStrikes,
    instance::{LocationRef, Size},
    outline::OutlinePen,
    FontRef, MetadataProvider,
};

use crate::{
    error::{FaceOpenError, RasterError, Result},
    sfnt,
    types::{DesignBounds, FaceInfo, GlyphExtents},
};

/// Font bytes held by a backend, plus what was read when the face opened
pub struct LoadedFace {
    pub data: Arc<[u8]>,
    pub info: FaceInfo,
}

impl LoadedFace {
    pub fn open(data: Arc<[u8]>, face_index: u32) -> Result<Self> {
        let info = face_info(&data, face_index)?;
        Ok(Self { data, info })
    }

    /// A fresh view of the face; parsing only reads the table directory
    pub fn font(&self) -> Result<FontRef<'_>> {
        FontRef::from_index(&self.data, self.info.face_index)
            .map_err(|e| RasterError::BackendError(format!("font reparse failed: {e}")).into())
    }
}

/// Read glyph count, units per em, strikes and bounds of one face
pub fn face_info(data: &[u8], face_index: u32) -> Result<FaceInfo> {
    let font = sfnt::open_face(data, face_index)?;
    let metrics = font.metrics(Size::unscaled(), LocationRef::default());
    let scalable = font.outline_glyphs().format().is_some();

    let mut fixed_sizes: Vec<u16> = BitmapStrikes::new(&font)
        .iter()
        .map(|strike| strike.ppem().round() as u16)
        .collect();
    fixed_sizes.sort_unstable();
    fixed_sizes.dedup();

    if !scalable && fixed_sizes.is_empty() {
        return Err(FaceOpenError::NoGlyphData.into());
    }

    Ok(FaceInfo {
        face_index,
        num_glyphs: metrics.glyph_count,
        units_per_em: metrics.units_per_em,
        scalable,
        fixed_sizes,
        bounds: metrics.bounds.map(|b| DesignBounds {
            x_min: b.x_min,
            y_min: b.y_min,
            x_max: b.x_max,
            y_max: b.y_max,
        }),
    })
}

/// Whole-pixel vertical extent of a drawn outline
pub fn path_extents(path: &BezPath) -> Option<GlyphExtents> {
    if path.elements().is_empty() {
        return None;
    }
    let bbox = path.bounding_box();
    if !(bbox.y0.is_finite() && bbox.y1.is_finite()) {
        return None;
    }
    Some(GlyphExtents {
        y_max: bbox.y1.ceil() as i16,
        y_min: bbox.y0.floor() as i16,
    })
}

/// Collects skrifa outline commands into a kurbo path, in pixels
pub struct PathPen<'a>(pub &'a mut BezPath);

impl OutlinePen for PathPen<'_> {
    fn move_to(&mut self, x: f32, y: f32) {
        self.0.move_to((x as f64, y as f64));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.0.line_to((x as f64, y as f64));
    }

    fn quad_to(&mut self, cx0: f32, cy0: f32, x: f32, y: f32) {
        self.0.quad_to((cx0 as f64, cy0 as f64), (x as f64, y as f64));
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        self.0.curve_to(
            (cx0 as f64, cy0 as f64),
            (cx1 as f64, cy1 as f64),
            (x as f64, y as f64),
        );
    }

    fn close(&mut self) {
        self.0.close_path();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bitmap_only_font, simple_font, SfntBuilder, TestGlyph};

    #[test]
    fn pen_collects_segments() {
        let mut path = BezPath::new();
        let mut pen = PathPen(&mut path);
        pen.move_to(0.0, 0.0);
        pen.line_to(1.0, 0.0);
        pen.quad_to(1.0, 1.0, 0.0, 1.0);
        pen.close();
        assert_eq!(path.elements().len(), 4);
    }

    #[test]
    fn empty_path_has_no_extents() {
        assert_eq!(path_extents(&BezPath::new()), None);
    }

    #[test]
    fn extents_round_outward() {
        let mut path = BezPath::new();
        path.move_to((0.0, -2.2));
        path.line_to((4.0, 7.1));
        path.close_path();
        assert_eq!(
            path_extents(&path),
            Some(GlyphExtents {
                y_max: 8,
                y_min: -3,
            })
        );
    }

    #[test]
    fn outline_face_is_scalable() {
        let glyphs = [TestGlyph::empty(500), TestGlyph::rect(600, 50, -100, 550, 700)];
        let face = LoadedFace::open(simple_font(1000, &glyphs).into(), 0).unwrap();
        assert!(face.info.scalable);
        assert_eq!(face.info.num_glyphs, 2);
        assert_eq!(face.info.units_per_em, 1000);
        assert!(face.font().is_ok());
    }

    #[test]
    fn bitmap_face_lists_strikes() {
        let info = face_info(&bitmap_only_font(1000, &[500, 500], &[12, 16]), 0).unwrap();
        assert!(!info.scalable);
        assert_eq!(info.fixed_sizes, vec![12, 16]);
    }

    #[test]
    fn face_without_glyph_data_is_rejected() {
        let data = SfntBuilder::new().table(*b"head", vec![0; 54]).build();
        assert!(face_info(&data, 0).is_err());
    }
}
