// this_file: crates/fontval-core/src/testing.rs

//! Synthetic sfnt fonts for test suites
//!
//! Enough structure for read-fonts and skrifa to parse: a sorted table
//! directory, `head`/`hhea`/`maxp`/`hmtx`, and either rectangular TrueType
//! outlines or empty color-bitmap strikes. [`StubBackend`] stands in for a
//! real rasterizer where exact metrics matter more than real rendering.

use std::sync::Arc;

use crate::{
    cancel::CancellationToken,
    error::{RasterError, Result},
    sfnt,
    traits::RasterBackend,
    types::{FaceInfo, GlyphExtents, GlyphId},
    RasterRunConfig,
};

/// Assembles a single-face sfnt from raw tables
#[derive(Debug, Default)]
pub struct SfntBuilder {
    tables: Vec<([u8; 4], Vec<u8>)>,
}

impl SfntBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, tag: [u8; 4], data: Vec<u8>) -> Self {
        self.tables.push((tag, data));
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        // Lookups binary-search the directory, so it must be sorted
        self.tables.sort_by(|a, b| a.0.cmp(&b.0));

        let num_tables = self.tables.len() as u16;
        let entry_selector = 15 - num_tables.max(1).leading_zeros() as u16;
        let search_range = (1u16 << entry_selector) * 16;
        let range_shift = num_tables * 16 - search_range.min(num_tables * 16);

        let mut out = Vec::new();
        out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
        out.extend_from_slice(&num_tables.to_be_bytes());
        out.extend_from_slice(&search_range.to_be_bytes());
        out.extend_from_slice(&entry_selector.to_be_bytes());
        out.extend_from_slice(&range_shift.to_be_bytes());

        let mut offset = 12 + 16 * self.tables.len() as u32;
        for (tag, data) in &self.tables {
            out.extend_from_slice(tag);
            out.extend_from_slice(&checksum(data).to_be_bytes());
            out.extend_from_slice(&offset.to_be_bytes());
            out.extend_from_slice(&(data.len() as u32).to_be_bytes());
            offset += padded_len(data.len()) as u32;
        }
        for (_, data) in &self.tables {
            out.extend_from_slice(data);
            out.resize(out.len() + padded_len(data.len()) - data.len(), 0);
        }
        out
    }
}

/// Join single-face sfnts into a TrueType collection
pub fn collection(faces: &[Vec<u8>]) -> Vec<u8> {
    let header_len = 12 + 4 * faces.len();
    let mut out = Vec::new();
    out.extend_from_slice(b"ttcf");
    out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    out.extend_from_slice(&(faces.len() as u32).to_be_bytes());

    let mut base = header_len;
    let mut bodies = Vec::new();
    for face in faces {
        out.extend_from_slice(&(base as u32).to_be_bytes());
        let mut body = face.clone();
        let num_tables = u16::from_be_bytes([body[4], body[5]]) as usize;
        for i in 0..num_tables {
            let at = 12 + 16 * i + 8;
            let offset = u32::from_be_bytes([body[at], body[at + 1], body[at + 2], body[at + 3]]);
            body[at..at + 4].copy_from_slice(&(offset + base as u32).to_be_bytes());
        }
        base += body.len();
        bodies.push(body);
    }
    for body in bodies {
        out.extend_from_slice(&body);
    }
    out
}

/// OpenType table checksum: wrapping sum of big-endian u32 words
pub fn checksum(data: &[u8]) -> u32 {
    data.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}

fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}

/// One glyph of a synthetic font
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestGlyph {
    pub advance: u16,
    /// Rectangle `(x_min, y_min, x_max, y_max)` in design units
    pub rect: Option<(i16, i16, i16, i16)>,
}

impl TestGlyph {
    pub fn empty(advance: u16) -> Self {
        Self {
            advance,
            rect: None,
        }
    }

    pub fn rect(advance: u16, x_min: i16, y_min: i16, x_max: i16, y_max: i16) -> Self {
        Self {
            advance,
            rect: Some((x_min, y_min, x_max, y_max)),
        }
    }
}

/// A TrueType font with rectangular (or empty) glyphs
pub fn simple_font(units_per_em: u16, glyphs: &[TestGlyph]) -> Vec<u8> {
    let mut glyf = Vec::new();
    let mut loca = Vec::new();
    for glyph in glyphs {
        loca.extend_from_slice(&(glyf.len() as u32).to_be_bytes());
        if let Some(rect) = glyph.rect {
            glyf.extend_from_slice(&rect_glyph(rect));
        }
    }
    loca.extend_from_slice(&(glyf.len() as u32).to_be_bytes());

    let bounds = font_bounds(glyphs);
    SfntBuilder::new()
        .table(*b"head", head(units_per_em, bounds))
        .table(*b"hhea", hhea(glyphs, bounds))
        .table(*b"maxp", maxp(glyphs.len() as u16, true))
        .table(*b"hmtx", hmtx(glyphs))
        .table(*b"loca", loca)
        .table(*b"glyf", glyf)
        .build()
}

/// A bitmap-only font with empty color strikes at the given ppems
pub fn bitmap_only_font(units_per_em: u16, advances: &[u16], strike_ppems: &[u8]) -> Vec<u8> {
    let glyphs: Vec<TestGlyph> = advances.iter().map(|&a| TestGlyph::empty(a)).collect();
    let bounds = (0, 0, 0, 0);

    let mut cblc = Vec::new();
    cblc.extend_from_slice(&3u16.to_be_bytes());
    cblc.extend_from_slice(&0u16.to_be_bytes());
    cblc.extend_from_slice(&(strike_ppems.len() as u32).to_be_bytes());
    for &ppem in strike_ppems {
        // indexSubTableArrayOffset, indexTablesSize, numberOfIndexSubTables, colorRef
        cblc.extend_from_slice(&[0u8; 16]);
        // hori and vert SbitLineMetrics
        cblc.extend_from_slice(&[0u8; 24]);
        cblc.extend_from_slice(&0u16.to_be_bytes());
        cblc.extend_from_slice(&(advances.len().saturating_sub(1) as u16).to_be_bytes());
        cblc.extend_from_slice(&[ppem, ppem, 32, 1]);
    }

    let mut cbdt = Vec::new();
    cbdt.extend_from_slice(&3u16.to_be_bytes());
    cbdt.extend_from_slice(&0u16.to_be_bytes());

    SfntBuilder::new()
        .table(*b"head", head(units_per_em, bounds))
        .table(*b"hhea", hhea(&glyphs, bounds))
        .table(*b"maxp", maxp(glyphs.len() as u16, false))
        .table(*b"hmtx", hmtx(&glyphs))
        .table(*b"CBLC", cblc)
        .table(*b"CBDT", cbdt)
        .build()
}

fn font_bounds(glyphs: &[TestGlyph]) -> (i16, i16, i16, i16) {
    glyphs
        .iter()
        .filter_map(|g| g.rect)
        .reduce(|a, b| (a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3)))
        .unwrap_or((0, 0, 0, 0))
}

fn rect_glyph((x_min, y_min, x_max, y_max): (i16, i16, i16, i16)) -> Vec<u8> {
    let mut out = Vec::new();
    for v in [1i16, x_min, y_min, x_max, y_max] {
        out.extend_from_slice(&v.to_be_bytes());
    }
    // endPtsOfContours, instructionLength
    out.extend_from_slice(&3u16.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    // On-curve points with two-byte signed deltas
    out.extend_from_slice(&[0x01; 4]);
    let (w, h) = (x_max - x_min, y_max - y_min);
    for dx in [x_min, w, 0, -w] {
        out.extend_from_slice(&dx.to_be_bytes());
    }
    for dy in [y_min, 0, h, 0] {
        out.extend_from_slice(&dy.to_be_bytes());
    }
    out
}

fn head(units_per_em: u16, (x_min, y_min, x_max, y_max): (i16, i16, i16, i16)) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    out.extend_from_slice(&0u32.to_be_bytes());
    out.extend_from_slice(&0x5F0F_3CF5u32.to_be_bytes());
    out.extend_from_slice(&0x000Bu16.to_be_bytes());
    out.extend_from_slice(&units_per_em.to_be_bytes());
    out.extend_from_slice(&[0u8; 16]);
    for v in [x_min, y_min, x_max, y_max] {
        out.extend_from_slice(&v.to_be_bytes());
    }
    // macStyle, lowestRecPPEM, fontDirectionHint, indexToLocFormat, glyphDataFormat
    for v in [0i16, 8, 2, 1, 0] {
        out.extend_from_slice(&v.to_be_bytes());
    }
    out
}

fn hhea(glyphs: &[TestGlyph], (_, y_min, x_max, y_max): (i16, i16, i16, i16)) -> Vec<u8> {
    let advance_max = glyphs.iter().map(|g| g.advance).max().unwrap_or(0);
    let mut out = Vec::new();
    out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    for v in [y_max, y_min, 0] {
        out.extend_from_slice(&v.to_be_bytes());
    }
    out.extend_from_slice(&advance_max.to_be_bytes());
    // minLeftSideBearing, minRightSideBearing, xMaxExtent, caretSlopeRise, caretSlopeRun, caretOffset
    for v in [0i16, 0, x_max, 1, 0, 0] {
        out.extend_from_slice(&v.to_be_bytes());
    }
    out.extend_from_slice(&[0u8; 10]);
    out.extend_from_slice(&(glyphs.len() as u16).to_be_bytes());
    out
}

fn maxp(num_glyphs: u16, truetype: bool) -> Vec<u8> {
    let mut out = Vec::new();
    if truetype {
        out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
        out.extend_from_slice(&num_glyphs.to_be_bytes());
        // maxPoints, maxContours, then composite limits, zones, twilight and the rest
        for v in [4u16, 1, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 0] {
            out.extend_from_slice(&v.to_be_bytes());
        }
    } else {
        out.extend_from_slice(&0x0000_5000u32.to_be_bytes());
        out.extend_from_slice(&num_glyphs.to_be_bytes());
    }
    out
}

fn hmtx(glyphs: &[TestGlyph]) -> Vec<u8> {
    let mut out = Vec::new();
    for glyph in glyphs {
        let lsb = glyph.rect.map(|r| r.0).unwrap_or(0);
        out.extend_from_slice(&glyph.advance.to_be_bytes());
        out.extend_from_slice(&lsb.to_be_bytes());
    }
    out
}

/// A scripted [`RasterBackend`] with exact, predictable metrics
///
/// Advances scale linearly unless `linear_from` says otherwise; extents
/// scale the per-glyph design extents. `open_face` checks the sfnt
/// structure but takes everything else from the fields.
#[derive(Debug, Default)]
pub struct StubBackend {
    pub units_per_em: u16,
    /// Design advance per glyph; the glyph count follows this list
    pub advances: Vec<u16>,
    /// Design `(y_max, y_min)` per glyph, `None` for glyphs without ink
    pub extents: Vec<Option<(i16, i16)>>,
    /// Per glyph: `None` never scales linearly, `Some(h)` does from height
    /// `h` up; glyphs past the end of the list are always linear
    pub linear_from: Vec<Option<u16>>,
    /// `Some` makes the face bitmap-only with these strike ppems
    pub fixed_sizes: Option<Vec<u16>>,
    /// Anomalies reported at the first size of every raster test
    pub anomalies_per_run: u32,
    /// Fire the metrics token once this many advances have been measured
    pub cancel_after_advances: Option<usize>,
    /// Fire the metrics token once this many extents have been measured
    pub cancel_after_extents: Option<usize>,
    /// Face indices opened so far
    pub opened: Vec<u32>,
    advance_calls: usize,
    extents_calls: usize,
    size_selections: usize,
    face: Option<FaceInfo>,
    pixel_size: Option<(u16, u16)>,
    raster_cancel: CancellationToken,
    metrics_cancel: CancellationToken,
    errors: u32,
}

impl StubBackend {
    pub fn new(units_per_em: u16, advances: Vec<u16>) -> Self {
        Self {
            units_per_em,
            advances,
            ..Self::default()
        }
    }

    /// Successful `set_pixel_size` calls since construction
    pub fn size_selections(&self) -> usize {
        self.size_selections
    }

    fn pixels(&self) -> Result<(u16, u16)> {
        if self.face.is_none() {
            return Err(RasterError::NoActiveFace.into());
        }
        self.pixel_size.ok_or_else(|| RasterError::NoPixelSize.into())
    }

    fn design_advance(&self, glyph_id: GlyphId) -> Result<f32> {
        self.advances
            .get(glyph_id as usize)
            .map(|&a| a as f32)
            .ok_or_else(|| RasterError::GlyphOutOfRange(glyph_id).into())
    }
}

impl RasterBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn open_face(&mut self, data: Arc<[u8]>, face_index: u32) -> Result<FaceInfo> {
        self.close_face();
        sfnt::open_face(&data, face_index)?;
        let info = FaceInfo {
            face_index,
            num_glyphs: self.advances.len() as u16,
            units_per_em: self.units_per_em,
            scalable: self.fixed_sizes.is_none(),
            fixed_sizes: self.fixed_sizes.clone().unwrap_or_default(),
            bounds: None,
        };
        self.opened.push(face_index);
        self.face = Some(info.clone());
        Ok(info)
    }

    fn close_face(&mut self) {
        self.face = None;
        self.pixel_size = None;
    }

    fn face(&self) -> Option<&FaceInfo> {
        self.face.as_ref()
    }

    fn run_raster_test(
        &mut self,
        config: &RasterRunConfig,
        errors: &mut dyn FnMut(&str, &str),
        progress: &mut dyn FnMut(&str),
    ) -> Result<bool> {
        if self.face.is_none() {
            return Err(RasterError::NoActiveFace.into());
        }
        for (i, size) in config.point_sizes.iter().enumerate() {
            if self.raster_cancel.is_cancelled() {
                break;
            }
            progress(&format!("{size} pt"));
            if i == 0 {
                for n in 0..self.anomalies_per_run {
                    errors("stub_anomaly", &format!("anomaly {n} at {size} pt"));
                    self.errors += 1;
                }
            }
        }
        Ok(true)
    }

    fn set_pixel_size(&mut self, x: u16, y: u16) -> Result<()> {
        let face = self.face.as_ref().ok_or(RasterError::NoActiveFace)?;
        if !face.supports_pixel_size(x, y) {
            return Err(RasterError::UnsupportedFixedSize { x, y }.into());
        }
        self.pixel_size = Some((x, y));
        self.size_selections += 1;
        Ok(())
    }

    fn pixel_size(&self) -> Option<(u16, u16)> {
        self.pixel_size
    }

    fn glyph_advance(&mut self, glyph_id: GlyphId) -> Result<f32> {
        let (_, y) = self.pixels()?;
        let linear = self.linear_advance(glyph_id)?;

        self.advance_calls += 1;
        if self.cancel_after_advances == Some(self.advance_calls) {
            self.metrics_cancel.cancel();
        }

        let hinted_is_linear = match self.linear_from.get(glyph_id as usize) {
            None => true,
            Some(None) => false,
            Some(Some(from)) => y >= *from,
        };
        Ok(if hinted_is_linear { linear } else { linear.round() + 1.0 })
    }

    fn linear_advance(&mut self, glyph_id: GlyphId) -> Result<f32> {
        let (x, _) = self.pixels()?;
        let design = self.design_advance(glyph_id)?;
        Ok(design * x as f32 / self.units_per_em as f32)
    }

    fn glyph_extents(&mut self, glyph_id: GlyphId) -> Result<Option<GlyphExtents>> {
        let (_, y) = self.pixels()?;
        self.design_advance(glyph_id)?;

        self.extents_calls += 1;
        if self.cancel_after_extents == Some(self.extents_calls) {
            self.metrics_cancel.cancel();
        }

        let scale = y as f32 / self.units_per_em as f32;
        Ok(self
            .extents
            .get(glyph_id as usize)
            .copied()
            .flatten()
            .map(|(y_max, y_min)| GlyphExtents {
                y_max: (y_max as f32 * scale).ceil() as i16,
                y_min: (y_min as f32 * scale).floor() as i16,
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
    fn directory_is_sorted_and_padded() {
        let data = SfntBuilder::new()
            .table(*b"zzzz", vec![1, 2, 3])
            .table(*b"aaaa", vec![4])
            .build();
        assert_eq!(&data[12..16], b"aaaa");
        assert_eq!(&data[28..32], b"zzzz");
        assert_eq!(data.len(), 12 + 32 + 4 + 4);
    }

    #[test]
    fn checksum_pads_the_tail() {
        assert_eq!(checksum(&[0, 0, 0, 1, 1]), 1 + 0x0100_0000);
    }

    #[test]
    fn collection_relocates_tables() {
        let face = SfntBuilder::new().table(*b"head", vec![7; 4]).build();
        let ttc = collection(&[face.clone(), face]);
        assert_eq!(&ttc[..4], b"ttcf");
        let second = u32::from_be_bytes([ttc[16], ttc[17], ttc[18], ttc[19]]) as usize;
        let table = u32::from_be_bytes([
            ttc[second + 20],
            ttc[second + 21],
            ttc[second + 22],
            ttc[second + 23],
        ]) as usize;
        assert_eq!(&ttc[table..table + 4], &[7; 4]);
    }

    #[test]
    fn rect_glyph_layout() {
        assert_eq!(rect_glyph((0, 0, 10, 20)).len(), 34);
    }
}
