// this_file: crates/fontval-core/src/devmetrics.rs

//! Device metrics synthesis: `hdmx`, `LTSH` and `VDMX` from a live backend
//!
//! Every value comes from asking the active [`RasterBackend`] how a glyph
//! actually rasterizes at a pixel size. Cancellation keeps whatever rows
//! were finished: whole `hdmx` records, whole `LTSH` glyph entries, whole
//! `VDMX` height entries.

use crate::{
    cancel::CancellationToken,
    error::{RasterError, Result},
    sfnt,
    tables::{HdmxRecord, HdmxTable, LtshTable, VdmxEntry, VdmxGroup, VdmxTable},
    traits::RasterBackend,
    types::{GlyphId, Tag},
};

/// Glyphs measured together by `LTSH`, and reported as one progress step
const LTSH_GLYPH_BATCH: usize = 64;

/// Which tables to build, and over which sizes
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DevMetricsRequest {
    pub hdmx: bool,
    pub ltsh: bool,
    pub vdmx: bool,
    /// Candidate `hdmx` ppems; order and duplicates do not matter
    pub hdmx_sizes: Vec<u8>,
    /// Largest `hdmx` ppem kept
    pub hdmx_max_size: u8,
    /// First pixel height scanned by `LTSH` and `VDMX`
    pub height_start: u8,
    /// Last pixel height, inclusive
    pub height_end: u8,
    /// `VDMX` aspect ratios as (x, y); (0, 0) matches any ratio
    pub ratios: Vec<(u8, u8)>,
}

impl Default for DevMetricsRequest {
    fn default() -> Self {
        Self {
            hdmx: false,
            ltsh: false,
            vdmx: false,
            hdmx_sizes: (9..=50).collect(),
            hdmx_max_size: 255,
            height_start: 1,
            height_end: 255,
            ratios: vec![(1, 1)],
        }
    }
}

impl DevMetricsRequest {
    /// Request all three tables with default parameters
    pub fn all() -> Self {
        Self {
            hdmx: true,
            ltsh: true,
            vdmx: true,
            ..Self::default()
        }
    }

    pub fn any(&self) -> bool {
        self.hdmx || self.ltsh || self.vdmx
    }

    /// `hdmx` sizes ascending, without duplicates, zeros, or sizes above the maximum
    pub fn normalized_hdmx_sizes(&self) -> Vec<u8> {
        let mut sizes: Vec<u8> = self
            .hdmx_sizes
            .iter()
            .copied()
            .filter(|&s| s > 0 && s <= self.hdmx_max_size)
            .collect();
        sizes.sort_unstable();
        sizes.dedup();
        sizes
    }

    /// Ratio pairs in request order with repeats removed
    pub fn distinct_ratios(&self) -> Vec<(u8, u8)> {
        let mut seen = Vec::with_capacity(self.ratios.len());
        for &ratio in &self.ratios {
            if !seen.contains(&ratio) {
                seen.push(ratio);
            }
        }
        seen
    }

    fn heights(&self) -> std::ops::RangeInclusive<u8> {
        self.height_start.max(1)..=self.height_end
    }
}

/// Whatever the synthesizer managed to build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DevMetricsResult {
    pub hdmx: Option<HdmxTable>,
    pub ltsh: Option<LtshTable>,
    pub vdmx: Option<VdmxTable>,
    /// Set when cancellation cut the computation short
    pub cancelled: bool,
}

/// How a synthesized table compares with the one the font ships
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsComparison {
    pub tag: Tag,
    /// False when the font has no such table
    pub present_in_font: bool,
    pub matches: bool,
    /// First differing byte offset, or the shorter length when one is a prefix
    pub first_difference: Option<usize>,
}

impl DevMetricsResult {
    /// Encoded bytes for every table that was produced, in tag order hdmx, LTSH, VDMX
    pub fn encoded_tables(&self) -> Result<Vec<(Tag, Vec<u8>)>> {
        let mut out = Vec::new();
        if let Some(hdmx) = &self.hdmx {
            out.push((Tag::new(b"hdmx"), hdmx.to_bytes()));
        }
        if let Some(ltsh) = &self.ltsh {
            out.push((Tag::new(b"LTSH"), ltsh.to_bytes()));
        }
        if let Some(vdmx) = &self.vdmx {
            out.push((Tag::new(b"VDMX"), vdmx.to_bytes()?));
        }
        Ok(out)
    }

    /// Compare each produced table with the font's own copy
    pub fn compare_with_font(&self, data: &[u8], face_index: u32) -> Result<Vec<MetricsComparison>> {
        Ok(self
            .encoded_tables()?
            .into_iter()
            .map(|(tag, ours)| match sfnt::table_bytes(data, face_index, tag) {
                Some(theirs) => {
                    let first_difference = first_difference(&ours, theirs);
                    MetricsComparison {
                        tag,
                        present_in_font: true,
                        matches: first_difference.is_none(),
                        first_difference,
                    }
                }
                None => MetricsComparison {
                    tag,
                    present_in_font: false,
                    matches: false,
                    first_difference: None,
                },
            })
            .collect())
    }
}

fn first_difference(a: &[u8], b: &[u8]) -> Option<usize> {
    a.iter()
        .zip(b)
        .position(|(x, y)| x != y)
        .or_else(|| (a.len() != b.len()).then(|| a.len().min(b.len())))
}

/// Build the requested tables from the backend's active face
///
/// Returns `Ok(None)` when the request enables nothing. Tables are built in
/// the order hdmx, LTSH, VDMX; once `cancel` fires, the table in progress
/// keeps its completed rows and later tables are skipped.
pub fn synthesize(
    backend: &mut dyn RasterBackend,
    request: &DevMetricsRequest,
    cancel: &CancellationToken,
    progress: &mut dyn FnMut(&str),
) -> Result<Option<DevMetricsResult>> {
    if !request.any() {
        return Ok(None);
    }
    let num_glyphs = backend
        .face()
        .ok_or(RasterError::NoActiveFace)?
        .num_glyphs;

    let mut result = DevMetricsResult::default();

    if request.hdmx {
        let (table, cancelled) = build_hdmx(backend, request, num_glyphs, cancel, progress)?;
        result.hdmx = table;
        result.cancelled = cancelled;
    }
    if request.ltsh && !result.cancelled {
        let (table, cancelled) = build_ltsh(backend, request, num_glyphs, cancel, progress)?;
        result.ltsh = table;
        result.cancelled = cancelled;
    }
    if request.vdmx && !result.cancelled {
        let (table, cancelled) = build_vdmx(backend, request, num_glyphs, cancel, progress)?;
        result.vdmx = table;
        result.cancelled = cancelled;
    }

    if result.cancelled {
        log::info!("Device metrics cancelled; keeping completed rows");
    }
    Ok(Some(result))
}

/// Select a size, turning "no such strike" into `Ok(false)`
fn select_size(backend: &mut dyn RasterBackend, x: u16, y: u16) -> Result<bool> {
    match backend.set_pixel_size(x, y) {
        Ok(()) => Ok(true),
        Err(e) if e.is_unsupported_fixed_size() => {
            log::debug!("Skipping {x}x{y}: {e}");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Round a pixel advance to a table byte
pub fn round_width(advance: f32) -> u8 {
    if advance.is_finite() {
        advance.round().clamp(0.0, 255.0) as u8
    } else {
        0
    }
}

fn build_hdmx(
    backend: &mut dyn RasterBackend,
    request: &DevMetricsRequest,
    num_glyphs: u16,
    cancel: &CancellationToken,
    progress: &mut dyn FnMut(&str),
) -> Result<(Option<HdmxTable>, bool)> {
    let mut records = Vec::new();
    let mut cancelled = false;

    'sizes: for size in request.normalized_hdmx_sizes() {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }
        if !select_size(backend, size as u16, size as u16)? {
            continue;
        }
        progress(&format!("hdmx: {size} ppem"));

        let mut widths = Vec::with_capacity(num_glyphs as usize);
        for gid in 0..num_glyphs as GlyphId {
            if cancel.is_cancelled() {
                cancelled = true;
                break 'sizes;
            }
            widths.push(round_width(backend.glyph_advance(gid)?));
        }
        let max_width = widths.iter().copied().max().unwrap_or(0);
        records.push(HdmxRecord {
            pixel_size: size,
            max_width,
            widths,
        });
    }

    log::debug!("hdmx: {} records", records.len());
    let table = (!cancelled || !records.is_empty()).then_some(HdmxTable {
        num_glyphs,
        records,
    });
    Ok((table, cancelled))
}

/// `LTSH`, a batch of glyphs at a time
///
/// Heights form the outer loop inside a batch so each pixel size is
/// selected once per batch. A glyph's value is final only after the last
/// height, so a cancelled batch is dropped whole.
fn build_ltsh(
    backend: &mut dyn RasterBackend,
    request: &DevMetricsRequest,
    num_glyphs: u16,
    cancel: &CancellationToken,
    progress: &mut dyn FnMut(&str),
) -> Result<(Option<LtshTable>, bool)> {
    let mut y_pels = Vec::with_capacity(num_glyphs as usize);
    let mut cancelled = false;

    'batches: for first in (0..num_glyphs as GlyphId).step_by(LTSH_GLYPH_BATCH) {
        let batch = first..(first + LTSH_GLYPH_BATCH as GlyphId).min(num_glyphs as GlyphId);
        progress(&format!("LTSH: glyph {first} of {num_glyphs}"));

        // Per glyph: smallest height of the current run of matches
        let mut linear_from: Vec<Option<u8>> = vec![None; batch.len()];
        for height in request.heights() {
            if cancel.is_cancelled() {
                cancelled = true;
                break 'batches;
            }
            if !select_size(backend, height as u16, height as u16)? {
                continue;
            }
            for (slot, gid) in linear_from.iter_mut().zip(batch.clone()) {
                let hinted = backend.glyph_advance(gid)?;
                let linear = backend.linear_advance(gid)?;
                if hinted.round() == linear.round() {
                    slot.get_or_insert(height);
                } else {
                    *slot = None;
                }
            }
        }
        y_pels.extend(linear_from.into_iter().map(|from| from.unwrap_or(1)));
    }

    log::debug!("LTSH: {} of {} glyphs", y_pels.len(), num_glyphs);
    let table = (!cancelled || !y_pels.is_empty()).then_some(LtshTable { y_pels });
    Ok((table, cancelled))
}

fn build_vdmx(
    backend: &mut dyn RasterBackend,
    request: &DevMetricsRequest,
    num_glyphs: u16,
    cancel: &CancellationToken,
    progress: &mut dyn FnMut(&str),
) -> Result<(Option<VdmxTable>, bool)> {
    let mut groups = Vec::new();
    let mut cancelled = false;

    'ratios: for ratio in request.distinct_ratios() {
        let mut group = VdmxGroup {
            ratio,
            entries: Vec::new(),
        };

        for height in request.heights() {
            let x_ppem = x_ppem_for(ratio, height);
            if !select_size(backend, x_ppem, height as u16)? {
                continue;
            }
            progress(&format!("VDMX: {}:{} at {height} px", ratio.0, ratio.1));

            let mut extrema: Option<(i16, i16)> = None;
            for gid in 0..num_glyphs as GlyphId {
                if cancel.is_cancelled() {
                    cancelled = true;
                    if !group.entries.is_empty() {
                        groups.push(group);
                    }
                    break 'ratios;
                }
                if let Some(ext) = backend.glyph_extents(gid)? {
                    extrema = Some(match extrema {
                        Some((hi, lo)) => (hi.max(ext.y_max), lo.min(ext.y_min)),
                        None => (ext.y_max, ext.y_min),
                    });
                }
            }
            let (y_max, y_min) = extrema.unwrap_or((0, 0));
            group.entries.push(VdmxEntry {
                y_pel_height: height as u16,
                y_max,
                y_min,
            });
        }
        if group.entries.is_empty() {
            log::debug!("VDMX: no height available for ratio {}:{}", ratio.0, ratio.1);
        } else {
            groups.push(group);
        }
    }

    log::debug!("VDMX: {} groups", groups.len());
    let table = (!cancelled || !groups.is_empty()).then_some(VdmxTable { groups });
    Ok((table, cancelled))
}

/// Horizontal ppem for a pixel height under an x:y ratio
fn x_ppem_for((x, y): (u8, u8), height: u8) -> u16 {
    if x == 0 || y == 0 {
        return height as u16;
    }
    let scaled = (height as f32 * x as f32 / y as f32).round();
    scaled.clamp(1.0, u16::MAX as f32) as u16
}
