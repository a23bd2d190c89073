// this_file: crates/fontval-core/src/tables.rs

//! In-memory forms of the synthesized device-metrics tables and their
//! big-endian encodings

use crate::error::{FontvalError, Result};

/// One `hdmx` device record: advance widths at a single ppem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdmxRecord {
    pub pixel_size: u8,
    pub max_width: u8,
    /// One entry per glyph, in glyph-id order
    pub widths: Vec<u8>,
}

/// `hdmx`: horizontal device metrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdmxTable {
    pub num_glyphs: u16,
    /// Ascending by pixel size
    pub records: Vec<HdmxRecord>,
}

impl HdmxTable {
    /// Size of one record on disk, padded to a 4-byte boundary
    pub fn record_size(&self) -> usize {
        (2 + self.num_glyphs as usize + 3) & !3
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let record_size = self.record_size();
        let mut out = Vec::with_capacity(8 + record_size * self.records.len());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&(self.records.len() as i16).to_be_bytes());
        out.extend_from_slice(&(record_size as i32).to_be_bytes());
        for record in &self.records {
            let start = out.len();
            out.push(record.pixel_size);
            out.push(record.max_width);
            out.extend_from_slice(&record.widths);
            out.resize(start + record_size, 0);
        }
        out
    }
}

/// `LTSH`: the ppem at which each glyph starts scaling linearly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LtshTable {
    pub y_pels: Vec<u8>,
}

impl LtshTable {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.y_pels.len());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&(self.y_pels.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.y_pels);
        out
    }
}

/// Vertical extrema of all glyphs at one pixel height
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VdmxEntry {
    pub y_pel_height: u16,
    pub y_max: i16,
    pub y_min: i16,
}

/// Entries for one x:y aspect ratio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VdmxGroup {
    pub ratio: (u8, u8),
    /// Ascending by height
    pub entries: Vec<VdmxEntry>,
}

/// `VDMX`: vertical device metrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VdmxTable {
    pub groups: Vec<VdmxGroup>,
}

impl VdmxTable {
    /// Encode as version 1; group offsets are measured from the table start
    /// and must fit in 16 bits
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let count = u16::try_from(self.groups.len())
            .map_err(|_| FontvalError::Encode(format!("{} VDMX ratios", self.groups.len())))?;

        let mut out = Vec::new();
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&count.to_be_bytes());
        out.extend_from_slice(&count.to_be_bytes());
        for group in &self.groups {
            let (x, y) = group.ratio;
            out.extend_from_slice(&[1, x, y, y]);
        }

        let mut offset = out.len() + 2 * self.groups.len();
        for group in &self.groups {
            let encoded = u16::try_from(offset).map_err(|_| {
                FontvalError::Encode(format!("VDMX group offset {offset} exceeds 16 bits"))
            })?;
            out.extend_from_slice(&encoded.to_be_bytes());
            offset += 4 + 6 * group.entries.len();
        }

        for group in &self.groups {
            let recs = u16::try_from(group.entries.len())
                .map_err(|_| FontvalError::Encode("too many VDMX entries".into()))?;
            let start = group.entries.first().map_or(0, |e| e.y_pel_height);
            let end = group.entries.last().map_or(0, |e| e.y_pel_height);
            out.extend_from_slice(&recs.to_be_bytes());
            out.push(u8::try_from(start).unwrap_or(u8::MAX));
            out.push(u8::try_from(end).unwrap_or(u8::MAX));
            for entry in &group.entries {
                out.extend_from_slice(&entry.y_pel_height.to_be_bytes());
                out.extend_from_slice(&entry.y_max.to_be_bytes());
                out.extend_from_slice(&entry.y_min.to_be_bytes());
            }
        }
        Ok(out)
    }
}
