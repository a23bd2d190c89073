// this_file: crates/fontval-cli/src/checksum.rs

//! Table-directory checks: bounds and checksums of every record
//!
//! This is the validator the command line ships with. It checks what the
//! table directory promises about each table, and for hdmx, LTSH and VDMX
//! compares the font's bytes with freshly synthesized ones when the run
//! produced them.

use fontval::prelude::{FontvalError, Result, TableValidator};
use fontval::traits::{Severity, TableContext, TableOutcome};
use fontval::types::Tag;
use read_fonts::FontRef;

/// Offset of `checkSumAdjustment` inside `head`
const HEAD_ADJUSTMENT: usize = 8;

#[derive(Debug, Default)]
pub struct ChecksumValidator;

impl TableValidator for ChecksumValidator {
    fn name(&self) -> &'static str {
        "directory"
    }

    fn validate_table(&self, ctx: &TableContext<'_>, tag: Tag) -> Result<TableOutcome> {
        let font = FontRef::from_index(ctx.data, ctx.face_index)
            .map_err(|e| FontvalError::Other(format!("cannot read table directory: {e}")))?;
        let mut outcome = TableOutcome::new(tag);

        let Some(record) = font
            .table_directory
            .table_records()
            .iter()
            .find(|r| r.tag() == tag)
        else {
            outcome.push(Severity::Error, "table is not in the directory");
            return Ok(outcome);
        };

        let start = record.offset() as usize;
        let len = record.length() as usize;
        let Some(bytes) = start
            .checked_add(len)
            .and_then(|end| ctx.data.get(start..end))
        else {
            outcome.push(
                Severity::Error,
                format!("table extends past the end of the file ({start}+{len})"),
            );
            return Ok(outcome);
        };
        if start % 4 != 0 {
            outcome.push(Severity::Warning, format!("offset {start} is not 4-byte aligned"));
        }

        let actual = table_checksum(tag, bytes);
        if actual == record.checksum() {
            outcome.push(Severity::Info, "checksum matches");
        } else {
            outcome.push(
                Severity::Error,
                format!(
                    "checksum 0x{:08X} does not match directory 0x{:08X}",
                    actual,
                    record.checksum()
                ),
            );
        }

        if let Some(metrics) = ctx.dev_metrics {
            for (synth_tag, ours) in metrics.encoded_tables()? {
                if synth_tag != tag {
                    continue;
                }
                if ours.as_slice() == bytes {
                    outcome.push(Severity::Info, "matches the synthesized table");
                } else {
                    outcome.push(
                        Severity::Warning,
                        format!(
                            "differs from the synthesized table ({} bytes vs {})",
                            bytes.len(),
                            ours.len()
                        ),
                    );
                }
            }
        }

        Ok(outcome)
    }
}

/// Sum of big-endian u32 words, zero-padded; `head` counts its
/// `checkSumAdjustment` as zero
pub fn table_checksum(tag: Tag, bytes: &[u8]) -> u32 {
    let skip = (tag == Tag::new(b"head")).then_some(HEAD_ADJUSTMENT..HEAD_ADJUSTMENT + 4);
    bytes.chunks(4).enumerate().fold(0u32, |sum, (i, chunk)| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        if skip.as_ref().is_some_and(|r| r.start == i * 4) {
            word = [0; 4];
        }
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}
