// this_file: crates/fontval-cli/src/report_xml.rs

//! Minimal XML rendering of a font report

use std::borrow::Cow;
use std::io::Write;

use fontval::prelude::{FontReport, ReportWriter, Result};
use fontval::traits::Severity;

/// Writes `<FontValidatorReport>` documents, one per font
#[derive(Debug, Default)]
pub struct XmlReportWriter;

impl ReportWriter for XmlReportWriter {
    fn write_report(&mut self, report: &FontReport, out: &mut dyn Write) -> Result<()> {
        writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(
            out,
            r#"<FontValidatorReport version="{}" font="{}">"#,
            env!("CARGO_PKG_VERSION"),
            escape(&report.font_path.display().to_string())
        )?;

        for face in &report.faces {
            writeln!(
                out,
                r#"  <Face index="{}" glyphs="{}" backend="{}">"#,
                face.face_index, face.num_glyphs, face.backend
            )?;

            if let Some(raster) = &face.raster {
                writeln!(
                    out,
                    r#"    <RasterTest completed="{}" anomalies="{}">"#,
                    raster.completed,
                    raster.anomalies.len()
                )?;
                for anomaly in &raster.anomalies {
                    writeln!(
                        out,
                        r#"      <Anomaly name="{}">{}</Anomaly>"#,
                        escape(&anomaly.name),
                        escape(&anomaly.details)
                    )?;
                }
                writeln!(out, "    </RasterTest>")?;
            }

            if !face.metrics_comparison.is_empty() {
                writeln!(out, "    <DeviceMetrics>")?;
                for cmp in &face.metrics_comparison {
                    let diff = cmp
                        .first_difference
                        .map(|d| format!(r#" firstDifference="{d}""#))
                        .unwrap_or_default();
                    writeln!(
                        out,
                        r#"      <Table tag="{}" present="{}" matches="{}"{diff}/>"#,
                        escape(&cmp.tag.to_string()),
                        cmp.present_in_font,
                        cmp.matches
                    )?;
                }
                writeln!(out, "    </DeviceMetrics>")?;
            }

            for table in &face.tables {
                writeln!(
                    out,
                    r#"    <TableTest tag="{}" passed="{}">"#,
                    escape(&table.tag.to_string()),
                    table.passed()
                )?;
                for diag in &table.diagnostics {
                    let severity = match diag.severity {
                        Severity::Info => "P",
                        Severity::Warning => "W",
                        Severity::Error => "E",
                    };
                    writeln!(
                        out,
                        r#"      <Report type="{severity}">{}</Report>"#,
                        escape(&diag.message)
                    )?;
                }
                writeln!(out, "    </TableTest>")?;
            }
            writeln!(out, "  </Face>")?;
        }

        writeln!(out, "</FontValidatorReport>")?;
        Ok(())
    }
}

/// Escape the five XML special characters
fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}
