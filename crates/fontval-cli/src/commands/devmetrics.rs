// this_file: crates/fontval-cli/src/commands/devmetrics.rs

//! Devmetrics command implementation
//!
//! Synthesizes hdmx, LTSH and VDMX for one face and writes each table's
//! bytes to `<tag>.bin`.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use fontval::prelude::*;
use fontval::devmetrics::synthesize;

use crate::cli::DevmetricsArgs;
use crate::error::Result;

pub fn run(args: &DevmetricsArgs, quiet: bool) -> Result<Option<DevMetricsResult>> {
    let kind: BackendKind = args.backend.parse()?;
    let mut backend = fontval::create_backend(kind)?;
    let data: Arc<[u8]> = fs::read(&args.font)?.into();
    let info = backend.open_face(Arc::clone(&data), args.face_index)?;
    log::info!(
        "{}: {} glyphs, {} units/em, {kind} backend",
        args.font.display(),
        info.num_glyphs,
        info.units_per_em
    );

    let request = request(args);
    let token = backend.metrics_cancel_token();
    let Some(result) = synthesize(backend.as_mut(), &request, &token, &mut |text| {
        if !quiet {
            println!("Progress: {text}");
        }
    })?
    else {
        return Ok(None);
    };

    let out_dir = args.out_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&out_dir)?;
    for (tag, bytes) in result.encoded_tables()? {
        let path = out_dir.join(format!("{tag}.bin"));
        fs::write(&path, &bytes)?;
        if !quiet {
            println!("Wrote {} ({} bytes)", path.display(), bytes.len());
        }
    }

    if !quiet {
        for cmp in result.compare_with_font(&data, args.face_index)? {
            match (cmp.present_in_font, cmp.first_difference) {
                (false, _) => println!("{}: not present in the font", cmp.tag),
                (true, None) => println!("{}: identical to the font's table", cmp.tag),
                (true, Some(offset)) => {
                    println!("{}: differs from the font's table at byte {offset}", cmp.tag)
                }
            }
        }
    }
    Ok(Some(result))
}

/// No table flag means all three
fn request(args: &DevmetricsArgs) -> DevMetricsRequest {
    if !(args.hdmx || args.ltsh || args.vdmx) {
        return DevMetricsRequest::all();
    }
    DevMetricsRequest {
        hdmx: args.hdmx,
        ltsh: args.ltsh,
        vdmx: args.vdmx,
        ..DevMetricsRequest::default()
    }
}
