// this_file: crates/fontval-core/tests/devmetrics.rs

//! Device metrics synthesis against a scripted backend

use std::sync::Arc;

use fontval_core::{
    error::{FontvalError, RasterError},
    synthesize,
    tables::VdmxEntry,
    testing::{SfntBuilder, StubBackend},
    CancellationToken, DevMetricsRequest, RasterBackend,
};
use proptest::prelude::*;

fn opened(mut backend: StubBackend) -> StubBackend {
    let data: Arc<[u8]> = SfntBuilder::new()
        .table(*b"head", vec![0; 54])
        .build()
        .into();
    backend.open_face(data, 0).unwrap();
    backend
}

fn hdmx_only(sizes: Vec<u8>) -> DevMetricsRequest {
    DevMetricsRequest {
        hdmx: true,
        hdmx_sizes: sizes,
        ..DevMetricsRequest::default()
    }
}

fn run(backend: &mut StubBackend, request: &DevMetricsRequest) -> fontval_core::DevMetricsResult {
    let token = backend.metrics_cancel_token();
    synthesize(backend, request, &token, &mut |_| {})
        .unwrap()
        .expect("some table was requested")
}

#[test]
fn hdmx_rounds_linear_advances() {
    let mut backend = opened(StubBackend::new(1000, vec![500, 500, 1000, 250]));
    let result = run(&mut backend, &hdmx_only(vec![12]));

    let hdmx = result.hdmx.unwrap();
    assert_eq!(hdmx.records.len(), 1);
    assert_eq!(hdmx.records[0].pixel_size, 12);
    assert_eq!(hdmx.records[0].widths, vec![6, 6, 12, 3]);
    assert_eq!(hdmx.records[0].max_width, 12);
    assert!(result.ltsh.is_none());
    assert!(result.vdmx.is_none());
    assert!(!result.cancelled);
}

#[test]
fn nothing_requested_is_none() {
    let mut backend = opened(StubBackend::new(1000, vec![500]));
    let token = CancellationToken::new();
    let result = synthesize(&mut backend, &DevMetricsRequest::default(), &token, &mut |_| {});
    assert!(matches!(result, Ok(None)));
}

#[test]
fn needs_an_open_face() {
    let mut backend = StubBackend::new(1000, vec![500]);
    let token = CancellationToken::new();
    let err = synthesize(&mut backend, &hdmx_only(vec![12]), &token, &mut |_| {}).unwrap_err();
    assert!(matches!(err, FontvalError::Raster(RasterError::NoActiveFace)));
}

#[test]
fn cancel_mid_size_keeps_whole_records() {
    let mut backend = StubBackend::new(1000, vec![500, 500, 1000, 250]);
    // Two full sizes, then two glyphs into the third
    backend.cancel_after_advances = Some(10);
    let mut backend = opened(backend);

    let request = DevMetricsRequest {
        hdmx_sizes: vec![10, 11, 12, 13],
        ..DevMetricsRequest::all()
    };
    let result = run(&mut backend, &request);

    assert!(result.cancelled);
    let hdmx = result.hdmx.unwrap();
    let sizes: Vec<u8> = hdmx.records.iter().map(|r| r.pixel_size).collect();
    assert_eq!(sizes, vec![10, 11]);
    assert!(hdmx.records.iter().all(|r| r.widths.len() == 4));
    assert!(result.ltsh.is_none());
    assert!(result.vdmx.is_none());
}

#[test]
fn cancel_before_start_yields_empty_result() {
    let mut backend = opened(StubBackend::new(1000, vec![500, 250]));
    backend.cancel_metrics_computation();
    let result = run(&mut backend, &DevMetricsRequest::all());

    assert!(result.cancelled);
    assert!(result.hdmx.is_none());
    assert!(result.ltsh.is_none());
    assert!(result.vdmx.is_none());
}

#[test]
fn unsupported_strike_sizes_are_skipped() {
    let mut backend = StubBackend::new(1000, vec![500, 1000]);
    backend.fixed_sizes = Some(vec![12, 16]);
    let mut backend = opened(backend);

    let result = run(&mut backend, &hdmx_only(vec![10, 12, 14, 16]));
    let sizes: Vec<u8> = result.hdmx.unwrap().records.iter().map(|r| r.pixel_size).collect();
    assert_eq!(sizes, vec![12, 16]);
}

#[test]
fn unsupported_size_keeps_previous_selection() {
    let mut backend = StubBackend::new(1000, vec![500]);
    backend.fixed_sizes = Some(vec![12]);
    let mut backend = opened(backend);

    backend.set_pixel_size(12, 12).unwrap();
    let err = backend.set_pixel_size(13, 13).unwrap_err();
    assert!(err.is_unsupported_fixed_size());
    assert_eq!(backend.pixel_size(), Some((12, 12)));
}

#[test]
fn ltsh_finds_first_linear_height() {
    let mut backend = StubBackend::new(1000, vec![500, 600, 700]);
    backend.linear_from = vec![Some(9), None];
    let mut backend = opened(backend);

    let request = DevMetricsRequest {
        ltsh: true,
        height_start: 6,
        height_end: 12,
        ..DevMetricsRequest::default()
    };
    let ltsh = run(&mut backend, &request).ltsh.unwrap();
    assert_eq!(ltsh.y_pels, vec![9, 1, 6]);
}

#[test]
fn ltsh_cancel_keeps_finished_batches() {
    let mut backend = StubBackend::new(1000, vec![500; 65]);
    backend.linear_from = vec![Some(9)];
    // The first 64 glyphs take 448 advances over seven heights; cancel two
    // heights into the batch holding glyph 64
    backend.cancel_after_advances = Some(450);
    let mut backend = opened(backend);

    let request = DevMetricsRequest {
        ltsh: true,
        height_start: 6,
        height_end: 12,
        ..DevMetricsRequest::default()
    };
    let result = run(&mut backend, &request);
    assert!(result.cancelled);
    let y_pels = result.ltsh.unwrap().y_pels;
    assert_eq!(y_pels.len(), 64);
    assert_eq!(y_pels[0], 9);
    assert!(y_pels[1..].iter().all(|&h| h == 6));
}

#[test]
fn ltsh_cancel_inside_first_batch_yields_nothing() {
    let mut backend = StubBackend::new(1000, vec![500, 600, 700]);
    backend.cancel_after_advances = Some(4);
    let mut backend = opened(backend);

    let request = DevMetricsRequest {
        ltsh: true,
        height_start: 6,
        height_end: 12,
        ..DevMetricsRequest::default()
    };
    let result = run(&mut backend, &request);
    assert!(result.cancelled);
    assert!(result.ltsh.is_none());
}

#[test]
fn ltsh_selects_each_height_once_per_batch() {
    let mut backend = opened(StubBackend::new(1000, vec![500; 100]));
    let request = DevMetricsRequest {
        ltsh: true,
        height_start: 1,
        height_end: 40,
        ..DevMetricsRequest::default()
    };
    let ltsh = run(&mut backend, &request).ltsh.unwrap();

    assert_eq!(ltsh.y_pels, vec![1; 100]);
    // Two batches of glyphs, forty heights each
    assert_eq!(backend.size_selections(), 80);
}

#[test]
fn vdmx_tracks_extrema_per_ratio() {
    let mut backend = StubBackend::new(1000, vec![500, 500, 500]);
    backend.extents = vec![Some((740, -150)), None, Some((650, -260))];
    let mut backend = opened(backend);

    let request = DevMetricsRequest {
        vdmx: true,
        height_start: 10,
        height_end: 12,
        ratios: vec![(1, 1), (1, 1), (2, 1)],
        ..DevMetricsRequest::default()
    };
    let vdmx = run(&mut backend, &request).vdmx.unwrap();

    let expected = vec![
        VdmxEntry {
            y_pel_height: 10,
            y_max: 8,
            y_min: -3,
        },
        VdmxEntry {
            y_pel_height: 11,
            y_max: 9,
            y_min: -3,
        },
        VdmxEntry {
            y_pel_height: 12,
            y_max: 9,
            y_min: -4,
        },
    ];
    assert_eq!(vdmx.groups.len(), 2);
    assert_eq!(vdmx.groups[0].ratio, (1, 1));
    assert_eq!(vdmx.groups[1].ratio, (2, 1));
    assert_eq!(vdmx.groups[0].entries, expected);
    assert_eq!(vdmx.groups[1].entries, expected);

    let bytes = vdmx.to_bytes().unwrap();
    assert_eq!(&bytes[..6], &[0, 1, 0, 2, 0, 2]);
}

fn two_ratio_request() -> DevMetricsRequest {
    DevMetricsRequest {
        vdmx: true,
        height_start: 10,
        height_end: 12,
        ratios: vec![(1, 1), (2, 1)],
        ..DevMetricsRequest::default()
    }
}

fn inked_backend() -> StubBackend {
    let mut backend = StubBackend::new(1000, vec![500, 500, 500]);
    backend.extents = vec![Some((740, -150)), None, Some((650, -260))];
    backend
}

#[test]
fn vdmx_cancel_keeps_whole_entries() {
    let mut backend = inked_backend();
    // Nine extents for the first ratio, three for height 10 of the second,
    // then cancel on the second glyph at height 11
    backend.cancel_after_extents = Some(14);
    let mut backend = opened(backend);

    let result = run(&mut backend, &two_ratio_request());
    assert!(result.cancelled);
    let vdmx = result.vdmx.unwrap();

    assert_eq!(vdmx.groups.len(), 2);
    let heights = |i: usize| -> Vec<u16> {
        vdmx.groups[i].entries.iter().map(|e| e.y_pel_height).collect()
    };
    assert_eq!(heights(0), vec![10, 11, 12]);
    assert_eq!(heights(1), vec![10]);
    assert_eq!(
        vdmx.groups[1].entries[0],
        VdmxEntry {
            y_pel_height: 10,
            y_max: 8,
            y_min: -3,
        }
    );
}

#[test]
fn vdmx_cancel_before_first_entry_drops_the_group() {
    let mut backend = inked_backend();
    backend.cancel_after_extents = Some(10);
    let mut backend = opened(backend);

    let result = run(&mut backend, &two_ratio_request());
    assert!(result.cancelled);
    let vdmx = result.vdmx.unwrap();
    assert_eq!(vdmx.groups.len(), 1);
    assert_eq!(vdmx.groups[0].ratio, (1, 1));
    assert_eq!(vdmx.groups[0].entries.len(), 3);
}

#[test]
fn vdmx_drops_ratio_without_available_heights() {
    let mut backend = StubBackend::new(1000, vec![500]);
    backend.fixed_sizes = Some(vec![50]);
    let mut backend = opened(backend);

    let result = run(&mut backend, &two_ratio_request());
    assert!(!result.cancelled);
    let vdmx = result.vdmx.unwrap();
    assert!(vdmx.groups.is_empty());
    assert_eq!(vdmx.to_bytes().unwrap(), vec![0, 1, 0, 0, 0, 0]);
}

#[test]
fn vdmx_without_ink_is_zero() {
    let mut backend = opened(StubBackend::new(1000, vec![500, 500]));
    let request = DevMetricsRequest {
        vdmx: true,
        height_start: 8,
        height_end: 8,
        ..DevMetricsRequest::default()
    };
    let vdmx = run(&mut backend, &request).vdmx.unwrap();
    assert_eq!(
        vdmx.groups[0].entries,
        vec![VdmxEntry {
            y_pel_height: 8,
            y_max: 0,
            y_min: 0,
        }]
    );
}

#[test]
fn progress_reports_each_hdmx_size() {
    let mut backend = opened(StubBackend::new(1000, vec![500]));
    let token = CancellationToken::new();
    let mut seen = Vec::new();
    synthesize(
        &mut backend,
        &hdmx_only(vec![9, 10, 11]),
        &token,
        &mut |text| seen.push(text.to_string()),
    )
    .unwrap();
    assert_eq!(seen.len(), 3);
    assert!(seen[0].contains("9 ppem"));
}

proptest! {
    #[test]
    fn prop_hdmx_matches_linear_rounding(
        advances in prop::collection::vec(0u16..4000, 1..16),
        ppem in 1u8..=100,
        upem in prop::sample::select(vec![1000u16, 1024, 2048]),
    ) {
        let mut backend = opened(StubBackend::new(upem, advances.clone()));
        let result = run(&mut backend, &hdmx_only(vec![ppem]));
        let record = &result.hdmx.unwrap().records[0];

        for (width, advance) in record.widths.iter().zip(&advances) {
            let expected = (*advance as f32 * ppem as f32 / upem as f32).round().min(255.0) as u8;
            prop_assert_eq!(*width, expected);
        }
        prop_assert_eq!(record.max_width, *record.widths.iter().max().unwrap());
    }
}
