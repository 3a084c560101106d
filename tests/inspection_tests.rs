//! End-to-end behavior on synthetic images

use defect_scan::capture::{CaptureController, CaptureEvent, CaptureOptions, FrameSource, LatestResult};
use defect_scan::detector::{detect_bright, detect_dark};
use defect_scan::pipeline::{inspect_gray, inspect_with_views};
use defect_scan::render;
use defect_scan::segmenter::region_boxes;
use defect_scan::stabilizer::stabilize;
use defect_scan::utils::morphology::KernelSize;
use defect_scan::{
    BoundingBox, DefectKind, InspectError, InspectionConfig, InspectionResult, InspectionSession, RegionName,
    RegionResult, SharedConfig,
};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

fn uniform(w: u32, h: u32) -> GrayImage {
    GrayImage::from_pixel(w, h, Luma([128]))
}

fn with_square(mut img: GrayImage, x0: u32, y0: u32, side: u32, value: u8) -> GrayImage {
    for y in y0..y0 + side {
        for x in x0..x0 + side {
            img.put_pixel(x, y, Luma([value]));
        }
    }
    img
}

fn coverage(mask: &defect_scan::DefectMask) -> f32 {
    mask.percentage()
}

#[test]
fn end_to_end_dark_square_in_base() {
    let img = with_square(uniform(100, 100), 40, 40, 20, 0);
    let config = InspectionConfig::default();
    let result = inspect_gray(&img, &config);

    let base = result.get(RegionName::Base).unwrap();
    assert_eq!(base.bbox, BoundingBox::new(30, 30, 70, 70));
    assert!(!base.is_ok);
    assert!((base.defect_percentage - 25.0).abs() < 1e-3);
    assert!(base.defect_kinds.contains(&DefectKind::DarkHoles));

    for name in [RegionName::Top, RegionName::Right, RegionName::Bottom, RegionName::Left] {
        let side = result.get(name).unwrap();
        assert!(side.is_ok, "{} should pass: {:?}", name, side.defect_kinds);
    }
    assert!(!result.overall_is_ok);
}

#[test]
fn segmentation_never_overlaps_and_covers_cross() {
    for (w, h) in [(100, 100), (640, 480), (33, 97), (5, 5), (1, 1)] {
        for p in [10.0, 40.0, 70.0, 100.0] {
            let boxes = region_boxes(w, h, p);
            for (i, (_, a)) in boxes.iter().enumerate() {
                assert!(a.x1 <= a.x2 && a.x2 <= w && a.y1 <= a.y2 && a.y2 <= h);
                for (_, b) in boxes.iter().skip(i + 1) {
                    assert!(!a.overlaps(b));
                }
            }
            // base extent rows and columns are fully covered end to end
            let base = boxes[0].1;
            let row_cover = boxes[4].1.width() + base.width() + boxes[2].1.width();
            let col_cover = boxes[1].1.height() + base.height() + boxes[3].1.height();
            if !base.is_empty() {
                assert_eq!(row_cover, w);
                assert_eq!(col_cover, h);
            }
        }
    }
}

#[test]
fn threshold_monotonicity() {
    let mut img = uniform(60, 60);
    for y in 0..60 {
        for x in 0..60 {
            let v = ((x * 7 + y * 13) % 256) as u8;
            if (x / 10 + y / 10) % 2 == 0 {
                img.put_pixel(x, y, Luma([v]));
            }
        }
    }
    let raw = img.as_raw();

    let mut previous = 0.0;
    for t in (0..=255).step_by(15) {
        let pct = coverage(&detect_dark(raw, 60, 60, t as u8, KernelSize::Three));
        assert!(pct >= previous, "dark t={} {} < {}", t, pct, previous);
        previous = pct;
    }

    let mut previous = 100.0;
    for t in (0..=255).step_by(15) {
        let pct = coverage(&detect_bright(raw, 60, 60, t as u8, KernelSize::Three));
        assert!(pct <= previous, "bright t={} {} > {}", t, pct, previous);
        previous = pct;
    }
}

#[test]
fn pass_fail_matches_percentage() {
    let img = with_square(with_square(uniform(120, 90), 50, 35, 12, 0), 5, 40, 8, 255);
    for threshold in [0.1, 1.0, 5.0, 9.0, 30.0] {
        let config = InspectionConfig {
            defect_threshold: threshold,
            ..InspectionConfig::default()
        };
        let result = inspect_gray(&img, &config);
        for region in &result.per_region {
            assert_eq!(region.is_ok, region.defect_percentage <= threshold);
        }
    }
}

#[test]
fn one_defective_side_fails_image() {
    let clean = |name| RegionResult {
        region_name: name,
        bbox: BoundingBox::new(0, 0, 10, 10),
        is_ok: true,
        defect_kinds: Default::default(),
        defect_percentage: 0.0,
        mask: Default::default(),
    };
    let mut regions: Vec<RegionResult> = RegionName::ALL.iter().map(|&n| clean(n)).collect();
    assert!(InspectionResult::from_regions(regions.clone()).overall_is_ok);

    regions[3].is_ok = false;
    let result = InspectionResult::from_regions(regions);
    assert!(!result.overall_is_ok);
    assert_eq!(result.defective_regions(), vec![RegionName::Bottom]);
}

#[test]
fn session_stays_failed_until_reset() {
    let mut session = InspectionSession::new(SharedConfig::default());
    let good = DynamicImage::ImageLuma8(uniform(100, 100));
    let bad = DynamicImage::ImageLuma8(with_square(uniform(100, 100), 40, 40, 20, 0));

    let sequence = [&good, &good, &bad, &good, &good];
    let mut flags = Vec::new();
    for img in sequence {
        session.inspect_next(img);
        flags.push(session.state().all_components_ok);
    }
    assert_eq!(flags, vec![true, true, false, false, false]);
    assert_eq!(session.state().current_index, 5);

    session.reset();
    assert!(session.state().all_components_ok);
    assert_eq!(session.state().current_index, 0);
    session.inspect_next(&good);
    assert!(session.state().all_components_ok);
}

#[test]
fn missing_region_floor() {
    // 3x3 at 70%: base (0,0)-(2,2) leaves the top and left bands empty
    let config = InspectionConfig {
        base_roi_percent: 70.0,
        ..InspectionConfig::default()
    };
    let tiny = inspect_gray(&uniform(3, 3), &config);
    for region in &tiny.per_region {
        if region.bbox.is_empty() {
            assert_eq!(region.defect_percentage, 100.0);
            assert!(!region.is_ok);
            assert!(region.defect_kinds.contains(&DefectKind::MissingRegion));
        }
    }
    assert!(tiny.per_region.iter().any(|r| r.bbox.is_empty()));
    assert!(!tiny.overall_is_ok);
}

#[test]
fn stabilizer_single_frame_identity() {
    let frame = RgbImage::from_fn(31, 17, |x, y| Rgb([(x * 8) as u8, (y * 15) as u8, ((x + y) * 3) as u8]));
    assert_eq!(stabilize(std::slice::from_ref(&frame)), Some(frame));
}

#[test]
fn views_cover_every_region() {
    let img = DynamicImage::ImageLuma8(with_square(uniform(100, 100), 40, 40, 20, 0));
    let inspection = inspect_with_views(&img, &InspectionConfig::default());
    for name in RegionName::ALL {
        let view = &inspection.views[&format!("region_{}", name)];
        let bbox = inspection.result.get(name).unwrap().bbox;
        assert_eq!(view.dimensions(), (bbox.width(), bbox.height()));
    }
}

#[test]
fn defects_view_labels_failing_region() {
    let img = DynamicImage::ImageLuma8(with_square(uniform(100, 100), 40, 40, 20, 0));
    let inspection = inspect_with_views(&img, &InspectionConfig::default());
    let defects = &inspection.views["defects"];
    let original = &inspection.views["original"];

    // "25.0%" sits inside the base box (30,30)-(70,70), above the dark square
    let label_area: Vec<(u32, u32)> = (34..44).flat_map(|y| (34..70).map(move |x| (x, y))).collect();
    assert!(label_area.iter().any(|&(x, y)| defects.get_pixel(x, y) != original.get_pixel(x, y)));
    assert_eq!(*defects.get_pixel(34, 34), render::RED);
}

#[test]
fn crooked_top_band_fails_on_edges() {
    // 400x360 at 55.6 %: base (100,80)-(300,280), top band (100,0)-(300,80)
    let config = InspectionConfig {
        base_roi_percent: 55.6,
        ..InspectionConfig::default()
    };
    let mut img = uniform(400, 360);
    for y in 0..80u32 {
        for x in 0..200u32 {
            let value = if (x as i32 - 60 - y as i32).abs() < 4 {
                0
            } else if [20, 21, 50, 51, 70, 71].contains(&y) {
                255
            } else {
                continue;
            };
            img.put_pixel(100 + x, y, Luma([value]));
        }
    }
    let result = inspect_gray(&img, &config);
    let top = result.get(RegionName::Top).unwrap();
    assert_eq!(top.bbox, BoundingBox::new(100, 0, 300, 80));
    assert!(top.defect_kinds.contains(&DefectKind::IrregularEdges));
    assert!(result.get(RegionName::Base).unwrap().defect_kinds.is_empty());
}

struct CountingSource {
    reads: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
}

impl FrameSource for CountingSource {
    fn open(&mut self) -> defect_scan::Result<()> {
        Ok(())
    }

    fn read(&mut self) -> defect_scan::Result<RgbImage> {
        let n = self.reads.fetch_add(1, Ordering::SeqCst);
        if n % 4 == 3 {
            return Err(InspectError::device("dropped frame"));
        }
        let img = with_square(uniform(60, 60), 25, 25, 10, 0);
        Ok(DynamicImage::ImageLuma8(img).to_rgb8())
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }

    fn describe(&self) -> String {
        "counting".to_string()
    }
}

#[test]
fn capture_survives_read_errors_and_orders_results() {
    let reads = Arc::new(AtomicUsize::new(0));
    let releases = Arc::new(AtomicUsize::new(0));
    let source = CountingSource {
        reads: Arc::clone(&reads),
        releases: Arc::clone(&releases),
    };
    let options = CaptureOptions {
        analyze_every: 3,
        idle: Duration::from_millis(1),
        ..CaptureOptions::default()
    };
    let mut controller = CaptureController::new(SharedConfig::default(), options);
    let events = controller.start(Box::new(source)).unwrap();

    let mut latest: LatestResult<InspectionResult> = LatestResult::new();
    let mut saw_error = false;
    let deadline = Instant::now() + Duration::from_secs(20);
    while Instant::now() < deadline && !(saw_error && latest.get().is_some()) {
        match events.recv_timeout(Duration::from_millis(200)) {
            Ok(CaptureEvent::SourceError { .. }) => saw_error = true,
            Ok(CaptureEvent::Analyzed { generation, inspection }) => {
                latest.offer(generation, inspection.result);
            }
            _ => {}
        }
    }
    controller.stop();

    assert!(saw_error);
    let result = latest.get().expect("no analysis received");
    // 10x10 dark block in the 24x24 base
    assert!(!result.overall_is_ok);
    assert!(!result.get(RegionName::Base).unwrap().is_ok);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}
