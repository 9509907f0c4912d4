// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end checks of the analysis core on synthetic floor plans

use image::{Rgb, RgbImage};
use serde_json::json;

use planscan_vision::types::EdgeDumpConfig;
use planscan_vision::{
    detect_legend_groups, edge_points, extract_region, locate_boundary, BoundaryOutcome,
    BoundingBox, Calibration, CalibrationRequest, MeasureRequest, MeasurementLog,
    SharedCalibration, VisionConfig,
};

fn fill(img: &mut RgbImage, x0: u32, y0: u32, w: u32, h: u32, color: [u8; 3]) {
    for x in x0..x0 + w {
        for y in y0..y0 + h {
            img.put_pixel(x, y, Rgb(color));
        }
    }
}

/// A plan with a legend column on the left and one room on the right
fn create_plan() -> RgbImage {
    let mut img = RgbImage::from_pixel(400, 300, Rgb([255, 255, 255]));

    // Legend markers
    fill(&mut img, 20, 20, 30, 20, [220, 0, 0]);
    fill(&mut img, 20, 60, 30, 20, [0, 160, 0]);
    fill(&mut img, 20, 100, 30, 20, [220, 0, 0]);

    // Room walls from (180, 100) to (303, 163)
    fill(&mut img, 180, 100, 123, 3, [0, 0, 0]);
    fill(&mut img, 180, 160, 123, 3, [0, 0, 0]);
    fill(&mut img, 180, 100, 3, 63, [0, 0, 0]);
    fill(&mut img, 300, 100, 3, 63, [0, 0, 0]);

    img
}

#[test]
fn test_detect_and_group_markers() {
    let img = create_plan();
    let (detection, groups) = detect_legend_groups(&img, &VisionConfig::default());

    let ids: Vec<_> = detection.instances.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(detection.previews.len(), 3);

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].group_key, "red_solid");
    assert_eq!(groups[0].count, 2);
    assert_eq!(groups[0].sample_instance_id, 1);
    assert_eq!(groups[1].group_key, "green_solid");
    assert_eq!(groups[1].sample_instance_id, 3);
}

#[test]
fn test_instance_json_shape() {
    let img = create_plan();
    let (detection, groups) = detect_legend_groups(&img, &VisionConfig::default());

    let first = serde_json::to_value(&detection.instances[0]).unwrap();
    assert_eq!(first["id"], 1);
    assert_eq!(first["color"], "red");
    assert_eq!(first["pattern"], "solid");
    assert_eq!(
        first["boundingBox"],
        json!({"x": 20, "y": 20, "width": 30, "height": 20})
    );
    assert_eq!(first["dimensions"], json!({"width": 30, "height": 20}));
    assert_eq!(first["extremePoints"]["left"][0], 20);
    assert_eq!(first["extremePoints"]["right"][0], 49);
    assert_eq!(first["extremePoints"]["top"][1], 20);
    assert_eq!(first["extremePoints"]["bottom"][1], 39);
    assert_eq!(first["preview"], "legend_1_red_solid.png");

    let group = serde_json::to_value(&groups[0]).unwrap();
    assert_eq!(group["groupKey"], "red_solid");
    assert_eq!(group["samplePreview"], "legend_1_red_solid.png");
    assert_eq!(group["sampleInstanceId"], 1);
    assert_eq!(group["instances"].as_array().map(Vec::len), Some(2));
}

#[test]
fn test_detection_is_repeatable() {
    let img = create_plan();
    let config = VisionConfig::default();

    let (first, _) = detect_legend_groups(&img, &config);
    let (second, _) = detect_legend_groups(&img, &config);

    assert_eq!(first, second);
}

#[test]
fn test_locate_room_and_serialize() {
    let img = create_plan();
    let outcome = locate_boundary(
        &img,
        &BoundingBox::new(235, 125, 10, 10),
        &VisionConfig::default().boundary,
    );

    let found = outcome.found().copied().expect("room should be found");
    // Wall centerlines: x 181 and 301, y 101 and 161
    assert!(found.x.abs_diff(181) <= 2, "x = {}", found.x);
    assert!(found.y.abs_diff(101) <= 2, "y = {}", found.y);
    assert!(found.width.abs_diff(120) <= 2, "width = {}", found.width);
    assert!(found.height.abs_diff(60) <= 2, "height = {}", found.height);
    assert_eq!(found.angle, 0.0);
    assert!(found.length >= found.thickness);

    let value = serde_json::to_value(outcome).unwrap();
    assert_eq!(value["status"], "found");
    assert_eq!(value["x"], found.x);
    assert!(value.get("thickness").is_some());
}

#[test]
fn test_locate_on_empty_area() {
    let img = RgbImage::from_pixel(300, 300, Rgb([255, 255, 255]));
    let outcome = locate_boundary(
        &img,
        &BoundingBox::new(150, 150, 1, 1),
        &VisionConfig::default().boundary,
    );

    assert_eq!(outcome, BoundaryOutcome::NoStructuralLines);
    assert_eq!(
        serde_json::to_value(outcome).unwrap(),
        json!({"status": "noStructuralLines"})
    );
    assert_eq!(
        serde_json::to_value(BoundaryOutcome::NoEnclosedBoundary).unwrap(),
        json!({"status": "noEnclosedBoundary"})
    );
}

#[test]
fn test_extract_marker_from_sample() {
    let img = create_plan();
    // A loose selection around the green marker
    let region = extract_region(
        &img,
        &BoundingBox::new(12, 52, 46, 36),
        &VisionConfig::default().sampler,
    )
    .unwrap();

    assert_eq!(region.bounding_box, BoundingBox::new(20, 60, 30, 20));
    assert_eq!(region.crop.dimensions(), (30, 20));

    let value = serde_json::to_value(&region).unwrap();
    assert_eq!(value["preview"], "region_20_60_30x20.png");
    assert!(value.get("range").is_some());
    assert!(value.get("crop").is_none());
}

#[test]
fn test_calibrate_then_measure() {
    let shared = SharedCalibration::new(Calibration::new());

    let request: CalibrationRequest =
        serde_json::from_value(json!({"pixelDistance": 100, "realDistance": 10})).unwrap();
    let response = shared.calibrate(&request).unwrap();
    assert_eq!(
        serde_json::to_value(response).unwrap(),
        json!({"pixelsPerUnit": 10.0})
    );

    let measure: MeasureRequest =
        serde_json::from_value(json!({"x1": 0, "y1": 0, "x2": 30, "y2": 40})).unwrap();
    let measurement = shared.measure(&measure);
    assert_eq!(
        serde_json::to_value(measurement).unwrap(),
        json!({"pixelDistance": 50.0, "realDistance": 5.0, "unit": "feet"})
    );
}

#[test]
fn test_group_totals_after_calibration() {
    let mut calibration = Calibration::new();
    calibration.set_calibration(48.0, 4.0).unwrap();

    let mut log = MeasurementLog::new();
    log.set_current_group("partition");
    for request in [
        MeasureRequest { x1: 0.0, y1: 0.0, x2: 120.0, y2: 0.0 },
        MeasureRequest { x1: 120.0, y1: 0.0, x2: 120.0, y2: 30.0 },
    ] {
        let (from, to) = request.endpoints();
        log.add(calibration.measure(from, to), None);
    }

    let total = log.total_for_group("partition").unwrap().unwrap();
    assert_eq!(
        serde_json::to_value(total).unwrap(),
        json!({
            "group": "partition",
            "labels": ["Measurement 1", "Measurement 2"],
            "total": 12.5,
            "unit": "feet"
        })
    );
    assert_eq!(
        serde_json::to_value(&log.measurements()[1]).unwrap(),
        json!({
            "id": 2,
            "group": "partition",
            "pixelDistance": 30.0,
            "realDistance": 2.5,
            "unit": "feet"
        })
    );
}

#[test]
fn test_edge_dump_is_row_major() {
    let mut img = RgbImage::from_pixel(80, 60, Rgb([255, 255, 255]));
    fill(&mut img, 20, 15, 30, 25, [0, 0, 0]);

    let points = edge_points(&img, &EdgeDumpConfig::default());

    assert!(!points.is_empty());
    assert!(points
        .windows(2)
        .all(|w| (w[0][1], w[0][0]) < (w[1][1], w[1][0])));
    assert!(points.iter().all(|&[x, y]| x < 80 && y < 60));
}
