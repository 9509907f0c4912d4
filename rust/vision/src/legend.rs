// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Legend detection pipeline
//!
//! Every palette band is segmented, its outer regions are filtered by size
//! and each surviving region is classified by fill pattern. Bands are
//! processed independently: a region matched by two bands is reported twice.

use image::RgbImage;

use crate::color::{segment_hsv, to_hsv, PaletteEntry, PALETTE};
use crate::contours::{extract_regions, Region};
use crate::image_ops::crop;
use crate::pattern::classify;
use crate::types::{
    Dimensions, LegendColor, LegendDetection, LegendInstance, Preview, RegionFilter,
};

/// Scan the whole image for legend markers of every palette color
pub fn detect_legends(image: &RgbImage, filter: &RegionFilter) -> LegendDetection {
    detect_legends_with_palette(image, filter, &PALETTE)
}

/// Same as [`detect_legends`] with a caller-supplied palette table
pub fn detect_legends_with_palette(
    image: &RgbImage,
    filter: &RegionFilter,
    palette: &[PaletteEntry],
) -> LegendDetection {
    let mut detection = LegendDetection::default();
    if image.width() == 0 || image.height() == 0 {
        return detection;
    }

    let hsv = to_hsv(image);
    let mut next_id = 1u32;

    for entry in palette {
        let mask = segment_hsv(&hsv, &entry.range);
        let regions = extract_regions(&mask);
        let color = entry.band.color();

        let mut accepted = 0usize;
        for region in &regions {
            if !filter.accepts(region, image.width(), image.height()) {
                tracing::trace!(
                    band = entry.band.label(),
                    area = region.area,
                    bbox = ?region.bounding_box,
                    "rejected region"
                );
                continue;
            }

            let (instance, preview) = build_instance(image, next_id, color, region);
            detection.instances.push(instance);
            detection.previews.push(preview);
            next_id += 1;
            accepted += 1;
        }

        tracing::debug!(
            band = entry.band.label(),
            regions = regions.len(),
            accepted,
            "scanned palette band"
        );
    }

    tracing::info!(
        width = image.width(),
        height = image.height(),
        instances = detection.instances.len(),
        "legend detection finished"
    );
    detection
}

fn build_instance(
    image: &RgbImage,
    id: u32,
    color: LegendColor,
    region: &Region,
) -> (LegendInstance, Preview) {
    let bbox = region.bounding_box;
    let preview_image = crop(image, &bbox);
    let pattern = classify(&preview_image);
    let name = format!("legend_{}_{}_{}.png", id, color, pattern);

    let instance = LegendInstance {
        id,
        color,
        pattern,
        bounding_box: bbox,
        extreme_points: region.extreme_points,
        dimensions: Dimensions {
            width: bbox.width,
            height: bbox.height,
        },
        preview: name.clone(),
    };

    (
        instance,
        Preview {
            name,
            image: preview_image,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, FillPattern};
    use image::Rgb;

    fn paint(img: &mut RgbImage, x0: u32, y0: u32, w: u32, h: u32, color: [u8; 3]) {
        for x in x0..x0 + w {
            for y in y0..y0 + h {
                img.put_pixel(x, y, Rgb(color));
            }
        }
    }

    #[test]
    fn test_detects_solid_markers() {
        let mut img = RgbImage::from_pixel(200, 150, Rgb([255, 255, 255]));
        paint(&mut img, 20, 20, 30, 20, [0, 0, 255]);
        paint(&mut img, 100, 60, 25, 25, [0, 200, 0]);

        let detection = detect_legends(&img, &RegionFilter::default());

        assert_eq!(detection.instances.len(), 2);
        assert_eq!(detection.previews.len(), 2);

        let green = &detection.instances[0];
        assert_eq!(green.id, 1);
        assert_eq!(green.color, LegendColor::Green);
        assert_eq!(green.pattern, FillPattern::Solid);
        assert_eq!(green.bounding_box, BoundingBox::new(100, 60, 25, 25));
        assert_eq!(green.dimensions.width, 25);

        let blue = &detection.instances[1];
        assert_eq!(blue.id, 2);
        assert_eq!(blue.color, LegendColor::Blue);
        assert_eq!(blue.bounding_box, BoundingBox::new(20, 20, 30, 20));
        assert_eq!(detection.previews[1].image.dimensions(), (30, 20));
        assert_eq!(detection.previews[1].name, blue.preview);
    }

    #[test]
    fn test_upper_red_band_reports_red() {
        let mut img = RgbImage::from_pixel(120, 120, Rgb([255, 255, 255]));
        paint(&mut img, 10, 10, 20, 20, [255, 0, 0]);
        paint(&mut img, 60, 60, 20, 20, [255, 0, 40]);

        let detection = detect_legends(&img, &RegionFilter::default());

        assert_eq!(detection.instances.len(), 2);
        assert!(detection
            .instances
            .iter()
            .all(|i| i.color == LegendColor::Red));
        assert_eq!(detection.instances[0].bounding_box.x, 10);
        assert_eq!(detection.instances[1].bounding_box.x, 60);
    }

    #[test]
    fn test_small_and_background_regions_are_dropped() {
        let mut img = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        // Too thin
        paint(&mut img, 5, 5, 40, 6, [0, 0, 255]);
        // Covers more than 80% of the width
        paint(&mut img, 0, 50, 100, 30, [0, 200, 0]);

        let detection = detect_legends(&img, &RegionFilter::default());

        assert!(detection.instances.is_empty());
    }

    #[test]
    fn test_detection_is_deterministic() {
        let mut img = RgbImage::from_pixel(160, 160, Rgb([250, 250, 250]));
        paint(&mut img, 10, 10, 30, 30, [255, 165, 0]);
        paint(&mut img, 60, 20, 40, 15, [128, 0, 255]);
        paint(&mut img, 20, 90, 50, 40, [255, 105, 180]);

        let first = detect_legends(&img, &RegionFilter::default());
        let second = detect_legends(&img, &RegionFilter::default());

        assert_eq!(first.instances.len(), 3);
        assert_eq!(first, second);
    }
}
