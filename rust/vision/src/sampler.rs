// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Color ranges inferred from a user-picked sample, and click-driven
//! region extraction built on them

use image::RgbImage;

use crate::color::{rgb_to_hsv, segment, ColorRange, CHANNEL_MAX, HUE_MAX};
use crate::contours::{extract_regions, Region};
use crate::error::{Result, VisionError};
use crate::image_ops::{checked_crop, crop};
use crate::types::{BoundingBox, ExtractedRegion, SamplerConfig};

/// Derive a tolerant color range covering every pixel of `sample`
///
/// Desaturated samples (gray, white, black) have an unstable hue, so their
/// range spans every hue and only saturation and value are relaxed.
pub fn derive_range(sample: &RgbImage, config: &SamplerConfig) -> Result<ColorRange> {
    let count = sample.width() as u64 * sample.height() as u64;
    if count == 0 {
        return Err(VisionError::InvalidParameters(
            "color sample is empty".to_string(),
        ));
    }

    let mut lower = [u8::MAX; 3];
    let mut upper = [0u8; 3];
    let mut saturation_sum = 0u64;

    for pixel in sample.pixels() {
        let hsv = rgb_to_hsv(pixel.0);
        for c in 0..3 {
            lower[c] = lower[c].min(hsv[c]);
            upper[c] = upper[c].max(hsv[c]);
        }
        saturation_sum += hsv[1] as u64;
    }

    let mean_saturation = saturation_sum as f64 / count as f64;

    let (hue_low, hue_high) = if mean_saturation < config.gray_saturation {
        (0, HUE_MAX)
    } else {
        (
            lower[0].saturating_sub(config.hue_tolerance),
            upper[0].saturating_add(config.hue_tolerance).min(HUE_MAX),
        )
    };

    let range = ColorRange::new(
        [
            hue_low,
            lower[1].saturating_sub(config.saturation_tolerance),
            lower[2].saturating_sub(config.value_tolerance),
        ],
        [
            hue_high,
            upper[1].saturating_add(config.saturation_tolerance).min(CHANNEL_MAX),
            upper[2].saturating_add(config.value_tolerance).min(CHANNEL_MAX),
        ],
    );

    tracing::debug!(
        mean_saturation,
        lower = ?range.lower,
        upper = ?range.upper,
        "derived sample color range"
    );
    Ok(range)
}

/// Extract the region of the sampled color under a user selection
///
/// A patch of `sample_radius` pixels around the selection center gives the
/// color range. The selection grown by `search_margin` is segmented with it,
/// and the connected region under the selection center is returned in image
/// coordinates. The selection may be larger or smaller than that region.
/// When no region lies under the center, the largest one overlapping the
/// selection is used, and failing that the selection itself.
pub fn extract_region(
    image: &RgbImage,
    bounds: &BoundingBox,
    config: &SamplerConfig,
) -> Result<ExtractedRegion> {
    let (width, height) = image.dimensions();
    if bounds.is_empty() || !bounds.fits_within(width, height) {
        return Err(VisionError::RegionOutOfBounds {
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
            image_width: width,
            image_height: height,
        });
    }

    let center_x = bounds.x + bounds.width / 2;
    let center_y = bounds.y + bounds.height / 2;
    let patch = sample_patch(bounds, center_x, center_y, config.sample_radius);
    let range = derive_range(&checked_crop(image, &patch)?, config)?;

    let search = bounds.expanded(config.search_margin, width, height);
    let mask = segment(&crop(image, &search), &range);
    let regions = extract_regions(&mask);

    let local_selection = BoundingBox::new(
        bounds.x - search.x,
        bounds.y - search.y,
        bounds.width,
        bounds.height,
    );
    let (local_x, local_y) = (center_x - search.x, center_y - search.y);

    let chosen = largest(
        regions
            .iter()
            .filter(|r| r.bounding_box.contains(local_x, local_y)),
    )
    .or_else(|| {
        largest(
            regions
                .iter()
                .filter(|r| r.bounding_box.intersects(&local_selection)),
        )
    });

    let bounding_box = match chosen {
        Some(region) => region.bounding_box.offset(search.x, search.y),
        None => *bounds,
    };

    tracing::debug!(
        ?bounds,
        ?search,
        regions = regions.len(),
        ?bounding_box,
        "extracted sampled region"
    );

    Ok(ExtractedRegion {
        bounding_box,
        range,
        preview: format!(
            "region_{}_{}_{}x{}.png",
            bounding_box.x, bounding_box.y, bounding_box.width, bounding_box.height
        ),
        crop: crop(image, &bounding_box),
    })
}

/// Square patch of `radius` pixels around `(x, y)`, kept inside `bounds`
fn sample_patch(bounds: &BoundingBox, x: u32, y: u32, radius: u32) -> BoundingBox {
    let x0 = x.saturating_sub(radius).max(bounds.x);
    let y0 = y.saturating_sub(radius).max(bounds.y);
    let x1 = x.saturating_add(radius + 1).min(bounds.right());
    let y1 = y.saturating_add(radius + 1).min(bounds.bottom());

    BoundingBox::new(x0, y0, x1 - x0, y1 - y0)
}

/// Region with the largest area, the first one on ties
fn largest<'a>(regions: impl Iterator<Item = &'a Region>) -> Option<&'a Region> {
    regions.fold(None, |best: Option<&Region>, region| match best {
        Some(b) if b.area >= region.area => Some(b),
        _ => Some(region),
    })
}
