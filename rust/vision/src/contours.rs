// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connected region extraction from binary masks

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::region_labelling::{connected_components, Connectivity};
use rustc_hash::FxHashMap;

use crate::types::{BoundingBox, ExtremePoints, PixelPoint, RegionFilter};

/// Outermost connected blob of a mask
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Number of labelled mask pixels in the blob
    ///
    /// Hole pixels are not counted, so a ring has a smaller area than the
    /// rectangle its outer contour encloses.
    pub area: u32,
    pub bounding_box: BoundingBox,
    pub extreme_points: ExtremePoints,
}

/// Find the outer regions of a mask in border-following discovery order
///
/// Holes, and blobs sitting inside holes, are not reported.
pub fn extract_regions(mask: &GrayImage) -> Vec<Region> {
    if mask.width() == 0 || mask.height() == 0 {
        return Vec::new();
    }

    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));
    let mut pixel_counts: FxHashMap<u32, u32> = FxHashMap::default();
    for label in labels.pixels() {
        if label.0[0] != 0 {
            *pixel_counts.entry(label.0[0]).or_default() += 1;
        }
    }

    find_contours::<u32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|contour| {
            let points: Vec<PixelPoint> = contour.points.iter().map(|p| [p.x, p.y]).collect();
            let first = points.first()?;
            let label = labels.get_pixel(first[0], first[1]).0[0];
            let area = pixel_counts.get(&label).copied().unwrap_or(points.len() as u32);
            summarize(&points, area)
        })
        .collect()
}

/// Bounding box and extreme points of a contour
///
/// Ties on an extreme go to the first point in contour order.
fn summarize(points: &[PixelPoint], area: u32) -> Option<Region> {
    let first = *points.first()?;
    let mut left = first;
    let mut right = first;
    let mut top = first;
    let mut bottom = first;

    for &p in &points[1..] {
        if p[0] < left[0] {
            left = p;
        }
        if p[0] > right[0] {
            right = p;
        }
        if p[1] < top[1] {
            top = p;
        }
        if p[1] > bottom[1] {
            bottom = p;
        }
    }

    Some(Region {
        area,
        bounding_box: BoundingBox::new(
            left[0],
            top[1],
            right[0] - left[0] + 1,
            bottom[1] - top[1] + 1,
        ),
        extreme_points: ExtremePoints {
            left,
            right,
            top,
            bottom,
        },
    })
}

impl RegionFilter {
    /// Whether a region is plausibly a legend rather than noise or background
    pub fn accepts(&self, region: &Region, image_width: u32, image_height: u32) -> bool {
        let bbox = &region.bounding_box;
        region.area > self.min_area
            && bbox.width >= self.min_side
            && bbox.height >= self.min_side
            && bbox.width as f64 <= self.max_fraction * image_width as f64
            && bbox.height as f64 <= self.max_fraction * image_height as f64
    }
}
