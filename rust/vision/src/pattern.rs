// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fill pattern classification of legend crops
//!
//! The classifier is an ordered rule cascade over three measurements of the
//! crop: grayscale variance, Canny edge density and the orientation mix of
//! short Hough segments. Rules are evaluated top to bottom and the first
//! match wins, so the statistical fallback can still report `Hatched` after
//! the line-count rule declined.

use image::{GrayImage, RgbImage};

use crate::image_ops::{canny_edges, rgb_to_grayscale};
use crate::line_ops::{detect_lines, LineSegment};
use crate::types::FillPattern;

/// Crops smaller than this on either side are reported as solid
pub const MIN_CROP_SIDE: u32 = 10;

pub const CANNY_LOW: f32 = 20.0;
pub const CANNY_HIGH: f32 = 80.0;

pub const HOUGH_THRESHOLD: u32 = 10;
pub const MIN_SEGMENT_LENGTH: f64 = 8.0;
pub const MAX_SEGMENT_GAP: f64 = 3.0;

/// Segments needed for any orientation rule to fire
pub const MIN_ORIENTED_SEGMENTS: usize = 3;

pub const HATCH_VARIANCE: f64 = 200.0;
pub const HATCH_EDGE_DENSITY: f64 = 0.05;
pub const SOLID_VARIANCE: f64 = 100.0;
pub const DOTTED_EDGE_DENSITY: f64 = 0.15;

/// Orientation bucket of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Diagonal,
    Horizontal,
    Vertical,
    Other,
}

impl Orientation {
    /// Bucket an absolute angle in degrees, [0, 180]
    pub fn from_degrees(angle: f64) -> Self {
        if (30.0..=60.0).contains(&angle) || (120.0..=150.0).contains(&angle) {
            Orientation::Diagonal
        } else if angle < 20.0 || angle > 160.0 {
            Orientation::Horizontal
        } else if (70.0..=110.0).contains(&angle) {
            Orientation::Vertical
        } else {
            Orientation::Other
        }
    }
}

/// Measurements the rule cascade decides on
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PatternFeatures {
    pub variance: f64,
    pub edge_density: f64,
    pub segments: usize,
    pub diagonal: usize,
    pub horizontal: usize,
    pub vertical: usize,
}

impl PatternFeatures {
    pub fn measure(crop: &RgbImage) -> Self {
        let gray = rgb_to_grayscale(crop);
        let edges = canny_edges(&gray, CANNY_LOW, CANNY_HIGH);
        let lines = detect_lines(&edges, HOUGH_THRESHOLD, MIN_SEGMENT_LENGTH, MAX_SEGMENT_GAP);

        let mut features = PatternFeatures {
            variance: variance(&gray),
            edge_density: edge_density(&edges),
            ..Default::default()
        };
        features.count_orientations(&lines);
        features
    }

    fn count_orientations(&mut self, lines: &[LineSegment]) {
        self.segments = lines.len();
        for line in lines {
            match Orientation::from_degrees(line.angle_degrees()) {
                Orientation::Diagonal => self.diagonal += 1,
                Orientation::Horizontal => self.horizontal += 1,
                Orientation::Vertical => self.vertical += 1,
                Orientation::Other => {}
            }
        }
    }

    /// Run the rule cascade
    pub fn decide(&self) -> FillPattern {
        if self.segments >= MIN_ORIENTED_SEGMENTS && self.diagonal >= MIN_ORIENTED_SEGMENTS {
            return FillPattern::Hatched;
        }
        if self.horizontal >= MIN_ORIENTED_SEGMENTS || self.vertical >= MIN_ORIENTED_SEGMENTS {
            return FillPattern::Striped;
        }

        if self.variance > HATCH_VARIANCE && self.edge_density > HATCH_EDGE_DENSITY {
            FillPattern::Hatched
        } else if self.variance < SOLID_VARIANCE {
            FillPattern::Solid
        } else if self.edge_density > DOTTED_EDGE_DENSITY {
            FillPattern::Dotted
        } else {
            FillPattern::Patterned
        }
    }
}

/// Classify the fill pattern of a region crop
pub fn classify(crop: &RgbImage) -> FillPattern {
    if crop.width() < MIN_CROP_SIDE || crop.height() < MIN_CROP_SIDE {
        return FillPattern::Solid;
    }

    let features = PatternFeatures::measure(crop);
    let pattern = features.decide();
    tracing::trace!(
        variance = features.variance,
        edge_density = features.edge_density,
        segments = features.segments,
        diagonal = features.diagonal,
        horizontal = features.horizontal,
        vertical = features.vertical,
        %pattern,
        "classified fill pattern"
    );
    pattern
}

/// Population variance of the gray levels
fn variance(gray: &GrayImage) -> f64 {
    let n = (gray.width() * gray.height()) as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mean = gray.pixels().map(|p| p.0[0] as f64).sum::<f64>() / n;
    gray.pixels()
        .map(|p| {
            let d = p.0[0] as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n
}

fn edge_density(edges: &GrayImage) -> f64 {
    let n = (edges.width() * edges.height()) as f64;
    if n == 0.0 {
        return 0.0;
    }
    edges.pixels().filter(|p| p.0[0] > 0).count() as f64 / n
}
