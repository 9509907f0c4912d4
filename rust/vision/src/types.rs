// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core types shared by the legend, boundary and calibration pipelines

use image::RgbImage;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::color::ColorRange;

/// Integer pixel coordinate serialized as `[x, y]`
pub type PixelPoint = [u32; 2];

/// A 2D point (simplified for serialization)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn to_nalgebra(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    pub fn distance_to(&self, other: &Point2D) -> f64 {
        nalgebra::distance(&self.to_nalgebra(), &other.to_nalgebra())
    }
}

/// Axis-aligned pixel rectangle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether the rectangle fits entirely inside a `width` x `height` image
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= width && self.bottom() <= height
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.x..self.right()).contains(&x) && (self.y..self.bottom()).contains(&y)
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Grow by `margin` on every side, clamped to a `width` x `height` image
    pub fn expanded(&self, margin: u32, width: u32, height: u32) -> BoundingBox {
        let x0 = self.x.saturating_sub(margin);
        let y0 = self.y.saturating_sub(margin);
        let x1 = self.right().saturating_add(margin).min(width);
        let y1 = self.bottom().saturating_add(margin).min(height);

        BoundingBox::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }

    /// Same rectangle shifted by `(dx, dy)`
    pub fn offset(&self, dx: u32, dy: u32) -> BoundingBox {
        BoundingBox::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// Leftmost, rightmost, topmost and bottommost pixel of a region
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtremePoints {
    pub left: PixelPoint,
    pub right: PixelPoint,
    pub top: PixelPoint,
    pub bottom: PixelPoint,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Output color names of the legend palette
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LegendColor {
    Red,
    Green,
    Blue,
    Orange,
    Pink,
    Cyan,
    Yellow,
    Purple,
}

impl LegendColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            LegendColor::Red => "red",
            LegendColor::Green => "green",
            LegendColor::Blue => "blue",
            LegendColor::Orange => "orange",
            LegendColor::Pink => "pink",
            LegendColor::Cyan => "cyan",
            LegendColor::Yellow => "yellow",
            LegendColor::Purple => "purple",
        }
    }
}

impl std::fmt::Display for LegendColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fill pattern of a legend marker
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FillPattern {
    Solid,
    Hatched,
    Striped,
    Dotted,
    Patterned,
}

impl FillPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            FillPattern::Solid => "solid",
            FillPattern::Hatched => "hatched",
            FillPattern::Striped => "striped",
            FillPattern::Dotted => "dotted",
            FillPattern::Patterned => "patterned",
        }
    }
}

impl std::fmt::Display for FillPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected legend marker
///
/// `id` is a sequence number within a single detection pass and is not
/// stable across passes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LegendInstance {
    pub id: u32,
    pub color: LegendColor,
    pub pattern: FillPattern,
    pub bounding_box: BoundingBox,
    pub extreme_points: ExtremePoints,
    pub dimensions: Dimensions,
    /// Name of the preview crop handed back alongside the instances
    pub preview: String,
}

/// Legend instances sharing a color and a fill pattern
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LegendGroup {
    pub group_key: String,
    pub color: LegendColor,
    pub pattern: FillPattern,
    pub sample_preview: String,
    pub sample_instance_id: u32,
    pub count: usize,
    pub instances: Vec<LegendInstance>,
}

/// A cropped sub-image the shell is expected to persist under `name`
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub name: String,
    pub image: RgbImage,
}

/// Result of one full-image legend scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegendDetection {
    pub instances: Vec<LegendInstance>,
    pub previews: Vec<Preview>,
}

/// Region pulled out around a user-selected color sample
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedRegion {
    pub bounding_box: BoundingBox,
    pub range: ColorRange,
    pub preview: String,
    #[serde(skip)]
    pub crop: RgbImage,
}

/// Tight rectangle found around a clicked structural element
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub length: f64,
    pub thickness: f64,
    /// 0 for horizontal or square-ish boxes, 90 for vertical ones
    pub angle: f64,
}

/// Outcome of a boundary search
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum BoundaryOutcome {
    Found(BoundaryBox),
    /// The line detector returned nothing inside the search window
    NoStructuralLines,
    /// Lines were found but the enclosing box failed the size filters
    NoEnclosedBoundary,
}

impl BoundaryOutcome {
    pub fn found(&self) -> Option<&BoundaryBox> {
        match self {
            BoundaryOutcome::Found(b) => Some(b),
            _ => None,
        }
    }
}

/// Dimensions reported back to the shell after decoding an upload
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
}

/// Size limits a connected region must satisfy to count as a legend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegionFilter {
    /// Regions with area at or below this are noise
    pub min_area: u32,
    /// Minimum bounding box side in pixels
    pub min_side: u32,
    /// Maximum bounding box side as a fraction of the image side
    pub max_fraction: f64,
}

impl Default for RegionFilter {
    fn default() -> Self {
        Self {
            min_area: 50,
            min_side: 10,
            max_fraction: 0.8,
        }
    }
}

/// Parameters of the click-driven boundary search
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Half size of the square search window around the click
    pub window_radius: u32,
    /// Canny edge detection low threshold
    pub canny_low: f32,
    /// Canny edge detection high threshold
    pub canny_high: f32,
    /// Hough line detection vote threshold
    pub hough_threshold: u32,
    /// Minimum line length in pixels
    pub min_line_length: f64,
    /// Maximum gap between line segments to connect
    pub max_line_gap: f64,
    /// Endpoint offset below which a segment counts as axis-aligned
    pub axis_tolerance: f64,
    /// Smallest accepted box side in pixels
    pub min_side: u32,
    /// Largest accepted box side as a fraction of the window side
    pub max_fraction: f64,
    /// Side ratio above which a box is considered elongated
    pub elongation_ratio: f64,
    /// Parallel edges closer than this merge into one line, in pixels
    pub merge_distance: f64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            window_radius: 150,
            canny_low: 50.0,
            canny_high: 150.0,
            hough_threshold: 30,
            min_line_length: 20.0,
            max_line_gap: 10.0,
            axis_tolerance: 5.0,
            min_side: 5,
            max_fraction: 0.9,
            elongation_ratio: 1.2,
            merge_distance: 4.0,
        }
    }
}

/// Tolerances applied around a user-picked color sample
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SamplerConfig {
    pub hue_tolerance: u8,
    pub saturation_tolerance: u8,
    pub value_tolerance: u8,
    /// Mean saturation below which the sample is treated as gray
    pub gray_saturation: f64,
    /// Half size of the patch sampled at the center of a selection
    pub sample_radius: u32,
    /// Margin around a selection searched for the sampled color
    pub search_margin: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            hue_tolerance: 10,
            saturation_tolerance: 30,
            value_tolerance: 50,
            gray_saturation: 40.0,
            sample_radius: 2,
            search_margin: 100,
        }
    }
}

/// Parameters of the edge-point dump
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EdgeDumpConfig {
    pub canny_low: f32,
    pub canny_high: f32,
    /// Dilation radius applied once to the edge map (1 = 3x3 square)
    pub dilate_radius: u8,
}

impl Default for EdgeDumpConfig {
    fn default() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 150.0,
            dilate_radius: 1,
        }
    }
}

/// Complete configuration of the analysis core
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub region_filter: RegionFilter,
    pub boundary: BoundaryConfig,
    pub sampler: SamplerConfig,
    pub edges: EdgeDumpConfig,
}
