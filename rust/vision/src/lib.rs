// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floor plan legend detection, boundary search and scale calibration
//!
//! This crate provides the image analysis core behind planscan:
//! 1. Detecting colored legend markers and classifying their fill pattern
//! 2. Grouping detected markers by color and pattern
//! 3. Extracting a region from a user-picked color sample
//! 4. Locating the rectangle of structural lines around a clicked point
//! 5. Calibrating a pixel scale and measuring real distances
//!
//! # Usage
//!
//! ```rust,ignore
//! use planscan_vision::{detect_legend_groups, image_ops::load_image, VisionConfig};
//!
//! let image = load_image(path, 50)?;
//! let (detection, groups) = detect_legend_groups(&image, &VisionConfig::default());
//!
//! for group in &groups {
//!     println!("{}: {} markers", group.group_key, group.count);
//! }
//! ```

pub mod boundary;
pub mod calibration;
pub mod color;
pub mod config;
pub mod contours;
pub mod error;
pub mod grouping;
pub mod image_ops;
pub mod legend;
pub mod line_ops;
pub mod pattern;
pub mod sampler;
pub mod types;

// Re-export commonly used types and functions
pub use boundary::{enclosing_box, locate_boundary};
pub use calibration::{
    distance, Calibration, CalibrationRequest, CalibrationResponse, GroupTotal,
    GroupedMeasurement, LengthUnit, MeasureRequest, Measurement, MeasurementLog,
    SharedCalibration,
};
pub use color::{segment, segment_any, ColorRange, PaletteBand, PALETTE};
pub use contours::{extract_regions, Region};
pub use error::{Result, VisionError};
pub use grouping::{group_key, group_legends};
pub use image_ops::{decode_image, edge_points, load_image};
pub use legend::detect_legends;
pub use pattern::classify;
pub use sampler::{derive_range, extract_region};
pub use types::{
    BoundaryBox, BoundaryOutcome, BoundingBox, ExtractedRegion, FillPattern, ImageInfo,
    LegendColor, LegendDetection, LegendGroup, LegendInstance, Point2D, Preview, VisionConfig,
};

use image::RgbImage;

/// High-level function to detect legend markers and group them
///
/// This runs the full legend pipeline:
/// 1. Per palette band segmentation and region extraction
/// 2. Size filtering and fill pattern classification
/// 3. Grouping by `color_pattern` key
///
/// # Returns
///
/// The raw detection (instances and preview crops) and the groups built
/// from its instances
pub fn detect_legend_groups(
    image: &RgbImage,
    config: &VisionConfig,
) -> (LegendDetection, Vec<LegendGroup>) {
    let detection = detect_legends(image, &config.region_filter);
    let groups = group_legends(&detection.instances);
    (detection, groups)
}

/// Decode an uploaded image and run legend detection on it
///
/// # Arguments
///
/// * `bytes` - Encoded image file (PNG, JPEG, BMP or TIFF)
/// * `config` - Analysis parameters
pub fn detect_legends_from_bytes(bytes: &[u8], config: &VisionConfig) -> Result<LegendDetection> {
    let image = decode_image(bytes)?;
    Ok(detect_legends(&image, &config.region_filter))
}
