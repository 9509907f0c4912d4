// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for vision operations
pub type Result<T> = std::result::Result<T, VisionError>;

/// Errors raised by the analysis core
///
/// Only I/O-adjacent problems are errors. Heuristics always produce a
/// result, and "nothing found" outcomes are modelled as enum variants on
/// the operation's return type.
#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Image could not be decoded: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Image file could not be read: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image file is {size_mb} MB, maximum is {max_mb} MB")]
    FileTooLarge { size_mb: u64, max_mb: u64 },

    #[error("Configuration file is not valid JSON: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Region {x},{y} {width}x{height} lies outside the {image_width}x{image_height} image")]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },
}
