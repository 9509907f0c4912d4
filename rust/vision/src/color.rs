// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HSV color ranges, the legend palette and color segmentation
//!
//! Hue follows the 8-bit convention of half degrees (0..=179); saturation
//! and value use the full byte.

use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::image_ops::{morphological_close, morphological_open};
use crate::types::LegendColor;

/// Largest hue value (half degrees)
pub const HUE_MAX: u8 = 179;

/// Largest saturation/value
pub const CHANNEL_MAX: u8 = 255;

/// Radius of the 3x3 square element used to clean masks
const MASK_CLEANUP_RADIUS: u8 = 1;

/// Image whose three channels hold hue, saturation and value
pub type HsvImage = ImageBuffer<Rgb<u8>, Vec<u8>>;

/// Inclusive box in HSV space
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ColorRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl ColorRange {
    /// Build a range, clamping hue bounds into 0..=179
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self {
            lower: [clamp_hue(lower[0]), lower[1], lower[2]],
            upper: [clamp_hue(upper[0]), upper[1], upper[2]],
        }
    }

    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|c| self.lower[c] <= hsv[c] && hsv[c] <= self.upper[c])
    }

    /// Whether the hue bounds cover the whole hue circle
    pub fn spans_all_hues(&self) -> bool {
        self.lower[0] == 0 && self.upper[0] == HUE_MAX
    }
}

const fn clamp_hue(h: u8) -> u8 {
    if h > HUE_MAX {
        HUE_MAX
    } else {
        h
    }
}

/// One row of the palette table
///
/// Red wraps around hue 0, so it needs a second band near the top of the
/// hue circle. Both bands report [`LegendColor::Red`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaletteBand {
    Red,
    RedUpper,
    Green,
    Blue,
    Orange,
    Pink,
    Cyan,
    Yellow,
    Purple,
}

impl PaletteBand {
    /// Output color of the band
    pub fn color(self) -> LegendColor {
        match self {
            PaletteBand::Red | PaletteBand::RedUpper => LegendColor::Red,
            PaletteBand::Green => LegendColor::Green,
            PaletteBand::Blue => LegendColor::Blue,
            PaletteBand::Orange => LegendColor::Orange,
            PaletteBand::Pink => LegendColor::Pink,
            PaletteBand::Cyan => LegendColor::Cyan,
            PaletteBand::Yellow => LegendColor::Yellow,
            PaletteBand::Purple => LegendColor::Purple,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PaletteBand::RedUpper => "red2",
            other => other.color().as_str(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteEntry {
    pub band: PaletteBand,
    pub range: ColorRange,
}

const fn entry(band: PaletteBand, lower: [u8; 3], upper: [u8; 3]) -> PaletteEntry {
    PaletteEntry {
        band,
        range: ColorRange::new(lower, upper),
    }
}

/// Fixed legend palette, scanned in this order
pub const PALETTE: [PaletteEntry; 9] = [
    entry(PaletteBand::Red, [0, 100, 100], [10, 255, 255]),
    entry(PaletteBand::RedUpper, [170, 100, 100], [179, 255, 255]),
    entry(PaletteBand::Green, [35, 50, 50], [85, 255, 255]),
    entry(PaletteBand::Blue, [101, 50, 50], [130, 255, 255]),
    entry(PaletteBand::Orange, [11, 100, 100], [25, 255, 255]),
    entry(PaletteBand::Pink, [146, 30, 100], [169, 255, 255]),
    entry(PaletteBand::Cyan, [86, 50, 50], [100, 255, 255]),
    entry(PaletteBand::Yellow, [26, 100, 100], [34, 255, 255]),
    entry(PaletteBand::Purple, [131, 50, 50], [145, 255, 255]),
];

/// Convert one RGB pixel to 8-bit HSV
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(f32::from);

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max == 0.0 { 0.0 } else { 255.0 * delta / max };

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    let mut h_byte = (h / 2.0).round() as u16;
    if h_byte > HUE_MAX as u16 {
        h_byte = 0;
    }

    [h_byte as u8, s.round() as u8, max as u8]
}

/// Convert a whole image to HSV
pub fn to_hsv(image: &RgbImage) -> HsvImage {
    let mut hsv = HsvImage::new(image.width(), image.height());
    for (src, dst) in image.pixels().zip(hsv.pixels_mut()) {
        *dst = Rgb(rgb_to_hsv(src.0));
    }
    hsv
}

/// Binary mask of the pixels inside `range`, cleaned by closing then opening
pub fn segment(image: &RgbImage, range: &ColorRange) -> GrayImage {
    segment_hsv(&to_hsv(image), range)
}

/// Mask of the pixels inside any of `ranges`, e.g. both red hue bands
pub fn segment_any(image: &RgbImage, ranges: &[ColorRange]) -> GrayImage {
    segment_hsv_any(&to_hsv(image), ranges)
}

/// Same as [`segment`] for an image already converted to HSV
pub fn segment_hsv(hsv: &HsvImage, range: &ColorRange) -> GrayImage {
    segment_hsv_any(hsv, std::slice::from_ref(range))
}

/// Mask of the pixels inside any of `ranges`
pub fn segment_hsv_any(hsv: &HsvImage, ranges: &[ColorRange]) -> GrayImage {
    let mut mask = GrayImage::new(hsv.width(), hsv.height());
    if hsv.width() == 0 || hsv.height() == 0 {
        return mask;
    }

    for (src, dst) in hsv.pixels().zip(mask.pixels_mut()) {
        if ranges.iter().any(|r| r.contains(src.0)) {
            *dst = Luma([255]);
        }
    }

    let closed = morphological_close(&mask, MASK_CLEANUP_RADIUS);
    morphological_open(&closed, MASK_CLEANUP_RADIUS)
}

/// Number of set pixels in a mask
pub fn mask_coverage(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| p.0[0] > 0).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_to_hsv_primaries() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
        assert_eq!(rgb_to_hsv([255, 255, 255]), [0, 0, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 0]), [0, 0, 0]);
    }

    #[test]
    fn test_rgb_to_hsv_wraps_near_red() {
        let [h, s, v] = rgb_to_hsv([255, 0, 40]);
        assert_eq!(h, 175);
        assert_eq!(s, 255);
        assert_eq!(v, 255);
    }

    #[test]
    fn test_range_clamps_hue() {
        let range = ColorRange::new([200, 0, 0], [250, 255, 255]);
        assert_eq!(range.lower[0], HUE_MAX);
        assert_eq!(range.upper[0], HUE_MAX);
    }

    #[test]
    fn test_palette_normalizes_red_bands() {
        let red_bands: Vec<_> = PALETTE
            .iter()
            .filter(|e| e.band.color() == LegendColor::Red)
            .collect();
        assert_eq!(red_bands.len(), 2);
        assert_eq!(PaletteBand::RedUpper.label(), "red2");
        assert_eq!(PaletteBand::Red.label(), "red");
    }

    #[test]
    fn test_background_gives_empty_mask() {
        let white = RgbImage::from_pixel(40, 30, Rgb([255, 255, 255]));
        let gray = RgbImage::from_pixel(40, 30, Rgb([128, 128, 128]));

        for entry in PALETTE.iter() {
            assert_eq!(mask_coverage(&segment(&white, &entry.range)), 0);
            assert_eq!(mask_coverage(&segment(&gray, &entry.range)), 0);
        }
    }

    #[test]
    fn test_zero_size_image() {
        let empty = RgbImage::new(0, 0);
        let mask = segment(&empty, &PALETTE[0].range);
        assert_eq!(mask.dimensions(), (0, 0));
    }

    #[test]
    fn test_segment_finds_square_and_drops_speck() {
        let mut img = RgbImage::from_pixel(50, 50, Rgb([255, 255, 255]));
        for x in 10..30 {
            for y in 10..25 {
                img.put_pixel(x, y, Rgb([0, 0, 255]));
            }
        }
        img.put_pixel(40, 40, Rgb([0, 0, 255]));

        let blue = PALETTE
            .iter()
            .find(|e| e.band == PaletteBand::Blue)
            .map(|e| e.range)
            .unwrap();
        let mask = segment(&img, &blue);

        assert_eq!(mask_coverage(&mask), 20 * 15);
        assert_eq!(mask.get_pixel(40, 40).0[0], 0);
        assert_eq!(mask.get_pixel(15, 15).0[0], 255);
    }

    #[test]
    fn test_segment_any_merges_ranges() {
        let mut img = RgbImage::from_pixel(40, 20, Rgb([255, 255, 255]));
        for y in 5..15 {
            for x in 2..12 {
                img.put_pixel(x, y, Rgb([255, 0, 0]));
            }
            for x in 25..35 {
                img.put_pixel(x, y, Rgb([255, 0, 40]));
            }
        }

        let ranges = [PALETTE[0].range, PALETTE[1].range];
        let mask = segment_any(&img, &ranges);

        assert_eq!(mask_coverage(&mask), 200);
    }
}
