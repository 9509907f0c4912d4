// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Image processing operations shared by the detection pipelines

use std::path::Path;

use image::{GrayImage, ImageReader, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

use crate::error::{Result, VisionError};
use crate::types::{BoundingBox, EdgeDumpConfig, ImageInfo, PixelPoint};

/// Decode an uploaded file held in memory into a 3-channel raster
///
/// Alpha is discarded; the analysis core never looks at it.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage> {
    let reader = ImageReader::new(std::io::Cursor::new(bytes)).with_guessed_format()?;
    Ok(reader.decode()?.to_rgb8())
}

/// Read and decode an image file, refusing files above `max_file_size_mb`
pub fn load_image(path: &Path, max_file_size_mb: u64) -> Result<RgbImage> {
    let size = std::fs::metadata(path)?.len();
    let size_mb = size.div_ceil(1024 * 1024);
    if size_mb > max_file_size_mb {
        return Err(VisionError::FileTooLarge {
            size_mb,
            max_mb: max_file_size_mb,
        });
    }

    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    tracing::debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "decoded image"
    );
    Ok(image.to_rgb8())
}

pub fn image_info(image: &RgbImage) -> ImageInfo {
    ImageInfo {
        width: image.width(),
        height: image.height(),
    }
}

/// Convert an RGB image to grayscale using ITU-R BT.601 luminance
pub fn rgb_to_grayscale(image: &RgbImage) -> GrayImage {
    let mut gray = GrayImage::new(image.width(), image.height());

    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        gray.put_pixel(x, y, Luma([luma.round().min(255.0) as u8]));
    }

    gray
}

/// Canny edge detection on the raw 3x3 Sobel gradient
///
/// The image is not blurred first, so 1-2 px strokes on a colored fill keep
/// their full gradient. Pixels that are a local maximum across the gradient
/// direction become candidates. Candidates at or above `high_threshold` seed
/// edges that grow through 8-connected candidates at or above
/// `low_threshold`. The outermost rows and columns never hold edges.
pub fn canny_edges(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut edges = GrayImage::new(width, height);
    if width < 3 || height < 3 {
        return edges;
    }

    let gx = horizontal_sobel(image);
    let gy = vertical_sobel(image);
    let magnitude: Vec<f32> = gx
        .pixels()
        .zip(gy.pixels())
        .map(|(x, y)| f32::from(x.0[0]).hypot(f32::from(y.0[0])))
        .collect();
    let index = |x: u32, y: u32| (y * width + x) as usize;

    // Non-maximum suppression
    let mut thinned = vec![0.0f32; magnitude.len()];
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let m = magnitude[index(x, y)];
            if m < low_threshold || m == 0.0 {
                continue;
            }
            let (dx, dy) = gradient_step(gx.get_pixel(x, y).0[0], gy.get_pixel(x, y).0[0]);
            let before = magnitude[index(x.wrapping_add_signed(-dx), y.wrapping_add_signed(-dy))];
            let after = magnitude[index(x.wrapping_add_signed(dx), y.wrapping_add_signed(dy))];
            if m > before && m >= after {
                thinned[index(x, y)] = m;
            }
        }
    }

    // Hysteresis
    let mut stack: Vec<(u32, u32)> = Vec::new();
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            if thinned[index(x, y)] >= high_threshold {
                edges.put_pixel(x, y, Luma([255]));
                stack.push((x, y));
            }
        }
    }
    while let Some((x, y)) = stack.pop() {
        for ny in y - 1..=y + 1 {
            for nx in x - 1..=x + 1 {
                if thinned[index(nx, ny)] > 0.0 && edges.get_pixel(nx, ny).0[0] == 0 {
                    edges.put_pixel(nx, ny, Luma([255]));
                    stack.push((nx, ny));
                }
            }
        }
    }

    edges
}

/// Neighbor offset along the gradient, quantized to 45 degree steps
fn gradient_step(gx: i16, gy: i16) -> (i32, i32) {
    let mut angle = f32::from(gy).atan2(f32::from(gx)).to_degrees();
    if angle < 0.0 {
        angle += 180.0;
    }

    if !(22.5..157.5).contains(&angle) {
        (1, 0)
    } else if angle < 67.5 {
        (1, 1)
    } else if angle < 112.5 {
        (0, 1)
    } else {
        (-1, 1)
    }
}

/// Morphological dilation with a square structuring element of side `2 * radius + 1`
pub fn dilate(image: &GrayImage, radius: u8) -> GrayImage {
    imageproc::morphology::dilate(image, Norm::LInf, radius)
}

/// Morphological erosion with a square structuring element of side `2 * radius + 1`
pub fn erode(image: &GrayImage, radius: u8) -> GrayImage {
    imageproc::morphology::erode(image, Norm::LInf, radius)
}

/// Morphological closing (dilate then erode) - fills small gaps
pub fn morphological_close(image: &GrayImage, radius: u8) -> GrayImage {
    let dilated = dilate(image, radius);
    erode(&dilated, radius)
}

/// Morphological opening (erode then dilate) - removes small noise
pub fn morphological_open(image: &GrayImage, radius: u8) -> GrayImage {
    let eroded = erode(image, radius);
    dilate(&eroded, radius)
}

/// Copy a rectangle out of an image
///
/// The rectangle must lie inside the image; callers that accept user input
/// go through [`checked_crop`].
pub fn crop(image: &RgbImage, bounds: &BoundingBox) -> RgbImage {
    image::imageops::crop_imm(image, bounds.x, bounds.y, bounds.width, bounds.height).to_image()
}

/// Copy a rectangle out of an image, rejecting rectangles that fall outside it
pub fn checked_crop(image: &RgbImage, bounds: &BoundingBox) -> Result<RgbImage> {
    if bounds.is_empty() || !bounds.fits_within(image.width(), image.height()) {
        return Err(VisionError::RegionOutOfBounds {
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
            image_width: image.width(),
            image_height: image.height(),
        });
    }
    Ok(crop(image, bounds))
}

/// Square window of `radius` pixels around a point, clamped to the image
pub fn window_around(center_x: i64, center_y: i64, radius: u32, width: u32, height: u32) -> BoundingBox {
    let radius = radius as i64;
    let x0 = (center_x - radius).clamp(0, width as i64);
    let y0 = (center_y - radius).clamp(0, height as i64);
    let x1 = (center_x + radius).clamp(0, width as i64);
    let y1 = (center_y + radius).clamp(0, height as i64);

    BoundingBox::new(x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32)
}

/// Coordinates of every edge pixel after one dilation pass, in row-major order
pub fn edge_points(image: &RgbImage, config: &EdgeDumpConfig) -> Vec<PixelPoint> {
    if image.width() == 0 || image.height() == 0 {
        return Vec::new();
    }

    let gray = rgb_to_grayscale(image);
    let edges = canny_edges(&gray, config.canny_low, config.canny_high);
    let edges = dilate(&edges, config.dilate_radius);

    let points: Vec<PixelPoint> = edges
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] > 0)
        .map(|(x, y, _)| [x, y])
        .collect();

    tracing::debug!(count = points.len(), "collected edge points");
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_rgb_to_grayscale() {
        let mut img = RgbImage::new(2, 2);
        img.put_pixel(0, 0, Rgb([255, 255, 255]));
        img.put_pixel(1, 0, Rgb([0, 0, 0]));
        img.put_pixel(0, 1, Rgb([255, 0, 0]));

        let gray = rgb_to_grayscale(&img);

        assert_eq!(gray.get_pixel(0, 0).0[0], 255);
        assert_eq!(gray.get_pixel(1, 0).0[0], 0);
        assert_eq!(gray.get_pixel(0, 1).0[0], 76);
    }

    #[test]
    fn test_open_removes_speck() {
        let mut img = GrayImage::new(20, 20);
        img.put_pixel(5, 5, Luma([255]));
        for x in 10..16 {
            for y in 10..16 {
                img.put_pixel(x, y, Luma([255]));
            }
        }

        let opened = morphological_open(&img, 1);

        assert_eq!(opened.get_pixel(5, 5).0[0], 0);
        assert_eq!(opened.get_pixel(12, 12).0[0], 255);
    }

    #[test]
    fn test_close_fills_gap() {
        let mut img = GrayImage::new(20, 20);
        for x in 2..18 {
            if x != 9 {
                img.put_pixel(x, 10, Luma([255]));
                img.put_pixel(x, 11, Luma([255]));
                img.put_pixel(x, 12, Luma([255]));
            }
        }

        let closed = morphological_close(&img, 1);

        assert_eq!(closed.get_pixel(9, 11).0[0], 255);
    }

    #[test]
    fn test_canny_step_edge_is_one_pixel_wide() {
        let mut img = GrayImage::new(20, 20);
        for x in 10..20 {
            for y in 0..20 {
                img.put_pixel(x, y, Luma([255]));
            }
        }

        let edges = canny_edges(&img, 50.0, 150.0);

        assert!((1..19).all(|y| edges.get_pixel(9, y).0[0] == 255));
        assert_eq!(edges.pixels().filter(|p| p.0[0] > 0).count(), 18);
    }

    #[test]
    fn test_canny_keeps_thin_low_contrast_stroke() {
        // A 1 px stroke only 40 levels darker than its fill
        let mut img = GrayImage::from_pixel(30, 30, Luma([180]));
        for x in 5..25 {
            img.put_pixel(x, 15, Luma([140]));
        }

        let edges = canny_edges(&img, 20.0, 80.0);

        // Both sides of the stroke
        assert!((6..24).all(|x| edges.get_pixel(x, 14).0[0] == 255));
        assert!((6..24).all(|x| edges.get_pixel(x, 16).0[0] == 255));
        assert!((6..24).all(|x| edges.get_pixel(x, 15).0[0] == 0));
    }

    #[test]
    fn test_canny_on_tiny_image() {
        let img = GrayImage::from_pixel(2, 8, Luma([255]));
        assert_eq!(canny_edges(&img, 20.0, 80.0).dimensions(), (2, 8));
    }

    #[test]
    fn test_window_around_clamps() {
        let window = window_around(20, 400, 150, 300, 500);
        assert_eq!(window, BoundingBox::new(0, 250, 170, 250));

        let inner = window_around(200, 200, 150, 1000, 1000);
        assert_eq!(inner, BoundingBox::new(50, 50, 300, 300));
    }

    #[test]
    fn test_checked_crop_rejects_out_of_bounds() {
        let img = RgbImage::new(50, 50);

        assert!(checked_crop(&img, &BoundingBox::new(40, 40, 20, 5)).is_err());
        assert!(checked_crop(&img, &BoundingBox::new(10, 10, 0, 5)).is_err());

        let cropped = checked_crop(&img, &BoundingBox::new(10, 10, 20, 5)).unwrap();
        assert_eq!(cropped.dimensions(), (20, 5));
    }

    #[test]
    fn test_edge_points_on_flat_image_is_empty() {
        let img = RgbImage::from_pixel(30, 30, Rgb([200, 200, 200]));
        assert!(edge_points(&img, &EdgeDumpConfig::default()).is_empty());
    }

    #[test]
    fn test_edge_points_follow_square_outline() {
        let mut img = RgbImage::from_pixel(60, 60, Rgb([255, 255, 255]));
        for x in 20..40 {
            for y in 20..40 {
                img.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }

        let points = edge_points(&img, &EdgeDumpConfig::default());

        assert!(!points.is_empty());
        assert!(points
            .iter()
            .all(|[x, y]| (15..45).contains(x) && (15..45).contains(y)));
        assert!(!points.contains(&[30, 30]));
    }

    #[test]
    fn test_decode_png_drops_alpha() {
        let rgba = image::RgbaImage::from_pixel(7, 3, image::Rgba([10, 20, 30, 128]));
        let mut bytes = Vec::new();
        rgba.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let decoded = decode_image(&bytes).unwrap();

        assert_eq!(image_info(&decoded), ImageInfo { width: 7, height: 3 });
        assert_eq!(decoded.get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn test_load_image_enforces_size_limit() {
        let path = std::env::temp_dir().join(format!("planscan-limit-{}.png", std::process::id()));
        RgbImage::from_pixel(4, 4, Rgb([1, 2, 3])).save(&path).unwrap();

        let too_large = load_image(&path, 0);
        let loaded = load_image(&path, 50);
        std::fs::remove_file(&path).ok();

        assert!(matches!(
            too_large,
            Err(VisionError::FileTooLarge { size_mb: 1, max_mb: 0 })
        ));
        assert_eq!(loaded.unwrap().dimensions(), (4, 4));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_image(Path::new("/nonexistent/plan.png"), 50);
        assert!(matches!(result, Err(VisionError::Io(_))));
    }
}
