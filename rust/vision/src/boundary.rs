// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Click-driven boundary search
//!
//! Finds the tightest axis-aligned rectangle formed by structural lines
//! around a clicked point, used to measure the length and thickness of
//! walls and fixtures.

use image::RgbImage;

use crate::image_ops::{canny_edges, crop, rgb_to_grayscale, window_around};
use crate::line_ops::{detect_lines, merge_parallel_lines, LineSegment};
use crate::types::{BoundaryBox, BoundaryConfig, BoundaryOutcome, BoundingBox, Point2D};

/// Search for the rectangle enclosing the center of `click`
pub fn locate_boundary(
    image: &RgbImage,
    click: &BoundingBox,
    config: &BoundaryConfig,
) -> BoundaryOutcome {
    let click_x = click.x as i64 + (click.width / 2) as i64;
    let click_y = click.y as i64 + (click.height / 2) as i64;

    let window = window_around(
        click_x,
        click_y,
        config.window_radius,
        image.width(),
        image.height(),
    );
    if window.is_empty() {
        tracing::debug!(click_x, click_y, "click window lies outside the image");
        return BoundaryOutcome::NoStructuralLines;
    }

    let gray = rgb_to_grayscale(&crop(image, &window));
    let edges = canny_edges(&gray, config.canny_low, config.canny_high);
    let lines = detect_lines(
        &edges,
        config.hough_threshold,
        config.min_line_length,
        config.max_line_gap,
    );
    let lines = merge_parallel_lines(&lines, config.axis_tolerance, config.merge_distance);

    if lines.is_empty() {
        tracing::debug!(?window, "no structural lines in search window");
        return BoundaryOutcome::NoStructuralLines;
    }

    let local_click = Point2D::new(
        (click_x - window.x as i64) as f64,
        (click_y - window.y as i64) as f64,
    );

    match enclosing_box(&lines, local_click, window.width, window.height, config) {
        Some(mut found) => {
            found.x += window.x;
            found.y += window.y;
            tracing::debug!(
                lines = lines.len(),
                x = found.x,
                y = found.y,
                width = found.width,
                height = found.height,
                angle = found.angle,
                "located boundary"
            );
            BoundaryOutcome::Found(found)
        }
        None => {
            tracing::debug!(lines = lines.len(), "no enclosed boundary around click");
            BoundaryOutcome::NoEnclosedBoundary
        }
    }
}

/// Nearest enclosing rectangle around `click` in window coordinates
///
/// Horizontal lines spanning the click's column bound the box above and
/// below, vertical lines spanning its row bound it left and right. Sides
/// without a line stay on the window edge. Returns `None` when the box is
/// degenerate or nearly as large as the window.
pub fn enclosing_box(
    lines: &[LineSegment],
    click: Point2D,
    window_width: u32,
    window_height: u32,
    config: &BoundaryConfig,
) -> Option<BoundaryBox> {
    let mut top = 0.0f64;
    let mut bottom = window_height as f64;
    let mut left = 0.0f64;
    let mut right = window_width as f64;

    for line in lines {
        if line.dy() < config.axis_tolerance {
            if click.x <= line.min_x() || click.x >= line.max_x() {
                continue;
            }
            let y = ((line.start.y + line.end.y) / 2.0).round();
            if y < click.y {
                top = top.max(y);
            } else if y > click.y {
                bottom = bottom.min(y);
            }
        } else if line.dx() < config.axis_tolerance {
            if click.y <= line.min_y() || click.y >= line.max_y() {
                continue;
            }
            let x = ((line.start.x + line.end.x) / 2.0).round();
            if x < click.x {
                left = left.max(x);
            } else if x > click.x {
                right = right.min(x);
            }
        }
    }

    let width = right - left;
    let height = bottom - top;

    let min_side = config.min_side as f64;
    if width < min_side
        || height < min_side
        || width > config.max_fraction * window_width as f64
        || height > config.max_fraction * window_height as f64
    {
        return None;
    }

    let (length, thickness, angle) = if width > config.elongation_ratio * height {
        (width, height, 0.0)
    } else if height > config.elongation_ratio * width {
        (height, width, 90.0)
    } else {
        (width.max(height), width.min(height), 0.0)
    };

    Some(BoundaryBox {
        x: left as u32,
        y: top as u32,
        width: width as u32,
        height: height as u32,
        length,
        thickness,
        angle,
    })
}
