// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Line segment detection on edge maps

use crate::types::Point2D;
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Peaks examined per detection call, strongest first
const MAX_PEAKS: usize = 500;

/// Distance in pixels within which an edge point is assigned to a peak line
const RHO_BAND: f64 = 2.0;

/// Straight segment between two edge pixels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LineSegment {
    pub start: Point2D,
    pub end: Point2D,
}

impl LineSegment {
    pub fn new(start: Point2D, end: Point2D) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }

    /// Absolute angle from horizontal in degrees, within [0, 180]
    pub fn angle_degrees(&self) -> f64 {
        (self.end.y - self.start.y)
            .atan2(self.end.x - self.start.x)
            .to_degrees()
            .abs()
    }

    pub fn dx(&self) -> f64 {
        (self.end.x - self.start.x).abs()
    }

    pub fn dy(&self) -> f64 {
        (self.end.y - self.start.y).abs()
    }

    pub fn min_x(&self) -> f64 {
        self.start.x.min(self.end.x)
    }

    pub fn max_x(&self) -> f64 {
        self.start.x.max(self.end.x)
    }

    pub fn min_y(&self) -> f64 {
        self.start.y.min(self.end.y)
    }

    pub fn max_y(&self) -> f64 {
        self.start.y.max(self.end.y)
    }
}

/// Detect line segments using a probabilistic Hough transform
///
/// Votes every edge pixel into a 1 px / 1 degree accumulator, then walks the
/// peaks strongest first. Each peak collects the still-unclaimed edge points
/// near its line, orders them along the line and splits them wherever two
/// consecutive points are more than `max_line_gap` apart. Pieces at least
/// `min_line_length` long become segments and claim their points.
pub fn detect_lines(
    edges: &GrayImage,
    threshold: u32,
    min_line_length: f64,
    max_line_gap: f64,
) -> Vec<LineSegment> {
    let width = edges.width();
    let height = edges.height();

    let rho_resolution = 1.0;
    let theta_resolution = PI / 180.0;
    let num_thetas = (PI / theta_resolution).round() as usize;

    let mut cos_table = Vec::with_capacity(num_thetas);
    let mut sin_table = Vec::with_capacity(num_thetas);
    for i in 0..num_thetas {
        let theta = i as f64 * theta_resolution;
        cos_table.push(theta.cos());
        sin_table.push(theta.sin());
    }

    let max_rho = (width as f64).hypot(height as f64);
    let num_rhos = (2.0 * max_rho / rho_resolution) as usize + 1;
    let rho_offset = max_rho;

    let edge_points: Vec<(i32, i32)> = edges
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] > 128)
        .map(|(x, y, _)| (x as i32, y as i32))
        .collect();

    if edge_points.is_empty() {
        return Vec::new();
    }

    let mut accumulator = vec![0u32; num_thetas * num_rhos];
    for &(x, y) in &edge_points {
        for theta_idx in 0..num_thetas {
            let rho = x as f64 * cos_table[theta_idx] + y as f64 * sin_table[theta_idx];
            let rho_idx = ((rho + rho_offset) / rho_resolution) as usize;
            if rho_idx < num_rhos {
                accumulator[theta_idx * num_rhos + rho_idx] += 1;
            }
        }
    }

    let mut peaks: Vec<(usize, usize, u32)> = Vec::new();
    for theta_idx in 0..num_thetas {
        for rho_idx in 0..num_rhos {
            let votes = accumulator[theta_idx * num_rhos + rho_idx];
            if votes >= threshold {
                peaks.push((theta_idx, rho_idx, votes));
            }
        }
    }

    // Stable sort keeps theta-major order among equal votes
    peaks.sort_by(|a, b| b.2.cmp(&a.2));

    let mut lines = Vec::new();
    let mut used_points = vec![false; edge_points.len()];

    for &(theta_idx, rho_idx, _votes) in peaks.iter().take(MAX_PEAKS) {
        let rho = rho_idx as f64 * rho_resolution - rho_offset;
        let cos_t = cos_table[theta_idx];
        let sin_t = sin_table[theta_idx];

        let mut line_points: Vec<(i32, i32, usize)> = Vec::new();
        for (i, &(x, y)) in edge_points.iter().enumerate() {
            if used_points[i] {
                continue;
            }
            let point_rho = x as f64 * cos_t + y as f64 * sin_t;
            if (point_rho - rho).abs() < RHO_BAND {
                line_points.push((x, y, i));
            }
        }

        if line_points.len() < 2 {
            continue;
        }

        // Order along the line direction
        line_points.sort_by(|a, b| {
            let proj_a = a.0 as f64 * (-sin_t) + a.1 as f64 * cos_t;
            let proj_b = b.0 as f64 * (-sin_t) + b.1 as f64 * cos_t;
            proj_a.total_cmp(&proj_b)
        });

        let mut segment_start = 0;
        for i in 1..=line_points.len() {
            let split = i == line_points.len() || {
                let dx = (line_points[i].0 - line_points[i - 1].0) as f64;
                let dy = (line_points[i].1 - line_points[i - 1].1) as f64;
                (dx * dx + dy * dy).sqrt() > max_line_gap
            };

            if !split {
                continue;
            }

            if i - segment_start >= 2 {
                let segment = fit_segment(&line_points[segment_start..i], cos_t, sin_t);

                if segment.length() >= min_line_length {
                    lines.push(segment);
                    for point in &line_points[segment_start..i] {
                        used_points[point.2] = true;
                    }
                }
            }
            segment_start = i;
        }
    }

    tracing::trace!(
        edge_points = edge_points.len(),
        peaks = peaks.len(),
        segments = lines.len(),
        "hough line detection"
    );

    lines
}

/// Segment through the mean offset of `points` along the normal `(cos_t, sin_t)`
///
/// `points` are ordered along the line; the first and last are projected
/// onto the fitted line to give the endpoints.
fn fit_segment(points: &[(i32, i32, usize)], cos_t: f64, sin_t: f64) -> LineSegment {
    let offset = points
        .iter()
        .map(|&(x, y, _)| x as f64 * cos_t + y as f64 * sin_t)
        .sum::<f64>()
        / points.len() as f64;

    let project = |&(x, y, _): &(i32, i32, usize)| {
        let d = x as f64 * cos_t + y as f64 * sin_t - offset;
        Point2D::new(x as f64 - d * cos_t, y as f64 - d * sin_t)
    };

    LineSegment::new(project(&points[0]), project(&points[points.len() - 1]))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

/// Position of an axis-aligned segment across its axis and its extent along it
#[derive(Debug, Clone, Copy)]
struct AxisSpan {
    axis: Axis,
    position: f64,
    from: f64,
    to: f64,
}

impl AxisSpan {
    fn of(line: &LineSegment, axis_tolerance: f64) -> Option<Self> {
        if line.dy() < axis_tolerance {
            Some(Self {
                axis: Axis::Horizontal,
                position: (line.start.y + line.end.y) / 2.0,
                from: line.min_x(),
                to: line.max_x(),
            })
        } else if line.dx() < axis_tolerance {
            Some(Self {
                axis: Axis::Vertical,
                position: (line.start.x + line.end.x) / 2.0,
                from: line.min_y(),
                to: line.max_y(),
            })
        } else {
            None
        }
    }

    fn segment(&self) -> LineSegment {
        match self.axis {
            Axis::Horizontal => LineSegment::new(
                Point2D::new(self.from, self.position),
                Point2D::new(self.to, self.position),
            ),
            Axis::Vertical => LineSegment::new(
                Point2D::new(self.position, self.from),
                Point2D::new(self.position, self.to),
            ),
        }
    }
}

/// Merge the parallel edges of drawn strokes into single lines
///
/// Canny traces both sides of a stroke, so a wall yields two segments a
/// few pixels apart. Horizontal or vertical segments on the same axis whose
/// positions are within `distance` of the first one in a group and whose
/// extents overlap it are replaced by one segment at their mean position
/// spanning all of them. Segments that are neither horizontal nor vertical
/// pass through unchanged.
pub fn merge_parallel_lines(
    lines: &[LineSegment],
    axis_tolerance: f64,
    distance: f64,
) -> Vec<LineSegment> {
    let spans: Vec<Option<AxisSpan>> = lines
        .iter()
        .map(|line| AxisSpan::of(line, axis_tolerance))
        .collect();
    let mut used = vec![false; lines.len()];
    let mut merged = Vec::with_capacity(lines.len());

    for i in 0..lines.len() {
        if used[i] {
            continue;
        }
        used[i] = true;

        let Some(base) = spans[i] else {
            merged.push(lines[i]);
            continue;
        };

        let mut position_sum = base.position;
        let mut count = 1usize;
        let mut from = base.from;
        let mut to = base.to;

        for j in (i + 1)..lines.len() {
            if used[j] {
                continue;
            }
            let Some(other) = spans[j] else {
                continue;
            };
            if other.axis != base.axis
                || (other.position - base.position).abs() > distance
                || other.from > base.to
                || base.from > other.to
            {
                continue;
            }

            used[j] = true;
            position_sum += other.position;
            count += 1;
            from = from.min(other.from);
            to = to.max(other.to);
        }

        merged.push(
            AxisSpan {
                axis: base.axis,
                position: position_sum / count as f64,
                from,
                to,
            }
            .segment(),
        );
    }

    tracing::trace!(
        before = lines.len(),
        after = merged.len(),
        "merged parallel lines"
    );

    merged
}
