// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pixel to real-world scale calibration and distance measurement
//!
//! A [`Calibration`] is a plain value the caller owns and passes to every
//! measurement. Shells serving concurrent requests that must share one scale
//! use [`SharedCalibration`], which guards the value with a lock.
//!
//! Measurements can be collected under named groups in a
//! [`MeasurementLog`], which totals the real distances of one group.

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VisionError};
use crate::types::Point2D;

pub const DEFAULT_PIXELS_PER_UNIT: f64 = 1.0;

/// Unit real distances are reported in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    #[default]
    Feet,
}

/// Scale between image pixels and real units
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Calibration {
    pixels_per_unit: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            pixels_per_unit: DEFAULT_PIXELS_PER_UNIT,
        }
    }
}

impl Calibration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pixels_per_unit(&self) -> f64 {
        self.pixels_per_unit
    }

    /// Set the scale from one reference measurement
    ///
    /// A non-positive pixel distance leaves the scale untouched. A
    /// non-positive or non-finite real distance is rejected.
    pub fn set_calibration(&mut self, pixel_distance: f64, real_distance: f64) -> Result<()> {
        if !(pixel_distance > 0.0) {
            tracing::debug!(pixel_distance, "ignoring calibration with no pixel distance");
            return Ok(());
        }
        if !pixel_distance.is_finite() || !real_distance.is_finite() || real_distance <= 0.0 {
            return Err(VisionError::InvalidParameters(format!(
                "calibration needs finite positive distances, got {} px for {} units",
                pixel_distance, real_distance
            )));
        }

        self.pixels_per_unit = pixel_distance / real_distance;
        tracing::info!(pixels_per_unit = self.pixels_per_unit, "calibration updated");
        Ok(())
    }

    /// Convert a pixel distance to real units
    pub fn pixel_to_real(&self, pixel_distance: f64) -> f64 {
        if self.pixels_per_unit > 0.0 {
            pixel_distance / self.pixels_per_unit
        } else {
            0.0
        }
    }

    /// Measure the distance between two image points
    pub fn measure(&self, from: Point2D, to: Point2D) -> Measurement {
        let pixel_distance = distance(from, to);
        Measurement {
            pixel_distance,
            real_distance: round_to_hundredths(self.pixel_to_real(pixel_distance)),
            unit: LengthUnit::Feet,
        }
    }
}

/// Euclidean distance in pixels
pub fn distance(from: Point2D, to: Point2D) -> f64 {
    from.distance_to(&to)
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Reference measurement supplied by the user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CalibrationRequest {
    pub pixel_distance: f64,
    pub real_distance: f64,
}

impl Default for CalibrationRequest {
    fn default() -> Self {
        Self {
            pixel_distance: 0.0,
            real_distance: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationResponse {
    pub pixels_per_unit: f64,
}

/// Two points to measure between; missing coordinates default to 0
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MeasureRequest {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl MeasureRequest {
    pub fn endpoints(&self) -> (Point2D, Point2D) {
        (Point2D::new(self.x1, self.y1), Point2D::new(self.x2, self.y2))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub pixel_distance: f64,
    /// Rounded to two decimals
    pub real_distance: f64,
    pub unit: LengthUnit,
}

/// Measurement kept in a [`MeasurementLog`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupedMeasurement {
    /// Sequential, starting at 1
    pub id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub group: String,
    #[serde(flatten)]
    pub measurement: Measurement,
}

impl GroupedMeasurement {
    /// User name, or `Measurement {id}` when unnamed
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("Measurement {}", self.id),
        }
    }
}

/// Sum of the real distances measured under one group
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupTotal {
    pub group: String,
    /// Labels of the summed measurements, in the order they were taken
    pub labels: Vec<String>,
    /// Rounded to two decimals
    pub total: f64,
    pub unit: LengthUnit,
}

/// Measurements taken so far, tagged with the group that was current
#[derive(Debug, Clone, Default)]
pub struct MeasurementLog {
    measurements: Vec<GroupedMeasurement>,
    current_group: String,
    last_id: u32,
}

impl MeasurementLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_group(&self) -> &str {
        &self.current_group
    }

    /// Switch the group new measurements go to; an empty name is ignored
    pub fn set_current_group(&mut self, group: &str) {
        if !group.is_empty() {
            self.current_group = group.to_string();
        }
    }

    /// Record a measurement in the current group and return its id
    pub fn add(&mut self, measurement: Measurement, name: Option<String>) -> u32 {
        self.last_id += 1;
        self.measurements.push(GroupedMeasurement {
            id: self.last_id,
            name,
            group: self.current_group.clone(),
            measurement,
        });
        tracing::debug!(
            id = self.last_id,
            group = %self.current_group,
            real_distance = measurement.real_distance,
            "measurement recorded"
        );
        self.last_id
    }

    /// Remove a measurement; ids are never reused
    pub fn remove(&mut self, id: u32) -> bool {
        let before = self.measurements.len();
        self.measurements.retain(|m| m.id != id);
        self.measurements.len() != before
    }

    pub fn measurements(&self) -> &[GroupedMeasurement] {
        &self.measurements
    }

    /// Total the real distances of every measurement in `group`
    ///
    /// The name is trimmed and must not be empty. Returns `None` when no
    /// measurement belongs to the group.
    pub fn total_for_group(&self, group: &str) -> Result<Option<GroupTotal>> {
        let group = group.trim();
        if group.is_empty() {
            return Err(VisionError::InvalidParameters(
                "a group name is needed to calculate a total".to_string(),
            ));
        }

        let members: Vec<&GroupedMeasurement> =
            self.measurements.iter().filter(|m| m.group == group).collect();
        if members.is_empty() {
            return Ok(None);
        }

        let total = members.iter().map(|m| m.measurement.real_distance).sum::<f64>();
        Ok(Some(GroupTotal {
            group: group.to_string(),
            labels: members.iter().map(|m| m.label()).collect(),
            total: round_to_hundredths(total),
            unit: LengthUnit::Feet,
        }))
    }
}

/// Calibration shared between concurrent requests
#[derive(Debug, Clone, Default)]
pub struct SharedCalibration {
    inner: Arc<RwLock<Calibration>>,
}

impl SharedCalibration {
    pub fn new(calibration: Calibration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(calibration)),
        }
    }

    /// Copy of the current calibration
    pub fn snapshot(&self) -> Calibration {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn calibrate(&self, request: &CalibrationRequest) -> Result<CalibrationResponse> {
        let mut calibration = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        calibration.set_calibration(request.pixel_distance, request.real_distance)?;
        Ok(CalibrationResponse {
            pixels_per_unit: calibration.pixels_per_unit(),
        })
    }

    pub fn measure(&self, request: &MeasureRequest) -> Measurement {
        let (from, to) = request.endpoints();
        self.snapshot().measure(from, to)
    }
}
