//! Thermal centroid targeting.
//!
//! A frame is binarized against a fixed threshold and collapsed to a single
//! row centroid. The centroid is mapped onto the physical field of view and
//! converted to the yaw angle that points the launcher at it.

use num_traits::Float;

use crate::hal::ThermalFrame;

/// The yaw angle to a detected target.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TargetEstimate {
    /// Steering angle in radians, positive toward the low-index side.
    pub angle_radians: f64,

    /// `false` when nothing in the frame exceeded the threshold.
    pub valid: bool,
}

impl TargetEstimate {
    pub fn new(angle_radians: f64) -> Self {
        Self {
            angle_radians,
            valid: true,
        }
    }

    pub fn invalid() -> Self {
        Self::default()
    }
}

/// Fixed geometry relating frame pixels to the physical scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Geometry {
    /// Samples strictly above this intensity count as target.
    pub threshold: f32,

    /// Width of the field of view at the target distance (in inches).
    pub field_width: f64,

    /// Distance from the yaw pivot to the camera (in inches).
    pub pivot_distance: f64,

    /// Number of sensor pixels spanning `field_width`.
    pub pixels_across: usize,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            threshold: 100.,
            field_width: 24.,
            pivot_distance: 2.,
            pixels_across: 24,
        }
    }
}

/// Stateless centroid targeting over thermal frames.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ThermalTargetingEngine {
    pub geometry: Geometry,
}

impl ThermalTargetingEngine {
    pub fn new(geometry: Geometry) -> Self {
        Self { geometry }
    }

    /// Estimate the yaw angle to the hot region of `frame`.
    pub fn estimate(&self, frame: &ThermalFrame) -> TargetEstimate {
        match self.row_centroid(frame) {
            Some(row) => TargetEstimate::new(self.angle_for_row(row)),
            None => TargetEstimate::invalid(),
        }
    }

    /// Calculate the row centroid of all pixels above the threshold.
    /// Returns `None` when no pixel is active.
    pub fn row_centroid(&self, frame: &ThermalFrame) -> Option<f64> {
        let threshold = self.geometry.threshold;

        let mut total_mass = 0usize;
        let mut moment = 0usize;
        for (row, pixels) in frame.pixels().row_iter().enumerate() {
            let mass = pixels.iter().filter(|&&pixel| pixel > threshold).count();
            total_mass += mass;
            moment += row * mass;
        }

        if total_mass == 0 {
            None
        } else {
            Some(moment as f64 / total_mass as f64)
        }
    }

    /// Convert a row coordinate into a steering angle.
    pub fn angle_for_row(&self, row: f64) -> f64 {
        let Geometry {
            field_width,
            pivot_distance,
            pixels_across,
            ..
        } = self.geometry;

        // Lateral offset from the centerline, positive on the low-index side
        let inches_per_pixel = field_width / pixels_across as f64;
        let offset = field_width / 2. - row * inches_per_pixel;

        if offset < 0. {
            -Float::atan(Float::abs(offset) / pivot_distance)
        } else {
            Float::atan(offset / pivot_distance)
        }
    }
}
