//! Frozen four-point calibration geometry.

use flowlab_core::{PixelPoint, PixelRect};
use serde::{Deserialize, Serialize};

/// Direction of the measurement scan line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanAxis {
    /// Scan along a single row (the gap opens sideways)
    Horizontal,
    /// Scan along a single column (the gap opens vertically)
    Vertical,
}

/// Four confirmed reference points.
///
/// p1/p2 bound the rectangular sub-region cropped from every frame;
/// p3/p4 sit on opposite edges of the gap and select the scan axis.
/// Constructed only by a completed [`crate::CalibrationSession`] and
/// immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationGeometry {
    pub p1: PixelPoint,
    pub p2: PixelPoint,
    pub p3: PixelPoint,
    pub p4: PixelPoint,
}

impl CalibrationGeometry {
    pub(crate) fn new(p1: PixelPoint, p2: PixelPoint, p3: PixelPoint, p4: PixelPoint) -> Self {
        Self { p1, p2, p3, p4 }
    }

    /// Scan axis derived from the relative deltas of p3 and p4: when
    /// their vertical separation is smaller than their horizontal one,
    /// the gap closes along a row.
    pub fn scan_axis(&self) -> ScanAxis {
        if (self.p3.y - self.p4.y).abs() < (self.p3.x - self.p4.x).abs() {
            ScanAxis::Horizontal
        } else {
            ScanAxis::Vertical
        }
    }

    /// Sub-region bounded by p1 and p2, in either corner order.
    pub fn crop_rect(&self) -> PixelRect {
        PixelRect::from_corners(self.p1, self.p2)
    }
}
