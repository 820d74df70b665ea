//! Per-frame gap width measurement.
//!
//! The cropped sub-region is binarized at a fixed intensity threshold,
//! separating the bright channel background from the darker membrane
//! band. From a seed pixel on the calibrated scan line the extractor
//! walks outward in both directions until the first bright pixel (or
//! the crop boundary); the gap is the distance between the two
//! crossings, in whole pixels. Exactly one dark band flanked by bright
//! background is assumed; there is no sub-pixel interpolation.

use crate::geometry::{CalibrationGeometry, ScanAxis};
use flowlab_core::{FrameBuffer, FrameRate, RationalTime};
use serde::{Deserialize, Serialize};

/// Default binarization threshold: pixels above are background.
pub const DEFAULT_THRESHOLD: u8 = 220;

/// One gap measurement per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapMeasurement {
    pub frame_index: i64,
    /// Exactly `frame_index / fps`.
    pub timestamp: RationalTime,
    /// Edge-to-edge width in pixels; never exceeds the scan-axis
    /// dimension of the sub-region.
    pub gap_px: u32,
}

/// Edge-based gap sizer over a completed calibration geometry.
#[derive(Debug, Clone)]
pub struct GapExtractor {
    geometry: CalibrationGeometry,
    frame_rate: FrameRate,
    threshold: u8,
}

impl GapExtractor {
    pub fn new(geometry: CalibrationGeometry, frame_rate: FrameRate) -> Self {
        Self {
            geometry,
            frame_rate,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Override the binarization threshold.
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn geometry(&self) -> &CalibrationGeometry {
        &self.geometry
    }

    /// Measure the gap on one frame.
    ///
    /// Degenerate geometry (empty crop, scan line outside the crop)
    /// clamps to the boundary and yields a possibly zero width; it is
    /// never an error and never aborts the run.
    pub fn measure(&self, frame: &FrameBuffer, frame_index: i64) -> GapMeasurement {
        let crop = frame.crop(self.geometry.crop_rect());
        let gap_px = self.gap_in_crop(&crop);
        GapMeasurement {
            frame_index,
            timestamp: RationalTime::from_frames(frame_index, self.frame_rate),
            gap_px,
        }
    }

    fn gap_in_crop(&self, crop: &FrameBuffer) -> u32 {
        if crop.width == 0 || crop.height == 0 {
            return 0;
        }
        let origin = self.geometry.crop_rect();
        let (p1, p3, p4) = (self.geometry.p1, self.geometry.p3, self.geometry.p4);

        match self.geometry.scan_axis() {
            ScanAxis::Horizontal => {
                // Scan row: midpoint of p3/p4 relative to the crop top;
                // seed column: half the p3→p4 horizontal span.
                let row = ((p3.y - origin.y) + (p4.y - origin.y)) / 2;
                let row = row.clamp(0, crop.height as i32 - 1);
                let seed = ((p4.x - p3.x) / 2).clamp(0, crop.width as i32 - 1);
                self.walk(seed, crop.width as i32, |x| crop.luma(x, row))
            }
            ScanAxis::Vertical => {
                let col = (((p3.x - p1.x) + (p4.x - p1.x)) / 2).abs();
                let col = col.clamp(0, crop.width as i32 - 1);
                let seed = ((p4.y - p3.y) / 2).abs().clamp(0, crop.height as i32 - 1);
                self.walk(seed, crop.height as i32, |y| crop.luma(col, y))
            }
        }
    }

    /// Walk outward from the seed while pixels stay dark. A seed that
    /// is already bright on a side leaves that boundary at the seed
    /// itself, yielding a minimal or zero width.
    fn walk(&self, seed: i32, len: i32, luma_at: impl Fn(i32) -> u8) -> u32 {
        let dark = |i: i32| luma_at(i) <= self.threshold;
        let mut lo = seed;
        let mut hi = seed;
        while lo > 0 && dark(lo) {
            lo -= 1;
        }
        while hi < len - 1 && dark(hi) {
            hi += 1;
        }
        (hi - lo) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{CalibrationSession, ScriptedInput};
    use flowlab_core::{PixelFormat, PixelPoint};

    fn pt(x: i32, y: i32) -> PixelPoint {
        PixelPoint::new(x, y)
    }

    fn geometry(points: [PixelPoint; 4]) -> CalibrationGeometry {
        let mut session = CalibrationSession::new();
        let mut input = ScriptedInput::from_points(points);
        session.run(&mut input).unwrap()
    }

    /// 40x40 bright frame with a dark vertical stripe in columns 10..=20.
    fn striped_frame() -> FrameBuffer {
        let mut frame = FrameBuffer::new(40, 40, PixelFormat::Gray8);
        frame.fill(240);
        for y in 0..40 {
            for x in 10..=20 {
                frame.row_mut(y)[x] = 80;
            }
        }
        frame
    }

    #[test]
    fn test_horizontal_gap_width() {
        let frame = striped_frame();
        // p3/p4 nearly level -> horizontal scan on row 19, seed x=10
        let g = geometry([pt(0, 0), pt(39, 39), pt(5, 18), pt(25, 20)]);
        let extractor = GapExtractor::new(g, FrameRate::FPS_300);
        let m = extractor.measure(&frame, 0);
        // Boundary crossings at x=9 and x=21
        assert_eq!(m.gap_px, 12);
    }

    #[test]
    fn test_vertical_gap_width() {
        // Transpose: dark horizontal stripe in rows 10..=20
        let mut frame = FrameBuffer::new(40, 40, PixelFormat::Gray8);
        frame.fill(240);
        for y in 10..=20 {
            frame.row_mut(y).fill(80);
        }
        let g = geometry([pt(0, 0), pt(39, 39), pt(18, 5), pt(20, 25)]);
        let extractor = GapExtractor::new(g, FrameRate::FPS_300);
        let m = extractor.measure(&frame, 0);
        assert_eq!(m.gap_px, 12);
    }

    #[test]
    fn test_bright_seed_yields_zero() {
        let mut frame = FrameBuffer::new(40, 40, PixelFormat::Gray8);
        frame.fill(240);
        let g = geometry([pt(0, 0), pt(39, 39), pt(5, 18), pt(25, 20)]);
        let extractor = GapExtractor::new(g, FrameRate::FPS_300);
        assert_eq!(extractor.measure(&frame, 0).gap_px, 0);
    }

    #[test]
    fn test_gap_bounded_by_scan_dimension() {
        // Entirely dark crop: the walk stops at both boundaries
        let mut frame = FrameBuffer::new(40, 40, PixelFormat::Gray8);
        frame.fill(10);
        let g = geometry([pt(0, 0), pt(39, 39), pt(5, 18), pt(25, 20)]);
        let extractor = GapExtractor::new(g, FrameRate::FPS_300);
        let m = extractor.measure(&frame, 0);
        assert!(m.gap_px <= 40);
        assert_eq!(m.gap_px, 39);
    }

    #[test]
    fn test_degenerate_geometry_clamps() {
        // Scan line far outside the crop: clamped, measurement still
        // produced without panicking
        let frame = striped_frame();
        let g = geometry([pt(0, 0), pt(9, 9), pt(500, 18), pt(600, 20)]);
        let extractor = GapExtractor::new(g, FrameRate::FPS_300);
        let m = extractor.measure(&frame, 3);
        assert!(m.gap_px <= 10);
    }

    #[test]
    fn test_timestamps_exact() {
        let frame = striped_frame();
        let g = geometry([pt(0, 0), pt(39, 39), pt(5, 18), pt(25, 20)]);
        let extractor = GapExtractor::new(g, FrameRate::FPS_300);
        for idx in [0i64, 1, 150, 299, 300] {
            let m = extractor.measure(&frame, idx);
            assert_eq!(m.timestamp, RationalTime::new(idx, 300));
        }
    }

    #[test]
    fn test_deterministic() {
        let frame = striped_frame();
        let g = geometry([pt(0, 0), pt(39, 39), pt(5, 18), pt(25, 20)]);
        let extractor = GapExtractor::new(g, FrameRate::FPS_300);
        let a: Vec<u32> = (0..10).map(|i| extractor.measure(&frame, i).gap_px).collect();
        let b: Vec<u32> = (0..10).map(|i| extractor.measure(&frame, i).gap_px).collect();
        assert_eq!(a, b);
    }
}
