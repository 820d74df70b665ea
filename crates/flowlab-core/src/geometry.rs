//! Integer pixel geometry for calibration and cropping.

use serde::{Deserialize, Serialize};

/// A pixel coordinate as confirmed by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    /// Create a new pixel point.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned pixel rectangle with inclusive-exclusive bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Bounding rectangle of two corner points, in either order.
    pub fn from_corners(a: PixelPoint, b: PixelPoint) -> Self {
        let x0 = a.x.min(b.x);
        let y0 = a.y.min(b.y);
        let x1 = a.x.max(b.x);
        let y1 = a.y.max(b.y);
        // Corners are inclusive, matching a crop of frame[y0..=y1, x0..=x1]
        Self {
            x: x0,
            y: y0,
            width: (x1 - x0 + 1) as u32,
            height: (y1 - y0 + 1) as u32,
        }
    }

    /// Clamp the rectangle to a frame of the given dimensions.
    ///
    /// Degenerate input collapses to an empty rectangle at the nearest
    /// valid position rather than failing.
    pub fn clamped(self, frame_width: u32, frame_height: u32) -> Self {
        let x0 = self.x.clamp(0, frame_width as i32);
        let y0 = self.y.clamp(0, frame_height as i32);
        let x1 = (self.x + self.width as i32).clamp(x0, frame_width as i32);
        let y1 = (self.y + self.height as i32).clamp(y0, frame_height as i32);
        Self {
            x: x0,
            y: y0,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        }
    }

    /// Check if a point is inside the rectangle.
    #[inline]
    pub fn contains(self, p: PixelPoint) -> bool {
        p.x >= self.x
            && p.x < self.x + self.width as i32
            && p.y >= self.y
            && p.y < self.y + self.height as i32
    }

    /// True when the rectangle covers no pixels.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_corners_any_order() {
        let a = PixelPoint::new(10, 40);
        let b = PixelPoint::new(30, 20);
        let r = PixelRect::from_corners(a, b);
        assert_eq!(r, PixelRect::new(10, 20, 21, 21));
        assert_eq!(r, PixelRect::from_corners(b, a));
    }

    #[test]
    fn test_clamped_to_frame() {
        let r = PixelRect::new(-5, 90, 20, 20).clamped(100, 100);
        assert_eq!(r.x, 0);
        assert_eq!(r.y, 90);
        assert_eq!(r.width, 15);
        assert_eq!(r.height, 10);
    }

    #[test]
    fn test_degenerate_clamp_is_empty() {
        let r = PixelRect::new(200, 200, 10, 10).clamped(100, 100);
        assert!(r.is_empty());
    }

    #[test]
    fn test_contains() {
        let r = PixelRect::new(0, 0, 10, 10);
        assert!(r.contains(PixelPoint::new(9, 9)));
        assert!(!r.contains(PixelPoint::new(10, 9)));
    }
}
