//! Pyramidal Lucas-Kanade sparse optical flow.
//!
//! Candidates are re-seeded from the foreground mask every frame, so
//! the tracker is stateless: it maps one point from the previous
//! grayscale frame to the current one, or reports failure.

use crate::pyramid::{GrayImage, ImagePyramid};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Lucas-Kanade parameters. Defaults match the capture setup used for
/// the bead clips: 15 px window, 3 pyramid levels, at most 10
/// iterations, 0.03 px convergence epsilon.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LkTracker {
    pub window_size: u32,
    pub pyramid_levels: u32,
    pub max_iterations: u32,
    pub epsilon: f32,
    /// Correspondences moving further than this are rejected as
    /// divergent rather than reported.
    pub max_displacement: f32,
}

impl Default for LkTracker {
    fn default() -> Self {
        Self {
            window_size: 15,
            pyramid_levels: 3,
            max_iterations: 10,
            epsilon: 0.03,
            max_displacement: 30.0,
        }
    }
}

impl LkTracker {
    /// Build the pyramid for one frame; callers reuse it across all
    /// candidate points of that frame.
    pub fn build_pyramid(&self, gray: &GrayImage) -> ImagePyramid {
        ImagePyramid::build(gray, self.pyramid_levels)
    }

    /// Track a single point from `prev` to `curr`.
    ///
    /// Returns the new position, or `None` when the spatial gradient
    /// matrix is singular at the finest level or the solution diverges
    /// beyond `max_displacement`.
    pub fn track(
        &self,
        prev_pyr: &ImagePyramid,
        curr_pyr: &ImagePyramid,
        point: Vec2,
    ) -> Option<Vec2> {
        let levels = prev_pyr.levels.len();
        let mut guess = Vec2::ZERO;

        for level in (0..levels).rev() {
            let scale = 1.0 / (1u32 << level) as f32;
            let px = point.x * scale;
            let py = point.y * scale;
            let prev_img = &prev_pyr.levels[level];
            let curr_img = &curr_pyr.levels[level];
            let hw = (self.window_size as f32 * scale * 0.5) as i32;

            // Spatial gradient matrix over the window
            let mut g11 = 0.0f32;
            let mut g12 = 0.0f32;
            let mut g22 = 0.0f32;
            for wy in -hw..=hw {
                for wx in -hw..=hw {
                    let ix = (prev_img.get(px as i32 + wx + 1, py as i32 + wy)
                        - prev_img.get(px as i32 + wx - 1, py as i32 + wy))
                        * 0.5;
                    let iy = (prev_img.get(px as i32 + wx, py as i32 + wy + 1)
                        - prev_img.get(px as i32 + wx, py as i32 + wy - 1))
                        * 0.5;
                    g11 += ix * ix;
                    g12 += ix * iy;
                    g22 += iy * iy;
                }
            }

            let det = g11 * g22 - g12 * g12;
            if det.abs() < 1e-6 {
                if level == 0 {
                    return None;
                }
                continue;
            }
            let inv_det = 1.0 / det;

            let mut d = guess * scale;

            for _ in 0..self.max_iterations {
                let mut bx = 0.0f32;
                let mut by = 0.0f32;
                for wy in -hw..=hw {
                    for wx in -hw..=hw {
                        let ix = (prev_img.get(px as i32 + wx + 1, py as i32 + wy)
                            - prev_img.get(px as i32 + wx - 1, py as i32 + wy))
                            * 0.5;
                        let iy = (prev_img.get(px as i32 + wx, py as i32 + wy + 1)
                            - prev_img.get(px as i32 + wx, py as i32 + wy - 1))
                            * 0.5;
                        let it = curr_img.get((px + d.x) as i32 + wx, (py + d.y) as i32 + wy)
                            - prev_img.get(px as i32 + wx, py as i32 + wy);
                        bx += ix * it;
                        by += iy * it;
                    }
                }
                let dd = Vec2::new(
                    inv_det * (g22 * bx - g12 * by),
                    inv_det * (-g12 * bx + g11 * by),
                );
                d -= dd;
                if dd.length_squared() < self.epsilon * self.epsilon {
                    break;
                }
            }
            guess = d / scale;
        }

        if guess.length() > self.max_displacement {
            return None;
        }
        Some(point + guess)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(size: u32, cell: u32) -> GrayImage {
        let mut img = GrayImage::new(size, size);
        for y in 0..size {
            for x in 0..size {
                let check = ((x / cell) + (y / cell)) % 2;
                img.set(x, y, check as f32);
            }
        }
        img
    }

    #[test]
    fn test_stationary_point() {
        let img = checkerboard(64, 4);
        let tracker = LkTracker {
            pyramid_levels: 1,
            ..Default::default()
        };
        let pyr = tracker.build_pyramid(&img);
        let pos = tracker.track(&pyr, &pyr, Vec2::new(32.0, 32.0)).unwrap();
        assert!((pos.x - 32.0).abs() < 2.0);
        assert!((pos.y - 32.0).abs() < 2.0);
    }

    #[test]
    fn test_translated_blob() {
        let mut prev = GrayImage::new(64, 64);
        let mut curr = GrayImage::new(64, 64);
        for y in 25..35u32 {
            for x in 25..35u32 {
                prev.set(x, y, 1.0);
            }
        }
        for y in 25..35u32 {
            for x in 30..40u32 {
                curr.set(x, y, 1.0);
            }
        }
        let tracker = LkTracker {
            pyramid_levels: 1,
            ..Default::default()
        };
        let prev_pyr = tracker.build_pyramid(&prev);
        let curr_pyr = tracker.build_pyramid(&curr);
        let pos = tracker
            .track(&prev_pyr, &curr_pyr, Vec2::new(30.0, 30.0))
            .unwrap();
        assert!(pos.x > 30.0);
    }

    #[test]
    fn test_flat_region_fails() {
        let flat = GrayImage::new(64, 64);
        let tracker = LkTracker {
            pyramid_levels: 1,
            ..Default::default()
        };
        let pyr = tracker.build_pyramid(&flat);
        assert!(tracker.track(&pyr, &pyr, Vec2::new(32.0, 32.0)).is_none());
    }
}
