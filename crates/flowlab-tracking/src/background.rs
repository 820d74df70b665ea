//! Adaptive statistical background model and foreground extraction.
//!
//! A per-pixel running Gaussian estimates the static scene over a
//! bounded frame history. The foreground mask is the variance-scaled
//! deviation response; no shadow discrimination is performed.

use crate::pyramid::GrayImage;
use glam::Vec2;

/// Default bounded history length, in frames.
pub const DEFAULT_HISTORY: u32 = 100;
/// Default squared-deviation threshold multiplier.
pub const DEFAULT_VAR_THRESHOLD: f32 = 50.0;
/// Minimum connected-component area kept as a moving candidate.
pub const DEFAULT_MIN_AREA: u32 = 10;

// Variance bounds on the [0, 1] intensity scale.
const VAR_INIT: f32 = 0.0035;
const VAR_MIN: f32 = 1e-5;
const VAR_MAX: f32 = 0.05;

/// Binary foreground mask.
#[derive(Debug, Clone)]
pub struct ForegroundMask {
    pub data: Vec<bool>,
    pub width: u32,
    pub height: u32,
}

impl ForegroundMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![false; (width * height) as usize],
            width,
            height,
        }
    }

    #[inline]
    pub fn get(&self, x: i32, y: i32) -> bool {
        let x = x.clamp(0, self.width as i32 - 1) as u32;
        let y = y.clamp(0, self.height as i32 - 1) as u32;
        self.data[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, val: bool) {
        if x < self.width && y < self.height {
            self.data[(y * self.width + x) as usize] = val;
        }
    }

    /// Number of foreground pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Median filter of the given radius (radius 2 = 5x5 window).
    /// On a binary mask the median is a majority vote.
    pub fn median_denoise(&self, radius: i32) -> ForegroundMask {
        let mut out = ForegroundMask::new(self.width, self.height);
        let window = (2 * radius + 1) * (2 * radius + 1);
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let mut set = 0;
                for dy in -radius..=radius {
                    for dx in -radius..=radius {
                        if self.get(x + dx, y + dy) {
                            set += 1;
                        }
                    }
                }
                out.set(x as u32, y as u32, 2 * set > window);
            }
        }
        out
    }

    /// Extract 8-connected foreground components with area above
    /// `min_area`, in scan order.
    pub fn blobs(&self, min_area: u32) -> Vec<Blob> {
        let mut visited = vec![false; self.data.len()];
        let mut blobs = Vec::new();
        let w = self.width as i32;
        let h = self.height as i32;
        let mut stack = Vec::new();

        for start in 0..self.data.len() {
            if !self.data[start] || visited[start] {
                continue;
            }
            visited[start] = true;
            stack.push(start);
            let mut blob = Blob {
                area: 0,
                min_x: u32::MAX,
                min_y: u32::MAX,
                max_x: 0,
                max_y: 0,
            };
            while let Some(idx) = stack.pop() {
                let x = (idx as u32 % self.width) as i32;
                let y = (idx as u32 / self.width) as i32;
                blob.area += 1;
                blob.min_x = blob.min_x.min(x as u32);
                blob.max_x = blob.max_x.max(x as u32);
                blob.min_y = blob.min_y.min(y as u32);
                blob.max_y = blob.max_y.max(y as u32);
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        let (nx, ny) = (x + dx, y + dy);
                        if nx < 0 || ny < 0 || nx >= w || ny >= h {
                            continue;
                        }
                        let nidx = (ny * w + nx) as usize;
                        if self.data[nidx] && !visited[nidx] {
                            visited[nidx] = true;
                            stack.push(nidx);
                        }
                    }
                }
            }
            if blob.area > min_area {
                blobs.push(blob);
            }
        }
        blobs
    }
}

/// A connected foreground component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blob {
    pub area: u32,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl Blob {
    /// Bounding-box center, the candidate centroid handed to the
    /// optical-flow tracker.
    pub fn centroid(&self) -> Vec2 {
        Vec2::new(
            (self.min_x + self.max_x) as f32 * 0.5,
            (self.min_y + self.max_y) as f32 * 0.5,
        )
    }
}

/// Per-pixel adaptive Gaussian background model.
pub struct BackgroundModel {
    mean: Vec<f32>,
    var: Vec<f32>,
    width: u32,
    height: u32,
    history: u32,
    var_threshold: f32,
    frames_seen: u64,
}

impl BackgroundModel {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            mean: vec![0.0; (width * height) as usize],
            var: vec![VAR_INIT; (width * height) as usize],
            width,
            height,
            history: DEFAULT_HISTORY,
            var_threshold: DEFAULT_VAR_THRESHOLD,
            frames_seen: 0,
        }
    }

    pub fn with_params(mut self, history: u32, var_threshold: f32) -> Self {
        self.history = history.max(1);
        self.var_threshold = var_threshold;
        self
    }

    /// Update the model with the current frame and return its
    /// foreground mask. The first frame seeds the model and yields an
    /// all-background mask.
    pub fn apply(&mut self, gray: &GrayImage) -> ForegroundMask {
        debug_assert_eq!(gray.width, self.width);
        debug_assert_eq!(gray.height, self.height);
        let mut mask = ForegroundMask::new(self.width, self.height);

        if self.frames_seen == 0 {
            self.mean.copy_from_slice(&gray.data);
            self.frames_seen = 1;
            return mask;
        }

        // Faster adaptation while the history window is still filling
        let alpha = 1.0 / (self.frames_seen.min(self.history as u64) as f32);
        for (i, &value) in gray.data.iter().enumerate() {
            let d = value - self.mean[i];
            if d * d > self.var_threshold * self.var[i] {
                mask.data[i] = true;
            }
            self.mean[i] += alpha * d;
            self.var[i] = (self.var[i] + alpha * (d * d - self.var[i])).clamp(VAR_MIN, VAR_MAX);
        }
        self.frames_seen += 1;
        mask
    }
}
