//! Image pyramid utilities for multi-scale tracking.

use flowlab_core::{FrameBuffer, PixelFormat};

/// A grayscale image stored as f32 values [0, 1].
#[derive(Debug, Clone)]
pub struct GrayImage {
    pub data: Vec<f32>,
    pub width: u32,
    pub height: u32,
}

impl GrayImage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0.0; (width * height) as usize],
            width,
            height,
        }
    }

    #[inline]
    pub fn get(&self, x: i32, y: i32) -> f32 {
        let x = x.clamp(0, self.width as i32 - 1) as u32;
        let y = y.clamp(0, self.height as i32 - 1) as u32;
        self.data[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, val: f32) {
        if x < self.width && y < self.height {
            self.data[(y * self.width + x) as usize] = val;
        }
    }
}

/// Multi-scale image pyramid.
pub struct ImagePyramid {
    pub levels: Vec<GrayImage>,
}

impl ImagePyramid {
    /// Build by repeated 2x2 box downsampling.
    pub fn build(gray: &GrayImage, num_levels: u32) -> Self {
        let mut levels = vec![gray.clone()];
        for i in 1..num_levels {
            let prev = &levels[i as usize - 1];
            let nw = prev.width.div_ceil(2);
            let nh = prev.height.div_ceil(2);
            let mut level = GrayImage::new(nw, nh);
            for y in 0..nh {
                for x in 0..nw {
                    let sx = (x * 2) as i32;
                    let sy = (y * 2) as i32;
                    let avg = (prev.get(sx, sy)
                        + prev.get(sx + 1, sy)
                        + prev.get(sx, sy + 1)
                        + prev.get(sx + 1, sy + 1))
                        * 0.25;
                    level.set(x, y, avg);
                }
            }
            levels.push(level);
        }
        Self { levels }
    }
}

/// Convert a decoded frame to a normalized grayscale image.
pub fn gray_from_frame(frame: &FrameBuffer) -> GrayImage {
    let mut gray = GrayImage::new(frame.width, frame.height);
    match frame.format {
        PixelFormat::Gray8 => {
            for (dst, &src) in gray.data.iter_mut().zip(frame.data.iter()) {
                *dst = src as f32 / 255.0;
            }
        }
        PixelFormat::Rgb8 => {
            for (dst, px) in gray.data.iter_mut().zip(frame.data.chunks_exact(3)) {
                *dst = (0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32)
                    / 255.0;
            }
        }
    }
    gray
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gray_image_clamped_access() {
        let mut img = GrayImage::new(4, 4);
        img.set(2, 3, 0.75);
        assert!((img.get(2, 3) - 0.75).abs() < 0.001);
        let _ = img.get(-1, -1);
        let _ = img.get(100, 100);
    }

    #[test]
    fn test_gray_from_rgb_frame() {
        let mut frame = FrameBuffer::new(2, 1, PixelFormat::Rgb8);
        frame.row_mut(0)[..3].copy_from_slice(&[255, 255, 255]);
        let gray = gray_from_frame(&frame);
        assert!((gray.get(0, 0) - 1.0).abs() < 0.01);
        assert!(gray.get(1, 0) < 0.01);
    }

    #[test]
    fn test_gray_from_gray_frame() {
        let mut frame = FrameBuffer::new(2, 2, PixelFormat::Gray8);
        frame.fill(128);
        let gray = gray_from_frame(&frame);
        assert!((gray.get(1, 1) - 128.0 / 255.0).abs() < 0.001);
    }

    #[test]
    fn test_pyramid_build() {
        let img = GrayImage::new(64, 64);
        let pyr = ImagePyramid::build(&img, 3);
        assert_eq!(pyr.levels.len(), 3);
        assert_eq!(pyr.levels[1].width, 32);
        assert_eq!(pyr.levels[2].width, 16);
    }
}
