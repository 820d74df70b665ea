//! Frame buffer types for decoded video frames in CPU memory.

use crate::geometry::PixelRect;
use serde::{Deserialize, Serialize};

/// Pixel format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit packed RGB (24 bits per pixel), as produced by the raw decoder
    #[default]
    Rgb8,
    /// 8-bit grayscale
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb8 => 3,
            Self::Gray8 => 1,
        }
    }
}

/// A video frame in CPU memory with packed rows (no stride padding).
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    /// Pixel format
    pub format: PixelFormat,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Packed pixel data, `width * height * bytes_per_pixel` long
    pub data: Vec<u8>,
}

impl FrameBuffer {
    /// Create a zero-filled frame buffer.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let len = width as usize * height as usize * format.bytes_per_pixel();
        Self {
            format,
            width,
            height,
            data: vec![0u8; len],
        }
    }

    /// Wrap raw packed pixel data, validating the buffer length.
    pub fn from_raw(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Option<Self> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return None;
        }
        Some(Self {
            format,
            width,
            height,
            data,
        })
    }

    /// Get a row of packed pixel data.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let bpp = self.format.bytes_per_pixel();
        let start = y as usize * self.width as usize * bpp;
        &self.data[start..start + self.width as usize * bpp]
    }

    /// Get a mutable row of packed pixel data.
    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let bpp = self.format.bytes_per_pixel();
        let start = y as usize * self.width as usize * bpp;
        &mut self.data[start..start + self.width as usize * bpp]
    }

    /// Grayscale intensity at (x, y) using BT.601 luma for RGB frames.
    ///
    /// Coordinates are clamped to the frame, so callers walking a scan
    /// line never index out of bounds.
    #[inline]
    pub fn luma(&self, x: i32, y: i32) -> u8 {
        let x = x.clamp(0, self.width as i32 - 1) as usize;
        let y = y.clamp(0, self.height as i32 - 1) as usize;
        match self.format {
            PixelFormat::Gray8 => self.data[y * self.width as usize + x],
            PixelFormat::Rgb8 => {
                let i = (y * self.width as usize + x) * 3;
                (0.299 * self.data[i] as f32
                    + 0.587 * self.data[i + 1] as f32
                    + 0.114 * self.data[i + 2] as f32) as u8
            }
        }
    }

    /// Convert to an 8-bit grayscale frame.
    pub fn to_gray(&self) -> FrameBuffer {
        let mut out = FrameBuffer::new(self.width, self.height, PixelFormat::Gray8);
        match self.format {
            PixelFormat::Gray8 => out.data.copy_from_slice(&self.data),
            PixelFormat::Rgb8 => {
                for (i, px) in self.data.chunks_exact(3).enumerate() {
                    out.data[i] = (0.299 * px[0] as f32
                        + 0.587 * px[1] as f32
                        + 0.114 * px[2] as f32) as u8;
                }
            }
        }
        out
    }

    /// Copy out a sub-region, clamped to the frame bounds.
    ///
    /// An empty clamped region yields an empty buffer, not an error.
    pub fn crop(&self, rect: PixelRect) -> FrameBuffer {
        let rect = rect.clamped(self.width, self.height);
        let bpp = self.format.bytes_per_pixel();
        let mut out = FrameBuffer::new(rect.width, rect.height, self.format);
        for dy in 0..rect.height {
            let src = self.row((rect.y as u32) + dy);
            let from = rect.x as usize * bpp;
            let to = from + rect.width as usize * bpp;
            out.row_mut(dy).copy_from_slice(&src[from..to]);
        }
        out
    }

    /// Fill the whole frame with a single gray level (test scaffolding
    /// and synthetic clips).
    pub fn fill(&mut self, value: u8) {
        self.data.fill(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PixelPoint;

    #[test]
    fn test_buffer_sizes() {
        let rgb = FrameBuffer::new(64, 48, PixelFormat::Rgb8);
        assert_eq!(rgb.data.len(), 64 * 48 * 3);
        let gray = FrameBuffer::new(64, 48, PixelFormat::Gray8);
        assert_eq!(gray.data.len(), 64 * 48);
    }

    #[test]
    fn test_from_raw_rejects_bad_length() {
        assert!(FrameBuffer::from_raw(vec![0u8; 10], 2, 2, PixelFormat::Rgb8).is_none());
        assert!(FrameBuffer::from_raw(vec![0u8; 12], 2, 2, PixelFormat::Rgb8).is_some());
    }

    #[test]
    fn test_luma_conversion() {
        let mut frame = FrameBuffer::new(2, 1, PixelFormat::Rgb8);
        frame.row_mut(0)[..3].copy_from_slice(&[255, 255, 255]);
        assert!(frame.luma(0, 0) >= 254);
        assert_eq!(frame.luma(1, 0), 0);
        // Out-of-bounds coordinates clamp to the edge pixel
        assert!(frame.luma(-5, -5) >= 254);
    }

    #[test]
    fn test_to_gray_roundtrip() {
        let mut frame = FrameBuffer::new(3, 2, PixelFormat::Rgb8);
        frame.fill(200);
        let gray = frame.to_gray();
        assert_eq!(gray.format, PixelFormat::Gray8);
        assert!(gray.data.iter().all(|&v| (199..=201).contains(&v)));
    }

    #[test]
    fn test_crop() {
        let mut frame = FrameBuffer::new(10, 10, PixelFormat::Gray8);
        frame.row_mut(5)[5] = 99;
        let rect = PixelRect::from_corners(PixelPoint::new(4, 4), PixelPoint::new(7, 7));
        let crop = frame.crop(rect);
        assert_eq!(crop.width, 4);
        assert_eq!(crop.height, 4);
        assert_eq!(crop.luma(1, 1), 99);
    }

    #[test]
    fn test_crop_out_of_bounds_is_empty() {
        let frame = FrameBuffer::new(10, 10, PixelFormat::Gray8);
        let crop = frame.crop(PixelRect::new(50, 50, 5, 5));
        assert_eq!(crop.width, 0);
        assert!(crop.data.is_empty());
    }
}
