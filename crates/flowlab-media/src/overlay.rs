//! Overlay drawing for annotated output frames.
//!
//! Presentation only: correspondence segments and end-point markers
//! drawn onto RGB frames before they reach a [`crate::FrameSink`].

use flowlab_core::{FrameBuffer, PixelFormat};

/// RGB color triple.
pub type Color = [u8; 3];

/// Correspondence line color.
pub const TRACK_COLOR: Color = [0, 255, 0];
/// Tracked end-point marker color.
pub const MARKER_COLOR: Color = [255, 0, 0];

#[inline]
fn put_pixel(frame: &mut FrameBuffer, x: i32, y: i32, color: Color) {
    if frame.format != PixelFormat::Rgb8 {
        return;
    }
    if x < 0 || y < 0 || x >= frame.width as i32 || y >= frame.height as i32 {
        return;
    }
    let i = (y as usize * frame.width as usize + x as usize) * 3;
    frame.data[i..i + 3].copy_from_slice(&color);
}

/// Draw a line segment using Bresenham's algorithm.
pub fn draw_segment(frame: &mut FrameBuffer, from: (i32, i32), to: (i32, i32), color: Color) {
    let (mut x0, mut y0) = from;
    let (x1, y1) = to;
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put_pixel(frame, x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Draw a filled disc of the given radius.
pub fn draw_disc(frame: &mut FrameBuffer, center: (i32, i32), radius: i32, color: Color) {
    let r2 = radius * radius;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= r2 {
                put_pixel(frame, center.0 + dx, center.1 + dy, color);
            }
        }
    }
}
