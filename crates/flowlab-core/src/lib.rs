//! FlowLab Core - Foundation types for video signal extraction
//!
//! This crate provides the fundamental types used throughout FlowLab:
//! - Time representation (RationalTime, FrameRate)
//! - Frame buffers and pixel formats
//! - Integer pixel geometry
//! - The shared error type

pub mod error;
pub mod frame;
pub mod geometry;
pub mod time;

pub use error::{FlowLabError, Result};
pub use frame::{FrameBuffer, PixelFormat};
pub use geometry::{PixelPoint, PixelRect};
pub use time::{FrameRate, RationalTime};
