//! FlowLab Media - FFmpeg integration for video frame I/O
//!
//! This crate handles:
//! - Media file probing (dimensions, frame rate, frame count)
//! - Sequential raw frame decoding
//! - Optional annotated-video output and overlay drawing

pub mod overlay;
pub mod probe;
pub mod sink;
pub mod source;

pub use probe::MediaProbe;
pub use sink::{AnnotatedWriter, FrameSink};
pub use source::{FrameSource, VideoFrame};

/// Initialize FFmpeg (call once at startup).
///
/// Downloads a static ffmpeg binary when none is on the PATH, so batch
/// runs work on analysis machines without a system install.
pub fn init() {
    match ffmpeg_sidecar::download::auto_download() {
        Ok(()) => tracing::info!("FlowLab Media initialized"),
        Err(e) => tracing::warn!("FFmpeg auto-download failed: {e}"),
    }
}
