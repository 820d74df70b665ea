//! Sequential video frame source using FFmpeg via ffmpeg-sidecar.

use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use ffmpeg_sidecar::iter::FfmpegIterator;
use flowlab_core::{FlowLabError, FrameBuffer, FrameRate, PixelFormat, RationalTime, Result};
use std::path::Path;
use tracing::{info, warn};

/// A decoded video frame with metadata.
///
/// Ephemeral: consumed by the per-frame measurement step and dropped.
pub struct VideoFrame {
    /// Frame data in packed RGB8 format
    pub buffer: FrameBuffer,
    /// Presentation timestamp, exactly `frame_number / fps`
    pub pts: RationalTime,
    /// Frame number, starting at 0
    pub frame_number: i64,
}

/// Ordered raw-frame decoder over a recorded clip.
///
/// Spawns FFmpeg as a subprocess emitting packed RGB24 on its stdout,
/// so decoding works without FFmpeg development headers. End of stream
/// is a normal termination condition, not an error.
pub struct FrameSource {
    child: FfmpegChild,
    events: FfmpegIterator,
    frame_rate: FrameRate,
    next_index: i64,
    finished: bool,
}

impl FrameSource {
    /// Open a video file for sequential decoding.
    ///
    /// `frame_rate` defines the timestamp of each frame; it normally
    /// comes from [`crate::MediaProbe`] but may be pinned by the run
    /// configuration for raw elementary streams.
    pub fn open<P: AsRef<Path>>(path: P, frame_rate: FrameRate) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FlowLabError::NotFound(format!(
                "File not found: {}",
                path.display()
            )));
        }

        info!("Opening video file: {}", path.display());

        let mut child = FfmpegCommand::new()
            .input(path.to_string_lossy())
            .rawvideo()
            .spawn()
            .map_err(|e| FlowLabError::Decoder(format!("Failed to spawn ffmpeg: {e}")))?;

        let events = child
            .iter()
            .map_err(|e| FlowLabError::Decoder(format!("Failed to read ffmpeg output: {e}")))?;

        Ok(Self {
            child,
            events,
            frame_rate,
            next_index: 0,
            finished: false,
        })
    }

    /// The frame rate used for timestamping.
    pub fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    /// Decode the next frame, or `Ok(None)` at end of stream.
    pub fn next_frame(&mut self) -> Result<Option<VideoFrame>> {
        if self.finished {
            return Ok(None);
        }
        for event in self.events.by_ref() {
            match event {
                FfmpegEvent::OutputFrame(frame) => {
                    let buffer = FrameBuffer::from_raw(
                        frame.data,
                        frame.width,
                        frame.height,
                        PixelFormat::Rgb8,
                    )
                    .ok_or_else(|| {
                        FlowLabError::Decoder(format!(
                            "Frame {} has unexpected buffer size for {}x{} rgb24",
                            self.next_index, frame.width, frame.height
                        ))
                    })?;

                    let frame_number = self.next_index;
                    self.next_index += 1;
                    return Ok(Some(VideoFrame {
                        buffer,
                        pts: RationalTime::from_frames(frame_number, self.frame_rate),
                        frame_number,
                    }));
                }
                FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, msg) => {
                    warn!("ffmpeg: {msg}");
                }
                _ => {}
            }
        }
        info!("End of stream after {} frames", self.next_index);
        self.finished = true;
        Ok(None)
    }

    /// Frames decoded so far.
    pub fn frames_decoded(&self) -> i64 {
        self.next_index
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        // Release the decode handle on every exit path, including early
        // termination of the pipeline.
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
