//! Optional annotated-video output.
//!
//! The measurement pipelines produce correct data with no sink
//! attached; writing an overlay video is purely a rendering side
//! effect. Frames are piped as raw RGB into an FFmpeg encode
//! subprocess.

use flowlab_core::{FlowLabError, FrameBuffer, FrameRate, PixelFormat, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use tracing::info;

/// Destination for rendered frames.
pub trait FrameSink {
    /// Write one RGB frame.
    fn write_frame(&mut self, frame: &FrameBuffer) -> Result<()>;
}

/// H.264 writer for annotated output clips.
pub struct AnnotatedWriter {
    child: Child,
    stdin: Option<ChildStdin>,
    output_path: PathBuf,
    width: u32,
    height: u32,
    frames_written: u64,
}

impl AnnotatedWriter {
    /// Spawn the encoder for a clip of the given geometry.
    pub fn create<P: AsRef<Path>>(
        path: P,
        width: u32,
        height: u32,
        frame_rate: FrameRate,
    ) -> Result<Self> {
        let output_path = path.as_ref().to_path_buf();
        let mut child = Command::new("ffmpeg")
            .args([
                "-y",
                "-f",
                "rawvideo",
                "-pixel_format",
                "rgb24",
                "-video_size",
                &format!("{}x{}", width, height),
                "-framerate",
                &format!("{}/{}", frame_rate.numerator, frame_rate.denominator),
                "-i",
                "pipe:0",
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
            ])
            .arg(&output_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| FlowLabError::Encoder(format!("Failed to spawn ffmpeg: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| FlowLabError::Encoder("Failed to open ffmpeg stdin".into()))?;

        Ok(Self {
            child,
            stdin: Some(stdin),
            output_path,
            width,
            height,
            frames_written: 0,
        })
    }

    /// Close the stream and wait for the encoder to finish the file.
    pub fn finish(mut self) -> Result<()> {
        // Dropping stdin signals end-of-stream
        drop(self.stdin.take());
        let status = self
            .child
            .wait()
            .map_err(|e| FlowLabError::Encoder(format!("Failed to wait for ffmpeg: {e}")))?;
        if !status.success() {
            return Err(FlowLabError::Encoder(format!(
                "ffmpeg exited with status: {status}"
            )));
        }
        info!(
            "Wrote {} annotated frames to {}",
            self.frames_written,
            self.output_path.display()
        );
        Ok(())
    }
}

impl FrameSink for AnnotatedWriter {
    fn write_frame(&mut self, frame: &FrameBuffer) -> Result<()> {
        if frame.format != PixelFormat::Rgb8
            || frame.width != self.width
            || frame.height != self.height
        {
            return Err(FlowLabError::InvalidParameter(format!(
                "Sink expects {}x{} rgb24, got {}x{} {:?}",
                self.width, self.height, frame.width, frame.height, frame.format
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| FlowLabError::Encoder("Writer already finished".into()))?;
        stdin
            .write_all(&frame.data)
            .map_err(|e| FlowLabError::Encoder(format!("Failed to write frame: {e}")))?;
        self.frames_written += 1;
        Ok(())
    }
}

impl Drop for AnnotatedWriter {
    fn drop(&mut self) {
        // Release the writer handle even when the pipeline aborts early.
        if self.stdin.take().is_some() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
