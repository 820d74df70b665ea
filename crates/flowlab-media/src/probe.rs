//! Media file probing to get metadata without a full decode.

use flowlab_core::{FlowLabError, FrameRate, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use tracing::info;

/// Metadata of the primary video stream of a recorded clip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaProbe {
    /// File path
    pub path: String,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Container-reported frame rate. Raw elementary streams (.h264)
    /// often misreport this; callers may override from configuration.
    pub frame_rate: FrameRate,
    /// Total frame count, when the container knows it.
    pub frame_count: Option<i64>,
}

impl MediaProbe {
    /// Probe a video file with ffprobe.
    ///
    /// A missing or unreadable file is fatal: the pipeline must not
    /// start and no partial output is produced.
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.to_string_lossy().to_string();

        if !path.exists() {
            return Err(FlowLabError::NotFound(format!(
                "File not found: {}",
                path_str
            )));
        }

        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,r_frame_rate,nb_frames",
                "-of",
                "default=noprint_wrappers=1",
            ])
            .arg(path)
            .output()
            .map_err(|e| FlowLabError::Probe(format!("Failed to spawn ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(FlowLabError::Probe(format!(
                "ffprobe failed for {}: {}",
                path_str,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut width = None;
        let mut height = None;
        let mut frame_rate = None;
        let mut frame_count = None;

        for line in stdout.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key.trim() {
                "width" => width = value.trim().parse::<u32>().ok(),
                "height" => height = value.trim().parse::<u32>().ok(),
                "r_frame_rate" => frame_rate = parse_rate(value.trim()),
                "nb_frames" => frame_count = value.trim().parse::<i64>().ok(),
                _ => {}
            }
        }

        let (width, height) = match (width, height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => {
                return Err(FlowLabError::Probe(format!(
                    "No video stream dimensions in {}",
                    path_str
                )))
            }
        };

        let frame_rate = frame_rate.unwrap_or_default();
        let probe = Self {
            path: path_str,
            width,
            height,
            frame_rate,
            frame_count,
        };
        info!(
            "Probed {}: {}x{} @ {}",
            probe.path, probe.width, probe.height, probe.frame_rate
        );
        Ok(probe)
    }
}

fn parse_rate(s: &str) -> Option<FrameRate> {
    let (num, den) = s.split_once('/')?;
    let num = num.trim().parse::<u32>().ok()?;
    let den = den.trim().parse::<u32>().ok()?;
    if num == 0 || den == 0 {
        return None;
    }
    Some(FrameRate::new(num, den))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("300/1"), Some(FrameRate::FPS_300));
        let ntsc = parse_rate("30000/1001").unwrap();
        assert!((ntsc.to_fps_f64() - 29.97).abs() < 0.01);
        assert_eq!(parse_rate("0/0"), None);
        assert_eq!(parse_rate("N/A"), None);
    }

    #[test]
    fn test_probe_missing_file() {
        let err = MediaProbe::probe("/nonexistent/clip.mp4").unwrap_err();
        assert!(matches!(err, FlowLabError::NotFound(_)));
    }
}
