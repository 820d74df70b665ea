//! JSON run configurations for the two batch pipelines.
//!
//! Defaults match the recording setup these clips come from: 300 fps
//! high-speed camera, 220 binarize threshold, 11.68 Hz electrical
//! log, 0.174 µm per pixel at the bead magnification.

use anyhow::{Context, Result};
use flowlab_signal::SavgolParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Deflection run: calibrated gap measurement aligned against the
/// electrical log and exported as one CSV table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeflectionConfig {
    /// Input clip.
    pub video: PathBuf,
    /// Single-column electrical log.
    pub sensor: PathBuf,
    /// Destination for the aligned table.
    pub output_csv: PathBuf,
    /// Pin the frame rate when the container misreports it
    /// (raw .h264 elementary streams usually do).
    #[serde(default)]
    pub fps: Option<f64>,
    /// The four confirmed reference points, in confirmation order.
    pub calibration_points: Vec<[i32; 2]>,
    #[serde(default = "default_threshold")]
    pub threshold: u8,
    #[serde(default = "default_smoothing")]
    pub smoothing: SavgolParams,
    /// Electrical log sample rate in Hz.
    #[serde(default = "default_sensor_rate_hz")]
    pub sensor_rate_hz: f64,
    /// When true the log holds resistance in Ω and is converted to
    /// conductance in mS before alignment.
    #[serde(default = "default_true")]
    pub sensor_is_resistance: bool,
    /// Optional inclusive export window `[t_start, t_end]` in seconds.
    #[serde(default)]
    pub window_s: Option<[f64; 2]>,
}

/// Velocity run: tracer bead speed per frame, peak summary, optional
/// annotated output clip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VelocityConfig {
    /// Input clip.
    pub video: PathBuf,
    /// Destination for the per-frame velocity samples.
    pub output_csv: PathBuf,
    /// Optional peak summary report (JSON).
    #[serde(default)]
    pub report_json: Option<PathBuf>,
    /// Optional annotated clip with correspondence overlays.
    #[serde(default)]
    pub annotated_video: Option<PathBuf>,
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default = "default_um_per_px")]
    pub um_per_px: f64,
    /// Minimum connected-component area, in pixels.
    #[serde(default = "default_min_area")]
    pub min_area: u32,
    /// Number of top peaks averaged into the signature velocity.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_threshold() -> u8 {
    flowlab_deflect::extractor::DEFAULT_THRESHOLD
}

fn default_smoothing() -> SavgolParams {
    SavgolParams::default()
}

fn default_sensor_rate_hz() -> f64 {
    11.68
}

fn default_true() -> bool {
    true
}

fn default_um_per_px() -> f64 {
    flowlab_tracking::VelocityTracker::DEFAULT_UM_PER_PX
}

fn default_min_area() -> u32 {
    flowlab_tracking::background::DEFAULT_MIN_AREA
}

fn default_top_k() -> usize {
    flowlab_tracking::peaks::DEFAULT_TOP_K
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

impl DeflectionConfig {
    pub fn load(path: &Path) -> Result<Self> {
        load_json(path)
    }
}

impl VelocityConfig {
    pub fn load(path: &Path) -> Result<Self> {
        load_json(path)
    }
}
