//! External sensor series and the aligned export table.

use flowlab_core::{FlowLabError, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};

/// A fixed-rate externally logged series, loaded once and immutable.
/// Timestamps are implicit from the row index and sample rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalSeries {
    timestamps: Vec<f64>,
    values: Vec<f64>,
    sample_rate_hz: f64,
}

impl ExternalSeries {
    /// Build from raw values at a fixed sample rate.
    pub fn from_values(values: Vec<f64>, sample_rate_hz: f64) -> Result<Self> {
        if values.is_empty() {
            return Err(FlowLabError::Sensor("Empty sensor series".into()));
        }
        if sample_rate_hz <= 0.0 {
            return Err(FlowLabError::InvalidParameter(format!(
                "Sample rate must be positive, got {sample_rate_hz}"
            )));
        }
        let timestamps = (0..values.len())
            .map(|i| i as f64 / sample_rate_hz)
            .collect();
        Ok(Self {
            timestamps,
            values,
            sample_rate_hz,
        })
    }

    /// Load a single-numeric-column file (plain text or CSV; a header
    /// line and blank lines are skipped). Failure to open or to find
    /// any numeric data is fatal before the pipeline starts.
    pub fn load<P: AsRef<Path>>(path: P, sample_rate_hz: f64) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            FlowLabError::Sensor(format!("Cannot open sensor file {}: {e}", path.display()))
        })?;
        let mut values = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            let field = line
                .split([',', ';', '\t'])
                .next()
                .unwrap_or("")
                .trim();
            if field.is_empty() {
                continue;
            }
            match field.parse::<f64>() {
                Ok(v) => values.push(v),
                // Tolerate a header row; anything else is suspicious
                Err(_) if values.is_empty() => continue,
                Err(_) => {
                    warn!("Skipping non-numeric sensor row: {line:?}");
                }
            }
        }
        info!(
            "Loaded {} sensor samples at {:.3} Hz from {}",
            values.len(),
            sample_rate_hz,
            path.display()
        );
        Self::from_values(values, sample_rate_hz)
    }

    /// Convert a resistance log (Ω) to conductance in mS: `1000 / R`.
    pub fn resistance_to_conductance_ms(&self) -> Self {
        let values = self
            .values
            .iter()
            .map(|&r| {
                if r.abs() < f64::EPSILON {
                    warn!("Zero resistance sample, clamping conductance to 0");
                    0.0
                } else {
                    1000.0 / r
                }
            })
            .collect();
        Self {
            timestamps: self.timestamps.clone(),
            values,
            sample_rate_hz: self.sample_rate_hz,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Linearly interpolate the series at an arbitrary time.
    /// Extrapolation beyond the sampled domain continues the first or
    /// last segment's slope.
    pub fn interpolate_at(&self, t: f64) -> f64 {
        let n = self.values.len();
        if n == 1 {
            return self.values[0];
        }
        // Segment index, clamped so out-of-domain times extrapolate
        let pos = self
            .timestamps
            .partition_point(|&ts| ts <= t)
            .clamp(1, n - 1);
        let (t0, t1) = (self.timestamps[pos - 1], self.timestamps[pos]);
        let (v0, v1) = (self.values[pos - 1], self.values[pos]);
        v0 + (v1 - v0) * (t - t0) / (t1 - t0)
    }
}

/// One row of the aligned table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignedRow {
    pub time_s: f64,
    /// Sensor series value interpolated at this video timestamp.
    pub external: f64,
    /// Video-derived measurement (optionally smoothed).
    pub measurement: f64,
}

/// Per-video-timestamp table of aligned series, handed to exporters
/// as an independent copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedSeries {
    pub rows: Vec<AlignedRow>,
}

impl AlignedSeries {
    /// Interpolate the external series onto the video timestamps and
    /// pair it with the video-derived measurements.
    ///
    /// `video_times` and `measurements` must be index-aligned; rows
    /// beyond the shorter of the two are dropped.
    pub fn align(video_times: &[f64], measurements: &[f64], external: &ExternalSeries) -> Self {
        let rows = video_times
            .iter()
            .zip(measurements)
            .map(|(&time_s, &measurement)| AlignedRow {
                time_s,
                external: external.interpolate_at(time_s),
                measurement,
            })
            .collect();
        Self { rows }
    }

    /// Restrict to the inclusive closed interval `[t_start, t_end]`.
    /// Idempotent for identical bounds.
    pub fn window(&self, t_start: f64, t_end: f64) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .copied()
                .filter(|r| r.time_s >= t_start && r.time_s <= t_end)
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_values_timestamps() {
        let s = ExternalSeries::from_values(vec![1.0, 2.0, 3.0], 11.68).unwrap();
        assert_eq!(s.timestamps()[0], 0.0);
        assert!((s.timestamps()[2] - 2.0 / 11.68).abs() < 1e-12);
    }

    #[test]
    fn test_empty_series_rejected() {
        assert!(ExternalSeries::from_values(vec![], 10.0).is_err());
        assert!(ExternalSeries::from_values(vec![1.0], 0.0).is_err());
    }

    #[test]
    fn test_interpolation_hits_samples() {
        let s = ExternalSeries::from_values(vec![10.0, 20.0, 40.0], 2.0).unwrap();
        for (i, &v) in s.values().iter().enumerate() {
            let t = i as f64 / 2.0;
            assert!((s.interpolate_at(t) - v).abs() < 1e-12);
        }
        assert!((s.interpolate_at(0.25) - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_extrapolation_continues_slope() {
        let s = ExternalSeries::from_values(vec![0.0, 1.0], 1.0).unwrap();
        assert!((s.interpolate_at(2.0) - 2.0).abs() < 1e-12);
        assert!((s.interpolate_at(-1.0) - -1.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_resistance_to_conductance() {
        // 1000 Ohm everywhere -> 1.0 mS everywhere, at any timestamp
        let s = ExternalSeries::from_values(vec![1000.0; 8], 11.68)
            .unwrap()
            .resistance_to_conductance_ms();
        for t in [0.0, 0.123, 0.5, 3.0] {
            assert!((s.interpolate_at(t) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_align_rows() {
        let external = ExternalSeries::from_values(vec![1.0, 3.0], 1.0).unwrap();
        let aligned = AlignedSeries::align(&[0.0, 0.5, 1.0], &[7.0, 8.0, 9.0], &external);
        assert_eq!(aligned.len(), 3);
        assert!((aligned.rows[1].external - 2.0).abs() < 1e-12);
        assert_eq!(aligned.rows[1].measurement, 8.0);
    }

    #[test]
    fn test_window_inclusive_and_idempotent() {
        let external = ExternalSeries::from_values(vec![0.0, 1.0], 1.0).unwrap();
        let times: Vec<f64> = (0..10).map(|i| i as f64 * 0.1).collect();
        let meas = vec![1.0; 10];
        let aligned = AlignedSeries::align(&times, &meas, &external);
        let windowed = aligned.window(0.2, 0.5);
        assert!(windowed
            .rows
            .iter()
            .all(|r| r.time_s >= 0.2 && r.time_s <= 0.5));
        assert_eq!(windowed.len(), 4);
        assert_eq!(windowed.window(0.2, 0.5), windowed);
    }
}
