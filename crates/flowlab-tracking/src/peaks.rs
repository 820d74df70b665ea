//! Peak detection and ranking over the velocity sequence.
//!
//! Indices refer to the compacted sample sequence (frames that
//! contributed no sample are absent). Each sample carries its own
//! frame index and timestamp, so peak-to-time mapping stays exact.

use crate::velocity::VelocitySample;
use flowlab_core::RationalTime;
use serde::{Deserialize, Serialize};

/// Number of top peaks averaged into the signature velocity.
pub const DEFAULT_TOP_K: usize = 3;

/// A ranked local maximum of the velocity sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakRecord {
    /// Index into the compacted sample sequence.
    pub sample_index: usize,
    pub value: f64,
    /// 0 is the highest peak.
    pub rank: usize,
}

/// Top-k peak summary for a clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakSummary {
    pub peaks: Vec<PeakRecord>,
    /// Mean of the reported peak values; the clip's single
    /// representative-speed statistic. Zero when no peaks exist.
    pub signature_velocity: f64,
}

/// Indices of local maxima with value at or above `min_height`.
///
/// A sample is a peak when it is strictly greater than both
/// neighbors; sequence endpoints are never peaks.
pub fn find_peaks(values: &[f64], min_height: f64) -> Vec<usize> {
    let mut peaks = Vec::new();
    for i in 1..values.len().saturating_sub(1) {
        if values[i] > values[i - 1] && values[i] > values[i + 1] && values[i] >= min_height {
            peaks.push(i);
        }
    }
    peaks
}

impl PeakSummary {
    /// Detect, rank, and keep the top `k` peaks of a velocity
    /// sequence. Ranking is descending by value; the stable sort
    /// breaks ties in favor of earlier samples. Fewer than `k`
    /// detected peaks are all reported.
    pub fn extract(samples: &[VelocitySample], k: usize) -> Self {
        let values: Vec<f64> = samples.iter().map(|s| s.speed).collect();
        let mut ranked: Vec<(usize, f64)> = find_peaks(&values, 0.0)
            .into_iter()
            .map(|i| (i, values[i]))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(k);

        let peaks: Vec<PeakRecord> = ranked
            .iter()
            .enumerate()
            .map(|(rank, &(sample_index, value))| PeakRecord {
                sample_index,
                value,
                rank,
            })
            .collect();
        let signature_velocity = if peaks.is_empty() {
            0.0
        } else {
            peaks.iter().map(|p| p.value).sum::<f64>() / peaks.len() as f64
        };
        Self {
            peaks,
            signature_velocity,
        }
    }

    /// Timestamps of the reported peaks, resolved through the samples.
    pub fn peak_timestamps(&self, samples: &[VelocitySample]) -> Vec<RationalTime> {
        self.peaks
            .iter()
            .filter_map(|p| samples.get(p.sample_index).map(|s| s.timestamp))
            .collect()
    }
}
