//! FlowLab Signal - Conditioning and alignment of heterogeneous series.
//!
//! Video-derived measurements arrive at the clip's frame rate; the
//! electrical log arrives at the sensor's own fixed rate. This crate
//! smooths the video series, interpolates the sensor series onto the
//! video timestamps, windows the aligned table, and exports it.

pub mod export;
pub mod series;
pub mod smooth;

pub use export::{write_csv, CsvColumns};
pub use series::{AlignedRow, AlignedSeries, ExternalSeries};
pub use smooth::{savgol_filter, SavgolParams};
