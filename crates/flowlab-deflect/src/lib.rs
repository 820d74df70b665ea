//! FlowLab Deflect - Membrane deflection measurement.
//!
//! An operator confirms four reference points on a displayed frame,
//! producing a frozen calibration geometry. The gap extractor then
//! measures the membrane gap on every frame by walking a binarized
//! scan line outward from a seed pixel.

pub mod extractor;
pub mod geometry;
pub mod session;

pub use extractor::{GapExtractor, GapMeasurement};
pub use geometry::{CalibrationGeometry, ScanAxis};
pub use session::{CalibrationInput, CalibrationSession, CalibrationStage, PointerEvent, ScriptedInput};
