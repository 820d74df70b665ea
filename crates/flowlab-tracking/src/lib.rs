//! FlowLab Tracking - Tracer bead velocity estimation.
//!
//! Per frame: an adaptive background model isolates moving foreground,
//! a median filter denoises the mask, connected components above a
//! minimum area become candidate bead centroids, and pyramidal
//! Lucas-Kanade optical flow measures their displacement from the
//! previous grayscale frame. The mean displacement scaled by µm/px and
//! frame rate gives one scalar velocity sample; frames with no
//! surviving candidates contribute no sample. Peak extraction over the
//! velocity sequence yields the clip's signature velocity.

pub mod background;
pub mod peaks;
pub mod point_tracker;
pub mod pyramid;
pub mod velocity;

pub use background::{BackgroundModel, Blob, ForegroundMask};
pub use peaks::{find_peaks, PeakRecord, PeakSummary};
pub use point_tracker::LkTracker;
pub use pyramid::{gray_from_frame, GrayImage, ImagePyramid};
pub use velocity::{Correspondence, TrackedFrame, VelocitySample, VelocityTracker};
