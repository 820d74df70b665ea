//! Interactive calibration session.
//!
//! The session is an explicit owned state machine fed by discrete
//! pointer events; it has no knowledge of any display or windowing
//! mechanism. The driving loop blocks on the next event, which is the
//! pipeline's only suspension point.

use crate::geometry::CalibrationGeometry;
use flowlab_core::{FlowLabError, PixelPoint, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info};

/// Calibration progress. One confirm advances one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CalibrationStage {
    #[default]
    Empty,
    P1Set,
    P2Set,
    P3Set,
    Complete,
}

/// A discrete operator input correlated with the displayed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerEvent {
    /// Confirm the next reference point at a pixel coordinate.
    Confirm(PixelPoint),
    /// Discard all recorded points and start over.
    Reset,
}

/// Source of calibration events.
///
/// `None` means the operator aborted or the driving frame stream is
/// exhausted; the session then reports an incomplete calibration.
pub trait CalibrationInput {
    fn next_event(&mut self) -> Option<PointerEvent>;
}

/// Replays a fixed event list. Used for batch runs, where the four
/// points come from the run configuration, and for tests.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    events: VecDeque<PointerEvent>,
}

impl ScriptedInput {
    pub fn new(events: impl IntoIterator<Item = PointerEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    /// Convenience constructor confirming four points in order.
    pub fn from_points(points: [PixelPoint; 4]) -> Self {
        Self::new(points.map(PointerEvent::Confirm))
    }
}

impl CalibrationInput for ScriptedInput {
    fn next_event(&mut self) -> Option<PointerEvent> {
        self.events.pop_front()
    }
}

/// Owned four-point calibration state machine.
#[derive(Debug, Clone, Default)]
pub struct CalibrationSession {
    stage: CalibrationStage,
    points: Vec<PixelPoint>,
}

impl CalibrationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stage.
    pub fn stage(&self) -> CalibrationStage {
        self.stage
    }

    /// Number of points confirmed so far.
    pub fn confirmed(&self) -> usize {
        self.points.len()
    }

    /// Record the next reference point and advance one stage.
    ///
    /// Returns `false` without changing state when the session is
    /// already complete or the point duplicates one already recorded
    /// (the geometry is only valid with four distinct points).
    pub fn confirm(&mut self, point: PixelPoint) -> bool {
        if self.stage == CalibrationStage::Complete {
            return false;
        }
        if self.points.contains(&point) {
            debug!("Ignoring duplicate calibration point {:?}", point);
            return false;
        }
        self.points.push(point);
        self.stage = match self.points.len() {
            1 => CalibrationStage::P1Set,
            2 => CalibrationStage::P2Set,
            3 => CalibrationStage::P3Set,
            _ => CalibrationStage::Complete,
        };
        debug!("Calibration point {} set: {:?}", self.points.len(), point);
        self.stage == CalibrationStage::Complete
    }

    /// Discard all recorded points. Valid in any stage.
    pub fn reset(&mut self) {
        self.points.clear();
        self.stage = CalibrationStage::Empty;
        debug!("Calibration reset");
    }

    /// Apply one pointer event.
    pub fn apply(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Confirm(p) => {
                self.confirm(p);
            }
            PointerEvent::Reset => self.reset(),
        }
    }

    /// The frozen geometry, exposed only once complete.
    pub fn geometry(&self) -> Option<CalibrationGeometry> {
        if self.stage != CalibrationStage::Complete {
            return None;
        }
        Some(CalibrationGeometry::new(
            self.points[0],
            self.points[1],
            self.points[2],
            self.points[3],
        ))
    }

    /// Drive the session from an event source until complete.
    ///
    /// Exhausting the source before four points are confirmed yields
    /// `CalibrationIncomplete`; dependent extraction must then produce
    /// an empty result rather than running.
    pub fn run(&mut self, input: &mut dyn CalibrationInput) -> Result<CalibrationGeometry> {
        while self.stage != CalibrationStage::Complete {
            match input.next_event() {
                Some(event) => self.apply(event),
                None => {
                    return Err(FlowLabError::CalibrationIncomplete {
                        confirmed: self.points.len(),
                    })
                }
            }
        }
        let geometry = self.geometry().ok_or(FlowLabError::CalibrationIncomplete {
            confirmed: self.points.len(),
        })?;
        info!(
            "Calibration complete: p1={:?} p2={:?} p3={:?} p4={:?}",
            geometry.p1, geometry.p2, geometry.p3, geometry.p4
        );
        Ok(geometry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: i32, y: i32) -> PixelPoint {
        PixelPoint::new(x, y)
    }

    #[test]
    fn test_stage_progression() {
        let mut session = CalibrationSession::new();
        assert_eq!(session.stage(), CalibrationStage::Empty);
        session.confirm(pt(0, 0));
        assert_eq!(session.stage(), CalibrationStage::P1Set);
        session.confirm(pt(10, 10));
        assert_eq!(session.stage(), CalibrationStage::P2Set);
        session.confirm(pt(2, 5));
        assert_eq!(session.stage(), CalibrationStage::P3Set);
        assert!(session.geometry().is_none());
        session.confirm(pt(8, 5));
        assert_eq!(session.stage(), CalibrationStage::Complete);
        assert!(session.geometry().is_some());
    }

    #[test]
    fn test_no_confirm_after_complete() {
        let mut session = CalibrationSession::new();
        for p in [pt(0, 0), pt(10, 10), pt(2, 5), pt(8, 5)] {
            session.confirm(p);
        }
        let frozen = session.geometry().unwrap();
        assert!(!session.confirm(pt(99, 99)));
        assert_eq!(session.geometry().unwrap(), frozen);
    }

    #[test]
    fn test_reset_from_any_stage() {
        let mut session = CalibrationSession::new();
        session.confirm(pt(0, 0));
        session.confirm(pt(10, 10));
        session.reset();
        assert_eq!(session.stage(), CalibrationStage::Empty);
        assert_eq!(session.confirmed(), 0);

        // Reset after complete allows a fresh sequence
        for p in [pt(0, 0), pt(10, 10), pt(2, 5), pt(8, 5)] {
            session.confirm(p);
        }
        session.apply(PointerEvent::Reset);
        assert_eq!(session.stage(), CalibrationStage::Empty);
        assert!(session.geometry().is_none());
    }

    #[test]
    fn test_duplicate_point_rejected() {
        let mut session = CalibrationSession::new();
        session.confirm(pt(5, 5));
        assert!(!session.confirm(pt(5, 5)));
        assert_eq!(session.stage(), CalibrationStage::P1Set);
    }

    #[test]
    fn test_run_scripted_complete() {
        let mut session = CalibrationSession::new();
        let mut input = ScriptedInput::from_points([pt(0, 0), pt(10, 10), pt(2, 5), pt(8, 5)]);
        let geometry = session.run(&mut input).unwrap();
        assert_eq!(geometry.p1, pt(0, 0));
        assert_eq!(geometry.p4, pt(8, 5));
    }

    #[test]
    fn test_run_exhausted_is_incomplete() {
        let mut session = CalibrationSession::new();
        let mut input = ScriptedInput::new([
            PointerEvent::Confirm(pt(0, 0)),
            PointerEvent::Confirm(pt(10, 10)),
        ]);
        let err = session.run(&mut input).unwrap_err();
        assert!(matches!(
            err,
            FlowLabError::CalibrationIncomplete { confirmed: 2 }
        ));
    }

    #[test]
    fn test_run_with_mid_sequence_reset() {
        let mut session = CalibrationSession::new();
        let mut input = ScriptedInput::new([
            PointerEvent::Confirm(pt(1, 1)),
            PointerEvent::Confirm(pt(2, 2)),
            PointerEvent::Reset,
            PointerEvent::Confirm(pt(0, 0)),
            PointerEvent::Confirm(pt(10, 10)),
            PointerEvent::Confirm(pt(2, 5)),
            PointerEvent::Confirm(pt(8, 5)),
        ]);
        let geometry = session.run(&mut input).unwrap();
        assert_eq!(geometry.p1, pt(0, 0));
    }
}
