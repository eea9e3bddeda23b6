//! Two-click measurement state machine
//!
//! Reifies the interactive distance tool as an explicit state machine so it
//! can be unit-tested without any rendering surface: Idle, Armed,
//! AwaitingSecondPoint, then back to Idle on completion or cancel.
//!
//! Arming requires an active calibration. The scale itself is read once, at
//! completion, never cached across the two clicks.

use crate::calibration::CalibrationEngine;
use crate::geometry::SurfacePoint;

/// Unique, time-ordered measurement identifier (UUID v7).
pub type MeasurementId = uuid::Uuid;

/// An immutable record of one completed two-point measurement.
///
/// `real_world_distance` is computed and frozen at the instant the second
/// click lands, using whatever scale factor is current at that instant.
/// Later calibration changes never recompute it.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    id: MeasurementId,
    start: SurfacePoint,
    end: SurfacePoint,
    pixel_distance: f32,
    real_world_distance: f32,
    unit: String,
}

impl Measurement {
    fn new(start: SurfacePoint, end: SurfacePoint, scale_factor: f32, unit: &str) -> Self {
        let pixel_distance = start.distance_to(&end);

        Self {
            id: uuid::Uuid::now_v7(),
            start,
            end,
            pixel_distance,
            real_world_distance: pixel_distance * scale_factor,
            unit: unit.to_owned(),
        }
    }

    pub fn id(&self) -> MeasurementId {
        self.id
    }

    pub fn start(&self) -> SurfacePoint {
        self.start
    }

    pub fn end(&self) -> SurfacePoint {
        self.end
    }

    pub fn pixel_distance(&self) -> f32 {
        self.pixel_distance
    }

    pub fn real_world_distance(&self) -> f32 {
        self.real_world_distance
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Display form, e.g. "5000.00 mm".
    pub fn formatted_distance(&self) -> String {
        format!("{:.2} {}", self.real_world_distance, self.unit)
    }
}

/// Observable phase of the tool, for UI affordances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurePhase {
    Idle,
    Armed,
    AwaitingSecondPoint,
}

#[derive(Debug, thiserror::Error)]
pub enum MeasureError {
    #[error("measurement requires an active scale calibration")]
    ScaleRequired,
    #[error("a measurement is already in progress")]
    AlreadyMeasuring,
    #[error("measurement tool is not armed")]
    NotArmed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Idle,
    Armed,
    AwaitingSecondPoint { start: SurfacePoint },
}

/// Interactive two-point distance tool.
#[derive(Debug)]
pub struct MeasurementTool {
    state: State,
}

impl Default for MeasurementTool {
    fn default() -> Self {
        Self::new()
    }
}

impl MeasurementTool {
    pub fn new() -> Self {
        Self { state: State::Idle }
    }

    pub fn phase(&self) -> MeasurePhase {
        match self.state {
            State::Idle => MeasurePhase::Idle,
            State::Armed => MeasurePhase::Armed,
            State::AwaitingSecondPoint { .. } => MeasurePhase::AwaitingSecondPoint,
        }
    }

    /// The pending first click, while one is recorded.
    pub fn pending_start(&self) -> Option<SurfacePoint> {
        match self.state {
            State::AwaitingSecondPoint { start } => Some(start),
            _ => None,
        }
    }

    /// Arm the tool. Valid only from Idle, and only with a calibration.
    ///
    /// On failure the tool stays in Idle.
    pub fn start_measuring(
        &mut self,
        calibration: &CalibrationEngine,
    ) -> Result<(), MeasureError> {
        if self.state != State::Idle {
            return Err(MeasureError::AlreadyMeasuring);
        }
        if !calibration.is_calibrated() {
            return Err(MeasureError::ScaleRequired);
        }

        self.state = State::Armed;
        Ok(())
    }

    /// Feed a click in surface coordinates.
    ///
    /// First click records the pending start; second click completes the
    /// measurement using the scale active *now* and returns it. The caller
    /// owns appending the record to the session list.
    pub fn pointer_down(
        &mut self,
        point: SurfacePoint,
        calibration: &CalibrationEngine,
    ) -> Result<Option<Measurement>, MeasureError> {
        match self.state {
            State::Idle => Err(MeasureError::NotArmed),
            State::Armed => {
                self.state = State::AwaitingSecondPoint { start: point };
                Ok(None)
            }
            State::AwaitingSecondPoint { start } => {
                let scale = calibration
                    .current_scale()
                    .ok_or(MeasureError::ScaleRequired)?;

                let measurement =
                    Measurement::new(start, point, scale.scale_factor, &scale.unit);
                self.state = State::Idle;
                Ok(Some(measurement))
            }
        }
    }

    /// Discard any pending point and return to Idle.
    ///
    /// Returns whether there was anything to discard. No measurement is
    /// created.
    pub fn cancel(&mut self) -> bool {
        let had_progress = self.state != State::Idle;
        self.state = State::Idle;
        had_progress
    }
}
