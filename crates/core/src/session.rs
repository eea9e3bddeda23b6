//! Measurement session aggregate
//!
//! One explicit session object owns everything mutable for the open drawing:
//! the decoded surface, viewport state, calibration engine, the measurement
//! tool, and the ordered measurement list. Sub-components receive and return
//! values; nothing holds an independent mutable copy, so multiple sessions
//! can coexist without shared ambient state.
//!
//! Loading a new drawing is a hard reset, not a merge: measurements and
//! calibration belong to exactly one surface.

use crate::calibration::{CalibrationEngine, CalibrationError, ScaleInfo};
use crate::geometry::{ScreenPoint, SurfacePoint};
use crate::instruction::parse_scale_instruction;
use crate::measure::{Measurement, MeasurementId, MeasurementTool, MeasureError, MeasurePhase};
use crate::track::{DetectionTicket, DetectionTracker, TicketStatus};
use crate::viewport::{screen_to_surface, DisplayGeometry, ViewportState};
use planscale_raster::{DrawingSurface, SurfaceId};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no drawing is loaded")]
    NoSurface,
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
}

/// What happened to a delivered detection response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionDisposition {
    /// Became the active calibration.
    Applied,
    /// Valid delivery, but the collaborator found no scale (or the request
    /// failed); calibration unchanged, manual input remains available.
    NotDetected,
    /// Dropped without touching any state: superseded, for a replaced
    /// surface, or past its deadline.
    Stale(TicketStatus),
}

/// Aggregate state for one open drawing.
#[derive(Debug, Default)]
pub struct MeasurementSession {
    surface: Option<DrawingSurface>,
    viewport: ViewportState,
    calibration: CalibrationEngine,
    tool: MeasurementTool,
    measurements: Vec<Measurement>,
    detection: DetectionTracker,
}

impl MeasurementSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a freshly decoded surface, replacing the previous drawing.
    ///
    /// Clears all measurements, resets calibration to uncalibrated, discards
    /// any in-progress measurement, refits the viewport, and invalidates
    /// in-flight detection requests.
    pub fn load_surface(&mut self, surface: DrawingSurface) -> SurfaceId {
        let id = surface.id();
        log::info!(
            "loading surface {} ({}), resetting session",
            id.raw(),
            surface.file_name()
        );

        self.surface = Some(surface);
        self.measurements.clear();
        self.calibration.reset();
        self.tool.cancel();
        self.viewport.reset_for_surface();
        self.detection.invalidate();

        id
    }

    pub fn surface(&self) -> Option<&DrawingSurface> {
        self.surface.as_ref()
    }

    pub fn surface_id(&self) -> Option<SurfaceId> {
        self.surface.as_ref().map(|surface| surface.id())
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut ViewportState {
        &mut self.viewport
    }

    pub fn calibration(&self) -> &CalibrationEngine {
        &self.calibration
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    pub fn measure_phase(&self) -> MeasurePhase {
        self.tool.phase()
    }

    /// Pending first click of an in-progress measurement, for the overlay.
    pub fn pending_start(&self) -> Option<SurfacePoint> {
        self.tool.pending_start()
    }

    /// Geometry of the current surface inside a display region of the given
    /// size.
    pub fn display_geometry(
        &self,
        viewport_width_px: f32,
        viewport_height_px: f32,
    ) -> Result<DisplayGeometry, SessionError> {
        let surface = self.surface.as_ref().ok_or(SessionError::NoSurface)?;
        Ok(DisplayGeometry::new(
            viewport_width_px,
            viewport_height_px,
            surface.width_px(),
            surface.height_px(),
        ))
    }

    /// Issue a detection request ticket for the current surface,
    /// superseding any request still in flight.
    pub fn begin_detection(&mut self) -> Result<DetectionTicket, SessionError> {
        let id = self.surface_id().ok_or(SessionError::NoSurface)?;
        Ok(self.detection.begin(id))
    }

    /// Like [`begin_detection`](Self::begin_detection) with a deadline;
    /// expiry downgrades the response to "not detected".
    pub fn begin_detection_with_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<DetectionTicket, SessionError> {
        let id = self.surface_id().ok_or(SessionError::NoSurface)?;
        Ok(self.detection.begin_with_timeout(id, timeout))
    }

    /// Deliver a detection response.
    ///
    /// `response` is `None` when the collaborator errored; the session treats
    /// that the same as "not detected". Stale deliveries are dropped without
    /// touching calibration; an invalid factor in a current delivery is an
    /// error and also leaves prior state untouched.
    pub fn apply_detection(
        &mut self,
        ticket: &DetectionTicket,
        response: Option<ScaleInfo>,
    ) -> Result<DetectionDisposition, CalibrationError> {
        let status = self.detection.status(ticket, self.surface_id());
        if status != TicketStatus::Current {
            log::warn!(
                "dropping detection response for surface {}: {:?}",
                ticket.surface().raw(),
                status
            );
            return Ok(DetectionDisposition::Stale(status));
        }

        self.detection.finish();

        let Some(info) = response else {
            log::info!("scale detection failed or found nothing; staying uncalibrated");
            return Ok(DetectionDisposition::NotDetected);
        };

        match self.calibration.set_detected(info)? {
            crate::calibration::DetectionOutcome::Applied => Ok(DetectionDisposition::Applied),
            crate::calibration::DetectionOutcome::NotDetected => {
                Ok(DetectionDisposition::NotDetected)
            }
        }
    }

    /// User-supplied calibration; see
    /// [`CalibrationEngine::set_manual_override`].
    pub fn set_manual_scale(
        &mut self,
        scale_factor: f32,
        label: &str,
    ) -> Result<(), CalibrationError> {
        self.calibration.set_manual_override(scale_factor, label)
    }

    /// Calibrate from a free-text instruction like "scale 1:100", using the
    /// current surface's paper metrics.
    pub fn calibrate_from_instruction(&mut self, text: &str) -> Result<(), SessionError> {
        let surface = self.surface.as_ref().ok_or(SessionError::NoSurface)?;
        let parsed = parse_scale_instruction(text)
            .ok_or_else(|| CalibrationError::UnrecognizedScale(text.to_owned()))?;

        self.calibration.set_from_instruction(
            &parsed.scale_text,
            parsed.ratio,
            surface.mm_per_px_hint(),
        )?;
        Ok(())
    }

    /// Arm the measurement tool. Fails with
    /// [`MeasureError::ScaleRequired`] while uncalibrated.
    pub fn start_measuring(&mut self) -> Result<(), MeasureError> {
        self.tool.start_measuring(&self.calibration)
    }

    /// Feed a pointer-down in screen coordinates.
    ///
    /// The point is converted through the viewport transform; a completed
    /// measurement is appended to the session list and returned.
    pub fn pointer_down(
        &mut self,
        screen: ScreenPoint,
        display: &DisplayGeometry,
    ) -> Result<Option<&Measurement>, MeasureError> {
        let point = screen_to_surface(screen, &self.viewport, display);
        self.pointer_down_surface(point)
    }

    /// Feed a pointer-down already in surface coordinates.
    pub fn pointer_down_surface(
        &mut self,
        point: SurfacePoint,
    ) -> Result<Option<&Measurement>, MeasureError> {
        match self.tool.pointer_down(point, &self.calibration)? {
            Some(measurement) => {
                log::debug!(
                    "measurement completed: {} ({} px)",
                    measurement.formatted_distance(),
                    measurement.pixel_distance()
                );
                self.measurements.push(measurement);
                Ok(self.measurements.last())
            }
            None => Ok(None),
        }
    }

    /// Abort the in-progress measurement, if any.
    pub fn cancel_measurement(&mut self) -> bool {
        self.tool.cancel()
    }

    /// Delete one measurement by id. Other entries keep their ids and order.
    pub fn delete_measurement(&mut self, id: MeasurementId) -> bool {
        let before = self.measurements.len();
        self.measurements.retain(|measurement| measurement.id() != id);
        self.measurements.len() != before
    }
}
