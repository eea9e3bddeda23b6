//! PlanScale core
//!
//! Calibration and measurement engine for architectural drawings: viewport
//! transform, scale calibration, the two-click measurement state machine,
//! the owning session aggregate, overlay projection, and report export.

pub mod calibration;
pub mod export;
pub mod geometry;
pub mod instruction;
pub mod measure;
pub mod overlay;
pub mod session;
pub mod track;
pub mod viewport;

pub use calibration::{
    CalibrationEngine, CalibrationError, CalibrationSource, DetectionOutcome, ScaleInfo,
};
pub use export::{export_report, ExportError, MeasurementReport};
pub use geometry::{ScreenPoint, SurfacePoint};
pub use instruction::{parse_scale_instruction, ParsedScale};
pub use measure::{Measurement, MeasurementId, MeasurementTool, MeasureError, MeasurePhase};
pub use overlay::{overlay_primitives, MarkerKind, OverlayPrimitive};
pub use session::{DetectionDisposition, MeasurementSession, SessionError};
pub use track::{CancellationToken, DetectionTicket, DetectionTracker, TicketStatus};
pub use viewport::{
    screen_to_surface, surface_to_screen, DisplayGeometry, ViewportError, ViewportState,
    ZOOM_STEP,
};
