//! Measurement report export
//!
//! Serializes the session's measurement set plus calibration metadata into
//! the portable report shape. Pure: reading a session never mutates it.

use crate::calibration::ScaleInfo;
use crate::measure::Measurement;
use crate::session::MeasurementSession;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("nothing to export: no measurements have been taken")]
    NothingToExport,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementReport {
    pub file_name: String,
    pub scale_info: ScaleInfo,
    pub measurements: Vec<MeasurementEntry>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementEntry {
    /// Display distance, e.g. "5000.00 mm".
    pub distance: String,
    pub pixel_distance: f32,
    pub start_point: PointEntry,
    pub end_point: PointEntry,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PointEntry {
    pub x: f32,
    pub y: f32,
}

impl From<&Measurement> for MeasurementEntry {
    fn from(measurement: &Measurement) -> Self {
        Self {
            distance: measurement.formatted_distance(),
            pixel_distance: measurement.pixel_distance(),
            start_point: PointEntry { x: measurement.start().x, y: measurement.start().y },
            end_point: PointEntry { x: measurement.end().x, y: measurement.end().y },
        }
    }
}

/// Build the report for the session's current measurement set.
///
/// Fails with [`ExportError::NothingToExport`] when no measurements exist.
pub fn export_report(session: &MeasurementSession) -> Result<MeasurementReport, ExportError> {
    if session.measurements().is_empty() {
        return Err(ExportError::NothingToExport);
    }

    let file_name = session
        .surface()
        .map(|surface| surface.file_name().to_owned())
        .unwrap_or_default();

    // Measurements exist, so a calibration was active when they were taken;
    // the current one (possibly newer) is what the report describes.
    let scale_info = session
        .calibration()
        .current_scale()
        .cloned()
        .unwrap_or_else(ScaleInfo::not_detected);

    Ok(MeasurementReport {
        file_name,
        scale_info,
        measurements: session.measurements().iter().map(MeasurementEntry::from).collect(),
    })
}
