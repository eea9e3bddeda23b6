//! Scale calibration engine
//!
//! Owns the mapping from surface pixels to real-world millimetres. The
//! calibration can come from the remote detection collaborator, from a manual
//! override, or from a parsed free-text instruction; whichever is active is
//! the single source of truth for every measurement conversion taken from
//! that moment on. Changing it never rewrites existing measurements.

pub const DEFAULT_UNIT: &str = "mm";

/// Calibration result, in the detection collaborator's wire shape.
///
/// `scale_factor` is real-world millimetres per surface pixel.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleInfo {
    pub detected: bool,
    pub scale_text: String,
    pub scale_factor: f32,
    pub confidence: f32,
    #[serde(default = "default_unit")]
    pub unit: String,
}

fn default_unit() -> String {
    DEFAULT_UNIT.to_owned()
}

impl ScaleInfo {
    /// A successful automatic detection.
    pub fn detected(scale_text: impl Into<String>, scale_factor: f32, confidence: f32) -> Self {
        Self {
            detected: true,
            scale_text: scale_text.into(),
            scale_factor,
            confidence: confidence.clamp(0.0, 1.0),
            unit: default_unit(),
        }
    }

    /// The collaborator's "no scale found" answer.
    pub fn not_detected() -> Self {
        Self {
            detected: false,
            scale_text: String::new(),
            scale_factor: 0.0,
            confidence: 0.0,
            unit: default_unit(),
        }
    }

    /// A user-supplied calibration. `detected` stays false: it records
    /// whether the classifier found the scale, not whether one exists.
    pub fn manual(scale_factor: f32, label: impl Into<String>) -> Self {
        Self {
            detected: false,
            scale_text: label.into(),
            scale_factor,
            confidence: 1.0,
            unit: default_unit(),
        }
    }

    fn has_valid_factor(&self) -> bool {
        self.scale_factor.is_finite() && self.scale_factor > 0.0
    }
}

/// Where the active calibration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationSource {
    Detected,
    Manual,
    Instruction,
}

/// Result of feeding a detection response into the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionOutcome {
    /// The response became the active calibration.
    Applied,
    /// The collaborator found no scale; prior state kept. Recoverable:
    /// the caller should offer manual calibration, not fail.
    NotDetected,
}

#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    #[error("invalid scale factor {0}: must be finite and > 0")]
    InvalidScale(f32),
    #[error("could not read a scale from \"{0}\"")]
    UnrecognizedScale(String),
}

/// Calibration state machine.
///
/// {Uncalibrated} --detection succeeds--> {Calibrated(Detected)};
/// {any} --manual override--> {Calibrated(Manual)};
/// {any} --new drawing--> {Uncalibrated}.
///
/// No detection history is kept: nothing reverts a manual override back to a
/// previously detected value automatically.
#[derive(Debug, Default)]
pub struct CalibrationEngine {
    active: Option<(ScaleInfo, CalibrationSource)>,
}

impl CalibrationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a detection collaborator response.
    ///
    /// Only a response with `detected = true` and a validated positive
    /// factor becomes active. The collaborator is untrusted: `detected`
    /// alone never implies a usable factor.
    pub fn set_detected(
        &mut self,
        info: ScaleInfo,
    ) -> Result<DetectionOutcome, CalibrationError> {
        if !info.detected {
            log::debug!("scale detection reported not-found; staying {:?}", self.source());
            return Ok(DetectionOutcome::NotDetected);
        }
        if !info.has_valid_factor() {
            return Err(CalibrationError::InvalidScale(info.scale_factor));
        }

        log::info!(
            "calibrated from detection: {} ({} mm/px, confidence {:.2})",
            info.scale_text,
            info.scale_factor,
            info.confidence
        );
        self.active = Some((info, CalibrationSource::Detected));
        Ok(DetectionOutcome::Applied)
    }

    /// Install a user-supplied calibration.
    ///
    /// Takes precedence over any detected value until a newer detection is
    /// applied or a new drawing is loaded.
    pub fn set_manual_override(
        &mut self,
        scale_factor: f32,
        label: &str,
    ) -> Result<(), CalibrationError> {
        if !scale_factor.is_finite() || scale_factor <= 0.0 {
            return Err(CalibrationError::InvalidScale(scale_factor));
        }

        log::info!("manual calibration: {} ({} mm/px)", label, scale_factor);
        self.active = Some((ScaleInfo::manual(scale_factor, label), CalibrationSource::Manual));
        Ok(())
    }

    /// Install a calibration parsed from a free-text instruction.
    ///
    /// `ratio` is the denominator of a 1:N drawing scale; `mm_per_px` is the
    /// paper-space millimetres represented by one surface pixel.
    pub fn set_from_instruction(
        &mut self,
        scale_text: &str,
        ratio: f32,
        mm_per_px: f32,
    ) -> Result<(), CalibrationError> {
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(CalibrationError::InvalidScale(ratio));
        }
        if !mm_per_px.is_finite() || mm_per_px <= 0.0 {
            return Err(CalibrationError::InvalidScale(mm_per_px));
        }

        let scale_factor = ratio * mm_per_px;
        log::info!("calibrated from instruction: {} ({} mm/px)", scale_text, scale_factor);
        self.active = Some((
            ScaleInfo {
                detected: false,
                scale_text: scale_text.to_owned(),
                scale_factor,
                confidence: 1.0,
                unit: DEFAULT_UNIT.to_owned(),
            },
            CalibrationSource::Instruction,
        ));
        Ok(())
    }

    pub fn current_scale(&self) -> Option<&ScaleInfo> {
        self.active.as_ref().map(|(info, _)| info)
    }

    pub fn source(&self) -> Option<CalibrationSource> {
        self.active.as_ref().map(|(_, source)| *source)
    }

    pub fn is_calibrated(&self) -> bool {
        self.active.is_some()
    }

    /// Back to {Uncalibrated}; called when a new drawing is loaded.
    pub fn reset(&mut self) {
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_detection_becomes_active() {
        let mut engine = CalibrationEngine::new();
        let outcome = engine
            .set_detected(ScaleInfo::detected("1:50", 50.0, 0.9))
            .expect("valid detection should apply");

        assert_eq!(outcome, DetectionOutcome::Applied);
        assert_eq!(engine.source(), Some(CalibrationSource::Detected));
        assert_eq!(engine.current_scale().unwrap().scale_factor, 50.0);
    }

    #[test]
    fn not_detected_is_recoverable_and_keeps_state() {
        let mut engine = CalibrationEngine::new();
        let outcome = engine
            .set_detected(ScaleInfo::not_detected())
            .expect("not-detected is not an error");

        assert_eq!(outcome, DetectionOutcome::NotDetected);
        assert!(!engine.is_calibrated());

        // Same while calibrated: the prior scale survives.
        engine.set_manual_override(2.0, "1:100").unwrap();
        engine.set_detected(ScaleInfo::not_detected()).unwrap();
        assert_eq!(engine.source(), Some(CalibrationSource::Manual));
    }

    #[test]
    fn non_positive_factor_is_rejected_and_state_kept() {
        let mut engine = CalibrationEngine::new();
        engine.set_manual_override(2.0, "1:100").unwrap();

        let err = engine
            .set_detected(ScaleInfo::detected("1:0", 0.0, 0.9))
            .expect_err("zero factor should be rejected");
        assert!(matches!(err, CalibrationError::InvalidScale(_)));

        let err = engine
            .set_detected(ScaleInfo::detected("1:-5", -5.0, 0.9))
            .expect_err("negative factor should be rejected");
        assert!(matches!(err, CalibrationError::InvalidScale(_)));

        assert_eq!(engine.source(), Some(CalibrationSource::Manual));
        assert_eq!(engine.current_scale().unwrap().scale_factor, 2.0);
    }

    #[test]
    fn untrusted_detected_flag_does_not_bypass_validation() {
        let mut engine = CalibrationEngine::new();
        let info = ScaleInfo {
            detected: true,
            scale_text: "1:100".to_owned(),
            scale_factor: f32::NAN,
            confidence: 1.0,
            unit: DEFAULT_UNIT.to_owned(),
        };

        assert!(engine.set_detected(info).is_err());
        assert!(!engine.is_calibrated());
    }

    #[test]
    fn manual_override_takes_precedence_over_detected() {
        let mut engine = CalibrationEngine::new();
        engine.set_detected(ScaleInfo::detected("1:50", 50.0, 0.9)).unwrap();

        engine.set_manual_override(100.0, "1:100").unwrap();
        assert_eq!(engine.source(), Some(CalibrationSource::Manual));
        assert_eq!(engine.current_scale().unwrap().scale_factor, 100.0);
        assert_eq!(engine.current_scale().unwrap().confidence, 1.0);
        assert!(!engine.current_scale().unwrap().detected);
    }

    #[test]
    fn newer_detection_replaces_manual_override() {
        let mut engine = CalibrationEngine::new();
        engine.set_manual_override(100.0, "1:100").unwrap();

        engine.set_detected(ScaleInfo::detected("1:20", 20.0, 0.8)).unwrap();
        assert_eq!(engine.source(), Some(CalibrationSource::Detected));
        assert_eq!(engine.current_scale().unwrap().scale_factor, 20.0);
    }

    #[test]
    fn invalid_manual_factor_is_rejected() {
        let mut engine = CalibrationEngine::new();

        assert!(engine.set_manual_override(0.0, "bad").is_err());
        assert!(engine.set_manual_override(f32::INFINITY, "bad").is_err());
        assert!(!engine.is_calibrated());
    }

    #[test]
    fn instruction_calibration_multiplies_ratio_by_paper_metrics() {
        let mut engine = CalibrationEngine::new();
        engine.set_from_instruction("1:100", 100.0, 0.25).unwrap();

        let scale = engine.current_scale().unwrap();
        assert_eq!(engine.source(), Some(CalibrationSource::Instruction));
        assert!((scale.scale_factor - 25.0).abs() < 1e-6);
        assert_eq!(scale.scale_text, "1:100");
    }

    #[test]
    fn reset_returns_to_uncalibrated() {
        let mut engine = CalibrationEngine::new();
        engine.set_manual_override(2.0, "1:100").unwrap();

        engine.reset();
        assert!(!engine.is_calibrated());
        assert!(engine.current_scale().is_none());
    }

    #[test]
    fn wire_shape_uses_camel_case() {
        let info = ScaleInfo::detected("1:50", 50.0, 0.9);
        let json = serde_json::to_value(&info).unwrap();

        assert_eq!(json["detected"], true);
        assert_eq!(json["scaleText"], "1:50");
        assert_eq!(json["scaleFactor"], 50.0);
        assert_eq!(json["unit"], "mm");
    }
}
