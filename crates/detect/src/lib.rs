//! Scale-detection collaborator boundary
//!
//! The remote service that reads a printed scale annotation off a drawing is
//! an opaque, untrusted classifier: it takes a base64-encoded raster plus an
//! optional user instruction and returns a [`ScaleInfo`] candidate. Nothing
//! here trusts `detected = true` to imply a usable factor (the calibration
//! engine validates again), and a transport failure is always equivalent to
//! "not detected" for the caller.

use planscale_core::instruction::parse_scale_instruction;
use planscale_core::ScaleInfo;
use planscale_raster::{DrawingSurface, RasterError};

/// Request payload for the detection collaborator.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRequest {
    /// Base64-encoded PNG of the drawing surface.
    pub image: String,
    /// Free-text hint from the user, e.g. "scale is 1:50 on the title block".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_instruction: Option<String>,
}

impl DetectionRequest {
    /// Build a request for the given surface.
    pub fn for_surface(
        surface: &DrawingSurface,
        custom_instruction: Option<&str>,
    ) -> Result<Self, RasterError> {
        Ok(Self {
            image: surface.detection_payload()?,
            custom_instruction: custom_instruction.map(ToOwned::to_owned),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("detection transport failed: {0}")]
    Transport(String),
    #[error("detection response was malformed: {0}")]
    InvalidResponse(String),
}

/// The external classifier, seen from the engine's side.
///
/// Implementations may call a remote service, run locally, or be test
/// doubles; callers must treat any error as "not detected".
pub trait ScaleDetector {
    fn analyze(&self, request: &DetectionRequest) -> Result<ScaleInfo, DetectError>;
}

/// Offline detector that only reads the user's instruction text.
///
/// Used when the remote collaborator is unavailable. It needs the surface's
/// paper metrics to turn a 1:N ratio into millimetres per surface pixel, so
/// it is constructed per drawing.
#[derive(Debug, Clone, Copy)]
pub struct InstructionDetector {
    mm_per_px: f32,
}

impl InstructionDetector {
    pub fn new(mm_per_px: f32) -> Self {
        Self { mm_per_px }
    }

    pub fn for_surface(surface: &DrawingSurface) -> Self {
        Self::new(surface.mm_per_px_hint())
    }
}

impl ScaleDetector for InstructionDetector {
    fn analyze(&self, request: &DetectionRequest) -> Result<ScaleInfo, DetectError> {
        let Some(instruction) = request.custom_instruction.as_deref() else {
            return Ok(ScaleInfo::not_detected());
        };

        match parse_scale_instruction(instruction) {
            Some(parsed) => {
                log::debug!(
                    "instruction \"{}\" parsed as {} (confidence {:.2})",
                    instruction,
                    parsed.scale_text,
                    parsed.confidence
                );
                Ok(ScaleInfo::detected(
                    parsed.scale_text,
                    parsed.ratio * self.mm_per_px,
                    parsed.confidence,
                ))
            }
            None => Ok(ScaleInfo::not_detected()),
        }
    }
}
