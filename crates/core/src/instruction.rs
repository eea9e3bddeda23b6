//! Free-text scale instruction parsing
//!
//! Users can type the drawing scale the way it is printed on the title block:
//! "1:100", "Scale 1:50", "1:20 millimetres". Parsing returns the ratio
//! denominator plus a confidence score; turning that into a calibration still
//! needs the surface's paper metrics.

/// A scale ratio read from free text.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedScale {
    /// Denominator of the 1:N ratio.
    pub ratio: f32,
    /// Confidence in the reading (0.0-1.0).
    pub confidence: f32,
    /// Canonical text form, e.g. "1:100".
    pub scale_text: String,
}

/// Ratios outside this range are title-block noise, not drawing scales.
const MAX_RATIO: f32 = 10_000.0;

const METRIC_UNITS: [&str; 12] = [
    "meters",
    "meter",
    "metres",
    "metre",
    "centimeters",
    "centimeter",
    "centimetres",
    "centimetre",
    "millimeters",
    "millimeter",
    "millimetres",
    "millimetre",
];

/// Parse a scale instruction, returning the best reading.
///
/// Recognized forms, by descending confidence: "1:N <metric unit>" (0.95),
/// "scale 1:N" (0.9), bare "1:N" (0.7). Returns `None` when no valid ratio
/// appears anywhere in the text.
pub fn parse_scale_instruction(text: &str) -> Option<ParsedScale> {
    let mut best: Option<ParsedScale> = None;

    for line in text.to_lowercase().lines() {
        let mut search_from = 0;
        while let Some(found) = line[search_from..].find("1:") {
            let idx = search_from + found;
            let rest = &line[idx + 2..];
            search_from = idx + 2;

            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            let Ok(ratio) = digits.parse::<f32>() else {
                continue;
            };
            if ratio <= 0.0 || ratio > MAX_RATIO {
                continue;
            }

            let after = rest[digits.len()..].trim_start();
            let confidence = if METRIC_UNITS.iter().any(|unit| after.starts_with(unit)) {
                0.95
            } else if line.contains("scale") {
                0.9
            } else {
                0.7
            };

            let candidate = ParsedScale {
                ratio,
                confidence,
                scale_text: format!("1:{}", ratio as u32),
            };

            let better = best
                .as_ref()
                .map(|current| candidate.confidence > current.confidence)
                .unwrap_or(true);
            if better {
                best = Some(candidate);
            }
        }
    }

    best
}
