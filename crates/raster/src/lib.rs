//! Drawing rasterizer
//!
//! Decodes an uploaded architectural drawing (PDF or raster image) into a
//! fixed-resolution [`DrawingSurface`]. The surface's pixel dimensions become
//! the coordinate space for every later calibration and measurement
//! operation, independent of display zoom.

pub mod pdf;
pub mod surface;

pub use pdf::{LopdfBackend, PdfBackend};
pub use surface::{DrawingSurface, RgbaImage, SourceKind, SurfaceId};

use image::Rgba;
use std::fs;
use std::path::Path;

/// Supersampling factor applied when rasterizing a PDF page.
///
/// Kept at 2x or above so text and thin lines survive later display zoom.
pub const RENDER_SCALE: f32 = 2.0;

const PDF_POINTS_PER_INCH: f32 = 72.0;
const MM_PER_INCH: f32 = 25.4;

/// DPI assumed for raster images that carry no physical resolution.
const IMAGE_ASSUMED_DPI: f32 = 96.0;

/// Surface dimensions used when an SVG root carries no width/height.
const SVG_FALLBACK_SIZE: (u32, u32) = (800, 600);

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("PDF parse error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RasterError {
    /// True for the "recognized but unreadable" class of failures, as opposed
    /// to a format we never accept.
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::Pdf(_) | Self::Image(_) | Self::Decode(_))
    }
}

/// File format accepted by the rasterizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Pdf,
    Jpeg,
    Png,
    Svg,
}

impl FileFormat {
    /// Resolve from a MIME type (upload boundary).
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "application/pdf" => Some(Self::Pdf),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/svg+xml" => Some(Self::Svg),
            _ => None,
        }
    }

    /// Resolve from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "svg" => Some(Self::Svg),
            _ => None,
        }
    }

    fn source_kind(self) -> SourceKind {
        match self {
            Self::Pdf => SourceKind::Pdf,
            Self::Jpeg | Self::Png | Self::Svg => SourceKind::Image,
        }
    }
}

/// Decodes drawing files into surfaces.
///
/// PDF pages go through a pluggable [`PdfBackend`]; raster images decode
/// directly at native resolution.
pub struct Rasterizer {
    backend: Box<dyn PdfBackend>,
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer {
    pub fn new() -> Self {
        Self { backend: Box::new(LopdfBackend) }
    }

    pub fn with_backend(backend: Box<dyn PdfBackend>) -> Self {
        Self { backend }
    }

    /// Load a drawing from disk, resolving the format from the extension.
    pub fn load(&self, path: &Path) -> Result<DrawingSurface, RasterError> {
        let format = FileFormat::from_path(path).ok_or_else(|| {
            RasterError::UnsupportedFormat(
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .unwrap_or("<none>")
                    .to_owned(),
            )
        })?;

        let bytes = fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("drawing")
            .to_owned();

        self.load_bytes(&bytes, format, &file_name)
    }

    /// Decode an in-memory drawing of a known format.
    pub fn load_bytes(
        &self,
        bytes: &[u8],
        format: FileFormat,
        file_name: &str,
    ) -> Result<DrawingSurface, RasterError> {
        let surface = match format {
            FileFormat::Pdf => {
                let pixels = self.backend.render_first_page(bytes, RENDER_SCALE)?;
                DrawingSurface::from_raster(
                    pixels,
                    SourceKind::Pdf,
                    RENDER_SCALE,
                    MM_PER_INCH / (PDF_POINTS_PER_INCH * RENDER_SCALE),
                    file_name,
                )?
            }
            FileFormat::Jpeg | FileFormat::Png => {
                let pixels = image::load_from_memory(bytes)?.to_rgba8();
                DrawingSurface::from_raster(
                    pixels,
                    format.source_kind(),
                    1.0,
                    MM_PER_INCH / IMAGE_ASSUMED_DPI,
                    file_name,
                )?
            }
            FileFormat::Svg => {
                let (width, height) = svg_dimensions(bytes)?;
                let pixels = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
                DrawingSurface::from_raster(
                    pixels,
                    SourceKind::Image,
                    1.0,
                    MM_PER_INCH / IMAGE_ASSUMED_DPI,
                    file_name,
                )?
            }
        };

        log::info!(
            "rasterized {} ({:?}) to {}x{} surface {}",
            file_name,
            format,
            surface.width_px(),
            surface.height_px(),
            surface.id().raw()
        );

        Ok(surface)
    }
}

/// Read the root width/height attributes of an SVG document.
///
/// The drawing itself is not vectorized; only the declared dimensions matter
/// so the surface coordinate space matches what the author drew against.
fn svg_dimensions(bytes: &[u8]) -> Result<(u32, u32), RasterError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| RasterError::Decode("SVG is not valid UTF-8".to_owned()))?;

    let tag_start = text
        .find("<svg")
        .ok_or_else(|| RasterError::Decode("no <svg> root element".to_owned()))?;
    let tag_end = text[tag_start..]
        .find('>')
        .map(|idx| tag_start + idx)
        .ok_or_else(|| RasterError::Decode("unterminated <svg> element".to_owned()))?;
    let tag = &text[tag_start..tag_end];

    let width = svg_attribute(tag, "width");
    let height = svg_attribute(tag, "height");

    match (width, height) {
        (Some(width), Some(height)) if width > 0 && height > 0 => Ok((width, height)),
        (None, None) => Ok(SVG_FALLBACK_SIZE),
        _ => Err(RasterError::Decode("invalid SVG dimensions".to_owned())),
    }
}

fn svg_attribute(tag: &str, name: &str) -> Option<u32> {
    let marker = format!("{name}=\"");
    let start = tag.find(&marker)? + marker.len();
    let value = tag[start..].split('"').next()?;
    let numeric: String = value
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    numeric.parse::<f32>().ok().map(|v| v.round().max(0.0) as u32)
}
