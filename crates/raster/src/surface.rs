//! Decoded drawing surface
//!
//! A [`DrawingSurface`] is the fixed pixel coordinate space of one uploaded
//! drawing. It is created once per successful decode, replaced wholesale on a
//! new upload, and never mutated in place.

use crate::RasterError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{ImageBuffer, Rgba};
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one decoded surface.
///
/// Monotonically increasing for the lifetime of the process, so a response
/// tagged with an older surface can always be told apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct SurfaceId(u64);

impl SurfaceId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// What kind of file the surface was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Pdf,
    Image,
}

/// The decoded raster of an uploaded drawing.
#[derive(Debug, Clone)]
pub struct DrawingSurface {
    id: SurfaceId,
    source_kind: SourceKind,
    render_scale: f32,
    mm_per_px_hint: f32,
    file_name: String,
    pixels: RgbaImage,
}

impl DrawingSurface {
    /// Wrap a decoded raster in a surface with a fresh identity.
    ///
    /// `mm_per_px_hint` is the paper-space millimetres represented by one
    /// surface pixel, used to turn a "1:N" ratio into a scale factor.
    pub fn from_raster(
        pixels: RgbaImage,
        source_kind: SourceKind,
        render_scale: f32,
        mm_per_px_hint: f32,
        file_name: &str,
    ) -> Result<Self, RasterError> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(RasterError::Decode("surface has no pixels".to_owned()));
        }
        if !(render_scale > 0.0) || !(mm_per_px_hint > 0.0) {
            return Err(RasterError::Decode("invalid surface metrics".to_owned()));
        }

        Ok(Self {
            id: SurfaceId(NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed)),
            source_kind,
            render_scale,
            mm_per_px_hint,
            file_name: file_name.to_owned(),
            pixels,
        })
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn width_px(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height_px(&self) -> u32 {
        self.pixels.height()
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    /// Decode-time supersampling factor (1.0 for direct image decodes).
    pub fn render_scale(&self) -> f32 {
        self.render_scale
    }

    /// Paper-space millimetres per surface pixel.
    pub fn mm_per_px_hint(&self) -> f32 {
        self.mm_per_px_hint
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Encode the surface as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, RasterError> {
        let mut bytes = Vec::new();
        self.pixels
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
        Ok(bytes)
    }

    /// Base64-encoded PNG payload for the scale-detection collaborator.
    pub fn detection_payload(&self) -> Result<String, RasterError> {
        Ok(BASE64.encode(self.to_png_bytes()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]))
    }

    #[test]
    fn rejects_empty_raster() {
        let err = DrawingSurface::from_raster(
            RgbaImage::new(0, 0),
            SourceKind::Image,
            1.0,
            0.26,
            "empty.png",
        )
        .expect_err("construction should fail");

        assert!(matches!(err, RasterError::Decode(_)));
    }

    #[test]
    fn rejects_non_positive_metrics() {
        let err = DrawingSurface::from_raster(raster(4, 4), SourceKind::Pdf, 0.0, 0.26, "a.pdf")
            .expect_err("construction should fail");
        assert!(matches!(err, RasterError::Decode(_)));

        let err = DrawingSurface::from_raster(raster(4, 4), SourceKind::Pdf, 2.0, -1.0, "a.pdf")
            .expect_err("construction should fail");
        assert!(matches!(err, RasterError::Decode(_)));
    }

    #[test]
    fn png_payload_is_base64_png() {
        let surface =
            DrawingSurface::from_raster(raster(6, 3), SourceKind::Image, 1.0, 0.26, "a.png")
                .expect("construction should succeed");

        let payload = surface.detection_payload().expect("encode should succeed");
        let decoded = BASE64.decode(payload).expect("payload should be base64");
        assert_eq!(&decoded[1..4], b"PNG");
    }
}
