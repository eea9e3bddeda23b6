//! PDF page rasterization backends
//!
//! The default backend reads page geometry with `lopdf` and produces a blank
//! page raster at the requested supersample; parsing vector content is out of
//! scope. Enable the `pdfium` feature for true page rendering through the
//! system pdfium library.

use crate::{RasterError, RgbaImage};
use image::Rgba;
use lopdf::Document;

/// Letter-size fallback when a page carries no MediaBox of its own.
const FALLBACK_PAGE_PT: (f32, f32) = (612.0, 792.0);

/// Renders the first page of a PDF into a raster surface.
pub trait PdfBackend {
    fn render_first_page(&self, bytes: &[u8], scale: f32) -> Result<RgbaImage, RasterError>;
}

/// Geometry-only backend built on `lopdf`.
pub struct LopdfBackend;

impl LopdfBackend {
    fn first_page_size(bytes: &[u8]) -> Result<(f32, f32), RasterError> {
        if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(RasterError::Decode(
                "encrypted PDFs are not supported".to_owned(),
            ));
        }

        let doc = Document::load_mem(bytes)?;
        let pages = doc.get_pages();
        let (_, first_page) = pages
            .iter()
            .next()
            .ok_or_else(|| RasterError::Decode("document has no pages".to_owned()))?;

        let dict = doc.get_dictionary(*first_page)?;
        let size = dict
            .get(b"MediaBox")
            .ok()
            .and_then(|obj| obj.as_array().ok())
            .and_then(|array| {
                if array.len() != 4 {
                    return None;
                }
                let x0 = array[0].as_float().ok()?;
                let y0 = array[1].as_float().ok()?;
                let x1 = array[2].as_float().ok()?;
                let y1 = array[3].as_float().ok()?;
                Some(((x1 - x0).abs(), (y1 - y0).abs()))
            })
            .unwrap_or(FALLBACK_PAGE_PT);

        if size.0 <= 0.0 || size.1 <= 0.0 {
            return Err(RasterError::Decode("degenerate page MediaBox".to_owned()));
        }

        Ok(size)
    }
}

impl PdfBackend for LopdfBackend {
    fn render_first_page(&self, bytes: &[u8], scale: f32) -> Result<RgbaImage, RasterError> {
        let (width_pt, height_pt) = Self::first_page_size(bytes)?;

        let width = (width_pt * scale).round().max(1.0) as u32;
        let height = (height_pt * scale).round().max(1.0) as u32;

        let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

        if width >= 4 && height >= 4 {
            for x in 0..width {
                image.put_pixel(x, 0, Rgba([220, 220, 220, 255]));
                image.put_pixel(x, height - 1, Rgba([220, 220, 220, 255]));
            }
            for y in 0..height {
                image.put_pixel(0, y, Rgba([220, 220, 220, 255]));
                image.put_pixel(width - 1, y, Rgba([220, 220, 220, 255]));
            }
        }

        Ok(image)
    }
}

#[cfg(feature = "pdfium")]
pub mod pdfium_backend {
    //! True first-page rendering through the system pdfium library.

    use super::*;
    use pdfium_render::prelude::*;

    pub struct PdfiumBackend {
        pdfium: Pdfium,
    }

    impl PdfiumBackend {
        pub fn from_system_library() -> Result<Self, RasterError> {
            let bindings = Pdfium::bind_to_system_library().map_err(|err| {
                RasterError::Decode(format!("failed to bind pdfium system library: {err}"))
            })?;

            Ok(Self { pdfium: Pdfium::new(bindings) })
        }
    }

    impl PdfBackend for PdfiumBackend {
        fn render_first_page(&self, bytes: &[u8], scale: f32) -> Result<RgbaImage, RasterError> {
            let document = self
                .pdfium
                .load_pdf_from_byte_slice(bytes, None)
                .map_err(|err| RasterError::Decode(format!("pdfium load failed: {err}")))?;

            let page = document
                .pages()
                .first()
                .map_err(|err| RasterError::Decode(format!("document has no pages: {err}")))?;

            let config = PdfRenderConfig::new().scale_page_by_factor(scale);
            let bitmap = page
                .render_with_config(&config)
                .map_err(|err| RasterError::Decode(format!("pdfium render failed: {err}")))?;

            Ok(bitmap.as_image().into_rgba8())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Object};

    fn single_page_pdf(width_pt: i64, height_pt: i64) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width_pt.into(), height_pt.into()],
        });

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("fixture save should succeed");
        bytes
    }

    #[test]
    fn renders_first_page_at_supersample() {
        let bytes = single_page_pdf(200, 100);
        let image = LopdfBackend
            .render_first_page(&bytes, 2.0)
            .expect("render should succeed");

        assert_eq!(image.width(), 400);
        assert_eq!(image.height(), 200);
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let err = LopdfBackend
            .render_first_page(b"definitely not a pdf", 2.0)
            .expect_err("render should fail");

        assert!(err.is_decode_error());
    }

    #[test]
    fn encrypted_marker_is_rejected() {
        let err = LopdfBackend
            .render_first_page(b"%PDF-1.5 /Encrypt garbage", 2.0)
            .expect_err("render should fail");

        assert!(matches!(err, RasterError::Decode(message) if message.contains("encrypted")));
    }
}
