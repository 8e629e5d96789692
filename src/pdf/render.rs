//! Page previews.
//!
//! Pages are rasterized to PNG with PDFium. A failed render is never fatal to
//! a session: the caller gets a blank placeholder of the page's size instead.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use pdfium_render::prelude::*;
use thiserror::Error;
use tracing::{debug, warn};

use super::PdfDocument;

/// Default preview resolution.
pub const DEFAULT_PREVIEW_DPI: u32 = 96;

/// Maximum width or height of a preview image.
const MAX_DIMENSION_PX: u32 = 4096;

/// PDF points per inch.
const POINTS_PER_INCH: f32 = 72.0;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDFium library unavailable: {0}")]
    LibraryUnavailable(String),

    #[error("Failed to render page {}: {reason}", page + 1)]
    Page { page: usize, reason: String },

    #[error("Failed to encode preview image: {0}")]
    Encode(String),
}

/// Rasterizes one page of a PDF on disk to PNG bytes.
pub trait PageRenderer: Send + Sync {
    fn render_page(&self, path: &Path, page: usize, dpi: u32) -> Result<Vec<u8>, RenderError>;
}

/// A rendered page, or a blank stand-in when rendering failed.
#[derive(Debug, Clone)]
pub struct Preview {
    pub page: usize,
    pub png: Vec<u8>,
    pub placeholder: bool,
}

/// Render `page`, falling back to a blank placeholder on failure.
pub fn render_preview(
    renderer: &dyn PageRenderer,
    document: &PdfDocument,
    page: usize,
    dpi: u32,
) -> Result<Preview, RenderError> {
    match renderer.render_page(&document.path, page, dpi) {
        Ok(png) => Ok(Preview {
            page,
            png,
            placeholder: false,
        }),
        Err(e) => {
            warn!(page = page + 1, error = %e, "Page render failed, using placeholder");
            let (width, height) = document.page_size(page).map_err(|e| RenderError::Page {
                page,
                reason: e.to_string(),
            })?;
            let (w, h) = compute_render_dimensions(width, height, dpi);
            Ok(Preview {
                page,
                png: placeholder_png(w, h)?,
                placeholder: true,
            })
        }
    }
}

/// A white PNG of the given size.
pub fn placeholder_png(width: u32, height: u32) -> Result<Vec<u8>, RenderError> {
    let img = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    encode_png(&DynamicImage::ImageRgb8(img))
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, RenderError> {
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, ImageOutputFormat::Png)
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    Ok(cursor.into_inner())
}

/// Pixel dimensions for a page at `dpi`, each clamped to [1, MAX_DIMENSION_PX]
/// with the aspect ratio preserved.
fn compute_render_dimensions(width_points: f32, height_points: f32, dpi: u32) -> (u32, u32) {
    let scale = dpi as f32 / POINTS_PER_INCH;
    let raw_w = (width_points * scale).max(1.0);
    let raw_h = (height_points * scale).max(1.0);

    let max_dim = raw_w.max(raw_h);
    if max_dim > MAX_DIMENSION_PX as f32 {
        let ratio = MAX_DIMENSION_PX as f32 / max_dim;
        let w = ((raw_w * ratio) as u32).clamp(1, MAX_DIMENSION_PX);
        let h = ((raw_h * ratio) as u32).clamp(1, MAX_DIMENSION_PX);
        (w, h)
    } else {
        (raw_w as u32, raw_h as u32)
    }
}

/// Renders pages with Google PDFium.
///
/// The library is bound per call because `Pdfium` is `!Send`; the OS caches
/// the dynamic load so repeat binds are cheap.
pub struct PdfiumRenderer;

/// Discovery order: `PDFIUM_DYNAMIC_LIB_PATH`, next to the executable, system paths.
fn load_pdfium() -> Result<Pdfium, RenderError> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        debug!(path = %path, "Loading PDFium from env var");
        let bindings = Pdfium::bind_to_library(&path).map_err(|e| {
            RenderError::LibraryUnavailable(format!("Failed to load PDFium from {path}: {e}"))
        })?;
        return Ok(Pdfium::new(bindings));
    }

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        let lib_path =
            Pdfium::pdfium_platform_library_name_at_path(exe_dir.to_string_lossy().as_ref());
        if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
            debug!(dir = %exe_dir.display(), "Loaded PDFium next to executable");
            return Ok(Pdfium::new(bindings));
        }
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| {
        RenderError::LibraryUnavailable(format!(
            "PDFium not found. Set PDFIUM_DYNAMIC_LIB_PATH or install PDFium: {e}"
        ))
    })?;
    Ok(Pdfium::new(bindings))
}

impl PageRenderer for PdfiumRenderer {
    fn render_page(&self, path: &Path, page: usize, dpi: u32) -> Result<Vec<u8>, RenderError> {
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| RenderError::Page {
                page,
                reason: format!("Failed to load PDF: {e}"),
            })?;

        let pages = document.pages();
        let page_index = u16::try_from(page).map_err(|_| RenderError::Page {
            page,
            reason: format!("Page index {page} exceeds u16 maximum"),
        })?;
        let pdf_page = pages.get(page_index).map_err(|_| RenderError::Page {
            page,
            reason: format!("Out of range (document has {} pages)", pages.len()),
        })?;

        let (target_w, target_h) =
            compute_render_dimensions(pdf_page.width().value, pdf_page.height().value, dpi);
        let config = PdfRenderConfig::new()
            .set_target_width(target_w as i32)
            .set_maximum_height(target_h as i32);

        let bitmap = pdf_page
            .render_with_config(&config)
            .map_err(|e| RenderError::Page {
                page,
                reason: e.to_string(),
            })?;
        let png = encode_png(&bitmap.as_image())?;

        debug!(
            page = page + 1,
            width = target_w,
            height = target_h,
            png_size = png.len(),
            "Rendered page preview"
        );
        Ok(png)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture_document;
    use image::GenericImageView;

    struct FailingRenderer;

    impl PageRenderer for FailingRenderer {
        fn render_page(&self, _: &Path, page: usize, _: u32) -> Result<Vec<u8>, RenderError> {
            Err(RenderError::Page {
                page,
                reason: "boom".into(),
            })
        }
    }

    struct FixedRenderer;

    impl PageRenderer for FixedRenderer {
        fn render_page(&self, _: &Path, _: usize, _: u32) -> Result<Vec<u8>, RenderError> {
            Ok(vec![1, 2, 3])
        }
    }

    #[test]
    fn test_failed_render_yields_placeholder() {
        let doc = fixture_document(2);
        let preview = render_preview(&FailingRenderer, &doc, 1, 72).unwrap();
        assert!(preview.placeholder);
        assert_eq!(preview.page, 1);

        let img = image::load_from_memory(&preview.png).unwrap();
        assert_eq!((img.width(), img.height()), (595, 842));
    }

    #[test]
    fn test_successful_render_passes_through() {
        let doc = fixture_document(1);
        let preview = render_preview(&FixedRenderer, &doc, 0, 72).unwrap();
        assert!(!preview.placeholder);
        assert_eq!(preview.png, vec![1, 2, 3]);
    }

    #[test]
    fn test_placeholder_for_missing_page_is_an_error() {
        let doc = fixture_document(1);
        assert!(render_preview(&FailingRenderer, &doc, 5, 72).is_err());
    }

    #[test]
    fn test_dimensions_are_capped() {
        let (w, h) = compute_render_dimensions(14400.0, 7200.0, 72);
        assert_eq!(w, MAX_DIMENSION_PX);
        assert_eq!(h, MAX_DIMENSION_PX / 2);
    }
}
