//! PDF access via pdfium: the embedded text layer and page rasterisation.
//!
//! ## Why blocking traits?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! Both traits here are synchronous; the strategies that use them run inside
//! `tokio::task::spawn_blocking`, keeping Tokio worker threads free during
//! CPU-heavy parsing and rendering.
//!
//! ## Why cap pixels as well as DPI?
//!
//! Page sizes vary wildly: an A0 poster at 150 DPI would produce a
//! 7,000 × 9,900 px image. `max_rendered_pixels` caps the longest edge
//! regardless of physical size, keeping memory bounded per page.

use crate::error::{PageError, PdfTextError};
use image::ImageFormat;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Reads the embedded text layer of a PDF.
pub trait TextLayer: Send + Sync {
    /// Text of every page in order, one entry per page.
    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>, PdfTextError>;
}

/// Opens PDFs for page-by-page rasterisation.
pub trait Rasteriser: Send + Sync {
    fn open<'a>(&'a self, pdf_path: &Path) -> Result<Box<dyn PageSource + 'a>, PdfTextError>;
}

/// An opened document that renders one page at a time.
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Render page `index` (0-based) at `dpi` and write it as PNG to `dest`.
    fn render_png(&self, index: usize, dpi: u32, dest: &Path) -> Result<(), PageError>;
}

/// pdfium-backed [`TextLayer`] and [`Rasteriser`].
pub struct PdfiumEngine {
    pdfium: Pdfium,
    max_rendered_pixels: u32,
}

impl PdfiumEngine {
    /// Bind to libpdfium in `lib_dir`, or to the system library when `None`.
    pub fn bind(lib_dir: Option<&Path>, max_rendered_pixels: u32) -> Result<Self, PdfTextError> {
        let bindings = match lib_dir {
            Some(dir) => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                    &dir.to_path_buf(),
                ))
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| PdfTextError::PdfiumBindingFailed(format!("{:?}", e)))?;

        info!(
            "pdfium bound ({})",
            lib_dir.map_or("system".into(), |d| d.display().to_string())
        );
        Ok(Self {
            pdfium: Pdfium::new(bindings),
            max_rendered_pixels,
        })
    }
}

impl TextLayer for PdfiumEngine {
    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>, PdfTextError> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| PdfTextError::CorruptPdf {
                detail: format!("{:?}", e),
            })?;

        let pages = document.pages();
        let mut texts = Vec::with_capacity(pages.len() as usize);
        for (idx, page) in pages.iter().enumerate() {
            let text = page.text().map_err(|e| PdfTextError::CorruptPdf {
                detail: format!("page {}: {:?}", idx + 1, e),
            })?;
            texts.push(text.all().trim().to_string());
        }
        debug!("Read text layer of {} pages", texts.len());
        Ok(texts)
    }
}

impl Rasteriser for PdfiumEngine {
    fn open<'a>(&'a self, pdf_path: &Path) -> Result<Box<dyn PageSource + 'a>, PdfTextError> {
        let document = self
            .pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| PdfTextError::CorruptPdf {
                detail: format!("{:?}", e),
            })?;
        info!("PDF loaded for rasterisation: {} pages", document.pages().len());
        Ok(Box::new(PdfiumPages {
            document,
            max_pixels: self.max_rendered_pixels,
        }))
    }
}

struct PdfiumPages<'a> {
    document: PdfDocument<'a>,
    max_pixels: u32,
}

impl PageSource for PdfiumPages<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn render_png(&self, index: usize, dpi: u32, dest: &Path) -> Result<(), PageError> {
        let page_num = index + 1;
        let page = self
            .document
            .pages()
            .get(index as u16)
            .map_err(|e| PageError::RenderFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })?;

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(dpi as f32 / 72.0)
            .set_maximum_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| PageError::RenderFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            page_num,
            image.width(),
            image.height()
        );

        image
            .save_with_format(dest, ImageFormat::Png)
            .map_err(|e| PageError::RenderFailed {
                page: page_num,
                detail: format!("PNG write failed: {}", e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn assert_shareable<T: Send + Sync>() {}

    #[test]
    fn engine_can_back_both_shared_traits() {
        assert_shareable::<PdfiumEngine>();
        // Backends hands one engine to both tiers.
        fn as_traits(engine: Arc<PdfiumEngine>) -> (Arc<dyn TextLayer>, Arc<dyn Rasteriser>) {
            (engine.clone(), engine)
        }
        let _ = as_traits;
    }
}
