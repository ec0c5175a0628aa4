//! PDF access: the text layer (tier 1) and page rasterisation (tier 2).
//!
//! Both are blocking, CPU-bound operations behind synchronous traits. The
//! extraction stage calls them inside `tokio::task::spawn_blocking`, since
//! pdfium keeps thread-local state and must not stall the async workers.
//!
//! ## Why cap pixels, not DPI?
//!
//! Page sizes vary wildly: an A0 poster at 150 DPI would produce a
//! 12,000 × 17,000 px image. The longest edge is capped instead, keeping
//! memory bounded and staying near the size vision models read best.

use crate::error::NarrationError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// Structured parser: PDF bytes → text of each page, in page order.
pub trait DocumentParser: Send + Sync {
    fn page_texts(&self, pdf: &[u8], password: Option<&str>) -> Result<Vec<String>, NarrationError>;
}

/// Rasteriser: PDF bytes → one image per page, in page order.
pub trait PageRenderer: Send + Sync {
    fn render_pages(
        &self,
        pdf: &[u8],
        password: Option<&str>,
        max_pixels: u32,
    ) -> Result<Vec<DynamicImage>, NarrationError>;
}

/// pdfium-backed [`DocumentParser`] and [`PageRenderer`].
///
/// Binds to the library at `PDFIUM_LIB_PATH` (a file, or a directory holding
/// the platform library) when set, otherwise to the system library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumEngine {
    lib_path: Option<PathBuf>,
}

impl PdfiumEngine {
    pub fn new() -> Self {
        Self {
            lib_path: std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from),
        }
    }

    /// Use an explicit library path instead of the environment.
    pub fn with_library(path: impl Into<PathBuf>) -> Self {
        Self {
            lib_path: Some(path.into()),
        }
    }

    fn bind(&self) -> Result<Pdfium, NarrationError> {
        let bindings = match &self.lib_path {
            Some(path) if path.is_dir() => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path))
            }
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| NarrationError::PdfiumBindingFailed(format!("{:?}", e)))?;
        Ok(Pdfium::new(bindings))
    }
}

fn load_error(e: PdfiumError, password: Option<&str>) -> NarrationError {
    let detail = format!("{:?}", e);
    let detail = if detail.to_lowercase().contains("password") {
        if password.is_some() {
            "incorrect PDF password".to_string()
        } else {
            "PDF is encrypted; a password is required".to_string()
        }
    } else {
        format!("could not open PDF: {detail}")
    };
    NarrationError::Extraction { detail }
}

impl DocumentParser for PdfiumEngine {
    fn page_texts(&self, pdf: &[u8], password: Option<&str>) -> Result<Vec<String>, NarrationError> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf, password)
            .map_err(|e| load_error(e, password))?;

        let mut texts = Vec::new();
        for (idx, page) in document.pages().iter().enumerate() {
            let text = page
                .text()
                .map_err(|e| NarrationError::Extraction {
                    detail: format!("page {} text layer unreadable: {:?}", idx + 1, e),
                })?
                .all();
            debug!("Page {}: {} chars in text layer", idx + 1, text.len());
            texts.push(text);
        }
        Ok(texts)
    }
}

impl PageRenderer for PdfiumEngine {
    fn render_pages(
        &self,
        pdf: &[u8],
        password: Option<&str>,
        max_pixels: u32,
    ) -> Result<Vec<DynamicImage>, NarrationError> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf, password)
            .map_err(|e| load_error(e, password))?;

        let pages = document.pages();
        info!("PDF loaded: {} pages", pages.len());

        let render_config = PdfRenderConfig::new()
            .set_target_width(max_pixels as i32)
            .set_maximum_height(max_pixels as i32);

        let mut images = Vec::with_capacity(pages.len() as usize);
        for (idx, page) in pages.iter().enumerate() {
            let bitmap =
                page.render_with_config(&render_config)
                    .map_err(|e| NarrationError::Extraction {
                        detail: format!("page {} could not be rendered: {:?}", idx + 1, e),
                    })?;
            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );
            images.push(image);
        }
        Ok(images)
    }
}
