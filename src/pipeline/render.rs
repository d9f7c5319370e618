//! Page rasterisation: render one window of pages to `DynamicImage`s.
//!
//! ## Why a trait?
//!
//! The renderer is the seam between the streaming controller and pdfium.
//! [`PageRenderer`] keeps the controller testable without a PDF library and
//! lets the window stream treat rendering as an opaque blocking call it
//! drives via `spawn_blocking` — the `pdfium-render` crate wraps the pdfium
//! C++ library, which uses thread-local state and must not run on Tokio
//! worker threads.
//!
//! ## Why scale by DPI *and* cap pixels?
//!
//! DPI controls text sharpness relative to the physical page size; the pixel
//! cap bounds memory regardless of it. A 150-DPI render of an A0 poster
//! would still produce a five-figure pixel edge, so either dimension is
//! capped at `max_edge`, scaling the other proportionally.

use crate::output::PageWindow;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::io::Write;
use thiserror::Error;

/// Errors from a [`PageRenderer`] implementation.
///
/// `Unreadable` maps to a fatal [`crate::error::IngestError::InvalidDocument`]
/// when raised during the page count; window-scoped failures degrade to a
/// [`crate::error::PageError::WindowFailed`] result instead.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The document could not be opened or its page count read.
    #[error("could not read document: {0}")]
    Unreadable(String),

    /// Rasterisation failed for a specific page.
    #[error("rasterisation failed for page {page}: {detail}")]
    Page { page: usize, detail: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Converts a byte range of a document into raster images.
///
/// Implementations are blocking and stateless across calls; the streaming
/// controller wraps every invocation in `tokio::task::spawn_blocking`.
pub trait PageRenderer: Send + Sync {
    /// Total number of pages, read without rendering anything.
    fn page_count(&self, bytes: &[u8]) -> Result<usize, RenderError>;

    /// Rasterise exactly the pages of `window`, in page order, at `dpi`
    /// with the longest image edge capped at `max_edge` pixels.
    fn render_window(
        &self,
        bytes: &[u8],
        window: PageWindow,
        dpi: u32,
        max_edge: u32,
    ) -> Result<Vec<DynamicImage>, RenderError>;
}

/// Production renderer backed by pdfium.
///
/// Each call writes the bytes to a managed tempfile and opens a fresh pdfium
/// document, so no parser state survives between windows.
#[derive(Debug, Default)]
pub struct PdfiumRenderer;

impl PdfiumRenderer {
    pub fn new() -> Self {
        Self
    }

    fn with_document<T>(
        &self,
        bytes: &[u8],
        f: impl FnOnce(&PdfDocument) -> Result<T, RenderError>,
    ) -> Result<T, RenderError> {
        let mut tmp = tempfile::NamedTempFile::new()?;
        tmp.write_all(bytes)?;
        let pdfium = Pdfium::default();
        let document = pdfium
            .load_pdf_from_file(tmp.path(), None)
            .map_err(|e| RenderError::Unreadable(format!("{e:?}")))?;
        f(&document)
    }
}

impl PageRenderer for PdfiumRenderer {
    fn page_count(&self, bytes: &[u8]) -> Result<usize, RenderError> {
        self.with_document(bytes, |document| Ok(document.pages().len() as usize))
    }

    fn render_window(
        &self,
        bytes: &[u8],
        window: PageWindow,
        dpi: u32,
        max_edge: u32,
    ) -> Result<Vec<DynamicImage>, RenderError> {
        self.with_document(bytes, |document| {
            let pages = document.pages();
            let total = pages.len() as usize;

            // PDF user space is 72 units per inch, so dpi/72 is the scale.
            let render_config = PdfRenderConfig::new()
                .scale_page_by_factor(dpi as f32 / 72.0)
                .set_maximum_width(max_edge as i32)
                .set_maximum_height(max_edge as i32);

            let mut images = Vec::with_capacity(window.len());
            for page_num in window.pages() {
                if page_num > total {
                    return Err(RenderError::Page {
                        page: page_num,
                        detail: format!("out of range (document has {total} pages)"),
                    });
                }
                let page = pages.get((page_num - 1) as u16).map_err(|e| RenderError::Page {
                    page: page_num,
                    detail: format!("{e:?}"),
                })?;
                let bitmap = page
                    .render_with_config(&render_config)
                    .map_err(|e| RenderError::Page {
                        page: page_num,
                        detail: format!("{e:?}"),
                    })?;
                let image = bitmap.as_image();
                tracing::debug!(
                    page = page_num,
                    width = image.width(),
                    height = image.height(),
                    "rendered page"
                );
                images.push(image);
            }
            Ok(images)
        })
    }
}
