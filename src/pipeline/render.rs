//! Document rasterisation: PDF pages and uploaded images → RGB page images.
//!
//! ## Resolution
//!
//! PDF geometry is measured in points (1/72 inch). Rendering at `dpi` scales
//! both axes by the same factor `dpi / 72`, so a page of `w × h` points comes
//! out as `round(w·dpi/72) × round(h·dpi/72)` pixels ([`page_pixel_size`],
//! rounding half away from zero, never below 1 px). The render config carries
//! that single factor ([`pdf_render_config`]); pdfium sizes the bitmap as
//! `(side × factor).round()`.
//!
//! ## Why spawn_blocking?
//!
//! pdfium is a C++ library with thread-local state and CPU-heavy rendering;
//! [`rasterize`] moves the work onto tokio's blocking pool so async callers
//! stay responsive. [`rasterize_blocking`] is the same operation for
//! synchronous callers.
//!
//! ## Report and continue
//!
//! Neither entry point returns `Err` or panics on a bad upload. They return a
//! [`Rasterization`] whose `pages` is empty and whose `error` says what went
//! wrong, so an interactive caller can show the message and wait for the next
//! upload.

use crate::config::{ExtractionConfig, DEFAULT_DPI};
use crate::error::ExtractError;
use crate::pipeline::input::{has_pdf_magic, DocumentKind};
use image::{DynamicImage, ImageFormat, RgbImage};
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// PDF user-space resolution.
pub const BASE_DPI: f32 = 72.0;

/// Environment variable naming a pdfium library file or its directory.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// One rasterised page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageImage {
    /// 1-indexed position in the document.
    pub page_num: usize,
    pub image: RgbImage,
}

impl PageImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Options that affect rasterisation.
#[derive(Debug, Clone)]
pub struct RasterOptions {
    pub dpi: u32,
    pub password: Option<String>,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self::with_dpi(DEFAULT_DPI)
    }
}

impl RasterOptions {
    pub fn with_dpi(dpi: u32) -> Self {
        Self {
            dpi,
            password: None,
        }
    }
}

impl From<&ExtractionConfig> for RasterOptions {
    fn from(config: &ExtractionConfig) -> Self {
        Self {
            dpi: config.dpi,
            password: config.password.clone(),
        }
    }
}

/// Outcome of rasterising one document.
///
/// On success `pages` holds every page in document order and `error` is
/// `None`. On failure `pages` is empty and `error` is set.
#[derive(Debug)]
pub struct Rasterization {
    pub pages: Vec<PageImage>,
    pub error: Option<ExtractError>,
    pub duration_ms: u64,
}

impl Rasterization {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Convert into a `Result` for callers that propagate with `?`.
    pub fn into_result(self) -> Result<Vec<PageImage>, ExtractError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.pages),
        }
    }

    fn finish(result: Result<Vec<PageImage>, ExtractError>, start: Instant) -> Self {
        let duration_ms = start.elapsed().as_millis() as u64;
        match result {
            Ok(pages) => Self {
                pages,
                error: None,
                duration_ms,
            },
            Err(e) => {
                warn!("Rasterisation failed: {}", e);
                Self {
                    pages: Vec::new(),
                    error: Some(e),
                    duration_ms,
                }
            }
        }
    }
}

/// Scale factor applied to both axes for a given DPI.
pub fn scale_factor(dpi: u32) -> f32 {
    dpi as f32 / BASE_DPI
}

/// Render config for `dpi`: one linear scale of the 72-DPI page, same factor
/// on both axes.
pub fn pdf_render_config(dpi: u32) -> PdfRenderConfig {
    PdfRenderConfig::new().scale_page_by_factor(scale_factor(dpi))
}

/// Output pixel size of a page measured in points, rendered at `dpi`.
///
/// Rounds half away from zero; each side is at least 1 px.
pub fn page_pixel_size(width_pts: f32, height_pts: f32, dpi: u32) -> (u32, u32) {
    let scale = f64::from(dpi) / f64::from(BASE_DPI);
    let side = |pts: f32| -> u32 { (f64::from(pts) * scale).round().max(1.0) as u32 };
    (side(width_pts), side(height_pts))
}

/// Rasterise a document on the blocking pool.
pub async fn rasterize(
    bytes: impl Into<Arc<[u8]>>,
    mime: &str,
    options: &RasterOptions,
) -> Rasterization {
    let start = Instant::now();
    let kind = match DocumentKind::from_mime(mime) {
        Ok(kind) => kind,
        Err(e) => return Rasterization::finish(Err(e), start),
    };

    let bytes: Arc<[u8]> = bytes.into();
    let options = options.clone();
    let result = tokio::task::spawn_blocking(move || rasterize_kind(&bytes, kind, &options))
        .await
        .map_err(|e| ExtractError::Internal(format!("Render task panicked: {}", e)))
        .and_then(|r| r);

    Rasterization::finish(result, start)
}

/// Rasterise a document on the current thread.
pub fn rasterize_blocking(bytes: &[u8], mime: &str, options: &RasterOptions) -> Rasterization {
    let start = Instant::now();
    let result =
        DocumentKind::from_mime(mime).and_then(|kind| rasterize_kind(bytes, kind, options));
    Rasterization::finish(result, start)
}

fn rasterize_kind(
    bytes: &[u8],
    kind: DocumentKind,
    options: &RasterOptions,
) -> Result<Vec<PageImage>, ExtractError> {
    match kind {
        DocumentKind::Pdf => render_pdf(bytes, options),
        DocumentKind::Png => decode_image(bytes, ImageFormat::Png),
        DocumentKind::Jpeg => decode_image(bytes, ImageFormat::Jpeg),
    }
}

/// Decode a single uploaded image and normalise it to RGB.
fn decode_image(bytes: &[u8], format: ImageFormat) -> Result<Vec<PageImage>, ExtractError> {
    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ExtractError::decode(format!("{:?} image: {}", format, e)))?;

    let color = decoded.color();
    let image = match decoded {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => {
            debug!("Converting {:?} image to RGB", color);
            other.into_rgb8()
        }
    };
    info!("Loaded image: {}x{} px", image.width(), image.height());

    Ok(vec![PageImage { page_num: 1, image }])
}

/// Render every page of a PDF, in order.
fn render_pdf(bytes: &[u8], options: &RasterOptions) -> Result<Vec<PageImage>, ExtractError> {
    if !has_pdf_magic(bytes) {
        let head: Vec<u8> = bytes.iter().take(4).copied().collect();
        return Err(ExtractError::decode(format!(
            "not a PDF (first bytes: {:?})",
            head
        )));
    }

    let pdfium = bind_pdfium()?;
    let password = options.password.as_deref();

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    ExtractError::decode("wrong password for encrypted PDF")
                } else {
                    ExtractError::decode("PDF is encrypted and requires a password")
                }
            } else {
                ExtractError::decode(format!("corrupt PDF: {}", err_str))
            }
        })?;

    let pages = document.pages();
    let total = pages.len() as usize;
    if total == 0 {
        return Err(ExtractError::decode("PDF has no pages"));
    }
    info!("PDF loaded: {} pages, rendering at {} DPI", total, options.dpi);

    let render_config = pdf_render_config(options.dpi);
    let mut results = Vec::with_capacity(total);
    for (idx, page) in pages.iter().enumerate() {
        let (width, height) =
            page_pixel_size(page.width().value, page.height().value, options.dpi);

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            ExtractError::decode(format!("rendering page {} failed: {:?}", idx + 1, e))
        })?;

        let image = bitmap.as_image().into_rgb8();
        if (image.width(), image.height()) != (width, height) {
            warn!(
                "Page {}: rendered {}x{} px, expected {}x{}",
                idx + 1,
                image.width(),
                image.height(),
                width,
                height
            );
        }
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );

        results.push(PageImage {
            page_num: idx + 1,
            image,
        });
    }

    Ok(results)
}

/// Bind to pdfium: `PDFIUM_LIB_PATH` first, then the system library.
pub fn bind_pdfium() -> Result<Pdfium, ExtractError> {
    if let Some(path) = std::env::var_os(PDFIUM_LIB_PATH_ENV).filter(|p| !p.is_empty()) {
        let mut path = PathBuf::from(path);
        if path.is_dir() {
            path = path.join(Pdfium::pdfium_platform_library_name());
        }
        debug!("Binding pdfium from {}", path.display());
        return Pdfium::bind_to_library(&path)
            .map(Pdfium::new)
            .map_err(|e| ExtractError::PdfiumUnavailable(format!("{}: {:?}", path.display(), e)));
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| ExtractError::PdfiumUnavailable(format!("{:?}", e)))
}
