//! Image encoding: `PageImage` → PNG bytes (and base64 for JSON bodies).
//!
//! PNG is lossless, so the model sees exactly the pixels that were
//! rasterised; JPEG artefacts around small glyphs and subscripts hurt math
//! recognition. The same bytes are what a caller would offer for download or
//! preview.

use crate::pipeline::render::PageImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use std::io::Cursor;
use tracing::debug;

/// Media type of every encoded page.
pub const PAGE_MIME: &str = "image/png";

/// A page ready to be sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPage {
    pub page_num: usize,
    pub mime_type: &'static str,
    /// Raw PNG bytes.
    pub data: Vec<u8>,
}

impl EncodedPage {
    /// Standard base64 of [`EncodedPage::data`], as the JSON APIs expect.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }
}

/// Encode one page as PNG.
pub fn encode_page(page: &PageImage) -> Result<EncodedPage, image::ImageError> {
    let mut buf = Vec::new();
    page.image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    debug!("Encoded page {} → {} bytes PNG", page.page_num, buf.len());

    Ok(EncodedPage {
        page_num: page.page_num,
        mime_type: PAGE_MIME,
        data: buf,
    })
}

/// Encode all pages, preserving order. Fails on the first page that cannot be
/// encoded.
pub fn encode_pages(pages: &[PageImage]) -> Result<Vec<EncodedPage>, image::ImageError> {
    pages.iter().map(encode_page).collect()
}
