//! PDF rasterisation tests.
//!
//! The PDFs are assembled in memory with a correct xref table. Every test
//! skips when no pdfium library can be bound (set `PDFIUM_LIB_PATH` or
//! install libpdfium system-wide to run them).

use paper2q::pipeline::render::bind_pdfium;
use paper2q::{rasterize, rasterize_blocking, ExtractError, RasterOptions};

/// Skip this test if pdfium is not available.
macro_rules! skip_unless_pdfium {
    () => {{
        if let Err(e) = bind_pdfium() {
            println!("SKIP — {}", e.to_string().lines().next().unwrap_or_default());
            return;
        }
    }};
}

/// A PDF with one blank page per entry of `media_boxes` (width, height in points).
fn build_pdf(media_boxes: &[(u32, u32)]) -> Vec<u8> {
    let n = media_boxes.len();
    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", i + 3)).collect();

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), n),
    ];
    for (w, h) in media_boxes {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {w} {h}] /Resources << >> >>"
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for off in offsets {
        out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );
    out
}

#[test]
fn single_page_dimensions_follow_dpi() {
    skip_unless_pdfium!();
    let pdf = build_pdf(&[(612, 792)]);

    let pages = rasterize_blocking(&pdf, "application/pdf", &RasterOptions::with_dpi(200))
        .into_result()
        .unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!((pages[0].width(), pages[0].height()), (1700, 2200));

    let pages = rasterize_blocking(&pdf, "application/pdf", &RasterOptions::with_dpi(72))
        .into_result()
        .unwrap();
    assert_eq!((pages[0].width(), pages[0].height()), (612, 792));
}

#[test]
fn a4_at_300_dpi_rounds() {
    skip_unless_pdfium!();
    let pdf = build_pdf(&[(595, 842)]);
    let pages = rasterize_blocking(&pdf, "application/pdf", &RasterOptions::with_dpi(300))
        .into_result()
        .unwrap();
    // 595 * 300 / 72 = 2479.17, 842 * 300 / 72 = 3508.33
    assert_eq!((pages[0].width(), pages[0].height()), (2479, 3508));
}

#[tokio::test]
async fn pages_come_back_in_document_order() {
    skip_unless_pdfium!();
    let pdf = build_pdf(&[(144, 144), (288, 144), (144, 288)]);

    let raster = rasterize(pdf, "application/pdf", &RasterOptions::with_dpi(72)).await;
    assert!(raster.is_ok());
    let pages = raster.into_result().unwrap();

    assert_eq!(pages.iter().map(|p| p.page_num).collect::<Vec<_>>(), vec![1, 2, 3]);
    let sizes: Vec<_> = pages.iter().map(|p| (p.width(), p.height())).collect();
    assert_eq!(sizes, vec![(144, 144), (288, 144), (144, 288)]);
}

#[test]
fn truncated_pdf_is_a_decode_error() {
    skip_unless_pdfium!();
    let pdf = build_pdf(&[(612, 792)]);
    let raster = rasterize_blocking(&pdf[..40], "application/pdf", &RasterOptions::default());
    assert!(raster.pages.is_empty());
    assert!(matches!(raster.error, Some(ExtractError::Decode { .. })));
}

#[test]
fn zero_page_pdf_is_a_decode_error() {
    skip_unless_pdfium!();
    let pdf = build_pdf(&[]);
    let raster = rasterize_blocking(&pdf, "application/pdf", &RasterOptions::default());
    assert!(raster.pages.is_empty());
    assert!(matches!(raster.error, Some(ExtractError::Decode { .. })));
}
