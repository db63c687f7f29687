//! Extraction entry points.
//!
//! [`extract`] takes page images that are already rasterised;
//! [`extract_document`] starts from the uploaded bytes and a media type.
//! Both send exactly one request to the model backend and return a fully
//! validated [`QuestionPaper`] or an error. There is no retry and no partial
//! result: a reply that fails to parse comes back as
//! [`ExtractError::ResponseParse`] carrying the raw text.
//!
//! [`QuestionPaper`]: crate::schema::QuestionPaper

use crate::audit::audit;
use crate::backend::{ModelBackend, ModelRequest};
use crate::config::ExtractionConfig;
use crate::error::{ExtractError, ServiceErrorKind};
use crate::output::{ExtractionOutput, ExtractionStats};
use crate::pipeline::encode::encode_pages;
use crate::pipeline::render::{self, PageImage, RasterOptions};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub use crate::pipeline::parse::parse_response;

/// Extract the questions from a sequence of page images.
///
/// # Errors
/// - [`ExtractError::InvalidConfig`] if `pages` is empty (nothing is sent).
/// - [`ExtractError::Service`] if the request fails or exceeds
///   `config.api_timeout_secs`.
/// - [`ExtractError::ResponseParse`] if the reply is not a valid question paper.
pub async fn extract(
    pages: &[PageImage],
    config: &ExtractionConfig,
    backend: &dyn ModelBackend,
) -> Result<ExtractionOutput, ExtractError> {
    let total_start = Instant::now();
    if pages.is_empty() {
        return Err(ExtractError::InvalidConfig(
            "no page images to extract from".into(),
        ));
    }

    // ── Step 1: Encode pages ─────────────────────────────────────────────
    let encoded = encode_pages(pages)
        .map_err(|e| ExtractError::Internal(format!("PNG encoding failed: {}", e)))?;
    let payload: usize = encoded.iter().map(|p| p.data.len()).sum();
    debug!("Encoded {} pages ({} bytes of PNG)", encoded.len(), payload);

    let request = ModelRequest::new(encoded, config);

    // ── Step 2: One model request ────────────────────────────────────────
    let model_id = config.model.id();
    info!(
        "Requesting extraction from {} via {} ({} pages)",
        model_id,
        backend.name(),
        pages.len()
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_request_start(model_id, pages.len());
    }

    let request_start = Instant::now();
    let limit = Duration::from_secs(config.api_timeout_secs);
    let reply = match tokio::time::timeout(limit, backend.generate(&request)).await {
        Ok(result) => result,
        Err(_) => Err(ExtractError::service(
            ServiceErrorKind::Timeout,
            format!("no reply within {}s", config.api_timeout_secs),
        )),
    };
    let request_elapsed = request_start.elapsed();

    let reply = match reply {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Model request failed after {:?}: {}", request_elapsed, e);
            if let Some(ref cb) = config.progress_callback {
                cb.on_request_error(&e.to_string());
            }
            return Err(e);
        }
    };
    info!(
        "Model replied in {:?} ({} chars)",
        request_elapsed,
        reply.text.len()
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_request_complete(request_elapsed, reply.text.len());
    }

    // ── Step 3: Parse and audit ──────────────────────────────────────────
    let paper = parse_response(&reply.text)?;
    let audit = audit(&paper);
    for warning in &audit.warnings {
        warn!("{}", warning);
    }

    let stats = ExtractionStats {
        page_count: pages.len(),
        question_count: paper.questions.len(),
        input_tokens: reply.input_tokens,
        output_tokens: reply.output_tokens,
        rasterize_ms: 0,
        request_ms: request_elapsed.as_millis() as u64,
        total_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "Extracted {} questions (declared total {})",
        stats.question_count, paper.total_max_marks
    );

    Ok(ExtractionOutput {
        paper,
        raw_response: reply.text,
        audit,
        stats,
    })
}

/// Rasterise a document, then [`extract`] from its pages.
///
/// A document that cannot be rasterised in full is an error; nothing is sent
/// to the model.
pub async fn extract_document(
    bytes: impl Into<Arc<[u8]>>,
    mime: &str,
    config: &ExtractionConfig,
    backend: &dyn ModelBackend,
) -> Result<ExtractionOutput, ExtractError> {
    let total_start = Instant::now();
    info!("Starting extraction ({})", mime);

    let raster = render::rasterize(bytes, mime, &RasterOptions::from(config)).await;
    let rasterize_ms = raster.duration_ms;
    let pages = raster.into_result()?;
    info!("Rasterised {} page(s) in {}ms", pages.len(), rasterize_ms);
    if let Some(ref cb) = config.progress_callback {
        cb.on_rasterized(pages.len(), Duration::from_millis(rasterize_ms));
    }

    let mut output = extract(&pages, config, backend).await?;
    output.stats.rasterize_ms = rasterize_ms;
    output.stats.total_ms = total_start.elapsed().as_millis() as u64;
    Ok(output)
}

/// Synchronous wrapper around [`extract_document`].
///
/// Creates a temporary tokio runtime internally; do not call from async code.
pub fn extract_document_sync(
    bytes: impl Into<Arc<[u8]>>,
    mime: &str,
    config: &ExtractionConfig,
    backend: &dyn ModelBackend,
) -> Result<ExtractionOutput, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract_document(bytes, mime, config, backend))
}
