//! # paper2q
//!
//! Extract the questions of an exam paper into structured JSON using a
//! multimodal model.
//!
//! Question papers are mostly scanned or typeset PDFs full of mathematics,
//! diagrams, multi-part questions and internal choice ("attempt any two").
//! Text extraction loses all of that. This crate rasterises every page,
//! sends all pages together with an extraction policy and a response schema
//! to a hosted model in **one** request, and validates the reply field by
//! field into a [`QuestionPaper`].
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / PNG / JPEG bytes + media type
//!  │
//!  ├─ 1. Render   rasterise pages via pdfium, or decode the image (spawn_blocking)
//!  ├─ 2. Encode   RGB page → PNG
//!  ├─ 3. Request  one call: system prompt + pages + instruction + schema
//!  ├─ 4. Parse    JSON decode, code fences tolerated
//!  ├─ 5. Validate every field against the question-paper contract
//!  └─ 6. Audit    marks totals and LaTeX delimiter checks (advisory)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paper2q::{extract_document, ApiKey, ExtractionConfig, GeminiBackend};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder().dpi(300).build()?;
//!     let backend = GeminiBackend::new(ApiKey::from_env()?, Duration::from_secs(300))?;
//!
//!     let bytes = std::fs::read("paper.pdf")?;
//!     let output = extract_document(bytes, "application/pdf", &config, &backend).await?;
//!     for q in &output.paper.questions {
//!         println!("Q{} [{}] {} marks", q.question_number, q.question_type, q.marks);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paper2q` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! ```toml
//! paper2q = { version = "0.1", default-features = false }
//! ```
//!
//! ## Choosing a Model
//!
//! | Variant | Id | Reasoning effort |
//! |---------|----|------------------|
//! | [`ModelVariant::Gemini3FlashPreview`] | `gemini-3-flash-preview` | low / medium / high |
//! | [`ModelVariant::Gemini25Flash`] | `gemini-2.5-flash` | not supported (omitted) |
//!
//! Any other vision model reachable through `edgequake_llm` can be used via
//! [`ProviderBackend`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod audit;
pub mod backend;
pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod schema;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use audit::{audit, AuditWarning, MarksAudit};
pub use backend::gemini::GeminiBackend;
pub use backend::provider::ProviderBackend;
pub use backend::{ModelBackend, ModelReply, ModelRequest};
pub use config::{
    ApiKey, ExtractionConfig, ExtractionConfigBuilder, ImageFidelity, ModelVariant,
    ReasoningEffort,
};
pub use error::{ExtractError, ServiceErrorKind};
pub use extract::{extract, extract_document, extract_document_sync, parse_response};
pub use output::{
    download, estimate_processing_time, write_download, Download, ExtractionOutput,
    ExtractionStats,
};
pub use pipeline::render::{rasterize, rasterize_blocking, PageImage, RasterOptions, Rasterization};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use schema::{response_schema, QuestionDetail, QuestionPaper, QuestionType};
