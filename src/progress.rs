//! Progress-callback trait for extraction events.
//!
//! An extraction is rasterise → one blocking model request → parse. The model
//! request dominates the wall-clock time (often tens of seconds), so callers
//! need a hook to show an "in progress" state while it runs. Inject an
//! [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`].
//!
//! # Example
//!
//! ```rust
//! use paper2q::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::Arc;
//!
//! struct Spinner;
//!
//! impl ExtractionProgressCallback for Spinner {
//!     fn on_request_start(&self, model: &str, page_count: usize) {
//!         eprintln!("Analysing {page_count} page(s) with {model}…");
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(Spinner))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;
use std::time::Duration;

/// Called by the extraction pipeline at each stage boundary.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called after the document has been rasterised.
    fn on_rasterized(&self, page_count: usize, elapsed: Duration) {
        let _ = (page_count, elapsed);
    }

    /// Called just before the model request is sent.
    fn on_request_start(&self, model: &str, page_count: usize) {
        let _ = (model, page_count);
    }

    /// Called when the model replied (before the reply is parsed).
    fn on_request_complete(&self, elapsed: Duration, response_len: usize) {
        let _ = (elapsed, response_len);
    }

    /// Called when the model request failed.
    fn on_request_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
