//! Error types for the paper2q library.
//!
//! Four failure classes make up the user-facing taxonomy:
//!
//! * [`ExtractError::UnsupportedFormat`] — the declared media type is not a
//!   PDF, PNG or JPEG.
//! * [`ExtractError::Decode`] — the bytes could not be read as the declared
//!   type (corrupt file, zero-page PDF, wrong password).
//! * [`ExtractError::Service`] — the hosted model could not be reached or
//!   refused the request. [`ServiceErrorKind`] says why.
//! * [`ExtractError::ResponseParse`] — the model answered, but not with JSON
//!   matching the question-paper contract. The raw reply is kept verbatim so
//!   the caller can show it.
//!
//! None of them is process-fatal: the operation aborts, the cause is reported
//! and the caller may simply try again. The remaining variants cover
//! configuration and environment problems around that core.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the paper2q library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The declared media type is not one of PDF, PNG or JPEG.
    #[error("Unsupported file type: '{mime}'\nSupported: application/pdf, image/png, image/jpeg")]
    UnsupportedFormat { mime: String },

    /// The document bytes could not be decoded as the declared type.
    #[error("Could not decode document: {detail}")]
    Decode { detail: String },

    // ── Model errors ──────────────────────────────────────────────────────
    /// The hosted model was unreachable, unauthorised, rate-limited, or
    /// rejected the request.
    #[error("Model service error ({kind}): {detail}")]
    Service {
        kind: ServiceErrorKind,
        detail: String,
    },

    /// The reply was not valid JSON or did not match the question-paper shape.
    ///
    /// `raw` is the reply text exactly as received.
    #[error("Could not parse model response: {reason}")]
    ResponseParse { raw: String, reason: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed, or the call was made with unusable input
    /// (e.g. no page images).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// No pdfium library could be loaded.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDF rasterisation needs the pdfium shared library.\n\
  • Install it system-wide (libpdfium.so / libpdfium.dylib / pdfium.dll), or\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (file or containing directory).\n"
    )]
    PdfiumUnavailable(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not write the downloadable JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractError {
    /// Shorthand for a [`ExtractError::Service`] error.
    pub fn service(kind: ServiceErrorKind, detail: impl Into<String>) -> Self {
        Self::Service {
            kind,
            detail: detail.into(),
        }
    }

    /// Shorthand for a [`ExtractError::Decode`] error.
    pub fn decode(detail: impl fmt::Display) -> Self {
        Self::Decode {
            detail: detail.to_string(),
        }
    }

    /// The raw model reply, if this error carries one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::ResponseParse { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

/// Why a call to the hosted model failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ServiceErrorKind {
    /// No reply within the configured timeout (client or gateway side).
    Timeout,
    /// HTTP 401/403: missing, wrong or revoked API key.
    Unauthorized,
    /// HTTP 429: quota or rate limit exhausted.
    RateLimited,
    /// HTTP 5xx: the service is down or overloaded.
    Unavailable,
    /// Any other refusal: bad request, blocked prompt, empty candidate list.
    Rejected,
    /// Connection-level failure (DNS, TLS, reset).
    Transport,
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Timeout => "timeout",
            Self::Unauthorized => "unauthorized",
            Self::RateLimited => "rate limited",
            Self::Unavailable => "unavailable",
            Self::Rejected => "rejected",
            Self::Transport => "transport",
        };
        f.write_str(s)
    }
}
