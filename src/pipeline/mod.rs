//! Pipeline stages for question-paper extraction.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested without the others (and without a model).
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ (backend) ──▶ parse ──▶ validate
//! (mime)    (pdfium)   (PNG)      (one call)    (JSON)    (contract)
//! ```
//!
//! 1. [`input`]    — classify the declared media type
//! 2. [`render`]   — rasterise PDF pages / decode images to RGB; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`encode`]   — PNG-encode each page for the request body
//! 4. [`parse`]    — decode the reply text as JSON (unwrapping code fences)
//! 5. [`validate`] — field-by-field check against the question-paper shape
//!
//! The model call itself lives in [`crate::backend`].

pub mod encode;
pub mod input;
pub mod parse;
pub mod render;
pub mod validate;
