//! Reply parsing: model text → validated [`QuestionPaper`].
//!
//! Two steps, both failing with [`ExtractError::ResponseParse`]:
//!
//! 1. Decode the text as JSON. A reply wrapped in a Markdown code fence
//!    (```` ```json … ``` ````) is unwrapped first; providers without a native
//!    JSON mode do this even when told not to.
//! 2. Validate the JSON structurally ([`crate::pipeline::validate`]).
//!
//! In both cases the error carries the reply exactly as received, so the
//! caller can show it and nothing the model produced is lost.

use crate::error::ExtractError;
use crate::pipeline::validate::validate_paper;
use crate::schema::QuestionPaper;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\r?\n(.*?)\r?\n?```$").unwrap());

/// Remove one outer code fence, if the whole reply is wrapped in one.
pub fn strip_code_fences(input: &str) -> &str {
    let trimmed = input.trim();
    match RE_OUTER_FENCES.captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => trimmed,
    }
}

/// Parse and validate a model reply.
pub fn parse_response(raw: &str) -> Result<QuestionPaper, ExtractError> {
    let body = strip_code_fences(raw);
    if body.len() != raw.trim().len() {
        debug!("Stripped code fence from model reply");
    }

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ExtractError::ResponseParse {
            raw: raw.to_string(),
            reason: format!("not valid JSON: {}", e),
        })?;

    let paper = validate_paper(&value).map_err(|v| ExtractError::ResponseParse {
        raw: raw.to_string(),
        reason: format!("schema mismatch at {}", v),
    })?;

    debug!(
        "Parsed {} questions, total_max_marks={}",
        paper.questions.len(),
        paper.total_max_marks
    );
    Ok(paper)
}
