//! Direct REST backend for the hosted Gemini `generateContent` endpoint.
//!
//! One POST per extraction carries the system instruction, every page as an
//! inline PNG part, the user instruction, and a generation config asking for
//! `application/json` output conforming to the response schema. Reasoning
//! effort becomes `thinkingConfig.thinkingLevel` and is only present for
//! variants that accept it; image fidelity becomes `mediaResolution`.
//!
//! ## Error mapping
//!
//! | Condition | [`ServiceErrorKind`] |
//! |-----------|----------------------|
//! | 401, 403, 400 with an invalid-key message | `Unauthorized` |
//! | 429 | `RateLimited` |
//! | 408, 504, client-side timeout | `Timeout` |
//! | other 5xx | `Unavailable` |
//! | other 4xx, blocked prompt, empty candidates | `Rejected` |
//! | connection failure, unreadable envelope | `Transport` |

use crate::backend::{ModelBackend, ModelReply, ModelRequest};
use crate::config::ApiKey;
use crate::error::{ExtractError, ServiceErrorKind};
use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

/// Public API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// REST client for `models/{model}:generateContent`.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: ApiKey,
    base_url: String,
}

impl GeminiBackend {
    /// Build a backend with its own HTTP client.
    ///
    /// `timeout` bounds the whole request; a full paper with high thinking
    /// can take minutes.
    pub fn new(api_key: ApiKey, timeout: Duration) -> Result<Self, ExtractError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ExtractError::Internal(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the backend at another base URL (proxy, regional endpoint, test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn endpoint(&self, request: &ModelRequest) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url,
            request.model.id()
        )
    }

    async fn send(&self, request: &ModelRequest) -> Result<ModelReply, ExtractError> {
        let url = self.endpoint(request);
        let body = build_request_body(request);
        info!(
            "POST {} ({} page images, mediaResolution={}, thinkingLevel={})",
            url,
            request.pages.len(),
            request.image_fidelity.media_resolution(),
            request.reasoning_effort.map_or("-", |e| e.as_str())
        );

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, self.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        let text = response.text().await.map_err(classify_transport)?;
        debug!("generateContent → HTTP {} ({} bytes)", status, text.len());

        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &text));
        }
        parse_reply_body(&text)
    }
}

impl ModelBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate<'a>(
        &'a self,
        request: &'a ModelRequest,
    ) -> BoxFuture<'a, Result<ModelReply, ExtractError>> {
        Box::pin(self.send(request))
    }
}

/// JSON body of a `generateContent` call.
pub fn build_request_body(request: &ModelRequest) -> Value {
    let mut parts: Vec<Value> = request
        .pages
        .iter()
        .map(|page| {
            json!({
                "inlineData": {
                    "mimeType": page.mime_type,
                    "data": page.to_base64(),
                }
            })
        })
        .collect();
    parts.push(json!({ "text": request.user_instruction }));

    let mut generation_config = json!({
        "temperature": request.temperature,
        "responseMimeType": "application/json",
        "responseSchema": request.response_schema,
        "mediaResolution": request.image_fidelity.media_resolution(),
    });
    if let Some(effort) = request.reasoning_effort {
        generation_config["thinkingConfig"] = json!({ "thinkingLevel": effort.as_str() });
    }
    if let Some(max) = request.max_output_tokens {
        generation_config["maxOutputTokens"] = json!(max);
    }

    json!({
        "systemInstruction": { "parts": [{ "text": request.system_prompt }] },
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": generation_config,
    })
}

// ── Response envelope ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Extract the reply text and token usage from a successful response body.
///
/// Thought-summary parts are skipped; the remaining text parts of the first
/// candidate are concatenated.
pub fn parse_reply_body(body: &str) -> Result<ModelReply, ExtractError> {
    let envelope: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
        ExtractError::service(
            ServiceErrorKind::Transport,
            format!("unreadable response envelope: {}", e),
        )
    })?;

    let Some(candidate) = envelope.candidates.into_iter().next() else {
        let reason = envelope
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .map(|r| format!("prompt blocked ({r})"))
            .unwrap_or_else(|| "response contained no candidates".to_string());
        return Err(ExtractError::service(ServiceErrorKind::Rejected, reason));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter(|p| !p.thought)
        .filter_map(|p| p.text)
        .collect();

    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "UNKNOWN".into());
        return Err(ExtractError::service(
            ServiceErrorKind::Rejected,
            format!("empty reply (finish reason {reason})"),
        ));
    }

    let usage = envelope.usage_metadata;
    Ok(ModelReply {
        text,
        input_tokens: usage.as_ref().and_then(|u| u.prompt_token_count),
        output_tokens: usage.as_ref().and_then(|u| u.candidates_token_count),
    })
}

/// Map a non-2xx response to a service error.
pub fn classify_status(status: u16, body: &str) -> ExtractError {
    let (message, api_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => (env.error.message, env.error.status),
        Err(_) => (body.trim().chars().take(300).collect(), String::new()),
    };

    let invalid_key = api_status == "UNAUTHENTICATED"
        || message.contains("API key not valid")
        || message.contains("API_KEY_INVALID");

    let kind = match status {
        401 | 403 => ServiceErrorKind::Unauthorized,
        400 if invalid_key => ServiceErrorKind::Unauthorized,
        429 => ServiceErrorKind::RateLimited,
        408 | 504 => ServiceErrorKind::Timeout,
        500..=599 => ServiceErrorKind::Unavailable,
        _ => ServiceErrorKind::Rejected,
    };

    let detail = if message.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {message}")
    };
    ExtractError::service(kind, detail)
}

fn classify_transport(e: reqwest::Error) -> ExtractError {
    let kind = if e.is_timeout() {
        ServiceErrorKind::Timeout
    } else {
        ServiceErrorKind::Transport
    };
    ExtractError::service(kind, e.to_string())
}
