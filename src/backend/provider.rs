//! Adapter that runs an extraction through any `edgequake_llm` vision provider.
//!
//! Providers reached this way have no native response-schema parameter, so
//! the schema is appended to the system prompt and the reply is parsed the
//! same way as a Gemini reply (code fences tolerated). Image fidelity maps to
//! the provider's image `detail` hint. Reasoning effort has no portable
//! equivalent and is not forwarded.

use crate::backend::{ModelBackend, ModelReply, ModelRequest};
use crate::error::{ExtractError, ServiceErrorKind};
use crate::prompts::schema_appendix;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::{debug, info};

/// [`ModelBackend`] over a pre-built `edgequake_llm` provider.
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl ProviderBackend {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            label: "provider".to_string(),
        }
    }

    /// Instantiate a named provider (`"openai"`, `"anthropic"`, `"gemini"`, …)
    /// with the given model. The provider reads its own API key from the
    /// environment.
    pub fn from_name(provider_name: &str, model: &str) -> Result<Self, ExtractError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            ExtractError::InvalidConfig(format!(
                "provider '{}' could not be configured: {}",
                provider_name, e
            ))
        })?;
        Ok(Self {
            provider,
            label: provider_name.to_string(),
        })
    }
}

impl std::fmt::Debug for ProviderBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderBackend")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl ModelBackend for ProviderBackend {
    fn name(&self) -> &str {
        &self.label
    }

    fn generate<'a>(
        &'a self,
        request: &'a ModelRequest,
    ) -> BoxFuture<'a, Result<ModelReply, ExtractError>> {
        Box::pin(async move {
            let messages = build_messages(request);
            let options = build_options(request);
            info!(
                "{}: sending {} page images (detail={})",
                self.label,
                request.pages.len(),
                request.image_fidelity.detail()
            );

            let response = self
                .provider
                .chat(&messages, Some(&options))
                .await
                .map_err(|e| {
                    let detail = e.to_string();
                    ExtractError::service(classify_message(&detail), detail)
                })?;

            debug!(
                "{}: {} input tokens, {} output tokens",
                self.label, response.prompt_tokens, response.completion_tokens
            );
            Ok(ModelReply {
                text: response.content,
                input_tokens: Some(response.prompt_tokens as u64),
                output_tokens: Some(response.completion_tokens as u64),
            })
        })
    }
}

/// System message (prompt plus embedded schema), then one user message
/// carrying the instruction and every page image in order.
fn build_messages(request: &ModelRequest) -> Vec<ChatMessage> {
    let system = format!(
        "{}{}",
        request.system_prompt,
        schema_appendix(&request.response_schema)
    );
    let images: Vec<ImageData> = request
        .pages
        .iter()
        .map(|page| {
            ImageData::new(page.to_base64(), page.mime_type)
                .with_detail(request.image_fidelity.detail())
        })
        .collect();

    vec![
        ChatMessage::system(system),
        ChatMessage::user_with_images(request.user_instruction.as_str(), images),
    ]
}

fn build_options(request: &ModelRequest) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(request.temperature),
        max_tokens: request.max_output_tokens.map(|n| n as usize),
        ..Default::default()
    }
}

/// Best-effort classification of a provider error message.
///
/// Providers surface HTTP failures as formatted strings, so the status code
/// or its usual wording is matched.
pub fn classify_message(message: &str) -> ServiceErrorKind {
    let m = message.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| m.contains(n));

    if has(&["401", "403", "unauthorized", "forbidden", "invalid api key", "api key not valid", "authentication"]) {
        ServiceErrorKind::Unauthorized
    } else if has(&["429", "rate limit", "rate_limit", "quota", "resource_exhausted"]) {
        ServiceErrorKind::RateLimited
    } else if has(&["timed out", "timeout", "deadline"]) {
        ServiceErrorKind::Timeout
    } else if has(&["500", "502", "503", "unavailable", "overloaded", "internal server error"]) {
        ServiceErrorKind::Unavailable
    } else if has(&["connection", "network", "dns", "tls"]) {
        ServiceErrorKind::Transport
    } else {
        ServiceErrorKind::Rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionConfig;
    use crate::pipeline::encode::EncodedPage;

    fn request(max_output_tokens: Option<u32>) -> ModelRequest {
        let mut builder = ExtractionConfig::builder();
        if let Some(n) = max_output_tokens {
            builder = builder.max_output_tokens(n);
        }
        let config = builder.build().unwrap();
        let pages = (1..=3)
            .map(|n| EncodedPage {
                page_num: n,
                mime_type: "image/png",
                data: vec![n as u8],
            })
            .collect();
        ModelRequest::new(pages, &config)
    }

    #[test]
    fn options_follow_request() {
        let opts = build_options(&request(None));
        assert_eq!(opts.temperature, Some(1.0));
        assert_eq!(opts.max_tokens, None);

        let opts = build_options(&request(Some(8192)));
        assert_eq!(opts.max_tokens, Some(8192));
    }

    #[test]
    fn one_system_and_one_user_message() {
        let messages = build_messages(&request(None));
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn error_messages_classified() {
        assert_eq!(classify_message("HTTP 401 Unauthorized"), ServiceErrorKind::Unauthorized);
        assert_eq!(classify_message("Rate limit exceeded (429)"), ServiceErrorKind::RateLimited);
        assert_eq!(classify_message("request timed out"), ServiceErrorKind::Timeout);
        assert_eq!(classify_message("503 Service Unavailable"), ServiceErrorKind::Unavailable);
        assert_eq!(classify_message("error sending request: connection refused"), ServiceErrorKind::Transport);
        assert_eq!(classify_message("content policy violation"), ServiceErrorKind::Rejected);
    }
}
