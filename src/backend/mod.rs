//! The external model boundary.
//!
//! Everything that talks to a hosted model sits behind [`ModelBackend`]. The
//! orchestrator builds one [`ModelRequest`] (all pages, the instruction text,
//! the schema, the tuning knobs), hands it to a backend, and gets back the
//! reply text. Backends do no retries and no fallback extraction: a failure
//! is returned as [`ExtractError::Service`] and the caller decides.
//!
//! Backends are ordinary values constructed by the caller and passed in
//! explicitly; there is no process-wide client.
//!
//! | Backend | Transport | Schema | Reasoning effort |
//! |---------|-----------|--------|------------------|
//! | [`gemini::GeminiBackend`] | REST `generateContent` | native `responseSchema` | `thinkingConfig.thinkingLevel` |
//! | [`provider::ProviderBackend`] | any `edgequake_llm` provider | appended to the system prompt | not forwarded |

pub mod gemini;
pub mod provider;

use crate::config::{ExtractionConfig, ImageFidelity, ModelVariant, ReasoningEffort};
use crate::error::ExtractError;
use crate::pipeline::encode::EncodedPage;
use crate::prompts::USER_INSTRUCTION;
use crate::schema::response_schema;
use futures::future::BoxFuture;

/// Everything one extraction sends to the model.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model: ModelVariant,
    /// Page images in document order.
    pub pages: Vec<EncodedPage>,
    pub system_prompt: String,
    pub user_instruction: String,
    pub response_schema: serde_json::Value,
    /// `None` when the model variant has no reasoning-effort setting; the
    /// field is then left out of the request entirely.
    pub reasoning_effort: Option<ReasoningEffort>,
    pub image_fidelity: ImageFidelity,
    pub temperature: f32,
    pub max_output_tokens: Option<u32>,
}

impl ModelRequest {
    /// Assemble the request for `pages` under `config`.
    pub fn new(pages: Vec<EncodedPage>, config: &ExtractionConfig) -> Self {
        Self {
            model: config.model,
            pages,
            system_prompt: config.system_prompt().to_string(),
            user_instruction: USER_INSTRUCTION.to_string(),
            response_schema: response_schema(),
            reasoning_effort: config.effective_reasoning_effort(),
            image_fidelity: config.image_fidelity,
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

/// The model's answer, before any parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelReply {
    /// Reply text, expected to be a JSON document.
    pub text: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// A hosted model that can answer a [`ModelRequest`].
///
/// One call to [`ModelBackend::generate`] must issue exactly one request.
pub trait ModelBackend: Send + Sync {
    /// Short name for logs, e.g. `"gemini"`.
    fn name(&self) -> &str;

    fn generate<'a>(
        &'a self,
        request: &'a ModelRequest,
    ) -> BoxFuture<'a, Result<ModelReply, ExtractError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_omits_effort_for_non_reasoning_model() {
        let config = ExtractionConfig::builder()
            .model(ModelVariant::Gemini25Flash)
            .reasoning_effort(ReasoningEffort::High)
            .build()
            .unwrap();
        let req = ModelRequest::new(Vec::new(), &config);
        assert_eq!(req.reasoning_effort, None);
        assert_eq!(req.user_instruction, USER_INSTRUCTION);
    }

    #[test]
    fn request_carries_prompt_override_and_schema() {
        let config = ExtractionConfig::builder()
            .system_prompt("Only extract MCQs.")
            .image_fidelity(ImageFidelity::High)
            .build()
            .unwrap();
        let req = ModelRequest::new(Vec::new(), &config);
        assert_eq!(req.system_prompt, "Only extract MCQs.");
        assert_eq!(req.image_fidelity, ImageFidelity::High);
        assert_eq!(req.reasoning_effort, Some(ReasoningEffort::Medium));
        assert_eq!(req.response_schema, response_schema());
    }
}
