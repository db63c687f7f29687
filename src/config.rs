//! Configuration types for question-paper extraction.
//!
//! Everything that shapes one extraction run lives in [`ExtractionConfig`],
//! built via [`ExtractionConfigBuilder`]. The model boundary (which endpoint,
//! which key) is not part of it: backends are constructed separately and
//! passed to [`crate::extract::extract`] explicitly.

use crate::error::ExtractError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default rasterisation resolution used for PDF uploads.
pub const DEFAULT_DPI: u32 = 200;

/// Higher-fidelity resolution, supported for small-print papers.
pub const HIGH_FIDELITY_DPI: u32 = 300;

/// Accepted DPI range.
pub const DPI_RANGE: std::ops::RangeInclusive<u32> = 72..=600;

/// Configuration for a question-paper extraction.
///
/// # Example
/// ```rust
/// use paper2q::{ExtractionConfig, ImageFidelity, ModelVariant, ReasoningEffort};
///
/// let config = ExtractionConfig::builder()
///     .dpi(300)
///     .model(ModelVariant::Gemini3FlashPreview)
///     .reasoning_effort(ReasoningEffort::High)
///     .image_fidelity(ImageFidelity::High)
///     .build()
///     .unwrap();
/// assert_eq!(config.effective_reasoning_effort(), Some(ReasoningEffort::High));
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Rendering DPI for PDF pages. Range: 72–600. Default: 200.
    ///
    /// Page pixel size is `points × dpi / 72`, rounded half away from zero.
    pub dpi: u32,

    /// User password for encrypted PDFs.
    pub password: Option<String>,

    /// Hosted model variant. Default: [`ModelVariant::Gemini3FlashPreview`].
    pub model: ModelVariant,

    /// Requested reasoning effort. Only forwarded when
    /// [`ModelVariant::supports_reasoning_effort`] is true.
    pub reasoning_effort: ReasoningEffort,

    /// How much image detail the model should spend tokens on. Default: medium.
    pub image_fidelity: ImageFidelity,

    /// Sampling temperature. Default: 1.0.
    pub temperature: f32,

    /// Cap on generated tokens. `None` leaves the service default in place.
    pub max_output_tokens: Option<u32>,

    /// Timeout for the single model request, in seconds. Default: 300.
    ///
    /// A full paper is one request carrying every page, so this is much
    /// longer than a per-page budget would be.
    pub api_timeout_secs: u64,

    /// Custom system prompt. If None, uses [`crate::prompts::SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Receives request-level progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            password: None,
            model: ModelVariant::default(),
            reasoning_effort: ReasoningEffort::default(),
            image_fidelity: ImageFidelity::default(),
            temperature: 1.0,
            max_output_tokens: None,
            api_timeout_secs: 300,
            system_prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("dpi", &self.dpi)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("reasoning_effort", &self.reasoning_effort)
            .field("image_fidelity", &self.image_fidelity)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("system_prompt", &self.system_prompt.as_ref().map(|s| s.len()))
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The reasoning effort to send, or `None` when the model has no such knob.
    pub fn effective_reasoning_effort(&self) -> Option<ReasoningEffort> {
        self.model
            .supports_reasoning_effort()
            .then_some(self.reasoning_effort)
    }

    /// The system prompt in effect.
    pub fn system_prompt(&self) -> &str {
        self.system_prompt
            .as_deref()
            .unwrap_or(crate::prompts::SYSTEM_PROMPT)
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(*DPI_RANGE.start(), *DPI_RANGE.end());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn model(mut self, model: ModelVariant) -> Self {
        self.config.model = model;
        self
    }

    pub fn reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.config.reasoning_effort = effort;
        self
    }

    pub fn image_fidelity(mut self, fidelity: ImageFidelity) -> Self {
        self.config.image_fidelity = fidelity;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.max_output_tokens = Some(n);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if !DPI_RANGE.contains(&c.dpi) {
            return Err(ExtractError::InvalidConfig(format!(
                "DPI must be {}–{}, got {}",
                DPI_RANGE.start(),
                DPI_RANGE.end(),
                c.dpi
            )));
        }
        if c.api_timeout_secs == 0 {
            return Err(ExtractError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_output_tokens == Some(0) {
            return Err(ExtractError::InvalidConfig(
                "max_output_tokens must be ≥ 1 when set".into(),
            ));
        }
        if matches!(c.system_prompt.as_deref(), Some(p) if p.trim().is_empty()) {
            return Err(ExtractError::InvalidConfig(
                "Custom system prompt is empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Hosted model variants with different capability sets.
///
/// | Variant | Model id | Reasoning effort |
/// |---------|----------|------------------|
/// | `Gemini3FlashPreview` | `gemini-3-flash-preview` | low / medium / high |
/// | `Gemini25Flash` | `gemini-2.5-flash` | not supported |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelVariant {
    /// Latest generation; accepts a thinking level. (default)
    #[default]
    Gemini3FlashPreview,
    /// Fast and cheap; rejects thinking-level configuration.
    Gemini25Flash,
}

impl ModelVariant {
    pub const ALL: [ModelVariant; 2] = [ModelVariant::Gemini3FlashPreview, ModelVariant::Gemini25Flash];

    /// Identifier sent to the service.
    pub fn id(self) -> &'static str {
        match self {
            ModelVariant::Gemini3FlashPreview => "gemini-3-flash-preview",
            ModelVariant::Gemini25Flash => "gemini-2.5-flash",
        }
    }

    pub fn supports_reasoning_effort(self) -> bool {
        matches!(self, ModelVariant::Gemini3FlashPreview)
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ModelVariant {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelVariant::ALL
            .into_iter()
            .find(|v| v.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ExtractError::InvalidConfig(format!(
                    "Unknown model '{s}'. Supported: {}",
                    ModelVariant::ALL.map(|v| v.id()).join(", ")
                ))
            })
    }
}

/// How long the model may think before answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    #[default]
    Medium,
    High,
}

impl ReasoningEffort {
    /// Wire value of the thinking level.
    pub fn as_str(self) -> &'static str {
        match self {
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

/// Image detail the model should use when reading page images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFidelity {
    Low,
    #[default]
    Medium,
    High,
}

impl ImageFidelity {
    /// `mediaResolution` value of the generateContent API.
    pub fn media_resolution(self) -> &'static str {
        match self {
            ImageFidelity::Low => "MEDIA_RESOLUTION_LOW",
            ImageFidelity::Medium => "MEDIA_RESOLUTION_MEDIUM",
            ImageFidelity::High => "MEDIA_RESOLUTION_HIGH",
        }
    }

    /// Image `detail` value for OpenAI-style providers, which have no middle tier.
    pub fn detail(self) -> &'static str {
        match self {
            ImageFidelity::Low => "low",
            ImageFidelity::Medium => "auto",
            ImageFidelity::High => "high",
        }
    }
}

/// API secret for the hosted model.
///
/// `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

/// Environment variable the CLI reads the key from.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Result<Self, ExtractError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ExtractError::InvalidConfig("API key is empty".into()));
        }
        Ok(Self(key))
    }

    /// Read the key from [`API_KEY_ENV`].
    pub fn from_env() -> Result<Self, ExtractError> {
        let key = std::env::var(API_KEY_ENV).map_err(|_| {
            ExtractError::InvalidConfig(format!("{API_KEY_ENV} is not set"))
        })?;
        Self::new(key)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}
