//! Story generation against the generative provider.
//!
//! A request runs in two sequential phases:
//!
//! 1. **Story** (required): a schema-constrained request whose JSON answer
//!    becomes the [`Anecdote`]. Any failure here fails the whole request.
//! 2. **Illustration** (best-effort): a free-form image request. Failures
//!    are logged and the story is returned without an image.

mod prompt;
mod provider;
pub mod schema;

pub use prompt::{illustration_prompt, story_prompt, system_instruction};
pub use provider::ContentProvider;
pub use schema::{anecdote_schema, parse_story};

use crate::anecdote::{data_uri, Anecdote};
use gemini::{Gemini, Modality, Request};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Message shown to the user whenever a story cannot be produced.
pub const GENERATION_FAILED_MESSAGE: &str = "Failed to unearth a story. Please try again.";

/// The story phase failed. Displays as the user-facing message; the
/// underlying cause is available through [`GenerationError::cause`].
#[derive(Debug, Error)]
#[error("Failed to unearth a story. Please try again.")]
pub struct GenerationError {
    #[source]
    cause: GenerationFailure,
}

impl GenerationError {
    pub fn cause(&self) -> &GenerationFailure {
        &self.cause
    }
}

impl From<GenerationFailure> for GenerationError {
    fn from(cause: GenerationFailure) -> Self {
        Self { cause }
    }
}

/// Why the story phase failed.
#[derive(Debug, Error)]
pub enum GenerationFailure {
    #[error("topic is empty")]
    EmptyTopic,

    #[error("provider request failed: {0}")]
    Provider(#[from] gemini::Error),

    #[error("provider returned no text")]
    EmptyResponse,

    #[error("response is not a valid anecdote: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("response breaks the anecdote contract: {0}")]
    Contract(String),
}

/// Why the illustration phase produced nothing. Never surfaced to users.
#[derive(Debug, Error)]
pub enum IllustrationError {
    #[error("provider request failed: {0}")]
    Provider(#[from] gemini::Error),

    #[error("response contained no image")]
    NoImage,
}

/// Configuration for the generator.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Model for the story phase.
    pub text_model: String,

    /// Model for the illustration phase.
    pub image_model: String,

    /// Sampling temperature for the story phase.
    pub temperature: f32,

    /// Whether to run the illustration phase at all.
    pub illustrate: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            text_model: "gemini-2.5-flash".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            temperature: 0.3,
            illustrate: true,
        }
    }
}

impl GeneratorConfig {
    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = model.into();
        self
    }

    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_illustrations(mut self, illustrate: bool) -> Self {
        self.illustrate = illustrate;
        self
    }
}

/// Turns a topic into an [`Anecdote`].
#[derive(Clone)]
pub struct Generator {
    provider: Arc<dyn ContentProvider>,
    config: GeneratorConfig,
}

impl Generator {
    pub fn new(provider: Arc<dyn ContentProvider>) -> Self {
        Self {
            provider,
            config: GeneratorConfig::default(),
        }
    }

    /// A generator backed by Gemini, keyed from the environment.
    pub fn from_env() -> Result<Self, gemini::Error> {
        Ok(Self::new(Arc::new(Gemini::from_env()?)))
    }

    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate a story about `topic` in `language`, illustrated if possible.
    ///
    /// Fails only when the story phase fails.
    pub async fn generate(&self, topic: &str, language: &str) -> Result<Anecdote, GenerationError> {
        let mut anecdote = self.write_story(topic, language).await.map_err(|cause| {
            warn!(topic, language, error = %cause, "story generation failed");
            GenerationError::from(cause)
        })?;

        if self.config.illustrate {
            match self.illustrate(&anecdote).await {
                Ok(uri) => anecdote.image_url = Some(uri),
                Err(e) => warn!(title = %anecdote.title, error = %e, "illustration skipped"),
            }
        }

        Ok(anecdote)
    }

    /// Story phase: request, then parse and check the structured answer.
    pub async fn write_story(&self, topic: &str, language: &str) -> Result<Anecdote, GenerationFailure> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(GenerationFailure::EmptyTopic);
        }

        let request = Request::prompt(story_prompt(topic, language))
            .with_model(&self.config.text_model)
            .with_system_instruction(system_instruction(language))
            .with_temperature(self.config.temperature)
            .with_json_schema(anecdote_schema());

        debug!(topic, language, model = %self.config.text_model, "requesting story");
        let response = self.provider.generate_content(request).await?;
        debug!(
            model_version = response.model_version.as_deref().unwrap_or("unknown"),
            finish_reason = ?response.finish_reason(),
            prompt_tokens = ?response.usage.as_ref().map(|u| u.prompt_tokens),
            output_tokens = ?response.usage.as_ref().map(|u| u.output_tokens),
            "story response received"
        );
        let Some(text) = response.text() else {
            warn!(finish_reason = ?response.finish_reason(), "story response carried no text");
            return Err(GenerationFailure::EmptyResponse);
        };
        parse_story(&text)
    }

    /// Illustration phase: returns a data URI for the first inline image.
    pub async fn illustrate(&self, anecdote: &Anecdote) -> Result<String, IllustrationError> {
        let request = Request::prompt(illustration_prompt(&anecdote.title, &anecdote.topic))
            .with_model(&self.config.image_model)
            .with_response_modalities(vec![Modality::Image, Modality::Text]);

        debug!(title = %anecdote.title, model = %self.config.image_model, "requesting illustration");
        let response = self.provider.generate_content(request).await?;
        let image = response.first_inline_data().ok_or(IllustrationError::NoImage)?;
        Ok(data_uri(&image.mime_type, &image.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_story, MockProvider};
    use gemini::{Candidate, FinishReason, Response};

    fn generator(provider: &Arc<MockProvider>) -> Generator {
        Generator::new(provider.clone())
    }

    #[tokio::test]
    async fn test_generate_with_illustration() {
        let provider = Arc::new(MockProvider::new());
        provider
            .queue_story(sample_story("The Falling Fruit", "Classical Mechanics"))
            .queue_image("image/png", "iVBORw0KGgo=");

        let anecdote = generator(&provider).generate("Gravity", "English").await.unwrap();

        assert_eq!(anecdote.title, "The Falling Fruit");
        assert_eq!(anecdote.topic, "Classical Mechanics");
        assert_eq!(
            anecdote.image_url.as_deref(),
            Some("data:image/png;base64,iVBORw0KGgo=")
        );
        assert_eq!(provider.text_request_count(), 1);
        assert_eq!(provider.image_request_count(), 1);
    }

    #[tokio::test]
    async fn test_story_request_shape() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_story(sample_story("La Manzana", "Física"));

        generator(&provider).generate("  Gravity ", "Spanish").await.unwrap();

        let request = provider.text_requests().remove(0);
        assert_eq!(request.model.as_deref(), Some("gemini-2.5-flash"));
        assert_eq!(request.temperature, Some(0.3));
        assert_eq!(request.response_mime_type.as_deref(), Some("application/json"));
        assert_eq!(request.response_schema, Some(anecdote_schema()));
        assert!(request.prompt_text().contains("\"Gravity\""));
        assert!(request.system_instruction.unwrap().contains("Spanish"));

        let image_request = provider.image_requests().remove(0);
        assert_eq!(image_request.model.as_deref(), Some("gemini-2.5-flash-image"));
        assert!(image_request.prompt_text().contains("La Manzana"));
    }

    #[tokio::test]
    async fn test_image_failure_keeps_story() {
        let provider = Arc::new(MockProvider::new());
        provider
            .queue_story(sample_story("Eureka", "Buoyancy"))
            .queue_image_error("image service unavailable");

        let anecdote = generator(&provider).generate("Archimedes", "English").await.unwrap();
        assert_eq!(anecdote.title, "Eureka");
        assert!(anecdote.image_url.is_none());
    }

    #[tokio::test]
    async fn test_image_response_without_image_keeps_story() {
        let provider = Arc::new(MockProvider::new());
        provider
            .queue_story(sample_story("Eureka", "Buoyancy"))
            .queue_image_text("I cannot draw that.");

        let anecdote = generator(&provider).generate("Archimedes", "English").await.unwrap();
        assert!(anecdote.image_url.is_none());
    }

    #[tokio::test]
    async fn test_illustrations_can_be_disabled() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_story(sample_story("Eureka", "Buoyancy"));

        let anecdote = generator(&provider)
            .with_config(GeneratorConfig::default().with_illustrations(false))
            .generate("Archimedes", "English")
            .await
            .unwrap();

        assert!(anecdote.image_url.is_none());
        assert_eq!(provider.image_request_count(), 0);
    }

    #[tokio::test]
    async fn test_provider_error_is_generation_error() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_text_error("connection reset");

        let err = generator(&provider).generate("Gravity", "English").await.unwrap_err();
        assert_eq!(err.to_string(), GENERATION_FAILED_MESSAGE);
        assert!(matches!(err.cause(), GenerationFailure::Provider(_)));
        assert_eq!(provider.image_request_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_and_malformed_payloads_fail() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_text("").queue_text("this is not json");
        let generator = generator(&provider);

        let empty = generator.generate("Gravity", "English").await.unwrap_err();
        assert!(matches!(empty.cause(), GenerationFailure::EmptyResponse));

        let malformed = generator.generate("Gravity", "English").await.unwrap_err();
        assert!(matches!(malformed.cause(), GenerationFailure::Malformed(_)));
        assert_eq!(provider.text_request_count(), 2);
    }

    #[tokio::test]
    async fn test_blocked_story_is_empty_response() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_text_response(Response {
            candidates: vec![Candidate {
                parts: Vec::new(),
                finish_reason: Some(FinishReason::Safety),
            }],
            ..Default::default()
        });

        let err = generator(&provider).generate("Gravity", "English").await.unwrap_err();
        assert!(matches!(err.cause(), GenerationFailure::EmptyResponse));
        assert_eq!(provider.image_request_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_topic_makes_no_request() {
        let provider = Arc::new(MockProvider::new());
        let err = generator(&provider).generate("   ", "English").await.unwrap_err();

        assert!(matches!(err.cause(), GenerationFailure::EmptyTopic));
        assert_eq!(provider.text_request_count(), 0);
    }
}
