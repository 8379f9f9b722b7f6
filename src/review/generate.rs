use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatChoice, ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequest,
    },
    Client,
};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use super::{
    extract::extract_fixed_code,
    prompting::{build_review_prompt, REVIEW_MAX_OUTPUT_TOKENS, REVIEW_TEMPERATURE},
};

/// Why no review could be generated. None of these are retried.
#[derive(Debug, Error)]
pub enum ReviewGenerationError {
    #[error("no API key for the review service is configured")]
    MissingApiKey,
    #[error("{0}")]
    Service(#[from] OpenAIError),
    #[error("the review service returned no review")]
    EmptyResponse,
}

/// Anything that can turn a prompt into markdown.
/// The production implementation is `OpenAiReviewBackend`; tests use a stub.
#[async_trait::async_trait]
pub trait ReviewBackend: Send + Sync {
    /// Sends the prompt once and returns the raw markdown of the answer.
    async fn complete(&self, prompt: String) -> Result<String, ReviewGenerationError>;
}

/// A review service that speaks the OpenAI chat-completions protocol.
pub struct OpenAiReviewBackend {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiReviewBackend {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait::async_trait]
impl ReviewBackend for OpenAiReviewBackend {
    async fn complete(&self, prompt: String) -> Result<String, ReviewGenerationError> {
        let request = CreateChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage {
                    content: prompt.into(),
                    name: None,
                },
            )],
            n: Some(1),
            temperature: Some(REVIEW_TEMPERATURE),
            max_completion_tokens: Some(REVIEW_MAX_OUTPUT_TOKENS),
            ..Default::default()
        };
        trace!("Request built!");

        let response = self.client.chat().create(request).await?;
        review_from_choices(&response.choices)
    }
}

/// The text of the first choice. Missing and blank texts count as no answer.
fn review_from_choices(choices: &[ChatChoice]) -> Result<String, ReviewGenerationError> {
    let content = choices
        .first()
        .and_then(|choice| choice.message.content.clone())
        .unwrap_or_default();
    if content.trim().is_empty() {
        warn!("The review service answered, but without any content.");
        return Err(ReviewGenerationError::EmptyResponse);
    }
    Ok(content)
}

/// A finished review: the markdown and the suggested fix found in it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReview {
    pub review: String,
    pub suggested_code: Option<String>,
}

/// Generates the review for the given code with a single request.
/// The backend is None if no API key is configured.
pub async fn generate_code_review(
    backend: Option<&dyn ReviewBackend>,
    code: &str,
) -> Result<GeneratedReview, ReviewGenerationError> {
    let Some(backend) = backend else {
        warn!("A review was requested, but no API key is configured.");
        return Err(ReviewGenerationError::MissingApiKey);
    };

    let prompt = build_review_prompt(code);
    debug!("Requesting a review for {} characters of code.", code.len());

    let review = match backend.complete(prompt).await {
        Ok(review) => review,
        Err(e) => {
            warn!("Review generation failed: {}", e);
            return Err(e);
        }
    };
    info!("Received a review with {} characters.", review.len());

    let suggested_code = extract_fixed_code(&review);
    Ok(GeneratedReview {
        review,
        suggested_code,
    })
}
