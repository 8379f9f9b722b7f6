// Everything needed to get a review of the code from the LLM.

use async_openai::{config::OpenAIConfig, Client};
use once_cell::sync::Lazy;
use tracing::{debug, error, info};

/// The fixed prompt that asks for the review.
pub mod prompting;

/// Extracts the suggested fix from the markdown of the review.
pub mod extract;

/// Sends the prompt to the LLM and handles its errors.
pub mod generate;

/// Gemini speaks the OpenAI chat-completions protocol at this address.
pub const DEFAULT_REVIEW_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// The model that is used when `REVIEW_MODEL` is not set.
pub const DEFAULT_REVIEW_MODEL: &str = "gemini-1.5-flash";

/// The address of the review API, as read from the environment.
pub static REVIEW_API_BASE: Lazy<String> = Lazy::new(|| {
    let base = std::env::var("REVIEW_API_BASE").unwrap_or_else(|_| {
        debug!("REVIEW_API_BASE not set, using the default.");
        DEFAULT_REVIEW_API_BASE.to_string()
    });
    base.trim_end_matches('/').to_string()
});

/// The model to ask for reviews.
pub static REVIEW_MODEL: Lazy<String> =
    Lazy::new(|| std::env::var("REVIEW_MODEL").unwrap_or_else(|_| DEFAULT_REVIEW_MODEL.to_string()));

/// The API key for the review service. None if it is not configured.
pub static REVIEW_API_KEY: Lazy<Option<String>> = Lazy::new(|| {
    match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Some(key),
        Ok(_) | Err(_) => {
            error!("GEMINI_API_KEY is not set; every review request will fail.");
            None
        }
    }
});

/// The client that talks to the review service.
/// None if there is no API key, in which case reviews can't be generated.
pub static REVIEW_BACKEND: Lazy<Option<generate::OpenAiReviewBackend>> = Lazy::new(|| {
    let api_key = REVIEW_API_KEY.clone()?;
    info!(
        "Using the review API at {} with model {}.",
        *REVIEW_API_BASE, *REVIEW_MODEL
    );
    let config = OpenAIConfig::new()
        .with_api_base(REVIEW_API_BASE.as_str())
        .with_api_key(api_key);
    Some(generate::OpenAiReviewBackend::new(
        Client::with_config(config),
        REVIEW_MODEL.clone(),
    ))
});

/// Checks whether the review API answers at all, by listing its models.
/// Only used for the startup checks; a failing review request is reported on its own.
pub async fn is_review_api_reachable() -> bool {
    let url = format!("{}/models", *REVIEW_API_BASE);
    let mut request = reqwest::Client::new().get(&url);
    if let Some(api_key) = REVIEW_API_KEY.as_ref() {
        request = request.bearer_auth(api_key);
    }
    match request.send().await {
        Ok(response) if response.status().is_success() => {
            debug!("The review API at {} is reachable.", url);
            true
        }
        Ok(response) => {
            debug!(
                "The review API at {} answered with status {}.",
                url,
                response.status()
            );
            false
        }
        Err(e) => {
            debug!("The review API at {} is not reachable: {:?}", url, e);
            false
        }
    }
}
