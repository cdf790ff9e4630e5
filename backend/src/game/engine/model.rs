use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("rate limited")]
    RateLimited,
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("empty reply")]
    EmptyReply,
}

impl ModelError {
    /// Worth one retry: rate limiting, network trouble, server-side failures
    pub fn is_transient(&self) -> bool {
        match self {
            ModelError::Transport(e) => !e.is_decode() && !e.is_builder(),
            ModelError::RateLimited => true,
            ModelError::Http { status, .. } => *status >= 500,
            ModelError::EmptyReply => false,
        }
    }
}

/// Text completion service used for judging and example generation.
/// Stateless: every call carries its full context.
pub trait LanguageModel: Send + Sync + 'static {
    fn complete(
        &self,
        system: &str,
        user: &str,
    ) -> impl Future<Output = Result<String, ModelError>> + Send;
}

/// OpenAI-compatible chat completions client
#[derive(Clone)]
pub struct ChatModel {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ChatModel {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }
}

impl LanguageModel for ChatModel {
    #[instrument(level = "debug", skip_all, fields(model = %self.model))]
    async fn complete(&self, system: &str, user: &str) -> Result<String, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.0,
        };

        let started = Instant::now();
        let res = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ModelError::RateLimited);
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let message = extract_error(&body).unwrap_or(body);
            return Err(ModelError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = res.json().await?;
        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            reply_len = text.len(),
            "Chat completion"
        );

        if text.is_empty() {
            return Err(ModelError::EmptyReply);
        }
        Ok(text)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Pull `error.message` out of an API error body
fn extract_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct Wrapper {
        error: Inner,
    }
    #[derive(Deserialize)]
    struct Inner {
        message: String,
    }
    serde_json::from_str::<Wrapper>(body)
        .ok()
        .map(|w| w.error.message)
}
