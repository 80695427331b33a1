//! OpenAI-compatible chat completion client.
//!
//! Works against any endpoint speaking the `/chat/completions` format;
//! the default deployment is a local Ollama instance.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use shoal_throttle::Throttle;

use crate::ContentProvider;

const POST_SYSTEM_PROMPT: &str = "You are a LinkedIn content expert. Create engaging, professional LinkedIn posts that:\n\
- Are ~500 words (aim 450-550 words)\n\
- Include relevant hashtags (3-5)\n\
- Start with a strong, concise hook\n\
- Provide specific, practical value to professionals\n\
- End with a thoughtful question to encourage discussion\n\
- Use professional, warm, and concise tone\n\
- Avoid emojis and excessive exclamation marks";

const COMMENT_SYSTEM_PROMPT: &str = "You are a LinkedIn engagement expert. Write precise, human-like comments that:\n\
- Are 25-40 words long\n\
- Reference a specific detail from the post\n\
- Avoid generic platitudes and hashtags\n\
- Use first-person, professional tone\n\
- Ask one brief follow-up question when appropriate\n\
- No emojis or exclamation floods";

/// Posts truncate the quoted source text so slow local models are not fed
/// an entire essay per comment.
const COMMENT_BODY_LIMIT: usize = 500;

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderErrorKind {
    RateLimit,
    ServerError,
    Timeout,
    AuthError,
    InvalidRequest,
    Unknown,
}

impl ProviderErrorKind {
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            429 => Self::RateLimit,
            401 | 403 => Self::AuthError,
            400 | 422 => Self::InvalidRequest,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit | Self::ServerError | Self::Timeout)
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    throttle: Arc<Throttle>,
}

/// Ollama endpoint with its permissive local budget. No real API key is
/// required; a placeholder is sent for header compatibility.
pub fn ollama(
    base_url: impl Into<String>,
    model: impl Into<String>,
    requests_per_hour: u32,
) -> OpenAiCompatProvider {
    OpenAiCompatProvider::new(base_url, "ollama", model, requests_per_hour)
}

impl OpenAiCompatProvider {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        requests_per_hour: u32,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                // Local models can be slow to first token.
                .timeout(std::time::Duration::from_secs(180))
                .build()
                .unwrap_or_default(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            throttle: Arc::new(Throttle::per_hour(requests_per_hour)),
        }
    }

    async fn chat_complete(&self, messages: Vec<ApiMessage>, temperature: f32) -> Result<String> {
        self.throttle.acquire().await;

        let url = format!("{}/chat/completions", self.api_base);
        let payload = ApiRequest {
            model: self.model.clone(),
            messages,
            temperature,
            stream: false,
        };

        let resp = match self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return Err(anyhow!(
                    "content api error (timeout) [retryable]: request timed out after 180s"
                ));
            }
            Err(e) if e.is_connect() => {
                return Err(anyhow!("content api error (connect) [retryable]: {e}"));
            }
            Err(e) => return Err(e.into()),
        };

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            let kind = ProviderErrorKind::from_status(status);
            let retry = if kind.is_retryable() { " [retryable]" } else { "" };
            return Err(anyhow!("content api error ({status}){retry}: {body}"));
        }

        let body: ApiResponse = resp.json().await?;
        let text = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        tracing::debug!(chars = text.len(), "content api response received");
        Ok(text)
    }
}

#[async_trait]
impl ContentProvider for OpenAiCompatProvider {
    async fn generate_post(&self, topic: &str, context: &str) -> Result<String> {
        let mut user_prompt = format!(
            "Create a LinkedIn post about: {topic}\n\n\
             Requirements: Write about 500 words, professional tone, concrete examples, \
             a brief CTA, 3-5 relevant hashtags, and end with a question."
        );
        if !context.is_empty() {
            user_prompt.push_str(&format!("\n\nAdditional context: {context}"));
        }

        self.chat_complete(
            vec![
                ApiMessage::system(POST_SYSTEM_PROMPT),
                ApiMessage::user(user_prompt),
            ],
            0.8,
        )
        .await
    }

    async fn generate_comment(&self, post_body: &str, author_name: &str) -> Result<String> {
        let excerpt: String = post_body.chars().take(COMMENT_BODY_LIMIT).collect();
        let mut user_prompt = format!(
            "Write a concise, specific comment for this LinkedIn post (25-40 words):\n\n{excerpt}"
        );
        if !author_name.is_empty() {
            user_prompt.push_str(&format!("\n\nPost author: {author_name}"));
        }

        self.chat_complete(
            vec![
                ApiMessage::system(COMMENT_SYSTEM_PROMPT),
                ApiMessage::user(user_prompt),
            ],
            0.7,
        )
        .await
    }

    async fn health(&self) -> Result<()> {
        let text = self
            .chat_complete(vec![ApiMessage::user("Hello, are you working?")], 0.1)
            .await?;
        if text.is_empty() {
            anyhow::bail!("content api returned an empty response");
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

impl ApiMessage {
    fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    content: String,
}
