use crate::types::{CompletionConfig, Result, SurveyError};
use async_trait::async_trait;
use backoff::backoff::{Backoff, Constant};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Trait for text-generation backends used by both survey passes
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Name used in logs
    fn client_name(&self) -> String;

    /// Send `prompt` and return the reply text.
    ///
    /// Fails closed: any failure that survives the retry policy is logged
    /// and returned as an empty string.
    async fn complete(&self, prompt: &str) -> String;
}

/// Run `op` until it succeeds, retrying only on rate limiting.
///
/// At most `max_attempts` calls are made with a fixed `delay` between them.
/// Any other error, or running out of attempts, yields an empty string.
pub async fn retry_on_rate_limit<F, Fut>(max_attempts: u32, delay: Duration, mut op: F) -> String
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let max_attempts = max_attempts.max(1);
    let mut backoff = Constant::new(delay);

    for attempt in 1..=max_attempts {
        match op().await {
            Ok(text) => return text,
            Err(e) if e.is_rate_limit() && attempt < max_attempts => {
                let pause = backoff.next_backoff().unwrap_or(delay);
                warn!(
                    "Rate limit exceeded (attempt {}/{}), retrying in {:?}",
                    attempt, max_attempts, pause
                );
                tokio::time::sleep(pause).await;
            }
            Err(e) => {
                error!("Completion API error after {} attempt(s): {}", attempt, e);
                return String::new();
            }
        }
    }

    String::new()
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Chat-completions client for the OpenAI API.
pub struct OpenAiCompletionClient {
    http: reqwest::Client,
    config: CompletionConfig,
}

impl OpenAiCompletionClient {
    pub fn new(config: CompletionConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(SurveyError::Configuration("API key is empty".to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        info!("Using model {} at {}", config.model, config.base_url);
        Ok(Self { http, config })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
            .map_err(|e| SurveyError::Configuration(format!("Invalid API key: {}", e)))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// One chat request, no retries.
    pub async fn chat(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.config.system_message,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        debug!("Chat request to {} ({} prompt bytes)", self.config.model, prompt.len());

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        // Check status before decoding; the body carries the error reason
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(SurveyError::RateLimited(body));
            }
            return Err(SurveyError::Api {
                status: status.as_u16(),
                body,
            });
        }

        // Extract the first choice, an empty reply is not an error
        let reply: ChatResponse = response.json().await?;
        Ok(reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    fn client_name(&self) -> String {
        format!("OpenAI ({})", self.config.model)
    }

    async fn complete(&self, prompt: &str) -> String {
        retry_on_rate_limit(self.config.max_attempts, self.config.retry_delay, move || self.chat(prompt)).await
    }
}

/// Scripted client for development and tests.
///
/// Replies are handed out in order; once they run out every call returns an
/// empty string. Every prompt is recorded.
pub struct MockCompletionClient {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl MockCompletionClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    fn client_name(&self) -> String {
        "Mock completion client".to_string()
    }

    async fn complete(&self, prompt: &str) -> String {
        self.prompts.lock().await.push(prompt.to_string());
        self.replies.lock().await.pop_front().unwrap_or_default()
    }
}
