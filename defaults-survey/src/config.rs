use crate::types::{CompletionConfig, FetchConfig, Result, SurveyError};
use std::time::Duration;

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Everything a survey run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct SurveyConfig {
    pub fetch: FetchConfig,
    pub completion: CompletionConfig,
    pub max_content_words: usize,
}

impl SurveyConfig {
    /// Load the API key from the environment (a `.env` file is honoured).
    ///
    /// A missing or blank key is a configuration error.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_key = std::env::var(API_KEY_VAR)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| SurveyError::Configuration(format!("{} is not set", API_KEY_VAR)))?;

        let config = Self::with_api_key(api_key);
        config.log_keys();
        Ok(config)
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            fetch: FetchConfig::default(),
            completion: CompletionConfig::new(api_key),
            max_content_words: crate::prompts::MAX_CONTENT_WORDS,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.completion.model = model.into();
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.completion.base_url = base_url.into();
        self
    }

    pub fn retry(mut self, max_attempts: u32, delay: Duration) -> Self {
        self.completion.max_attempts = max_attempts;
        self.completion.retry_delay = delay;
        self
    }

    pub fn request_timeout(mut self, timeout_seconds: u64) -> Self {
        self.completion.timeout_seconds = timeout_seconds;
        self
    }

    pub fn max_content_words(mut self, max_words: usize) -> Self {
        self.max_content_words = max_words;
        self
    }

    fn log_keys(&self) {
        let key = &self.completion.api_key;
        let n = key.len().min(5);
        tracing::info!(
            "Config loaded: {}={}...({} chars)",
            API_KEY_VAR,
            key.get(..n).unwrap_or(""),
            key.len()
        );
    }
}
