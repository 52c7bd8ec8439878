use crate::parser::{extract_page_text, FeedParser};
use crate::traits::ContentSource;
use crate::types::{FeedLink, FetchConfig, Result, SurveyError};
use async_trait::async_trait;
use reqwest::Client;
use std::error::Error as _;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    /// Whether `url` matches one of the configured known-bad patterns.
    pub fn should_skip(&self, url: &str) -> bool {
        self.config
            .skip_url_patterns
            .iter()
            .any(|pattern| url.contains(pattern.as_str()))
    }

    /// GET `url` and return the body as text. Non-success statuses are errors.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let url = Url::parse(url)?;
        debug!("Fetching: {}", url);

        let response = self.client.get(url.as_str()).send().await?;

        // Check response status
        if !response.status().is_success() {
            return Err(SurveyError::Skipped {
                url: url.to_string(),
                reason: format!(
                    "HTTP {}: {}",
                    response.status(),
                    response.status().canonical_reason().unwrap_or("Unknown")
                ),
            });
        }

        let content = response.text().await?;
        debug!("Fetched {} ({} bytes)", url, content.len());
        Ok(content)
    }
}

/// Short label for a fetch failure, separating TLS problems from the rest.
pub fn failure_kind(error: &SurveyError) -> &'static str {
    match error {
        SurveyError::Http(e) if is_tls_error(e) => "TLS error",
        SurveyError::Http(_) => "network error",
        SurveyError::InvalidUrl(_) => "invalid URL",
        _ => "fetch error",
    }
}

fn is_tls_error(error: &reqwest::Error) -> bool {
    let mut source = error.source();
    // Walk the cause chain; rustls/native-tls errors sit below hyper's
    while let Some(cause) = source {
        let message = cause.to_string().to_lowercase();
        if message.contains("certificate") || message.contains("tls") || message.contains("ssl") {
            return true;
        }
        source = cause.source();
    }
    false
}

#[async_trait]
impl ContentSource for Fetcher {
    async fn read_feed(&self, feed_url: &str) -> Vec<FeedLink> {
        info!("Reading feed: {}", feed_url);

        let content = match self.fetch_text(feed_url).await {
            Ok(content) => content,
            Err(e) => {
                error!("Error fetching feed {} ({}): {}", feed_url, failure_kind(&e), e);
                return Vec::new();
            }
        };

        // Check that this looks like RSS/Atom, but let feed-rs decide
        if !FeedParser::is_valid_feed_content(&content) {
            warn!("Content at {} does not look like a feed", feed_url);
        }

        match FeedParser::new().parse_feed(&content) {
            Ok(links) => links,
            Err(e) => {
                error!("Error parsing feed {}: {}", feed_url, e);
                Vec::new()
            }
        }
    }

    async fn fetch_post(&self, url: &str) -> String {
        if self.should_skip(url) {
            warn!("Skipping URL due to known issues: {}", url);
            return String::new();
        }

        let html = match self.fetch_text(url).await {
            Ok(html) => html,
            Err(e) => {
                error!("{} fetching {}: {}", failure_kind(&e), url, e);
                return String::new();
            }
        };

        // Extract readable text from the page
        match extract_page_text(&html) {
            Some(text) => text,
            None => {
                warn!("Failed to find content in {}", url);
                String::new()
            }
        }
    }
}
