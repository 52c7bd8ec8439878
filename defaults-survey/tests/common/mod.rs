use async_trait::async_trait;
use defaults_survey::{ContentSource, FeedLink};
use std::collections::HashMap;
use std::sync::Once;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// In-memory feed and post bodies. Unknown URLs have no content.
#[derive(Default)]
pub struct StaticSource {
    pub feed: Vec<FeedLink>,
    pub posts: HashMap<String, String>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_post(mut self, author: &str, url: &str, body: &str) -> Self {
        self.feed.push(FeedLink {
            author: author.to_string(),
            url: url.to_string(),
        });
        self.posts.insert(url.to_string(), body.to_string());
        self
    }

    pub fn with_dead_link(mut self, author: &str, url: &str) -> Self {
        self.feed.push(FeedLink {
            author: author.to_string(),
            url: url.to_string(),
        });
        self
    }
}

#[async_trait]
impl ContentSource for StaticSource {
    async fn read_feed(&self, _feed_url: &str) -> Vec<FeedLink> {
        self.feed.clone()
    }

    async fn fetch_post(&self, url: &str) -> String {
        self.posts.get(url).cloned().unwrap_or_default()
    }
}
