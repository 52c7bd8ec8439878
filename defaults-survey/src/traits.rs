use crate::types::FeedLink;
use async_trait::async_trait;

/// Where the survey reads feeds and post bodies from.
///
/// Both methods fail soft: problems are logged by the implementation and
/// surface as an empty result, so one bad entry never stops a run.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Entries of the feed at `feed_url`, in feed order.
    async fn read_feed(&self, feed_url: &str) -> Vec<FeedLink>;

    /// Visible text of the post at `url`, or an empty string.
    async fn fetch_post(&self, url: &str) -> String;
}
