use crate::extractor::extract;
use crate::llm_adapter::CompletionClient;
use crate::prompts::{extraction_prompt, validation_prompt, MAX_CONTENT_WORDS};
use crate::table::{read_records, write_records, ResultTable};
use crate::traits::ContentSource;
use crate::types::{PostRecord, ReconciledRecord, Result};
use crate::validator::{parse_verdict, reconcile};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub entries: usize,
    pub rows_written: usize,
    pub skipped: usize,
    pub empty_responses: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    pub rows: usize,
    pub validated: usize,
    /// Rows whose post could not be fetched; left out of the output.
    pub unchecked: usize,
    pub no_verdict: usize,
    pub disputed_cells: usize,
}

/// Runs the crawl and validation passes over a content source and a model.
///
/// Every entry is handled to completion before the next one starts.
pub struct Survey<S, C> {
    source: S,
    client: C,
    max_content_words: usize,
}

impl<S: ContentSource, C: CompletionClient> Survey<S, C> {
    pub fn new(source: S, client: C) -> Self {
        Self {
            source,
            client,
            max_content_words: MAX_CONTENT_WORDS,
        }
    }

    pub fn with_max_content_words(mut self, max_words: usize) -> Self {
        self.max_content_words = max_words;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Fetch and classify one post. `None` when the post has no content.
    pub async fn classify_post(&self, author: &str, link: &str) -> Option<PostRecord> {
        let content = self.source.fetch_post(link).await;
        if content.trim().is_empty() {
            return None;
        }

        let response = self
            .client
            .complete(&extraction_prompt(&content, self.max_content_words))
            .await;
        if response.trim().is_empty() {
            warn!("No categories extracted for {}", link);
        }

        Some(PostRecord::new(author, link, extract(&response)))
    }

    /// Crawl the feed once and write one row per post with content to `output`.
    pub async fn crawl(&self, feed_url: &str, output: &Path) -> Result<CrawlSummary> {
        let mut table = ResultTable::create(output)?;
        let links = self.source.read_feed(feed_url).await;
        let mut summary = CrawlSummary {
            entries: links.len(),
            ..Default::default()
        };

        info!("Crawling {} feed entries with {}", links.len(), self.client.client_name());

        for link in &links {
            info!("Processing: {}", link.url);

            let Some(record) = self.classify_post(&link.author, &link.url).await else {
                warn!("Skipping {}: no content", link.url);
                summary.skipped += 1;
                continue;
            };

            // Check for an empty model reply; the row is still recorded
            if record.defaults.is_empty() {
                summary.empty_responses += 1;
            }
            table.append(&record)?;
        }

        summary.rows_written = table.rows_written();
        Ok(summary)
    }

    /// Re-check one record against its post. `None` when the post has no content.
    pub async fn validate_record(&self, record: &PostRecord) -> Option<ReconciledRecord> {
        let content = self.source.fetch_post(&record.link).await;
        if content.trim().is_empty() {
            return None;
        }

        let response = self
            .client
            .complete(&validation_prompt(&content, record, self.max_content_words))
            .await;
        // Parse the verdict without ever evaluating the reply
        let verdict = parse_verdict(&response);
        if verdict.is_empty() {
            warn!("No verdict available for {}", record.link);
        }

        Some(reconcile(&verdict, record))
    }

    /// Validate every row of `input` and rewrite the result to `output`.
    ///
    /// `input` and `output` may be the same file; rows are read in full first.
    /// Rows whose post cannot be fetched are counted as unchecked and dropped.
    pub async fn validate(&self, input: &Path, output: &Path) -> Result<ValidationSummary> {
        let records = read_records(input)?;
        let mut summary = ValidationSummary {
            rows: records.len(),
            ..Default::default()
        };
        let mut validated = Vec::with_capacity(records.len());

        for record in records {
            info!("Validating: {}", record.link);

            match self.validate_record(&record).await {
                Some(reconciled) => {
                    summary.validated += 1;
                    if reconciled.had_no_verdict() {
                        summary.no_verdict += 1;
                    } else if reconciled.is_clean() {
                        info!("All categories confirmed for {}", record.link);
                    } else {
                        info!(
                            "{} disputed categories for {}",
                            reconciled.disputed.len(),
                            record.link
                        );
                    }
                    summary.disputed_cells += reconciled.disputed.len();
                    validated.push(reconciled.record);
                }
                None => {
                    warn!("Could not fetch {}, dropping row from validated output", record.link);
                    summary.unchecked += 1;
                }
            }
        }

        // Only rows that were actually re-checked are written back
        write_records(output, &validated)?;
        Ok(summary)
    }
}
