use crate::types::{FeedLink, Result, SurveyError};
use feed_rs::parser;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info};

/// Elements tried in order when looking for a post's main content.
const CONTENT_SELECTORS: [&str; 3] = ["body", "article", "div"];

pub struct FeedParser {
    seen_guids: HashSet<String>,
    seen_urls: HashSet<String>,
}

impl FeedParser {
    pub fn new() -> Self {
        Self {
            seen_guids: HashSet::new(),
            seen_urls: HashSet::new(),
        }
    }

    /// Parse RSS/Atom content into feed links, keeping feed order.
    ///
    /// Entries without a link, and repeats of an already seen GUID or URL,
    /// are dropped.
    pub fn parse_feed(&mut self, content: &str) -> Result<Vec<FeedLink>> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| SurveyError::Parse(format!("Failed to parse feed: {}", e)))?;

        let links: Vec<FeedLink> = feed
            .entries
            .into_iter()
            .filter_map(|entry| self.parse_entry(entry))
            .collect();

        info!("Parsed feed with {} entries", links.len());
        Ok(links)
    }

    fn parse_entry(&mut self, entry: feed_rs::model::Entry) -> Option<FeedLink> {
        // Extract the post link; entries without one are useless here
        let url = entry.links.first()?.href.clone();

        // Check for duplicates by GUID first, then by URL
        if !entry.id.is_empty() && !self.seen_guids.insert(entry.id.clone()) {
            debug!("Skipping duplicate entry with GUID: {}", entry.id);
            return None;
        }

        if !self.seen_urls.insert(url.clone()) {
            debug!("Skipping duplicate entry with URL: {}", url);
            return None;
        }

        // The aggregator titles each entry with the author's name.
        let author = entry
            .title
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty())
            .or_else(|| entry.authors.first().map(|a| a.name.clone()))
            .unwrap_or_else(|| "Untitled".to_string());

        Some(FeedLink { author, url })
    }

    pub fn is_valid_feed_content(content: &str) -> bool {
        let content_lower = content.to_lowercase();

        content_lower.contains("<rss")
            || content_lower.contains("<feed")
            || content_lower.contains("<channel")
    }
}

impl Default for FeedParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Visible text of the first `body`, `article` or `div` element in `html`.
///
/// Script and style contents are left out. Returns `None` when none of the
/// elements exist or the matched element has no visible text.
pub fn extract_page_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    // The HTML parser synthesizes a body for fragments; only trust a real one
    let has_body = html.to_ascii_lowercase().contains("<body");

    for tag in CONTENT_SELECTORS {
        if tag == "body" && !has_body {
            continue;
        }
        let Ok(selector) = Selector::parse(tag) else {
            continue;
        };
        let Some(element) = document.select(&selector).next() else {
            continue;
        };

        // Check the match actually carries text before settling on it
        let text = visible_text(element);
        if text.trim().is_empty() {
            debug!("No visible text in <{}>", tag);
            continue;
        }
        return Some(text);
    }

    None
}

fn visible_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();

    for node in element.descendants() {
        // Skip text that a browser would never render
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element().map(|e| e.name().to_string()))
            .is_some_and(|name| matches!(name.as_str(), "script" | "style" | "noscript"));
        if !hidden {
            text.push_str(fragment);
        }
    }

    text
}
