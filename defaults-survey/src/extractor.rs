use crate::types::{Category, CategoryMap};
use tracing::debug;

/// Parse a free-text `category : application` response into a [`CategoryMap`].
///
/// - Each line is split on its first colon; lines without one are skipped.
/// - The trimmed left side must exactly match a category label, otherwise
///   the line is dropped.
/// - The first line for a category wins.
/// - Only the first comma-separated application is kept; an empty
///   application is stored as `""`.
///
/// Never fails: an empty or garbled response yields an empty map.
pub fn extract(raw_response: &str) -> CategoryMap {
    let mut defaults = CategoryMap::new();

    for line in raw_response.lines() {
        debug!("Model line: {}", line);

        let Some((candidate, apps)) = line.split_once(':') else {
            continue;
        };

        let Some(category) = Category::from_label(candidate.trim()) else {
            continue;
        };

        defaults.insert_first(category, first_application(apps));
    }

    defaults
}

/// First comma-delimited token of the application text, trimmed.
pub fn first_application(apps: &str) -> String {
    apps.split(',').next().unwrap_or("").trim().to_string()
}

/// Render a map back into the line format [`extract`] reads.
pub fn render_lines(defaults: &CategoryMap) -> String {
    defaults
        .iter()
        .map(|(category, app)| format!("{} : {}", category, app))
        .collect::<Vec<_>>()
        .join("\n")
}
