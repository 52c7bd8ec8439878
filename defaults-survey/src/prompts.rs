use crate::types::{Category, CategoryMap, PostRecord};
use tracing::info;

/// Word ceiling applied to post content before it is sent to the model.
pub const MAX_CONTENT_WORDS: usize = 4000;

/// Keep the first `max_words` whitespace-separated words.
///
/// Content already under the limit is returned as-is; longer content is
/// re-joined with single spaces.
pub fn truncate_words(content: &str, max_words: usize) -> String {
    let word_count = content.split_whitespace().count();
    if word_count <= max_words {
        return content.to_string();
    }

    info!("Content too large ({} words), trimming to {}", word_count, max_words);
    content
        .split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

fn category_list() -> String {
    Category::ALL
        .iter()
        .map(|c| c.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Prompt asking the model to list `category : application` lines for a post.
pub fn extraction_prompt(content: &str, max_words: usize) -> String {
    let content = truncate_words(content, max_words);

    format!(
        "Provided is a blog post where the author lists their most used, or 'default', applications for various categories of software. \
         Identify the software applications and assign each to one of the following common categories: {}. \
         Format the response as 'category_name : application_name'. \
         If an application does not fit any of the provided categories, do not include it. \
         Only include the name of the application in the response. \
         If multiple applications are listed for a category, include only the first application. For example, if 'Slack and Discord' are listed, return 'Slack'. \
         Exclude any OS-specific information, leaving only the application name. \
         If the author does not clearly list an application but provides an explanation, leave the application blank. \
         Focus solely on the software applications mentioned, excluding any hardware-related items or personal opinions. \
         Double check your work before replying. Ensure that only the category and app name is listed. No other text should be included. \
         It is very important that you get this right, so take your time and think it through step by step >>>{}",
        category_list(),
        content
    )
}

/// Prompt asking the model to check a record against the post and answer with a JSON object.
pub fn validation_prompt(content: &str, record: &PostRecord, max_words: usize) -> String {
    let content = truncate_words(content, max_words);

    let example: CategoryMap = Category::ALL
        .iter()
        .map(|c| (*c, c.example_app().to_string()))
        .collect();

    // Every category, blanks included, so the model sees the full row.
    let current: CategoryMap = Category::ALL
        .iter()
        .map(|c| (*c, record.defaults.cell(*c).to_string()))
        .collect();

    format!(
        "Below is a list of categories and applications from a blog post, and the content of the blog post. \
         Create a JSON object that validates each category and application against the blog post content. \
         If a category and application match the content, include them as-is in the JSON object. \
         If they do not match, prefix the application name with 'XXX'. \
         Ensure that every category is listed in the response, even if the application name is left blank. \
         Reply with the JSON object only, using double quotes. \
         Example response format: {} \
         Here are the categories and applications: {} \
         And here is the content of the blog post: {} >>>",
        render_json(&example),
        render_json(&current),
        content
    )
}

fn render_json(map: &CategoryMap) -> String {
    serde_json::to_string(map).unwrap_or_else(|_| "{}".to_string())
}
