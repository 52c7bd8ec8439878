use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Software categories a post can list a default application for.
///
/// Declaration order is the output column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Category {
    #[serde(rename = "Mail")]
    Mail,
    #[serde(rename = "Calendar")]
    Calendar,
    #[serde(rename = "Browser")]
    Browser,
    #[serde(rename = "Password Manager")]
    PasswordManager,
    #[serde(rename = "Messaging")]
    Messaging,
    #[serde(rename = "Notes")]
    Notes,
    #[serde(rename = "Cloud File Storage")]
    CloudFileStorage,
    #[serde(rename = "To-Do")]
    ToDo,
    #[serde(rename = "Code Editor")]
    CodeEditor,
    #[serde(rename = "Terminal")]
    Terminal,
    #[serde(rename = "Blogging")]
    Blogging,
    #[serde(rename = "Launcher")]
    Launcher,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Category::Mail,
        Category::Calendar,
        Category::Browser,
        Category::PasswordManager,
        Category::Messaging,
        Category::Notes,
        Category::CloudFileStorage,
        Category::ToDo,
        Category::CodeEditor,
        Category::Terminal,
        Category::Blogging,
        Category::Launcher,
    ];

    /// The label used in prompts and as the CSV column header.
    pub fn label(self) -> &'static str {
        match self {
            Category::Mail => "Mail",
            Category::Calendar => "Calendar",
            Category::Browser => "Browser",
            Category::PasswordManager => "Password Manager",
            Category::Messaging => "Messaging",
            Category::Notes => "Notes",
            Category::CloudFileStorage => "Cloud File Storage",
            Category::ToDo => "To-Do",
            Category::CodeEditor => "Code Editor",
            Category::Terminal => "Terminal",
            Category::Blogging => "Blogging",
            Category::Launcher => "Launcher",
        }
    }

    /// Exact, case-sensitive lookup by label. Anything else is not a category.
    pub fn from_label(label: &str) -> Option<Category> {
        Category::ALL.iter().copied().find(|c| c.label() == label)
    }

    /// Placeholder application name shown in the validation prompt example.
    pub fn example_app(self) -> &'static str {
        match self {
            Category::Mail => "MailApp",
            Category::Calendar => "CalendarApp",
            Category::Browser => "BrowserApp",
            Category::PasswordManager => "PasswordManagerApp",
            Category::Messaging => "MessagingApp",
            Category::Notes => "NotesApp",
            Category::CloudFileStorage => "CloudStorageApp",
            Category::ToDo => "ToDoApp",
            Category::CodeEditor => "CodeEditorApp",
            Category::Terminal => "TerminalApp",
            Category::Blogging => "BloggingApp",
            Category::Launcher => "LauncherApp",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Category -> application name, ordered by category.
///
/// `insert_first` is write-once per category; `set` overwrites and is only
/// used when loading rows back from a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CategoryMap(BTreeMap<Category, String>);

impl CategoryMap {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Stores `app` unless the category already has a value. Returns whether it was stored.
    pub fn insert_first(&mut self, category: Category, app: impl Into<String>) -> bool {
        if self.0.contains_key(&category) {
            return false;
        }
        self.0.insert(category, app.into());
        true
    }

    pub fn set(&mut self, category: Category, app: impl Into<String>) {
        self.0.insert(category, app.into());
    }

    pub fn get(&self, category: Category) -> Option<&str> {
        self.0.get(&category).map(String::as_str)
    }

    /// Value for the output cell: missing categories render as empty.
    pub fn cell(&self, category: Category) -> &str {
        self.get(category).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &str)> {
        self.0.iter().map(|(c, app)| (*c, app.as_str()))
    }
}

impl FromIterator<(Category, String)> for CategoryMap {
    fn from_iter<I: IntoIterator<Item = (Category, String)>>(iter: I) -> Self {
        let mut map = CategoryMap::new();
        for (category, app) in iter {
            map.insert_first(category, app);
        }
        map
    }
}

/// The second model pass's view of the correct application per category.
pub type ValidationVerdict = CategoryMap;

/// One processed feed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub author: String,
    pub link: String,
    pub defaults: CategoryMap,
}

impl PostRecord {
    pub fn new(author: impl Into<String>, link: impl Into<String>, defaults: CategoryMap) -> Self {
        Self {
            author: author.into(),
            link: link.into(),
            defaults,
        }
    }

    /// Output cells in fixed column order: author, link, then one per category.
    pub fn cells(&self) -> Vec<&str> {
        let mut row = Vec::with_capacity(2 + Category::ALL.len());
        row.push(self.author.as_str());
        row.push(self.link.as_str());
        row.extend(Category::ALL.iter().map(|c| self.defaults.cell(*c)));
        row
    }
}

/// A record after the validation pass, with disputed values prefixed by [`MISMATCH_MARKER`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledRecord {
    pub record: PostRecord,
    pub disputed: Vec<Category>,
    /// Categories the verdict said nothing about; left unmodified.
    pub unverified: Vec<Category>,
}

impl ReconciledRecord {
    pub fn is_clean(&self) -> bool {
        self.disputed.is_empty()
    }

    /// True when no category of the record received a verdict.
    pub fn had_no_verdict(&self) -> bool {
        self.unverified.len() == self.record.defaults.len()
    }
}

pub const MISMATCH_MARKER: &str = "XXX";

/// An entry pulled from the aggregator feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedLink {
    pub author: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_redirects: usize,
    /// Any URL containing one of these is skipped without a request.
    pub skip_url_patterns: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Defaults-Survey/1.0".to_string(),
            timeout_seconds: 30,
            max_redirects: 5,
            skip_url_patterns: vec!["https://www.wyrd.systems/defaults/".to_string()],
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub system_message: String,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    /// Per-request limit; a request that exceeds it fails closed.
    pub timeout_seconds: u64,
}

impl CompletionConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            system_message: "You are a helpful assistant.".to_string(),
            max_attempts: 3,
            retry_delay: Duration::from_secs(60),
            timeout_seconds: 120,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SurveyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Table error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Completion API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Skipped {url}: {reason}")]
    Skipped { url: String, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SurveyError {
    /// Whether a completion failure should be retried after a pause.
    ///
    /// An exhausted quota is reported with a 429 as well but never clears by waiting.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            SurveyError::RateLimited(body) => !body.contains(QUOTA_EXHAUSTED),
            SurveyError::Api { status, body } => {
                !body.contains(QUOTA_EXHAUSTED) && (*status == 429 || body.contains("rate_limit_exceeded"))
            }
            _ => false,
        }
    }
}

const QUOTA_EXHAUSTED: &str = "insufficient_quota";

pub type Result<T> = std::result::Result<T, SurveyError>;
