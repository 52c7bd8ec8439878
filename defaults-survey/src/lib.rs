pub mod types;
pub mod config;
pub mod traits;
pub mod fetcher;
pub mod parser;
pub mod llm_adapter;
pub mod prompts;
pub mod extractor;
pub mod validator;
pub mod table;
pub mod survey;

pub use types::*;
pub use config::SurveyConfig;
pub use traits::ContentSource;
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use llm_adapter::{CompletionClient, MockCompletionClient, OpenAiCompletionClient};
pub use extractor::extract;
pub use validator::{parse_verdict, reconcile};
pub use table::ResultTable;
pub use survey::{CrawlSummary, Survey, ValidationSummary};
