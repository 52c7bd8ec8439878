use anyhow::Context;
use clap::{Parser, Subcommand};
use defaults_survey::{Fetcher, OpenAiCompletionClient, Survey, SurveyConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "defaults-survey", about = "Classify the default apps listed in blog posts from an aggregator feed")]
struct Cli {
    /// Model used for both passes
    #[arg(long, default_value = "gpt-3.5-turbo", global = true)]
    model: String,

    /// Chat-completions API base URL
    #[arg(long, default_value = "https://api.openai.com/v1", global = true)]
    api_base: String,

    /// Attempts per request when rate limited
    #[arg(long, default_value_t = 3, global = true)]
    max_attempts: u32,

    /// Pause between rate-limited attempts, in seconds
    #[arg(long, default_value_t = 60, global = true)]
    retry_delay_secs: u64,

    /// Give up on a single completion request after this many seconds
    #[arg(long, default_value_t = 120, global = true)]
    request_timeout_secs: u64,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read the feed and write one classified row per post
    Crawl {
        #[arg(long, default_value = "https://defaults.rknight.me/feed.xml")]
        feed_url: String,

        #[arg(long, default_value = "default_apps_results.csv")]
        output: PathBuf,
    },
    /// Re-check a results table against the posts and mark disputed cells
    Validate {
        #[arg(long, default_value = "default_apps_results.csv")]
        input: PathBuf,

        #[arg(long, default_value = "validated_apps_results.csv")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let config = SurveyConfig::from_env()
        .context("Set OPENAI_API_KEY in the environment or a .env file")?
        .model(cli.model)
        .base_url(cli.api_base)
        .retry(cli.max_attempts, Duration::from_secs(cli.retry_delay_secs))
        .request_timeout(cli.request_timeout_secs);

    let fetcher = Fetcher::new(config.fetch.clone()).context("Failed to create HTTP client")?;
    let client = OpenAiCompletionClient::new(config.completion.clone())?;
    let survey = Survey::new(fetcher, client).with_max_content_words(config.max_content_words);

    match cli.command {
        Command::Crawl { feed_url, output } => {
            info!("Starting crawl of {}", feed_url);
            let summary = survey
                .crawl(&feed_url, &output)
                .await
                .with_context(|| format!("Crawl writing to {} failed", output.display()))?;

            if summary.entries == 0 {
                error!("Feed {} produced no entries", feed_url);
            }
            info!(
                "Crawl finished: {} entries, {} rows written, {} skipped, {} with no categories",
                summary.entries, summary.rows_written, summary.skipped, summary.empty_responses
            );
        }
        Command::Validate { input, output } => {
            info!("Validating {} into {}", input.display(), output.display());
            let summary = survey
                .validate(&input, &output)
                .await
                .with_context(|| format!("Validation of {} failed", input.display()))?;

            info!(
                "Validation finished: {} rows, {} validated, {} unchecked, {} without verdict, {} disputed cells",
                summary.rows,
                summary.validated,
                summary.unchecked,
                summary.no_verdict,
                summary.disputed_cells
            );
        }
    }

    Ok(())
}
