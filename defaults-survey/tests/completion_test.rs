mod common;

use common::init_tracing;
use defaults_survey::llm_adapter::retry_on_rate_limit;
use defaults_survey::prompts::{extraction_prompt, truncate_words, validation_prompt};
use defaults_survey::{
    Category, CategoryMap, CompletionClient, MockCompletionClient, OpenAiCompletionClient, PostRecord,
    SurveyConfig, SurveyError,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

fn rate_limited() -> SurveyError {
    SurveyError::Api {
        status: 400,
        body: r#"{"error": {"code": "rate_limit_exceeded"}}"#.to_string(),
    }
}

#[tokio::test]
async fn test_retry_succeeds_after_rate_limit() {
    init_tracing();
    let counter = AtomicU32::new(0);
    let calls = &counter;

    let text = retry_on_rate_limit(3, Duration::ZERO, move || async move {
        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(SurveyError::RateLimited("slow down".to_string()))
        } else {
            Ok::<_, SurveyError>("Mail : Airmail".to_string())
        }
    })
    .await;

    assert_eq!(text, "Mail : Airmail");
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_retry_gives_up_after_max_attempts() {
    init_tracing();
    let counter = AtomicU32::new(0);
    let calls = &counter;

    let text = retry_on_rate_limit(3, Duration::ZERO, move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Err::<String, _>(rate_limited())
    })
    .await;

    assert_eq!(text, "");
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_other_errors_abort_immediately() {
    init_tracing();
    let counter = AtomicU32::new(0);
    let calls = &counter;

    let text = retry_on_rate_limit(3, Duration::ZERO, move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Err::<String, _>(SurveyError::Api {
            status: 401,
            body: "invalid_api_key".to_string(),
        })
    })
    .await;

    assert_eq!(text, "");
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_zero_attempts_still_calls_once() {
    let counter = AtomicU32::new(0);
    let calls = &counter;

    let text = retry_on_rate_limit(0, Duration::ZERO, move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, SurveyError>("ok".to_string())
    })
    .await;

    assert_eq!(text, "ok");
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_rate_limit_classification() {
    assert!(rate_limited().is_rate_limit());
    assert!(SurveyError::Api { status: 429, body: String::new() }.is_rate_limit());
    assert!(SurveyError::RateLimited(String::new()).is_rate_limit());
    assert!(!SurveyError::Api { status: 500, body: "server error".to_string() }.is_rate_limit());
    assert!(!SurveyError::Parse("bad".to_string()).is_rate_limit());

    // An exhausted quota comes back as a 429 too, but waiting never fixes it.
    let quota = r#"{"error": {"code": "insufficient_quota"}}"#.to_string();
    assert!(!SurveyError::RateLimited(quota.clone()).is_rate_limit());
    assert!(!SurveyError::Api { status: 429, body: quota }.is_rate_limit());
}

#[tokio::test]
async fn test_exhausted_quota_is_not_retried() {
    init_tracing();
    let counter = AtomicU32::new(0);
    let calls = &counter;

    let text = retry_on_rate_limit(3, Duration::ZERO, move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Err::<String, _>(SurveyError::RateLimited(
            r#"{"error": {"type": "insufficient_quota"}}"#.to_string(),
        ))
    })
    .await;

    assert_eq!(text, "");
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unresponsive_endpoint_times_out_to_empty_reply() {
    init_tracing();

    // Accept connections and hold them open without ever answering.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let config = SurveyConfig::with_api_key("sk-test")
        .base_url(format!("http://{}/v1", addr))
        .retry(1, Duration::ZERO)
        .request_timeout(1);
    let client = OpenAiCompletionClient::new(config.completion).unwrap();

    let reply = tokio::time::timeout(Duration::from_secs(10), client.complete("hi")).await;

    assert_eq!(reply.ok().as_deref(), Some(""));
}

#[tokio::test]
async fn test_mock_client_replies_in_order_then_empty() {
    let client = MockCompletionClient::new(["first", "second"]);

    assert_eq!(client.complete("a").await, "first");
    assert_eq!(client.complete("b").await, "second");
    assert_eq!(client.complete("c").await, "");
    assert_eq!(client.prompts().await, vec!["a", "b", "c"]);
}

#[test]
fn test_openai_client_rejects_blank_key() {
    let config = SurveyConfig::with_api_key("   ");

    assert!(matches!(
        OpenAiCompletionClient::new(config.completion),
        Err(SurveyError::Configuration(_))
    ));
}

#[test]
fn test_config_builder() {
    let config = SurveyConfig::with_api_key("sk-test")
        .model("gpt-4o-mini")
        .base_url("http://localhost:8080/v1")
        .retry(5, Duration::from_secs(2))
        .max_content_words(100);

    assert_eq!(config.completion.model, "gpt-4o-mini");
    assert_eq!(config.completion.base_url, "http://localhost:8080/v1");
    assert_eq!(config.completion.max_attempts, 5);
    assert_eq!(config.completion.retry_delay, Duration::from_secs(2));
    assert_eq!(config.max_content_words, 100);
    assert_eq!(config.fetch.skip_url_patterns, vec!["https://www.wyrd.systems/defaults/"]);

    let client = OpenAiCompletionClient::new(config.completion).unwrap();
    assert_eq!(client.client_name(), "OpenAI (gpt-4o-mini)");
}

#[test]
fn test_default_completion_settings() {
    let config = SurveyConfig::with_api_key("sk-test");

    assert_eq!(config.completion.model, "gpt-3.5-turbo");
    assert_eq!(config.completion.max_attempts, 3);
    assert_eq!(config.completion.retry_delay, Duration::from_secs(60));
    assert_eq!(config.completion.timeout_seconds, 120);
    assert_eq!(config.max_content_words, 4000);
}

#[test]
fn test_truncate_words() {
    assert_eq!(truncate_words("one two three", 5), "one two three");
    assert_eq!(truncate_words("one\ntwo   three four", 2), "one two");
    assert_eq!(truncate_words("", 2), "");
}

#[test]
fn test_extraction_prompt_lists_every_category() {
    let prompt = extraction_prompt("My defaults", 4000);

    for category in Category::ALL {
        assert!(prompt.contains(category.label()));
    }
    assert!(prompt.contains("'category_name : application_name'"));
    assert!(prompt.ends_with(">>>My defaults"));
}

#[test]
fn test_validation_prompt_includes_record_and_content() {
    let defaults: CategoryMap = [(Category::Mail, "Airmail".to_string())].into_iter().collect();
    let record = PostRecord::new("Ana", "https://ana.blog/defaults", defaults);

    let prompt = validation_prompt("I use Airmail", &record, 4000);

    assert!(prompt.contains(r#""Mail":"Airmail""#));
    assert!(prompt.contains(r#""Cloud File Storage":"CloudStorageApp""#));
    assert!(prompt.contains("prefix the application name with 'XXX'"));
    assert!(prompt.ends_with("I use Airmail >>>"));
}
