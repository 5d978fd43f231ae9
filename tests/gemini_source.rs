//! Integration tests for the Gemini source feeding the batch fetcher and
//! controller, against a local mock server.

use std::sync::Arc;
use std::time::Duration;

use bytes_feed::content::GeminiSource;
use bytes_feed::feed::{Batch, BatchFetcher, FeedController, FeedOptions, TopicPlanner};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/v1beta/models/gemini-3-flash-preview:generateContent";

fn source(server: &MockServer, key: Option<&str>) -> Arc<GeminiSource> {
    let source = GeminiSource::new(
        reqwest::Client::new(),
        key.map(|k| SecretString::from(k.to_string())),
    )
    .with_base_url(&server.uri())
    .unwrap()
    .with_retry_base(Duration::from_millis(1));
    Arc::new(source)
}

fn reply(text: &str, chunks: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "groundingMetadata": {"groundingChunks": chunks}
        }]
    }))
}

const FENCED_STORIES: &str = r#"Here are today's stories:
```json
[
  {"title": "Central bank holds rates steady", "publisher": "Reuters", "abstract": "Policy makers paused.", "category": "Business"},
  {"title": "Rover finds ancient lakebed", "publisher": "Space Daily", "abstract": "Sediment layers found.", "category": "Science"}
]
```"#;

#[tokio::test]
async fn test_fetch_builds_items_with_links_and_images() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(body_string_contains("related to: Business, Science"))
        .respond_with(reply(
            FENCED_STORIES,
            json!([
                {"web": {"uri": "https://www.reuters.com/", "title": "Reuters"}},
                {"web": {
                    "uri": "https://www.reuters.com/markets/central-bank-holds-rates-steady",
                    "title": "Central bank holds rates steady - Reuters"
                }}
            ]),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = BatchFetcher::new(source(&server, Some("test-key")), 6);
    let items = fetcher.fetch(&Batch::new(["Business", "Science"])).await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].title, "Central bank holds rates steady");
    assert_eq!(items[0].publisher_name, "Reuters");
    assert_eq!(items[0].body, "Policy makers paused.");
    assert_eq!(
        items[0].source_link.as_deref(),
        Some("https://www.reuters.com/markets/central-bank-holds-rates-steady")
    );
    assert!(items[1]
        .source_link
        .as_deref()
        .is_some_and(|link| link.starts_with("https://www.google.com/search?q=")));
    assert_ne!(items[0].image_ref, items[1].image_ref);
    assert!(items.iter().all(|i| i.id.starts_with("live-")));
    assert!(items.iter().all(|i| (100..600).contains(&i.like_count)));
}

#[tokio::test]
async fn test_fetch_truncated_reply_keeps_complete_records() {
    let server = MockServer::start().await;
    let truncated = r#"[{"title": "First complete story", "publisher": "AP"}, {"title": "Second sto"#;
    Mock::given(method("POST"))
        .respond_with(reply(truncated, json!([])))
        .mount(&server)
        .await;

    let fetcher = BatchFetcher::new(source(&server, Some("test-key")), 6);
    let items = fetcher.fetch(&Batch::new(["World"])).await;

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "First complete story");
}

#[tokio::test]
async fn test_fetch_server_failure_yields_empty_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let fetcher = BatchFetcher::new(source(&server, Some("test-key")), 6);
    let items = fetcher.fetch(&Batch::new(["World"])).await;
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_controller_without_key_never_calls_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let fetcher = BatchFetcher::new(source(&server, None), 6);
    let controller = FeedController::new(fetcher, TopicPlanner::default(), FeedOptions::default());
    controller.set_topics(vec!["Science".into()]);

    let outcome = controller.start(true).await;
    controller.wait_idle().await;

    assert!(outcome.fallback_used);
    assert_eq!(outcome.background_batches, 0);
    assert!(controller.feed().iter().all(|i| i.id.starts_with("byte-")));
}

#[tokio::test]
async fn test_controller_streams_live_batches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("related to: Breaking News, Top Headlines"))
        .respond_with(reply(FENCED_STORIES, json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("related to: Science."))
        .respond_with(reply(
            r#"[{"title": "Rover finds ancient lakebed"}, {"title": "Coral reefs show recovery"}]"#,
            json!([]),
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(reply("[]", json!([])))
        .mount(&server)
        .await;

    let fetcher = BatchFetcher::new(source(&server, Some("test-key")), 6);
    let options = FeedOptions {
        stagger: Duration::from_millis(5),
        max_concurrent: 4,
    };
    let controller = FeedController::new(fetcher, TopicPlanner::default(), options);
    controller.set_topics(vec!["Science".into()]);

    let outcome = controller.start(true).await;
    assert_eq!(outcome.primary_admitted, 2);
    controller.wait_idle().await;

    let titles: Vec<String> = controller.feed().into_iter().map(|i| i.title).collect();
    assert_eq!(
        titles,
        vec![
            "Central bank holds rates steady",
            "Rover finds ancient lakebed",
            "Coral reefs show recovery",
        ]
    );
}
