//! Library API integration tests
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use readlater_core::*;
use serde_json::{Value, json};

fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/{}", name)
}

fn fixture(name: &str) -> String {
    std::fs::read_to_string(get_fixture_path(name)).unwrap()
}

fn article_tab() -> Tab {
    Tab { id: 1, url: "https://systems.test/posts/ownership".to_string(), title: "Ownership | Systems Weekly".to_string() }
}

fn ai_settings() -> Settings {
    Settings { use_ai_parsing: true, openai_api_key: "sk-test".to_string(), ..Default::default() }
}

async fn loaded(tab: &Tab, html: &str) -> Arc<LoadedPages> {
    let pages = Arc::new(LoadedPages::new());
    pages.insert(tab.id, html).await;
    pages
}

struct StubAdvisor(std::result::Result<AiSuggestion, fn() -> ReadLaterError>);

#[async_trait]
impl Advisor for StubAdvisor {
    async fn suggest(&self, _request: &AdvisorRequest) -> Result<AiSuggestion> {
        match &self.0 {
            Ok(suggestion) => Ok(suggestion.clone()),
            Err(make) => Err(make()),
        }
    }
}

fn article_suggestion() -> AiSuggestion {
    AiSuggestion {
        main_content: true,
        content_selector: Some("article.post".to_string()),
        keep_image_selectors: vec![".hero-img".to_string()],
        remove_selectors: vec![".share-buttons".to_string(), ".newsletter-signup".to_string()],
    }
}

/// Serve a chat-completion stub and return its endpoint
async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}/v1/chat/completions")
}

fn advisor_for(endpoint: String) -> OpenAiAdvisor {
    OpenAiAdvisor::new(AdvisorConfig { endpoint, timeout: Some(5) }).unwrap()
}

fn request() -> AdvisorRequest {
    let snapshot = extract(&Document::parse(&fixture("article.html")));
    AdvisorRequest::from_snapshot("https://systems.test/posts/ownership", &snapshot, &ai_settings())
}

#[test]
fn test_extract_fixture_article() {
    let doc = Document::parse_with_url(&fixture("article.html"), "https://systems.test/posts/ownership").unwrap();
    let snapshot = extract(&doc);

    assert_eq!(snapshot.title, "Understanding Ownership in Rust");
    assert_eq!(snapshot.meta_description, "A practical tour of moves, borrows and lifetimes.");
    assert!(snapshot.content.starts_with("<article"));
    assert!(snapshot.text_excerpt.starts_with("Understanding Ownership in Rust Every value in Rust"));
    assert!(snapshot.text_excerpt.chars().count() <= 1000);

    for gone in ["Share on Mastodon", "Subscribe", "trackReading", "Popular posts", "Great article"] {
        assert!(!snapshot.content.contains(gone), "{gone} should be stripped");
    }

    let sources: Vec<_> = snapshot.images.iter().map(|i| i.src.as_str()).collect();
    assert_eq!(
        sources,
        vec![
            "https://systems.test/ads/leaderboard.gif",
            "https://systems.test/images/ownership-diagram.png",
            "https://systems.test/images/borrow-rules.png",
        ]
    );
}

#[test]
fn test_extract_without_candidate_uses_stripped_body() {
    let snapshot = extract(&Document::parse(&fixture("no_candidate.html")));

    assert!(snapshot.content.starts_with("<body>"));
    assert!(snapshot.text_excerpt.contains("no article or main element"));
    assert!(!snapshot.content.contains("Footer text"));
    assert!(!snapshot.content.contains("Home"));
}

#[test]
fn test_extract_empty_page() {
    let snapshot = extract(&Document::parse(&fixture("empty_content.html")));

    assert_eq!(snapshot.title, "Empty");
    assert_eq!(snapshot.text_excerpt, "");
    assert!(snapshot.images.is_empty());
}

#[test]
fn test_refine_fixture_article() {
    let doc = Document::parse(&fixture("article.html"));
    let content = refine(&doc, &article_suggestion());

    assert!(content.starts_with("<article"));
    assert_eq!(content.matches("<img").count(), 1);
    assert!(content.contains("ownership-diagram.png"));
    assert!(!content.contains("Share on Mastodon"));
    assert!(!content.contains("<script"));
    assert!(!content.contains("<form"));
}

#[tokio::test]
async fn test_pipeline_saves_refined_article() {
    let tab = article_tab();
    let store = Arc::new(MemoryStore::new());
    let pipeline =
        SavePipeline::new(store.clone(), Arc::new(StubAdvisor(Ok(article_suggestion()))), loaded(&tab, &fixture("article.html")).await);

    let item = pipeline.save(&tab, &["rust".to_string()], &ai_settings()).await.unwrap();

    assert_eq!(item.title, "Understanding Ownership in Rust");
    assert_eq!(item.content.matches("<img").count(), 1);
    assert!(!item.is_read);

    let stored = store.get("readLater").await.unwrap().unwrap();
    assert_eq!(stored[0]["url"], "https://systems.test/posts/ownership");
    assert_eq!(stored[0]["tags"], json!(["rust"]));
}

#[tokio::test]
async fn test_pipeline_advisor_failure_keeps_extractor_output() {
    let tab = article_tab();
    let html = fixture("article.html");
    let pipeline = SavePipeline::new(
        Arc::new(MemoryStore::new()),
        Arc::new(StubAdvisor(Err(|| ReadLaterError::AdvisorStatus { status: 500, message: "boom".to_string() }))),
        loaded(&tab, &html).await,
    );

    let item = pipeline.save(&tab, &[], &ai_settings()).await.unwrap();
    let raw = extract(&Document::parse_with_url(&html, &tab.url).unwrap());

    assert_eq!(item.content, raw.content);
    assert_eq!(item.text_content, raw.text_excerpt);
}

#[tokio::test]
async fn test_pipeline_unreachable_page_saves_link() {
    let tab = article_tab();
    let pipeline = SavePipeline::new(
        Arc::new(MemoryStore::new()),
        Arc::new(StubAdvisor(Ok(article_suggestion()))),
        Arc::new(LoadedPages::new()),
    );

    let item = pipeline.save(&tab, &["later".to_string()], &Settings::default()).await.unwrap();

    assert_eq!(item.title, "Ownership | Systems Weekly");
    assert!(item.content.is_empty() && item.text_content.is_empty() && item.meta_description.is_empty());
}

#[tokio::test]
async fn test_resave_keeps_one_item_per_url() {
    let tab = article_tab();
    let pipeline = SavePipeline::new(
        Arc::new(MemoryStore::new()),
        Arc::new(StubAdvisor(Ok(AiSuggestion::default()))),
        loaded(&tab, &fixture("article.html")).await,
    );

    let first = pipeline.save(&tab, &["A".to_string()], &Settings::default()).await.unwrap();
    pipeline.library().mark_read(first.id).await.unwrap();
    let second = pipeline.save(&tab, &["B".to_string()], &Settings::default()).await.unwrap();

    let items = pipeline.library().items().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(second.id, first.id);
    assert!(second.is_read);
    assert_eq!(second.tags.iter().map(String::as_str).collect::<Vec<_>>(), vec!["A", "B"]);
    assert!(second.date >= first.date);
}

#[tokio::test]
async fn test_initialize_then_save_through_file_store() {
    let tmp = tempfile::TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::new(tmp.path().join("store.json")));
    initialize(store.as_ref()).await.unwrap();

    let pipeline =
        SavePipeline::new(store.clone(), Arc::new(StubAdvisor(Ok(AiSuggestion::default()))), Arc::new(LoadedPages::new()));
    pipeline.save_link("https://a.test/", "A", &[]).await.unwrap();

    let reopened = Library::new(Arc::new(JsonFileStore::new(tmp.path().join("store.json"))));
    assert_eq!(reopened.items().await.unwrap().len(), 1);
    assert_eq!(Settings::load(store.as_ref()).await.unwrap(), Settings::default());
}

#[tokio::test]
async fn test_openai_advisor_success() {
    let endpoint = serve(Router::new().route(
        "/v1/chat/completions",
        post(|headers: HeaderMap, Json(body): Json<Value>| async move {
            let authorized = headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer sk-test");
            if !authorized || body["model"] != "gpt-4o" || body["response_format"]["type"] != "json_object" {
                return (StatusCode::BAD_REQUEST, Json(json!({"error": {"message": "unexpected request"}})));
            }
            let content = json!({
                "mainContent": true,
                "contentSelector": "article.post",
                "keepImageSelectors": [".hero-img"],
                "removeSelectors": [".share-buttons"]
            });
            (StatusCode::OK, Json(json!({"choices": [{"message": {"role": "assistant", "content": content.to_string()}}]})))
        }),
    ))
    .await;

    let suggestion = advisor_for(endpoint).suggest(&request()).await.unwrap();

    assert!(suggestion.main_content);
    assert_eq!(suggestion.content_selector.as_deref(), Some("article.post"));
    assert_eq!(suggestion.keep_image_selectors, vec![".hero-img"]);
    assert_eq!(suggestion.remove_selectors, vec![".share-buttons"]);
}

#[tokio::test]
async fn test_openai_advisor_error_status() {
    let endpoint = serve(Router::new().route(
        "/v1/chat/completions",
        post(|| async {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": {"message": "model overloaded"}})))
        }),
    ))
    .await;

    match advisor_for(endpoint).suggest(&request()).await {
        Err(ReadLaterError::AdvisorStatus { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "model overloaded");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_openai_advisor_error_status_without_body() {
    let endpoint = serve(Router::new().route("/v1/chat/completions", post(|| async { StatusCode::UNAUTHORIZED }))).await;

    match advisor_for(endpoint).suggest(&request()).await {
        Err(ReadLaterError::AdvisorStatus { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Unknown error");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_openai_advisor_malformed_content() {
    let endpoint = serve(Router::new().route(
        "/v1/chat/completions",
        post(|| async { Json(json!({"choices": [{"message": {"content": "I think the main content is the article."}}]})) }),
    ))
    .await;

    let result = advisor_for(endpoint).suggest(&request()).await;
    assert!(matches!(result, Err(ReadLaterError::MalformedResponse(_))));
}

#[tokio::test]
async fn test_openai_advisor_empty_choices() {
    let endpoint =
        serve(Router::new().route("/v1/chat/completions", post(|| async { Json(json!({"choices": []})) }))).await;

    let result = advisor_for(endpoint).suggest(&request()).await;
    assert!(matches!(result, Err(ReadLaterError::NoChoices)));
}

#[tokio::test]
async fn test_pipeline_with_http_advisor_failure_degrades() {
    let endpoint = serve(Router::new().route(
        "/v1/chat/completions",
        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "unavailable") }),
    ))
    .await;
    let tab = article_tab();
    let pipeline =
        SavePipeline::new(Arc::new(MemoryStore::new()), Arc::new(advisor_for(endpoint)), loaded(&tab, &fixture("article.html")).await);

    let item = pipeline.save(&tab, &[], &ai_settings()).await.unwrap();
    assert!(item.content.contains("borrow-rules.png"));
}
