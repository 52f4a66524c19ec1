//! AI advisor client.
//!
//! The advisor describes a captured page to a chat-completion model and
//! reads back an [`AiSuggestion`]: whether the page is an article, which CSS
//! selector holds the main content, which images to keep and which elements
//! to remove.
//!
//! Every failure here is soft. The save pipeline logs the error and keeps
//! the extractor's raw content.
//!
//! # Example
//!
//! ```rust,no_run
//! use readlater_core::advisor::{Advisor, AdvisorRequest, OpenAiAdvisor};
//!
//! # async fn example() -> readlater_core::Result<()> {
//! let advisor = OpenAiAdvisor::default();
//! let request = AdvisorRequest {
//!     page_url: "https://example.com/post".to_string(),
//!     title: "A post".to_string(),
//!     meta_description: String::new(),
//!     text_excerpt: "Opening paragraph...".to_string(),
//!     image_count: 2,
//!     api_key: "sk-...".to_string(),
//!     model: "gpt-4o".to_string(),
//! };
//! let suggestion = advisor.suggest(&request).await?;
//! println!("{:?}", suggestion.content_selector);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};

use crate::extract::PageSnapshot;
use crate::postprocess::truncate_chars;
use crate::settings::Settings;
use crate::{ReadLaterError, Result};

/// Default chat-completion endpoint
pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Characters of page text included in the prompt
pub const PROMPT_EXCERPT_CHARS: usize = 500;

const SYSTEM_PROMPT: &str = "You are an AI assistant that analyzes web page content and returns ONLY valid JSON.";
const TEMPERATURE: f32 = 0.2;
const MAX_TOKENS: u32 = 1000;

/// Selectors proposed by the advisor for cleaning a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSuggestion {
    /// Whether the page looks like an article with a main content block
    #[serde(default)]
    pub main_content: bool,

    /// CSS selector for the main content container
    #[serde(default, deserialize_with = "blank_as_none")]
    pub content_selector: Option<String>,

    /// CSS selectors for images that belong to the content
    #[serde(default, deserialize_with = "null_as_empty")]
    pub keep_image_selectors: Vec<String>,

    /// CSS selectors for elements to drop
    #[serde(default, deserialize_with = "null_as_empty")]
    pub remove_selectors: Vec<String>,
}

impl AiSuggestion {
    /// Parses the JSON object a model returned as message content.
    ///
    /// # Errors
    ///
    /// Returns [`ReadLaterError::MalformedResponse`] if `content` is not a
    /// JSON object of the expected shape.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content.trim()).map_err(|e| ReadLaterError::MalformedResponse(format!("suggestion: {e}")))
    }
}

fn blank_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    let value: Option<Vec<String>> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

/// What the advisor is told about a page, plus the credentials to ask with.
#[derive(Debug, Clone)]
pub struct AdvisorRequest {
    pub page_url: String,
    pub title: String,
    pub meta_description: String,
    /// Leading page text, at most [`PROMPT_EXCERPT_CHARS`] characters
    pub text_excerpt: String,
    pub image_count: usize,
    pub api_key: String,
    pub model: String,
}

impl AdvisorRequest {
    /// Builds a request from a snapshot and the user's settings
    pub fn from_snapshot(page_url: &str, snapshot: &PageSnapshot, settings: &Settings) -> Self {
        Self {
            page_url: page_url.to_string(),
            title: snapshot.title.clone(),
            meta_description: snapshot.meta_description.clone(),
            text_excerpt: truncate_chars(&snapshot.text_excerpt, PROMPT_EXCERPT_CHARS),
            image_count: snapshot.images.len(),
            api_key: settings.openai_api_key.clone(),
            model: settings.model().to_string(),
        }
    }

    /// The extraction prompt sent as the user message
    pub fn prompt(&self) -> String {
        let meta = if self.meta_description.is_empty() { "None provided" } else { self.meta_description.as_str() };

        format!(
            r#"You are analyzing a web page to extract its main content for a "Read Later" app.
The goal is to identify the main article content vs navigation, ads, etc.

URL: {url}
Title: {title}
Meta Description: {meta}

Here's information about the page:
1. Text content excerpt (first {limit} chars):
{excerpt}...

2. The page contains {images} images.

Your task:
1. Determine if this is an article page with main content (vs a homepage, category page, etc.)
2. Identify the most specific CSS selector that would target ONLY the main content
3. Identify which images are part of the main content vs decorative/ads/navigation
4. List elements that should definitely be removed (navigation, ads, popups, etc.)

Format your response STRICTLY as JSON with these fields:
{{
  "mainContent": true/false,
  "contentSelector": "the most specific CSS selector for main content",
  "keepImageSelectors": ["array of CSS selectors for images to keep as part of the content"],
  "removeSelectors": ["array of CSS selectors for elements to remove"]
}}

IMPORTANT:
- Use specific, valid CSS selectors (classes, IDs, attributes)
- For content selector, prefer article, main, .content, #content, etc.
- For images, use selectors that would ONLY match content images
- Include classes that likely indicate non-content (e.g. .ad, .nav, .popup)
"#,
            url = self.page_url,
            title = self.title,
            meta = meta,
            limit = PROMPT_EXCERPT_CHARS,
            excerpt = self.text_excerpt,
            images = self.image_count,
        )
    }
}

/// Something that can propose cleaning selectors for a page
#[async_trait]
pub trait Advisor: Send + Sync {
    /// Ask for a suggestion. One attempt, no retries.
    async fn suggest(&self, request: &AdvisorRequest) -> Result<AiSuggestion>;
}

/// Advisor HTTP settings
#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    /// Chat-completion endpoint
    pub endpoint: String,
    /// Request timeout in seconds (`None` leaves the client default)
    pub timeout: Option<u64>,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self { endpoint: OPENAI_CHAT_URL.to_string(), timeout: None }
    }
}

/// Advisor backed by an OpenAI-compatible chat-completion endpoint
#[derive(Debug, Clone)]
pub struct OpenAiAdvisor {
    client: Client,
    config: AdvisorConfig,
}

impl Default for OpenAiAdvisor {
    fn default() -> Self {
        Self { client: Client::new(), config: AdvisorConfig::default() }
    }
}

impl OpenAiAdvisor {
    /// Creates an advisor for the given endpoint settings.
    ///
    /// # Errors
    ///
    /// Returns [`ReadLaterError::HttpError`] if the HTTP client cannot be built.
    pub fn new(config: AdvisorConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;
        Ok(Self { client, config })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
}

#[async_trait]
impl Advisor for OpenAiAdvisor {
    async fn suggest(&self, request: &AdvisorRequest) -> Result<AiSuggestion> {
        let prompt = request.prompt();
        let body = ChatRequest {
            model: &request.model,
            messages: [
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: &prompt },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&request.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| match (e.is_timeout(), self.config.timeout) {
                (true, Some(timeout)) => ReadLaterError::Timeout { timeout },
                _ => ReadLaterError::HttpError(e),
            })?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .ok()
                .and_then(|b| b.error)
                .and_then(|e| e.message)
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(ReadLaterError::AdvisorStatus { status: status.as_u16(), message });
        }

        parse_chat_response(&text)
    }
}

/// Reads the suggestion out of a chat-completion response body
pub fn parse_chat_response(body: &str) -> Result<AiSuggestion> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| ReadLaterError::MalformedResponse(format!("response body: {e}")))?;

    let choice = response.choices.into_iter().next().ok_or(ReadLaterError::NoChoices)?;
    let content = choice
        .message
        .content
        .ok_or_else(|| ReadLaterError::MalformedResponse("choice has no message content".to_string()))?;

    AiSuggestion::from_json(&content)
}
