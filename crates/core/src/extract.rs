use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};

use crate::dom_tree::DomTree;
use crate::parse::Document;
use crate::postprocess::{strip_disallowed, truncate_chars};
use crate::preprocess::{PreprocessConfig, strip_chrome};
use crate::{ReadLaterError, Result};

/// Maximum characters of visible text kept in a snapshot
pub const TEXT_EXCERPT_CHARS: usize = 1000;

/// Images must exceed this many pixels in width or height to be listed
pub const MIN_IMAGE_DIMENSION: u32 = 100;

/// Fallback containers tried after `article` and `main`
const CONTENT_PATTERNS: &str = r#"[id*="content"], [class*="content"], .post, #post, .article, #article"#;

/// Candidate containers, in priority order
const CANDIDATE_SELECTORS: &[&str] = &["article", "main", CONTENT_PATTERNS];

/// An image found on the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    pub src: String,
    pub alt: String,
    pub width: u32,
    pub height: u32,
    pub class_name: String,
    pub id: String,
}

impl ImageRef {
    /// Whether the image is large enough to be content rather than an icon or spacer
    pub fn is_content_sized(&self) -> bool {
        self.width > MIN_IMAGE_DIMENSION || self.height > MIN_IMAGE_DIMENSION
    }
}

/// What a single extraction pass captured from a page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    /// Document title
    pub title: String,
    /// Outer HTML of the main content candidate
    pub content: String,
    /// Visible text of the candidate, at most [`TEXT_EXCERPT_CHARS`] characters
    pub text_excerpt: String,
    /// `<meta name="description">` content, or empty
    pub meta_description: String,
    /// Content-sized images from the unmodified page
    pub images: Vec<ImageRef>,
}

/// Capture the main content of a page.
///
/// Steps:
/// 1. Strip page chrome from the body (structural tags, attribute patterns, hidden elements)
/// 2. Pick the first live `article`, then `main`, then a content-like container, else the body
/// 3. Strip scripts, styles, iframes, forms and buttons from the candidate
/// 4. Collect images from the original page, not the stripped one
///
/// Never fails: if the structured pass cannot run, the whole document is returned.
pub fn extract(doc: &Document) -> PageSnapshot {
    let images = collect_images(doc);

    match extract_content(doc) {
        Ok((content, text)) => PageSnapshot {
            title: doc.title(),
            content,
            text_excerpt: truncate_chars(&text, TEXT_EXCERPT_CHARS),
            meta_description: doc.meta_description(),
            images,
        },
        Err(e) => {
            tracing::warn!(error = %e, "content extraction failed, keeping the full document");
            fallback_snapshot(doc, images)
        }
    }
}

/// Select and clean the main content, returning its HTML and visible text
fn extract_content(doc: &Document) -> Result<(String, String)> {
    let body = doc
        .body()
        .ok_or_else(|| ReadLaterError::HtmlParseError("document has no body".to_string()))?;

    let mut tree = DomTree::new(doc.html());
    strip_chrome(&mut tree, body, &PreprocessConfig::default());

    let candidate = select_candidate(&tree, body);
    match candidate {
        Some(el) => tracing::debug!(tag = el.value().name(), "selected main content candidate"),
        None => tracing::debug!("no content candidate, using stripped body"),
    }
    let root = candidate.unwrap_or(body);

    strip_disallowed(&mut tree, root);

    Ok((tree.outer_html(root), tree.text(root)))
}

/// First live element matching the candidate cascade
pub fn select_candidate<'a>(tree: &DomTree<'a>, body: ElementRef<'a>) -> Option<ElementRef<'a>> {
    CANDIDATE_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|selector| tree.first_live(body, &selector))
}

/// Degraded snapshot: the full document markup and its text
fn fallback_snapshot(doc: &Document, images: Vec<ImageRef>) -> PageSnapshot {
    let tree = DomTree::new(doc.html());
    let text = doc
        .body()
        .map(|body| tree.text(body))
        .unwrap_or_else(|| tree.text(doc.root_element()));

    PageSnapshot {
        title: doc.title(),
        content: doc.as_string(),
        text_excerpt: truncate_chars(&text, TEXT_EXCERPT_CHARS),
        meta_description: doc.meta_description(),
        images,
    }
}

/// All content-sized images with a source, in document order
pub fn collect_images(doc: &Document) -> Vec<ImageRef> {
    let Ok(images) = doc.select("img") else {
        return Vec::new();
    };

    images
        .into_iter()
        .filter_map(|img| {
            let el = img.value();
            let src = el.attr("src").map(str::trim).filter(|s| !s.is_empty())?;
            Some(ImageRef {
                src: doc.resolve_url(src),
                alt: el.attr("alt").unwrap_or_default().to_string(),
                width: parse_dimension(el.attr("width")),
                height: parse_dimension(el.attr("height")),
                class_name: el.attr("class").unwrap_or_default().to_string(),
                id: el.attr("id").unwrap_or_default().to_string(),
            })
        })
        .filter(ImageRef::is_content_sized)
        .collect()
}

/// Leading digits of a dimension attribute (`"640"`, `"640px"`), 0 when absent
fn parse_dimension(value: Option<&str>) -> u32 {
    let Some(value) = value else {
        return 0;
    };
    let digits: String = value.trim().chars().take_while(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}
