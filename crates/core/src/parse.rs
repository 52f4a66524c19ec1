//! HTML parsing and document queries.
//!
//! This module provides the [`Document`] type, a parsed HTML page plus the
//! URL it was loaded from. The extractor and refiner both read from a
//! `Document` and never mutate it.
//!
//! # Example
//!
//! ```rust
//! use readlater_core::parse::Document;
//!
//! let html = r#"
//!     <html>
//!         <head>
//!             <title>Title</title>
//!             <meta name="description" content="Summary">
//!         </head>
//!         <body><p class="content">Paragraph</p></body>
//!     </html>
//! "#;
//!
//! let doc = Document::parse(html);
//! assert_eq!(doc.title(), "Title");
//! assert_eq!(doc.meta_description(), "Summary");
//! ```

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::{ReadLaterError, Result};

/// Parses a CSS selector, mapping failures to [`ReadLaterError::HtmlParseError`].
pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ReadLaterError::HtmlParseError(format!("Invalid selector `{selector}`: {e}")))
}

/// Represents a parsed HTML document.
///
/// # Example
///
/// ```rust
/// use readlater_core::parse::Document;
///
/// let doc = Document::parse_with_url("<img src=\"a.png\">", "https://example.com/post/").unwrap();
/// assert_eq!(doc.resolve_url("a.png"), "https://example.com/post/a.png");
/// ```
pub struct Document {
    html: Html,
    base_url: Option<Url>,
}

impl Document {
    /// Parses HTML from a string.
    ///
    /// html5ever recovers from any markup, so parsing itself cannot fail.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html), base_url: None }
    }

    /// Parses HTML and records the page URL for resolving relative links.
    ///
    /// # Errors
    ///
    /// Returns [`ReadLaterError::InvalidUrl`] if `url` is not an absolute URL.
    pub fn parse_with_url(html: &str, url: &str) -> Result<Self> {
        let base_url = Url::parse(url).map_err(|e| ReadLaterError::InvalidUrl(format!("{url}: {e}")))?;
        Ok(Self { html: Html::parse_document(html), base_url: Some(base_url) })
    }

    /// Gets the underlying `scraper::Html`.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Gets the entire document serialised back to HTML.
    pub fn as_string(&self) -> String {
        self.html.html()
    }

    /// Gets the `<html>` element.
    pub fn root_element(&self) -> ElementRef<'_> {
        self.html.root_element()
    }

    /// Gets the `<body>` element, if the document has one.
    pub fn body(&self) -> Option<ElementRef<'_>> {
        let selector = Selector::parse("body").ok()?;
        self.html.select(&selector).next()
    }

    /// Selects elements anywhere in the document.
    ///
    /// # Errors
    ///
    /// Returns [`ReadLaterError::HtmlParseError`] if the selector is invalid.
    pub fn select(&self, selector: &str) -> Result<Vec<ElementRef<'_>>> {
        let sel = parse_selector(selector)?;
        Ok(self.html.select(&sel).collect())
    }

    /// Gets the document title the way a browser reports `document.title`:
    /// the first `<title>` text with whitespace collapsed. Empty when absent.
    pub fn title(&self) -> String {
        let Ok(selector) = Selector::parse("title") else {
            return String::new();
        };
        self.html
            .select(&selector)
            .next()
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .unwrap_or_default()
    }

    /// Gets the `content` of `<meta name="description">`, or an empty string.
    pub fn meta_description(&self) -> String {
        let Ok(selector) = Selector::parse(r#"meta[name="description"]"#) else {
            return String::new();
        };
        self.html
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(str::to_string)
            .unwrap_or_default()
    }

    /// Resolves a possibly relative URL against the document URL.
    ///
    /// Without a base URL, or when joining fails, the input is returned as is.
    pub fn resolve_url(&self, href: &str) -> String {
        match &self.base_url {
            Some(base) => base.join(href).map(|u| u.to_string()).unwrap_or_else(|_| href.to_string()),
            None => href.to_string(),
        }
    }
}

/// Collapses runs of whitespace into single spaces and trims the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
