use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

use crate::dom_tree::DomTree;

/// Semantic page chrome
const STRUCTURAL_TAGS: &str = "nav, header, footer, aside";

/// Attribute patterns for navigation, search, sharing, comments, ads, promos,
/// related content, footers, sidebars, newsletters and headers.
/// Substring matches are case-sensitive.
pub const CHROME_PATTERNS: &[&str] = &[
    r#"[class*="nav"]"#,
    r#"[id*="nav"]"#,
    r#"[class*="menu"]"#,
    r#"[id*="menu"]"#,
    r#"[role="navigation"]"#,
    ".navigation",
    "#navigation",
    ".navbar",
    "#navbar",
    r#"[class*="search"]"#,
    r#"[id*="search"]"#,
    r#"[type="search"]"#,
    r#"[class*="search-form"]"#,
    r#"[id*="search-form"]"#,
    r#"[class*="share"]"#,
    r#"[id*="share"]"#,
    r#"[class*="social"]"#,
    r#"[id*="social"]"#,
    r#"[class*="comment"]"#,
    r#"[id*="comment"]"#,
    r#"[class*="disqus"]"#,
    r#"[id*="disqus"]"#,
    r#"[class*="ad-"]"#,
    r#"[id*="ad-"]"#,
    r#"[class*="ads"]"#,
    r#"[id*="ads"]"#,
    r#"[class*="banner"]"#,
    r#"[id*="banner"]"#,
    r#"[class*="promo"]"#,
    r#"[id*="promo"]"#,
    r#"[class*="related"]"#,
    r#"[id*="related"]"#,
    r#"[class*="recommended"]"#,
    r#"[id*="recommended"]"#,
    r#"[class*="popular"]"#,
    r#"[id*="popular"]"#,
    r#"[class*="footer"]"#,
    r#"[id*="footer"]"#,
    r#"[class*="copyright"]"#,
    r#"[id*="copyright"]"#,
    ".site-info",
    "#site-info",
    r#"[class*="sidebar"]"#,
    r#"[id*="sidebar"]"#,
    r#"[class*="widget"]"#,
    r#"[id*="widget"]"#,
    r#"[class*="newsletter"]"#,
    r#"[id*="newsletter"]"#,
    r#"[class*="subscribe"]"#,
    r#"[id*="subscribe"]"#,
    r#"[class*="header"]"#,
    r#"[id*="header"]"#,
    ".site-header",
    "#site-header",
    ".page-header",
    "#page-header",
];

static HIDDEN_STYLE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)(display\s*:\s*none|visibility\s*:\s*hidden)").ok());

/// Which steps of the chrome cascade to run
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Whether to remove nav, header, footer and aside elements
    pub remove_structural: bool,
    /// Whether to remove elements matching [`CHROME_PATTERNS`]
    pub remove_patterns: bool,
    /// Whether to remove elements hidden by attribute or inline style
    pub remove_hidden: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self { remove_structural: true, remove_patterns: true, remove_hidden: true }
    }
}

impl PreprocessConfig {
    /// Structural tags and attribute patterns only, as used by the refiner's safety net
    pub fn structural_only() -> Self {
        Self { remove_hidden: false, ..Default::default() }
    }
}

/// Remove page chrome under `root` in a fixed order: structural tags,
/// attribute patterns, then hidden elements. Returns the number of
/// subtrees removed.
pub fn strip_chrome<'a>(tree: &mut DomTree<'a>, root: ElementRef<'a>, config: &PreprocessConfig) -> usize {
    let mut removed = 0;

    if config.remove_structural
        && let Ok(selector) = Selector::parse(STRUCTURAL_TAGS)
    {
        removed += tree.prune_matching(root, &selector);
    }

    if config.remove_patterns {
        removed += remove_patterns(tree, root, CHROME_PATTERNS);
    }

    if config.remove_hidden {
        removed += remove_hidden_elements(tree, root);
    }

    tracing::debug!(removed, "stripped page chrome");
    removed
}

/// Remove live descendants of `root` matching any of `patterns`, skipping patterns that fail to parse
pub fn remove_patterns<'a, S: AsRef<str>>(tree: &mut DomTree<'a>, root: ElementRef<'a>, patterns: &[S]) -> usize {
    let mut removed = 0;
    for pattern in patterns {
        let pattern = pattern.as_ref();
        match Selector::parse(pattern) {
            Ok(selector) => removed += tree.prune_matching(root, &selector),
            Err(e) => tracing::debug!(selector = pattern, error = %e, "skipping invalid selector"),
        }
    }
    removed
}

/// Remove elements carrying the `hidden` attribute or an inline style that hides them
fn remove_hidden_elements<'a>(tree: &mut DomTree<'a>, root: ElementRef<'a>) -> usize {
    let mut removed = 0;

    if let Ok(selector) = Selector::parse("[hidden]") {
        removed += tree.prune_matching(root, &selector);
    }

    let (Ok(styled), Some(hidden_pattern)) = (Selector::parse("[style]"), HIDDEN_STYLE.as_ref()) else {
        return removed;
    };

    for element in tree.select_live(root, &styled) {
        if let Some(style) = element.value().attr("style")
            && hidden_pattern.is_match(style)
            && !tree.is_removed(element)
            && tree.prune(element)
        {
            removed += 1;
        }
    }

    removed
}
