//! Applying advisor suggestions to a page.
//!
//! [`refine`] narrows a document to the advisor's content container, drops
//! what the advisor flagged, keeps only the images it vouched for and falls
//! back to the structural chrome cascade when no container was identified.

use std::collections::HashSet;

use scraper::{ElementRef, Selector};

use crate::advisor::AiSuggestion;
use crate::dom_tree::DomTree;
use crate::parse::Document;
use crate::postprocess::strip_disallowed;
use crate::preprocess::{PreprocessConfig, strip_chrome};
use crate::{ReadLaterError, Result};

/// Produce cleaned content HTML from `doc` using `suggestion`.
///
/// Never fails. If no body can be located the document markup is returned
/// unrefined.
pub fn refine(doc: &Document, suggestion: &AiSuggestion) -> String {
    match refine_content(doc, suggestion) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(error = %e, "refinement failed, keeping the unrefined page");
            unrefined(doc)
        }
    }
}

fn refine_content(doc: &Document, suggestion: &AiSuggestion) -> Result<String> {
    let body = doc
        .body()
        .ok_or_else(|| ReadLaterError::HtmlParseError("document has no body".to_string()))?;
    let mut tree = DomTree::new(doc.html());

    let selected = content_root(&tree, body, suggestion);
    let root = selected.unwrap_or(body);

    for selector in &suggestion.remove_selectors {
        match Selector::parse(selector) {
            Ok(sel) => {
                let removed = tree.prune_matching(root, &sel);
                tracing::debug!(selector = selector.as_str(), removed, "applied remove selector");
            }
            Err(e) => tracing::debug!(selector = selector.as_str(), error = %e, "skipping invalid remove selector"),
        }
    }

    if !suggestion.keep_image_selectors.is_empty() {
        keep_only_marked_images(&mut tree, root, &suggestion.keep_image_selectors);
    }

    strip_disallowed(&mut tree, root);

    if selected.is_none() {
        strip_chrome(&mut tree, root, &PreprocessConfig::structural_only());
    }

    Ok(tree.outer_html(root))
}

/// The advisor's content container, when it claimed one and it exists
fn content_root<'a>(tree: &DomTree<'a>, body: ElementRef<'a>, suggestion: &AiSuggestion) -> Option<ElementRef<'a>> {
    if !suggestion.main_content {
        return None;
    }
    let selector = suggestion.content_selector.as_deref()?;

    match Selector::parse(selector) {
        Ok(sel) => {
            let found = tree.first_live(body, &sel);
            if found.is_none() {
                tracing::debug!(selector, "content selector matched nothing, using body");
            }
            found
        }
        Err(e) => {
            tracing::debug!(selector, error = %e, "invalid content selector, using body");
            None
        }
    }
}

/// Remove every image under `root` not matched by one of `keep_selectors`
fn keep_only_marked_images<'a>(tree: &mut DomTree<'a>, root: ElementRef<'a>, keep_selectors: &[String]) {
    let mut marked = HashSet::new();

    for selector in keep_selectors {
        match Selector::parse(selector) {
            Ok(sel) => marked.extend(tree.select_live(root, &sel).into_iter().map(|el| el.id())),
            Err(e) => tracing::debug!(selector = selector.as_str(), error = %e, "skipping invalid image selector"),
        }
    }

    let Ok(images) = Selector::parse("img") else {
        return;
    };
    let unmarked: Vec<_> = tree
        .select_live(root, &images)
        .into_iter()
        .filter(|img| !marked.contains(&img.id()))
        .collect();

    tracing::debug!(kept = marked.len(), removed = unmarked.len(), "filtered images");
    for img in unmarked {
        tree.prune(img);
    }
}

fn unrefined(doc: &Document) -> String {
    match doc.body() {
        Some(body) => body.html(),
        None => doc.as_string(),
    }
}
