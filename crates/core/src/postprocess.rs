use scraper::{ElementRef, Selector};

use crate::dom_tree::DomTree;

/// Elements never kept in saved content
pub const DISALLOWED_TAGS: &str = "script, style, iframe, form, button";

/// Remove scripts, styles, iframes, forms and buttons under `root`
pub fn strip_disallowed<'a>(tree: &mut DomTree<'a>, root: ElementRef<'a>) -> usize {
    match Selector::parse(DISALLOWED_TAGS) {
        Ok(selector) => tree.prune_matching(root, &selector),
        Err(_) => 0,
    }
}

/// Truncate `text` to at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
