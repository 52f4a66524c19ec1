//! Prune-set view over a parsed document.
//!
//! Cleaning never edits the parsed tree. A [`DomTree`] borrows the
//! document, records which nodes are removed, answers queries against the
//! remaining ("live") nodes and serialises a subtree once at the end,
//! skipping everything that was pruned.

use std::collections::HashSet;
use std::marker::PhantomData;

use ego_tree::{NodeId, NodeRef};
use scraper::{ElementRef, Html, Node, Selector};

use crate::parse::collapse_whitespace;

/// Elements serialised without children or a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

/// Elements whose text children are written unescaped
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext"];

/// Elements whose text never renders
const INVISIBLE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head", "title"];

/// Elements that break text flow when rendered
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "details", "div", "dl", "dt", "figcaption", "figure",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section",
    "summary", "table", "td", "th", "tr", "ul",
];

/// The set of nodes removed from a borrowed document
#[derive(Debug, Clone)]
pub struct DomTree<'a> {
    removed: HashSet<NodeId>,
    document: PhantomData<&'a Html>,
}

impl<'a> DomTree<'a> {
    /// Create a view with nothing removed
    pub fn new(_html: &'a Html) -> Self {
        Self { removed: HashSet::new(), document: PhantomData }
    }

    /// Remove an element and its subtree
    pub fn prune(&mut self, element: ElementRef<'a>) -> bool {
        self.removed.insert(element.id())
    }

    /// Whether the element or one of its ancestors has been removed
    pub fn is_removed(&self, element: ElementRef<'a>) -> bool {
        self.removed.contains(&element.id()) || element.ancestors().any(|node| self.removed.contains(&node.id()))
    }

    /// Live descendants of `root` (not `root` itself) matching `selector`, in document order
    pub fn select_live(&self, root: ElementRef<'a>, selector: &Selector) -> Vec<ElementRef<'a>> {
        root.select(selector).filter(|el| !self.is_removed(*el)).collect()
    }

    /// First live descendant of `root` matching `selector`
    pub fn first_live(&self, root: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
        root.select(selector).find(|el| !self.is_removed(*el))
    }

    /// Remove every live descendant of `root` matching `selector`, returning how many were removed
    pub fn prune_matching(&mut self, root: ElementRef<'a>, selector: &Selector) -> usize {
        let matches = self.select_live(root, selector);
        matches.into_iter().filter(|el| self.prune(*el)).count()
    }

    /// Serialise `element` and its live subtree as HTML
    pub fn outer_html(&self, element: ElementRef<'a>) -> String {
        let mut out = String::new();
        self.write_node(*element, &mut out);
        out
    }

    /// Rendered text of the live subtree, whitespace collapsed
    pub fn text(&self, element: ElementRef<'a>) -> String {
        let mut out = String::new();
        self.collect_text(*element, &mut out);
        collapse_whitespace(&out)
    }

    fn write_node(&self, node: NodeRef<'a, Node>, out: &mut String) {
        if self.removed.contains(&node.id()) {
            return;
        }

        match node.value() {
            Node::Element(element) => {
                let name = element.name();
                out.push('<');
                out.push_str(name);
                for (attr, value) in &element.attrs {
                    out.push(' ');
                    if let Some(prefix) = &attr.prefix {
                        out.push_str(prefix);
                        out.push(':');
                    }
                    out.push_str(&attr.local);
                    out.push_str("=\"");
                    escape_into(value, true, out);
                    out.push('"');
                }
                out.push('>');

                if VOID_ELEMENTS.contains(&name) {
                    return;
                }

                let raw = RAW_TEXT_ELEMENTS.contains(&name);
                for child in node.children() {
                    match child.value() {
                        Node::Text(text) if raw => {
                            if !self.removed.contains(&child.id()) {
                                out.push_str(text);
                            }
                        }
                        _ => self.write_node(child, out),
                    }
                }

                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            Node::Text(text) => escape_into(text, false, out),
            Node::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            Node::Document | Node::Fragment => {
                for child in node.children() {
                    self.write_node(child, out);
                }
            }
            _ => {}
        }
    }

    fn collect_text(&self, node: NodeRef<'a, Node>, out: &mut String) {
        if self.removed.contains(&node.id()) {
            return;
        }

        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) => {
                let name = element.name();
                if INVISIBLE_ELEMENTS.contains(&name) {
                    return;
                }
                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    out.push(' ');
                }
                for child in node.children() {
                    self.collect_text(child, out);
                }
                if block {
                    out.push(' ');
                }
            }
            Node::Document | Node::Fragment => {
                for child in node.children() {
                    self.collect_text(child, out);
                }
            }
            _ => {}
        }
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attribute => out.push_str("&quot;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}
