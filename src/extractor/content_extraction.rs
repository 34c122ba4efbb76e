//! Text extraction and main-content selection

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

/// Elements whose text never counts as page content
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector '{}': {}", css, e))
}

static MAIN: LazyLock<Selector> = LazyLock::new(|| selector("main"));
static ARTICLE: LazyLock<Selector> = LazyLock::new(|| selector("article"));
static BLOCK: LazyLock<Selector> = LazyLock::new(|| selector("div, section"));
static BODY: LazyLock<Selector> = LazyLock::new(|| selector("body"));

/// A main-content strategy returns the region text, or `None` to defer to the
/// next strategy
type ContentStrategy = fn(&Html) -> Option<String>;

/// Tried in order; the first strategy that yields text wins
const MAIN_CONTENT_STRATEGIES: &[(&str, ContentStrategy)] = &[
    ("landmark", landmark_region),
    ("largest_block", largest_block),
    ("body", document_body),
];

/// Visible text of an element with whitespace collapsed to single spaces
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    collapse_whitespace(&raw)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push(' ');
                out.push_str(text);
            }
            Node::Element(el) if SKIPPED_ELEMENTS.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, out);
                }
            }
            _ => {}
        }
    }
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Select the text of the page's main content region
pub fn main_content_text(document: &Html) -> String {
    MAIN_CONTENT_STRATEGIES
        .iter()
        .find_map(|(name, strategy)| {
            let text = strategy(document)?;
            debug!(strategy = *name, chars = text.len(), "Selected main content");
            Some(text)
        })
        .unwrap_or_default()
}

/// First non-empty `<main>`, then first non-empty `<article>`
fn landmark_region(document: &Html) -> Option<String> {
    [&*MAIN, &*ARTICLE].into_iter().find_map(|sel| {
        document
            .select(sel)
            .map(element_text)
            .find(|text| !text.is_empty())
    })
}

/// The `<div>` or `<section>` with the most text. Earlier elements win ties.
fn largest_block(document: &Html) -> Option<String> {
    let mut best: Option<String> = None;
    for text in document.select(&BLOCK).map(element_text) {
        if text.len() > best.as_ref().map_or(0, String::len) {
            best = Some(text);
        }
    }
    best
}

fn document_body(document: &Html) -> Option<String> {
    let root = document
        .select(&BODY)
        .next()
        .unwrap_or_else(|| document.root_element());
    Some(element_text(root))
}

/// Whitespace-delimited token count
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
