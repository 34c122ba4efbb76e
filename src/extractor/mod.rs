//! Content extractor
//!
//! Turns raw HTML into a [`PageRecord`]: title, meta description, headings,
//! images, main-content word count and the structural issues noticed along
//! the way. Extraction never fails once a body was fetched; HTML that cannot
//! be used at all yields an empty record carrying
//! [`ExtractionIssue::UnparseableHtml`].

mod content_extraction;

pub use content_extraction::{main_content_text, word_count};

use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

pub(crate) use content_extraction::selector;
use content_extraction::{collapse_whitespace, element_text};

/// Size of the raw HTML kept on the record for diagnostics
pub const SNIPPET_BYTES: usize = 8 * 1024;

static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("title"));
static META_NAMED: LazyLock<Selector> = LazyLock::new(|| selector("meta[name]"));
static META_PROPERTY: LazyLock<Selector> = LazyLock::new(|| selector("meta[property]"));
static H1: LazyLock<Selector> = LazyLock::new(|| selector("h1"));
static H2: LazyLock<Selector> = LazyLock::new(|| selector("h2"));
static H3: LazyLock<Selector> = LazyLock::new(|| selector("h3"));
static IMG: LazyLock<Selector> = LazyLock::new(|| selector("img"));

/// Structural problem noticed while extracting a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionIssue {
    MissingTitle,
    MissingMetaDescription,
    MissingH1,
    MultipleH1,
    MissingImageAlt,
    /// The body could not be treated as HTML. The record is empty.
    UnparseableHtml,
}

impl ExtractionIssue {
    pub fn code(&self) -> &'static str {
        match self {
            ExtractionIssue::MissingTitle => "missing_title",
            ExtractionIssue::MissingMetaDescription => "missing_meta_description",
            ExtractionIssue::MissingH1 => "missing_h1",
            ExtractionIssue::MultipleH1 => "multiple_h1",
            ExtractionIssue::MissingImageAlt => "missing_image_alt",
            ExtractionIssue::UnparseableHtml => "unparseable_html",
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ExtractionIssue::UnparseableHtml)
    }
}

/// An `<img>` reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Source resolved against the page URL. Empty when the tag has no
    /// `src` or `data-src`.
    pub src: String,

    /// Alt text. Empty alt attributes are stored as `None`.
    pub alt: Option<String>,
}

impl ImageRef {
    pub fn has_alt(&self) -> bool {
        self.alt.as_deref().is_some_and(|alt| !alt.trim().is_empty())
    }
}

/// Headings h1 to h3 in document order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headings {
    pub h1: Vec<String>,
    pub h2: Vec<String>,
    pub h3: Vec<String>,
}

/// Structured view of a fetched page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    /// URL of the page
    pub url: String,

    /// HTTP status code of the fetch
    pub status_code: u16,

    /// Trimmed `<title>` text
    pub title: Option<String>,

    /// Trimmed meta description
    pub meta_description: Option<String>,

    pub headings: Headings,

    /// Words in the main content region
    pub word_count: usize,

    pub images: Vec<ImageRef>,

    /// Leading bytes of the raw HTML
    pub raw_html_snippet: String,

    /// Structural issues in discovery order
    pub issues: Vec<ExtractionIssue>,
}

impl PageRecord {
    fn unparseable(url: &str, status_code: u16, html: &str) -> Self {
        Self {
            url: url.to_string(),
            status_code,
            title: None,
            meta_description: None,
            headings: Headings::default(),
            word_count: 0,
            images: Vec::new(),
            raw_html_snippet: html_snippet(html),
            issues: vec![ExtractionIssue::UnparseableHtml],
        }
    }

    /// Whether extraction gave up on the body
    pub fn is_unparseable(&self) -> bool {
        self.issues.iter().any(ExtractionIssue::is_fatal)
    }

    /// Issue codes as strings
    pub fn issue_codes(&self) -> Vec<&'static str> {
        self.issues.iter().map(ExtractionIssue::code).collect()
    }
}

/// Extract a [`PageRecord`] from raw HTML.
///
/// `base_url` is the page's own URL and is used to resolve image sources.
#[instrument(skip(html), fields(bytes = html.len()))]
pub fn extract_page(html: &str, base_url: &str, status_code: u16) -> PageRecord {
    if html.trim().is_empty() || html.contains('\0') {
        warn!("Body of {} is not usable as HTML", base_url);
        return PageRecord::unparseable(base_url, status_code, html);
    }

    let document = Html::parse_document(html);
    let base = Url::parse(base_url).ok();

    let title = document
        .select(&TITLE)
        .next()
        .map(element_text)
        .filter(|title| !title.is_empty());
    let meta_description = extract_meta_description(&document);
    let headings = Headings {
        h1: heading_texts(&document, &H1),
        h2: heading_texts(&document, &H2),
        h3: heading_texts(&document, &H3),
    };
    let images = extract_images(&document, base.as_ref());
    let word_count = word_count(&main_content_text(&document));

    let mut issues = Vec::new();
    if title.is_none() {
        issues.push(ExtractionIssue::MissingTitle);
    }
    if meta_description.is_none() {
        issues.push(ExtractionIssue::MissingMetaDescription);
    }
    match headings.h1.len() {
        0 => issues.push(ExtractionIssue::MissingH1),
        1 => {}
        _ => issues.push(ExtractionIssue::MultipleH1),
    }
    if images.iter().any(|image| !image.has_alt()) {
        issues.push(ExtractionIssue::MissingImageAlt);
    }

    debug!(
        word_count,
        images = images.len(),
        issues = issues.len(),
        "Extracted {}",
        base_url
    );

    PageRecord {
        url: base_url.to_string(),
        status_code,
        title,
        meta_description,
        headings,
        word_count,
        images,
        raw_html_snippet: html_snippet(html),
        issues,
    }
}

/// `<meta name="description">`, falling back to `og:description`
fn extract_meta_description(document: &Html) -> Option<String> {
    let content_of = |selector: &Selector, attr: &str, wanted: &str| {
        document
            .select(selector)
            .filter(|el| {
                el.value()
                    .attr(attr)
                    .is_some_and(|value| value.trim().eq_ignore_ascii_case(wanted))
            })
            .filter_map(|el| el.value().attr("content"))
            .map(collapse_whitespace)
            .find(|content| !content.is_empty())
    };

    content_of(&META_NAMED, "name", "description")
        .or_else(|| content_of(&META_PROPERTY, "property", "og:description"))
}

fn heading_texts(document: &Html, selector: &Selector) -> Vec<String> {
    document.select(selector).map(element_text).collect()
}

fn extract_images(document: &Html, base: Option<&Url>) -> Vec<ImageRef> {
    document
        .select(&IMG)
        .map(|el| {
            let element = el.value();
            // Images without a usable source keep an empty `src` so their alt
            // text still counts
            let raw_src = [element.attr("src"), element.attr("data-src")]
                .into_iter()
                .flatten()
                .map(str::trim)
                .find(|src| !src.is_empty())
                .unwrap_or_default();

            let src = match base.filter(|_| !raw_src.is_empty()).map(|base| base.join(raw_src)) {
                Some(Ok(resolved)) => resolved.to_string(),
                _ => raw_src.to_string(),
            };
            let alt = element
                .attr("alt")
                .map(str::trim)
                .filter(|alt| !alt.is_empty())
                .map(str::to_string);

            ImageRef { src, alt }
        })
        .collect()
}

/// First [`SNIPPET_BYTES`] of the HTML, cut back to a char boundary
fn html_snippet(html: &str) -> String {
    if html.len() <= SNIPPET_BYTES {
        return html.to_string();
    }
    let mut end = SNIPPET_BYTES;
    while !html.is_char_boundary(end) {
        end -= 1;
    }
    html[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.com/blog/post";

    #[test]
    fn test_extract_full_page() {
        let html = r#"<!doctype html>
            <html><head>
              <title>  A Guide to   Rust  </title>
              <meta name="Description" content=" Learn Rust step by step. ">
            </head><body>
              <h1>Rust Guide</h1>
              <h2>Basics</h2><h2>Ownership</h2>
              <h3>Borrowing</h3>
              <main><p>Rust is a systems language.</p>
                <img src="/img/logo.png" alt="Rust logo">
                <img data-src="diagram.svg" alt="  ">
                <img>
              </main>
            </body></html>"#;

        let record = extract_page(html, BASE, 200);

        assert_eq!(record.url, BASE);
        assert_eq!(record.status_code, 200);
        assert_eq!(record.title.as_deref(), Some("A Guide to Rust"));
        assert_eq!(record.meta_description.as_deref(), Some("Learn Rust step by step."));
        assert_eq!(record.headings.h1, vec!["Rust Guide"]);
        assert_eq!(record.headings.h2, vec!["Basics", "Ownership"]);
        assert_eq!(record.headings.h3, vec!["Borrowing"]);
        assert_eq!(record.word_count, 5);

        assert_eq!(record.images.len(), 3);
        assert_eq!(record.images[0].src, "https://example.com/img/logo.png");
        assert_eq!(record.images[0].alt.as_deref(), Some("Rust logo"));
        assert_eq!(record.images[1].src, "https://example.com/blog/diagram.svg");
        assert!(record.images[1].alt.is_none());
        assert_eq!(record.images[2].src, "");
        assert!(record.images[2].alt.is_none());

        assert_eq!(record.issues, vec![ExtractionIssue::MissingImageAlt]);
        assert!(!record.is_unparseable());
    }

    #[test]
    fn test_missing_metadata_issues() {
        let record = extract_page("<html><body><p>hello</p></body></html>", BASE, 200);

        assert!(record.title.is_none());
        assert!(record.meta_description.is_none());
        assert_eq!(
            record.issue_codes(),
            vec!["missing_title", "missing_meta_description", "missing_h1"]
        );
    }

    #[test]
    fn test_multiple_h1() {
        let record = extract_page(
            "<title>t</title><meta name=description content=d><h1>a</h1><h1>b</h1>",
            BASE,
            200,
        );
        assert_eq!(record.issues, vec![ExtractionIssue::MultipleH1]);
    }

    #[test]
    fn test_og_description_fallback() {
        let html = r#"<head><meta property="og:description" content="From open graph"></head>"#;
        let record = extract_page(html, BASE, 200);
        assert_eq!(record.meta_description.as_deref(), Some("From open graph"));
    }

    #[test]
    fn test_headings_read_from_whole_document() {
        let html = "<body><header><h1>Site</h1></header>\
                    <main><p>content words here</p></main>\
                    <footer><h3>Contact</h3></footer></body>";
        let record = extract_page(html, BASE, 200);

        assert_eq!(record.headings.h1, vec!["Site"]);
        assert_eq!(record.headings.h3, vec!["Contact"]);
        assert_eq!(record.word_count, 3);
    }

    #[test]
    fn test_word_count_from_single_large_div() {
        let body: String = (0..120).map(|i| format!("word{} ", i)).collect();
        let html = format!(
            "<html><body>\
               <nav><a href='/'>Home</a> <a href='/about'>About us</a></nav>\
               <div>{}</div>\
               <footer>Copyright example footer text</footer>\
             </body></html>",
            body
        );

        let record = extract_page(&html, BASE, 200);
        assert_eq!(record.word_count, 120);
    }

    #[test]
    fn test_unparseable_body_yields_empty_record() {
        for body in ["", "   \n", "\0\0binary\0"] {
            let record = extract_page(body, BASE, 200);
            assert!(record.is_unparseable());
            assert_eq!(record.issues, vec![ExtractionIssue::UnparseableHtml]);
            assert!(record.title.is_none());
            assert_eq!(record.word_count, 0);
        }
    }

    #[test]
    fn test_snippet_is_bounded_on_char_boundary() {
        let html = format!("<p>{}</p>", "é".repeat(SNIPPET_BYTES));
        let record = extract_page(&html, BASE, 200);

        assert!(record.raw_html_snippet.len() <= SNIPPET_BYTES);
        assert!(record.raw_html_snippet.len() >= SNIPPET_BYTES - 1);
        assert!(html.starts_with(&record.raw_html_snippet));
    }

    #[test]
    fn test_sourceless_image_still_needs_alt() {
        let record = extract_page(
            "<title>t</title><meta name=description content=d><h1>h</h1><img alt=''>",
            BASE,
            200,
        );

        assert_eq!(record.images.len(), 1);
        assert_eq!(record.images[0].src, "");
        assert_eq!(record.issues, vec![ExtractionIssue::MissingImageAlt]);

        let breakdown = crate::scorer::score_page(&record);
        assert!(breakdown.issues().contains(&"1 images missing alt text".to_string()));
    }

    #[test]
    fn test_relative_images_kept_when_base_is_invalid() {
        let record = extract_page("<img src='a.png' alt='x'>", "not a url", 200);
        assert_eq!(record.images[0].src, "a.png");
    }
}
