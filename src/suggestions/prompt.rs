//! Prompt construction for suggestion generation

use crate::extractor::PageRecord;

/// System preamble sent with every suggestion request
pub const PREAMBLE: &str = "You are a helpful SEO assistant that must output ONLY JSON.";

/// Characters of raw HTML embedded in the prompt
pub const PROMPT_SNIPPET_CHARS: usize = 2000;

/// Headings per level embedded in the prompt
const PROMPT_HEADINGS: usize = 3;

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        return "none".to_string();
    }
    items
        .iter()
        .take(PROMPT_HEADINGS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Build the suggestion prompt for a page and its rule issues
pub fn build_prompt(record: &PageRecord, issues: &[String]) -> String {
    let snippet: String = record
        .raw_html_snippet
        .chars()
        .take(PROMPT_SNIPPET_CHARS)
        .collect();
    let issues_text = if issues.is_empty() {
        "none".to_string()
    } else {
        issues.join("; ")
    };

    format!(
        r#"Given the page metadata below, generate a JSON object ONLY (no explanation, no commentary).
The JSON must contain exactly these keys:
- improved_title (string)
- improved_meta_description (string)
- improved_h1 (string)
- seo_summary (string)
- suggestions (array of strings)

Page context:
URL: {url}
TITLE: {title}
META: {meta}
H1: {h1}
H2: {h2}
H3: {h3}
WORD_COUNT: {word_count}
ISSUES: {issues}
HTML_SNIPPET: {snippet}

Output example:
{{
  "improved_title": "string",
  "improved_meta_description": "string",
  "improved_h1": "string",
  "seo_summary": "string",
  "suggestions": ["string", "string"]
}}

Produce ONLY the JSON object. Values should be concise and avoid newlines."#,
        url = record.url,
        title = record.title.as_deref().unwrap_or(""),
        meta = record.meta_description.as_deref().unwrap_or(""),
        h1 = join_or_none(&record.headings.h1),
        h2 = join_or_none(&record.headings.h2),
        h3 = join_or_none(&record.headings.h3),
        word_count = record.word_count,
        issues = issues_text,
        snippet = snippet,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::Headings;

    #[test]
    fn test_prompt_embeds_page_context() {
        let record = PageRecord {
            url: "https://example.com/".to_string(),
            status_code: 200,
            title: Some("Example Title".to_string()),
            meta_description: None,
            headings: Headings {
                h1: vec!["One".into(), "Two".into(), "Three".into(), "Four".into()],
                h2: Vec::new(),
                h3: vec!["Sub".into()],
            },
            word_count: 321,
            images: Vec::new(),
            raw_html_snippet: format!("<html>{}</html>", "x".repeat(5000)),
            issues: Vec::new(),
        };

        let prompt = build_prompt(
            &record,
            &["Meta description missing".to_string(), "Multiple H1 tags (4)".to_string()],
        );

        assert!(prompt.contains("TITLE: Example Title"));
        assert!(prompt.contains("META: \n"));
        assert!(prompt.contains("H1: One | Two | Three\n"));
        assert!(prompt.contains("H2: none"));
        assert!(prompt.contains("H3: Sub"));
        assert!(prompt.contains("WORD_COUNT: 321"));
        assert!(prompt.contains("ISSUES: Meta description missing; Multiple H1 tags (4)"));
        assert!(!prompt.contains(&"x".repeat(PROMPT_SNIPPET_CHARS)));
        assert!(prompt.contains(&"x".repeat(PROMPT_SNIPPET_CHARS - 10)));
    }
}
