//! Tolerant extraction of the suggestion object from free-form model output
//!
//! Models do not reliably follow the "JSON only" instruction. Candidates are
//! tried in order until one parses as a JSON object:
//!
//! 1. the whole response
//! 2. the body of the first fenced code block
//! 3. every balanced `{...}` span, outermost first, as found by [`BraceScanner`]
//! 4. the same spans with single quotes rewritten to double quotes

use serde_json::{Map, Value};

use super::error::SuggestionError;

/// Nesting limit for the brace scanner
const MAX_DEPTH: usize = 128;

/// Fields recovered from a model response. Missing keys stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSuggestions {
    pub improved_title: Option<String>,
    pub improved_meta_description: Option<String>,
    pub improved_h1: Option<String>,
    pub seo_summary: Option<String>,
    pub suggestions: Vec<String>,
}

/// Recover the suggestion object from model output
pub fn parse_suggestions(text: &str) -> Result<ParsedSuggestions, SuggestionError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(SuggestionError::Unparseable("empty response".to_string()));
    }

    candidates(text)
        .iter()
        .find_map(|candidate| parse_object(candidate))
        .ok_or_else(|| SuggestionError::Unparseable(preview(text)))
}

fn candidates(text: &str) -> Vec<String> {
    let mut out = vec![text.to_string()];
    if let Some(body) = fenced_block(text) {
        out.push(body.to_string());
    }

    let spans: Vec<&str> = BraceScanner::spans(text)
        .into_iter()
        .map(|(start, end)| &text[start..end])
        .collect();
    out.extend(spans.iter().map(|span| span.to_string()));
    out.extend(
        spans
            .iter()
            .filter(|span| span.contains('\''))
            .map(|span| span.replace('\'', "\"")),
    );
    out
}

/// Body of the first ``` fence, without its language tag line
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    let body_start = after_fence.find('\n').map_or(after_fence.len(), |i| i + 1);
    let body = &after_fence[body_start..];
    let body = match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    };
    Some(body.trim())
}

fn parse_object(candidate: &str) -> Option<ParsedSuggestions> {
    let value: Value = serde_json::from_str(candidate.trim()).ok()?;
    let map = value.as_object()?;
    Some(ParsedSuggestions {
        improved_title: string_field(map, "improved_title"),
        improved_meta_description: string_field(map, "improved_meta_description"),
        improved_h1: string_field(map, "improved_h1"),
        seo_summary: string_field(map, "seo_summary"),
        suggestions: list_field(map, "suggestions"),
    })
}

fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(value_text)
}

/// Arrays map item by item; a lone scalar becomes a one-item list
fn list_field(map: &Map<String, Value>, key: &str) -> Vec<String> {
    match map.get(key) {
        Some(Value::Array(items)) => items.iter().filter_map(value_text).collect(),
        Some(other) => value_text(other).into_iter().collect(),
        None => Vec::new(),
    }
}

fn preview(text: &str) -> String {
    const PREVIEW_CHARS: usize = 120;
    let mut out: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        out.push_str("...");
    }
    out
}

/// Recursive-descent matcher for balanced brace spans.
///
/// Understands JSON strings, so braces inside string literals and escaped
/// quotes do not unbalance a span.
struct BraceScanner<'a> {
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> BraceScanner<'a> {
    /// Byte ranges of balanced outermost `{...}` spans in order of appearance.
    /// An unbalanced opening brace is skipped and scanning resumes inside it.
    fn spans(text: &'a str) -> Vec<(usize, usize)> {
        let mut scanner = BraceScanner {
            bytes: text.as_bytes(),
            pos: 0,
            depth: 0,
        };
        let mut spans = Vec::new();

        while scanner.pos < scanner.bytes.len() {
            if scanner.bytes[scanner.pos] != b'{' {
                scanner.pos += 1;
                continue;
            }
            let start = scanner.pos;
            match scanner.object() {
                Some(()) => spans.push((start, scanner.pos)),
                None => {
                    scanner.pos = start + 1;
                    scanner.depth = 0;
                }
            }
        }
        spans
    }

    /// Consume an object starting at the current `{`, leaving `pos` just past
    /// its closing brace
    fn object(&mut self) -> Option<()> {
        if self.depth >= MAX_DEPTH {
            return None;
        }
        self.depth += 1;
        self.pos += 1;

        let result = loop {
            match self.bytes.get(self.pos) {
                None => break None,
                Some(b'{') => {
                    if self.object().is_none() {
                        break None;
                    }
                }
                Some(b'}') => {
                    self.pos += 1;
                    break Some(());
                }
                Some(b'"') => {
                    if self.string().is_none() {
                        break None;
                    }
                }
                Some(_) => self.pos += 1,
            }
        };

        self.depth -= 1;
        result
    }

    /// Consume a double-quoted string starting at the current `"`
    fn string(&mut self) -> Option<()> {
        self.pos += 1;
        while let Some(&byte) = self.bytes.get(self.pos) {
            match byte {
                b'\\' => self.pos += 2,
                b'"' => {
                    self.pos += 1;
                    return Some(());
                }
                _ => self.pos += 1,
            }
        }
        None
    }
}
