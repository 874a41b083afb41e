//! Recommendation and resource mining from free assistant text.
//!
//! Both extractors are heuristic pattern matchers and never fail: text that
//! does not fit a pattern (an unmatched quote, a cue with no links) simply
//! yields nothing.
//!
//! Books are quoted titles with an optional author clause:
//!
//! ```text
//! He recommends "Deep Work" by Cal Newport.   -> Deep Work / Cal Newport
//! Read "Thinking, Fast and Slow" (Kahneman)    -> Thinking, Fast and Slow / Kahneman
//! Try "Atomic Habits".                         -> Atomic Habits / Unknown Author
//! ```
//!
//! Resources are links listed after a cue phrase, up to the next blank line
//! or cue:
//!
//! ```text
//! Resources:
//! - Coursera https://coursera.org
//! - Kaggle Learn: https://www.kaggle.com/learn
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Author recorded when a recommendation names none
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// Phrases that introduce a block of resource links
pub const RESOURCE_CUES: [&str; 4] = [
    "Here are some resources:",
    "Resources:",
    "For more information:",
    "Learn more:",
];

static BOOK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:"(?P<plain>[^"\n]+)"|“(?P<curly>[^“”\n]+)”)(?:\s*,?\s+by\s+(?P<by>[^.!?"“”\n]+)|\s*\((?P<paren>[^()"“”\n]+)\))?"#,
    )
    .expect("book pattern is valid")
});

static CUE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives: Vec<String> = RESOURCE_CUES.iter().map(|c| regex::escape(c)).collect();
    Regex::new(&alternatives.join("|")).expect("cue pattern is valid")
});

static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\r?\n").expect("blank line pattern is valid"));

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("url pattern is valid"));

static BULLET_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[•\-*]+|\d+[.)])\s*").expect("bullet pattern is valid"));

/// A book mentioned in a reply, not yet on the shelf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub author: String,
}

impl Recommendation {
    pub fn new(title: impl Into<String>, author: Option<&str>) -> Self {
        let author = author
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(UNKNOWN_AUTHOR);
        Self {
            title: title.into(),
            author: author.to_string(),
        }
    }
}

/// A named external link mentioned in a reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub title: String,
    pub url: String,
}

/// Mine quoted book titles, in order of first appearance.
///
/// A title quoted twice in the same text is reported once.
pub fn extract_recommendations(text: &str) -> Vec<Recommendation> {
    let mut seen = HashSet::new();
    let mut recommendations = Vec::new();

    for caps in BOOK_PATTERN.captures_iter(text) {
        let Some(title) = caps.name("plain").or_else(|| caps.name("curly")) else {
            continue;
        };
        let title = title.as_str().trim();
        if title.is_empty() || !seen.insert(title.to_string()) {
            continue;
        }

        let author = caps
            .name("by")
            .or_else(|| caps.name("paren"))
            .map(|m| m.as_str().trim_end_matches([',', ';', ':', ' ', '\t']));
        recommendations.push(Recommendation::new(title, author));
    }

    recommendations
}

/// Mine links from every cue-introduced block, in order of appearance.
///
/// A URL already reported is not repeated.
pub fn extract_resources(text: &str) -> Vec<Resource> {
    let mut seen = HashSet::new();
    let mut resources = Vec::new();

    for cue in CUE_PATTERN.find_iter(text) {
        let block = resource_block(&text[cue.end()..]);

        let mut segment_start = 0;
        for url_match in URL_PATTERN.find_iter(block) {
            let url = trim_url(url_match.as_str());
            let line_start = block[..url_match.start()]
                .rfind('\n')
                .map(|i| i + 1)
                .unwrap_or(0);
            let preceding = &block[line_start.max(segment_start)..url_match.start()];
            segment_start = url_match.end();

            let has_host = url.split_once("://").is_some_and(|(_, rest)| !rest.is_empty());
            if !has_host || !seen.insert(url.to_string()) {
                continue;
            }

            let title = clean_resource_title(preceding).unwrap_or_else(|| url.to_string());
            resources.push(Resource {
                title,
                url: url.to_string(),
            });
        }
    }

    resources
}

/// Text after a cue up to the next blank line or cue, leading blank lines
/// skipped
fn resource_block(after_cue: &str) -> &str {
    let body = after_cue.trim_start_matches([' ', '\t', '\r', '\n']);
    let end = [BLANK_LINE.find(body), CUE_PATTERN.find(body)]
        .into_iter()
        .flatten()
        .map(|m| m.start())
        .min()
        .unwrap_or(body.len());
    &body[..end]
}

/// Drop trailing punctuation; a closing bracket stays when the URL opens it
fn trim_url(mut url: &str) -> &str {
    while let Some(last) = url.chars().last() {
        let strip = match last {
            '.' | ',' | ';' | ':' | '!' | '?' | '}' | '>' | '"' | '\'' => true,
            ')' => url.matches('(').count() < url.matches(')').count(),
            ']' => url.matches('[').count() < url.matches(']').count(),
            _ => false,
        };
        if !strip {
            break;
        }
        url = &url[..url.len() - last.len_utf8()];
    }
    url
}

fn clean_resource_title(preceding: &str) -> Option<String> {
    let title = BULLET_PREFIX.replace(preceding, "");
    let title = title
        .trim()
        .trim_end_matches([':', '-', '–', '—', '(', '[', '<', '*', ' ', '\t'])
        .trim_start_matches('*')
        .trim();
    let title = title
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .unwrap_or(title)
        .trim();

    (!title.is_empty()).then(|| title.to_string())
}
