//! HTML to plain Markdown for model context.
//!
//! Only the posting text matters here: page chrome is dropped, links are
//! reduced to their text and images disappear.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use cvtailor_shared::{Result, TailorError};

/// Content containers tried in order before falling back to `<body>`.
const CONTENT_SELECTORS: &[&str] = &[
    "main",
    "[role=\"main\"]",
    "article",
    ".job-description",
    "#job-description",
    ".posting",
    ".content",
];

const SKIP_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "iframe", "noscript", "svg", "form",
    "img",
];

/// Convert an HTML document to Markdown text.
pub fn html_to_text(html: &str) -> Result<String> {
    let content_html = extract_content_html(html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIP_TAGS.to_vec())
        .build();
    let raw = converter
        .convert(&content_html)
        .map_err(|e| TailorError::Conversion(format!("htmd conversion failed: {e}")))?;
    debug!(raw_len = raw.len(), "htmd conversion complete");

    let text = strip_links(&raw);
    let text = clean_blank_lines(&text);
    Ok(normalize_whitespace(&text))
}

/// Whether `body` should go through [`html_to_text`].
pub fn looks_like_html(body: &str, content_type: Option<&str>) -> bool {
    if let Some(ct) = content_type {
        return ct.contains("html");
    }
    let trimmed = body.trim_start();
    let head = trimmed.get(..256).unwrap_or(trimmed).to_ascii_lowercase();
    head.starts_with("<!doctype html")
        || head.starts_with("<html")
        || (head.starts_with('<') && head.contains("<body"))
}

/// Cut `text` to at most `max_chars` characters without splitting one.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

fn extract_content_html(html: &str) -> String {
    let doc = Html::parse_document(html);

    for sel in CONTENT_SELECTORS {
        if let Ok(selector) = Selector::parse(sel) {
            if let Some(el) = doc.select(&selector).next() {
                return el.inner_html();
            }
        }
    }

    if let Ok(body) = Selector::parse("body") {
        if let Some(el) = doc.select(&body).next() {
            return el.inner_html();
        }
    }

    html.to_string()
}

/// `![alt](src)` → nothing, `[text](href)` → `text`.
fn strip_links(md: &str) -> String {
    static IMAGE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("valid regex"));
    static LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("valid regex"));

    let without_images = IMAGE_RE.replace_all(md, "");
    LINK_RE.replace_all(&without_images, "$1").to_string()
}

/// Collapse runs of blank lines into one.
fn clean_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n\s*\n(\s*\n)+").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(md, "\n\n").to_string()
}

fn normalize_whitespace(md: &str) -> String {
    let joined = md
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\n", joined.trim())
}
