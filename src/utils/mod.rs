// src/utils/mod.rs

//! Utility functions and helpers.

pub mod http;

use unicode_segmentation::UnicodeSegmentation;
use url::Url;

/// Suffix appended to truncated messages.
pub const ELLIPSIS: &str = "...";

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Whether the string is an absolute http(s) URL with a host.
pub fn is_http_url(candidate: &str) -> bool {
    Url::parse(candidate)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Escape `&`, `<`, `>` and `"` for Telegram HTML.
pub fn escape_html(text: &str) -> String {
    html_escape::encode_double_quoted_attribute(text).into_owned()
}

/// Cut `text` to at most `max_chars` characters plus [`ELLIPSIS`].
///
/// Cuts on grapheme boundaries so emoji and combined Hangul stay intact.
pub fn truncate_message(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let mut kept = 0;
    let mut result = String::new();
    for grapheme in text.graphemes(true) {
        let width = grapheme.chars().count();
        if kept + width > max_chars {
            break;
        }
        kept += width;
        result.push_str(grapheme);
    }
    result.push_str(ELLIPSIS);
    result
}

/// HTML-escape `text` into at most `max_chars` characters.
///
/// Over-long text is cut between graphemes before escaping, so no entity is
/// split, and [`ELLIPSIS`] is appended within the budget.
pub fn escape_html_within(text: &str, max_chars: usize) -> String {
    let escaped = escape_html(text);
    if escaped.chars().count() <= max_chars {
        return escaped;
    }

    let budget = max_chars.saturating_sub(ELLIPSIS.len());
    let mut kept = 0;
    let mut result = String::new();
    for grapheme in text.graphemes(true) {
        let piece = escape_html(grapheme);
        let width = piece.chars().count();
        if kept + width > budget {
            break;
        }
        kept += width;
        result.push_str(&piece);
    }
    result.push_str(ELLIPSIS);
    result
}

/// Render a byte count as `B`, `KB`, `MB` or `GB` with one decimal.
pub fn format_file_size(size_bytes: u64) -> String {
    if size_bytes == 0 {
        return "0B".to_string();
    }

    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = size_bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1}{}", size, UNITS[unit])
}
