// src/models/article.rs

//! Article data structure.

use serde::{Deserialize, Serialize};
use md5::{Digest, Md5};

use crate::utils::{escape_html, escape_html_within};

/// A headline scraped from the source page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Article {
    /// Headline text
    pub title: String,

    /// Absolute URL to the article
    pub link: String,

    /// Publication time as printed on the page, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_time: Option<String>,

    /// Display name of the outlet
    pub source: String,
}

impl Article {
    /// Create an article without a publication time.
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            published_time: None,
            source: source.into(),
        }
    }

    /// Attach a publication time. Blank strings are treated as absent.
    pub fn with_published_time(mut self, time: impl Into<String>) -> Self {
        let time = time.into();
        self.published_time = if time.trim().is_empty() {
            None
        } else {
            Some(time)
        };
        self
    }

    /// Stable content hash: MD5 of `title || link` as lowercase hex.
    ///
    /// Keys in existing `processed_articles.json` files use this form.
    pub fn content_hash(&self) -> String {
        let mut hasher = Md5::new();
        hasher.update(self.title.as_bytes());
        hasher.update(self.link.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Render the article as a Telegram HTML message.
    pub fn to_html_message(&self) -> String {
        self.render(&escape_html(&self.title))
    }

    /// Render within `max_chars` characters by shortening the title.
    ///
    /// The markup stays balanced, unlike cutting the rendered message.
    pub fn to_html_message_within(&self, max_chars: usize) -> String {
        let message = self.to_html_message();
        if message.chars().count() <= max_chars {
            return message;
        }

        let overhead = self.render("").chars().count();
        self.render(&escape_html_within(
            &self.title,
            max_chars.saturating_sub(overhead),
        ))
    }

    fn render(&self, escaped_title: &str) -> String {
        let mut message = format!("📰 <b>{}</b>\n\n", escaped_title);

        if let Some(time) = &self.published_time {
            message.push_str(&format!("⏰ {}\n", escape_html(time)));
        }

        message.push_str(&format!("📍 {}\n", escape_html(&self.source)));
        message.push_str(&format!(
            "🔗 <a href=\"{}\">기사 읽기</a>",
            escape_html(&self.link)
        ));
        message
    }
}
