// src/services/headlines.rs

//! Headline page scraper.
//!
//! The page layout is not under our control, so extraction runs a ladder of
//! strategies from most to least specific and keeps the first one that
//! produces any articles:
//!
//! 1. `div.headline-list` containers
//! 2. `<article>` elements
//! 3. `div`s whose class names mention `item`, `news` or `article`
//! 4. a line-oriented scan of the page text

use std::fmt;

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Article, SourceConfig};
use crate::utils::{clean_text, http, is_http_url, resolve_url};

/// Marker lines that open a headline in the plain-text layout.
const TEXT_HEADLINE_MARKERS: [&str; 2] = ["[연합뉴스 이 시각 헤드라인]", "■"];
/// Prefix of the line carrying the article link in the plain-text layout.
const TEXT_LINK_PREFIX: &str = "전문보기:";

/// Anything that can produce this run's candidate articles.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Fetch and extract candidate articles, in page order.
    async fn fetch_headlines(&self) -> Result<Vec<Article>>;
}

/// Extraction strategies, most specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    HeadlineList,
    ArticleTag,
    ClassPattern,
    FullText,
}

impl ExtractionStrategy {
    pub const ALL: [ExtractionStrategy; 4] = [
        Self::HeadlineList,
        Self::ArticleTag,
        Self::ClassPattern,
        Self::FullText,
    ];
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::HeadlineList => "headline-list",
            Self::ArticleTag => "article-tag",
            Self::ClassPattern => "class-pattern",
            Self::FullText => "full-text",
        };
        f.write_str(name)
    }
}

/// Result of parsing one page.
#[derive(Debug, Default)]
pub struct Extraction {
    /// Strategy that produced the articles, `None` when all came up empty
    pub strategy: Option<ExtractionStrategy>,
    pub articles: Vec<Article>,
}

/// Compiled selectors and patterns for headline extraction.
pub struct HeadlineParser {
    source_name: String,
    base_url: Url,
    max_candidates: usize,
    min_title_chars: usize,
    headline_list: Selector,
    article_tag: Selector,
    classed_div: Selector,
    title_candidates: [Selector; 3],
    time_tag: Selector,
    classed_span: Selector,
    container_class: Regex,
    time_class: Regex,
}

impl HeadlineParser {
    /// Build a parser for the given source settings.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(Self {
            source_name: config.name.clone(),
            base_url: Url::parse(&config.base_url)?,
            max_candidates: config.max_candidates,
            min_title_chars: config.min_title_chars,
            headline_list: Self::parse_selector("div.headline-list")?,
            article_tag: Self::parse_selector("article")?,
            classed_div: Self::parse_selector("div[class]")?,
            title_candidates: [
                Self::parse_selector("a")?,
                Self::parse_selector("h2")?,
                Self::parse_selector("h3")?,
            ],
            time_tag: Self::parse_selector("time")?,
            classed_span: Self::parse_selector("span[class]")?,
            container_class: Self::parse_regex("item|news|article")?,
            time_class: Self::parse_regex("time|date")?,
        })
    }

    /// Run the strategy ladder over a page.
    pub fn parse(&self, html: &str) -> Extraction {
        let document = Html::parse_document(html);

        for strategy in ExtractionStrategy::ALL {
            let articles = self.extract(&document, strategy);
            if !articles.is_empty() {
                log::debug!("Strategy {} produced {} articles", strategy, articles.len());
                return Extraction {
                    strategy: Some(strategy),
                    articles,
                };
            }
            log::debug!("Strategy {} produced nothing", strategy);
        }

        Extraction::default()
    }

    /// Run a single strategy.
    pub fn extract(&self, document: &Html, strategy: ExtractionStrategy) -> Vec<Article> {
        match strategy {
            ExtractionStrategy::HeadlineList => {
                self.from_containers(document.select(&self.headline_list))
            }
            ExtractionStrategy::ArticleTag => {
                self.from_containers(document.select(&self.article_tag))
            }
            ExtractionStrategy::ClassPattern => self.from_containers(
                document
                    .select(&self.classed_div)
                    .filter(|div| self.has_class_matching(div, &self.container_class)),
            ),
            ExtractionStrategy::FullText => self.from_text(document),
        }
    }

    fn from_containers<'a>(
        &self,
        containers: impl Iterator<Item = ElementRef<'a>>,
    ) -> Vec<Article> {
        containers
            .take(self.max_candidates)
            .filter_map(|item| self.parse_container(&item))
            .collect()
    }

    fn parse_container(&self, item: &ElementRef) -> Option<Article> {
        let title_elem = self
            .title_candidates
            .iter()
            .find_map(|sel| item.select(sel).next())?;

        let title = clean_text(&title_elem.text().collect::<Vec<_>>().join(" "));
        if title.is_empty() || title.chars().count() < self.min_title_chars {
            return None;
        }

        let href = title_elem.value().attr("href").unwrap_or("").trim();
        if href.is_empty() {
            return None;
        }
        let link = resolve_url(&self.base_url, href);
        if !is_http_url(&link) {
            log::debug!("Skipping '{}' with unusable link {}", title, link);
            return None;
        }

        let time_elem = item.select(&self.time_tag).next().or_else(|| {
            item.select(&self.classed_span)
                .find(|span| self.has_class_matching(span, &self.time_class))
        });
        let published_time = time_elem
            .map(|el| clean_text(&el.text().collect::<Vec<_>>().join(" ")))
            .unwrap_or_default();

        Some(
            Article::new(title, link, self.source_name.clone())
                .with_published_time(published_time),
        )
    }

    /// Scan the visible page text for marker-led headlines followed by a link line.
    fn from_text(&self, document: &Html) -> Vec<Article> {
        let mut articles = Vec::new();
        let mut current_title: Option<String> = None;
        let mut current_link: Option<String> = None;

        for line in visible_lines(document) {
            if TEXT_HEADLINE_MARKERS.iter().any(|m| line.contains(m)) {
                if let (Some(title), Some(link)) = (current_title.take(), current_link.take()) {
                    articles.push(Article::new(title, link, self.source_name.clone()));
                }
                current_title = Some(clean_text(&line.replace('■', "")));
            } else if line.starts_with(TEXT_LINK_PREFIX) || line.starts_with("https://") {
                let link = line.trim_start_matches(TEXT_LINK_PREFIX).trim();
                if is_http_url(link) {
                    current_link = Some(link.to_string());
                }
            }
        }
        if let (Some(title), Some(link)) = (current_title, current_link) {
            articles.push(Article::new(title, link, self.source_name.clone()));
        }

        articles.retain(|a| a.title.chars().count() >= self.min_title_chars);
        articles.truncate(self.max_candidates);
        articles
    }

    fn has_class_matching(&self, element: &ElementRef, pattern: &Regex) -> bool {
        element.value().classes().any(|class| pattern.is_match(class))
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }

    fn parse_regex(pattern: &str) -> Result<Regex> {
        Regex::new(pattern).map_err(|e| AppError::config(format!("bad pattern {pattern}: {e}")))
    }
}

/// Non-empty, trimmed text lines outside `script`/`style`.
fn visible_lines(document: &Html) -> Vec<String> {
    document
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node
                .parent()
                .and_then(|p| p.value().as_element().map(|e| e.name()))
                .is_some_and(|name| matches!(name, "script" | "style" | "noscript"));
            if hidden { None } else { Some(String::from(&**text)) }
        })
        .flat_map(|text| {
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Fetches the configured headline page over HTTP.
pub struct HeadlineFetcher {
    url: String,
    client: reqwest::Client,
    parser: HeadlineParser,
}

impl HeadlineFetcher {
    /// Create a fetcher with its own HTTP client.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = http::create_async_client(&config.user_agent, config.timeout_secs)?;
        Ok(Self {
            url: config.url.clone(),
            client,
            parser: HeadlineParser::new(config)?,
        })
    }
}

#[async_trait]
impl ArticleSource for HeadlineFetcher {
    async fn fetch_headlines(&self) -> Result<Vec<Article>> {
        log::info!("Checking headlines at {}", self.url);
        let html = http::fetch_text(&self.client, &self.url).await?;

        let extraction = self.parser.parse(&html);
        match extraction.strategy {
            Some(strategy) => log::info!(
                "Collected {} articles (strategy: {})",
                extraction.articles.len(),
                strategy
            ),
            None => log::warn!("No articles found on {}", self.url),
        }
        Ok(extraction.articles)
    }
}
