// src/pipeline/notify.rs

//! Notification sequencing.
//!
//! Messages go out one at a time with a fixed pause between sends. The first
//! failed send ends the sequence; anything after it is dropped for this run.

use std::time::Duration;

use crate::models::{Article, DeliveryMode, NotifierConfig};
use crate::services::Notifier;

/// Digest messages above this many characters are split per article.
pub const DIGEST_MAX_CHARS: usize = 4000;

/// How a batch of articles is delivered.
#[derive(Debug, Clone)]
pub struct DeliveryPlan {
    pub max_articles: usize,
    pub delay: Duration,
    pub mode: DeliveryMode,
    /// Longest message, in characters, a single article may render to
    pub max_message_chars: usize,
}

impl DeliveryPlan {
    pub fn new(max_articles: usize, notifier: &NotifierConfig) -> Self {
        Self {
            max_articles,
            delay: Duration::from_millis(notifier.send_delay_ms),
            mode: notifier.mode,
            max_message_chars: notifier.max_message_chars,
        }
    }
}

/// What happened during delivery.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    /// Send calls made
    pub attempted: usize,
    /// Send calls that succeeded
    pub sent: usize,
    /// Articles contained in successful messages
    pub articles_delivered: usize,
    /// Whether the sequence was cut short by a failure
    pub aborted: bool,
}

/// A composed message and the number of articles it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub text: String,
    pub article_count: usize,
}

/// Turn articles into the messages to send, in order.
pub fn compose_messages(
    articles: &[Article],
    mode: DeliveryMode,
    max_chars: usize,
) -> Vec<OutboundMessage> {
    match mode {
        DeliveryMode::PerArticle => articles
            .iter()
            .map(|a| OutboundMessage {
                text: a.to_html_message_within(max_chars),
                article_count: 1,
            })
            .collect(),
        DeliveryMode::Digest => compose_digest(articles, max_chars),
    }
}

fn compose_digest(articles: &[Article], max_chars: usize) -> Vec<OutboundMessage> {
    if articles.is_empty() {
        return Vec::new();
    }

    let source = crate::utils::escape_html(&articles[0].source);
    let header = format!("🚨 <b>{} 새 헤드라인 {}건</b>", source, articles.len());
    let numbered: Vec<String> = articles
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let prefix = format!("<b>{}.</b> ", i + 1);
            let budget = max_chars.saturating_sub(prefix.chars().count());
            prefix + &a.to_html_message_within(budget)
        })
        .collect();

    let combined = format!("{}\n\n{}", header, numbered.join("\n\n"));
    if combined.chars().count() <= DIGEST_MAX_CHARS {
        return vec![OutboundMessage {
            text: combined,
            article_count: articles.len(),
        }];
    }

    std::iter::once(OutboundMessage {
        text: header,
        article_count: 0,
    })
    .chain(numbered.into_iter().map(|text| OutboundMessage {
        text,
        article_count: 1,
    }))
    .collect()
}

/// Send up to `plan.max_articles` of `articles`, stopping at the first failure.
pub async fn deliver(
    notifier: &dyn Notifier,
    articles: &[Article],
    plan: &DeliveryPlan,
) -> DeliveryOutcome {
    let limit = articles.len().min(plan.max_articles);
    let messages = compose_messages(&articles[..limit], plan.mode, plan.max_message_chars);
    let mut outcome = DeliveryOutcome::default();

    for (i, message) in messages.iter().enumerate() {
        if i > 0 && !plan.delay.is_zero() {
            tokio::time::sleep(plan.delay).await;
        }

        outcome.attempted += 1;
        match notifier.send_message(&message.text).await {
            Ok(()) => {
                outcome.sent += 1;
                outcome.articles_delivered += message.article_count;
            }
            Err(e) => {
                log::error!(
                    "Notification {}/{} failed, skipping the rest of this run: {}",
                    i + 1,
                    messages.len(),
                    e
                );
                outcome.aborted = true;
                break;
            }
        }
    }

    log::info!(
        "Notifications sent: {}/{} ({} articles)",
        outcome.sent,
        messages.len(),
        outcome.articles_delivered
    );
    outcome
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::{AppError, Result};

    /// Records messages and fails on the n-th send (1-based) when asked to.
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
        fail_on: Option<usize>,
    }

    impl RecordingNotifier {
        fn new(fail_on: Option<usize>) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_on,
            }
        }

        fn calls(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn check_connection(&self) -> Result<String> {
            Ok("test_bot".to_string())
        }

        async fn send_message(&self, text: &str) -> Result<()> {
            let mut sent = self.sent.lock().unwrap();
            sent.push(text.to_string());
            if Some(sent.len()) == self.fail_on {
                return Err(AppError::telegram("429: Too Many Requests"));
            }
            Ok(())
        }
    }

    fn articles(n: usize) -> Vec<Article> {
        (0..n)
            .map(|i| {
                Article::new(
                    format!("Headline {i} for delivery"),
                    format!("https://www.yna.co.kr/view/{i}"),
                    "연합뉴스",
                )
            })
            .collect()
    }

    fn plan(max_articles: usize, mode: DeliveryMode) -> DeliveryPlan {
        DeliveryPlan {
            max_articles,
            delay: Duration::ZERO,
            mode,
            max_message_chars: 4090,
        }
    }

    #[tokio::test]
    async fn test_caps_notifications_per_run() {
        let notifier = RecordingNotifier::new(None);
        let outcome = deliver(&notifier, &articles(7), &plan(5, DeliveryMode::PerArticle)).await;

        assert_eq!(outcome.attempted, 5);
        assert_eq!(outcome.sent, 5);
        assert_eq!(outcome.articles_delivered, 5);
        assert!(!outcome.aborted);

        let calls = notifier.calls();
        assert!(calls[0].contains("Headline 0 for delivery"));
        assert!(calls[4].contains("Headline 4 for delivery"));
    }

    #[tokio::test]
    async fn test_stops_on_first_failure() {
        let notifier = RecordingNotifier::new(Some(2));
        let outcome = deliver(&notifier, &articles(4), &plan(5, DeliveryMode::PerArticle)).await;

        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.sent, 1);
        assert!(outcome.aborted);
        assert_eq!(notifier.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_nothing_to_send() {
        let notifier = RecordingNotifier::new(None);
        let outcome = deliver(&notifier, &[], &plan(5, DeliveryMode::PerArticle)).await;
        assert_eq!(outcome, DeliveryOutcome::default());
    }

    #[tokio::test]
    async fn test_digest_single_message() {
        let notifier = RecordingNotifier::new(None);
        let outcome = deliver(&notifier, &articles(3), &plan(5, DeliveryMode::Digest)).await;

        assert_eq!(outcome.attempted, 1);
        assert_eq!(outcome.articles_delivered, 3);

        let calls = notifier.calls();
        assert!(calls[0].starts_with("🚨 <b>연합뉴스 새 헤드라인 3건</b>"));
        assert!(calls[0].contains("<b>3.</b> 📰"));
    }

    #[test]
    fn test_long_digest_is_split() {
        let long: Vec<Article> = (0..3)
            .map(|i| {
                Article::new(
                    format!("{i} {}", "긴 제목 ".repeat(300)),
                    format!("https://www.yna.co.kr/view/{i}"),
                    "연합뉴스",
                )
            })
            .collect();

        let messages = compose_messages(&long, DeliveryMode::Digest, 4090);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].article_count, 0);
        assert!(messages[1].text.starts_with("<b>1.</b>"));
        assert_eq!(messages.iter().map(|m| m.article_count).sum::<usize>(), 3);
    }

    #[tokio::test]
    async fn test_long_title_message_stays_well_formed() {
        let notifier = RecordingNotifier::new(None);
        let long = vec![Article::new(
            "<속보> ".repeat(1500),
            "https://www.yna.co.kr/view/AKR20260901000100001",
            "연합뉴스",
        )];

        let mut plan = plan(5, DeliveryMode::PerArticle);
        plan.max_message_chars = 500;
        deliver(&notifier, &long, &plan).await;

        let calls = notifier.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].chars().count() <= 500);
        assert!(calls[0].contains("...</b>"));
        assert!(calls[0].ends_with("기사 읽기</a>"));
    }
}
