// src/pipeline/run.rs

//! One monitoring run: fetch → filter-new → notify → persist.

use chrono::Local;

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::services::{ArticleSource, Notifier};
use crate::storage::{DedupStorage, DedupStore};

use super::filter::filter_new;
use super::notify::{DeliveryOutcome, DeliveryPlan, deliver};

/// Summary of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Candidates returned by the source
    pub scraped: usize,
    /// Candidates not seen before
    pub new_articles: usize,
    pub delivery: DeliveryOutcome,
    /// Records in the store at the end of the run
    pub store_size: usize,
    /// Whether the store was written back
    pub saved: bool,
}

/// Check connectivity, optionally announce, then run once.
///
/// Only a failed connectivity check is returned as an error. Everything
/// after that degrades to a partial [`RunReport`].
pub async fn run_pipeline(
    config: &Config,
    source: &dyn ArticleSource,
    notifier: &dyn Notifier,
    storage: &dyn DedupStorage,
) -> Result<RunReport> {
    let bot = notifier.check_connection().await.map_err(|e| match e {
        AppError::Connectivity(message) => AppError::Connectivity(message),
        other => AppError::connectivity(other.to_string()),
    })?;
    log::info!("Connected to Telegram as {}", bot);

    if config.notifier.announce_start {
        let text = format!("📰 {} 헤드라인 모니터링을 시작합니다.", config.source.name);
        if let Err(e) = notifier.send_message(&text).await {
            log::warn!("Start announcement failed: {}", e);
        }
    }

    Ok(run_monitor(config, source, notifier, storage).await)
}

/// Run fetch → filter → notify → persist without a connectivity check.
///
/// A store that does not parse is replaced by an empty one. Any other load
/// failure ends the run before fetching, since nothing could be deduplicated.
pub async fn run_monitor(
    config: &Config,
    source: &dyn ArticleSource,
    notifier: &dyn Notifier,
    storage: &dyn DedupStorage,
) -> RunReport {
    log::info!("Headline monitoring started");

    let mut store = match storage.load().await {
        Ok(store) => store,
        Err(e @ AppError::Json(_)) => {
            log::error!(
                "Dedup store {} is corrupt: {}. Starting empty.",
                storage.location().display(),
                e
            );
            DedupStore::new()
        }
        Err(e) => {
            log::error!(
                "Could not read dedup store {}: {}. Skipping this run.",
                storage.location().display(),
                e
            );
            return RunReport::default();
        }
    };
    let mut report = RunReport {
        store_size: store.len(),
        ..RunReport::default()
    };

    let articles = match source.fetch_headlines().await {
        Ok(articles) => articles,
        Err(e) => {
            log::error!("Headline fetch failed: {}", e);
            Vec::new()
        }
    };
    report.scraped = articles.len();
    if articles.is_empty() {
        log::info!("No articles collected");
        return report;
    }

    let new_articles = filter_new(&mut store, articles, Local::now().naive_local());
    report.new_articles = new_articles.len();
    report.store_size = store.len();
    if new_articles.is_empty() {
        log::info!("No new articles");
        return report;
    }
    log::info!("Found {} new articles", new_articles.len());

    let plan = DeliveryPlan::new(config.max_articles_per_run, &config.notifier);
    report.delivery = deliver(notifier, &new_articles, &plan).await;

    match storage.save(&store).await {
        Ok(()) => report.saved = true,
        Err(e) => log::error!(
            "Could not save dedup store {}: {}",
            storage.location().display(),
            e
        ),
    }

    log::info!("Processed {} new articles", report.new_articles);
    report
}
