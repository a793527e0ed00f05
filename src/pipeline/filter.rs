// src/pipeline/filter.rs

//! New-article filtering against the dedup store.

use chrono::NaiveDateTime;

use crate::models::Article;
use crate::storage::DedupStore;

/// Keep only articles whose hash is not in `store`, in source order.
///
/// Every returned article is marked in the store before it is returned, so
/// callers get at-most-once delivery even if notification later fails.
/// Repeats within the same scrape are dropped as well.
pub fn filter_new(store: &mut DedupStore, articles: Vec<Article>, now: NaiveDateTime) -> Vec<Article> {
    articles
        .into_iter()
        .filter(|article| store.mark(article, now))
        .collect()
}
