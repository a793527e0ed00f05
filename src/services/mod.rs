// src/services/mod.rs

//! Service layer for the headline monitor.
//!
//! This module contains the I/O edges:
//! - Headline scraping (`HeadlineFetcher`, `HeadlineParser`)
//! - Bot messaging (`TelegramBot`)

mod headlines;
mod telegram;

pub use headlines::{
    ArticleSource, Extraction, ExtractionStrategy, HeadlineFetcher, HeadlineParser,
};
pub use telegram::{Notifier, SendMessageRequest, TelegramBot};
