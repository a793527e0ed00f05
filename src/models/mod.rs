// src/models/mod.rs

//! Domain models for the headline monitor.

mod article;
mod config;

// Re-export all public types
pub use article::Article;
pub use config::{
    Config, DEFAULT_CONFIG_FILES, DeliveryMode, ENV_BOT_TOKEN, ENV_CHAT_ID, LoggingConfig,
    NotifierConfig, SourceConfig, StorageConfig, TelegramConfig,
};
