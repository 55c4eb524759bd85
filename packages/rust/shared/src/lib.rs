//! Shared types, error model, and configuration for secfeed.
//!
//! This crate is the foundation depended on by all other secfeed crates.
//! It provides:
//! - [`SecfeedError`] and the crate-wide [`Result`] alias
//! - Domain types ([`Resource`], [`StoredResource`], [`CycleSummary`])
//! - Configuration ([`AppConfig`], config loading, env validation)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CollectConfig, DiscordConfig, GithubConfig, RetryConfig, SinksConfig,
    StorageConfig, TelegramConfig, WebSearchConfig, WebhookEntry, config_dir, config_file_path,
    database_path, init_config, load_config, load_config_from, resolve_env, validate_env,
};
pub use error::{Result, SecfeedError};
pub use types::{
    CuratedSnippet, CycleSummary, Resource, ResourceKind, SourceTag, StoredResource,
    URL_NOT_APPLICABLE,
};
