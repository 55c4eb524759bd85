//! Application configuration for secfeed.
//!
//! User config lives at `~/.secfeed/secfeed.toml`.
//! CLI flags override config file values, which override defaults.
//! Secrets are never stored in the file: config fields hold the *names* of
//! environment variables, resolved at startup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SecfeedError};
use crate::types::CuratedSnippet;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "secfeed.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".secfeed";

/// Default database file name inside the config directory.
const DB_FILE_NAME: &str = "secfeed.db";

// ---------------------------------------------------------------------------
// Config structs (matching secfeed.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Collection cycle settings.
    #[serde(default)]
    pub collect: CollectConfig,

    /// GitHub repository search settings.
    #[serde(default)]
    pub github: GithubConfig,

    /// Web-search API settings.
    #[serde(default)]
    pub websearch: WebSearchConfig,

    /// Throttling backoff policy.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Delivery sink settings.
    #[serde(default)]
    pub sinks: SinksConfig,

    /// Locally authored snippets injected into every cycle.
    #[serde(default = "default_curated")]
    pub curated: Vec<CuratedSnippet>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            collect: CollectConfig::default(),
            github: GithubConfig::default(),
            websearch: WebSearchConfig::default(),
            retry: RetryConfig::default(),
            storage: StorageConfig::default(),
            sinks: SinksConfig::default(),
            curated: default_curated(),
        }
    }
}

/// `[collect]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectConfig {
    /// Queries sent to every query-based source each cycle.
    #[serde(default = "default_queries")]
    pub queries: Vec<String>,

    /// Page URLs handed to the scraper each cycle.
    #[serde(default = "default_scrape_targets")]
    pub scrape_targets: Vec<String>,

    /// Per-query result cap for upstream searches.
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// Seconds between scheduled cycles.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl CollectConfig {
    /// The scheduled cycle interval as a [`std::time::Duration`].
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs)
    }
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            queries: default_queries(),
            scrape_targets: default_scrape_targets(),
            max_results: default_max_results(),
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_queries() -> Vec<String> {
    vec![
        "penetration testing tools".into(),
        "white hat hacking commands".into(),
        "cybersecurity tabletop exercises".into(),
        "programming tricks python".into(),
    ]
}
fn default_scrape_targets() -> Vec<String> {
    vec![
        "https://book.hacktricks.wiki/pentesting".into(),
        "https://owasp.org/www-project-web-security-testing-guide/".into(),
    ]
}
fn default_max_results() -> u32 {
    10
}
fn default_interval_secs() -> u64 {
    3600
}

/// `[github]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// API base URL (override for testing).
    #[serde(default = "default_github_api")]
    pub api_url: String,

    /// Name of the env var holding the token (never store the token itself).
    #[serde(default = "default_github_token_env")]
    pub token_env: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api(),
            token_env: default_github_token_env(),
        }
    }
}

fn default_github_api() -> String {
    "https://api.github.com".into()
}
fn default_github_token_env() -> String {
    "GITHUB_TOKEN".into()
}

/// `[websearch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchConfig {
    /// Search endpoint URL (override for testing).
    #[serde(default = "default_websearch_endpoint")]
    pub endpoint: String,

    /// Name of the env var holding the API key.
    #[serde(default = "default_websearch_key_env")]
    pub api_key_env: String,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_websearch_endpoint(),
            api_key_env: default_websearch_key_env(),
        }
    }
}

fn default_websearch_endpoint() -> String {
    "https://serpapi.com/search".into()
}
fn default_websearch_key_env() -> String {
    "SERPAPI_KEY".into()
}

/// `[retry]` section. Governs how upstream throttling is handled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total request attempts before giving up on a throttled upstream.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait when a throttling response carries no Retry-After header.
    #[serde(default = "default_backoff_secs")]
    pub default_backoff_secs: u64,

    /// Upper bound on any single advisory wait.
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            default_backoff_secs: default_backoff_secs(),
            max_backoff_secs: default_max_backoff_secs(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_secs() -> u64 {
    60
}
fn default_max_backoff_secs() -> u64 {
    300
}

/// `[storage]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file path. Defaults to `<config dir>/secfeed.db` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// `[sinks]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SinksConfig {
    /// Telegram Bot API sink.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Discord webhook sink.
    #[serde(default)]
    pub discord: DiscordConfig,

    /// Additional generic JSON webhooks.
    #[serde(default)]
    pub webhooks: Vec<WebhookEntry>,
}

/// `[sinks.telegram]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Whether the Telegram sink is registered.
    #[serde(default)]
    pub enabled: bool,

    /// Bot API base URL (override for testing).
    #[serde(default = "default_telegram_api")]
    pub api_base: String,

    /// Name of the env var holding the bot token.
    #[serde(default = "default_telegram_token_env")]
    pub bot_token_env: String,

    /// Target chat: a numeric id or an `@channelname`. Not a secret.
    #[serde(default)]
    pub chat_id: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base: default_telegram_api(),
            bot_token_env: default_telegram_token_env(),
            chat_id: String::new(),
        }
    }
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".into()
}

fn default_telegram_token_env() -> String {
    "TELEGRAM_TOKEN".into()
}

/// `[sinks.discord]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Whether the Discord sink is registered.
    #[serde(default)]
    pub enabled: bool,

    /// Name of the env var holding the webhook URL (it embeds a secret).
    #[serde(default = "default_discord_webhook_env")]
    pub webhook_url_env: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url_env: default_discord_webhook_env(),
        }
    }
}

fn default_discord_webhook_env() -> String {
    "DISCORD_WEBHOOK_URL".into()
}

/// `[[sinks.webhooks]]` entry. Webhook URLs here are treated as non-secret;
/// use the Discord sink pattern for URLs that embed tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEntry {
    /// Sink name used in logs and delivery reports.
    pub name: String,
    /// POST target.
    pub url: String,
}

fn default_curated() -> Vec<CuratedSnippet> {
    vec![CuratedSnippet {
        title: "Simple Port Scanner".into(),
        code: "import socket\n\
               def scan_port(ip, port):\n    \
               sock = socket.socket(socket.AF_INET, socket.SOCK_STREAM)\n    \
               sock.settimeout(1)\n    \
               result = sock.connect_ex((ip, port))\n    \
               sock.close()\n    \
               return port if result == 0 else None\n"
            .into(),
    }]
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.secfeed/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SecfeedError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.secfeed/secfeed.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Resolve the database file path from config, falling back to the default
/// location under the config directory.
pub fn database_path(config: &AppConfig) -> Result<PathBuf> {
    match &config.storage.path {
        Some(path) => Ok(PathBuf::from(path)),
        None => Ok(config_dir()?.join(DB_FILE_NAME)),
    }
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SecfeedError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| SecfeedError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SecfeedError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SecfeedError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SecfeedError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read a required environment variable by name.
pub fn resolve_env(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(SecfeedError::config(format!(
            "required environment variable {var_name} is not set"
        ))),
    }
}

/// Check that every env var the configured sources and sinks need is set.
/// Run before any network command so missing credentials fail fast instead
/// of mid-cycle.
pub fn validate_env(config: &AppConfig) -> Result<()> {
    let var_name = &config.github.token_env;
    if std::env::var(var_name).map_or(true, |v| v.is_empty()) {
        return Err(SecfeedError::config(format!(
            "GitHub token not found. Set the {var_name} environment variable.\n\
             Create one at https://github.com/settings/tokens"
        )));
    }

    let var_name = &config.websearch.api_key_env;
    if std::env::var(var_name).map_or(true, |v| v.is_empty()) {
        return Err(SecfeedError::config(format!(
            "web-search API key not found. Set the {var_name} environment variable."
        )));
    }

    if config.sinks.telegram.enabled {
        let var_name = &config.sinks.telegram.bot_token_env;
        if std::env::var(var_name).map_or(true, |v| v.is_empty()) {
            return Err(SecfeedError::config(format!(
                "Telegram sink enabled but bot token not found. \
                 Set the {var_name} environment variable."
            )));
        }
        if config.sinks.telegram.chat_id.is_empty() {
            return Err(SecfeedError::config(
                "Telegram sink enabled but sinks.telegram.chat_id is empty",
            ));
        }
    }

    if config.sinks.discord.enabled {
        let var_name = &config.sinks.discord.webhook_url_env;
        if std::env::var(var_name).map_or(true, |v| v.is_empty()) {
            return Err(SecfeedError::config(format!(
                "Discord sink enabled but webhook URL not found. \
                 Set the {var_name} environment variable."
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("penetration testing tools"));
        assert!(toml_str.contains("GITHUB_TOKEN"));
        assert!(toml_str.contains("SERPAPI_KEY"));
        assert!(toml_str.contains("Simple Port Scanner"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.collect.max_results, 10);
        assert_eq!(parsed.collect.interval_secs, 3600);
        assert_eq!(parsed.retry.max_attempts, 3);
        assert_eq!(parsed.retry.default_backoff_secs, 60);
        assert_eq!(parsed.github.api_url, "https://api.github.com");
        assert_eq!(parsed.curated.len(), 1);
    }

    #[test]
    fn config_with_sinks() {
        let toml_str = r#"
[collect]
queries = ["nmap cheat sheet"]

[sinks.telegram]
enabled = true
chat_id = "@secfeed"

[[sinks.webhooks]]
name = "ops"
url = "https://hooks.example.com/secfeed"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.collect.queries, vec!["nmap cheat sheet"]);
        assert!(config.sinks.telegram.enabled);
        assert_eq!(config.sinks.telegram.chat_id, "@secfeed");
        assert_eq!(config.sinks.webhooks.len(), 1);
        assert_eq!(config.sinks.webhooks[0].name, "ops");
        // Unset sections keep their defaults.
        assert_eq!(config.collect.max_results, 10);
        assert!(!config.sinks.discord.enabled);
    }

    #[test]
    fn env_validation_reports_missing_token() {
        let mut config = AppConfig::default();
        // Use unique env var names to avoid interfering with other tests
        config.github.token_env = "SECFEED_TEST_NONEXISTENT_GH_12345".into();
        let result = validate_env(&config);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("SECFEED_TEST_NONEXISTENT_GH_12345")
        );
    }

    #[test]
    fn env_validation_checks_enabled_sinks_only() {
        let mut config = AppConfig::default();
        config.github.token_env = "SECFEED_TEST_GH_SET".into();
        config.websearch.api_key_env = "SECFEED_TEST_KEY_SET".into();
        config.sinks.telegram.bot_token_env = "SECFEED_TEST_TG_UNSET_12345".into();

        // SAFETY: test-only env mutation, unique names per test binary.
        unsafe {
            std::env::set_var("SECFEED_TEST_GH_SET", "gh-token");
            std::env::set_var("SECFEED_TEST_KEY_SET", "search-key");
        }

        // Disabled sink: its missing token is not an error.
        assert!(validate_env(&config).is_ok());

        config.sinks.telegram.enabled = true;
        config.sinks.telegram.chat_id = "@chan".into();
        let result = validate_env(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Telegram"));
    }

    #[test]
    fn interval_conversion() {
        let mut collect = CollectConfig::default();
        collect.interval_secs = 90;
        assert_eq!(collect.interval(), std::time::Duration::from_secs(90));
    }
}
