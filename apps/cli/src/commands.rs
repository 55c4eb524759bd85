//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use secfeed_core::{CollectPlan, Collector, CycleObserver, lookup, run_scheduled};
use secfeed_distributor::{DiscordSink, Distributor, Sink, TelegramSink, WebhookSink};
use secfeed_shared::{
    AppConfig, CycleSummary, ResourceKind, SourceTag, database_path, init_config, load_config,
    load_config_from, resolve_env, validate_env,
};
use secfeed_sources::{GithubClient, RetryPolicy, ScrapeClient, WebSearchClient};
use secfeed_storage::{DEFAULT_QUERY_LIMIT, ResourceQuery, Store};
use tokio::sync::watch;
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// secfeed: collect security knowledge and fan it out to subscriber channels.
#[derive(Parser)]
#[command(
    name = "secfeed",
    version,
    about = "Collect security resources from GitHub, web search, and cheat-sheet pages, then store and distribute them.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file path (defaults to the per-user config directory).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run one collection cycle: fetch, validate, store, distribute.
    Run,

    /// Keep collecting on the configured interval until Ctrl-C.
    Watch,

    /// Search stored resources.
    Query {
        /// Filter by kind: repository, search_result, command, or code.
        #[arg(short, long)]
        kind: Option<String>,

        /// Filter by source: GitHub, WebSearch, Scraper, or Curated.
        #[arg(short, long)]
        source: Option<String>,

        /// Substring to match in title or description.
        #[arg(short, long)]
        text: Option<String>,

        /// Maximum number of results.
        #[arg(short, long, default_value_t = DEFAULT_QUERY_LIMIT)]
        limit: u32,
    },

    /// Look up stored knowledge, with a canned fallback when nothing matches.
    Lookup {
        /// What to look up.
        #[command(subcommand)]
        action: LookupAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Lookup subcommands.
#[derive(Subcommand)]
pub(crate) enum LookupAction {
    /// Describe a security tool.
    Tool {
        /// Tool name.
        #[arg(default_value = "nmap")]
        name: String,
    },
    /// Show a collected command for a tool.
    Command {
        /// Tool name.
        #[arg(default_value = "metasploit")]
        name: String,
    },
    /// Show a stored code snippet.
    Code {
        /// Topic to search for.
        #[arg(default_value = "port_scanner")]
        topic: String,
    },
    /// Show tabletop exercise material.
    Exercise,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Run => cmd_run(config_path.as_deref()).await,
        Command::Watch => cmd_watch(config_path.as_deref()).await,
        Command::Query {
            kind,
            source,
            text,
            limit,
        } => cmd_query(config_path.as_deref(), kind.as_deref(), source.as_deref(), text, limit).await,
        Command::Lookup { action } => cmd_lookup(config_path.as_deref(), action).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path.as_deref()).await,
        },
    }
}

fn load_cli_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Collector wiring
// ---------------------------------------------------------------------------

/// Assemble a [`Collector`] from config: source clients, store, and sinks.
async fn build_collector(
    config: &AppConfig,
    shutdown: Option<watch::Receiver<bool>>,
) -> Result<Collector> {
    let policy = RetryPolicy::from(&config.retry);

    let github_token = resolve_env(&config.github.token_env)?;
    let github = GithubClient::new(
        &config.github.api_url,
        github_token,
        config.collect.max_results,
        policy.clone(),
    )?;

    let search_key = resolve_env(&config.websearch.api_key_env)?;
    let websearch = WebSearchClient::new(
        &config.websearch.endpoint,
        search_key,
        config.collect.max_results,
        policy.clone(),
    )?;

    let scraper = ScrapeClient::new(policy)?;

    let mut sinks: Vec<Box<dyn Sink>> = Vec::new();
    if config.sinks.telegram.enabled {
        let token = resolve_env(&config.sinks.telegram.bot_token_env)?;
        sinks.push(Box::new(TelegramSink::new(
            &config.sinks.telegram.api_base,
            token,
            &config.sinks.telegram.chat_id,
        )?));
    }
    if config.sinks.discord.enabled {
        let webhook_url = resolve_env(&config.sinks.discord.webhook_url_env)?;
        sinks.push(Box::new(DiscordSink::new(webhook_url)?));
    }
    for hook in &config.sinks.webhooks {
        sinks.push(Box::new(WebhookSink::new(&hook.name, &hook.url)?));
    }
    if sinks.is_empty() {
        info!("no sinks enabled, collected resources will only be stored");
    }

    let store = Store::open(&database_path(config)?).await?;

    let mut collector = Collector::new(
        CollectPlan::from_config(config),
        store,
        Distributor::new(sinks),
    )
    .with_query_client(Box::new(github))
    .with_query_client(Box::new(websearch))
    .with_target_client(Box::new(scraper));

    if let Some(rx) = shutdown {
        collector = collector.with_shutdown(rx);
    }

    Ok(collector)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config_path: Option<&Path>) -> Result<()> {
    let config = load_cli_config(config_path)?;
    validate_env(&config)?;

    info!("starting collection cycle");

    let collector = build_collector(&config, None).await?;
    let reporter = CliProgress::new();
    let summary = collector.run_cycle(&reporter).await;
    reporter.finish();

    let total = collector.store().count().await.unwrap_or(0);
    collector.store().close();

    println!();
    println!("  Collection cycle complete!");
    println!("  Collected:  {}", summary.collected);
    println!("  Rejected:   {}", summary.rejected);
    println!("  Duplicates: {}", summary.duplicates);
    println!(
        "  Stored:     {} ({} failed)",
        summary.stored, summary.store_failures
    );
    println!(
        "  Delivered:  {} ({} failed)",
        summary.delivered, summary.delivery_failures
    );
    println!("  In store:   {total}");
    println!("  Time:       {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_watch(config_path: Option<&Path>) -> Result<()> {
    let config = load_cli_config(config_path)?;
    validate_env(&config)?;

    let (tx, rx) = watch::channel(false);
    let collector = build_collector(&config, Some(rx.clone())).await?;

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, finishing the current cycle");
            let _ = tx.send(true);
        }
    });

    println!(
        "Collecting every {}s. Press Ctrl-C to stop.",
        config.collect.interval_secs
    );

    let reporter = CliProgress::new();
    let cycles = run_scheduled(&collector, config.collect.interval(), rx, &reporter).await;
    reporter.finish();
    collector.store().close();

    println!("Stopped after {cycles} cycles.");
    Ok(())
}

async fn cmd_query(
    config_path: Option<&Path>,
    kind: Option<&str>,
    source: Option<&str>,
    text: Option<String>,
    limit: u32,
) -> Result<()> {
    let config = load_cli_config(config_path)?;

    let query = ResourceQuery {
        kind: kind
            .map(|k| k.parse::<ResourceKind>())
            .transpose()
            .map_err(|e| eyre!(e))?,
        source: source
            .map(|s| s.parse::<SourceTag>())
            .transpose()
            .map_err(|e| eyre!(e))?,
        text,
        limit: Some(limit),
    };

    let store = Store::open(&database_path(&config)?).await?;
    let hits = store.query(&query).await?;
    store.close();

    if hits.is_empty() {
        println!("No matching resources.");
        return Ok(());
    }

    for hit in &hits {
        println!(
            "{}  [{}] {} ({})",
            hit.saved_at.format("%Y-%m-%d %H:%M"),
            hit.kind,
            hit.title,
            hit.source
        );
        println!("    {}", preview(&hit.description, 100));
        println!("    {}", hit.url);
    }
    println!();
    println!("{} resource(s)", hits.len());

    Ok(())
}

async fn cmd_lookup(config_path: Option<&Path>, action: LookupAction) -> Result<()> {
    let config = load_cli_config(config_path)?;
    let store = Store::open(&database_path(&config)?).await?;

    let reply = match action {
        LookupAction::Tool { name } => lookup::tool(&store, &name).await,
        LookupAction::Command { name } => lookup::command(&store, &name).await,
        LookupAction::Code { topic } => lookup::code(&store, &topic).await,
        LookupAction::Exercise => lookup::exercise(&store).await,
    };
    store.close();

    println!("{reply}");
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load_cli_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

/// One-line preview: whitespace collapsed, long text truncated.
fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Cycle observer driving an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl CycleObserver for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn source_fetched(&self, source: &str, target: &str, count: usize) {
        self.spinner
            .set_message(format!("Collecting [{source}] {target}: {count} found"));
    }

    fn done(&self, summary: &CycleSummary) {
        if summary.skipped {
            self.spinner
                .println("  cycle skipped: previous cycle still running");
        } else {
            self.spinner.println(format!(
                "  {} collected, {} stored, {} delivered in {:.1}s",
                summary.collected,
                summary.stored,
                summary.delivered,
                summary.elapsed.as_secs_f64()
            ));
        }
        // Keep the spinner alive for the next scheduled cycle.
        self.spinner.set_message("Waiting for next cycle");
    }
}
