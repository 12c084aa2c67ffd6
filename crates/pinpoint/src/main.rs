use anyhow::{Context, Result, bail};
use clap::{Args as ClapArgs, Parser, Subcommand};
use pinpoint_engine::config::{ConfigLoader, PinpointConfig};
use pinpoint_engine::{CandidateCache, DiscoveryCatalog, ResolverBuilder};
use pinpoint_snapshot::HtmlSnapshot;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pinpoint", version, about = "Resolve element descriptions against saved pages")]
struct Args {
    /// Config file (defaults to ./pinpoint.yaml, then ~/.pinpoint/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs)]
struct PageArgs {
    /// Saved HTML of the page
    #[arg(long)]
    html: PathBuf,

    /// Address the page was loaded from
    #[arg(long)]
    url: String,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a description to one element
    Resolve {
        #[command(flatten)]
        page: PageArgs,

        /// Natural-language description, e.g. "email field"
        description: String,

        /// Skip candidates whose text contains this
        #[arg(long)]
        exclude: Option<String>,

        #[arg(long)]
        timeout_ms: Option<u64>,

        #[arg(long)]
        attempts: Option<u32>,
    },
    /// Inspect or maintain the candidate cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Build or query the page discovery catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    Stats,
    /// Collapse duplicate records
    Dedupe,
    /// Remove every record, in memory and on disk
    Clear,
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Sweep a page and record its interactive elements
    Discover {
        #[command(flatten)]
        page: PageArgs,

        /// Re-sweep even if the page is already catalogued
        #[arg(long)]
        force: bool,
    },
    /// Find a catalogued element by description
    Find {
        #[command(flatten)]
        page: PageArgs,

        description: String,
    },
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries JSON results
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref()).await?;

    match args.command {
        Command::Resolve {
            page,
            description,
            exclude,
            timeout_ms,
            attempts,
        } => {
            let snapshot = load_page(&page).await?;
            let timeout_ms = timeout_ms.unwrap_or(config.resolver.default_timeout_ms);
            let attempts = attempts.unwrap_or(config.resolver.max_attempts);

            let mut resolver = ResolverBuilder::new()
                .provider(snapshot)
                .config(config)
                .build()
                .await?;
            let resolution = match exclude {
                Some(exclusion) => {
                    resolver
                        .resolve_excluding(&description, &exclusion, timeout_ms, attempts)
                        .await?
                }
                None => resolver.resolve(&description, timeout_ms, attempts).await?,
            };
            resolver
                .flush_cache_to_disk()
                .await
                .context("failed to save cache")?;

            print_json(&json!({
                "resolution": resolution,
                "stats": resolver.performance_stats(),
            }))?;
        }
        Command::Cache { action } => {
            let mut cache = CandidateCache::open(&config.cache).await;
            match action {
                CacheAction::Stats => print_json(&json!({
                    "dir": cache.dir(),
                    "pages": cache.page_patterns(),
                    "stats": cache.stats(),
                }))?,
                CacheAction::Dedupe => {
                    let removed = cache.deduplicate().await?;
                    print_json(&json!({ "removed": removed }))?;
                }
                CacheAction::Clear => {
                    let records = cache.len();
                    cache.clear().await?;
                    info!(records, "cache cleared");
                    print_json(&json!({ "cleared": records }))?;
                }
            }
        }
        Command::Catalog { action } => {
            if !config.discovery.enabled {
                bail!("discovery is disabled in the configuration");
            }
            let mut catalog = DiscoveryCatalog::open(&config.discovery).await;
            match action {
                CatalogAction::Discover { page, force } => {
                    let snapshot = load_page(&page).await?;
                    let discovered = catalog.discover(&snapshot, force).await?;
                    let elements = catalog.page(&page.url).map(|p| p.len()).unwrap_or(0);
                    print_json(&json!({
                        "discovered": discovered,
                        "elements": elements,
                    }))?;
                }
                CatalogAction::Find { page, description } => {
                    let snapshot = load_page(&page).await?;
                    let found = catalog.find_by_description(&snapshot, &description).await?;
                    print_json(&json!({ "match": found }))?;
                }
                CatalogAction::Stats => print_json(&json!(catalog.statistics()))?,
            }
        }
    }

    Ok(())
}

async fn load_config(path: Option<&Path>) -> Result<PinpointConfig> {
    let config = match path {
        Some(path) => ConfigLoader::load_from(path)
            .await
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ConfigLoader::load_default().await?,
    };
    Ok(config)
}

async fn load_page(page: &PageArgs) -> Result<HtmlSnapshot> {
    let html = tokio::fs::read_to_string(&page.html)
        .await
        .with_context(|| format!("failed to read {}", page.html.display()))?;
    Ok(HtmlSnapshot::parse(&page.url, &html))
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
