//! # seoscope CLI
//!
//! Command-line front end for the analyzer.
//!
//! - `analyze <URL>`: score a single page and ask the language model for
//!   improved title, meta description and H1
//! - `analyze <URL> --crawl-site`: analyze every page listed in the site's
//!   sitemaps
//!
//! The response is printed to stdout as JSON. The exit status is non-zero when
//! the response is an error. Ctrl-C cancels an in-flight site crawl; pages that
//! were not finished are reported as errors.

mod telemetry;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use seoscope::analyzer::{AnalyzeRequest, Analyzer};
use seoscope::cache::JsonFileCacheStore;
use seoscope::config::AnalyzerConfig;
use seoscope::model::gemini_from_config;
use seoscope::site::SiteCrawlConfig;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

#[derive(Parser)]
#[command(author, version, about = "Rule-based SEO analysis with LLM suggestions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a page, or a whole site through its sitemaps
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// URL to analyze. `https://` is assumed when no scheme is given.
    #[arg(required = true)]
    url: String,

    /// Analyze every page listed in the site's sitemaps
    #[arg(long)]
    crawl_site: bool,

    /// Regenerate suggestions even when a fresh cached result exists
    #[arg(long)]
    force_llm: bool,

    /// Maximum number of pages to analyze in a site crawl
    #[arg(short = 'p', long, default_value = "500")]
    max_pages: usize,

    /// Pages analyzed concurrently in a site crawl
    #[arg(short, long, default_value = "4")]
    concurrency: usize,

    /// Also generate suggestions for every page of a site crawl
    #[arg(long)]
    with_suggestions: bool,

    /// Suggestion cache file
    #[arg(long, default_value = ".seoscope/suggestions.json")]
    cache_file: PathBuf,

    /// Print compact JSON instead of pretty-printed JSON
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let _otel = telemetry::init_tracing_subscriber()?;

    match cli.command {
        Commands::Analyze(args) => analyze_command(args).await,
    }
}

#[instrument]
async fn analyze_command(args: AnalyzeArgs) -> anyhow::Result<ExitCode> {
    let config = AnalyzerConfig::from_env()?;
    let model = gemini_from_config(&config)?;

    let site_config = SiteCrawlConfig::builder()
        .max_pages(args.max_pages)
        .concurrency(args.concurrency)
        .with_suggestions(args.with_suggestions)
        .build();

    let analyzer = Analyzer::new(config, model, JsonFileCacheStore::new(&args.cache_file))?
        .with_site_config(site_config);

    let token = CancellationToken::new();
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            ctrl_c_token.cancel();
        }
    });

    let request = AnalyzeRequest {
        url: args.url,
        crawl_site: args.crawl_site,
        force_llm: args.force_llm,
    };
    let response = analyzer.handle(&request, &token).await;

    let json = if args.compact {
        serde_json::to_string(&response)?
    } else {
        serde_json::to_string_pretty(&response)?
    };
    println!("{}", json);

    if response.is_error() {
        info!("Analysis finished with an error");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
