//! wenc - world encyclopedia aggregator
//!
//! `wenc lookup <QUERY>` prints one merged topic and `wenc random` picks an
//! article for you. `wenc serve` runs the JSON HTTP API; `wenc countries`
//! lists the names the country heuristic knows.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wenc_agg::analysis::country_names;
use wenc_agg::orchestrator::Orchestrator;
use wenc_agg::render;
use wenc_agg::sources::ReqwestFetcher;
use wenc_agg::types::TopicOutcome;
use wenc_agg::{build_router, AppState};
use wenc_common::config::ConfigOverrides;
use wenc_common::{Clock, SystemClock, WencConfig};

/// Command-line arguments for wenc
#[derive(Parser, Debug)]
#[command(name = "wenc")]
#[command(about = "Aggregate encyclopedia, knowledge-graph, country, weather and media data around one topic")]
#[command(version)]
struct Args {
    /// TOML config file (default: <config dir>/wenc/config.toml if present)
    #[arg(short, long, global = true, env = "WENC_CONFIG")]
    config: Option<PathBuf>,

    /// Lifetime of cached upstream responses, in seconds
    #[arg(long, global = true)]
    cache_ttl_secs: Option<u64>,

    /// Timeout for each upstream call, in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Maximum number of knowledge-graph relations
    #[arg(long, global = true)]
    max_relations: Option<usize>,

    /// Maximum number of images
    #[arg(long, global = true)]
    max_images: Option<usize>,

    /// Maximum number of linked pages checked for coordinates (0 disables)
    #[arg(long, global = true)]
    max_geo_mentions: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up one topic and print it
    Lookup {
        /// Free-text topic, e.g. "Brazil" or "Albert Einstein"
        query: String,

        #[command(flatten)]
        view: ViewArgs,
    },
    /// Print the title of a random article
    Random {
        /// Look the article up instead of printing its title
        #[arg(long)]
        lookup: bool,

        #[command(flatten)]
        view: ViewArgs,
    },
    /// List the country names recognised in queries
    Countries,
    /// Run the HTTP API
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "5780", env = "WENC_PORT")]
        port: u16,
    },
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct ViewArgs {
    /// Print the merged record as JSON
    #[arg(long, conflicts_with_all = ["graph", "geojson"])]
    json: bool,

    /// Print the relationship graph, with the wider neighbourhood, in Graphviz DOT
    #[arg(long, conflicts_with = "geojson")]
    graph: bool,

    /// Print the topic and its geographic mentions as GeoJSON
    #[arg(long)]
    geojson: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let overrides = ConfigOverrides {
        cache_ttl_secs: args.cache_ttl_secs,
        request_timeout_secs: args.timeout_secs,
        max_relations: args.max_relations,
        max_images: args.max_images,
        max_geo_mentions: args.max_geo_mentions,
    };
    let config = WencConfig::load(args.config.as_deref(), &overrides)
        .context("Failed to load configuration")?;

    // Initialize tracing; RUST_LOG wins over the configured level
    let level = config.logging.level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("wenc={level},wenc_agg={level},tower_http={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match args.command {
        Command::Countries => {
            for name in country_names() {
                println!("{name}");
            }
            Ok(())
        }
        Command::Lookup { query, view } => {
            let orchestrator = orchestrator(&config, Arc::new(SystemClock))?;
            lookup(&orchestrator, &query, view).await
        }
        Command::Random { lookup: false, .. } => {
            let orchestrator = orchestrator(&config, Arc::new(SystemClock))?;
            println!("{}", random_title(&orchestrator).await?);
            Ok(())
        }
        Command::Random { lookup: true, view } => {
            let orchestrator = orchestrator(&config, Arc::new(SystemClock))?;
            let title = random_title(&orchestrator).await?;
            info!(title = %title, "Random article");
            lookup(&orchestrator, &title, view).await
        }
        Command::Serve { port } => serve(&config, port).await,
    }
}

fn orchestrator(config: &WencConfig, clock: Arc<dyn Clock>) -> Result<Orchestrator> {
    let transport = ReqwestFetcher::new(config).context("Failed to initialize HTTP client")?;
    Ok(Orchestrator::new(config, Arc::new(transport), clock))
}

async fn random_title(orchestrator: &Orchestrator) -> Result<String> {
    orchestrator
        .random_title()
        .await
        .context("Cannot fetch a random article")?
        .context("Encyclopedia returned no random article")
}

async fn lookup(orchestrator: &Orchestrator, query: &str, view: ViewArgs) -> Result<()> {
    let outcome = orchestrator
        .resolve_topic(query)
        .await
        .with_context(|| format!("Cannot look up {query:?}"))?;

    if view.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("Failed to serialize topic")?
        );
        return Ok(());
    }

    match outcome {
        TopicOutcome::Found { record } if view.graph => {
            let neighbourhood = orchestrator.neighbourhood(&record).await;
            if let Some(failure) = &neighbourhood.failure {
                warn!(failure = %failure, "Graph drawn without the wider neighbourhood");
            }
            print!("{}", render::relation_graph_dot(&record, &neighbourhood.edges));
        }
        TopicOutcome::Found { record } if view.geojson => println!(
            "{}",
            serde_json::to_string_pretty(&render::geo_mentions_geojson(&record))
                .context("Failed to serialize GeoJSON")?
        ),
        TopicOutcome::Found { record } => print!("{}", render::text_view(&record)),
        TopicOutcome::NoResults => println!("No results for {query:?}"),
        TopicOutcome::Unavailable { failure } => {
            anyhow::bail!("Encyclopedia search unavailable: {failure}")
        }
    }
    Ok(())
}

async fn serve(config: &WencConfig, port: u16) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = AppState::new(orchestrator(config, clock.clone())?, clock);
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
