use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use nodesync::app::{self, events::WatchEvent};
use nodesync::config::{self, registry, subscription, Settings};

#[derive(Parser, Debug)]
#[command(name = "nodesync", version, about = "Sync subscription nodes into a Clash router")]
struct Cli {
    /// Settings file (YAML)
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse links and print the node records as JSON
    Parse {
        /// Link file, defaults to nodes.path
        file: Option<PathBuf>,
        /// Fetch and parse a subscription URL instead
        #[arg(long)]
        url: Option<String>,
    },
    /// Validate a node-list file
    Validate { file: Option<PathBuf> },
    /// Merge the node file into the router configuration once
    Sync { file: Option<PathBuf> },
    /// Add one proxy to a named group
    AddToGroup { group: String, proxy: String },
    /// Watch the node file until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => config::load_settings(&path.to_string_lossy())?,
        None => Settings::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log.level)),
        )
        .init();

    match cli.command {
        Command::Parse { file, url } => parse(&settings, file, url).await,
        Command::Validate { file } => validate(&settings, file).await,
        Command::Sync { file } => {
            let sync = app::build_synchronizer(&settings)?;
            let path = file.unwrap_or_else(|| PathBuf::from(&settings.nodes.path));
            let report = sync.sync_file(&path).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::AddToGroup { group, proxy } => {
            let sync = app::build_synchronizer(&settings)?;
            if sync.add_to_group(&group, &proxy).await? {
                println!("added {} to {}", proxy, group);
            } else {
                println!("{} already in {}", proxy, group);
            }
            Ok(())
        }
        Command::Watch => watch(&settings).await,
    }
}

async fn parse(settings: &Settings, file: Option<PathBuf>, url: Option<String>) -> Result<()> {
    let report = match url {
        Some(url) => nodesync::api::fetch_subscription(&url).await?,
        None => {
            let path = file.unwrap_or_else(|| PathBuf::from(&settings.nodes.path));
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("read {}", path.display()))?;
            subscription::parse_links(&content)
        }
    };
    if report.skipped > 0 {
        warn!(skipped = report.skipped, "some links could not be parsed");
    }
    info!(nodes = report.nodes.len(), "links parsed");
    println!("{}", serde_json::to_string_pretty(&report.nodes)?);
    Ok(())
}

async fn validate(settings: &Settings, file: Option<PathBuf>) -> Result<()> {
    let path = file.unwrap_or_else(|| PathBuf::from(&settings.nodes.path));
    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("read {}", path.display()))?;

    let result = registry::validate_node_file(&content);
    let stats = registry::type_stats(&registry::parse_node_content(&content));
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "valid": result.valid,
            "errors": result.errors,
            "stats": stats,
        }))?
    );
    if !result.valid {
        anyhow::bail!("{} is not a valid node file", path.display());
    }
    Ok(())
}

async fn watch(settings: &Settings) -> Result<()> {
    let watcher = app::build_watcher(settings)?;
    watcher.subscribe(|event| match event {
        WatchEvent::UpdateFailed { error: e } | WatchEvent::Error { message: e } => {
            error!(event = event.name(), error = %e, "watcher event")
        }
        _ => info!(event = event.name(), "watcher event"),
    });

    let handle = watcher.start();
    tokio::signal::ctrl_c().await?;
    info!("interrupt received, stopping");
    watcher.stop();
    if let Some(handle) = handle {
        let _ = handle.await;
    }
    Ok(())
}
