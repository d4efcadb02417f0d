//! Gauntlet: an S3 compatibility test runner.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use gauntlet_client::S3StorageClient;
use gauntlet_core::{LogFormat, RunConfig, TestId};
use gauntlet_harness::{Scheduler, Selection, TestRegistry};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod cli;
mod render;

use cli::{Cli, Commands, ListArgs, OutputFormat, RunArgs, SelectArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::List(args) => list(&args),
        Commands::Version => {
            println!("gauntlet {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn selection(args: &SelectArgs) -> Selection {
    Selection {
        categories: args.categories.clone(),
        ids: args.tests.iter().map(|id| TestId::from(id.as_str())).collect(),
        id_prefix: args.prefix.clone(),
    }
}

fn build_registry() -> TestRegistry {
    let mut registry = TestRegistry::new();
    gauntlet_suite::register_all(&mut registry);
    registry
}

async fn run(args: RunArgs) -> Result<()> {
    let mut config =
        RunConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // CLI flags win over config file and environment.
    if let Some(concurrency) = args.concurrency {
        config.scheduler.concurrency = concurrency;
    }
    if let Some(timeout_secs) = args.timeout_secs {
        config.scheduler.per_test_timeout_ms = timeout_secs.saturating_mul(1000);
    }
    if let Some(endpoint) = &args.endpoint {
        config.endpoint.url = endpoint.clone();
    }
    if let Some(access_key) = &args.access_key {
        config.endpoint.access_key = access_key.clone();
    }
    if let Some(secret_key) = &args.secret_key {
        config.endpoint.secret_key = secret_key.clone();
    }

    init_logging(&config)?;

    let registry = build_registry();
    let cases = registry.filter(&selection(&args.select));
    if cases.is_empty() {
        anyhow::bail!("no tests match the given selection");
    }
    info!(
        selected = cases.len(),
        registered = registry.len(),
        endpoint = %config.endpoint.url,
        "starting compatibility run"
    );

    let client = Arc::new(S3StorageClient::new(&config));
    let scheduler = Scheduler::new(config, client);

    // Operator interrupt stops dispatch and lets in-flight tests reach
    // their cleanup point.
    let shutdown = scheduler.shutdown_handle();
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("interrupt received, cancelling run");
        shutdown.shutdown();
    });

    let report = scheduler.run(cases).await.context("Run aborted before dispatch")?;

    match args.format {
        OutputFormat::Text => println!("{}", render::render_text(&report)),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        ),
    }

    if let Some(path) = &args.report {
        let json =
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "report written");
    }

    if !report.success() {
        std::process::exit(1);
    }
    Ok(())
}

fn list(args: &ListArgs) -> Result<()> {
    let registry = build_registry();
    let cases = registry.filter(&selection(&args.select));

    match args.format {
        OutputFormat::Text => {
            for case in &cases {
                println!("{} ({})", case.id, case.category);
            }
            println!("{} tests", cases.len());
        }
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = cases
                .iter()
                .map(|case| {
                    serde_json::json!({
                        "id": case.id.as_str(),
                        "category": case.category.as_str(),
                        "slow": case.slow,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }
    Ok(())
}

fn init_logging(config: &RunConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry().with(filter).with(fmt_layer.json()).init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry().with(filter).with(fmt_layer).init();
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}
