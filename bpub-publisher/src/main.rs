//! bpub - blog publisher CLI
//!
//! Publishes TOML job files into the blog editor through a WebDriver
//! session, or rehearses them against the scripted driver (`--dry-run`).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bpub_common::config::{ConfigResolver, TomlConfig};
use bpub_common::{Clock, ManualClock, SystemClock};
use bpub_publisher::batch;
use bpub_publisher::driver::{
    DriverFactory, ScriptedDriver, ScriptedDriverFactory, WebDriverFactory,
};
use bpub_publisher::job;
use bpub_publisher::models::{PublishOutcome, PublishRequest};
use bpub_publisher::parser;
use bpub_publisher::services::PublishCoordinator;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Command-line arguments for bpub
#[derive(Parser, Debug)]
#[command(name = "bpub")]
#[command(about = "Publish generated copy into a browser-only blog editor")]
#[command(version)]
struct Args {
    /// Config file (overrides BPUB_CONFIG and ~/.config/bpub/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Publish one or more job files
    Publish {
        /// Job file (repeatable)
        #[arg(short, long = "job", required = true)]
        jobs: Vec<PathBuf>,

        /// Attempts run at the same time, one browser each
        #[arg(long, default_value = "1", env = "BPUB_CONCURRENCY")]
        concurrency: usize,

        /// Rehearse against the scripted driver without a browser
        #[arg(long)]
        dry_run: bool,
    },
    /// Parse a content file and print its blocks as JSON
    Parse {
        #[arg(long)]
        content: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolver = ConfigResolver::new(args.config.clone());
    let config = resolver.load().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        "Starting bpub v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match resolver.resolve() {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: compiled defaults"),
    }

    match args.command {
        Command::Parse { content } => {
            let text = std::fs::read_to_string(&content)
                .with_context(|| format!("Failed to read {}", content.display()))?;
            let blocks = parser::parse(&text);
            info!(
                blocks = blocks.len(),
                images = parser::image_marker_count(&blocks),
                "Parsed content"
            );
            println!("{}", serde_json::to_string_pretty(&blocks)?);
            Ok(())
        }
        Command::Publish {
            jobs,
            concurrency,
            dry_run,
        } => publish(&config, &jobs, concurrency, dry_run).await,
    }
}

async fn publish(
    config: &TomlConfig,
    jobs: &[PathBuf],
    concurrency: usize,
    dry_run: bool,
) -> Result<()> {
    let requests = jobs
        .iter()
        .map(|path| {
            job::load_job(path).with_context(|| format!("Failed to load job {}", path.display()))
        })
        .collect::<Result<Vec<PublishRequest>>>()?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping before the next block");
            interrupt.cancel();
        }
    });

    let outcomes = if dry_run {
        info!("Dry run: rehearsing against the scripted editor");
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::starting_now());
        let factory = ScriptedDriverFactory::new(ScriptedDriver::rehearsal(&config.editor));
        let outcomes =
            run_jobs(factory.clone(), config, clock, &requests, concurrency, &cancel).await;
        for (index, actions) in factory.logs().iter().enumerate() {
            info!(job = index, actions = actions.len(), "Rehearsed driver actions");
        }
        outcomes
    } else {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let factory = WebDriverFactory::new(config.webdriver.clone(), clock.clone());
        run_jobs(factory, config, clock, &requests, concurrency, &cancel).await
    };

    let mut failed = 0;
    for (path, outcome) in jobs.iter().zip(&outcomes) {
        if !outcome.success {
            failed += 1;
        }
        tracing::debug!(job = %path.display(), outcome = ?outcome, "Job outcome");
        println!("{}", serde_json::to_string(&outcome.to_response())?);
    }

    if failed > 0 {
        bail!("{} of {} jobs failed", failed, outcomes.len());
    }
    Ok(())
}

async fn run_jobs<F: DriverFactory>(
    factory: F,
    config: &TomlConfig,
    clock: Arc<dyn Clock>,
    requests: &[PublishRequest],
    concurrency: usize,
    cancel: &CancellationToken,
) -> Vec<PublishOutcome> {
    let coordinator = PublishCoordinator::new(
        factory,
        config.editor.clone(),
        config.timing.clone(),
        clock,
    );
    batch::publish_all(&coordinator, requests, concurrency, cancel).await
}
