//! Citeflow command-line entrypoint.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use tokio::signal;

use citeflow::config::PipelineConfig;
use citeflow::export::{export_all, export_scored, load_input};
use citeflow::nli::{NliClassifier, NliConfig};
use citeflow::phases::{run_articles, run_citations, run_crossref, run_scoring};
use citeflow::pipeline::{PipelineContext, PipelineError, RunSummary};
use citeflow::ReqwestFetcher;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser, Debug)]
#[command(name = "citeflow")]
#[command(about = "Citation harvesting, Crossref enrichment and NLI scoring")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Harvest citing DOIs from each article's cited-by export
    Citations,
    /// Scrape each article page for its DOI and publication date
    Articles,
    /// Resolve citing DOIs through Crossref
    Crossref,
    /// Write the CSV tables and the unified archive
    Export,
    /// Score unified rows with the NLI model and write the scored table
    Score,
    /// Run every step in order
    All,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = PipelineConfig::from_env()?;
    config.validate()?;

    tracing::info!(
        command = ?cli.command,
        input = %config.input_csv.display(),
        cache_dir = %config.cache_dir.display(),
        output_dir = %config.output_dir.display(),
        "Citeflow starting"
    );

    let fetcher = Arc::new(ReqwestFetcher::new(&config.user_agent)?);
    let mut ctx = PipelineContext::new(config.clone(), fetcher);

    if matches!(cli.command, Command::Score | Command::All) {
        let Some(model_path) = config.model_path.clone() else {
            return Err(PipelineError::ClassifierUnavailable.into());
        };
        ctx = ctx.with_classifier(Arc::new(NliClassifier::load(NliConfig::new(model_path))?));
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    ctx = ctx.with_shutdown_flag(Arc::clone(&shutdown));
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.store(true, Ordering::Release);
    });

    let summary = run(cli.command, &ctx).await?;

    tracing::info!(
        completed = summary.completed,
        failed = summary.failed_terminal,
        unresolved = summary.unresolved,
        abandoned = summary.abandoned,
        skipped = summary.skipped,
        interrupted = summary.interrupted,
        "Citeflow finished"
    );
    Ok(())
}

async fn run(command: Command, ctx: &PipelineContext) -> anyhow::Result<RunSummary> {
    let config = &ctx.config;
    let needs_input = matches!(
        command,
        Command::Citations | Command::Articles | Command::Export | Command::All
    );
    let input = if needs_input {
        load_input(&config.input_csv)?
    } else {
        Vec::new()
    };

    let mut total = RunSummary::default();
    let steps: &[Command] = match command {
        Command::All => &[
            Command::Citations,
            Command::Articles,
            Command::Crossref,
            Command::Export,
            Command::Score,
        ],
        _ => std::slice::from_ref(&command),
    };

    for step in steps {
        if ctx.is_shutdown_requested() {
            tracing::warn!(step = ?step, "Shutdown requested, skipping remaining steps");
            break;
        }

        match step {
            Command::Citations => total.absorb(&run_citations(ctx, &input).await?),
            Command::Articles => total.absorb(&run_articles(ctx, &input).await?),
            Command::Crossref => total.absorb(&run_crossref(ctx).await?),
            Command::Export => {
                export_all(config, &input)?;
            }
            Command::Score => {
                total.absorb(&run_scoring(ctx).await?);
                let (rows, unscored) = export_scored(config)?;
                tracing::info!(rows, unscored, "Wrote scored table");
            }
            Command::All => {}
        }
    }
    Ok(total)
}

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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, finishing in-flight work");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, finishing in-flight work");
        }
    }
}
