use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use jobradar_pipeline::{build_orchestrator, build_scheduler, store_from_env, PipelineConfig};
use jobradar_web::AppState;

#[derive(Debug, Parser)]
#[command(name = "jobradar")]
#[command(about = "Job Radar command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one ingestion cycle now and exit.
    Scrape,
    /// Run the interval scheduler and the web API until interrupted.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::from_env();
    let store = store_from_env(&config).await?;
    let orchestrator = Arc::new(build_orchestrator(&config, store.clone())?);

    match cli.command.unwrap_or(Commands::Scrape) {
        Commands::Scrape => {
            let accepted = orchestrator.run_all_sources().await?;
            println!("cycle complete: {} new job(s)", accepted.len());
        }
        Commands::Serve => {
            let scheduler =
                build_scheduler(orchestrator.clone(), config.scrape_interval_hours).await?;
            scheduler.start().await?;
            tracing::info!(
                interval_hours = config.scrape_interval_hours,
                port = config.web_port,
                "scheduler running, web API starting"
            );
            jobradar_web::serve(config.web_port, AppState { store, orchestrator }).await?;
        }
    }

    Ok(())
}
