use std::process::ExitCode;

use clap::Parser;

mod ai;
mod app;
mod cli;
mod clock;
mod config;
mod db;
mod error;
mod filter;
mod ingest;
mod models;
mod pipeline;
mod server;
mod services;
#[cfg(test)]
mod testing;

use app::App;
use cli::{Cli, Command};
use config::Config;
use error::Result;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}

/// Execute one subcommand; `Ok(false)` means it ran but did not succeed.
async fn run(cli: Cli) -> Result<bool> {
    let config = Config::load(cli.config.as_deref())?;
    let app = App::new(&config).await?;
    let pipeline = app.pipeline.clone();

    match cli.command {
        Command::Scrape { date, limits } => {
            let report = match date {
                Some(date) => pipeline.scrape_date(date, limits.into()).await?,
                None => pipeline.scrape(limits.into()).await?,
            };
            println!(
                "Stored {} articles ({} duplicates, {} too short, {} failed) from {} pages",
                report.stored, report.duplicates, report.too_short, report.failed, report.pages
            );
        }
        Command::Generate(mode) => {
            let report = pipeline.generate(mode.resolve(pipeline.default_mode())).await?;
            println!(
                "Generated {} scripts from {} articles ({} fallbacks, {} failed, {} marked processed)",
                report.artifact_ids.len(),
                report.considered,
                report.fallbacks,
                report.failed,
                report.marked_processed
            );
        }
        Command::Dispatch => {
            let report = pipeline.dispatch().await?;
            println!("Sent {} scripts, {} failed", report.sent, report.failed);
        }
        Command::Workflow { limits, mode } => {
            let summary = pipeline
                .run(limits.into(), mode.resolve(pipeline.default_mode()))
                .await?;
            println!(
                "Scraped {}, generated {}, sent {}, failed {}",
                summary.scraped, summary.generated, summary.sent, summary.failed
            );
            return Ok(summary.success);
        }
        Command::Stats => {
            let stats = pipeline.stats().await?;
            println!("News:");
            for row in &stats.news {
                println!("  {:<18} {}", row.status, row.total);
            }
            println!("Scripts:");
            for row in &stats.artifacts {
                println!("  {:<18} {}", row.status, row.total);
            }
        }
        Command::Serve { listen } => {
            let addr = listen.unwrap_or(app.listen_addr);
            server::serve(pipeline, &addr).await?;
        }
    }

    Ok(true)
}
