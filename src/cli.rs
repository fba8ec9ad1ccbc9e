//! Command-line interface.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::ingest::IngestLimits;
use crate::pipeline::GenerationMode;

#[derive(Parser, Debug)]
#[command(name = "news-pipeline", version, about)]
pub struct Cli {
    /// Path to config.toml (defaults to the user config directory)
    #[arg(short, long, env = "NEWS_PIPELINE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape the kontan.co.id index and store new articles.
    Scrape {
        /// Index date to scrape, YYYY-MM-DD (defaults to today in UTC+7)
        #[arg(long)]
        date: Option<NaiveDate>,

        #[command(flatten)]
        limits: LimitArgs,
    },
    /// Generate video scripts from pending financial articles.
    Generate(ModeArgs),
    /// Send pending scripts to the schedule store.
    Dispatch,
    /// Scrape, generate and dispatch in one run.
    Workflow {
        #[command(flatten)]
        limits: LimitArgs,

        #[command(flatten)]
        mode: ModeArgs,
    },
    /// Print article and script counts by status.
    Stats,
    /// Serve the HTTP trigger API.
    Serve {
        /// Address to bind, overriding `listen_addr`
        #[arg(long)]
        listen: Option<String>,
    },
}

#[derive(Args, Debug, Clone, Copy, Default)]
pub struct LimitArgs {
    /// Stop after this many index pages
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// Stop after storing this many articles
    #[arg(long)]
    pub max_articles: Option<usize>,
}

impl From<LimitArgs> for IngestLimits {
    fn from(args: LimitArgs) -> Self {
        IngestLimits {
            max_pages: args.max_pages,
            max_articles: args.max_articles,
        }
    }
}

#[derive(Args, Debug, Clone, Copy, Default)]
pub struct ModeArgs {
    /// One AI call over all filtered articles instead of one per article
    #[arg(long)]
    pub batch: bool,
}

impl ModeArgs {
    /// `--batch` forces batch mode; otherwise the configured default applies.
    pub fn resolve(self, default: GenerationMode) -> GenerationMode {
        if self.batch {
            GenerationMode::Batch
        } else {
            default
        }
    }
}
