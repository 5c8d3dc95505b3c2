use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "geoscout")]
#[command(author, version, about = "Geospatial file discovery and metadata enrichment")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Crawl the remote listing tree and write a fresh catalog
    Crawl {
        /// Listing URL to start from
        #[arg(long)]
        root_url: Option<String>,

        /// File extension to keep (e.g. parquet)
        #[arg(long)]
        extension: Option<String>,

        /// Catalog file to write
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Overwrite an existing catalog
        #[arg(long)]
        force: bool,
    },

    /// Extract metadata for incomplete catalog items
    Enrich {
        /// Catalog file to enrich
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Maximum number of items to process in this run
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Crawl if no catalog exists yet, then enrich
    Run {
        /// Maximum number of items to process in this run
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show how many catalog items are complete
    Status {
        /// Catalog file to inspect
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Publish the enriched catalog as STAC
    Publish {
        /// Catalog file to publish
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Directory to write the STAC catalog to
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
