mod cli;

use geoscout::{
    catalog::{collect_resource_urls, CatalogStore, CatalogSummary},
    config::{self, Config},
    crawler::TreeCrawler,
    enrichment::{EnrichmentPipeline, PipelineOptions},
    extract::{self, DuckDbExtractor},
    publish::{CatalogPublisher, StacPublisher},
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "geoscout=debug,geoscout_common=debug".to_string()
        } else {
            "geoscout=info,geoscout_common=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Crawl {
            root_url,
            extension,
            catalog,
            force,
        } => {
            let mut config = config::load_config_or_default(cli.config.as_deref())?;
            if let Some(root_url) = root_url {
                config.crawl.root_url = root_url;
            }
            if let Some(extension) = extension {
                config.crawl.extension = extension;
            }
            override_catalog(&mut config, catalog);
            config::validate_config(&config)?;

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(crawl(&config, force))
        }
        Commands::Enrich { catalog, limit } => {
            let mut config = config::load_config_or_default(cli.config.as_deref())?;
            override_catalog(&mut config, catalog);
            override_limit(&mut config, limit);
            config::validate_config(&config)?;

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(enrich(&config))
        }
        Commands::Run { limit } => {
            let mut config = config::load_config_or_default(cli.config.as_deref())?;
            override_limit(&mut config, limit);
            config::validate_config(&config)?;

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(async {
                crawl(&config, false).await?;
                enrich(&config).await
            })
        }
        Commands::Status { catalog } => {
            let mut config = config::load_config_or_default(cli.config.as_deref())?;
            override_catalog(&mut config, catalog);
            status(&config.catalog.path)
        }
        Commands::Publish { catalog, output } => {
            let mut config = config::load_config_or_default(cli.config.as_deref())?;
            override_catalog(&mut config, catalog);
            if let Some(output) = output {
                config.publish.output_dir = output;
            }
            config::validate_config(&config)?;
            publish(&config)
        }
        Commands::CheckTools => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            check_tools(&config)
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("geoscout {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn override_catalog(config: &mut Config, catalog: Option<PathBuf>) {
    if let Some(path) = catalog {
        config.catalog.path = path;
    }
}

fn override_limit(config: &mut Config, limit: Option<usize>) {
    if limit.is_some() {
        config.enrich.limit = limit;
    }
}

async fn crawl(config: &Config, force: bool) -> Result<()> {
    let store = CatalogStore::new(&config.catalog.path);
    if store.exists() && !force {
        println!(
            "Catalog already exists at {}; skipping crawl (use --force to overwrite)",
            store.path().display()
        );
        return Ok(());
    }

    let crawler = TreeCrawler::from_config(&config.crawl);
    let catalog = crawler
        .crawl_to_store(&config.crawl.root_url, &store)
        .await
        .with_context(|| format!("Failed to crawl {}", config.crawl.root_url))?;

    println!(
        "Crawled {} files into {}",
        catalog.file_count(),
        store.path().display()
    );
    Ok(())
}

async fn enrich(config: &Config) -> Result<()> {
    let store = Arc::new(CatalogStore::new(&config.catalog.path));
    let mut catalog = store
        .load()
        .with_context(|| format!("Failed to load catalog {}", store.path().display()))?;

    let extractor = DuckDbExtractor::from_config(&config.extract)
        .context("Metadata extraction needs the duckdb CLI (see `geoscout check-tools`)")?;

    let pipeline = EnrichmentPipeline::new(
        Arc::new(extractor),
        store.clone(),
        PipelineOptions::from(&config.enrich),
    );

    let urls = collect_resource_urls(&catalog);
    let report = pipeline.run(&mut catalog, &urls).await?;
    let summary = CatalogSummary::of(&catalog);

    tracing::info!(
        complete = summary.complete,
        incomplete = summary.incomplete,
        total = summary.total,
        "Catalog status"
    );
    println!("Run: {}", report);
    println!("Catalog: {}", summary);
    Ok(())
}

fn status(path: &Path) -> Result<()> {
    let catalog = CatalogStore::new(path)
        .load()
        .with_context(|| format!("Failed to load catalog {}", path.display()))?;

    let summary = CatalogSummary::of(&catalog);
    println!("Catalog: {}", path.display());
    println!("  Complete:   {}", summary.complete);
    println!("  Incomplete: {}", summary.incomplete);
    println!("  Total:      {}", summary.total);
    Ok(())
}

fn publish(config: &Config) -> Result<()> {
    let catalog = CatalogStore::new(&config.catalog.path)
        .load()
        .with_context(|| format!("Failed to load catalog {}", config.catalog.path.display()))?;

    let publisher = StacPublisher::from_config(&config.publish)?;
    let report = publisher.publish(&catalog)?;

    println!(
        "Published {} to {}",
        report,
        publisher.output_dir().display()
    );
    Ok(())
}

fn check_tools(config: &Config) -> Result<()> {
    println!("Checking external tools...\n");

    let tools = extract::check_tools(&config.extract);
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Metadata extraction will not run without them.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Root URL: {}", config.crawl.root_url);
    println!("  Extension: {}", config.crawl.extension);
    println!("  Max concurrency: {}", config.crawl.max_concurrency);
    println!("  Catalog: {}", config.catalog.path.display());
    match config.enrich.limit {
        Some(limit) => println!("  Limit: {}", limit),
        None => println!("  Limit: unbounded"),
    }
    println!("  STAC output: {}", config.publish.output_dir.display());

    Ok(())
}
