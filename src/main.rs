use artscout::agent::Strategy;
use artscout::app;
use artscout::cli::{Cli, Commands, ConfigAction};
use artscout::config::{expand_tilde, Config};
use artscout::embedding::{ClipProvider, EmbeddingProvider};
use artscout::error::{Result, ScoutError};
use artscout::index::IndexHandle;
use artscout::ingest::{catalog_from_file, catalog_from_folder, Ingestor};
use artscout::metadata::normalize_period;
use artscout::retrieval::{SearchHit, SearchOutcome};
use std::path::PathBuf;
use std::sync::Arc;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Index { rebuild, catalog } => {
            let config = load_config(cli.config, cli.profile)?;
            runtime()?.block_on(cmd_index(&config, rebuild, catalog))?;
        }
        Commands::Search {
            query,
            strategy,
            limit,
            json,
        } => {
            let config = load_config(cli.config, cli.profile)?;
            runtime()?.block_on(cmd_search(&config, &query, strategy, limit, json))?;
        }
        Commands::Image {
            source,
            limit,
            json,
        } => {
            let config = load_config(cli.config, cli.profile)?;
            runtime()?.block_on(cmd_image(&config, &source, limit, json))?;
        }
        Commands::Route { query } => {
            let config = load_config(cli.config, cli.profile)?;
            runtime()?.block_on(cmd_route(&config, &query))?;
        }
        Commands::Period { text } => {
            println!("{}", normalize_period(&text));
        }
        Commands::Status => {
            let config = load_config(cli.config, cli.profile)?;
            runtime()?.block_on(cmd_status(&config))?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, cli.profile, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose {
        "artscout=debug"
    } else {
        "artscout=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| ScoutError::Io {
        source: e,
        context: "Failed to create tokio runtime".to_string(),
    })
}

fn embedding_provider(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider = ClipProvider::new(&config.embedding.model)?;

    if provider.dimension() != config.index.vector_dim {
        return Err(ScoutError::InvalidConfigValue {
            path: "index.vector_dim".to_string(),
            message: format!(
                "Model {} produces {}-dimensional vectors, index expects {}",
                provider.model_name(),
                provider.dimension(),
                config.index.vector_dim
            ),
        });
    }

    Ok(Arc::new(provider))
}

async fn cmd_index(config: &Config, rebuild: bool, catalog: Option<PathBuf>) -> Result<()> {
    let entries = match &catalog {
        Some(path) => catalog_from_file(path)?,
        None => catalog_from_folder(&expand_tilde(&config.storage.image_store))?,
    };

    if entries.is_empty() {
        println!("No images to index");
        return Ok(());
    }

    let index = app::open_index(config).await?;
    let provider = embedding_provider(config)?;
    let loader = app::image_loader(config)?;
    let ingestor = Ingestor::new(index, provider, loader, config.embedding.batch_size);

    println!("Indexing {} artworks...", entries.len());
    let report = if rebuild {
        ingestor.rebuild(entries).await?
    } else {
        ingestor.ingest(entries).await?
    };

    println!(
        "✓ Indexed {} artworks ({} skipped) in {}ms",
        report.indexed, report.skipped, report.duration_ms
    );

    Ok(())
}

async fn cmd_search(
    config: &Config,
    query: &str,
    strategy: Option<String>,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let index = app::open_index(config).await?;
    warn_if_empty(&index);

    let searcher = app::searcher(config, index, embedding_provider(config)?)?;

    let mut outcome = match strategy {
        Some(name) => {
            let strategy: Strategy = name
                .parse()
                .map_err(|e| ScoutError::Other(anyhow::Error::new(e)))?;
            searcher.search_with(strategy, query).await
        }
        None => searcher.search(query).await,
    };

    if let Some(limit) = limit {
        outcome.hits.truncate(limit);
    }

    print_outcome(&outcome, json)
}

async fn cmd_image(config: &Config, source: &str, limit: Option<usize>, json: bool) -> Result<()> {
    let index = app::open_index(config).await?;
    warn_if_empty(&index);

    let searcher = app::searcher(config, index, embedding_provider(config)?)?;

    let mut hits = match searcher.search_by_image(source).await {
        Ok(hits) => hits,
        Err(e) => {
            tracing::error!(kind = %e.kind(), error = %e, "Image search failed");
            Vec::new()
        }
    };

    if let Some(limit) = limit {
        hits.truncate(limit);
    }

    if json {
        print_json(&hits)
    } else {
        print_hits(&hits);
        Ok(())
    }
}

async fn cmd_route(config: &Config, query: &str) -> Result<()> {
    let router = app::router(config);

    match router.route(query).await {
        Ok(strategy) => println!("{} ({})", strategy, strategy.tool_name()),
        Err(e) => println!("Routing failed, would fall back to feature: {}", e),
    }

    let extracted = app::extractor(config).extract(query).await;
    match extracted {
        Ok(extracted) if extracted.is_empty() => println!("No metadata constraints"),
        Ok(extracted) => {
            for constraint in extracted.constraints() {
                println!("  {:?}", constraint);
            }
        }
        Err(e) => println!("Metadata extraction failed: {}", e),
    }

    Ok(())
}

async fn cmd_status(config: &Config) -> Result<()> {
    println!("Artscout Status");
    println!("===============");
    println!("\nBackend:    {}", config.index.backend);
    println!("Collection: {}", config.index.collection);
    println!("Model:      {}", config.embedding.model);
    println!(
        "LLM:        {}",
        if config.llm.enabled {
            config.llm.model.as_str()
        } else {
            "disabled (keyword rules)"
        }
    );

    match app::open_index(config).await {
        Ok(index) => {
            let count = index.count().await?;
            println!("\nIndexed artworks: {}", count);
            println!("Ready: {}", if index.is_ready() { "yes" } else { "no" });
        }
        Err(e) => println!("\nIndex unavailable: {}", e),
    }

    Ok(())
}

fn warn_if_empty(index: &IndexHandle) {
    if !index.is_ready() {
        tracing::warn!("Index is empty. Run 'artscout index' first.");
    }
}

fn print_outcome(outcome: &SearchOutcome, json: bool) -> Result<()> {
    if json {
        return print_json(outcome);
    }

    println!("Strategy: {}", outcome.strategy);
    if let Some(failure) = outcome.failure {
        println!("Search failed: {}", failure);
        return Ok(());
    }
    print_hits(&outcome.hits);
    Ok(())
}

fn print_hits(hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("No matching artworks");
        return;
    }

    println!("{} results:", hits.len());
    for (rank, hit) in hits.iter().enumerate() {
        println!("{:>4}. {:.4}  {}", rank + 1, hit.score, hit.path);
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| ScoutError::Json {
        source: e,
        context: "Failed to serialize results".to_string(),
    })?;
    println!("{}", json);
    Ok(())
}

fn cmd_config(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    action: ConfigAction,
) -> Result<()> {
    match action {
        ConfigAction::Show { section } => {
            let config = load_config(config_path, profile)?;
            let value = serde_json::to_value(&config).map_err(|e| ScoutError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;

            let shown = match section {
                Some(section) => value.get(&section).cloned().ok_or_else(|| {
                    ScoutError::Config(format!("Unknown config section: {}", section))
                })?,
                None => value,
            };

            print_json(&shown)?;
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            Config::default().save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>, profile: Option<String>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'artscout config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        return Ok(config);
    }

    if let Some(profile) = profile {
        Config::load_with_profile(&path, &profile)
    } else {
        Config::load(&path)
    }
}
