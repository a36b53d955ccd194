use std::path::{Path, PathBuf};
use ualr_rag::cli::{Cli, Commands, ConfigAction};
use ualr_rag::config::{expand_path, Config, ConfigValidator};
use ualr_rag::embedding::create_provider;
use ualr_rag::error::{RagError, Result};
use ualr_rag::indexer::{load_corpus, IndexBuilder};
use ualr_rag::retrieval::{render_context, RetrievalService, Retriever};

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    // Handle commands
    match cli.command {
        Commands::Query {
            query,
            k,
            json,
            context,
            profile,
        } => {
            cmd_query(cli.config, &query, k, json, context, profile)?;
        }
        Commands::Build {
            corpus,
            index_out,
            metadata_out,
        } => {
            cmd_build(cli.config, &corpus, index_out, metadata_out)?;
        }
        Commands::Verify => {
            cmd_verify(cli.config)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "ualr_rag=debug" } else { "ualr_rag=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // stdout carries query results
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_query(
    config_path: Option<PathBuf>,
    query: &str,
    k: Option<usize>,
    json: bool,
    context: bool,
    profile: Option<String>,
) -> Result<()> {
    let config = load_config(config_path, profile)?;
    let k = k.unwrap_or(config.retrieval.default_k);

    let rt = tokio::runtime::Runtime::new().map_err(|e| RagError::Io {
        source: e,
        context: "Failed to create tokio runtime".to_string(),
    })?;

    let service = RetrievalService::from_config(config);
    let documents = rt.block_on(service.retrieve(query, k))?;

    if json {
        let out = serde_json::to_string_pretty(&documents).map_err(|e| RagError::Json {
            source: e,
            context: "Failed to serialize results".to_string(),
        })?;
        println!("{}", out);
        return Ok(());
    }

    if context {
        println!("{}", render_context(&documents));
        return Ok(());
    }

    if documents.is_empty() {
        println!("No documents in the corpus");
        return Ok(());
    }

    for (rank, document) in documents.iter().enumerate() {
        println!("{}. [{}] score {:.4}", rank + 1, document.id, document.score);
        if let Some(source) = document
            .metadata
            .get("source")
            .or_else(|| document.metadata.get("url"))
        {
            println!("   source: {}", source);
        }
        println!("   {}", document.content);
    }

    Ok(())
}

fn cmd_build(
    config_path: Option<PathBuf>,
    corpus: &Path,
    index_out: Option<PathBuf>,
    metadata_out: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path, None)?;
    let index_path = expand_path(&index_out.unwrap_or(config.artifacts.index_path))?;
    let metadata_path = expand_path(&metadata_out.unwrap_or(config.artifacts.metadata_path))?;

    let documents = load_corpus(corpus)?;
    tracing::info!("Loaded {} documents from {}", documents.len(), corpus.display());

    let provider = create_provider(&config.embedding)?;
    let builder = IndexBuilder::new(provider, config.embedding.batch_size);
    let summary = builder.write(documents, &index_path, &metadata_path)?;

    println!("✓ Built {} documents", summary.documents);
    println!("  Build id:  {}", summary.build_id);
    println!("  Model:     {} ({}D)", summary.embedding_model, summary.dimension);
    println!("  Index:     {}", index_path.display());
    println!("  Metadata:  {}", metadata_path.display());
    println!("  Took:      {}ms in {} batches", summary.duration_ms, summary.batches);

    Ok(())
}

fn cmd_verify(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path, None)?;
    let retriever = Retriever::load(&config)?;

    println!("✓ Artifacts are consistent");
    println!("  Documents: {}", retriever.len());
    println!("  Dimension: {}", retriever.dimension());
    println!("  Backend:   {}", retriever.backend());
    println!("  Model:     {}", retriever.model_name());

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path, None)?;
            let json = serde_json::to_string_pretty(&config).map_err(|e| RagError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
            println!("  Provider:       {}", config.embedding.provider);
            println!("  Backend:        {}", config.retrieval.backend);
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

            // Create parent directory
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| RagError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            let config = Config::default();
            config.save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
            println!("  Artifacts expected in: {}", Config::default_data_dir()?.display());
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
            "Config file not found, using defaults. Run 'ualr-rag config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        if let Some(profile) = profile {
            config.apply_profile(&profile)?;
        }
        ConfigValidator::validate(&config)?;
        return Ok(config);
    }

    if let Some(profile) = profile {
        Config::load_with_profile(&path, &profile)
    } else {
        Config::load(&path)
    }
}
