mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{AnalyzeArgs, ChunkArgs, CleanArgs, Cli, Commands, OutputFormat, ValidateArgs};
use doc_normalizer::{
    ChunkExporter, ContentFetcher, DocumentNormalizer, ExportConfig, ExportFormat, ExportResult,
    NormalizerConfig, NormalizerError, Result,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_level.to_string())),
        )
        .with_target(false)
        .init();

    let config = load_config(cli.config.as_deref())
        .await
        .context("Failed to load normalizer configuration")?;

    let result = match &cli.command {
        Commands::Clean(args) => handle_clean_command(args, &cli.output, &config).await,
        Commands::Chunk(args) => handle_chunk_command(args, &cli.output, &config).await,
        Commands::Analyze(args) => handle_analyze_command(args, &config).await,
        Commands::Validate(args) => handle_validate_command(args).await,
    };

    if let Err(e) = result {
        error!("Operation failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn load_config(path: Option<&Path>) -> Result<NormalizerConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            let json = tokio::fs::read_to_string(path).await?;
            NormalizerConfig::from_json(&json)
        }
        None => Ok(NormalizerConfig::default()),
    }
}

async fn handle_clean_command(
    args: &CleanArgs,
    output_dir: &PathBuf,
    config: &NormalizerConfig,
) -> Result<()> {
    info!("Cleaning {} sources", args.sources.len());

    let sources = ContentFetcher::validate_sources(&args.sources).await?;
    let normalizer = DocumentNormalizer::new(config)?;

    if !args.stdout {
        ChunkExporter::check_output_directory(output_dir, args.force)?;
        tokio::fs::create_dir_all(output_dir).await?;
    }

    for source in &sources {
        let (content, metadata) = ContentFetcher::fetch_content(source).await?;
        let cleaned = normalizer.pipeline().clean(&content);

        if args.stdout {
            println!("{}", cleaned);
            continue;
        }

        let path = ChunkExporter::output_path(output_dir, &metadata.name, "cleaned.md");
        tokio::fs::write(&path, cleaned).await?;
        info!("  - {}", path.display());
    }

    Ok(())
}

/// Documents are independent, so each one runs on its own task against a
/// shared normalizer.
async fn handle_chunk_command(
    args: &ChunkArgs,
    output_dir: &PathBuf,
    config: &NormalizerConfig,
) -> Result<()> {
    info!("Starting chunk operation with {} sources", args.sources.len());

    let sources = ContentFetcher::validate_sources(&args.sources).await?;
    info!("Validated {} sources", sources.len());

    ChunkExporter::check_output_directory(output_dir, args.force)?;

    let normalizer = Arc::new(DocumentNormalizer::new(config)?);
    let export_config = Arc::new(ExportConfig {
        output_dir: output_dir.clone(),
        format: match args.format {
            OutputFormat::Json => ExportFormat::Json,
            OutputFormat::Jsonl => ExportFormat::JsonLines,
        },
        write_cleaned: args.write_cleaned,
        include_report: args.include_report,
    });

    let mut tasks = Vec::with_capacity(sources.len());
    for source in sources {
        let normalizer = Arc::clone(&normalizer);
        let export_config = Arc::clone(&export_config);

        tasks.push(tokio::spawn(async move {
            let (content, metadata) = ContentFetcher::fetch_content(&source).await?;
            let document = normalizer.normalize(&content, metadata);
            ChunkExporter::export_document(&document, &export_config).await
        }));
    }

    let exports = await_exports(tasks).await?;

    let mut total_records = 0;
    for export in &exports {
        total_records += export.records_written;
        info!(
            "  - {} ({} chunks)",
            export.chunk_file.display(),
            export.records_written
        );
        if let Some(cleaned) = &export.cleaned_file {
            info!("  - {} (cleaned)", cleaned.display());
        }
        if let Some(report) = &export.report_file {
            info!("  - {} (report)", report.display());
        }
    }

    info!("Chunk operation completed: {} records written", total_records);
    Ok(())
}

/// Waits for every export task, even after one has failed, so nothing is
/// still writing when the command returns. The first failure is returned.
async fn await_exports(tasks: Vec<JoinHandle<Result<ExportResult>>>) -> Result<Vec<ExportResult>> {
    let mut exports = Vec::with_capacity(tasks.len());
    let mut first_error = None;

    for task in tasks {
        let outcome = task
            .await
            .map_err(|e| NormalizerError::Anyhow(anyhow::anyhow!("Task did not complete: {}", e)))
            .and_then(|result| result);

        match outcome {
            Ok(export) => exports.push(export),
            Err(e) => {
                error!("Chunk task failed: {}", e);
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(exports),
    }
}

async fn handle_analyze_command(args: &AnalyzeArgs, config: &NormalizerConfig) -> Result<()> {
    info!("Starting analysis of {} sources", args.sources.len());

    let sources = ContentFetcher::validate_sources(&args.sources).await?;
    let normalizer = DocumentNormalizer::new(config)?;

    let mut all_reports = HashMap::new();

    for source in sources {
        info!("Analyzing: {}", source.location);

        let (content, metadata) = ContentFetcher::fetch_content(&source).await?;
        let document = normalizer.normalize(&content, metadata);
        let report = &document.report;

        println!("\n=== Analysis for '{}' ===", document.source);
        println!("Source type: {:?}", document.metadata.source_type);
        println!("Pages: {}", report.pages);
        println!("Characters: {} -> {}", report.input_chars, report.output_chars);
        println!("Chunks: {}", report.total_chunks);
        println!("Preamble chunks: {}", report.preamble_chunks);
        println!("Empty chunks: {}", report.empty_chunks);

        println!("\nChunks per top-level section:");
        for (section, count) in &report.chunks_per_section {
            println!("  {}: {}", section, count);
        }

        if args.detailed {
            println!("\nRules:");
            for trace in &report.rules {
                println!(
                    "  {}: {} -> {} chars{}",
                    trace.rule,
                    trace.chars_before,
                    trace.chars_after,
                    if trace.changed() { "" } else { " (no change)" }
                );
            }

            println!("\nChunk Details:");
            for chunk in &document.chunks {
                let path = chunk
                    .headings
                    .values()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(" > ");
                println!(
                    "  Chunk {}: [{}] {} chars",
                    chunk.sequence_index,
                    path,
                    chunk.content.chars().count()
                );
            }
        }

        all_reports.insert(source.name.clone(), serde_json::to_value(report)?);
    }

    if let Some(json_path) = &args.json_output {
        let json_content = serde_json::to_string_pretty(&all_reports)
            .context("Failed to serialize analysis results")?;

        tokio::fs::write(json_path, json_content)
            .await
            .context("Failed to write JSON analysis file")?;

        info!("Analysis results written to: {}", json_path.display());
    }

    Ok(())
}

async fn handle_validate_command(args: &ValidateArgs) -> Result<()> {
    info!("Validating {} sources", args.sources.len());

    let mut valid_sources = Vec::new();
    let mut invalid_sources = Vec::new();

    for source in &args.sources {
        match ContentFetcher::validate_sources(&[source.clone()]).await {
            Ok(expanded) => {
                info!("✓ Valid: {} ({} documents)", source, expanded.len());
                valid_sources.push(source);

                if args.check_access {
                    for document in &expanded {
                        match ContentFetcher::fetch_content(document).await {
                            Ok((content, _)) => {
                                info!(
                                    "  {}: {} lines found",
                                    document.location,
                                    content.lines().count()
                                );
                            }
                            Err(e) => {
                                error!("  Cannot access {}: {}", document.location, e);
                                invalid_sources.push((source, format!("Access error: {}", e)));
                            }
                        }
                    }
                }
            }
            Err(e) => {
                error!("✗ Invalid: {} - {}", source, e);
                invalid_sources.push((source, e.to_string()));
            }
        }
    }

    println!("\n=== Validation Summary ===");
    println!("Valid sources: {}/{}", valid_sources.len(), args.sources.len());

    if !invalid_sources.is_empty() {
        println!("Invalid sources:");
        let invalid_count = invalid_sources.len();
        for (source, error) in invalid_sources {
            println!("  - {}: {}", source, error);
        }
        return Err(NormalizerError::InvalidSource {
            reason: format!("{} sources failed validation", invalid_count),
        });
    }

    println!("All sources are valid!");
    Ok(())
}
