use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "doc-norm")]
#[command(about = "Clean PDF-extracted markdown and split it into heading-keyed chunks")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output directory for exported files
    #[arg(short, long, global = true, default_value = "./output")]
    pub output: PathBuf,

    /// Normalizer configuration file (JSON)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the cleaning rules and write the normalized markdown
    Clean(CleanArgs),

    /// Clean documents and export their chunks
    Chunk(ChunkArgs),

    /// Report what the cleaning rules and splitter do to each document
    Analyze(AnalyzeArgs),

    /// Validate input sources
    Validate(ValidateArgs),
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Jsonl,
}

#[derive(Args)]
pub struct CleanArgs {
    /// Input sources (file paths, directories or URLs)
    #[arg(required = true, value_name = "SOURCE")]
    pub sources: Vec<String>,

    /// Print the cleaned markdown instead of writing files
    #[arg(long)]
    pub stdout: bool,

    /// Force overwrite existing output files
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ChunkArgs {
    /// Input sources (file paths, directories or URLs)
    #[arg(required = true, value_name = "SOURCE")]
    pub sources: Vec<String>,

    /// Chunk file format
    #[arg(long, value_enum, default_value = "jsonl")]
    pub format: OutputFormat,

    /// Also write the cleaned markdown next to the chunks
    #[arg(long)]
    pub write_cleaned: bool,

    /// Include a per-document report file
    #[arg(long, default_value = "true")]
    pub include_report: bool,

    /// Force overwrite existing output files
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Input sources (file paths, directories or URLs)
    #[arg(required = true, value_name = "SOURCE")]
    pub sources: Vec<String>,

    /// Output analysis to JSON file
    #[arg(long, value_name = "FILE")]
    pub json_output: Option<PathBuf>,

    /// Show per-rule and per-chunk details
    #[arg(long)]
    pub detailed: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Input sources (file paths, directories or URLs)
    #[arg(required = true, value_name = "SOURCE")]
    pub sources: Vec<String>,

    /// Check if sources are accessible
    #[arg(long)]
    pub check_access: bool,
}
