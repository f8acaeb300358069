use crate::error::{NormalizerError, Result};
use crate::types::{ChunkRecord, ExportConfig, ExportFormat, ExportResult, NormalizedDocument};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Writes normalized documents out for the storage collaborator to pick up.
pub struct ChunkExporter;

impl ChunkExporter {
    pub async fn export_document(
        document: &NormalizedDocument,
        config: &ExportConfig,
    ) -> Result<ExportResult> {
        info!(
            "Exporting {} chunks for '{}'",
            document.chunks.len(),
            document.source
        );

        Self::ensure_output_directory(&config.output_dir).await?;

        let created_at = chrono::Utc::now().to_rfc3339();
        let records = Self::to_records(document, &created_at);

        let chunk_file = Self::output_path(
            &config.output_dir,
            &document.metadata.name,
            Self::chunk_file_suffix(config.format),
        );
        let body = Self::render_records(&records, config.format)?;
        Self::write_file(&chunk_file, body).await?;
        debug!("Wrote {} records to {}", records.len(), chunk_file.display());

        let cleaned_file = if config.write_cleaned {
            let path = Self::output_path(&config.output_dir, &document.metadata.name, "cleaned.md");
            Self::write_file(&path, document.cleaned.clone()).await?;
            Some(path)
        } else {
            None
        };

        let report_file = if config.include_report {
            let path = Self::output_path(&config.output_dir, &document.metadata.name, "report.json");
            let json = serde_json::to_string_pretty(&document.report)?;
            Self::write_file(&path, json).await?;
            Some(path)
        } else {
            None
        };

        Ok(ExportResult {
            chunk_file,
            cleaned_file,
            report_file,
            records_written: records.len(),
        })
    }

    pub fn to_records(document: &NormalizedDocument, created_at: &str) -> Vec<ChunkRecord> {
        document
            .chunks
            .iter()
            .map(|chunk| ChunkRecord::from_chunk(&document.source, chunk, created_at))
            .collect()
    }

    /// JSON Lines keeps one record per line in chunk order.
    pub fn render_records(records: &[ChunkRecord], format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(records)?),
            ExportFormat::JsonLines => {
                let mut out = String::new();
                for record in records {
                    out.push_str(&serde_json::to_string(record)?);
                    out.push('\n');
                }
                Ok(out)
            }
        }
    }

    /// Fails when the directory already holds files, unless `force` is set.
    pub fn check_output_directory(output_dir: &Path, force: bool) -> Result<()> {
        if !output_dir.exists() || force {
            return Ok(());
        }

        let entries = std::fs::read_dir(output_dir).map_err(|e| NormalizerError::OutputDirectory {
            reason: format!("Cannot read output directory: {}", e),
        })?;

        if entries.count() > 0 {
            return Err(NormalizerError::OutputDirectory {
                reason: "Output directory is not empty. Use --force to overwrite.".to_string(),
            });
        }

        Ok(())
    }

    async fn ensure_output_directory(output_dir: &Path) -> Result<()> {
        if !output_dir.exists() {
            fs::create_dir_all(output_dir).await.map_err(|e| {
                NormalizerError::OutputDirectory {
                    reason: format!("Failed to create output directory: {}", e),
                }
            })?;
            info!("Created output directory: {}", output_dir.display());
        }
        Ok(())
    }

    /// Flattens a document name into a file prefix: `a/report.md` becomes
    /// `a__report`, so documents with the same stem in different
    /// directories never share an output file.
    pub fn file_prefix(document_name: &str) -> String {
        let path = Path::new(document_name);
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document");

        let mut parts: Vec<String> = path
            .parent()
            .map(|parent| {
                parent
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        parts.push(stem.to_string());
        parts.join("__")
    }

    pub fn output_path(output_dir: &Path, document_name: &str, suffix: &str) -> PathBuf {
        output_dir.join(format!("{}_{}", Self::file_prefix(document_name), suffix))
    }

    fn chunk_file_suffix(format: ExportFormat) -> &'static str {
        match format {
            ExportFormat::Json => "chunks.json",
            ExportFormat::JsonLines => "chunks.jsonl",
        }
    }

    async fn write_file(path: &Path, content: String) -> Result<()> {
        fs::write(path, content).await.map_err(|e| NormalizerError::OutputDirectory {
            reason: format!("Failed to write {}: {}", path.display(), e),
        })
    }
}
