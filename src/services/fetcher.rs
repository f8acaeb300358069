use crate::error::{NormalizerError, Result};
use crate::types::{DocumentMetadata, DocumentSource, SourceType};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};
use url::Url;
use walkdir::WalkDir;

const DOCUMENT_EXTENSIONS: [&str; 3] = ["md", "markdown", "txt"];

/// Resolves CLI inputs into documents and loads their text.
pub struct ContentFetcher;

impl ContentFetcher {
    pub async fn fetch_content(source: &DocumentSource) -> Result<(String, DocumentMetadata)> {
        let content = match source.source_type {
            SourceType::Url => Self::download(&source.location).await?,
            SourceType::LocalFile => Self::read_local(&source.location).await?,
        };

        let metadata = DocumentMetadata::new(source, &content);
        debug!("Loaded '{}' ({} lines)", metadata.name, metadata.total_lines);

        Ok((content, metadata))
    }

    async fn download(location: &str) -> Result<String> {
        info!("Downloading {}", location);

        let response = reqwest::get(location).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NormalizerError::HttpStatus {
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }

    async fn read_local(location: &str) -> Result<String> {
        info!("Reading {}", location);

        tokio::fs::read_to_string(location).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => NormalizerError::FileNotFound {
                path: location.to_string(),
            },
            _ => NormalizerError::Io(e),
        })
    }

    fn is_document(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| DOCUMENT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    fn resolve_url(location: &str) -> Result<DocumentSource> {
        let url = Url::parse(location)?;
        let name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .unwrap_or("downloaded.md")
            .to_string();

        Ok(DocumentSource {
            location: location.to_string(),
            name,
            source_type: SourceType::Url,
        })
    }

    fn resolve_file(path: &Path) -> Result<DocumentSource> {
        if !Self::is_document(path) {
            return Err(NormalizerError::InvalidSource {
                reason: format!(
                    "{} is not a document (expected one of: {})",
                    path.display(),
                    DOCUMENT_EXTENSIONS.join(", ")
                ),
            });
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document.md");

        Ok(DocumentSource::local(&path.display().to_string(), name))
    }

    /// Documents under `root`, named by their path relative to it so that
    /// `a/report.md` and `b/report.md` stay distinct.
    fn resolve_directory(root: &Path) -> Result<Vec<DocumentSource>> {
        let mut found = Vec::new();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| NormalizerError::Io(e.into()))?;
            if !entry.file_type().is_file() || !Self::is_document(entry.path()) {
                continue;
            }

            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            found.push(DocumentSource::local(&entry.path().display().to_string(), &name));
        }

        debug!("Expanded directory {} into {} documents", root.display(), found.len());
        Ok(found)
    }

    /// Checks every input, expands directories, and rejects runs where two
    /// documents would share a name (and therefore an output file).
    pub async fn validate_sources(sources: &[String]) -> Result<Vec<DocumentSource>> {
        let mut resolved = Vec::new();

        for source in sources {
            if source.starts_with("http://") || source.starts_with("https://") {
                resolved.push(Self::resolve_url(source)?);
                continue;
            }

            let path = Path::new(source);
            if path.is_file() {
                resolved.push(Self::resolve_file(path)?);
            } else if path.is_dir() {
                resolved.extend(Self::resolve_directory(path)?);
            } else {
                return Err(NormalizerError::FileNotFound {
                    path: source.clone(),
                });
            }
        }

        let mut seen = HashSet::new();
        for source in &resolved {
            if !seen.insert(source.name.as_str()) {
                return Err(NormalizerError::InvalidSource {
                    reason: format!(
                        "More than one input resolves to the document name '{}'",
                        source.name
                    ),
                });
            }
        }

        Ok(resolved)
    }
}
