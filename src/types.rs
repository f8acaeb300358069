use crate::error::{NormalizerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Markdown heading depth handled by the splitter. `H1` is the top level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HeadingLevel {
    #[serde(rename = "Header 1")]
    H1,
    #[serde(rename = "Header 2")]
    H2,
    #[serde(rename = "Header 3")]
    H3,
}

impl HeadingLevel {
    pub fn from_depth(depth: usize) -> Option<Self> {
        match depth {
            1 => Some(Self::H1),
            2 => Some(Self::H2),
            3 => Some(Self::H3),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::H1 => "Header 1",
            Self::H2 => "Header 2",
            Self::H3 => "Header 3",
        }
    }
}

impl fmt::Display for HeadingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Default for HeadingLevel {
    fn default() -> Self {
        Self::H3
    }
}

/// A piece of the document tagged with the headings open where it starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub headings: BTreeMap<HeadingLevel, String>,
    pub content: String,
    pub sequence_index: usize,
}

impl Chunk {
    pub fn heading(&self, level: HeadingLevel) -> Option<&str> {
        self.headings.get(&level).map(String::as_str)
    }

    pub fn is_preamble(&self) -> bool {
        self.headings.is_empty()
    }
}

/// Row handed to the storage collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub source: String,
    pub sequence_index: usize,
    pub headings: BTreeMap<HeadingLevel, String>,
    pub content: String,
    pub created_at: String,
}

impl ChunkRecord {
    pub fn from_chunk(source: &str, chunk: &Chunk, created_at: &str) -> Self {
        Self {
            source: source.to_string(),
            sequence_index: chunk.sequence_index,
            headings: chunk.headings.clone(),
            content: chunk.content.clone(),
            created_at: created_at.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolSubstitution {
    pub from: String,
    pub to: String,
}

impl SymbolSubstitution {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// Glyph table used by Korean public-sector reports.
pub fn default_symbol_table() -> Vec<SymbolSubstitution> {
    vec![
        SymbolSubstitution::new("ㅇ", "- "),
        SymbolSubstitution::new("→", " 에서 "),
        SymbolSubstitution::new("’", "20"),
        SymbolSubstitution::new("☞", "- "),
        SymbolSubstitution::new("*", ""),
        SymbolSubstitution::new("[", ""),
        SymbolSubstitution::new("]", ""),
        SymbolSubstitution::new("▲", ""),
        SymbolSubstitution::new("「", ""),
        SymbolSubstitution::new("」", ""),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub page_marker: String,
    pub error_markers: Vec<String>,
    pub symbol_table: Vec<SymbolSubstitution>,
    pub footnote_scope_open: char,
    pub footnote_scope_close: char,
    pub max_heading_level: HeadingLevel,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            page_marker: "-----".to_string(),
            error_markers: vec!["syntax error".to_string()],
            symbol_table: default_symbol_table(),
            footnote_scope_open: '※',
            footnote_scope_close: '\u{AD}',
            max_heading_level: HeadingLevel::H3,
        }
    }
}

impl NormalizerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_marker.trim().is_empty() {
            return Err(NormalizerError::InvalidConfig {
                reason: "Page marker must not be empty".to_string(),
            });
        }

        if self.error_markers.iter().any(|m| m.is_empty()) {
            return Err(NormalizerError::InvalidConfig {
                reason: "Error markers must not be empty".to_string(),
            });
        }

        if let Some(idx) = self.symbol_table.iter().position(|s| s.from.is_empty()) {
            return Err(NormalizerError::InvalidConfig {
                reason: format!("Symbol table entry {} has an empty source glyph", idx),
            });
        }

        if self.footnote_scope_open == self.footnote_scope_close {
            return Err(NormalizerError::InvalidConfig {
                reason: "Footnote scope markers must differ".to_string(),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    LocalFile,
    Url,
}

/// A resolved input. `name` is unique within one run: files found by walking
/// a directory are named by their path relative to that directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSource {
    pub location: String,
    pub name: String,
    pub source_type: SourceType,
}

impl DocumentSource {
    pub fn local(location: &str, name: &str) -> Self {
        Self {
            location: location.to_string(),
            name: name.to_string(),
            source_type: SourceType::LocalFile,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub name: String,
    pub location: String,
    pub source_type: SourceType,
    pub created_at: String,
    pub total_lines: usize,
}

impl DocumentMetadata {
    pub fn new(source: &DocumentSource, content: &str) -> Self {
        Self {
            name: source.name.clone(),
            location: source.location.clone(),
            source_type: source.source_type,
            created_at: chrono::Utc::now().to_rfc3339(),
            total_lines: content.lines().count(),
        }
    }
}

/// Length of the text before and after one cleaning rule ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleTrace {
    pub rule: String,
    pub chars_before: usize,
    pub chars_after: usize,
}

impl RuleTrace {
    pub fn changed(&self) -> bool {
        self.chars_before != self.chars_after
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineTrace {
    pub rules: Vec<RuleTrace>,
    pub pages_after_footnotes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeReport {
    pub source: String,
    pub input_chars: usize,
    pub output_chars: usize,
    pub pages: usize,
    pub pages_after_footnotes: usize,
    pub rules: Vec<RuleTrace>,
    pub total_chunks: usize,
    pub preamble_chunks: usize,
    pub empty_chunks: usize,
    pub chunks_per_section: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedDocument {
    pub source: String,
    pub metadata: DocumentMetadata,
    pub cleaned: String,
    pub chunks: Vec<Chunk>,
    pub report: NormalizeReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    JsonLines,
}

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    pub format: ExportFormat,
    pub write_cleaned: bool,
    pub include_report: bool,
}

#[derive(Debug, Clone)]
pub struct ExportResult {
    pub chunk_file: PathBuf,
    pub cleaned_file: Option<PathBuf>,
    pub report_file: Option<PathBuf>,
    pub records_written: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_level_ordering() {
        assert!(HeadingLevel::H1 < HeadingLevel::H2);
        assert!(HeadingLevel::H2 < HeadingLevel::H3);
        assert_eq!(HeadingLevel::from_depth(2), Some(HeadingLevel::H2));
        assert_eq!(HeadingLevel::from_depth(4), None);
    }

    #[test]
    fn test_chunk_headings_serialize_with_labels() {
        let mut headings = BTreeMap::new();
        headings.insert(HeadingLevel::H2, "1. 개요".to_string());
        let chunk = Chunk {
            headings,
            content: "본문내용".to_string(),
            sequence_index: 0,
        };

        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["headings"]["Header 2"], "1. 개요");
        assert_eq!(json["content"], "본문내용");
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config = NormalizerConfig::from_json(r#"{"page_marker": "=====" }"#).unwrap();
        assert_eq!(config.page_marker, "=====");
        assert_eq!(config.error_markers, vec!["syntax error".to_string()]);
        assert_eq!(config.symbol_table, default_symbol_table());
        assert_eq!(config.max_heading_level, HeadingLevel::H3);
    }

    #[test]
    fn test_config_rejects_empty_symbol() {
        let json = r#"{"symbol_table": [{"from": "", "to": "x"}]}"#;
        let result = NormalizerConfig::from_json(json);
        assert!(matches!(result, Err(NormalizerError::InvalidConfig { .. })));
    }

    #[test]
    fn test_config_rejects_empty_page_marker() {
        let config = NormalizerConfig {
            page_marker: "  ".to_string(),
            ..NormalizerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
