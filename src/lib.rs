//! # Document Normalizer Library
//!
//! Cleans markdown extracted from PDF reports and splits it into chunks keyed
//! by the heading hierarchy, ready for embedding and storage elsewhere.
//!
//! Cleaning is an ordered list of pure rules (extraction errors, footnotes,
//! heading levels, locale glyphs, citations, layout). The final layout rule is
//! not idempotent, so a document goes through the pipeline exactly once.
//!
//! ## Example Usage
//!
//! ```rust
//! use doc_normalizer::{DocumentNormalizer, HeadingLevel, NormalizerConfig};
//!
//! let normalizer = DocumentNormalizer::new(&NormalizerConfig::default()).unwrap();
//! let cleaned = normalizer.pipeline().clean("1. 개요\n본문내용");
//! assert_eq!(cleaned, "## 1. 개요\n본문내용");
//!
//! let chunks = doc_normalizer::HeaderSplitter::default().split(&cleaned);
//! assert_eq!(chunks[0].heading(HeadingLevel::H2), Some("1. 개요"));
//! ```

pub mod error;
pub mod services;
pub mod types;

pub use error::{NormalizerError, Result};
pub use services::{
    ChunkExporter, CleaningPipeline, CleaningRule, ContentFetcher, DocumentNormalizer,
    HeaderSplitter,
};
pub use types::{
    Chunk, ChunkRecord, DocumentMetadata, DocumentSource, ExportConfig, ExportFormat, ExportResult,
    HeadingLevel, NormalizeReport, NormalizedDocument, NormalizerConfig, SourceType,
    SymbolSubstitution,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_basic_workflow() {
        let content = "\
보고서 요약\n\
-----\n\
#### 생성형 AI 동향\n\
1. 시장 현황\n\
ㅇ 시장 규모는 ’23년 (IDC, 2023) 기준 확대[1)]\n\
1) IDC 보고서\n\
-----\n\
□ 기업 사례\n\
ㅇ 도입 기업 증가 (서울시)\n\
2. 향후 전망\n";

        let metadata = DocumentMetadata::new(&DocumentSource::local("trend.md", "trend.md"), content);

        let normalizer = DocumentNormalizer::new(&NormalizerConfig::default()).unwrap();
        let document = normalizer.normalize(content, metadata);

        assert!(document.chunks[0].is_preamble());
        assert_eq!(document.chunks[0].content, "보고서 요약");

        let market = document
            .chunks
            .iter()
            .find(|c| c.heading(HeadingLevel::H2) == Some("1. 시장 현황"))
            .unwrap();
        assert_eq!(market.heading(HeadingLevel::H1), Some("생성형 AI 동향"));
        assert!(market.content.contains("2023년"));
        assert!(!market.content.contains("IDC"));

        let cases = document
            .chunks
            .iter()
            .find(|c| c.heading(HeadingLevel::H3) == Some("기업 사례"))
            .unwrap();
        assert_eq!(cases.heading(HeadingLevel::H2), Some("1. 시장 현황"));
        assert!(cases.content.contains("(서울시)"));

        let outlook = document.chunks.last().unwrap();
        assert_eq!(outlook.heading(HeadingLevel::H2), Some("2. 향후 전망"));
        assert_eq!(outlook.heading(HeadingLevel::H3), None);
        assert_eq!(outlook.content, "");

        for (idx, chunk) in document.chunks.iter().enumerate() {
            assert_eq!(chunk.sequence_index, idx);
        }
    }

    #[test]
    fn test_normalizer_creation() {
        assert!(DocumentNormalizer::new(&NormalizerConfig::default()).is_ok());

        let custom = NormalizerConfig {
            page_marker: "<!-- PAGE -->".to_string(),
            error_markers: vec!["unknown glyph".to_string()],
            ..NormalizerConfig::default()
        };
        assert!(DocumentNormalizer::new(&custom).is_ok());
    }

    #[test]
    fn test_citation_example() {
        let normalizer = DocumentNormalizer::default();
        let cleaned = normalizer.pipeline().clean("발표(서울, 2023)와 (서울시) 자료");

        assert!(!cleaned.contains("(서울, 2023)"));
        assert!(cleaned.contains("(서울시)"));
    }
}
