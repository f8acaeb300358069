use crate::error::Result;
use crate::services::cleaner::{count_pages, CleaningPipeline};
use crate::services::splitter::HeaderSplitter;
use crate::types::{
    Chunk, DocumentMetadata, HeadingLevel, NormalizeReport, NormalizedDocument, NormalizerConfig,
    PipelineTrace,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Cleans a document and splits it into heading-keyed chunks.
///
/// Holds only compiled patterns, so one instance can serve any number of
/// documents, from any number of threads.
pub struct DocumentNormalizer {
    pipeline: CleaningPipeline,
    splitter: HeaderSplitter,
}

impl DocumentNormalizer {
    pub fn new(config: &NormalizerConfig) -> Result<Self> {
        Ok(Self {
            pipeline: CleaningPipeline::new(config)?,
            splitter: HeaderSplitter::new(config.max_heading_level),
        })
    }

    pub fn pipeline(&self) -> &CleaningPipeline {
        &self.pipeline
    }

    pub fn normalize(&self, content: &str, metadata: DocumentMetadata) -> NormalizedDocument {
        info!("Normalizing document: {}", metadata.name);

        let (cleaned, trace) = self.pipeline.clean_with_trace(content);
        let chunks = self.splitter.split(&cleaned);

        debug!(
            "Document '{}' produced {} chunks from {} chars",
            metadata.name,
            chunks.len(),
            cleaned.chars().count()
        );

        let report = self.build_report(&metadata.name, content, &cleaned, trace, &chunks);

        NormalizedDocument {
            source: metadata.name.clone(),
            metadata,
            cleaned,
            chunks,
            report,
        }
    }

    /// Documents share no state, so order across the batch does not matter.
    pub fn normalize_batch(
        &self,
        documents: Vec<(String, DocumentMetadata)>,
    ) -> Vec<NormalizedDocument> {
        documents
            .into_iter()
            .map(|(content, metadata)| self.normalize(&content, metadata))
            .collect()
    }

    fn build_report(
        &self,
        source: &str,
        input: &str,
        cleaned: &str,
        trace: PipelineTrace,
        chunks: &[Chunk],
    ) -> NormalizeReport {
        let mut chunks_per_section = BTreeMap::new();
        for chunk in chunks {
            let section = chunk
                .heading(HeadingLevel::H1)
                .unwrap_or("(preamble)")
                .to_string();
            *chunks_per_section.entry(section).or_insert(0) += 1;
        }

        NormalizeReport {
            source: source.to_string(),
            input_chars: input.chars().count(),
            output_chars: cleaned.chars().count(),
            pages: count_pages(input, self.pipeline.page_marker()),
            pages_after_footnotes: trace.pages_after_footnotes,
            rules: trace.rules,
            total_chunks: chunks.len(),
            preamble_chunks: chunks.iter().filter(|c| c.is_preamble()).count(),
            empty_chunks: chunks.iter().filter(|c| c.content.is_empty()).count(),
            chunks_per_section,
        }
    }
}

impl Default for DocumentNormalizer {
    fn default() -> Self {
        Self {
            pipeline: CleaningPipeline::new(&NormalizerConfig::default())
                .expect("default normalizer config is valid"),
            splitter: HeaderSplitter::default(),
        }
    }
}
