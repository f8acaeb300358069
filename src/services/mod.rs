pub mod cleaner;
pub mod exporter;
pub mod fetcher;
pub mod normalizer;
pub mod rules;
pub mod splitter;

pub use cleaner::CleaningPipeline;
pub use exporter::ChunkExporter;
pub use fetcher::ContentFetcher;
pub use normalizer::DocumentNormalizer;
pub use rules::CleaningRule;
pub use splitter::HeaderSplitter;
