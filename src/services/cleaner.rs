use crate::error::Result;
use crate::services::rules::{
    CitationRule, CleaningRule, ExtractionErrorRule, FootnoteRule, HeadingRule, LayoutRule,
    SymbolRule,
};
use crate::types::{NormalizerConfig, PipelineTrace, RuleTrace};
use tracing::debug;

/// Runs the cleaning rules over a document in their fixed order.
///
/// Later rules depend on the shape earlier ones leave behind: heading markers
/// must exist before layout cleanup breaks lines in front of them, and page
/// markers must survive until footnotes are stripped page by page.
pub struct CleaningPipeline {
    rules: Vec<Box<dyn CleaningRule>>,
    page_marker: String,
}

impl CleaningPipeline {
    pub fn new(config: &NormalizerConfig) -> Result<Self> {
        config.validate()?;

        let rules: Vec<Box<dyn CleaningRule>> = vec![
            Box::new(ExtractionErrorRule::new(&config.error_markers)?),
            Box::new(FootnoteRule::new(&config.page_marker)?),
            Box::new(HeadingRule::new()?),
            Box::new(SymbolRule::new(&config.symbol_table)),
            Box::new(CitationRule::new()?),
            Box::new(LayoutRule::new(
                &config.page_marker,
                config.footnote_scope_open,
                config.footnote_scope_close,
            )?),
        ];

        Ok(Self {
            rules,
            page_marker: config.page_marker.clone(),
        })
    }

    pub fn clean(&self, text: &str) -> String {
        self.clean_with_trace(text).0
    }

    pub fn clean_with_trace(&self, text: &str) -> (String, PipelineTrace) {
        let mut current = text.to_string();
        let mut traces = Vec::with_capacity(self.rules.len());
        let mut pages_after_footnotes = count_pages(text, &self.page_marker);

        for rule in &self.rules {
            let chars_before = current.chars().count();
            current = rule.apply(&current);
            let chars_after = current.chars().count();

            debug!(
                "Rule '{}' applied: {} -> {} chars",
                rule.name(),
                chars_before,
                chars_after
            );

            if rule.name() == FootnoteRule::NAME {
                pages_after_footnotes = count_pages(&current, &self.page_marker);
            }

            traces.push(RuleTrace {
                rule: rule.name().to_string(),
                chars_before,
                chars_after,
            });
        }

        (
            current,
            PipelineTrace {
                rules: traces,
                pages_after_footnotes,
            },
        )
    }

    pub fn rules(&self) -> &[Box<dyn CleaningRule>] {
        &self.rules
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn page_marker(&self) -> &str {
        &self.page_marker
    }
}

pub fn count_pages(text: &str, marker: &str) -> usize {
    text.split(marker).count()
}
