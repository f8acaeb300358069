use crate::error::{NormalizerError, Result};
use crate::types::SymbolSubstitution;
use regex::Regex;
use tracing::warn;

/// A named, pure text transformation applied by the cleaning pipeline.
///
/// Rules never fail: a pattern that does not match leaves the text as it was.
pub trait CleaningRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, text: &str) -> String;

    /// Whether `apply(apply(x)) == apply(x)` holds for this rule.
    fn is_idempotent(&self) -> bool {
        true
    }
}

fn compile(rule: &'static str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| NormalizerError::InvalidPattern {
        rule,
        reason: e.to_string(),
    })
}

/// Drops every line the PDF extractor polluted with an error message.
pub struct ExtractionErrorRule {
    pattern: Option<Regex>,
}

impl ExtractionErrorRule {
    pub const NAME: &'static str = "extraction-error-removal";

    pub fn new(markers: &[String]) -> Result<Self> {
        if markers.is_empty() {
            return Ok(Self { pattern: None });
        }

        let alternation = markers
            .iter()
            .map(|m| regex::escape(m))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = compile(Self::NAME, &format!(r"(?m)^.*(?:{}).*\n?", alternation))?;

        Ok(Self {
            pattern: Some(pattern),
        })
    }
}

impl CleaningRule for ExtractionErrorRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, text: &str) -> String {
        match &self.pattern {
            Some(pattern) => pattern.replace_all(text, "").into_owned(),
            None => text.to_string(),
        }
    }
}

/// Removes numbered footnote blocks and `[n)]` references page by page.
pub struct FootnoteRule {
    page_marker: String,
    footnote_pattern: Regex,
    reference_pattern: Regex,
}

impl FootnoteRule {
    pub const NAME: &'static str = "footnote-removal";

    pub fn new(page_marker: &str) -> Result<Self> {
        Ok(Self {
            page_marker: page_marker.to_string(),
            // A footnote runs from its "N) " line to the bottom of the page.
            footnote_pattern: compile(Self::NAME, r"(?m)^[ \t]*\d+\) .*(?:\n.*)*")?,
            reference_pattern: compile(Self::NAME, r"\[\d+\)\]")?,
        })
    }

    /// References go first so a footnote hidden behind `[n)]` starts its
    /// line. Repeats until the page stops changing.
    fn clean_page(&self, page: &str) -> String {
        let mut current = page.trim().to_string();
        loop {
            let without_refs = self.reference_pattern.replace_all(&current, "");
            let without_notes = self.footnote_pattern.replace_all(&without_refs, "");
            let next = without_notes.trim().to_string();
            if next == current {
                return next;
            }
            current = next;
        }
    }
}

impl CleaningRule for FootnoteRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, text: &str) -> String {
        let separator = format!("\n\n{}\n", self.page_marker);

        // Empty pages stay as empty segments so page counts survive.
        text.split(self.page_marker.as_str())
            .map(|page| self.clean_page(page))
            .collect::<Vec<_>>()
            .join(&separator)
    }
}

/// Maps the report's numbering scheme onto markdown heading levels.
pub struct HeadingRule {
    control_glyph: Regex,
    fourth_level: Regex,
    numbered_section: Regex,
    box_bullet: Regex,
}

impl HeadingRule {
    pub const NAME: &'static str = "heading-normalization";

    pub fn new() -> Result<Self> {
        Ok(Self {
            control_glyph: compile(Self::NAME, r"\x01")?,
            fourth_level: compile(Self::NAME, r"(?m)^####( |$)")?,
            numbered_section: compile(Self::NAME, r"(?m)^(\d+)\. ")?,
            box_bullet: compile(Self::NAME, r"(?m)^□")?,
        })
    }
}

impl CleaningRule for HeadingRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, text: &str) -> String {
        let text = self.control_glyph.replace_all(text, " ");
        let text = self.fourth_level.replace_all(&text, "#${1}");
        let text = self.numbered_section.replace_all(&text, "## ${1}. ");
        self.box_bullet.replace_all(&text, "### ").into_owned()
    }
}

/// Replaces locale glyphs with markdown equivalents, in table order.
pub struct SymbolRule {
    table: Vec<SymbolSubstitution>,
}

impl SymbolRule {
    pub const NAME: &'static str = "symbol-substitution";

    pub fn new(table: &[SymbolSubstitution]) -> Self {
        for (idx, entry) in table.iter().enumerate() {
            if let Some(source) = table.iter().find(|s| entry.to.contains(s.from.as_str())) {
                warn!(
                    "Symbol entry {} replaces '{}' with text containing '{}'; re-running the rule would substitute it again",
                    idx, entry.from, source.from
                );
            }
        }

        Self {
            table: table.to_vec(),
        }
    }
}

impl CleaningRule for SymbolRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, text: &str) -> String {
        self.table
            .iter()
            .fold(text.to_string(), |acc, entry| acc.replace(&entry.from, &entry.to))
    }
}

/// Deletes parenthesized spans containing a comma, treating them as citations.
///
/// Only innermost spans match, so the rule repeats until nothing changes;
/// removing `(a, b)` from `((a, b), c)` exposes `(, c)` which goes next.
pub struct CitationRule {
    pattern: Regex,
}

impl CitationRule {
    pub const NAME: &'static str = "citation-removal";

    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: compile(Self::NAME, r"\([^()]*,[^()]*\)")?,
        })
    }
}

impl CleaningRule for CitationRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, text: &str) -> String {
        let mut current = text.to_string();
        while self.pattern.is_match(&current) {
            current = self.pattern.replace_all(&current, "").into_owned();
        }
        current
    }
}

/// Final layout pass: flattens page breaks and re-inserts the line breaks the
/// splitter needs before headings, list items and table captions.
///
/// Not idempotent. Every break it inserts would be inserted again on a second
/// run, so the pipeline applies it exactly once per document.
pub struct LayoutRule {
    page_marker: String,
    heading_run: Regex,
    split_abbreviation: Regex,
    table_caption: Regex,
    table_row: Regex,
    scoped_note: Regex,
}

impl LayoutRule {
    pub const NAME: &'static str = "layout-cleanup";

    pub fn new(page_marker: &str, scope_open: char, scope_close: char) -> Result<Self> {
        let open = regex::escape(&scope_open.to_string());
        let close = regex::escape(&scope_close.to_string());

        Ok(Self {
            page_marker: page_marker.to_string(),
            heading_run: compile(Self::NAME, r"(#+)")?,
            split_abbreviation: compile(Self::NAME, r"C\s*#")?,
            table_caption: compile(Self::NAME, r"(표 \d)")?,
            table_row: compile(Self::NAME, r"(표 \d.*?)(\|)")?,
            scoped_note: compile(Self::NAME, &format!(r"(?s){}[^{}]*{}", open, close, close))?,
        })
    }

    fn flatten(&self, text: &str) -> String {
        text.replace(&self.page_marker, "")
            .replace("\n\n", "")
            .replace("  ", " ")
    }

    fn break_before_headings(&self, text: &str) -> String {
        let text = self.heading_run.replace_all(text, "\n\n${1}");
        self.split_abbreviation.replace_all(&text, "C#").into_owned()
    }

    fn break_before_tables(&self, text: &str) -> String {
        let text = self.table_caption.replace_all(text, "\n\n${1}");
        self.table_row.replace_all(&text, "${1}\n\n${2}").into_owned()
    }
}

/// Puts a paragraph break before each `- ` that starts an item, i.e. one
/// followed by a non-whitespace character. `a - b` style dashes are left
/// alone only when whitespace follows the marker.
fn break_before_list_items(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find("- ") {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 2..];
        if after.chars().next().map_or(false, |c| !c.is_whitespace()) {
            out.push_str("\n\n- ");
        } else {
            out.push_str("- ");
        }
        rest = after;
    }

    out.push_str(rest);
    out
}

impl CleaningRule for LayoutRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, text: &str) -> String {
        let text = self.flatten(text);
        let text = self.break_before_headings(&text);
        let text = break_before_list_items(text.trim());
        let text = self.break_before_tables(&text);
        self.scoped_note.replace_all(&text, "\n").into_owned()
    }

    fn is_idempotent(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::default_symbol_table;

    fn assert_idempotent(rule: &dyn CleaningRule, input: &str) {
        let once = rule.apply(input);
        let twice = rule.apply(&once);
        assert_eq!(once, twice, "rule '{}' is not idempotent", rule.name());
    }

    #[test]
    fn test_extraction_error_lines_removed() {
        let rule = ExtractionErrorRule::new(&["syntax error".to_string()]).unwrap();
        assert_eq!(rule.apply("a\nfoo syntax error bar\nb"), "a\nb");
        assert_eq!(rule.apply("a\nsyntax error"), "a\n");
        assert_eq!(rule.apply("clean text"), "clean text");
        assert_idempotent(&rule, "x\nsyntax error\nsyntax error again\ny");
    }

    #[test]
    fn test_extraction_error_markers_are_literal() {
        let rule = ExtractionErrorRule::new(&["err(".to_string(), "a.b".to_string()]).unwrap();
        assert_eq!(rule.apply("keep axb\nerr( here\nkeep"), "keep axb\nkeep");
    }

    #[test]
    fn test_extraction_error_without_markers_is_noop() {
        let rule = ExtractionErrorRule::new(&[]).unwrap();
        assert_eq!(rule.apply("syntax error"), "syntax error");
    }

    #[test]
    fn test_footnotes_removed_per_page() {
        let rule = FootnoteRule::new("-----").unwrap();
        let input = "본문1[1)] 계속\n1) 각주 내용\n각주 계속\n-----\n2) 전부 각주\n-----\n본문3";

        let output = rule.apply(input);
        assert_eq!(output, "본문1 계속\n\n-----\n\n\n-----\n본문3");
        assert_idempotent(&rule, input);
    }

    #[test]
    fn test_footnote_page_count_preserved() {
        let rule = FootnoteRule::new("-----").unwrap();
        let input = "a\n-----\n1) only notes\n-----\n-----\nb";

        let before = input.split("-----").count();
        let after = rule.apply(input).split("-----").count();
        assert_eq!(before, after);
    }

    #[test]
    fn test_indented_footnote_removed_in_one_pass() {
        let rule = FootnoteRule::new("-----").unwrap();
        let input = "본문\n-----\n 1) 들여쓴 각주\n";

        assert_eq!(rule.apply(input), "본문\n\n-----\n");
        assert_idempotent(&rule, input);
    }

    #[test]
    fn test_footnote_behind_reference_removed_in_one_pass() {
        let rule = FootnoteRule::new("-----").unwrap();
        let input = "본문\n[1)]2) 각주";

        assert_eq!(rule.apply(input), "본문");
        assert_idempotent(&rule, input);
    }

    #[test]
    fn test_footnote_mid_sentence_kept() {
        let rule = FootnoteRule::new("-----").unwrap();
        assert_eq!(rule.apply("see item 3) below"), "see item 3) below");
    }

    #[test]
    fn test_heading_levels_rewritten() {
        let rule = HeadingRule::new().unwrap();
        let input = "#### 제목\n1. 개요\n본문 2. 안됨\n□ 세부\n";

        assert_eq!(rule.apply(input), "# 제목\n## 1. 개요\n본문 2. 안됨\n###  세부\n");
        assert_idempotent(&rule, input);
    }

    #[test]
    fn test_heading_example_from_numbered_line() {
        let rule = HeadingRule::new().unwrap();
        assert_eq!(rule.apply("1. 개요\n본문내용"), "## 1. 개요\n본문내용");
    }

    #[test]
    fn test_heading_control_glyph_becomes_space() {
        let rule = HeadingRule::new().unwrap();
        assert_eq!(rule.apply("a\u{1}b"), "a b");
    }

    #[test]
    fn test_symbols_substituted() {
        let rule = SymbolRule::new(&default_symbol_table());

        assert_eq!(rule.apply("ㅇ항목"), "- 항목");
        assert_eq!(rule.apply("A→B"), "A 에서 B");
        assert_eq!(rule.apply("’23년"), "2023년");
        assert_eq!(rule.apply("☞참고"), "- 참고");
        assert_eq!(rule.apply("**강조** [주석] ▲증가 「인용」"), "강조 주석 증가 인용");
        assert_idempotent(&rule, "ㅇ A→B ’23 ☞ **x** [y] ▲ 「z」");
    }

    #[test]
    fn test_citation_with_comma_removed() {
        let rule = CitationRule::new().unwrap();
        let input = "서울(서울, 2023)에서 (서울시) 발표";

        assert_eq!(rule.apply(input), "서울에서 (서울시) 발표");
        assert_idempotent(&rule, input);
    }

    #[test]
    fn test_citation_nested_spans_reach_fixed_point() {
        let rule = CitationRule::new().unwrap();
        let input = "A ((x, y), z) B";

        assert_eq!(rule.apply(input), "A  B");
        assert_idempotent(&rule, input);
    }

    #[test]
    fn test_layout_flattens_and_breaks() {
        let rule = LayoutRule::new("-----", '※', '\u{AD}').unwrap();
        let input = "## 2. 배경\n내용  설명\n\n-----\n\n### 세부\n항목- 첫째";

        assert_eq!(
            rule.apply(input),
            "## 2. 배경\n내용 설명\n\n### 세부\n항목\n\n- 첫째"
        );
    }

    #[test]
    fn test_layout_keeps_csharp_together() {
        let rule = LayoutRule::new("-----", '※', '\u{AD}').unwrap();
        assert_eq!(rule.apply("C # 언어"), "C# 언어");
    }

    #[test]
    fn test_layout_table_caption_and_row() {
        let rule = LayoutRule::new("-----", '※', '\u{AD}').unwrap();
        assert_eq!(
            rule.apply("표 1 예산 | 항목 | 금액 |"),
            "\n\n표 1 예산 \n\n| 항목 | 금액 |"
        );
    }

    #[test]
    fn test_layout_strips_scoped_note() {
        let rule = LayoutRule::new("-----", '※', '\u{AD}').unwrap();
        assert_eq!(rule.apply("본문※ 참고사항\n설명\u{AD}다음"), "본문\n다음");
    }

    #[test]
    fn test_layout_is_not_idempotent() {
        let rule = LayoutRule::new("-----", '※', '\u{AD}').unwrap();
        assert!(!rule.is_idempotent());

        let once = rule.apply("a※x\u{AD}\n- b");
        assert_eq!(once, "a\n\n\n\n- b");
        assert_eq!(rule.apply(&once), "a\n\n- b");
    }

    #[test]
    fn test_list_break_requires_non_whitespace() {
        assert_eq!(break_before_list_items("a- b"), "a\n\n- b");
        assert_eq!(break_before_list_items("a -  b"), "a -  b");
        assert_eq!(break_before_list_items("- - x"), "\n\n- \n\n- x");
    }
}
