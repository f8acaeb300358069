use crate::types::{Chunk, HeadingLevel};
use std::collections::BTreeMap;
use tracing::debug;

/// Splits normalized markdown into chunks keyed by the open heading path.
pub struct HeaderSplitter {
    max_level: HeadingLevel,
}

/// Text gathered since the last heading boundary.
struct OpenSection<'a> {
    headings: BTreeMap<HeadingLevel, String>,
    lines: Vec<&'a str>,
    has_heading: bool,
}

impl<'a> OpenSection<'a> {
    fn preamble() -> Self {
        Self {
            headings: BTreeMap::new(),
            lines: Vec::new(),
            has_heading: false,
        }
    }

    /// Turns the section into a chunk. A heading always yields a chunk, even
    /// with no content; an empty preamble yields nothing.
    fn seal(self, chunks: &mut Vec<Chunk>) {
        let content = self.lines.join("\n").trim().to_string();
        if !self.has_heading && content.is_empty() {
            return;
        }

        chunks.push(Chunk {
            headings: self.headings,
            content,
            sequence_index: chunks.len(),
        });
    }
}

impl HeaderSplitter {
    pub fn new(max_level: HeadingLevel) -> Self {
        Self { max_level }
    }

    pub fn split(&self, text: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut section = OpenSection::preamble();
        let mut fence: Option<&str> = None;

        for line in text.lines() {
            let trimmed = line.trim_start();

            if let Some(open) = fence {
                if trimmed.starts_with(open) {
                    fence = None;
                }
                section.lines.push(line);
                continue;
            }

            if let Some(marker) = ["```", "~~~"].into_iter().find(|m| trimmed.starts_with(m)) {
                fence = Some(marker);
                section.lines.push(line);
                continue;
            }

            match self.parse_heading(line) {
                Some((level, title)) => {
                    let mut headings = section.headings.clone();
                    headings.retain(|open_level, _| *open_level < level);
                    headings.insert(level, title);

                    section.seal(&mut chunks);
                    section = OpenSection {
                        headings,
                        lines: Vec::new(),
                        has_heading: true,
                    };
                }
                None => section.lines.push(line),
            }
        }

        section.seal(&mut chunks);
        debug!("Split document into {} chunks", chunks.len());

        chunks
    }

    /// Recognizes `#`, `##` and `###` headings up to the configured depth.
    /// The marker must be followed by whitespace or the end of the line.
    fn parse_heading(&self, line: &str) -> Option<(HeadingLevel, String)> {
        let trimmed = line.trim_start();
        let hashes = trimmed.chars().take_while(|c| *c == '#').count();
        let level = HeadingLevel::from_depth(hashes)?;

        if level > self.max_level {
            return None;
        }

        let rest = &trimmed[hashes..];
        if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
            return None;
        }

        Some((level, rest.trim().to_string()))
    }
}

impl Default for HeaderSplitter {
    fn default() -> Self {
        Self::new(HeadingLevel::H3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(text: &str) -> Vec<Chunk> {
        HeaderSplitter::default().split(text)
    }

    #[test]
    fn test_single_heading_example() {
        let chunks = split("## 1. 개요\n본문내용");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].heading(HeadingLevel::H2), Some("1. 개요"));
        assert_eq!(chunks[0].headings.len(), 1);
        assert_eq!(chunks[0].content, "본문내용");
        assert_eq!(chunks[0].sequence_index, 0);
    }

    #[test]
    fn test_preamble_chunk_has_no_headings() {
        let chunks = split("머리말 문단\n\n# 제목\n본문");

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].is_preamble());
        assert_eq!(chunks[0].content, "머리말 문단");
        assert_eq!(chunks[1].heading(HeadingLevel::H1), Some("제목"));
    }

    #[test]
    fn test_blank_preamble_is_skipped() {
        let chunks = split("\n\n  \n# 제목\n본문");
        assert_eq!(chunks.len(), 1);
        assert!(!chunks[0].is_preamble());
    }

    #[test]
    fn test_heading_without_content_still_emitted() {
        let chunks = split("# 장\n## 절\n내용");

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "");
        assert_eq!(chunks[0].heading(HeadingLevel::H1), Some("장"));
        assert_eq!(chunks[1].heading(HeadingLevel::H1), Some("장"));
        assert_eq!(chunks[1].heading(HeadingLevel::H2), Some("절"));
        assert_eq!(chunks[1].content, "내용");
    }

    #[test]
    fn test_new_heading_closes_deeper_levels() {
        let chunks = split("# A\n## B\n### C\nc\n## D\nd\n# E\ne");

        let last = chunks.last().unwrap();
        assert_eq!(last.heading(HeadingLevel::H1), Some("E"));
        assert_eq!(last.heading(HeadingLevel::H2), None);

        let d = &chunks[chunks.len() - 2];
        assert_eq!(d.heading(HeadingLevel::H1), Some("A"));
        assert_eq!(d.heading(HeadingLevel::H2), Some("D"));
        assert_eq!(d.heading(HeadingLevel::H3), None);
        assert_eq!(d.content, "d");
    }

    #[test]
    fn test_identical_headings_are_distinct_chunks() {
        let chunks = split("## 같은 제목\n하나\n## 같은 제목\n둘");

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "하나");
        assert_eq!(chunks[1].content, "둘");
        assert_eq!(chunks[0].headings, chunks[1].headings);
    }

    #[test]
    fn test_sequence_index_follows_emission_order() {
        let chunks = split("서문\n# 1\na\n## 2\nb\n### 3\n# 4\nd");

        for (idx, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.sequence_index, idx);
        }
        assert_eq!(chunks.len(), 5);
    }

    #[test]
    fn test_non_headings_stay_in_content() {
        let chunks = split("# 제목\n#해시태그\n#### 깊은 제목\nC# 언어");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "#해시태그\n#### 깊은 제목\nC# 언어");
    }

    #[test]
    fn test_fenced_code_is_not_split() {
        let chunks = split("# 예제\n```\n# 주석\n```\n끝");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "```\n# 주석\n```\n끝");
    }

    #[test]
    fn test_max_level_limits_boundaries() {
        let chunks = HeaderSplitter::new(HeadingLevel::H2).split("# A\n### 소제목\n내용");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "### 소제목\n내용");
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(split("").is_empty());
    }
}
