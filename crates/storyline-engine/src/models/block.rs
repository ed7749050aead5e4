use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::models::BlockType;

/// Identity of a block within its document. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u64);

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags::bitflags! {
    /// Inline character formatting
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct InlineStyle: u8 {
        const BOLD = 1 << 0;
        const ITALIC = 1 << 1;
        const UNDERLINE = 1 << 2;
        const STRIKE_OUT = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

/// Inline style applied to a character range of the block text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFormat {
    pub range: Range<usize>,
    pub style: InlineStyle,
}

/// Per-block deviation from the template style of its type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FormattingOverride {
    pub alignment: Option<Alignment>,
    pub uppercase: Option<bool>,
    pub font: Option<String>,
}

/// Review annotation over a character range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewMark {
    pub range: Range<usize>,
    /// `#rrggbb`
    pub color: String,
    pub background: Option<String>,
    pub author: String,
    pub resolved: bool,
    pub comment: Option<String>,
}

impl ReviewMark {
    pub fn new(range: Range<usize>, color: &str, author: &str) -> Self {
        Self {
            range,
            color: color.to_string(),
            background: None,
            author: author.to_string(),
            resolved: false,
            comment: None,
        }
    }

    /// Same annotation, ignoring where it sits.
    pub(crate) fn same_annotation(&self, other: &ReviewMark) -> bool {
        self.color == other.color
            && self.background == other.background
            && self.author == other.author
            && self.resolved == other.resolved
            && self.comment == other.comment
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub name: String,
    /// Character offset inside the block text
    pub offset: usize,
}

/// A run of text sharing one inline style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledRun<'a> {
    pub text: &'a str,
    pub style: InlineStyle,
}

/// One typed paragraph of script content.
///
/// All ranges and offsets on a block are character offsets into `text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub block_type: BlockType,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub formats: Vec<TextFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatting: Option<FormattingOverride>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub review_marks: Vec<ReviewMark>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bookmarks: Vec<Bookmark>,
}

impl Block {
    pub fn new(id: BlockId, block_type: BlockType, text: impl Into<String>) -> Self {
        Self {
            id,
            block_type,
            text: text.into(),
            formats: Vec::new(),
            formatting: None,
            review_marks: Vec::new(),
            bookmarks: Vec::new(),
        }
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Style in effect at a character offset.
    pub fn style_at(&self, offset: usize) -> InlineStyle {
        self.formats
            .iter()
            .filter(|f| f.range.contains(&offset))
            .fold(InlineStyle::empty(), |acc, f| acc | f.style)
    }

    /// Apply `style` over `range`, merging with existing formats.
    pub fn add_format(&mut self, range: Range<usize>, style: InlineStyle) {
        if range.is_empty() || style.is_empty() {
            return;
        }
        self.formats.push(TextFormat { range, style });
        self.normalize_formats();
    }

    /// Split the text into maximal runs of identical style.
    pub fn runs(&self) -> Vec<StyledRun<'_>> {
        let mut bounds: Vec<usize> = vec![0, self.char_len()];
        for f in &self.formats {
            bounds.push(f.range.start);
            bounds.push(f.range.end);
        }
        bounds.sort_unstable();
        bounds.dedup();

        let mut runs: Vec<StyledRun<'_>> = Vec::new();
        for pair in bounds.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            if start >= end || end > self.char_len() {
                continue;
            }
            let style = self.style_at(start);
            let text = char_slice(&self.text, start..end);
            match runs.last_mut() {
                Some(last) if last.style == style => {
                    // Adjacent slices of the same string
                    let begin = byte_offset(&self.text, start) - last.text.len();
                    last.text = &self.text[begin..byte_offset(&self.text, end)];
                }
                _ => runs.push(StyledRun { text, style }),
            }
        }
        runs
    }

    /// Rewrite formats as sorted, non-overlapping single-style ranges.
    pub(crate) fn normalize_formats(&mut self) {
        if self.formats.is_empty() {
            return;
        }
        let len = self.char_len();
        let mut bounds: Vec<usize> = Vec::new();
        for f in &self.formats {
            bounds.push(f.range.start.min(len));
            bounds.push(f.range.end.min(len));
        }
        bounds.sort_unstable();
        bounds.dedup();

        let mut normalized: Vec<TextFormat> = Vec::new();
        for pair in bounds.windows(2) {
            let style = self.style_at(pair[0]);
            if style.is_empty() {
                continue;
            }
            match normalized.last_mut() {
                Some(last) if last.style == style && last.range.end == pair[0] => {
                    last.range.end = pair[1];
                }
                _ => normalized.push(TextFormat {
                    range: pair[0]..pair[1],
                    style,
                }),
            }
        }
        self.formats = normalized;
    }

    /// Join review marks that touch and carry the same annotation.
    pub(crate) fn coalesce_review_marks(&mut self) {
        let mut merged: Vec<ReviewMark> = Vec::with_capacity(self.review_marks.len());
        for mark in self.review_marks.drain(..) {
            match merged.last_mut() {
                Some(last) if last.range.end == mark.range.start && last.same_annotation(&mark) => {
                    last.range.end = mark.range.end;
                }
                _ => merged.push(mark),
            }
        }
        self.review_marks = merged;
    }
}

/// Byte index of a character offset, clamped to the end of `text`.
pub(crate) fn byte_offset(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Substring by character range.
pub(crate) fn char_slice(text: &str, range: Range<usize>) -> &str {
    let start = byte_offset(text, range.start);
    let end = byte_offset(text, range.end);
    &text[start..end.max(start)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn block(text: &str) -> Block {
        Block::new(BlockId(1), BlockType::Action, text)
    }

    #[test]
    fn test_runs_without_formats() {
        let b = block("Plain text");
        assert_eq!(
            b.runs(),
            vec![StyledRun {
                text: "Plain text",
                style: InlineStyle::empty()
            }]
        );
    }

    #[test]
    fn test_runs_with_overlapping_formats() {
        // Given bold over "one two" and italic over "two three"
        let mut b = block("one two three");
        b.add_format(0..7, InlineStyle::BOLD);
        b.add_format(4..13, InlineStyle::ITALIC);

        // When splitting into runs
        let runs = b.runs();

        // Then the overlap carries both styles
        assert_eq!(
            runs,
            vec![
                StyledRun {
                    text: "one ",
                    style: InlineStyle::BOLD
                },
                StyledRun {
                    text: "two",
                    style: InlineStyle::BOLD | InlineStyle::ITALIC
                },
                StyledRun {
                    text: " three",
                    style: InlineStyle::ITALIC
                },
            ]
        );
    }

    #[test]
    fn test_runs_respect_multibyte_text() {
        let mut b = block("Ёлка и снег");
        b.add_format(0..4, InlineStyle::UNDERLINE);
        let runs = b.runs();
        assert_eq!(runs[0].text, "Ёлка");
        assert_eq!(runs[1].text, " и снег");
    }

    #[test]
    fn test_normalize_merges_touching_formats() {
        let mut b = block("abcdef");
        b.formats = vec![
            TextFormat {
                range: 0..2,
                style: InlineStyle::BOLD,
            },
            TextFormat {
                range: 2..4,
                style: InlineStyle::BOLD,
            },
        ];
        b.normalize_formats();
        assert_eq!(
            b.formats,
            vec![TextFormat {
                range: 0..4,
                style: InlineStyle::BOLD
            }]
        );
    }

    #[test]
    fn test_coalesce_review_marks() {
        let mut b = block("abcdef");
        b.review_marks = vec![
            ReviewMark::new(0..3, "#ff0000", "ann"),
            ReviewMark::new(3..6, "#ff0000", "ann"),
            ReviewMark::new(6..6, "#00ff00", "bob"),
        ];
        b.coalesce_review_marks();
        assert_eq!(b.review_marks.len(), 2);
        assert_eq!(b.review_marks[0].range, 0..6);
    }

    #[test]
    fn test_char_slice() {
        assert_eq!(char_slice("héllo", 1..3), "él");
        assert_eq!(char_slice("abc", 2..10), "c");
    }
}
