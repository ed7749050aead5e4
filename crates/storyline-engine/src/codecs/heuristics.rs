//! Block type inference for paragraphs that carry no type of their own.
//!
//! Word processors and plain text only know indentation, alignment and
//! case. These rules recover screenplay structure from that shape.

use log::debug;
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

use crate::codecs::ImportOptions;
use crate::editing::Document;
use crate::models::parsers::simplified;
use crate::models::{Alignment, Block, BlockType, Dictionaries, FormattingOverride, InlineStyle};
use crate::template::defaults::default_style;

/// Indent over the document minimum that counts as centered, in millimetres.
pub const CENTERED_INDENT_DELTA_MM: f32 = 16.0;

/// Some programs center text with runs of spaces.
pub const SPACE_CENTERING_PREFIX: &str = "                    ";

static PLACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|\s)(INT|EXT|ИНТ|НАТ|ПАВ|ЭКСТ)[. -]").expect("valid scene place regex")
});

static SCENE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d\S*?[.\-]\S* ").expect("valid scene number regex"));

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|\s)(TITLE|ТИТР): ").expect("valid title regex"));

/// What is known about a paragraph before it has a type.
#[derive(Debug, Clone, PartialEq)]
pub struct ParagraphFacts<'a> {
    pub text: &'a str,
    pub left_indent_mm: f32,
    pub alignment: Alignment,
    /// Capitalized by formatting rather than by its text
    pub caps: bool,
    pub previous: Option<BlockType>,
    pub blank_lines_before: usize,
    pub top_margin_mm: f32,
}

impl<'a> ParagraphFacts<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            left_indent_mm: 0.0,
            alignment: Alignment::Left,
            caps: false,
            previous: None,
            blank_lines_before: 0,
            top_margin_mm: 0.0,
        }
    }
}

fn is_uppercase(text: &str) -> bool {
    text == text.to_uppercase()
}

/// Classify one paragraph. `min_indent_mm` is the smallest left indent in
/// the document, which many programs use as an extra page margin.
pub fn classify(facts: &ParagraphFacts, min_indent_mm: f32, dictionaries: &Dictionaries) -> BlockType {
    let upper = facts.text.to_uppercase();
    let uppercase = facts.caps || is_uppercase(facts.text);
    let centered = facts.left_indent_mm > CENTERED_INDENT_DELTA_MM + min_indent_mm
        || facts.alignment == Alignment::Center
        || facts.text.starts_with(SPACE_CENTERING_PREFIX);
    let trimmed = facts.text.trim_start();

    let mut block_type = if centered {
        if uppercase && facts.previous != Some(BlockType::Character) {
            BlockType::Character
        } else if trimmed.starts_with('(') {
            BlockType::Parenthetical
        } else {
            BlockType::Dialogue
        }
    } else if uppercase {
        if PLACE.is_match(&upper)
            || SCENE_NUMBER.is_match(&upper)
            || dictionaries.match_scene_intro(trimmed).is_some()
        {
            BlockType::SceneHeading
        } else if facts.previous == Some(BlockType::SceneHeading)
            && facts.blank_lines_before == 0
            && facts.top_margin_mm == 0.0
        {
            BlockType::SceneCharacters
        } else if facts.alignment == Alignment::Right {
            BlockType::Transition
        } else {
            BlockType::UnformattedText
        }
    } else {
        BlockType::Action
    };

    if TITLE.is_match(&upper) {
        block_type = BlockType::Action;
    }
    debug!("Classified {:?} as {block_type}", facts.text);
    block_type
}

/// Tidy the text of a classified paragraph: collapse whitespace, drop a
/// leading scene number from headings and normalize dashes.
pub fn clean_text(block_type: BlockType, text: &str) -> String {
    let mut text = simplified(text).replace('–', "-");
    if block_type == BlockType::SceneHeading {
        text = text.to_uppercase();
        if let Some(found) = SCENE_NUMBER.find(&text) {
            text = text[found.end()..].to_string();
        }
    }
    text
}

/// Smallest left indent over the non-blank paragraphs.
pub fn min_indent<'a>(facts: impl IntoIterator<Item = &'a ParagraphFacts<'a>>) -> f32 {
    facts
        .into_iter()
        .filter(|f| !f.text.trim().is_empty())
        .map(|f| f.left_indent_mm)
        .fold(None, |min: Option<f32>, x| Some(min.map_or(x, |m| m.min(x))))
        .unwrap_or(0.0)
}

/// Classify a whole run of paragraphs in order, feeding each result into
/// the next paragraph's `previous`. Blank paragraphs yield `None`.
///
/// Indents are measured from the smallest indent in the run.
pub fn classify_all(facts: &mut [ParagraphFacts], dictionaries: &Dictionaries) -> Vec<Option<BlockType>> {
    classify_styled(facts, &[], dictionaries)
}

/// [`classify_all`] for text whose left edge is the page margin, so an
/// indent of zero is the action column even when no paragraph sits there.
pub fn classify_from_margin(
    facts: &mut [ParagraphFacts],
    dictionaries: &Dictionaries,
) -> Vec<Option<BlockType>> {
    classify_against(facts, &[], 0.0, dictionaries)
}

/// [`classify_all`] for documents where some paragraphs already name their
/// type through a style. Those keep it and only the rest are inferred.
pub fn classify_styled(
    facts: &mut [ParagraphFacts],
    styled: &[Option<BlockType>],
    dictionaries: &Dictionaries,
) -> Vec<Option<BlockType>> {
    let min = min_indent(facts.iter());
    classify_against(facts, styled, min, dictionaries)
}

fn classify_against(
    facts: &mut [ParagraphFacts],
    styled: &[Option<BlockType>],
    baseline_mm: f32,
    dictionaries: &Dictionaries,
) -> Vec<Option<BlockType>> {
    let mut previous = None;
    let mut blanks = 0;
    let mut types = Vec::with_capacity(facts.len());
    for (i, fact) in facts.iter_mut().enumerate() {
        let known = styled.get(i).copied().flatten();
        if known.is_none() && fact.text.trim().is_empty() {
            blanks += 1;
            types.push(None);
            continue;
        }
        fact.previous = previous;
        fact.blank_lines_before = blanks;
        let block_type = known.unwrap_or_else(|| classify(fact, baseline_mm, dictionaries));
        previous = Some(block_type);
        blanks = 0;
        types.push(Some(block_type));
    }
    types
}

/// Paragraph text collected from styled runs.
#[derive(Debug, Default)]
pub(crate) struct StyledText {
    pub(crate) text: String,
    formats: Vec<(Range<usize>, InlineStyle)>,
    len: usize,
}

impl StyledText {
    pub(crate) fn push(&mut self, text: &str, style: InlineStyle) {
        let count = text.chars().count();
        if !style.is_empty() && count > 0 {
            match self.formats.last_mut() {
                Some((range, last)) if range.end == self.len && *last == style => {
                    range.end += count;
                }
                _ => self.formats.push((self.len..self.len + count, style)),
            }
        }
        self.text.push_str(text);
        self.len += count;
    }

    pub(crate) fn push_char(&mut self, c: char, style: InlineStyle) {
        self.push(c.encode_utf8(&mut [0; 4]), style);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Append as a new block of `document`, formats included.
    pub(crate) fn push_to(self, document: &mut Document, block_type: BlockType) -> &mut Block {
        let block = document.push(block_type, self.text);
        for (range, style) in self.formats {
            block.add_format(range, style);
        }
        block
    }
}

/// A paragraph read from a word processor format, before it has a type.
#[derive(Debug, Default)]
pub(crate) struct ImportedParagraph {
    pub(crate) text: StyledText,
    /// Paragraph style name, matched against block type names
    pub(crate) style_name: Option<String>,
    pub(crate) left_indent_mm: f32,
    pub(crate) alignment: Alignment,
    pub(crate) caps: bool,
}

/// Build a document from word processor paragraphs.
///
/// Paragraphs whose style names a block type keep their text, inline
/// formats and any alignment or case that differs from the type's default.
/// The others are classified and their text cleaned.
pub(crate) fn assemble(paragraphs: Vec<ImportedParagraph>, options: &ImportOptions) -> Document {
    let styled: Vec<Option<BlockType>> = paragraphs
        .iter()
        .map(|p| p.style_name.as_deref().and_then(BlockType::from_name))
        .collect();
    let mut facts: Vec<ParagraphFacts> = paragraphs
        .iter()
        .map(|p| ParagraphFacts {
            left_indent_mm: p.left_indent_mm,
            alignment: p.alignment,
            caps: p.caps,
            ..ParagraphFacts::new(&p.text.text)
        })
        .collect();
    let types = classify_styled(&mut facts, &styled, &options.dictionaries);
    drop(facts);

    let mut document = Document::new(options.kind);
    for ((paragraph, block_type), named) in paragraphs.into_iter().zip(types).zip(styled) {
        let Some(block_type) = block_type else {
            continue;
        };
        if named.is_none() {
            document.push(block_type, clean_text(block_type, &paragraph.text.text));
            continue;
        }
        let style = default_style(block_type, options.kind);
        let formatting = FormattingOverride {
            alignment: (paragraph.alignment != style.alignment).then_some(paragraph.alignment),
            uppercase: (paragraph.caps && !style.uppercase).then_some(true),
            font: None,
        };
        let block = paragraph.text.push_to(&mut document, block_type);
        if formatting != FormattingOverride::default() {
            block.formatting = Some(formatting);
        }
    }
    document.bind_kind();
    document
}
