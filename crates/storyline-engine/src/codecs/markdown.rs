//! Markdown for text documents.
//!
//! Headings become `Heading1`..`Heading6`, every other paragraph-like block
//! becomes `Text`. Strong, emphasis, strikethrough and `<u>` spans map to
//! inline formats.

use log::debug;
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::codecs::heuristics::StyledText;
use crate::codecs::{
    ExportError, ExportOptions, Exporter, ImportError, ImportOptions, Importer, decode_text,
};
use crate::editing::Document;
use crate::models::{Block, BlockType, DocumentKind, InlineStyle};
use crate::template::Template;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MarkdownCodec;

fn heading_type(level: HeadingLevel) -> BlockType {
    match level {
        HeadingLevel::H1 => BlockType::Heading1,
        HeadingLevel::H2 => BlockType::Heading2,
        HeadingLevel::H3 => BlockType::Heading3,
        HeadingLevel::H4 => BlockType::Heading4,
        HeadingLevel::H5 => BlockType::Heading5,
        HeadingLevel::H6 => BlockType::Heading6,
    }
}

fn heading_level(block_type: BlockType) -> Option<usize> {
    match block_type {
        BlockType::Heading1 => Some(1),
        BlockType::Heading2 => Some(2),
        BlockType::Heading3 => Some(3),
        BlockType::Heading4 => Some(4),
        BlockType::Heading5 => Some(5),
        BlockType::Heading6 => Some(6),
        _ => None,
    }
}

struct MarkdownReader {
    document: Document,
    current: Option<(BlockType, StyledText)>,
    style: InlineStyle,
}

impl MarkdownReader {
    fn start(&mut self, block_type: BlockType) {
        self.finish();
        self.current = Some((block_type, StyledText::default()));
    }

    fn finish(&mut self) {
        if let Some((block_type, text)) = self.current.take()
            && !text.is_empty()
        {
            text.push_to(&mut self.document, block_type);
        }
    }

    fn push(&mut self, content: &str) {
        let style = self.style;
        self.current
            .get_or_insert_with(|| (BlockType::Text, StyledText::default()))
            .1
            .push(content, style);
    }

    fn toggle(&mut self, style: InlineStyle, on: bool) {
        self.style.set(style, on);
    }
}

impl Importer for MarkdownCodec {
    fn import(&self, bytes: &[u8], _options: &ImportOptions) -> Result<Document, ImportError> {
        let text = decode_text(bytes);
        let mut reader = MarkdownReader {
            document: Document::new(DocumentKind::Text),
            current: None,
            style: InlineStyle::empty(),
        };

        for event in Parser::new_ext(&text, Options::ENABLE_STRIKETHROUGH) {
            match event {
                Event::Start(Tag::Heading { level, .. }) => reader.start(heading_type(level)),
                Event::Start(Tag::Paragraph | Tag::Item | Tag::CodeBlock(_)) => {
                    reader.start(BlockType::Text)
                }
                Event::End(
                    TagEnd::Heading(_) | TagEnd::Paragraph | TagEnd::Item | TagEnd::CodeBlock,
                ) => reader.finish(),
                Event::Start(Tag::Strong) => reader.toggle(InlineStyle::BOLD, true),
                Event::End(TagEnd::Strong) => reader.toggle(InlineStyle::BOLD, false),
                Event::Start(Tag::Emphasis) => reader.toggle(InlineStyle::ITALIC, true),
                Event::End(TagEnd::Emphasis) => reader.toggle(InlineStyle::ITALIC, false),
                Event::Start(Tag::Strikethrough) => reader.toggle(InlineStyle::STRIKE_OUT, true),
                Event::End(TagEnd::Strikethrough) => reader.toggle(InlineStyle::STRIKE_OUT, false),
                Event::InlineHtml(html) => match html.trim().to_ascii_lowercase().as_str() {
                    "<u>" => reader.toggle(InlineStyle::UNDERLINE, true),
                    "</u>" => reader.toggle(InlineStyle::UNDERLINE, false),
                    other => debug!("Dropping inline HTML {other:?}"),
                },
                Event::Text(content) | Event::Code(content) => reader.push(&content),
                Event::SoftBreak => reader.push(" "),
                Event::HardBreak => reader.push("\n"),
                _ => {}
            }
        }
        reader.finish();
        Ok(reader.document)
    }
}

fn escape(text: &str, out: &mut String) {
    for (i, c) in text.chars().enumerate() {
        let special = matches!(c, '\\' | '*' | '_' | '~' | '<' | '>' | '[' | ']' | '`')
            || (i == 0 && matches!(c, '#' | '-' | '+' | '='));
        if special {
            out.push('\\');
        }
        if c == '\n' {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Markers for one style, outermost first.
fn markers(style: InlineStyle) -> Vec<(&'static str, &'static str)> {
    let mut markers = Vec::new();
    if style.contains(InlineStyle::UNDERLINE) {
        markers.push(("<u>", "</u>"));
    }
    if style.contains(InlineStyle::STRIKE_OUT) {
        markers.push(("~~", "~~"));
    }
    if style.contains(InlineStyle::BOLD) {
        markers.push(("**", "**"));
    }
    if style.contains(InlineStyle::ITALIC) {
        markers.push(("*", "*"));
    }
    markers
}

/// Inline text of a block. Whitespace at the edges of a styled run stays
/// outside its markers so the markers still open and close.
fn render_inline(block: &Block) -> String {
    let mut out = String::new();
    for run in block.runs() {
        let inner = run.text.trim();
        if run.style.is_empty() || inner.is_empty() {
            escape(run.text, &mut out);
            continue;
        }
        let start = run.text.len() - run.text.trim_start().len();
        let end = start + inner.len();
        let markers = markers(run.style);
        out.push_str(&run.text[..start]);
        for (open, _) in &markers {
            out.push_str(open);
        }
        escape(inner, &mut out);
        for (_, close) in markers.iter().rev() {
            out.push_str(close);
        }
        out.push_str(&run.text[end..]);
    }
    out
}

impl Exporter for MarkdownCodec {
    fn export_with(
        &self,
        document: &Document,
        _template: &Template,
        options: &ExportOptions,
    ) -> Result<Vec<u8>, ExportError> {
        let mut paragraphs = Vec::new();
        for block in document.blocks().filter(|block| !block.is_blank()) {
            options.cancel.check()?;
            let text = render_inline(block);
            paragraphs.push(match heading_level(block.block_type) {
                Some(level) => format!("{} {text}", "#".repeat(level)),
                None => text,
            });
        }
        let mut out = paragraphs.join("\n\n");
        out.push('\n');
        Ok(out.into_bytes())
    }
}
