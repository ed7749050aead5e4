//! Final Draft XML (`.fdx`).

use log::debug;
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::codecs::heuristics::StyledText;
use crate::codecs::xml::{XmlOut, attr, read_failure, text};
use crate::codecs::{
    ExportError, ExportOptions, Exporter, ImportError, ImportOptions, Importer, decode_text,
};
use crate::editing::Document;
use crate::models::{Alignment, BlockType, FormattingOverride, InlineStyle};
use crate::template::Template;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FdxCodec;

/// Paragraph type names Final Draft uses for our block types.
const TYPE_NAMES: [(BlockType, &str); 11] = [
    (BlockType::SceneHeading, "Scene Heading"),
    (BlockType::SceneCharacters, "Cast List"),
    (BlockType::Action, "Action"),
    (BlockType::Character, "Character"),
    (BlockType::Parenthetical, "Parenthetical"),
    (BlockType::Dialogue, "Dialogue"),
    (BlockType::Lyrics, "Lyrics"),
    (BlockType::Shot, "Shot"),
    (BlockType::Transition, "Transition"),
    (BlockType::UnformattedText, "General"),
    (BlockType::ActHeading, "New Act"),
];

fn type_name(block_type: BlockType) -> String {
    match TYPE_NAMES.iter().find(|(t, _)| *t == block_type) {
        Some((_, name)) => name.to_string(),
        None => block_type
            .as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn block_type(name: &str) -> BlockType {
    TYPE_NAMES
        .iter()
        .find(|(_, n)| n.eq_ignore_ascii_case(name))
        .map(|(t, _)| *t)
        .or_else(|| BlockType::from_name(name))
        .unwrap_or_else(|| {
            debug!("Unknown paragraph type {name:?}, reading as action");
            BlockType::Action
        })
}

fn parse_style(value: &str) -> InlineStyle {
    value
        .split('+')
        .fold(InlineStyle::empty(), |style, part| match part.trim() {
            "Bold" => style | InlineStyle::BOLD,
            "Italic" => style | InlineStyle::ITALIC,
            "Underline" => style | InlineStyle::UNDERLINE,
            "Strikeout" => style | InlineStyle::STRIKE_OUT,
            _ => style,
        })
}

fn style_value(style: InlineStyle) -> String {
    let mut parts = Vec::new();
    if style.contains(InlineStyle::BOLD) {
        parts.push("Bold");
    }
    if style.contains(InlineStyle::ITALIC) {
        parts.push("Italic");
    }
    if style.contains(InlineStyle::UNDERLINE) {
        parts.push("Underline");
    }
    if style.contains(InlineStyle::STRIKE_OUT) {
        parts.push("Strikeout");
    }
    parts.join("+")
}

fn parse_alignment(value: &str) -> Option<Alignment> {
    match value {
        "Left" => Some(Alignment::Left),
        "Center" => Some(Alignment::Center),
        "Right" => Some(Alignment::Right),
        "Full" => Some(Alignment::Justify),
        _ => None,
    }
}

fn alignment_value(alignment: Alignment) -> &'static str {
    match alignment {
        Alignment::Left => "Left",
        Alignment::Center => "Center",
        Alignment::Right => "Right",
        Alignment::Justify => "Full",
    }
}

struct OpenParagraph {
    block_type: BlockType,
    alignment: Option<Alignment>,
    text: StyledText,
}

impl Importer for FdxCodec {
    fn import(&self, bytes: &[u8], options: &ImportOptions) -> Result<Document, ImportError> {
        let input = decode_text(bytes);
        let mut reader = Reader::from_str(&input);
        let mut document = Document::new(options.kind);

        let mut depth = 0usize;
        let mut seen_root = false;
        let mut title_page_depth = 0usize;
        let mut paragraph: Option<OpenParagraph> = None;
        let mut run_style: Option<InlineStyle> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| read_failure(&e, reader.buffer_position(), input.len()))?;
            match event {
                Event::Start(element) => {
                    depth += 1;
                    match element.name().as_ref() {
                        b"FinalDraft" => seen_root = true,
                        _ if !seen_root => {
                            return Err(ImportError::UnsupportedFormatVariant(
                                "missing FinalDraft root element".to_string(),
                            ));
                        }
                        b"TitlePage" => title_page_depth = depth,
                        b"Paragraph" if title_page_depth == 0 => {
                            paragraph = Some(OpenParagraph {
                                block_type: attr(&element, "Type")
                                    .map_or(BlockType::Action, |name| block_type(&name)),
                                alignment: attr(&element, "Alignment")
                                    .and_then(|a| parse_alignment(&a)),
                                text: StyledText::default(),
                            });
                        }
                        b"Text" if paragraph.is_some() => {
                            run_style = Some(
                                attr(&element, "Style").map_or(InlineStyle::empty(), |s| parse_style(&s)),
                            );
                        }
                        _ => {}
                    }
                }
                Event::Empty(element) => {
                    if !seen_root && element.name().as_ref() != b"FinalDraft" {
                        return Err(ImportError::UnsupportedFormatVariant(
                            "missing FinalDraft root element".to_string(),
                        ));
                    }
                    if element.name().as_ref() == b"Paragraph" && title_page_depth == 0 {
                        let block_type = attr(&element, "Type")
                            .map_or(BlockType::Action, |name| block_type(&name));
                        document.push(block_type, "");
                    }
                }
                Event::Text(content) => {
                    if let (Some(style), Some(open)) = (run_style, paragraph.as_mut()) {
                        open.text.push(&text(&content), style);
                    }
                }
                Event::CData(content) => {
                    if let (Some(style), Some(open)) = (run_style, paragraph.as_mut()) {
                        open.text.push(&String::from_utf8_lossy(&content), style);
                    }
                }
                Event::End(element) => {
                    depth = depth.saturating_sub(1);
                    match element.name().as_ref() {
                        b"TitlePage" => title_page_depth = 0,
                        b"Text" => run_style = None,
                        b"Paragraph" => {
                            options.cancel.check()?;
                            if let Some(open) = paragraph.take() {
                                let block = open.text.push_to(&mut document, open.block_type);
                                if let Some(alignment) = open.alignment {
                                    block.formatting = Some(FormattingOverride {
                                        alignment: Some(alignment),
                                        ..FormattingOverride::default()
                                    });
                                }
                            }
                        }
                        _ => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !seen_root {
            return Err(ImportError::UnsupportedFormatVariant(
                "missing FinalDraft root element".to_string(),
            ));
        }
        if depth > 0 {
            return Err(ImportError::UnexpectedEndOfFile {
                offset: input.len(),
            });
        }
        document.bind_kind();
        Ok(document)
    }
}

impl Exporter for FdxCodec {
    fn export_with(
        &self,
        document: &Document,
        _template: &Template,
        options: &ExportOptions,
    ) -> Result<Vec<u8>, ExportError> {
        let mut out = XmlOut::new();
        out.declaration(false)?;
        out.open(
            "FinalDraft",
            &[("DocumentType", "Script"), ("Template", "No"), ("Version", "5")],
        )?;
        out.open("Content", &[])?;
        for block in document.blocks() {
            options.cancel.check()?;
            let name = type_name(block.block_type);
            let alignment = block
                .formatting
                .as_ref()
                .and_then(|f| f.alignment)
                .map(alignment_value);
            let mut attrs = vec![("Type", name.as_str())];
            if let Some(alignment) = alignment {
                attrs.push(("Alignment", alignment));
            }
            out.open("Paragraph", &attrs)?;
            for run in block.runs() {
                let style = style_value(run.style);
                if style.is_empty() {
                    out.element("Text", &[], run.text)?;
                } else {
                    out.element("Text", &[("Style", style.as_str())], run.text)?;
                }
            }
            out.close("Paragraph")?;
        }
        out.close("Content")?;

        let entries = document.metadata.title_page.entries();
        if !entries.is_empty() {
            out.open("TitlePage", &[])?;
            out.open("Content", &[])?;
            for (_, value) in entries {
                for line in value.lines() {
                    out.open("Paragraph", &[("Alignment", "Center")])?;
                    out.element("Text", &[], line)?;
                    out.close("Paragraph")?;
                }
            }
            out.close("Content")?;
            out.close("TitlePage")?;
        }
        out.close("FinalDraft")?;
        Ok(out.into_bytes())
    }
}
