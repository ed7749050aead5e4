//! Fixed-pitch text pages.
//!
//! Export renders the paginated layout: indents as spaces, one form feed
//! and a page number line between pages, MORE and CONT'D markers where a
//! speech breaks. Import reads indentation back and classifies paragraphs
//! with [`heuristics`](crate::codecs::heuristics).

use log::debug;

use crate::codecs::heuristics::{ParagraphFacts, classify_from_margin, clean_text};
use crate::codecs::{
    ExportError, ExportOptions, Exporter, ImportError, ImportOptions, Importer, decode_text,
};
use crate::editing::Document;
use crate::layout::{LayoutItem, LayoutPlan};
use crate::models::Alignment;
use crate::stats::{PageItem, PageTable, paginate};
use crate::template::{ContinuationMarkers, Template};

/// Width of one Courier 12 character, in millimetres.
const CHAR_WIDTH_MM: f32 = 2.54;
/// A line whose last character reaches this column is right aligned.
const RIGHT_EDGE: usize = 58;
const RIGHT_MIN_INDENT: usize = 30;
const PAGE_BREAK: char = '\u{c}';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlainTextCodec;

struct Paragraph {
    text: String,
    indent: usize,
    right: bool,
}

impl Importer for PlainTextCodec {
    fn import(&self, bytes: &[u8], options: &ImportOptions) -> Result<Document, ImportError> {
        let text = decode_text(bytes);
        let markers = ContinuationMarkers::default();

        let mut paragraphs: Vec<Option<Paragraph>> = Vec::new();
        let mut after_break = false;
        for raw in text.split('\n') {
            options.cancel.check()?;
            if raw.starts_with(PAGE_BREAK) {
                after_break = true;
                continue;
            }
            let line = raw.trim_end();
            let content = line.trim_start();
            if content.is_empty() {
                paragraphs.push(None);
                continue;
            }
            if content == markers.more
                || (after_break && content.ends_with(markers.continued.as_str()))
            {
                debug!("Skipping continuation marker {content:?}");
                after_break = false;
                continue;
            }
            after_break = false;

            let indent = line.chars().take_while(|c| *c == ' ').count();
            let right =
                indent >= RIGHT_MIN_INDENT && indent + content.chars().count() >= RIGHT_EDGE;
            if let Some(Some(last)) = paragraphs.last_mut()
                && !right
                && !last.right
                && last.indent == indent
            {
                last.text.push(' ');
                last.text.push_str(content);
                continue;
            }
            paragraphs.push(Some(Paragraph {
                text: content.to_string(),
                indent,
                right,
            }));
        }

        let mut facts: Vec<ParagraphFacts> = paragraphs
            .iter()
            .map(|paragraph| match paragraph {
                Some(p) if p.right => ParagraphFacts {
                    alignment: Alignment::Right,
                    ..ParagraphFacts::new(&p.text)
                },
                Some(p) => ParagraphFacts {
                    left_indent_mm: p.indent as f32 * CHAR_WIDTH_MM,
                    ..ParagraphFacts::new(&p.text)
                },
                None => ParagraphFacts::new(""),
            })
            .collect();
        let types = classify_from_margin(&mut facts, &options.dictionaries);

        let mut document = Document::new(options.kind);
        for (paragraph, block_type) in paragraphs.iter().zip(types) {
            if let (Some(paragraph), Some(block_type)) = (paragraph, block_type) {
                document.push(block_type, clean_text(block_type, &paragraph.text));
            }
        }
        document.bind_kind();
        Ok(document)
    }
}

impl Exporter for PlainTextCodec {
    fn export_with(
        &self,
        document: &Document,
        template: &Template,
        options: &ExportOptions,
    ) -> Result<Vec<u8>, ExportError> {
        let plan = template.apply(document);
        options.cancel.check()?;
        let table = paginate(document, template);
        options.cancel.check()?;
        Ok(render_pages(&plan, &table, template).into_bytes())
    }
}

fn render_pages(plan: &LayoutPlan, table: &PageTable, template: &Template) -> String {
    let body = template.resolve(template.kind.default_block_type());
    let width = body.chars_per_line(template.text_width_mm(), template.two_columns);
    let cue = template.resolve(crate::models::BlockType::Character);
    let cue_indent = cue.indent_chars(template.two_columns);

    let mut out = String::new();
    for (index, page) in table.pages.iter().enumerate() {
        if index > 0 {
            let number = format!("{}.", template.page.first_page_number as usize + index);
            out.push(PAGE_BREAK);
            out.push_str(&format!("{number:>width$}\n"));
        }

        let mut line = 0;
        for item in &page.items {
            while line < item.line() {
                out.push('\n');
                line += 1;
            }
            match item {
                PageItem::Block {
                    block_id, lines, ..
                } => {
                    let Some(layout) = plan.item(*block_id) else {
                        continue;
                    };
                    for i in lines.clone() {
                        let mut text = layout.lines[i].clone();
                        if i == 0
                            && let Some(number) = &layout.number
                        {
                            text = format!("{number} {text}");
                        }
                        out.push_str(&aligned(layout, &text));
                        out.push('\n');
                        line += 1;
                    }
                }
                PageItem::More { text, .. } | PageItem::Continued { text, .. } => {
                    out.push_str(&format!("{}{text}\n", " ".repeat(cue_indent)));
                    line += 1;
                }
            }
        }
    }
    out
}

fn aligned(item: &LayoutItem, text: &str) -> String {
    let len = text.chars().count();
    let pad = match item.alignment {
        Alignment::Right => (item.indent_chars + item.width_chars).saturating_sub(len),
        Alignment::Center => item.indent_chars + item.width_chars.saturating_sub(len) / 2,
        Alignment::Left | Alignment::Justify => item.indent_chars,
    };
    format!("{}{text}", " ".repeat(pad))
}
