//! # Layout
//!
//! [`Template::apply`] turns a [`Document`] into a [`LayoutPlan`]: every
//! block with its resolved style, wrapped lines, vertical size in twips,
//! page-break hints and numbering. The plan is the input of pagination and
//! of the page-oriented exporters.
//!
//! Applying a template is a pure function of the document and the template.

pub mod wrap;

use std::collections::HashMap;
use std::sync::Arc;

use crate::editing::Document;
use crate::models::{Alignment, Block, BlockId, BlockType};
use crate::template::{ParagraphStyle, Template};

pub use wrap::wrap;

/// One block, laid out.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutItem {
    pub block_id: BlockId,
    pub block_type: BlockType,
    pub style: Arc<ParagraphStyle>,
    pub alignment: Alignment,
    /// Wrapped text, with forced uppercase already applied
    pub lines: Vec<String>,
    /// Twips per line
    pub line_height: u32,
    /// Twips of empty space above the first line
    pub space_before: u32,
    pub space_after: u32,
    pub starts_page: bool,
    /// Must share a page with the start of the following block
    pub keep_with_next: bool,
    /// Scene number for scene headings, panel or page number in comics
    pub number: Option<String>,
    pub dialogue_number: Option<u32>,
    pub indent_chars: usize,
    pub width_chars: usize,
}

impl LayoutItem {
    /// Height of `count` text lines.
    pub fn lines_height(&self, count: usize) -> u32 {
        self.line_height * count as u32
    }

    /// Full height including the space around the block.
    pub fn height(&self) -> u32 {
        self.space_before + self.lines_height(self.lines.len()) + self.space_after
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPlan {
    pub items: Vec<LayoutItem>,
    /// Usable text height of one page, in twips
    pub page_height: u32,
    /// Twips of one line of body text, the unit of page line numbers
    pub line_height: u32,
}

impl LayoutPlan {
    pub fn item(&self, id: BlockId) -> Option<&LayoutItem> {
        self.items.iter().find(|item| item.block_id == id)
    }
}

#[derive(Default)]
struct Counters {
    scene: u32,
    dialogue: u32,
    page: u32,
    panel: u32,
}

impl Template {
    /// Lay out the whole document.
    pub fn apply(&self, document: &Document) -> LayoutPlan {
        let mut styles: HashMap<BlockType, Arc<ParagraphStyle>> = HashMap::new();
        let mut counters = Counters::default();
        let area = self.text_width_mm();

        let items = document
            .blocks()
            .map(|block| {
                let style = styles
                    .entry(block.block_type)
                    .or_insert_with(|| Arc::new(self.resolve(block.block_type)))
                    .clone();
                let (number, dialogue_number) = self.number(block, &mut counters);
                self.layout_block(block, style, area, number, dialogue_number)
            })
            .collect();

        LayoutPlan {
            items,
            page_height: self.page.text_height_twips(),
            line_height: self
                .resolve(self.kind.default_block_type())
                .line_height_twips(),
        }
    }

    fn number(&self, block: &Block, counters: &mut Counters) -> (Option<String>, Option<u32>) {
        let numbering = &self.numbering;
        match block.block_type {
            BlockType::ActHeading if !numbering.continue_through_document => {
                *counters = Counters::default();
                (None, None)
            }
            BlockType::SceneHeading if numbering.scene_numbers => {
                counters.scene += 1;
                let n = numbering.scene_start + counters.scene - 1;
                let label = format!("{}{}{}", numbering.scene_prefix, n, numbering.scene_suffix);
                (Some(label), None)
            }
            BlockType::Character if numbering.dialogue_numbers => {
                counters.dialogue += 1;
                (None, Some(counters.dialogue))
            }
            BlockType::Page => {
                counters.page += 1;
                counters.panel = 0;
                (Some(counters.page.to_string()), None)
            }
            BlockType::Panel => {
                counters.panel += 1;
                (Some(counters.panel.to_string()), None)
            }
            _ => (None, None),
        }
    }

    fn layout_block(
        &self,
        block: &Block,
        style: Arc<ParagraphStyle>,
        area: f32,
        number: Option<String>,
        dialogue_number: Option<u32>,
    ) -> LayoutItem {
        let formatting = block.formatting.as_ref();
        let uppercase = formatting
            .and_then(|f| f.uppercase)
            .unwrap_or(style.uppercase);
        let alignment = formatting
            .and_then(|f| f.alignment)
            .unwrap_or(style.alignment);

        let width_chars = style.chars_per_line(area, self.two_columns);
        let text = if uppercase {
            block.text.to_uppercase()
        } else {
            block.text.clone()
        };
        let line_height = style.line_height_twips();

        LayoutItem {
            block_id: block.id,
            block_type: block.block_type,
            alignment,
            lines: wrap(&text, width_chars),
            line_height,
            space_before: style.lines_before * line_height,
            space_after: style.lines_after * line_height,
            starts_page: style.starts_new_page,
            keep_with_next: block.block_type.is_heading_like()
                || block.block_type == BlockType::Parenthetical,
            number,
            dialogue_number,
            indent_chars: style.indent_chars(self.two_columns),
            width_chars,
            style,
        }
    }
}
