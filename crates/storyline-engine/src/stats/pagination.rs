use log::debug;
use std::collections::BTreeMap;
use std::ops::Range;

use crate::cancel::{CancellationToken, Cancelled};
use crate::corrector::continuation::{continued_cue, more_marker};
use crate::editing::Document;
use crate::layout::{LayoutItem, LayoutPlan};
use crate::models::{BlockId, BlockType};
use crate::stats::duration;
use crate::template::Template;

/// Minimum lines of a dialogue on either side of a page break.
const MIN_SPLIT_LINES: usize = 2;

/// Something placed on a page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageItem {
    /// Lines `lines` of a block's layout
    Block {
        block_id: BlockId,
        lines: Range<usize>,
        line: usize,
    },
    /// Written after a dialogue fragment that continues on the next page
    More {
        character: String,
        text: String,
        line: usize,
    },
    /// Repeated cue before the rest of a broken dialogue
    Continued {
        character: String,
        text: String,
        line: usize,
    },
}

impl PageItem {
    /// Line of the page the item starts on, counted in body text lines.
    pub fn line(&self) -> usize {
        match self {
            PageItem::Block { line, .. }
            | PageItem::More { line, .. }
            | PageItem::Continued { line, .. } => *line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    pub items: Vec<PageItem>,
    /// Twips used on the page
    pub filled: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageTable {
    pub pages: Vec<Page>,
    /// Page index and line of the first fragment of every block
    pub index: BTreeMap<BlockId, (usize, usize)>,
    /// Estimated running time in seconds
    pub duration: f64,
    /// Page count with the last page counted by how full it is
    pub fractional_pages: f64,
}

impl PageTable {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Zero-based page index and line where a block starts.
    pub fn position(&self, id: BlockId) -> Option<(usize, usize)> {
        self.index.get(&id).copied()
    }
}

/// Break a document into pages under a template.
pub fn paginate(document: &Document, template: &Template) -> PageTable {
    let plan = template.apply(document);
    let mut paginator = Paginator::new(&plan, template);
    for (i, item) in plan.items.iter().enumerate() {
        paginator.place(item, plan.items.get(i + 1));
    }
    paginator.finish(document, template)
}

/// [`paginate`], checking `token` between blocks.
pub fn paginate_with_cancel(
    document: &Document,
    template: &Template,
    token: &CancellationToken,
) -> Result<PageTable, Cancelled> {
    token.check()?;
    let plan = template.apply(document);
    let mut paginator = Paginator::new(&plan, template);
    for (i, item) in plan.items.iter().enumerate() {
        token.check()?;
        paginator.place(item, plan.items.get(i + 1));
    }
    Ok(paginator.finish(document, template))
}

struct Paginator<'a> {
    template: &'a Template,
    height: u32,
    unit: u32,
    pages: Vec<Page>,
    cursor: u32,
    index: BTreeMap<BlockId, (usize, usize)>,
    /// Cue of the dialogue run in progress
    character: Option<String>,
}

impl<'a> Paginator<'a> {
    fn new(plan: &LayoutPlan, template: &'a Template) -> Self {
        Self {
            template,
            height: plan.page_height.max(plan.line_height),
            unit: plan.line_height.max(1),
            pages: vec![Page::default()],
            cursor: 0,
            index: BTreeMap::new(),
            character: None,
        }
    }

    fn line(&self) -> usize {
        (self.cursor / self.unit) as usize
    }

    fn current(&mut self) -> &mut Page {
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn new_page(&mut self) {
        self.current().filled = self.cursor.min(self.height);
        self.pages.push(Page::default());
        self.cursor = 0;
    }

    fn push(&mut self, item: PageItem) {
        self.current().items.push(item);
    }

    /// Room needed below `item` for the start of the next block.
    fn keep_room(item: &LayoutItem, next: Option<&LayoutItem>) -> u32 {
        match next {
            Some(next) if item.keep_with_next => {
                next.space_before + next.lines_height(next.lines.len().min(MIN_SPLIT_LINES))
            }
            _ => 0,
        }
    }

    fn place(&mut self, item: &LayoutItem, next: Option<&LayoutItem>) {
        if !item.block_type.is_dialogue_run() {
            self.character = None;
        } else if item.block_type == BlockType::Character {
            self.character = Some(item.lines.join(" "));
        }

        if self.cursor >= self.height {
            self.new_page();
        }
        if item.starts_page && self.cursor > 0 {
            self.new_page();
        }

        let mut start = 0;
        let total = item.lines.len();
        loop {
            let top = self.cursor == 0;
            let before = if top { 0 } else { item.space_before };
            let body = item.lines_height(total - start);
            let keep = Self::keep_room(item, next);
            let free = self.height.saturating_sub(self.cursor);

            let fits = before + body + keep <= free || (top && before + body <= free);
            if fits {
                self.place_lines(item, start..total, before);
                self.cursor += item.space_after;
                return;
            }

            if let Some(take) = self.dialogue_split(item, total - start, free - before.min(free)) {
                self.place_lines(item, start..start + take, before);
                start += take;
                self.continue_dialogue(item);
                continue;
            }

            if top {
                // Taller than a page: break wherever the page ends
                let take = ((free / item.line_height.max(1)) as usize).max(1);
                debug!("Force splitting {} after {take} lines", item.block_id);
                self.place_lines(item, start..start + take, 0);
                start += take;
                self.new_page();
                continue;
            }

            self.new_page();
        }
    }

    /// Lines of a dialogue to keep on this page, if it may be split here.
    fn dialogue_split(&self, item: &LayoutItem, remaining: usize, free: u32) -> Option<usize> {
        if !matches!(item.block_type, BlockType::Dialogue | BlockType::Lyrics) {
            return None;
        }
        let reserved = usize::from(more_marker(&self.template.continuation).is_some());
        let available = (free / item.line_height.max(1)) as usize;
        let take = available
            .saturating_sub(reserved)
            .min(remaining.saturating_sub(MIN_SPLIT_LINES));
        (take >= MIN_SPLIT_LINES).then_some(take)
    }

    /// Close the page after a dialogue fragment and reopen the speech.
    fn continue_dialogue(&mut self, item: &LayoutItem) {
        let character = self.character.clone().unwrap_or_default();
        let template = self.template;
        let markers = &template.continuation;
        if let (Some(more), Some(cue)) = (more_marker(markers), continued_cue(&character, markers)) {
            let more = more.to_string();
            let line = self.line();
            self.push(PageItem::More {
                character: character.clone(),
                text: more,
                line,
            });
            self.cursor += item.line_height;
            self.new_page();
            self.push(PageItem::Continued {
                character,
                text: cue,
                line: 0,
            });
            self.cursor += item.line_height;
        } else {
            self.new_page();
        }
    }

    fn place_lines(&mut self, item: &LayoutItem, lines: Range<usize>, before: u32) {
        self.cursor += before;
        let position = (self.pages.len() - 1, self.line());
        self.index.entry(item.block_id).or_insert(position);
        let count = lines.len();
        self.push(PageItem::Block {
            block_id: item.block_id,
            lines,
            line: position.1,
        });
        self.cursor += item.lines_height(count);
    }

    fn finish(mut self, document: &Document, template: &Template) -> PageTable {
        let cursor = self.cursor.min(self.height);
        self.current().filled = cursor;
        let fractional_pages = if document.is_empty() {
            0.0
        } else {
            (self.pages.len() - 1) as f64 + f64::from(cursor) / f64::from(self.height)
        };
        PageTable {
            duration: duration::estimate(document, fractional_pages, &template.duration),
            pages: self.pages,
            index: self.index,
            fractional_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentKind;
    use crate::template::{ContinuationMarkers, Margins, PageSetup, PageSize, ParagraphStyle};
    use pretty_assertions::assert_eq;

    /// Letter template with a text area exactly `lines` lines tall.
    fn template_with_lines(lines: u32) -> Template {
        let height_mm = lines as f32 * 12.0 * 25.4 / 72.0;
        Template {
            page: PageSetup {
                size: PageSize::Custom {
                    width_mm: 215.9,
                    height_mm,
                },
                margins: Margins {
                    top: 0.0,
                    bottom: 0.0,
                    left: 38.1,
                    right: 25.4,
                },
                ..PageSetup::default()
            },
            ..Template::default()
        }
    }

    /// Dialogue text that wraps to exactly `lines` lines of 35 characters.
    fn dialogue_lines(lines: usize) -> String {
        vec!["x".repeat(35); lines].join(" ")
    }

    fn markers(table: &PageTable) -> Vec<(usize, &PageItem)> {
        table
            .pages
            .iter()
            .enumerate()
            .flat_map(|(i, page)| page.items.iter().map(move |item| (i, item)))
            .filter(|(_, item)| !matches!(item, PageItem::Block { .. }))
            .collect()
    }

    #[test]
    fn test_empty_document_has_one_empty_page() {
        let doc = Document::new(DocumentKind::Screenplay);
        let table = paginate(&doc, &Template::default());
        assert_eq!(table.page_count(), 1);
        assert_eq!(table.fractional_pages, 0.0);
        assert_eq!(table.duration, 0.0);
    }

    #[test]
    fn test_short_script_fits_on_one_page() {
        let doc = Document::from_blocks(
            DocumentKind::Screenplay,
            [
                (BlockType::SceneHeading, "INT. HOUSE - DAY"),
                (BlockType::Character, "JOHN"),
                (BlockType::Dialogue, "Hello there."),
            ],
        );
        let table = paginate(&doc, &Template::default());

        assert_eq!(table.page_count(), 1);
        let ids: Vec<_> = doc.blocks().map(|b| b.id).collect();
        // Heading at the top, character after one blank line, dialogue under it
        assert_eq!(table.position(ids[0]), Some((0, 0)));
        assert_eq!(table.position(ids[1]), Some((0, 2)));
        assert_eq!(table.position(ids[2]), Some((0, 3)));
    }

    #[test]
    fn test_long_dialogue_gets_more_and_continued() {
        // Given a ten-line page with a cue and an eight-line speech below some action
        let template = template_with_lines(10);
        let doc = Document::from_blocks(
            DocumentKind::Screenplay,
            [
                (BlockType::Action, "Rain.".to_string()),
                (BlockType::Character, "JOHN".to_string()),
                (BlockType::Dialogue, dialogue_lines(8)),
            ],
        );

        // When paginated
        let table = paginate(&doc, &template);

        // Then the speech breaks with MORE at the bottom and the cue repeated on top
        assert_eq!(table.page_count(), 2);
        assert_eq!(
            markers(&table),
            vec![
                (
                    0,
                    &PageItem::More {
                        character: "JOHN".to_string(),
                        text: "(MORE)".to_string(),
                        line: 9,
                    }
                ),
                (
                    1,
                    &PageItem::Continued {
                        character: "JOHN".to_string(),
                        text: "JOHN (CONT'D)".to_string(),
                        line: 0,
                    }
                ),
            ]
        );
        let dialogue = doc.blocks().nth(2).map(|b| b.id);
        let fragments: Vec<_> = table
            .pages
            .iter()
            .flat_map(|p| &p.items)
            .filter_map(|item| match item {
                PageItem::Block { block_id, lines, .. } if Some(*block_id) == dialogue => {
                    Some(lines.clone())
                }
                _ => None,
            })
            .collect();
        assert_eq!(fragments, vec![0..6, 6..8]);
    }

    #[test]
    fn test_dialogue_without_room_for_two_lines_moves_whole() {
        // Given a three-line speech with two lines left on the page
        let template = template_with_lines(10);
        let doc = Document::from_blocks(
            DocumentKind::Screenplay,
            [
                (BlockType::Action, "1\n2\n3\n4\n5\n6".to_string()),
                (BlockType::Character, "JOHN".to_string()),
                (BlockType::Dialogue, dialogue_lines(3)),
            ],
        );

        let table = paginate(&doc, &template);

        // Then it cannot keep two lines on each side and moves to the next page
        assert!(markers(&table).is_empty());
        let speech = doc.blocks().nth(2).map(|b| b.id).unwrap();
        assert_eq!(table.position(speech), Some((1, 0)));
    }

    #[test]
    fn test_cue_moves_when_its_speech_cannot_start() {
        // Given a cue that fits but leaves no room for the first dialogue lines
        let template = template_with_lines(10);
        let doc = Document::from_blocks(
            DocumentKind::Screenplay,
            [
                (BlockType::Action, "1\n2\n3\n4\n5\n6\n7".to_string()),
                (BlockType::Character, "JOHN".to_string()),
                (BlockType::Dialogue, dialogue_lines(4)),
            ],
        );

        let table = paginate(&doc, &template);

        // Then the cue starts the next page
        assert!(markers(&table).is_empty());
        let cue = doc.blocks().nth(1).map(|b| b.id).unwrap();
        assert_eq!(table.position(cue), Some((1, 0)));
    }

    #[test]
    fn test_disabled_markers_still_split() {
        let template = Template {
            continuation: ContinuationMarkers {
                enabled: false,
                ..ContinuationMarkers::default()
            },
            ..template_with_lines(10)
        };
        let doc = Document::from_blocks(
            DocumentKind::Screenplay,
            [
                (BlockType::Action, "Rain.".to_string()),
                (BlockType::Character, "JOHN".to_string()),
                (BlockType::Dialogue, dialogue_lines(9)),
            ],
        );

        let table = paginate(&doc, &template);

        assert!(markers(&table).is_empty());
        assert_eq!(table.page_count(), 2);
    }

    #[test]
    fn test_scene_heading_is_kept_with_following_block() {
        // Given a heading that would land on the last line of the page
        let template = template_with_lines(10);
        let doc = Document::from_blocks(
            DocumentKind::Screenplay,
            [
                (BlockType::Action, "1\n2\n3\n4\n5\n6\n7".to_string()),
                (BlockType::SceneHeading, "INT. HOUSE - DAY".to_string()),
                (BlockType::Action, "Rain.".to_string()),
            ],
        );

        let table = paginate(&doc, &template);

        let heading = doc.blocks().nth(1).map(|b| b.id).unwrap();
        assert_eq!(table.position(heading), Some((1, 0)));
    }

    #[test]
    fn test_exact_fit_does_not_leave_blank_page() {
        // Given a block that fills the page exactly and a block that starts a new page
        let mut template = template_with_lines(4);
        template.styles.retain(|s| s.block_type != BlockType::ActHeading);
        template.styles.push(ParagraphStyle {
            block_type: BlockType::ActHeading,
            starts_new_page: true,
            ..ParagraphStyle::default()
        });
        let doc = Document::from_blocks(
            DocumentKind::Screenplay,
            [
                (BlockType::Action, "1\n2\n3\n4"),
                (BlockType::ActHeading, "ACT TWO"),
            ],
        );

        let table = paginate(&doc, &template);

        // Then the act starts on the second page, not the third
        assert_eq!(table.page_count(), 2);
        let act = doc.blocks().nth(1).map(|b| b.id).unwrap();
        assert_eq!(table.position(act), Some((1, 0)));
    }

    #[test]
    fn test_block_taller_than_page_is_broken() {
        let template = template_with_lines(3);
        let doc = Document::from_blocks(
            DocumentKind::Screenplay,
            [(BlockType::Action, "1\n2\n3\n4\n5\n6\n7")],
        );

        let table = paginate(&doc, &template);

        assert_eq!(table.page_count(), 3);
    }

    #[test]
    fn test_every_continued_follows_a_more_for_the_same_character() {
        let template = template_with_lines(12);
        let mut doc = Document::new(DocumentKind::Screenplay);
        for name in ["JOHN", "MARY", "JOHN"] {
            doc.push(BlockType::Character, name);
            doc.push(BlockType::Dialogue, dialogue_lines(15));
            doc.push(BlockType::Action, "Beat.");
        }

        let table = paginate(&doc, &template);

        for (i, page) in table.pages.iter().enumerate() {
            if let Some(PageItem::Continued { character, .. }) = page.items.first() {
                let previous = table.pages[i - 1].items.last();
                assert!(
                    matches!(previous, Some(PageItem::More { character: c, .. }) if c == character),
                    "page {i}"
                );
            }
        }
        assert!(!markers(&table).is_empty());
    }

    #[test]
    fn test_paginate_is_pure() {
        let doc = Document::from_blocks(
            DocumentKind::Screenplay,
            [
                (BlockType::Character, "JOHN".to_string()),
                (BlockType::Dialogue, dialogue_lines(70)),
            ],
        );
        let template = Template::default();
        assert_eq!(paginate(&doc, &template), paginate(&doc, &template));
    }

    #[test]
    fn test_cancelled_pagination_returns_nothing() {
        let doc = Document::from_blocks(DocumentKind::Screenplay, [(BlockType::Action, "Rain.")]);
        let token = CancellationToken::new();
        token.cancel();

        let result = paginate_with_cancel(&doc, &Template::default(), &token);

        assert_eq!(result, Err(Cancelled));
    }
}
