//! Scenario XML of legacy KIT Scenarist projects. Import only.
//!
//! ```xml
//! <scenario version="1.0">
//!   <scene_heading><v><![CDATA[INT. HOUSE - DAY]]></v>
//!     <reviews>
//!       <review from="0" length="4" color="#ff0000" bgcolor="#ffff00" is_done="false">
//!         <review_comment author="Anna"><![CDATA[Night?]]></review_comment>
//!       </review>
//!     </reviews>
//!     <formats><format from="5" length="5" bold="true"/></formats>
//!   </scene_heading>
//! </scenario>
//! ```
//!
//! Every element holding a `<v>` value is one block, named after its type.
//! Offsets count characters of the value.

use log::debug;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::codecs::xml::{attr, is_truthy, read_failure, text};
use crate::codecs::{ImportError, ImportOptions, Importer, decode_text};
use crate::editing::Document;
use crate::models::{BlockType, DocumentKind, DraftInfo, InlineStyle, ReviewMark};

const APPLICATION: &str = "KIT Scenarist";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KitScenaristCodec;

const TAGS: [(&str, BlockType); 16] = [
    ("scene_heading", BlockType::SceneHeading),
    ("scene_characters", BlockType::SceneCharacters),
    ("action", BlockType::Action),
    ("character", BlockType::Character),
    ("parenthetical", BlockType::Parenthetical),
    ("dialog", BlockType::Dialogue),
    ("dialogue", BlockType::Dialogue),
    ("transition", BlockType::Transition),
    ("note", BlockType::InlineNote),
    ("title", BlockType::Title),
    ("noprintable_text", BlockType::UnformattedText),
    ("folder_header", BlockType::SequenceHeading),
    ("folder_footer", BlockType::SequenceFooter),
    ("scene_description", BlockType::Synopsis),
    ("lyrics", BlockType::Lyrics),
    ("shot", BlockType::Shot),
];

fn block_type(tag: &str) -> BlockType {
    TAGS.iter()
        .find(|(name, _)| *name == tag)
        .map(|(_, block_type)| *block_type)
        .or_else(|| BlockType::from_name(tag))
        .unwrap_or_else(|| {
            debug!("Unknown scenario tag <{tag}>, reading it as action");
            BlockType::Action
        })
}

/// `true` only when the attribute is present and truthy.
fn flag(element: &BytesStart, name: &str) -> bool {
    attr(element, name).is_some_and(|v| is_truthy(Some(&v)))
}

fn offset(element: &BytesStart, name: &str) -> usize {
    attr(element, name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

#[derive(Default)]
struct PendingBlock {
    tag: String,
    text: String,
    formats: Vec<(usize, usize, InlineStyle)>,
    reviews: Vec<ReviewMark>,
}

enum Capture {
    None,
    Value,
    Comment,
}

struct ScenarioReader {
    document: Document,
    block: Option<PendingBlock>,
    review: Option<ReviewMark>,
    capture: Capture,
}

impl ScenarioReader {
    fn open(&mut self, element: &BytesStart, empty: bool) {
        let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
        match name.as_str() {
            "scenario" | "reviews" | "formats" => {}
            "v" if !empty => self.capture = Capture::Value,
            "review" => {
                let from = offset(element, "from");
                let length = offset(element, "length");
                let color = attr(element, "color").unwrap_or_else(|| "#000000".to_string());
                let mut mark = ReviewMark::new(from..from.saturating_add(length), &color, "");
                mark.background = attr(element, "bgcolor");
                mark.resolved = flag(element, "is_done");
                if empty {
                    self.push_review(mark);
                } else {
                    self.review = Some(mark);
                }
            }
            "review_comment" => {
                if let Some(review) = self.review.as_mut() {
                    if review.author.is_empty() {
                        review.author = attr(element, "author").unwrap_or_default();
                    }
                    if !empty {
                        self.capture = Capture::Comment;
                    }
                }
            }
            "format" => {
                let from = offset(element, "from");
                let length = offset(element, "length");
                let mut style = InlineStyle::empty();
                style.set(InlineStyle::BOLD, flag(element, "bold"));
                style.set(InlineStyle::ITALIC, flag(element, "italic"));
                style.set(InlineStyle::UNDERLINE, flag(element, "underline"));
                style.set(InlineStyle::STRIKE_OUT, flag(element, "strikeout"));
                if let Some(block) = self.block.as_mut() {
                    block.formats.push((from, from.saturating_add(length), style));
                }
            }
            _ if self.block.is_none() => {
                self.block = Some(PendingBlock {
                    tag: name.clone(),
                    ..PendingBlock::default()
                });
                if empty {
                    self.finish_block();
                }
            }
            _ => debug!("Skipping <{name}> inside a block"),
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"v" | b"review_comment" => self.capture = Capture::None,
            b"review" => {
                if let Some(review) = self.review.take() {
                    self.push_review(review);
                }
            }
            name if self
                .block
                .as_ref()
                .is_some_and(|block| block.tag.as_bytes() == name) =>
            {
                self.finish_block()
            }
            _ => {}
        }
    }

    fn capture(&mut self, content: &str) {
        match self.capture {
            Capture::Value => {
                if let Some(block) = self.block.as_mut() {
                    block.text.push_str(content);
                }
            }
            Capture::Comment => {
                if let Some(review) = self.review.as_mut() {
                    let comment = review.comment.get_or_insert_with(String::new);
                    if !comment.is_empty() {
                        comment.push('\n');
                    }
                    comment.push_str(content);
                }
            }
            Capture::None => {}
        }
    }

    fn push_review(&mut self, review: ReviewMark) {
        if let Some(block) = self.block.as_mut() {
            block.reviews.push(review);
        }
    }

    fn finish_block(&mut self) {
        let Some(pending) = self.block.take() else {
            return;
        };
        let block = self.document.push(block_type(&pending.tag), pending.text);
        let len = block.char_len();
        for (start, end, style) in pending.formats {
            block.add_format(start.min(len)..end.min(len), style);
        }
        for mut review in pending.reviews {
            review.range = review.range.start.min(len)..review.range.end.min(len);
            if !review.range.is_empty() {
                block.review_marks.push(review);
            }
        }
        block.coalesce_review_marks();
    }
}

impl Importer for KitScenaristCodec {
    fn import(&self, bytes: &[u8], options: &ImportOptions) -> Result<Document, ImportError> {
        let xml = decode_text(bytes);
        let mut reader = Reader::from_str(&xml);
        let mut scenario = ScenarioReader {
            document: Document::new(DocumentKind::Screenplay),
            block: None,
            review: None,
            capture: Capture::None,
        };
        let mut depth = 0usize;
        let mut seen_root = false;

        loop {
            options.cancel.check()?;
            let event = reader
                .read_event()
                .map_err(|e| read_failure(&e, reader.buffer_position(), xml.len()))?;
            let is_start = matches!(event, Event::Start(_));
            match event {
                Event::Start(element) | Event::Empty(element) if !seen_root => {
                    if element.name().as_ref() != b"scenario" {
                        return Err(ImportError::UnsupportedFormatVariant(format!(
                            "expected <scenario>, found <{}>",
                            String::from_utf8_lossy(element.name().as_ref())
                        )));
                    }
                    seen_root = true;
                    if is_start {
                        depth += 1;
                    }
                }
                Event::Start(element) => {
                    depth += 1;
                    scenario.open(&element, false);
                }
                Event::Empty(element) => scenario.open(&element, true),
                Event::End(element) => {
                    depth = depth.saturating_sub(1);
                    scenario.close(element.name().as_ref());
                }
                Event::Text(content) => scenario.capture(&text(&content)),
                Event::CData(content) => scenario.capture(&String::from_utf8_lossy(&content)),
                Event::Eof => break,
                _ => {}
            }
        }

        if depth > 0 {
            return Err(ImportError::UnexpectedEndOfFile { offset: xml.len() });
        }
        if !seen_root {
            return Err(ImportError::UnsupportedFormatVariant(
                "no <scenario> element".to_string(),
            ));
        }

        let mut document = scenario.document;
        document.bind_kind();
        document.metadata.draft = Some(DraftInfo::imported_from(APPLICATION));
        Ok(document)
    }
}
