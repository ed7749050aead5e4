//! Celtx projects. Import only.
//!
//! A project is a zip holding one `script-<id>.html` per script next to
//! `project.rdf`. The script is loose HTML where every paragraph names its
//! type through a class:
//!
//! ```html
//! <p class="sceneheading">INT. HOUSE - DAY</p>
//! <p class="character">JOHN</p>
//! <p class="dialog">Where <i>were</i> you?<br>I waited.</p>
//! ```
//!
//! Tags are not always closed, so end names are not checked.

use log::debug;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, BytesText, Event};

use crate::cancel::CancellationToken;
use crate::codecs::archive::ArchiveReader;
use crate::codecs::heuristics::StyledText;
use crate::codecs::xml::{attr, read_failure};
use crate::codecs::{ImportError, ImportOptions, Importer};
use crate::editing::Document;
use crate::models::{BlockType, InlineStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CeltxCodec;

const SCRIPT_PREFIX: &str = "script-";
const SCRIPT_SUFFIX: &str = ".html";

fn block_type(class: &str) -> BlockType {
    match class {
        "sceneheading" => BlockType::SceneHeading,
        "action" => BlockType::Action,
        "character" => BlockType::Character,
        "parenthetical" => BlockType::Parenthetical,
        "dialog" => BlockType::Dialogue,
        "transition" => BlockType::Transition,
        "shot" => BlockType::Shot,
        _ => {
            debug!("Unknown paragraph class {class:?}, reading as action");
            BlockType::Action
        }
    }
}

fn inline_style(name: &[u8]) -> Option<InlineStyle> {
    match name {
        b"b" | b"strong" => Some(InlineStyle::BOLD),
        b"i" | b"em" => Some(InlineStyle::ITALIC),
        b"u" => Some(InlineStyle::UNDERLINE),
        b"s" | b"strike" => Some(InlineStyle::STRIKE_OUT),
        _ => None,
    }
}

/// HTML text with `&nbsp;` read as a plain space.
fn html_text(content: &BytesText) -> String {
    let resolved = content.unescape_with(|entity| match entity {
        "nbsp" => Some(" "),
        _ => None,
    });
    match resolved {
        Ok(text) => text.into_owned(),
        Err(_) => String::from_utf8_lossy(content).into_owned(),
    }
}

struct OpenParagraph {
    block_type: BlockType,
    text: StyledText,
    spans: Vec<InlineStyle>,
    /// Style of whitespace seen since the last character, written as one
    /// space before the next one
    pending_space: Option<InlineStyle>,
}

impl OpenParagraph {
    fn new(element: &BytesStart) -> Self {
        let class = attr(element, "class").unwrap_or_default();
        let class = class.split_whitespace().next().unwrap_or_default();
        Self {
            block_type: block_type(&class.to_ascii_lowercase()),
            text: StyledText::default(),
            spans: Vec::new(),
            pending_space: None,
        }
    }

    fn style(&self) -> InlineStyle {
        self.spans
            .iter()
            .fold(InlineStyle::empty(), |acc, style| acc | *style)
    }

    fn push_text(&mut self, content: &str) {
        let style = self.style();
        for c in content.chars() {
            if c.is_whitespace() {
                self.pending_space.get_or_insert(style);
                continue;
            }
            if let Some(space_style) = self.pending_space.take()
                && !self.text.is_empty()
                && !self.text.text.ends_with('\n')
            {
                self.text.push_char(' ', space_style);
            }
            self.text.push_char(c, style);
        }
    }

    fn line_break(&mut self) {
        self.text.push_char('\n', InlineStyle::empty());
        self.pending_space = None;
    }
}

/// Name of the script entry. Projects with several scripts import the
/// first by name.
fn script_entry(archive: &ArchiveReader) -> Option<String> {
    archive
        .names()
        .filter(|name| name.starts_with(SCRIPT_PREFIX) && name.ends_with(SCRIPT_SUFFIX))
        .min()
        .map(str::to_string)
}

fn read_script(
    html: &str,
    document: &mut Document,
    cancel: &CancellationToken,
) -> Result<(), ImportError> {
    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut paragraph: Option<OpenParagraph> = None;
    loop {
        let event = reader
            .read_event()
            .map_err(|e| read_failure(&e, reader.buffer_position(), html.len()))?;
        let is_empty = matches!(event, Event::Empty(_));
        match event {
            Event::Start(element) | Event::Empty(element) if element.name().as_ref() == b"p" => {
                if let Some(open) = paragraph.replace(OpenParagraph::new(&element)) {
                    debug!("Unclosed paragraph before a new one");
                    open.text.push_to(document, open.block_type);
                }
                if is_empty && let Some(open) = paragraph.take() {
                    open.text.push_to(document, open.block_type);
                }
            }
            Event::Start(element) | Event::Empty(element) => {
                let Some(open) = paragraph.as_mut() else {
                    continue;
                };
                let name = element.name();
                if name.as_ref() == b"br" {
                    open.line_break();
                } else if !is_empty && let Some(style) = inline_style(name.as_ref()) {
                    open.spans.push(style);
                }
            }
            Event::Text(content) => {
                if let Some(open) = paragraph.as_mut() {
                    open.push_text(&html_text(&content));
                }
            }
            Event::CData(content) => {
                if let Some(open) = paragraph.as_mut() {
                    open.push_text(&String::from_utf8_lossy(&content));
                }
            }
            Event::End(element) => match element.name().as_ref() {
                b"p" => {
                    cancel.check()?;
                    if let Some(open) = paragraph.take() {
                        open.text.push_to(document, open.block_type);
                    }
                }
                tag => {
                    if let (Some(open), Some(style)) = (paragraph.as_mut(), inline_style(tag))
                        && let Some(index) = open.spans.iter().rposition(|s| *s == style)
                    {
                        open.spans.remove(index);
                    }
                }
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if paragraph.is_some() {
        return Err(ImportError::UnexpectedEndOfFile {
            offset: html.len(),
        });
    }
    Ok(())
}

impl Importer for CeltxCodec {
    fn import(&self, bytes: &[u8], options: &ImportOptions) -> Result<Document, ImportError> {
        let mut archive = ArchiveReader::open(bytes)?;
        let Some(entry) = script_entry(&archive) else {
            return Err(ImportError::UnsupportedFormatVariant(format!(
                "no {SCRIPT_PREFIX}*{SCRIPT_SUFFIX} entry, not a Celtx project"
            )));
        };
        debug!("Reading Celtx script {entry}");
        let html = archive
            .read(&entry)?
            .ok_or_else(|| ImportError::CorruptContainer(format!("{entry} is missing")))?;

        let mut document = Document::new(options.kind);
        read_script(&html, &mut document, &options.cancel)?;
        document.bind_kind();
        Ok(document)
    }
}
