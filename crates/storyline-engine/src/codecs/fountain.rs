//! Fountain, the plain-text screenplay markup.
//!
//! Import infers element types from the shape of each line and the blank
//! lines around it. Export writes the forcing markers (`!`, `@`, `.`, `>`)
//! wherever that inference would read a block back as something else.

use log::debug;
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

use crate::cancel::Cancelled;
use crate::codecs::{
    ExportError, ExportOptions, Exporter, ImportError, ImportOptions, Importer, decode_text,
};
use crate::editing::Document;
use crate::models::{
    Alignment, Block, BlockType, Dictionaries, FormattingOverride, InlineStyle, TitlePage,
};
use crate::template::Template;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FountainCodec;

static SCENE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(INT|EXT|EST|INT\.?/EXT|I/E)[. ]").expect("Invalid scene prefix regex")
});

static SCENE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*#[^#\s]+#\s*$").expect("Invalid scene number regex"));

static TITLE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(title|credit|authors?|source|draft date|contact|notes|copyright|revision):\s*(.*)$")
        .expect("Invalid title key regex")
});

impl Importer for FountainCodec {
    fn import(&self, bytes: &[u8], options: &ImportOptions) -> Result<Document, ImportError> {
        let text = strip_boneyard(&decode_text(bytes));
        let lines: Vec<&str> = text.split('\n').collect();

        let mut reader = FountainReader {
            document: Document::new(options.kind),
            dictionaries: &options.dictionaries,
            in_dialogue: false,
            previous_blank: true,
            pending: None,
        };
        let body = parse_title_page(&lines, &mut reader.document.metadata.title_page);
        reader.read(&lines[body..], options)?;

        let mut document = reader.document;
        document.bind_kind();
        Ok(document)
    }
}

fn strip_boneyard(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start..].find("*/") {
            Some(end) => rest = &rest[start + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// Read `Key: value` pairs at the top of the file. Returns the first body line.
fn parse_title_page(lines: &[&str], title_page: &mut TitlePage) -> usize {
    if !lines.first().is_some_and(|l| TITLE_KEY.is_match(l.trim_end())) {
        return 0;
    }

    let mut current: Option<(String, String)> = None;
    let mut index = 0;
    while let Some(line) = lines.get(index) {
        index += 1;
        if line.trim().is_empty() {
            break;
        }
        if let Some(captures) = TITLE_KEY.captures(line.trim_end()) {
            if let Some((key, value)) = current.take() {
                title_page.set(&key, value);
            }
            current = Some((captures[1].to_string(), captures[2].trim().to_string()));
        } else if let Some((_, value)) = current.as_mut() {
            if !value.is_empty() {
                value.push('\n');
            }
            value.push_str(line.trim());
        }
    }
    if let Some((key, value)) = current {
        title_page.set(&key, value);
    }
    index
}

/// Name part of a cue is upper case and holds at least one letter.
fn is_cue(text: &str) -> bool {
    let name = text.split('(').next().unwrap_or_default().trim();
    name.chars().any(char::is_alphabetic) && name == name.to_uppercase()
}

fn is_scene_heading(text: &str, dictionaries: &Dictionaries) -> bool {
    dictionaries.match_scene_intro(text).is_some() || SCENE_PREFIX.is_match(text)
}

fn is_transition(text: &str, dictionaries: &Dictionaries) -> bool {
    text == text.to_uppercase() && (text.ends_with("TO:") || dictionaries.is_transition(text))
}

struct FountainReader<'a> {
    document: Document,
    dictionaries: &'a Dictionaries,
    in_dialogue: bool,
    previous_blank: bool,
    /// Action or dialogue lines that continue until a blank line
    pending: Option<(BlockType, Vec<String>)>,
}

impl FountainReader<'_> {
    fn read(&mut self, lines: &[&str], options: &ImportOptions) -> Result<(), Cancelled> {
        for (i, line) in lines.iter().enumerate() {
            options.cancel.check()?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                self.flush_pending();
                self.in_dialogue = false;
                self.previous_blank = true;
                continue;
            }
            let next_blank = lines.get(i + 1).is_none_or(|l| l.trim().is_empty());
            self.read_line(trimmed, next_blank);
            self.previous_blank = false;
        }
        self.flush_pending();
        Ok(())
    }

    /// Whether the line before was a scene heading or transition.
    fn follows_heading(&self) -> bool {
        !self.previous_blank
            && self.pending.is_none()
            && self
                .document
                .len()
                .checked_sub(1)
                .and_then(|last| self.document.get(last))
                .is_some_and(|b| {
                    matches!(b.block_type, BlockType::SceneHeading | BlockType::Transition)
                })
    }

    fn continue_pending(&mut self, block_type: BlockType, line: &str) -> bool {
        match self.pending.as_mut() {
            Some((pending_type, lines)) if *pending_type == block_type => {
                lines.push(line.to_string());
                true
            }
            _ => false,
        }
    }

    fn read_line(&mut self, line: &str, next_blank: bool) {
        if self.in_dialogue {
            if line.starts_with('(') && line.ends_with(')') {
                self.push(BlockType::Parenthetical, line);
            } else if let Some(lyrics) = line.strip_prefix('~') {
                self.push(BlockType::Lyrics, lyrics.trim_start());
            } else if !self.continue_pending(BlockType::Dialogue, line) {
                self.flush_pending();
                self.pending = Some((BlockType::Dialogue, vec![line.to_string()]));
            }
            return;
        }

        if !self.previous_blank && self.continue_pending(BlockType::Action, line) {
            return;
        }
        let after_heading = self.follows_heading();
        self.flush_pending();

        if line.len() >= 3 && line.chars().all(|c| c == '=') {
            debug!("Skipping page break");
        } else if let Some(note) = line.strip_prefix("[[").and_then(|l| l.strip_suffix("]]")) {
            self.push(BlockType::InlineNote, note.trim());
        } else if let Some(beat) = line.strip_prefix("###") {
            self.push(BlockType::BeatHeading, beat.trim());
        } else if let Some(sequence) = line.strip_prefix("##") {
            self.push(BlockType::SequenceHeading, sequence.trim());
        } else if let Some(act) = line.strip_prefix('#') {
            self.push(BlockType::ActHeading, act.trim());
        } else if let Some(synopsis) = line.strip_prefix('=') {
            self.push(BlockType::Synopsis, synopsis.trim());
        } else if let Some(action) = line.strip_prefix('!') {
            self.pending = Some((BlockType::Action, vec![action.to_string()]));
        } else if let Some(cue) = line.strip_prefix('@') {
            self.push(BlockType::Character, cue.trim());
            self.in_dialogue = !next_blank;
        } else if let Some(lyrics) = line.strip_prefix('~') {
            self.push(BlockType::Lyrics, lyrics.trim_start());
        } else if let Some(centered) = line.strip_prefix('>').and_then(|l| l.strip_suffix('<')) {
            self.push(BlockType::Action, centered.trim()).formatting = Some(FormattingOverride {
                alignment: Some(Alignment::Center),
                ..FormattingOverride::default()
            });
        } else if let Some(transition) = line.strip_prefix('>') {
            self.push(BlockType::Transition, transition.trim());
        } else if let Some(heading) = line.strip_prefix('.').filter(|l| !l.starts_with('.')) {
            self.push(BlockType::SceneHeading, &strip_scene_number(heading));
        } else if self.previous_blank && is_scene_heading(line, self.dictionaries) {
            self.push(BlockType::SceneHeading, &strip_scene_number(line));
        } else if self.previous_blank && next_blank && is_transition(line, self.dictionaries) {
            self.push(BlockType::Transition, line);
        } else if (self.previous_blank || after_heading) && !next_blank && is_cue(line) {
            let cue = line.trim_end_matches('^').trim_end();
            self.push(BlockType::Character, cue);
            self.in_dialogue = true;
        } else {
            self.pending = Some((BlockType::Action, vec![line.to_string()]));
        }
    }

    fn flush_pending(&mut self) {
        if let Some((block_type, lines)) = self.pending.take() {
            self.push_block(block_type, &lines.join("\n"));
        }
    }

    fn push(&mut self, block_type: BlockType, raw: &str) -> &mut Block {
        self.flush_pending();
        self.push_block(block_type, raw)
    }

    fn push_block(&mut self, block_type: BlockType, raw: &str) -> &mut Block {
        let (text, formats) = parse_emphasis(raw);
        let block = self.document.push(block_type, text);
        for (range, style) in formats {
            block.add_format(range, style);
        }
        block
    }
}

fn strip_scene_number(heading: &str) -> String {
    SCENE_NUMBER.replace(heading.trim(), "").into_owned()
}

/// Split Fountain emphasis markup into plain text and formats.
///
/// `***` is bold italic, `**` bold, `*` italic and `_` underline. A marker
/// only opens when a matching marker follows later in the text; a backslash
/// makes the next character literal.
fn parse_emphasis(raw: &str) -> (String, Vec<(Range<usize>, InlineStyle)>) {
    let chars: Vec<char> = raw.chars().collect();
    let mut text = String::with_capacity(raw.len());
    let mut len = 0;
    let mut formats = Vec::new();
    let mut bold: Option<usize> = None;
    let mut italic: Option<usize> = None;
    let mut underline: Option<usize> = None;

    let remaining_has = |from: usize, marker: &str| {
        chars[from.min(chars.len())..]
            .iter()
            .collect::<String>()
            .contains(marker)
    };

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            text.push(chars[i + 1]);
            len += 1;
            i += 2;
            continue;
        }
        if c == '_' {
            if let Some(start) = underline.take() {
                formats.push((start..len, InlineStyle::UNDERLINE));
                i += 1;
                continue;
            }
            if remaining_has(i + 1, "_") {
                underline = Some(len);
                i += 1;
                continue;
            }
        }
        if c == '*' {
            let run = chars[i..].iter().take_while(|&&ch| ch == '*').count();
            let mut used = 0;
            if run - used >= 2
                && let Some(start) = bold.take()
            {
                formats.push((start..len, InlineStyle::BOLD));
                used += 2;
            }
            if run - used >= 1
                && let Some(start) = italic.take()
            {
                formats.push((start..len, InlineStyle::ITALIC));
                used += 1;
            }
            if run - used >= 2 && bold.is_none() && remaining_has(i + run, "**") {
                bold = Some(len);
                used += 2;
            }
            if run - used >= 1 && italic.is_none() && remaining_has(i + run, "*") {
                italic = Some(len);
                used += 1;
            }
            if used > 0 {
                // Stars beyond what the markers used are literal
                for _ in used..run {
                    text.push('*');
                    len += 1;
                }
                i += run;
                continue;
            }
        }
        text.push(c);
        len += 1;
        i += 1;
    }
    (text, formats)
}

/// Text of a block with its formats written as emphasis markup.
fn render_emphasis(block: &Block) -> String {
    let mut out = String::new();
    let mut current = InlineStyle::empty();
    for run in block.runs() {
        transition(&mut out, current, run.style);
        current = run.style;
        for c in run.text.chars() {
            if matches!(c, '*' | '_' | '\\') {
                out.push('\\');
            }
            out.push(c);
        }
    }
    transition(&mut out, current, InlineStyle::empty());
    out
}

fn transition(out: &mut String, from: InlineStyle, to: InlineStyle) {
    let closing = from - to;
    let opening = to - from;
    if closing.contains(InlineStyle::UNDERLINE) {
        out.push('_');
    }
    out.push_str(stars(closing));
    out.push_str(stars(opening));
    if opening.contains(InlineStyle::UNDERLINE) {
        out.push('_');
    }
}

fn stars(style: InlineStyle) -> &'static str {
    match (
        style.contains(InlineStyle::BOLD),
        style.contains(InlineStyle::ITALIC),
    ) {
        (true, true) => "***",
        (true, false) => "**",
        (false, true) => "*",
        (false, false) => "",
    }
}

impl Exporter for FountainCodec {
    fn export_with(
        &self,
        document: &Document,
        _template: &Template,
        options: &ExportOptions,
    ) -> Result<Vec<u8>, ExportError> {
        let dictionaries = &options.dictionaries;
        let mut out = String::new();

        let entries = document.metadata.title_page.entries();
        if !entries.is_empty() {
            for (key, value) in entries {
                if value.contains('\n') {
                    out.push_str(&format!("{key}:\n"));
                    for line in value.lines() {
                        out.push_str(&format!("   {line}\n"));
                    }
                } else {
                    out.push_str(&format!("{key}: {value}\n"));
                }
            }
            out.push('\n');
        }

        let blocks: Vec<&Block> = document.blocks().collect();
        for (i, block) in blocks.iter().enumerate() {
            options.cancel.check()?;
            let previous = i.checked_sub(1).map(|j| blocks[j].block_type);
            let next = blocks.get(i + 1).map(|b| b.block_type);
            let in_speech = matches!(
                block.block_type,
                BlockType::Parenthetical | BlockType::Dialogue | BlockType::Lyrics
            ) && previous.is_some_and(BlockType::is_dialogue_run);
            if i > 0 && !in_speech {
                out.push('\n');
            }
            out.push_str(&render_block(block, next, dictionaries));
            out.push('\n');
        }
        Ok(out.into_bytes())
    }
}

fn render_block(block: &Block, next: Option<BlockType>, dictionaries: &Dictionaries) -> String {
    let text = render_emphasis(block);
    let first_line = text.lines().next().unwrap_or_default();
    let centered = block
        .formatting
        .as_ref()
        .and_then(|f| f.alignment)
        .is_some_and(|a| a == Alignment::Center);

    match block.block_type {
        BlockType::SceneHeading => {
            let text = match dictionaries.match_scene_intro(&text) {
                Some((canonical, len)) => {
                    format!("{canonical}{}", text.chars().skip(len).collect::<String>())
                }
                None => text,
            };
            if is_scene_heading(&text, dictionaries) {
                text
            } else {
                format!(".{text}")
            }
        }
        BlockType::Character => {
            let speaks = next.is_some_and(|t| {
                matches!(
                    t,
                    BlockType::Parenthetical | BlockType::Dialogue | BlockType::Lyrics
                )
            });
            if speaks && is_cue(&text) {
                text
            } else {
                format!("@{text}")
            }
        }
        BlockType::Parenthetical => text,
        // A leading backslash keeps speech lines from reading back as
        // parentheticals or lyrics
        BlockType::Dialogue => text
            .split('\n')
            .map(|line| {
                if line.starts_with(['(', '~']) {
                    format!("\\{line}")
                } else {
                    line.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n"),
        BlockType::Lyrics => format!("~{text}"),
        BlockType::Transition if is_transition(&text, dictionaries) => text,
        BlockType::Transition => format!(">{text}"),
        BlockType::InlineNote => format!("[[{text}]]"),
        BlockType::Synopsis => format!("= {text}"),
        BlockType::ActHeading => format!("# {text}"),
        BlockType::SequenceHeading => format!("## {text}"),
        BlockType::BeatHeading => format!("### {text}"),
        BlockType::Title => format!(">{text}<"),
        _ if centered => format!(">{text}<"),
        _ => {
            let ambiguous = is_cue(first_line)
                || is_scene_heading(first_line, dictionaries)
                || first_line.starts_with(['!', '@', '#', '~', '=', '>', '.', '[']);
            if ambiguous {
                format!("!{text}")
            } else {
                text
            }
        }
    }
}
