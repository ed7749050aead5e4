//! Rich Text Format.
//!
//! The token stream comes from `storyline-syntax`; this module keeps the
//! group state. Paragraph styles named after block types give the type
//! directly, everything else goes through the paragraph heuristics.

use log::debug;
use std::collections::HashMap;
use std::fmt::Write as _;

use storyline_syntax::{Token, TokenKind, escape_text, is_valid_font_name, lex};

use crate::cancel::{CancellationToken, Cancelled};
use crate::codecs::heuristics::{ImportedParagraph, assemble};
use crate::codecs::{ExportError, ExportOptions, Exporter, ImportError, ImportOptions, Importer};
use crate::editing::Document;
use crate::models::{Alignment, InlineStyle};
use crate::template::style::mm_to_twips;
use crate::template::{ParagraphStyle, Template};

const TWIPS_PER_MM: f32 = 1440.0 / 25.4;

/// Windows-1252 characters for bytes 0x80 to 0x9F.
const CP1252_HIGH: [char; 32] = [
    '€', '\u{81}', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', '\u{8d}', 'Ž', '\u{8f}',
    '\u{90}', '‘', '’', '“', '”', '•', '–', '—', '˜', '™', 'š', '›', 'œ', '\u{9d}', 'ž', 'Ÿ',
];

/// Windows-1251 characters for bytes 0x80 to 0xBF. 0xC0 onwards is А to я.
const CP1251_HIGH: [char; 64] = [
    'Ђ', 'Ѓ', '‚', 'ѓ', '„', '…', '†', '‡', '€', '‰', 'Љ', '‹', 'Њ', 'Ќ', 'Ћ', 'Џ',
    'ђ', '‘', '’', '“', '”', '•', '–', '—', '\u{98}', '™', 'љ', '›', 'њ', 'ќ', 'ћ', 'џ',
    '\u{a0}', 'Ў', 'ў', 'Ј', '¤', 'Ґ', '¦', '§', 'Ё', '©', 'Є', '«', '¬', '\u{ad}', '®', 'Ї',
    '°', '±', 'І', 'і', 'ґ', 'µ', '¶', '·', 'ё', '№', 'є', '»', 'ј', 'Ѕ', 'ѕ', 'ї',
];

/// Default code page of an `\ansi` document without `\ansicpg`.
const DEFAULT_CODEPAGE: i32 = 1252;

/// Decode one `\'hh` byte in the given ANSI code page. Unknown code pages
/// fall back to Windows-1252.
fn decode_byte(codepage: i32, byte: u8) -> char {
    match (codepage, byte) {
        (1251, 0x80..=0xbf) => CP1251_HIGH[usize::from(byte - 0x80)],
        (1251, 0xc0..=0xff) => char::from_u32(0x0410 + u32::from(byte - 0xc0)).unwrap_or('?'),
        (_, 0x80..=0x9f) => CP1252_HIGH[usize::from(byte - 0x80)],
        _ => char::from(byte),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RtfCodec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Destination {
    Body,
    Skip,
    Stylesheet,
    StyleEntry,
}

/// Character state, scoped to a group.
#[derive(Debug, Clone, Copy)]
struct GroupState {
    destination: Destination,
    style: InlineStyle,
    caps: bool,
    /// Fallback characters following a `\u` escape
    unicode_skip: usize,
}

struct RtfReader {
    stack: Vec<GroupState>,
    state: GroupState,
    ignorable_next: bool,
    stylesheet: HashMap<i32, String>,
    entry_number: Option<i32>,
    entry_name: String,
    style_number: Option<i32>,
    paragraph: ImportedParagraph,
    paragraphs: Vec<ImportedParagraph>,
    pending_skip: usize,
    high_surrogate: Option<u16>,
    codepage: i32,
}

impl RtfReader {
    fn new() -> Self {
        Self {
            stack: Vec::new(),
            state: GroupState {
                destination: Destination::Body,
                style: InlineStyle::empty(),
                caps: false,
                unicode_skip: 1,
            },
            ignorable_next: false,
            stylesheet: HashMap::new(),
            entry_number: None,
            entry_name: String::new(),
            style_number: None,
            paragraph: ImportedParagraph::default(),
            paragraphs: Vec::new(),
            pending_skip: 0,
            high_surrogate: None,
            codepage: DEFAULT_CODEPAGE,
        }
    }

    fn read(&mut self, tokens: &[Token], cancel: &CancellationToken) -> Result<(), Cancelled> {
        for token in tokens {
            cancel.check()?;
            match token.kind {
                TokenKind::GroupOpen => self.open_group(),
                TokenKind::GroupClose => self.close_group(),
                TokenKind::ControlWord => {
                    if let Some((name, param)) = token.control_word() {
                        self.control_word(name, param);
                    }
                    self.ignorable_next = false;
                }
                TokenKind::HexEscape => {
                    if let Some(byte) = token.hex_byte() {
                        self.push_char(decode_byte(self.codepage, byte));
                    }
                }
                TokenKind::ParBreak => self.control_word("par", None),
                TokenKind::ControlSymbol => match token.control_symbol() {
                    Some('*') => self.ignorable_next = true,
                    Some('~') => self.push_char('\u{a0}'),
                    Some('_') => self.push_char('-'),
                    Some(c @ ('\\' | '{' | '}')) => self.push_char(c),
                    _ => {}
                },
                TokenKind::Newline => {}
                TokenKind::Text => {
                    for c in token.text.chars() {
                        self.push_char(c);
                    }
                }
            }
        }
        Ok(())
    }

    fn open_group(&mut self) {
        self.stack.push(self.state);
        if self.state.destination == Destination::Stylesheet {
            self.state.destination = Destination::StyleEntry;
            self.entry_number = Some(0);
            self.entry_name.clear();
        }
    }

    fn close_group(&mut self) {
        if self.state.destination == Destination::StyleEntry
            && let Some(number) = self.entry_number.take()
        {
            let name = self.entry_name.trim().trim_end_matches(';').trim().to_string();
            self.stylesheet.insert(number, name);
        }
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn control_word(&mut self, name: &str, param: Option<i32>) {
        if self.ignorable_next {
            debug!("Skipping ignorable destination \\{name}");
            self.state.destination = Destination::Skip;
            return;
        }
        match (self.state.destination, name) {
            (Destination::Skip, _) => {}
            (_, "ansicpg") => self.codepage = param.unwrap_or(DEFAULT_CODEPAGE),
            (_, "stylesheet") => self.state.destination = Destination::Stylesheet,
            (
                _,
                "fonttbl" | "colortbl" | "info" | "pict" | "header" | "headerl" | "headerr"
                | "headerf" | "footer" | "footerl" | "footerr" | "footerf" | "footnote"
                | "fldinst" | "object" | "listtable" | "listoverridetable" | "generator",
            ) => self.state.destination = Destination::Skip,
            (Destination::StyleEntry, "s") => self.entry_number = param,
            (Destination::StyleEntry | Destination::Stylesheet, _) => {}
            (Destination::Body, _) => self.body_word(name, param),
        }
    }

    fn body_word(&mut self, name: &str, param: Option<i32>) {
        let on = param != Some(0);
        let toggle = |flag: InlineStyle, state: &mut GroupState| state.style.set(flag, on);
        match name {
            "par" => self.finish_paragraph(),
            "line" => self.push_char('\n'),
            "tab" => self.push_char('\t'),
            "b" => toggle(InlineStyle::BOLD, &mut self.state),
            "i" => toggle(InlineStyle::ITALIC, &mut self.state),
            "ul" => toggle(InlineStyle::UNDERLINE, &mut self.state),
            "strike" => toggle(InlineStyle::STRIKE_OUT, &mut self.state),
            "ulnone" => self.state.style.remove(InlineStyle::UNDERLINE),
            "caps" => self.state.caps = on,
            "plain" => {
                self.state.style = InlineStyle::empty();
                self.state.caps = false;
            }
            "pard" => {
                self.style_number = None;
                self.paragraph.left_indent_mm = 0.0;
                self.paragraph.alignment = Alignment::Left;
            }
            "s" => self.style_number = param,
            "li" => self.paragraph.left_indent_mm = param.unwrap_or(0) as f32 / TWIPS_PER_MM,
            "qc" => self.paragraph.alignment = Alignment::Center,
            "qr" => self.paragraph.alignment = Alignment::Right,
            "qj" => self.paragraph.alignment = Alignment::Justify,
            "ql" => self.paragraph.alignment = Alignment::Left,
            "uc" => self.state.unicode_skip = param.unwrap_or(1).max(0) as usize,
            "u" => {
                if let Some(value) = param {
                    self.push_unicode(value);
                }
                self.pending_skip = self.state.unicode_skip;
            }
            _ => {}
        }
    }

    fn push_unicode(&mut self, value: i32) {
        let unit = if value < 0 { value + 0x10000 } else { value } as u16;
        if (0xd800..0xdc00).contains(&unit) {
            self.high_surrogate = Some(unit);
            return;
        }
        let decoded = match self.high_surrogate.take() {
            Some(high) => char::decode_utf16([high, unit]).next().and_then(Result::ok),
            None => char::from_u32(u32::from(unit)),
        };
        if let Some(c) = decoded {
            self.push_text(c);
        }
    }

    fn push_char(&mut self, c: char) {
        if self.pending_skip > 0 {
            self.pending_skip -= 1;
            return;
        }
        self.push_text(c);
    }

    fn push_text(&mut self, c: char) {
        match self.state.destination {
            Destination::Body => {
                self.paragraph.caps |= self.state.caps;
                self.paragraph.text.push_char(c, self.state.style);
            }
            Destination::StyleEntry => self.entry_name.push(c),
            Destination::Skip | Destination::Stylesheet => {}
        }
    }

    fn finish_paragraph(&mut self) {
        let style_name = self
            .style_number
            .and_then(|n| self.stylesheet.get(&n).cloned());
        let next = ImportedParagraph {
            left_indent_mm: self.paragraph.left_indent_mm,
            alignment: self.paragraph.alignment,
            ..ImportedParagraph::default()
        };
        let mut paragraph = std::mem::replace(&mut self.paragraph, next);
        paragraph.style_name = style_name;
        self.paragraphs.push(paragraph);
    }
}

/// RTF is 7-bit; bytes above ASCII only appear in sloppy writers.
fn widen(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| decode_byte(DEFAULT_CODEPAGE, b)).collect(),
    }
}

impl Importer for RtfCodec {
    fn import(&self, bytes: &[u8], options: &ImportOptions) -> Result<Document, ImportError> {
        let input = widen(bytes);
        if !input.trim_start().starts_with("{\\rtf") {
            return Err(ImportError::UnsupportedFormatVariant(
                "missing {\\rtf header".to_string(),
            ));
        }
        let tokens = lex(&input).map_err(|e| {
            if e.at_end_of(&input) {
                ImportError::UnexpectedEndOfFile { offset: e.offset }
            } else {
                ImportError::UnsupportedFormatVariant(e.to_string())
            }
        })?;

        let mut reader = RtfReader::new();
        reader.read(&tokens, &options.cancel)?;
        if !reader.stack.is_empty() {
            return Err(ImportError::UnexpectedEndOfFile {
                offset: input.len(),
            });
        }
        if !reader.paragraph.text.is_empty() {
            reader.finish_paragraph();
        }

        Ok(assemble(reader.paragraphs, options))
    }
}

impl Exporter for RtfCodec {
    fn export_with(
        &self,
        document: &Document,
        template: &Template,
        options: &ExportOptions,
    ) -> Result<Vec<u8>, ExportError> {
        let styles: Vec<ParagraphStyle> = template
            .kind
            .block_types()
            .map(|t| template.resolve(t))
            .collect();

        let mut fonts: Vec<&str> = Vec::new();
        for style in &styles {
            if !is_valid_font_name(&style.font.family) {
                return Err(ExportError::EncodingUnsupportedForTemplate {
                    font: style.font.family.clone(),
                });
            }
            if !fonts.contains(&style.font.family.as_str()) {
                fonts.push(&style.font.family);
            }
        }
        let font_index = |style: &ParagraphStyle| {
            fonts
                .iter()
                .position(|f| *f == style.font.family)
                .unwrap_or(0)
        };

        let mut out = String::from("{\\rtf1\\ansi\\ansicpg1252\\deff0\\uc1\n{\\fonttbl");
        for (i, font) in fonts.iter().enumerate() {
            write!(out, "{{\\f{i}\\fmodern {font};}}").map_err(ExportError::write_failed)?;
        }
        out.push_str("}\n{\\colortbl;}\n{\\stylesheet{\\s0 Normal;}");
        for (i, style) in styles.iter().enumerate() {
            write!(
                out,
                "{{\\s{}{} {};}}",
                i + 1,
                style_definition(style, font_index(style)),
                style.block_type.as_str()
            )
            .map_err(ExportError::write_failed)?;
        }
        out.push_str("}\n");

        let page = &template.page;
        let (width, height) = page.size.dimensions_mm();
        write!(
            out,
            "\\paperw{}\\paperh{}\\margl{}\\margr{}\\margt{}\\margb{}\n",
            mm_to_twips(width),
            mm_to_twips(height),
            mm_to_twips(page.margins.left),
            mm_to_twips(page.margins.right),
            mm_to_twips(page.margins.top),
            mm_to_twips(page.margins.bottom),
        )
        .map_err(ExportError::write_failed)?;

        for block in document.blocks() {
            options.cancel.check()?;
            let Some(index) = styles.iter().position(|s| s.block_type == block.block_type) else {
                return Err(ExportError::UnresolvedBlockType(block.id));
            };
            let style = &styles[index];
            let mut tags = layout_tags(style, font_index(style));
            if let Some(formatting) = &block.formatting {
                if let Some(alignment) = formatting.alignment {
                    tags.push_str(alignment_tag(alignment));
                }
                if formatting.uppercase == Some(true) {
                    tags.push_str("\\caps");
                }
            }
            write!(out, "\\pard\\plain\\s{}{} ", index + 1, tags)
                .map_err(ExportError::write_failed)?;
            for run in block.runs() {
                let text = escape_text(run.text);
                if run.style.is_empty() {
                    out.push_str(&text);
                } else {
                    write!(out, "{{{} {text}}}", style_tags(run.style))
                        .map_err(ExportError::write_failed)?;
                }
            }
            out.push_str("\\par\n");
        }
        out.push('}');
        Ok(out.into_bytes())
    }
}

fn alignment_tag(alignment: Alignment) -> &'static str {
    match alignment {
        Alignment::Left => "\\ql",
        Alignment::Center => "\\qc",
        Alignment::Right => "\\qr",
        Alignment::Justify => "\\qj",
    }
}

/// Tags a paragraph repeats in the body: geometry and font.
fn layout_tags(style: &ParagraphStyle, font: usize) -> String {
    let line = style.line_height_twips();
    format!(
        "\\li{}\\ri{}\\sb{}\\sa{}{}\\f{font}\\fs{}",
        mm_to_twips(style.left_indent_mm),
        mm_to_twips(style.right_indent_mm),
        style.lines_before * line,
        style.lines_after * line,
        alignment_tag(style.alignment),
        (style.font.size * 2.0).round() as u32,
    )
}

/// Full style definition for the stylesheet.
fn style_definition(style: &ParagraphStyle, font: usize) -> String {
    let mut tags = layout_tags(style, font);
    if style.bold {
        tags.push_str("\\b");
    }
    if style.italic {
        tags.push_str("\\i");
    }
    if style.underline {
        tags.push_str("\\ul");
    }
    if style.uppercase {
        tags.push_str("\\caps");
    }
    if style.starts_new_page {
        tags.push_str("\\pagebb");
    }
    tags
}

fn style_tags(style: InlineStyle) -> String {
    let mut tags = String::new();
    if style.contains(InlineStyle::BOLD) {
        tags.push_str("\\b");
    }
    if style.contains(InlineStyle::ITALIC) {
        tags.push_str("\\i");
    }
    if style.contains(InlineStyle::UNDERLINE) {
        tags.push_str("\\ul");
    }
    if style.contains(InlineStyle::STRIKE_OUT) {
        tags.push_str("\\strike");
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BlockType, DocumentKind, TextFormat};
    use crate::template::Font;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn import(input: &str) -> Result<Document, ImportError> {
        RtfCodec.import(input.as_bytes(), &ImportOptions::default())
    }

    fn types_and_texts(doc: &Document) -> Vec<(BlockType, String)> {
        doc.blocks()
            .map(|b| (b.block_type, b.text.clone()))
            .collect()
    }

    #[rstest]
    #[case("{\\rtf1\\ansi {\\pard\\s1 Hello\\par")]
    #[case("{\\rtf1\\ansi Hello\\par")]
    #[case("{\\rtf1\\ansi Caf\\'e")]
    #[case("{\\rtf1\\ansi Hello\\")]
    fn test_truncated_stream_is_end_of_file(#[case] input: &str) {
        assert!(matches!(
            import(input),
            Err(ImportError::UnexpectedEndOfFile { .. })
        ));
    }

    #[test]
    fn test_missing_header_is_unsupported() {
        assert!(matches!(
            import("Hello world"),
            Err(ImportError::UnsupportedFormatVariant(_))
        ));
    }

    #[test]
    fn test_foreign_rtf_is_classified() {
        // Given RTF from a word processor with no block type styles
        let input = concat!(
            "{\\rtf1\\ansi\\deff0{\\fonttbl{\\f0 Courier;}}{\\*\\generator Writer 1.0;}\n",
            "\\pard INT. HOUSE - DAY\\par\n",
            "\\pard\\li3168 JOHN\\par\n",
            "\\pard\\li1440 Caf\\'e9 au lait, s'il vous pla\\u238?t.\\par\n",
            "\\pard\\unknownword42 He leaves.\\par\n",
            "}"
        );

        // When imported
        let doc = import(input).unwrap();

        // Then indentation and case recover the screenplay structure
        assert_eq!(
            types_and_texts(&doc),
            vec![
                (BlockType::SceneHeading, "INT. HOUSE - DAY".to_string()),
                (BlockType::Character, "JOHN".to_string()),
                (BlockType::Dialogue, "Café au lait, s'il vous plaît.".to_string()),
                (BlockType::Action, "He leaves.".to_string()),
            ]
        );
    }

    #[test]
    fn test_inline_groups_become_formats() {
        let input = "{\\rtf1 {\\stylesheet{\\s3 action;}}\\pard\\s3 Say {\\b\\i loud} now\\par}";

        let doc = import(input).unwrap();

        let block = doc.get(0).unwrap();
        assert_eq!(block.block_type, BlockType::Action);
        assert_eq!(block.text, "Say loud now");
        assert_eq!(
            block.formats,
            vec![TextFormat {
                range: 4..8,
                style: InlineStyle::BOLD | InlineStyle::ITALIC,
            }]
        );
    }

    #[test]
    fn test_export_then_import_keeps_types_and_formats() {
        // Given a screenplay with inline formatting and non-ASCII text
        let mut doc = Document::from_blocks(
            DocumentKind::Screenplay,
            [
                (BlockType::SceneHeading, "INT. CAFÉ - NIGHT"),
                (BlockType::Action, "Smoke {curls} up.\nSlowly."),
                (BlockType::Character, "ANNA"),
                (BlockType::Parenthetical, "(to herself)"),
                (BlockType::Dialogue, "Ещё кофе? 😀"),
                (BlockType::Shot, "CLOSE ON THE CUP"),
                (BlockType::Transition, "CUT TO:"),
            ],
        );
        doc.push(BlockType::Action, "Bold end")
            .add_format(5..8, InlineStyle::BOLD);

        // When written and read back
        let bytes = RtfCodec.export(&doc, &Template::default()).unwrap();
        let reimported = RtfCodec
            .import(&bytes, &ImportOptions::default())
            .unwrap();

        // Then every block keeps its type, text and formats
        assert_eq!(types_and_texts(&reimported), types_and_texts(&doc));
        assert_eq!(
            reimported.get(7).map(|b| b.formats.clone()),
            Some(vec![TextFormat {
                range: 5..8,
                style: InlineStyle::BOLD,
            }])
        );
    }

    #[test]
    fn test_unencodable_font_is_rejected() {
        let mut template = Template::default();
        template.styles.retain(|s| s.block_type != BlockType::Action);
        template.styles.push(ParagraphStyle {
            block_type: BlockType::Action,
            font: Font {
                family: "Bad;Font".to_string(),
                size: 12.0,
            },
            ..ParagraphStyle::default()
        });
        let doc = Document::from_blocks(DocumentKind::Screenplay, [(BlockType::Action, "x")]);

        assert!(matches!(
            RtfCodec.export(&doc, &template),
            Err(ExportError::EncodingUnsupportedForTemplate { font }) if font == "Bad;Font"
        ));
    }

    #[test]
    fn test_export_preamble() {
        let doc = Document::from_blocks(DocumentKind::Screenplay, [(BlockType::Action, "Hi")]);
        let text = String::from_utf8(RtfCodec.export(&doc, &Template::default()).unwrap()).unwrap();

        assert!(text.starts_with("{\\rtf1\\ansi\\ansicpg1252\\deff0\\uc1\n{\\fonttbl{\\f0\\fmodern Courier Prime;}}"));
        assert!(text.contains("{\\s3\\li0\\ri0\\sb240\\sa0\\ql\\f0\\fs24 action;}"));
        assert!(text.contains("\\pard\\plain\\s3\\li0\\ri0\\sb240\\sa0\\ql\\f0\\fs24 Hi\\par\n"));
        assert!(text.ends_with('}'));
    }

    #[rstest]
    #[case("{\\rtf1\\ansi\\ansicpg1251 \\'cf\\'f0\\'e8\\'e2\\'e5\\'f2, \\'a8\\'eb\\'ea\\'e0!\\par}", "Привет, Ёлка!")]
    #[case("{\\rtf1\\ansi\\ansicpg1252 Caf\\'e9 \\'93ok\\'94\\par}", "Café “ok”")]
    #[case("{\\rtf1\\ansi Caf\\'e9\\par}", "Café")]
    fn test_hex_escapes_follow_code_page(#[case] input: &str, #[case] expected: &str) {
        let doc = import(input).unwrap();

        assert_eq!(doc.text(), expected);
    }

    #[test]
    fn test_cancelled_token_stops_reading() {
        // Given a token cancelled before the reader reaches the body
        let cancel = CancellationToken::new();
        cancel.cancel();
        let options = ImportOptions {
            cancel,
            ..ImportOptions::default()
        };

        // When the body is read
        let result = RtfCodec.import(b"{\\rtf1\\ansi Hello\\par}", &options);

        // Then no document comes back
        assert!(matches!(result, Err(ImportError::Cancelled(Cancelled))));
    }

    #[test]
    fn test_cancelled_export_stops() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let options = ExportOptions {
            cancel,
            ..ExportOptions::default()
        };
        let doc = Document::from_blocks(DocumentKind::Screenplay, [(BlockType::Action, "Hi")]);

        assert!(matches!(
            RtfCodec.export_with(&doc, &Template::default(), &options),
            Err(ExportError::Cancelled(Cancelled))
        ));
    }
}
