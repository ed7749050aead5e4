//! OpenDocument text (`.odt`).
//!
//! Named paragraph styles in `styles.xml` carry the block types. Per-block
//! overrides and inline formats become automatic styles in `content.xml`.

use log::debug;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::{BTreeMap, HashMap};

use crate::cancel::CancellationToken;
use crate::codecs::archive::{ArchiveReader, ArchiveWriter};
use crate::codecs::heuristics::{ImportedParagraph, assemble};
use crate::codecs::xml::{XmlOut, attr, read_failure, text};
use crate::codecs::{ExportError, ExportOptions, Exporter, ImportError, ImportOptions, Importer};
use crate::editing::Document;
use crate::models::{Alignment, Block, FormattingOverride, InlineStyle};
use crate::template::{ParagraphStyle, Template};

const MIMETYPE: &str = "application/vnd.oasis.opendocument.text";
const MANIFEST: &str = "META-INF/manifest.xml";
const CONTENT: &str = "content.xml";
const STYLES: &str = "styles.xml";

const NAMESPACES: [(&str, &str); 4] = [
    ("xmlns:office", "urn:oasis:names:tc:opendocument:xmlns:office:1.0"),
    ("xmlns:style", "urn:oasis:names:tc:opendocument:xmlns:style:1.0"),
    ("xmlns:text", "urn:oasis:names:tc:opendocument:xmlns:text:1.0"),
    (
        "xmlns:fo",
        "urn:oasis:names:tc:opendocument:xmlns:xsl-fo-compatible:1.0",
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OdtCodec;

/// A length such as `1.5in` or `2.54cm`, in millimetres.
fn length_mm(value: &str) -> Option<f32> {
    let value = value.trim();
    let split = value
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let number: f32 = number.parse().ok()?;
    let factor = match unit {
        "mm" => 1.0,
        "cm" => 10.0,
        "in" => 25.4,
        "pt" => 25.4 / 72.0,
        "pc" => 25.4 / 6.0,
        _ => return None,
    };
    Some(number * factor)
}

fn parse_alignment(value: &str) -> Alignment {
    match value {
        "center" => Alignment::Center,
        "end" | "right" => Alignment::Right,
        "justify" => Alignment::Justify,
        _ => Alignment::Left,
    }
}

fn alignment_value(alignment: Alignment) -> &'static str {
    match alignment {
        Alignment::Left => "start",
        Alignment::Center => "center",
        Alignment::Right => "end",
        Alignment::Justify => "justify",
    }
}

/// Properties of one `style:style`, named or automatic.
#[derive(Debug, Clone, Default)]
struct OdtStyle {
    display_name: Option<String>,
    parent: Option<String>,
    left_indent_mm: Option<f32>,
    alignment: Option<Alignment>,
    caps: bool,
    inline: InlineStyle,
}

impl OdtStyle {
    fn read_properties(&mut self, element: &BytesStart) {
        match element.name().as_ref() {
            b"style:paragraph-properties" => {
                if let Some(mm) = attr(element, "fo:margin-left").and_then(|v| length_mm(&v)) {
                    self.left_indent_mm = Some(mm);
                }
                if let Some(align) = attr(element, "fo:text-align") {
                    self.alignment = Some(parse_alignment(&align));
                }
            }
            b"style:text-properties" => {
                let is = |name: &str, value: &str| attr(element, name).as_deref() == Some(value);
                let set = |name: &str| attr(element, name).is_some_and(|v| v != "none");
                self.inline.set(InlineStyle::BOLD, is("fo:font-weight", "bold"));
                self.inline.set(InlineStyle::ITALIC, is("fo:font-style", "italic"));
                self.inline
                    .set(InlineStyle::UNDERLINE, set("style:text-underline-style"));
                self.inline
                    .set(InlineStyle::STRIKE_OUT, set("style:text-line-through-style"));
                self.caps = is("fo:text-transform", "uppercase");
            }
            _ => {}
        }
    }
}

type StyleMap = HashMap<String, OdtStyle>;

/// Collect every `style:style` in `xml` into `styles`.
fn read_styles(xml: &str, styles: &mut StyleMap) -> Result<(), ImportError> {
    let mut reader = Reader::from_str(xml);
    let mut current: Option<(String, OdtStyle)> = None;
    loop {
        let event = reader
            .read_event()
            .map_err(|e| read_failure(&e, reader.buffer_position(), xml.len()))?;
        match event {
            Event::Start(element) | Event::Empty(element)
                if element.name().as_ref() == b"style:style" =>
            {
                if let Some(name) = attr(&element, "style:name") {
                    let style = OdtStyle {
                        display_name: attr(&element, "style:display-name"),
                        parent: attr(&element, "style:parent-style-name"),
                        ..OdtStyle::default()
                    };
                    styles.insert(name.clone(), style.clone());
                    current = Some((name, style));
                }
            }
            Event::Start(element) | Event::Empty(element) => {
                if let Some((_, style)) = current.as_mut() {
                    style.read_properties(&element);
                }
            }
            Event::End(element) if element.name().as_ref() == b"style:style" => {
                if let Some((name, style)) = current.take() {
                    styles.insert(name, style);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(())
}

/// Block type name for a paragraph style: automatic styles defer to their
/// parent, named styles prefer their display name.
fn style_name(name: &str, styles: &StyleMap) -> String {
    let mut name = name;
    if let Some(parent) = styles.get(name).and_then(|s| s.parent.as_deref()) {
        name = parent;
    }
    styles
        .get(name)
        .and_then(|s| s.display_name.clone())
        .unwrap_or_else(|| name.to_string())
}

struct ParagraphState {
    paragraph: ImportedParagraph,
    spans: Vec<InlineStyle>,
    after_space: bool,
}

impl ParagraphState {
    fn style(&self) -> InlineStyle {
        self.spans
            .iter()
            .fold(InlineStyle::empty(), |acc, style| acc | *style)
    }

    /// Append text, collapsing whitespace the way ODF readers do.
    fn push_text(&mut self, content: &str) {
        let style = self.style();
        for c in content.chars() {
            if c.is_whitespace() {
                if !self.after_space {
                    self.paragraph.text.push_char(' ', style);
                    self.after_space = true;
                }
            } else {
                self.paragraph.text.push_char(c, style);
                self.after_space = false;
            }
        }
    }

    fn push_literal(&mut self, c: char, count: usize) {
        let style = self.style();
        for _ in 0..count {
            self.paragraph.text.push_char(c, style);
        }
        self.after_space = c != '\t';
    }
}

fn read_paragraphs(
    xml: &str,
    styles: &StyleMap,
    cancel: &CancellationToken,
) -> Result<Vec<ImportedParagraph>, ImportError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut state: Option<ParagraphState> = None;
    let mut depth = 0usize;
    let mut annotation_depth = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| read_failure(&e, reader.buffer_position(), xml.len()))?;
        match event {
            Event::Start(element) => {
                depth += 1;
                match element.name().as_ref() {
                    b"office:annotation" => annotation_depth += 1,
                    _ if annotation_depth > 0 => {}
                    b"text:p" | b"text:h" => {
                        let name = attr(&element, "text:style-name");
                        let style = name.as_deref().and_then(|n| styles.get(n));
                        let parent = style
                            .and_then(|s| s.parent.as_deref())
                            .and_then(|p| styles.get(p));
                        let paragraph = ImportedParagraph {
                            style_name: name.as_deref().map(|n| style_name(n, styles)),
                            left_indent_mm: style
                                .and_then(|s| s.left_indent_mm)
                                .or_else(|| parent.and_then(|s| s.left_indent_mm))
                                .unwrap_or(0.0),
                            alignment: style
                                .and_then(|s| s.alignment)
                                .or_else(|| parent.and_then(|s| s.alignment))
                                .unwrap_or_default(),
                            caps: style.is_some_and(|s| s.caps),
                            ..ImportedParagraph::default()
                        };
                        state = Some(ParagraphState {
                            paragraph,
                            spans: Vec::new(),
                            after_space: true,
                        });
                    }
                    b"text:span" => {
                        if let Some(state) = state.as_mut() {
                            let inline = attr(&element, "text:style-name")
                                .and_then(|n| styles.get(&n))
                                .map_or(InlineStyle::empty(), |s| s.inline);
                            state.spans.push(inline);
                        }
                    }
                    _ => {}
                }
            }
            Event::Empty(element) if annotation_depth == 0 => {
                let Some(state) = state.as_mut() else {
                    if matches!(element.name().as_ref(), b"text:p" | b"text:h") {
                        paragraphs.push(ImportedParagraph::default());
                    }
                    continue;
                };
                match element.name().as_ref() {
                    b"text:s" => {
                        let count = attr(&element, "text:c")
                            .and_then(|c| c.parse().ok())
                            .unwrap_or(1);
                        state.push_literal(' ', count);
                    }
                    b"text:tab" => state.push_literal('\t', 1),
                    b"text:line-break" => state.push_literal('\n', 1),
                    _ => {}
                }
            }
            Event::Text(content) if annotation_depth == 0 => {
                if let Some(state) = state.as_mut() {
                    state.push_text(&text(&content));
                }
            }
            Event::End(element) => {
                depth = depth.saturating_sub(1);
                match element.name().as_ref() {
                    b"office:annotation" => annotation_depth = annotation_depth.saturating_sub(1),
                    _ if annotation_depth > 0 => {}
                    b"text:p" | b"text:h" => {
                        cancel.check()?;
                        if let Some(state) = state.take() {
                            paragraphs.push(state.paragraph);
                        }
                    }
                    b"text:span" => {
                        if let Some(state) = state.as_mut() {
                            state.spans.pop();
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth > 0 {
        return Err(ImportError::UnexpectedEndOfFile { offset: xml.len() });
    }
    Ok(paragraphs)
}

impl Importer for OdtCodec {
    fn import(&self, bytes: &[u8], options: &ImportOptions) -> Result<Document, ImportError> {
        let mut archive = ArchiveReader::open(bytes)?;
        if !archive.contains(MANIFEST) {
            return Err(ImportError::UnableToOpenArchive(format!(
                "{MANIFEST} is missing, not an OpenDocument package"
            )));
        }
        let content = archive
            .read(CONTENT)?
            .ok_or_else(|| ImportError::CorruptContainer(format!("{CONTENT} is missing")))?;

        let mut styles = StyleMap::new();
        match archive.read(STYLES)? {
            Some(xml) => read_styles(&xml, &mut styles)?,
            None => debug!("No {STYLES}, using automatic styles only"),
        }
        read_styles(&content, &mut styles)?;

        let paragraphs = read_paragraphs(&content, &styles, &options.cancel)?;
        Ok(assemble(paragraphs, options))
    }
}

/// Parent style, alignment and uppercase of an automatic paragraph style.
type ParagraphKey = (&'static str, Option<&'static str>, bool);

/// Automatic styles needed by the body of one document.
#[derive(Default)]
struct AutomaticStyles {
    paragraphs: BTreeMap<ParagraphKey, String>,
    text: BTreeMap<u8, String>,
}

impl AutomaticStyles {
    fn collect(document: &Document) -> Self {
        let mut styles = AutomaticStyles::default();
        for block in document.blocks() {
            if let Some(key) = Self::paragraph_key(block) {
                let next = format!("P{}", styles.paragraphs.len() + 1);
                styles.paragraphs.entry(key).or_insert(next);
            }
            for run in block.runs() {
                if !run.style.is_empty() {
                    let next = format!("T{}", styles.text.len() + 1);
                    styles.text.entry(run.style.bits()).or_insert(next);
                }
            }
        }
        styles
    }

    fn paragraph_key(block: &Block) -> Option<ParagraphKey> {
        let formatting = block.formatting.as_ref()?;
        if *formatting == FormattingOverride::default() {
            return None;
        }
        Some((
            block.block_type.as_str(),
            formatting.alignment.map(alignment_value),
            formatting.uppercase == Some(true),
        ))
    }

    fn paragraph_style<'a>(&'a self, block: &'a Block) -> &'a str {
        Self::paragraph_key(block)
            .and_then(|key| self.paragraphs.get(&key))
            .map_or(block.block_type.as_str(), |name| name.as_str())
    }

    fn write(&self, out: &mut XmlOut) -> Result<(), ExportError> {
        out.open("office:automatic-styles", &[])?;
        for ((parent, alignment, caps), name) in &self.paragraphs {
            out.open(
                "style:style",
                &[
                    ("style:name", name.as_str()),
                    ("style:family", "paragraph"),
                    ("style:parent-style-name", *parent),
                ],
            )?;
            if let Some(alignment) = alignment {
                out.empty(
                    "style:paragraph-properties",
                    &[("fo:text-align", *alignment)],
                )?;
            }
            if *caps {
                out.empty(
                    "style:text-properties",
                    &[("fo:text-transform", "uppercase")],
                )?;
            }
            out.close("style:style")?;
        }
        for (bits, name) in &self.text {
            out.open(
                "style:style",
                &[("style:name", name.as_str()), ("style:family", "text")],
            )?;
            write_text_properties(out, InlineStyle::from_bits_truncate(*bits), false)?;
            out.close("style:style")?;
        }
        out.close("office:automatic-styles")
    }
}

fn write_text_properties(out: &mut XmlOut, style: InlineStyle, caps: bool) -> Result<(), ExportError> {
    let mut attrs = Vec::new();
    if style.contains(InlineStyle::BOLD) {
        attrs.push(("fo:font-weight", "bold"));
    }
    if style.contains(InlineStyle::ITALIC) {
        attrs.push(("fo:font-style", "italic"));
    }
    if style.contains(InlineStyle::UNDERLINE) {
        attrs.push(("style:text-underline-style", "solid"));
    }
    if style.contains(InlineStyle::STRIKE_OUT) {
        attrs.push(("style:text-line-through-style", "solid"));
    }
    if caps {
        attrs.push(("fo:text-transform", "uppercase"));
    }
    out.empty("style:text-properties", &attrs)
}

/// Writes text the way ODF expects whitespace: repeated spaces as `text:s`,
/// tabs and line breaks as elements.
struct OdfText {
    segment: String,
    extra_spaces: usize,
    after_space: bool,
}

impl OdfText {
    fn new() -> Self {
        Self {
            segment: String::new(),
            extra_spaces: 0,
            after_space: true,
        }
    }

    fn write(&mut self, out: &mut XmlOut, content: &str) -> Result<(), ExportError> {
        for c in content.chars() {
            match c {
                '\t' | '\n' => {
                    self.flush(out)?;
                    let element = if c == '\t' { "text:tab" } else { "text:line-break" };
                    out.empty(element, &[])?;
                    self.after_space = c == '\n';
                }
                ' ' if self.after_space => self.extra_spaces += 1,
                ' ' => {
                    self.flush_spaces(out)?;
                    self.segment.push(' ');
                    self.after_space = true;
                }
                c => {
                    self.flush_spaces(out)?;
                    self.segment.push(c);
                    self.after_space = false;
                }
            }
        }
        self.flush(out)
    }

    fn flush_spaces(&mut self, out: &mut XmlOut) -> Result<(), ExportError> {
        if self.extra_spaces == 0 {
            return Ok(());
        }
        if !self.segment.is_empty() {
            out.text(&self.segment)?;
            self.segment.clear();
        }
        let count = self.extra_spaces.to_string();
        out.empty("text:s", &[("text:c", count.as_str())])?;
        self.extra_spaces = 0;
        Ok(())
    }

    fn flush(&mut self, out: &mut XmlOut) -> Result<(), ExportError> {
        self.flush_spaces(out)?;
        if !self.segment.is_empty() {
            out.text(&self.segment)?;
            self.segment.clear();
        }
        Ok(())
    }
}

impl Exporter for OdtCodec {
    fn export_with(
        &self,
        document: &Document,
        template: &Template,
        options: &ExportOptions,
    ) -> Result<Vec<u8>, ExportError> {
        let mut archive = ArchiveWriter::new();
        archive.add_stored("mimetype", MIMETYPE.as_bytes())?;
        archive.add(MANIFEST, &manifest()?)?;
        archive.add(CONTENT, &content_xml(document, &options.cancel)?)?;
        archive.add(STYLES, &styles_xml(template)?)?;
        archive.finish()
    }
}

fn manifest() -> Result<Vec<u8>, ExportError> {
    let mut out = XmlOut::new();
    out.declaration(false)?;
    out.open(
        "manifest:manifest",
        &[
            (
                "xmlns:manifest",
                "urn:oasis:names:tc:opendocument:xmlns:manifest:1.0",
            ),
            ("manifest:version", "1.2"),
        ],
    )?;
    for (path, media_type) in [("/", MIMETYPE), (CONTENT, "text/xml"), (STYLES, "text/xml")] {
        out.empty(
            "manifest:file-entry",
            &[
                ("manifest:full-path", path),
                ("manifest:media-type", media_type),
            ],
        )?;
    }
    out.close("manifest:manifest")?;
    Ok(out.into_bytes())
}

fn content_xml(document: &Document, cancel: &CancellationToken) -> Result<Vec<u8>, ExportError> {
    let automatic = AutomaticStyles::collect(document);
    let mut out = XmlOut::new();
    out.declaration(false)?;
    let mut attrs = NAMESPACES.to_vec();
    attrs.push(("office:version", "1.2"));
    out.open("office:document-content", &attrs)?;
    automatic.write(&mut out)?;
    out.open("office:body", &[])?;
    out.open("office:text", &[])?;
    for block in document.blocks() {
        cancel.check()?;
        out.open(
            "text:p",
            &[("text:style-name", automatic.paragraph_style(block))],
        )?;
        let mut writer = OdfText::new();
        for run in block.runs() {
            match automatic.text.get(&run.style.bits()) {
                Some(name) if !run.style.is_empty() => {
                    out.open("text:span", &[("text:style-name", name.as_str())])?;
                    writer.write(&mut out, run.text)?;
                    out.close("text:span")?;
                }
                _ => writer.write(&mut out, run.text)?,
            }
        }
        out.close("text:p")?;
    }
    out.close("office:text")?;
    out.close("office:body")?;
    out.close("office:document-content")?;
    Ok(out.into_bytes())
}

fn styles_xml(template: &Template) -> Result<Vec<u8>, ExportError> {
    let mut out = XmlOut::new();
    out.declaration(false)?;
    let mut attrs = NAMESPACES.to_vec();
    attrs.push(("office:version", "1.2"));
    out.open("office:document-styles", &attrs)?;

    out.open("office:styles", &[])?;
    for block_type in template.kind.block_types() {
        write_style(&mut out, &template.resolve(block_type))?;
    }
    out.close("office:styles")?;

    let page = &template.page;
    let (width, height) = page.size.dimensions_mm();
    let [width, height, top, bottom, left, right] = [
        width,
        height,
        page.margins.top,
        page.margins.bottom,
        page.margins.left,
        page.margins.right,
    ]
    .map(|mm| format!("{mm:.2}mm"));
    out.open("office:automatic-styles", &[])?;
    out.open("style:page-layout", &[("style:name", "pm1")])?;
    out.empty(
        "style:page-layout-properties",
        &[
            ("fo:page-width", width.as_str()),
            ("fo:page-height", height.as_str()),
            ("fo:margin-top", top.as_str()),
            ("fo:margin-bottom", bottom.as_str()),
            ("fo:margin-left", left.as_str()),
            ("fo:margin-right", right.as_str()),
        ],
    )?;
    out.close("style:page-layout")?;
    out.close("office:automatic-styles")?;

    out.open("office:master-styles", &[])?;
    out.empty(
        "style:master-page",
        &[("style:name", "Standard"), ("style:page-layout-name", "pm1")],
    )?;
    out.close("office:master-styles")?;
    out.close("office:document-styles")?;
    Ok(out.into_bytes())
}

fn write_style(out: &mut XmlOut, style: &ParagraphStyle) -> Result<(), ExportError> {
    let name = style.block_type.as_str();
    let display = style.display_title();
    let points = |twips: u32| format!("{:.1}pt", twips as f32 / 20.0);
    let line = style.line_height_twips();
    let before = points(style.lines_before * line);
    let after = points(style.lines_after * line);
    let left = format!("{:.2}mm", style.left_indent_mm);
    let right = format!("{:.2}mm", style.right_indent_mm);
    let size = format!("{}pt", style.font.size);

    out.open(
        "style:style",
        &[
            ("style:name", name),
            ("style:display-name", display.as_str()),
            ("style:family", "paragraph"),
        ],
    )?;
    let mut paragraph = vec![
        ("fo:margin-top", before.as_str()),
        ("fo:margin-bottom", after.as_str()),
        ("fo:margin-left", left.as_str()),
        ("fo:margin-right", right.as_str()),
        ("fo:text-align", alignment_value(style.alignment)),
    ];
    if style.starts_new_page {
        paragraph.push(("fo:break-before", "page"));
    }
    out.empty("style:paragraph-properties", &paragraph)?;

    let mut inline = InlineStyle::empty();
    inline.set(InlineStyle::BOLD, style.bold);
    inline.set(InlineStyle::ITALIC, style.italic);
    inline.set(InlineStyle::UNDERLINE, style.underline);
    write_font(out, &style.font.family, &size, inline, style.uppercase)?;
    out.close("style:style")
}

fn write_font(
    out: &mut XmlOut,
    family: &str,
    size: &str,
    inline: InlineStyle,
    caps: bool,
) -> Result<(), ExportError> {
    let mut attrs = vec![("fo:font-family", family), ("fo:font-size", size)];
    if inline.contains(InlineStyle::BOLD) {
        attrs.push(("fo:font-weight", "bold"));
    }
    if inline.contains(InlineStyle::ITALIC) {
        attrs.push(("fo:font-style", "italic"));
    }
    if inline.contains(InlineStyle::UNDERLINE) {
        attrs.push(("style:text-underline-style", "solid"));
    }
    if caps {
        attrs.push(("fo:text-transform", "uppercase"));
    }
    out.empty("style:text-properties", &attrs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BlockType, DocumentKind, TextFormat};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn types_and_texts(doc: &Document) -> Vec<(BlockType, String)> {
        doc.blocks()
            .map(|b| (b.block_type, b.text.clone()))
            .collect()
    }

    #[rstest]
    #[case("25.4mm", Some(25.4))]
    #[case("2.54cm", Some(25.4))]
    #[case("1in", Some(25.4))]
    #[case("72pt", Some(25.4))]
    #[case("12furlongs", None)]
    fn test_length_mm(#[case] value: &str, #[case] expected: Option<f32>) {
        let got = length_mm(value);
        assert_eq!(got.map(|mm| (mm * 100.0).round()), expected.map(|mm| (mm * 100.0).round()));
    }

    #[test]
    fn test_export_then_import() {
        // Given a screenplay with spacing, inline formats and an override
        let mut doc = Document::from_blocks(
            DocumentKind::Screenplay,
            [
                (BlockType::SceneHeading, "INT. HOUSE - DAY"),
                (BlockType::Action, "  Two  spaces\tand a tab\nnew line "),
                (BlockType::Character, "JOHN"),
                (BlockType::Dialogue, "Hello <there> & bye."),
            ],
        );
        doc.push(BlockType::Action, "Fade out")
            .add_format(0..4, InlineStyle::UNDERLINE);
        let id = doc.get(4).unwrap().id;
        doc.apply(crate::editing::Cmd::SetFormatting {
            id,
            formatting: Some(FormattingOverride {
                alignment: Some(Alignment::Center),
                uppercase: Some(true),
                font: None,
            }),
        })
        .unwrap();

        // When written and read back
        let bytes = OdtCodec.export(&doc, &Template::default()).unwrap();
        let reimported = OdtCodec.import(&bytes, &ImportOptions::default()).unwrap();

        // Then text, whitespace, types, formats and the override survive
        assert_eq!(types_and_texts(&reimported), types_and_texts(&doc));
        let block = reimported.get(4).unwrap();
        assert_eq!(
            block.formats,
            vec![TextFormat {
                range: 0..4,
                style: InlineStyle::UNDERLINE,
            }]
        );
        assert_eq!(block.formatting, doc.get(4).unwrap().formatting);
    }

    #[test]
    fn test_mimetype_is_first_and_stored() {
        let doc = Document::from_blocks(DocumentKind::Screenplay, [(BlockType::Action, "x")]);
        let bytes = OdtCodec.export(&doc, &Template::default()).unwrap();

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let first = archive.by_index(0).unwrap();
        assert_eq!(first.name(), "mimetype");
        assert_eq!(first.compression(), zip::CompressionMethod::Stored);
    }

    #[test]
    fn test_foreign_document_uses_display_names_and_heuristics() {
        let mut archive = ArchiveWriter::new();
        archive.add(MANIFEST, b"<manifest/>").unwrap();
        archive
            .add(
                STYLES,
                br#"<office:document-styles><office:styles>
<style:style style:name="Scene_20_Heading" style:display-name="Scene Heading" style:family="paragraph"/>
</office:styles></office:document-styles>"#,
            )
            .unwrap();
        archive
            .add(
                CONTENT,
                br#"<office:document-content><office:automatic-styles>
<style:style style:name="P1" style:family="paragraph" style:parent-style-name="Scene_20_Heading"/>
<style:style style:name="P2" style:family="paragraph"><style:paragraph-properties fo:margin-left="2.2in"/></style:style>
<style:style style:name="T1" style:family="text"><style:text-properties fo:font-weight="bold"/></style:style>
</office:automatic-styles><office:body><office:text>
<text:p text:style-name="P1">ext. garden - day</text:p>
<text:p text:style-name="P2">MARY</text:p>
<text:p/>
<text:p>She <text:span text:style-name="T1">smiles</text:span>.<office:annotation><text:p>note</text:p></office:annotation></text:p>
</office:text></office:body></office:document-content>"#,
            )
            .unwrap();
        let bytes = archive.finish().unwrap();

        let doc = OdtCodec.import(&bytes, &ImportOptions::default()).unwrap();

        assert_eq!(
            types_and_texts(&doc),
            vec![
                (BlockType::SceneHeading, "ext. garden - day".to_string()),
                (BlockType::Character, "MARY".to_string()),
                (BlockType::Action, "She smiles.".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_content_is_corrupt() {
        let mut archive = ArchiveWriter::new();
        archive.add(MANIFEST, b"<manifest/>").unwrap();
        let bytes = archive.finish().unwrap();

        assert!(matches!(
            OdtCodec.import(&bytes, &ImportOptions::default()),
            Err(ImportError::CorruptContainer(_))
        ));
    }

    #[test]
    fn test_cancel_stops_reading_paragraphs() {
        // Given a document exported while the token was live
        let doc = Document::from_blocks(
            DocumentKind::Screenplay,
            [(BlockType::Action, "One"), (BlockType::Action, "Two")],
        );
        let bytes = OdtCodec.export(&doc, &Template::default()).unwrap();

        // When it is read back with a cancelled token
        let options = ImportOptions::default();
        options.cancel.cancel();
        let result = OdtCodec.import(&bytes, &options);

        // Then no document comes back
        assert!(matches!(
            result,
            Err(ImportError::Cancelled(crate::cancel::Cancelled))
        ));
    }
}
