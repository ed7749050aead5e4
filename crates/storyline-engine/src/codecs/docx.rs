//! Office Open XML word processing documents (`.docx`).
//!
//! Export writes one paragraph style per block type, named after the type,
//! so a document read back keeps its types. Paragraphs with foreign styles
//! are classified from their indent, alignment and case.

use log::debug;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;

use crate::cancel::CancellationToken;
use crate::codecs::archive::{ArchiveReader, ArchiveWriter};
use crate::codecs::heuristics::{ImportedParagraph, assemble};
use crate::codecs::xml::{XmlOut, attr, is_truthy, read_failure, text};
use crate::codecs::{ExportError, ExportOptions, Exporter, ImportError, ImportOptions, Importer};
use crate::editing::Document;
use crate::models::{Alignment, Block, InlineStyle};
use crate::template::style::mm_to_twips;
use crate::template::{ParagraphStyle, Template};

const CONTENT_TYPES: &str = "[Content_Types].xml";
const DOCUMENT: &str = "word/document.xml";
const STYLES: &str = "word/styles.xml";
const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const TWIPS_PER_MM: f32 = 1440.0 / 25.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DocxCodec;

/// `scene_heading` becomes `SceneHeading`.
fn style_id(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

fn parse_alignment(value: &str) -> Alignment {
    match value {
        "center" => Alignment::Center,
        "right" | "end" => Alignment::Right,
        "both" | "distribute" => Alignment::Justify,
        _ => Alignment::Left,
    }
}

fn alignment_value(alignment: Alignment) -> &'static str {
    match alignment {
        Alignment::Left => "left",
        Alignment::Center => "center",
        Alignment::Right => "right",
        Alignment::Justify => "both",
    }
}

/// Style id to display name, from `word/styles.xml`.
fn read_style_names(xml: &str) -> Result<HashMap<String, String>, ImportError> {
    let mut reader = Reader::from_str(xml);
    let mut names = HashMap::new();
    let mut current: Option<String> = None;
    loop {
        let event = reader
            .read_event()
            .map_err(|e| read_failure(&e, reader.buffer_position(), xml.len()))?;
        match event {
            Event::Start(element) if element.name().as_ref() == b"w:style" => {
                current = attr(&element, "w:styleId");
            }
            Event::Empty(element) if element.name().as_ref() == b"w:name" => {
                if let (Some(id), Some(name)) = (current.as_ref(), attr(&element, "w:val")) {
                    names.insert(id.clone(), name);
                }
            }
            Event::End(element) if element.name().as_ref() == b"w:style" => current = None,
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(names)
}

/// Where in a paragraph the reader is.
#[derive(Default)]
struct ParagraphReader {
    paragraph: Option<ImportedParagraph>,
    in_paragraph_properties: bool,
    in_run: bool,
    in_text: bool,
    run_style: InlineStyle,
}

impl ParagraphReader {
    fn property(&mut self, element: &BytesStart, styles: &HashMap<String, String>) {
        let Some(paragraph) = self.paragraph.as_mut() else {
            return;
        };
        let value = attr(element, "w:val");
        let on = is_truthy(value.as_deref());
        match element.name().as_ref() {
            b"w:pStyle" => {
                paragraph.style_name = value.map(|id| styles.get(&id).cloned().unwrap_or(id));
            }
            b"w:ind" if self.in_paragraph_properties => {
                let left = attr(element, "w:left").or_else(|| attr(element, "w:start"));
                if let Some(twips) = left.and_then(|v| v.parse::<f32>().ok()) {
                    paragraph.left_indent_mm = twips / TWIPS_PER_MM;
                }
            }
            b"w:jc" if self.in_paragraph_properties => {
                paragraph.alignment = parse_alignment(value.as_deref().unwrap_or_default());
            }
            b"w:caps" if self.in_paragraph_properties => paragraph.caps = on,
            b"w:b" if self.in_run => self.run_style.set(InlineStyle::BOLD, on),
            b"w:i" if self.in_run => self.run_style.set(InlineStyle::ITALIC, on),
            b"w:strike" if self.in_run => self.run_style.set(InlineStyle::STRIKE_OUT, on),
            b"w:u" if self.in_run => {
                self.run_style
                    .set(InlineStyle::UNDERLINE, on && value.as_deref() != Some("none"));
            }
            b"w:caps" if self.in_run => paragraph.caps |= on,
            b"w:tab" if self.in_run => paragraph.text.push_char('\t', self.run_style),
            b"w:br" | b"w:cr" if self.in_run => paragraph.text.push_char('\n', self.run_style),
            _ => {}
        }
    }
}

fn read_paragraphs(
    xml: &str,
    styles: &HashMap<String, String>,
    cancel: &CancellationToken,
) -> Result<Vec<ImportedParagraph>, ImportError> {
    let mut reader = Reader::from_str(xml);
    let mut state = ParagraphReader::default();
    let mut paragraphs = Vec::new();
    let mut depth = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| read_failure(&e, reader.buffer_position(), xml.len()))?;
        match event {
            Event::Start(element) => {
                depth += 1;
                match element.name().as_ref() {
                    b"w:p" => state.paragraph = Some(ImportedParagraph::default()),
                    b"w:pPr" => state.in_paragraph_properties = true,
                    b"w:r" => {
                        state.in_run = true;
                        state.run_style = InlineStyle::empty();
                    }
                    b"w:t" => state.in_text = true,
                    _ => state.property(&element, styles),
                }
            }
            Event::Empty(element) => {
                if element.name().as_ref() == b"w:p" {
                    paragraphs.push(ImportedParagraph::default());
                } else {
                    state.property(&element, styles);
                }
            }
            Event::Text(content) if state.in_text => {
                if let Some(paragraph) = state.paragraph.as_mut() {
                    paragraph.text.push(&text(&content), state.run_style);
                }
            }
            Event::End(element) => {
                depth = depth.saturating_sub(1);
                match element.name().as_ref() {
                    b"w:p" => {
                        cancel.check()?;
                        paragraphs.extend(state.paragraph.take());
                    }
                    b"w:pPr" => state.in_paragraph_properties = false,
                    b"w:r" => state.in_run = false,
                    b"w:t" => state.in_text = false,
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

impl Importer for DocxCodec {
    fn import(&self, bytes: &[u8], options: &ImportOptions) -> Result<Document, ImportError> {
        let mut archive = ArchiveReader::open(bytes)?;
        if !archive.contains(CONTENT_TYPES) {
            return Err(ImportError::UnableToOpenArchive(format!(
                "{CONTENT_TYPES} is missing, not an Office Open XML package"
            )));
        }
        let document_xml = archive
            .read(DOCUMENT)?
            .ok_or_else(|| ImportError::CorruptContainer(format!("{DOCUMENT} is missing")))?;
        let styles = match archive.read(STYLES)? {
            Some(xml) => read_style_names(&xml)?,
            None => {
                debug!("No {STYLES}, using style ids as names");
                HashMap::new()
            }
        };

        let paragraphs = read_paragraphs(&document_xml, &styles, &options.cancel)?;
        Ok(assemble(paragraphs, options))
    }
}

impl Exporter for DocxCodec {
    fn export_with(
        &self,
        document: &Document,
        template: &Template,
        options: &ExportOptions,
    ) -> Result<Vec<u8>, ExportError> {
        let mut archive = ArchiveWriter::new();
        archive.add(CONTENT_TYPES, &content_types()?)?;
        archive.add("_rels/.rels", &package_relationships()?)?;
        archive.add("word/_rels/document.xml.rels", &document_relationships()?)?;
        archive.add(DOCUMENT, &document_xml(document, template, &options.cancel)?)?;
        archive.add(STYLES, &styles_xml(template)?)?;
        archive.finish()
    }
}

fn content_types() -> Result<Vec<u8>, ExportError> {
    let mut out = XmlOut::new();
    out.declaration(true)?;
    out.open(
        "Types",
        &[("xmlns", "http://schemas.openxmlformats.org/package/2006/content-types")],
    )?;
    out.empty(
        "Default",
        &[
            ("Extension", "rels"),
            ("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
        ],
    )?;
    out.empty(
        "Default",
        &[("Extension", "xml"), ("ContentType", "application/xml")],
    )?;
    out.empty(
        "Override",
        &[
            ("PartName", "/word/document.xml"),
            (
                "ContentType",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
            ),
        ],
    )?;
    out.empty(
        "Override",
        &[
            ("PartName", "/word/styles.xml"),
            (
                "ContentType",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml",
            ),
        ],
    )?;
    out.close("Types")?;
    Ok(out.into_bytes())
}

fn relationships(target_type: &str, target: &str) -> Result<Vec<u8>, ExportError> {
    let mut out = XmlOut::new();
    out.declaration(true)?;
    out.open("Relationships", &[("xmlns", RELATIONSHIPS_NS)])?;
    out.empty(
        "Relationship",
        &[("Id", "rId1"), ("Type", target_type), ("Target", target)],
    )?;
    out.close("Relationships")?;
    Ok(out.into_bytes())
}

fn package_relationships() -> Result<Vec<u8>, ExportError> {
    relationships(
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument",
        "word/document.xml",
    )
}

fn document_relationships() -> Result<Vec<u8>, ExportError> {
    relationships(
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles",
        "styles.xml",
    )
}

fn document_xml(
    document: &Document,
    template: &Template,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, ExportError> {
    let mut out = XmlOut::new();
    out.declaration(true)?;
    out.open("w:document", &[("xmlns:w", WORD_NS)])?;
    out.open("w:body", &[])?;
    for block in document.blocks() {
        cancel.check()?;
        write_paragraph(&mut out, block)?;
    }

    let page = &template.page;
    let (width, height) = page.size.dimensions_mm();
    let [width, height, top, right, bottom, left] = [
        width,
        height,
        page.margins.top,
        page.margins.right,
        page.margins.bottom,
        page.margins.left,
    ]
    .map(|mm| mm_to_twips(mm).to_string());
    out.open("w:sectPr", &[])?;
    out.empty("w:pgSz", &[("w:w", width.as_str()), ("w:h", height.as_str())])?;
    out.empty(
        "w:pgMar",
        &[
            ("w:top", top.as_str()),
            ("w:right", right.as_str()),
            ("w:bottom", bottom.as_str()),
            ("w:left", left.as_str()),
        ],
    )?;
    out.close("w:sectPr")?;
    out.close("w:body")?;
    out.close("w:document")?;
    Ok(out.into_bytes())
}

fn write_paragraph(out: &mut XmlOut, block: &Block) -> Result<(), ExportError> {
    out.open("w:p", &[])?;
    out.open("w:pPr", &[])?;
    let id = style_id(block.block_type.as_str());
    out.empty("w:pStyle", &[("w:val", id.as_str())])?;
    if let Some(formatting) = &block.formatting {
        if let Some(alignment) = formatting.alignment {
            out.empty("w:jc", &[("w:val", alignment_value(alignment))])?;
        }
        if formatting.uppercase == Some(true) {
            out.open("w:rPr", &[])?;
            out.empty("w:caps", &[])?;
            out.close("w:rPr")?;
        }
    }
    out.close("w:pPr")?;

    for run in block.runs() {
        out.open("w:r", &[])?;
        if !run.style.is_empty() {
            out.open("w:rPr", &[])?;
            if run.style.contains(InlineStyle::BOLD) {
                out.empty("w:b", &[])?;
            }
            if run.style.contains(InlineStyle::ITALIC) {
                out.empty("w:i", &[])?;
            }
            if run.style.contains(InlineStyle::UNDERLINE) {
                out.empty("w:u", &[("w:val", "single")])?;
            }
            if run.style.contains(InlineStyle::STRIKE_OUT) {
                out.empty("w:strike", &[])?;
            }
            out.close("w:rPr")?;
        }
        write_run_text(out, run.text)?;
        out.close("w:r")?;
    }
    out.close("w:p")
}

/// Text with tabs and line breaks as their own elements.
fn write_run_text(out: &mut XmlOut, text: &str) -> Result<(), ExportError> {
    fn flush(out: &mut XmlOut, segment: &mut String) -> Result<(), ExportError> {
        if !segment.is_empty() {
            out.element("w:t", &[("xml:space", "preserve")], segment)?;
            segment.clear();
        }
        Ok(())
    }

    let mut segment = String::new();
    for c in text.chars() {
        match c {
            '\t' => {
                flush(out, &mut segment)?;
                out.empty("w:tab", &[])?;
            }
            '\n' => {
                flush(out, &mut segment)?;
                out.empty("w:br", &[])?;
            }
            c => segment.push(c),
        }
    }
    flush(out, &mut segment)
}

fn styles_xml(template: &Template) -> Result<Vec<u8>, ExportError> {
    let mut out = XmlOut::new();
    out.declaration(true)?;
    out.open("w:styles", &[("xmlns:w", WORD_NS)])?;
    for block_type in template.kind.block_types() {
        write_style(&mut out, &template.resolve(block_type))?;
    }
    out.close("w:styles")?;
    Ok(out.into_bytes())
}

fn write_style(out: &mut XmlOut, style: &ParagraphStyle) -> Result<(), ExportError> {
    let name = style.block_type.as_str();
    let id = style_id(name);
    let line = style.line_height_twips();
    let before = (style.lines_before * line).to_string();
    let after = (style.lines_after * line).to_string();
    let line = line.to_string();
    let left = mm_to_twips(style.left_indent_mm).to_string();
    let right = mm_to_twips(style.right_indent_mm).to_string();
    let half_points = ((style.font.size * 2.0).round() as u32).to_string();
    let font = style.font.family.as_str();

    out.open("w:style", &[("w:type", "paragraph"), ("w:styleId", id.as_str())])?;
    out.empty("w:name", &[("w:val", name)])?;
    out.open("w:pPr", &[])?;
    if style.starts_new_page {
        out.empty("w:pageBreakBefore", &[])?;
    }
    out.empty(
        "w:spacing",
        &[
            ("w:before", before.as_str()),
            ("w:after", after.as_str()),
            ("w:line", line.as_str()),
            ("w:lineRule", "exact"),
        ],
    )?;
    out.empty(
        "w:ind",
        &[
            ("w:left", left.as_str()),
            ("w:right", right.as_str()),
        ],
    )?;
    out.empty("w:jc", &[("w:val", alignment_value(style.alignment))])?;
    out.close("w:pPr")?;

    out.open("w:rPr", &[])?;
    out.empty(
        "w:rFonts",
        &[("w:ascii", font), ("w:hAnsi", font)],
    )?;
    if style.bold {
        out.empty("w:b", &[])?;
    }
    if style.italic {
        out.empty("w:i", &[])?;
    }
    if style.underline {
        out.empty("w:u", &[("w:val", "single")])?;
    }
    if style.uppercase {
        out.empty("w:caps", &[])?;
    }
    out.empty("w:sz", &[("w:val", half_points.as_str())])?;
    out.close("w:rPr")?;
    out.close("w:style")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BlockType, DocumentKind, FormattingOverride, TextFormat};
    use pretty_assertions::assert_eq;

    fn types_and_texts(doc: &Document) -> Vec<(BlockType, String)> {
        doc.blocks()
            .map(|b| (b.block_type, b.text.clone()))
            .collect()
    }

    /// Package holding only the given `word/document.xml` body.
    fn package(body: &str) -> Vec<u8> {
        let mut archive = ArchiveWriter::new();
        archive.add(CONTENT_TYPES, b"<Types/>").unwrap();
        let xml = format!(r#"<w:document xmlns:w="{WORD_NS}"><w:body>{body}</w:body></w:document>"#);
        archive.add(DOCUMENT, xml.as_bytes()).unwrap();
        archive.finish().unwrap()
    }

    #[test]
    fn test_style_ids() {
        assert_eq!(style_id("scene_heading"), "SceneHeading");
        assert_eq!(style_id("heading1"), "Heading1");
    }

    #[test]
    fn test_export_then_import() {
        // Given a screenplay with runs, breaks and an override
        let mut doc = Document::from_blocks(
            DocumentKind::Screenplay,
            [
                (BlockType::SceneHeading, "INT. HOUSE - DAY"),
                (BlockType::Action, "Line one\nline\ttwo"),
                (BlockType::Character, "JOHN"),
                (BlockType::Parenthetical, "(beat)"),
                (BlockType::Dialogue, "Hello & goodbye."),
                (BlockType::Transition, "CUT TO:"),
            ],
        );
        doc.push(BlockType::Action, "Mixed styles here")
            .add_format(6..12, InlineStyle::ITALIC | InlineStyle::STRIKE_OUT);
        let last = doc.get(6).unwrap().id;
        doc.apply(crate::editing::Cmd::SetFormatting {
            id: last,
            formatting: Some(FormattingOverride {
                alignment: Some(Alignment::Center),
                uppercase: Some(true),
                font: None,
            }),
        })
        .unwrap();

        // When written and read back
        let bytes = DocxCodec.export(&doc, &Template::default()).unwrap();
        let reimported = DocxCodec
            .import(&bytes, &ImportOptions::default())
            .unwrap();

        // Then types, texts, formats and overrides survive
        assert_eq!(types_and_texts(&reimported), types_and_texts(&doc));
        let block = reimported.get(6).unwrap();
        assert_eq!(
            block.formats,
            vec![TextFormat {
                range: 6..12,
                style: InlineStyle::ITALIC | InlineStyle::STRIKE_OUT,
            }]
        );
        assert_eq!(block.formatting, doc.get(6).unwrap().formatting);
    }

    #[test]
    fn test_foreign_paragraphs_are_classified() {
        let bytes = package(concat!(
            r#"<w:p><w:r><w:t>INT. OFFICE - NIGHT</w:t></w:r></w:p>"#,
            r#"<w:p><w:pPr><w:ind w:left="3168"/></w:pPr><w:r><w:t>ANNA</w:t></w:r></w:p>"#,
            r#"<w:p><w:pPr><w:ind w:left="1440"/></w:pPr><w:r><w:t xml:space="preserve">Who </w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>are</w:t></w:r><w:r><w:t xml:space="preserve"> you?</w:t></w:r></w:p>"#,
            r#"<w:p/>"#,
            r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Act one</w:t></w:r></w:p>"#,
        ));

        let doc = DocxCodec.import(&bytes, &ImportOptions::default()).unwrap();

        assert_eq!(
            types_and_texts(&doc),
            vec![
                (BlockType::SceneHeading, "INT. OFFICE - NIGHT".to_string()),
                (BlockType::Character, "ANNA".to_string()),
                (BlockType::Dialogue, "Who are you?".to_string()),
                (BlockType::ActHeading, "Act one".to_string()),
            ]
        );
    }

    #[test]
    fn test_package_without_content_types_is_not_a_document() {
        let mut archive = ArchiveWriter::new();
        archive.add(DOCUMENT, b"<w:document/>").unwrap();
        let bytes = archive.finish().unwrap();

        assert!(matches!(
            DocxCodec.import(&bytes, &ImportOptions::default()),
            Err(ImportError::UnableToOpenArchive(_))
        ));
    }

    #[test]
    fn test_package_without_document_is_corrupt() {
        let mut archive = ArchiveWriter::new();
        archive.add(CONTENT_TYPES, b"<Types/>").unwrap();
        let bytes = archive.finish().unwrap();

        assert!(matches!(
            DocxCodec.import(&bytes, &ImportOptions::default()),
            Err(ImportError::CorruptContainer(_))
        ));
    }

    #[test]
    fn test_export_is_deterministic() {
        let doc = Document::from_blocks(DocumentKind::Screenplay, [(BlockType::Action, "Same")]);
        let template = Template::default();
        assert_eq!(
            DocxCodec.export(&doc, &template).unwrap(),
            DocxCodec.export(&doc, &template).unwrap()
        );
    }

    #[test]
    fn test_cancel_stops_reading_paragraphs() {
        // Given an intact package and a token cancelled after it was opened
        let bytes = package(r#"<w:p><w:r><w:t>One</w:t></w:r></w:p><w:p><w:r><w:t>Two</w:t></w:r></w:p>"#);
        let options = ImportOptions::default();
        options.cancel.cancel();

        // When the paragraphs are read
        let result = DocxCodec.import(&bytes, &options);

        // Then the reader stops instead of returning a partial document
        assert!(matches!(
            result,
            Err(ImportError::Cancelled(crate::cancel::Cancelled))
        ));
    }

    #[test]
    fn test_cancel_stops_writing() {
        let doc = Document::from_blocks(DocumentKind::Screenplay, [(BlockType::Action, "One")]);
        let options = ExportOptions::default();
        options.cancel.cancel();

        assert!(matches!(
            DocxCodec.export_with(&doc, &Template::default(), &options),
            Err(ExportError::Cancelled(crate::cancel::Cancelled))
        ));
    }
}
