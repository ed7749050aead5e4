//! # Format Codecs
//!
//! Every external format is a unit struct implementing [`Importer`] and, when
//! the format can be written, [`Exporter`]. The closed [`Codec`] enum
//! dispatches to them by [`Format`], and [`CodecRegistry`] resolves format
//! ids and file extensions.
//!
//! ## Module Structure
//!
//! - **`fountain`**: plain-text screenplay markup
//! - **`plain_text`**: paginated text pages, heuristic import
//! - **`docx`** / **`odt`**: word-processor XML inside a zip container
//! - **`rtf`**: rich text, tokenized by `storyline-syntax`
//! - **`fdx`**: Final Draft XML
//! - **`markdown`**: headings and paragraphs of text documents
//! - **`kit_scenarist`**: legacy KIT Scenarist scenario XML, import only
//! - **`celtx`**: HTML scripts inside Celtx projects, import only
//! - **`heuristics`**: paragraph classification for formats without types
//!
//! Importers tolerate foreign content: unknown styles and tags fall back to
//! the closest block type and are logged at `debug`. Only a broken container
//! or a truncated stream is an error.

mod archive;
pub mod celtx;
pub mod docx;
pub mod error;
pub mod fdx;
pub mod fountain;
pub mod heuristics;
pub mod kit_scenarist;
pub mod markdown;
pub mod odt;
pub mod plain_text;
pub mod rtf;
mod xml;

use log::info;
use std::collections::BTreeMap;

use crate::cancel::CancellationToken;
use crate::editing::Document;
use crate::models::{Dictionaries, DocumentKind};
use crate::template::Template;

pub use error::{ExportError, ImportError};

/// External formats known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Format {
    Fountain,
    Docx,
    Odt,
    Rtf,
    PlainText,
    Markdown,
    FinalDraft,
    KitScenarist,
    Celtx,
}

impl Format {
    pub const ALL: [Format; 9] = [
        Format::Fountain,
        Format::Docx,
        Format::Odt,
        Format::Rtf,
        Format::PlainText,
        Format::Markdown,
        Format::FinalDraft,
        Format::KitScenarist,
        Format::Celtx,
    ];

    /// Stable format id, also the preferred file extension.
    pub fn id(self) -> &'static str {
        match self {
            Format::Fountain => "fountain",
            Format::Docx => "docx",
            Format::Odt => "odt",
            Format::Rtf => "rtf",
            Format::PlainText => "txt",
            Format::Markdown => "md",
            Format::FinalDraft => "fdx",
            Format::KitScenarist => "kitsp",
            Format::Celtx => "celtx",
        }
    }

    pub fn from_id(id: &str) -> Option<Format> {
        Format::ALL.into_iter().find(|f| f.id() == id)
    }

    /// Format for a file extension, case-insensitively.
    pub fn from_extension(extension: &str) -> Option<Format> {
        match extension.to_ascii_lowercase().as_str() {
            "fountain" | "spmd" => Some(Format::Fountain),
            "docx" => Some(Format::Docx),
            "odt" => Some(Format::Odt),
            "rtf" => Some(Format::Rtf),
            "txt" | "text" => Some(Format::PlainText),
            "md" | "markdown" => Some(Format::Markdown),
            "fdx" => Some(Format::FinalDraft),
            "kitsp" => Some(Format::KitScenarist),
            "celtx" => Some(Format::Celtx),
            _ => None,
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// What an importer needs besides the bytes.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Kind of the resulting document; formats that only carry one kind
    /// ignore it
    pub kind: DocumentKind,
    pub dictionaries: Dictionaries,
    /// Checked between paragraphs and tokens while reading
    pub cancel: CancellationToken,
}

impl ImportOptions {
    pub fn new(kind: DocumentKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }
}

/// What an exporter needs besides the document and template.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Canonical scene intros and transitions for text formats
    pub dictionaries: Dictionaries,
    /// Checked between blocks while writing
    pub cancel: CancellationToken,
}

pub trait Importer {
    fn import(&self, bytes: &[u8], options: &ImportOptions) -> Result<Document, ImportError>;
}

pub trait Exporter {
    fn export_with(
        &self,
        document: &Document,
        template: &Template,
        options: &ExportOptions,
    ) -> Result<Vec<u8>, ExportError>;

    fn export(&self, document: &Document, template: &Template) -> Result<Vec<u8>, ExportError> {
        self.export_with(document, template, &ExportOptions::default())
    }
}

/// Refuse to write documents that still hold unresolved block types.
pub(crate) fn ensure_resolved(document: &Document) -> Result<(), ExportError> {
    match document.first_unresolved() {
        Some(block) => Err(ExportError::UnresolvedBlockType(block.id)),
        None => Ok(()),
    }
}

/// Decode text input, dropping a byte order mark and normalizing line ends.
pub(crate) fn decode_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// One codec per format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Fountain(fountain::FountainCodec),
    Docx(docx::DocxCodec),
    Odt(odt::OdtCodec),
    Rtf(rtf::RtfCodec),
    PlainText(plain_text::PlainTextCodec),
    Markdown(markdown::MarkdownCodec),
    FinalDraft(fdx::FdxCodec),
    KitScenarist(kit_scenarist::KitScenaristCodec),
    Celtx(celtx::CeltxCodec),
}

impl Codec {
    pub fn for_format(format: Format) -> Codec {
        match format {
            Format::Fountain => Codec::Fountain(fountain::FountainCodec),
            Format::Docx => Codec::Docx(docx::DocxCodec),
            Format::Odt => Codec::Odt(odt::OdtCodec),
            Format::Rtf => Codec::Rtf(rtf::RtfCodec),
            Format::PlainText => Codec::PlainText(plain_text::PlainTextCodec),
            Format::Markdown => Codec::Markdown(markdown::MarkdownCodec),
            Format::FinalDraft => Codec::FinalDraft(fdx::FdxCodec),
            Format::KitScenarist => Codec::KitScenarist(kit_scenarist::KitScenaristCodec),
            Format::Celtx => Codec::Celtx(celtx::CeltxCodec),
        }
    }

    pub fn format(&self) -> Format {
        match self {
            Codec::Fountain(_) => Format::Fountain,
            Codec::Docx(_) => Format::Docx,
            Codec::Odt(_) => Format::Odt,
            Codec::Rtf(_) => Format::Rtf,
            Codec::PlainText(_) => Format::PlainText,
            Codec::Markdown(_) => Format::Markdown,
            Codec::FinalDraft(_) => Format::FinalDraft,
            Codec::KitScenarist(_) => Format::KitScenarist,
            Codec::Celtx(_) => Format::Celtx,
        }
    }

    pub fn can_export(&self) -> bool {
        !matches!(self, Codec::KitScenarist(_) | Codec::Celtx(_))
    }

    pub fn import(&self, bytes: &[u8], options: &ImportOptions) -> Result<Document, ImportError> {
        info!("Importing {} bytes as {}", bytes.len(), self.format());
        let document = match self {
            Codec::Fountain(codec) => codec.import(bytes, options),
            Codec::Docx(codec) => codec.import(bytes, options),
            Codec::Odt(codec) => codec.import(bytes, options),
            Codec::Rtf(codec) => codec.import(bytes, options),
            Codec::PlainText(codec) => codec.import(bytes, options),
            Codec::Markdown(codec) => codec.import(bytes, options),
            Codec::FinalDraft(codec) => codec.import(bytes, options),
            Codec::KitScenarist(codec) => codec.import(bytes, options),
            Codec::Celtx(codec) => codec.import(bytes, options),
        }?;
        info!("Imported {} blocks from {}", document.len(), self.format());
        Ok(document)
    }

    pub fn export(&self, document: &Document, template: &Template) -> Result<Vec<u8>, ExportError> {
        self.export_with(document, template, &ExportOptions::default())
    }

    pub fn export_with(
        &self,
        document: &Document,
        template: &Template,
        options: &ExportOptions,
    ) -> Result<Vec<u8>, ExportError> {
        ensure_resolved(document)?;
        options.cancel.check()?;
        info!("Exporting {} blocks as {}", document.len(), self.format());
        let bytes = match self {
            Codec::Fountain(codec) => codec.export_with(document, template, options),
            Codec::Docx(codec) => codec.export_with(document, template, options),
            Codec::Odt(codec) => codec.export_with(document, template, options),
            Codec::Rtf(codec) => codec.export_with(document, template, options),
            Codec::PlainText(codec) => codec.export_with(document, template, options),
            Codec::Markdown(codec) => codec.export_with(document, template, options),
            Codec::FinalDraft(codec) => codec.export_with(document, template, options),
            Codec::KitScenarist(_) => Err(ExportError::ExportNotSupported(Format::KitScenarist)),
            Codec::Celtx(_) => Err(ExportError::ExportNotSupported(Format::Celtx)),
        }?;
        info!("Exported {} bytes as {}", bytes.len(), self.format());
        Ok(bytes)
    }

    /// [`Codec::import`] that stops with `Cancelled` as soon as `token` is
    /// cancelled, also while the importer is running.
    pub fn import_with_cancel(
        &self,
        bytes: &[u8],
        options: &ImportOptions,
        token: &CancellationToken,
    ) -> Result<Document, ImportError> {
        token.check()?;
        let options = ImportOptions {
            cancel: token.clone(),
            ..options.clone()
        };
        let document = self.import(bytes, &options)?;
        token.check()?;
        Ok(document)
    }

    pub fn export_with_cancel(
        &self,
        document: &Document,
        template: &Template,
        token: &CancellationToken,
    ) -> Result<Vec<u8>, ExportError> {
        let options = ExportOptions {
            cancel: token.clone(),
            ..ExportOptions::default()
        };
        let bytes = self.export_with(document, template, &options)?;
        token.check()?;
        Ok(bytes)
    }
}

/// Codecs keyed by format.
#[derive(Debug, Clone)]
pub struct CodecRegistry {
    codecs: BTreeMap<Format, Codec>,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CodecRegistry {
    /// Registry with every known format.
    pub fn new() -> Self {
        Self {
            codecs: Format::ALL
                .into_iter()
                .map(|format| (format, Codec::for_format(format)))
                .collect(),
        }
    }

    pub fn get(&self, format: Format) -> Option<&Codec> {
        self.codecs.get(&format)
    }

    /// Codec for a format id such as `fountain` or `fdx`.
    pub fn by_id(&self, id: &str) -> Option<&Codec> {
        Format::from_id(id).and_then(|format| self.get(format))
    }

    pub fn for_extension(&self, extension: &str) -> Option<&Codec> {
        Format::from_extension(extension).and_then(|format| self.get(format))
    }

    pub fn formats(&self) -> impl Iterator<Item = Format> + '_ {
        self.codecs.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::Cancelled;
    use crate::models::BlockType;
    use rstest::rstest;

    #[rstest]
    #[case("fountain", Some(Format::Fountain))]
    #[case("FDX", Some(Format::FinalDraft))]
    #[case("Docx", Some(Format::Docx))]
    #[case("kitsp", Some(Format::KitScenarist))]
    #[case("CELTX", Some(Format::Celtx))]
    #[case("pdf", None)]
    fn test_format_from_extension(#[case] extension: &str, #[case] expected: Option<Format>) {
        assert_eq!(Format::from_extension(extension), expected);
    }

    #[test]
    fn test_ids_round_trip() {
        for format in Format::ALL {
            assert_eq!(Format::from_id(format.id()), Some(format));
        }
    }

    #[test]
    fn test_registry_has_every_format() {
        let registry = CodecRegistry::new();
        assert_eq!(registry.formats().count(), Format::ALL.len());
        assert_eq!(
            registry.by_id("txt").map(Codec::format),
            Some(Format::PlainText)
        );
        assert_eq!(
            registry.for_extension("MD").map(Codec::format),
            Some(Format::Markdown)
        );
    }

    #[rstest]
    #[case(Format::KitScenarist)]
    #[case(Format::Celtx)]
    fn test_import_only_formats(#[case] format: Format) {
        let codec = Codec::for_format(format);
        let doc = Document::new(DocumentKind::Screenplay);

        let err = codec.export(&doc, &Template::default()).unwrap_err();

        assert!(!codec.can_export());
        assert!(matches!(err, ExportError::ExportNotSupported(f) if f == format));
    }

    #[test]
    fn test_export_refuses_unresolved_types() {
        let mut doc = Document::new(DocumentKind::Screenplay);
        let id = doc.push(BlockType::Undefined, "???").id;

        let err = Codec::for_format(Format::Fountain)
            .export(&doc, &Template::default())
            .unwrap_err();

        assert!(matches!(err, ExportError::UnresolvedBlockType(block) if block == id));
    }

    #[test]
    fn test_cancelled_import_returns_no_document() {
        let token = CancellationToken::new();
        token.cancel();

        let result = Codec::for_format(Format::Fountain).import_with_cancel(
            b"INT. HOUSE - DAY",
            &ImportOptions::default(),
            &token,
        );

        assert!(matches!(result, Err(ImportError::Cancelled(Cancelled))));
    }

    #[test]
    fn test_decode_text_normalizes_line_ends() {
        assert_eq!(decode_text(b"\xef\xbb\xbfa\r\nb\rc"), "a\nb\nc");
    }
}
