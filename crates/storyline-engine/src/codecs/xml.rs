//! Small conveniences over quick-xml shared by the XML-based codecs.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::codecs::{ExportError, ImportError};

/// Unescaped value of an attribute, looked up by its qualified name.
pub(crate) fn attr(element: &BytesStart, name: &str) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name.as_bytes())
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// `true` for boolean attributes such as `bold="1"` or `w:val="true"`.
pub(crate) fn is_truthy(value: Option<&str>) -> bool {
    !matches!(value, Some("0" | "false" | "off" | "none"))
}

/// Text content with entities resolved. Unknown entities are kept verbatim.
pub(crate) fn text(event: &BytesText) -> String {
    match event.unescape() {
        Ok(text) => text.into_owned(),
        Err(_) => String::from_utf8_lossy(event).into_owned(),
    }
}

/// Map a reader failure to an import error. A failure at the very end of
/// the input means the stream was cut short.
pub(crate) fn read_failure(error: &quick_xml::Error, position: u64, input_len: usize) -> ImportError {
    if position as usize >= input_len {
        ImportError::UnexpectedEndOfFile { offset: input_len }
    } else {
        ImportError::UnsupportedFormatVariant(format!("XML error at byte {position}: {error}"))
    }
}

/// Event writer that turns every failure into [`ExportError::WriteFailed`].
pub(crate) struct XmlOut {
    writer: Writer<Vec<u8>>,
}

impl XmlOut {
    pub(crate) fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
        }
    }

    pub(crate) fn declaration(&mut self, standalone: bool) -> Result<(), ExportError> {
        let standalone = standalone.then_some("yes");
        self.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), standalone)))
    }

    pub(crate) fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), ExportError> {
        let element = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.event(Event::Start(element))
    }

    pub(crate) fn close(&mut self, name: &str) -> Result<(), ExportError> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    pub(crate) fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), ExportError> {
        let element = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.event(Event::Empty(element))
    }

    pub(crate) fn text(&mut self, text: &str) -> Result<(), ExportError> {
        self.event(Event::Text(BytesText::new(text)))
    }

    /// `<name attrs>text</name>`
    pub(crate) fn element(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> Result<(), ExportError> {
        self.open(name, attrs)?;
        self.text(text)?;
        self.close(name)
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), ExportError> {
        self.writer
            .write_event(event)
            .map_err(ExportError::write_failed)
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}
