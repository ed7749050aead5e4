use crate::cancel::Cancelled;
use crate::codecs::Format;
use crate::models::BlockId;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Unable to open archive: {0}")]
    UnableToOpenArchive(String),
    #[error("Unexpected end of file at byte {offset}")]
    UnexpectedEndOfFile { offset: usize },
    #[error("Unsupported format variant: {0}")]
    UnsupportedFormatVariant(String),
    #[error("Corrupt container: {0}")]
    CorruptContainer(String),
    #[error("Importing {0} is not supported")]
    ImportNotSupported(Format),
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Failed to write output: {0}")]
    WriteFailed(String),
    #[error("Font {font:?} cannot be encoded in this format")]
    EncodingUnsupportedForTemplate { font: String },
    #[error("Block {0} has no resolved type")]
    UnresolvedBlockType(BlockId),
    #[error("Exporting {0} is not supported")]
    ExportNotSupported(Format),
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl ExportError {
    /// Whether the same export may succeed when tried again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExportError::WriteFailed(_))
    }

    pub(crate) fn write_failed(error: impl std::fmt::Display) -> Self {
        ExportError::WriteFailed(error.to_string())
    }
}

impl From<std::io::Error> for ExportError {
    fn from(error: std::io::Error) -> Self {
        ExportError::write_failed(error)
    }
}

impl From<zip::result::ZipError> for ExportError {
    fn from(error: zip::result::ZipError) -> Self {
        ExportError::write_failed(error)
    }
}
