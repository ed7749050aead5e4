//! Zip containers for the office formats.

use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::codecs::{ExportError, ImportError};

pub(crate) struct ArchiveReader<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> ArchiveReader<'a> {
    pub(crate) fn open(bytes: &'a [u8]) -> Result<Self, ImportError> {
        let archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ImportError::UnableToOpenArchive(e.to_string()))?;
        Ok(Self { archive })
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.archive.index_for_name(name).is_some()
    }

    /// Entry names, in the order the archive lists them.
    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.archive.file_names()
    }

    /// Entry content as text, `None` when the entry is absent.
    pub(crate) fn read(&mut self, name: &str) -> Result<Option<String>, ImportError> {
        let mut entry = match self.archive.by_name(name) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(ImportError::CorruptContainer(format!("{name}: {e}"))),
        };
        let mut content = String::new();
        entry
            .read_to_string(&mut content)
            .map_err(|e| ImportError::CorruptContainer(format!("{name}: {e}")))?;
        Ok(Some(content))
    }
}

/// Writes entries with fixed timestamps, so equal input gives equal bytes.
pub(crate) struct ArchiveWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
}

impl ArchiveWriter {
    pub(crate) fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    fn options(method: CompressionMethod) -> SimpleFileOptions {
        SimpleFileOptions::default()
            .compression_method(method)
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644)
    }

    pub(crate) fn add(&mut self, name: &str, content: &[u8]) -> Result<(), ExportError> {
        self.zip
            .start_file(name, Self::options(CompressionMethod::Deflated))?;
        self.zip.write_all(content)?;
        Ok(())
    }

    /// Add an entry without compression, as `mimetype` entries must be.
    pub(crate) fn add_stored(&mut self, name: &str, content: &[u8]) -> Result<(), ExportError> {
        self.zip
            .start_file(name, Self::options(CompressionMethod::Stored))?;
        self.zip.write_all(content)?;
        Ok(())
    }

    pub(crate) fn finish(self) -> Result<Vec<u8>, ExportError> {
        Ok(self.zip.finish()?.into_inner())
    }
}
