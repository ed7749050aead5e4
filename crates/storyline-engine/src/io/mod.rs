use log::info;
use relative_path::RelativePathBuf;
use std::fs;
use std::path::{Path, PathBuf};

use crate::codecs::{Codec, ExportError, ImportError, ImportOptions};
use crate::editing::Document;
use crate::models::ScriptFile;
use crate::template::Template;

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No known format for {0}")]
    UnknownFormat(String),
    #[error("Import failed: {0}")]
    Import(#[from] ImportError),
    #[error("Export failed: {0}")]
    Export(#[from] ExportError),
    #[error("Invalid project directory: {0}")]
    InvalidProjectDir(String),
}

fn codec_for(file: &ScriptFile) -> Result<Codec, IoError> {
    file.format()
        .map(Codec::for_format)
        .ok_or_else(|| IoError::UnknownFormat(file.relative_path().to_string()))
}

/// Read and import a script, picking the codec from its extension
pub fn read_script(
    file: &ScriptFile,
    project_root: &Path,
    options: &ImportOptions,
) -> Result<Document, IoError> {
    let codec = codec_for(file)?;
    let absolute_path = file.relative_path().to_path(project_root);
    if !absolute_path.exists() {
        return Err(IoError::NotFound(absolute_path));
    }
    let bytes = fs::read(&absolute_path)?;
    info!("Reading {} as {}", file.relative_path(), codec.format());
    Ok(codec.import(&bytes, options)?)
}

/// Export a script in the format its extension names
pub fn write_script(
    file: &ScriptFile,
    project_root: &Path,
    document: &Document,
    template: &Template,
) -> Result<(), IoError> {
    let codec = codec_for(file)?;
    let bytes = codec.export(document, template)?;
    let absolute_path = file.relative_path().to_path(project_root);

    // Create parent directories if they don't exist
    if let Some(parent) = absolute_path.parent() {
        fs::create_dir_all(parent)?;
    }

    info!("Writing {} as {}", file.relative_path(), codec.format());
    fs::write(&absolute_path, bytes)?;
    Ok(())
}

/// Scan for files of known formats in the project directory
pub fn scan_script_files(project_root: &Path) -> Result<Vec<ScriptFile>, IoError> {
    validate_project_dir(project_root)?;

    let mut paths = Vec::new();
    scan_directory_recursive(project_root, &mut paths)?;
    paths.sort();
    Ok(paths
        .into_iter()
        .filter_map(|path| {
            let relative = path.strip_prefix(project_root).ok()?;
            RelativePathBuf::from_path(relative).ok()
        })
        .map(ScriptFile::new)
        .filter(|file| file.format().is_some())
        .collect())
}

fn scan_directory_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), IoError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            scan_directory_recursive(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

pub fn validate_project_dir(path: &Path) -> Result<(), IoError> {
    if !path.exists() || !path.is_dir() {
        return Err(IoError::InvalidProjectDir(format!(
            "{} is not a directory",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BlockType, DocumentKind};
    use crate::tests::{create_test_file, create_test_project_dir};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_read_script_detects_format() {
        // Given a fountain file in a project
        let project = create_test_project_dir();
        create_test_file(&project, "pilot.fountain", "INT. HOUSE - DAY\n\nJohn waits.\n");

        // When it is read
        let doc = read_script(
            &ScriptFile::from("pilot.fountain"),
            project.path(),
            &ImportOptions::default(),
        )
        .unwrap();

        // Then the fountain codec parsed it
        assert_eq!(doc.get(0).map(|b| b.block_type), Some(BlockType::SceneHeading));
        assert_eq!(doc.get(1).map(|b| b.text.as_str()), Some("John waits."));
    }

    #[test]
    fn test_read_script_not_found() {
        let project = create_test_project_dir();
        let result = read_script(
            &ScriptFile::from("missing.fdx"),
            project.path(),
            &ImportOptions::default(),
        );
        assert!(matches!(result, Err(IoError::NotFound(_))));
    }

    #[test]
    fn test_unknown_extension() {
        let project = create_test_project_dir();
        create_test_file(&project, "notes.pdf", "%PDF");

        let result = read_script(
            &ScriptFile::from("notes.pdf"),
            project.path(),
            &ImportOptions::default(),
        );
        assert!(matches!(result, Err(IoError::UnknownFormat(_))));
    }

    #[test]
    fn test_import_failure_is_wrapped() {
        let project = create_test_project_dir();
        create_test_file(&project, "broken.fdx", "<FinalDraft><Content>");

        let result = read_script(
            &ScriptFile::from("broken.fdx"),
            project.path(),
            &ImportOptions::default(),
        );
        assert!(matches!(
            result,
            Err(IoError::Import(ImportError::UnexpectedEndOfFile { .. }))
        ));
    }

    #[test]
    fn test_write_script_creates_parent_directories() {
        // Given a document and a nested target path
        let project = create_test_project_dir();
        let doc = Document::from_blocks(
            DocumentKind::Screenplay,
            [(BlockType::Action, "Rain.")],
        );
        let file = ScriptFile::from("drafts/second/pilot.fdx");

        // When it is written and read back
        write_script(&file, project.path(), &doc, &Template::default()).unwrap();
        let reread = read_script(&file, project.path(), &ImportOptions::default()).unwrap();

        // Then the folders exist and the content survived
        assert!(project.path().join("drafts").join("second").is_dir());
        assert_eq!(reread.text(), doc.text());
    }

    #[test]
    fn test_scan_finds_known_formats_only() {
        // Given a project with mixed file types
        let project = create_test_project_dir();
        create_test_file(&project, "pilot.fountain", "");
        create_test_file(&project, "image.png", "fake image data");
        std::fs::create_dir(project.path().join("old")).unwrap();
        std::fs::write(project.path().join("old").join("draft.FDX"), "").unwrap();

        // When scanning for scripts
        let files = scan_script_files(project.path()).unwrap();

        // Then only scripts are found, in path order
        let names: Vec<&str> = files.iter().map(|f| f.relative_path().as_str()).collect();
        assert_eq!(names, vec!["old/draft.FDX", "pilot.fountain"]);
    }

    #[test]
    fn test_scan_invalid_project_directory() {
        let result = scan_script_files(Path::new("/this/path/does/not/exist"));
        assert!(matches!(result, Err(IoError::InvalidProjectDir(_))));
    }
}
