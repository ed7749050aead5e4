use relative_path::{RelativePath, RelativePathBuf};

use crate::codecs::Format;

/// A script file inside a project directory, with its detected format
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptFile {
    relative_path: RelativePathBuf,
    display_name: String,
    format: Option<Format>,
}

impl ScriptFile {
    /// Create a new ScriptFile from a relative path
    pub fn new(relative_path: RelativePathBuf) -> Self {
        let display_name = Self::extract_display_name(&relative_path);
        let format = relative_path.extension().and_then(Format::from_extension);

        Self {
            relative_path,
            display_name,
            format,
        }
    }

    /// Create from a relative path string
    pub fn from_relative_str(path: &str) -> Self {
        Self::new(RelativePathBuf::from(path))
    }

    pub fn relative_path(&self) -> &RelativePath {
        &self.relative_path
    }

    /// File name without its extension
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Format implied by the extension, if it is one we know
    pub fn format(&self) -> Option<Format> {
        self.format
    }

    fn extract_display_name(path: &RelativePath) -> String {
        path.file_stem().unwrap_or("Untitled").to_string()
    }
}

impl From<RelativePathBuf> for ScriptFile {
    fn from(path: RelativePathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&str> for ScriptFile {
    fn from(path: &str) -> Self {
        Self::from_relative_str(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("drafts/pilot.fountain", "pilot", Some(Format::Fountain))]
    #[case("pilot.FDX", "pilot", Some(Format::FinalDraft))]
    #[case("notes/readme", "readme", None)]
    #[case("old/project.kitsp", "project", Some(Format::KitScenarist))]
    #[case("old/pilot.celtx", "pilot", Some(Format::Celtx))]
    fn test_script_file_detection(
        #[case] path: &str,
        #[case] name: &str,
        #[case] format: Option<Format>,
    ) {
        let file = ScriptFile::from(path);
        assert_eq!(file.display_name(), name);
        assert_eq!(file.format(), format);
        assert_eq!(file.relative_path().as_str(), path);
    }
}
