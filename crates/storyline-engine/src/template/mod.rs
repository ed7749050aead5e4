//! # Templates
//!
//! A [`Template`] is the single source of truth for how a block type looks:
//! page geometry, one [`ParagraphStyle`] per type, numbering and duration
//! rules. Templates are plain serde values stored as TOML.
//!
//! [`Template::resolve`] is total: types a template leaves out fall back to
//! the built-in defaults in [`defaults`].

pub mod defaults;
pub mod page;
pub mod style;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::{BlockType, DocumentKind};

pub use page::{Margins, PageNumberPosition, PageSetup, PageSize};
pub use style::{Font, LineSpacing, ParagraphStyle};

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Failed to read template at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse template at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize template: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Failed to write template at {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Scene and dialogue numbering rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumberingOptions {
    pub scene_numbers: bool,
    /// First scene number in each numbering scope
    pub scene_start: u32,
    pub scene_prefix: String,
    pub scene_suffix: String,
    /// When off, counters restart at every act heading
    pub continue_through_document: bool,
    pub dialogue_numbers: bool,
}

impl Default for NumberingOptions {
    fn default() -> Self {
        Self {
            scene_numbers: true,
            scene_start: 1,
            scene_prefix: String::new(),
            scene_suffix: ".".to_string(),
            continue_through_document: true,
            dialogue_numbers: false,
        }
    }
}

/// How running time is estimated from a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum DurationMode {
    PerPage {
        seconds_per_page: f64,
    },
    /// A fixed time for every non-empty paragraph
    PerEntry {
        seconds_per_entry: f64,
    },
    ByWordCount {
        words: u32,
        seconds: f64,
    },
    ByLetterCount {
        letters: u32,
        seconds: f64,
        count_spaces: bool,
    },
}

impl Default for DurationMode {
    fn default() -> Self {
        DurationMode::PerPage {
            seconds_per_page: 60.0,
        }
    }
}

/// Literals for a dialogue broken across pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinuationMarkers {
    pub enabled: bool,
    /// Written under the fragment before the break
    pub more: String,
    /// Appended to the character name above the fragment after the break
    pub continued: String,
}

impl Default for ContinuationMarkers {
    fn default() -> Self {
        Self {
            enabled: true,
            more: "(MORE)".to_string(),
            continued: "(CONT'D)".to_string(),
        }
    }
}

/// A named, versioned layout configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub version: u32,
    pub kind: DocumentKind,
    pub page: PageSetup,
    pub two_columns: bool,
    pub numbering: NumberingOptions,
    pub duration: DurationMode,
    pub continuation: ContinuationMarkers,
    pub styles: Vec<ParagraphStyle>,
}

impl Default for Template {
    fn default() -> Self {
        Self::builtin(DocumentKind::Screenplay)
    }
}

impl Template {
    /// Built-in template for a document kind, with every style spelled out.
    pub fn builtin(kind: DocumentKind) -> Self {
        let (id, name) = match kind {
            DocumentKind::Screenplay => ("screenplay_us", "Screenplay (US Letter)"),
            DocumentKind::ComicBook => ("comic_book", "Comic book"),
            DocumentKind::Audioplay => ("audioplay", "Audioplay"),
            DocumentKind::Stageplay => ("stageplay", "Stageplay"),
            DocumentKind::Text => ("text", "Text document"),
        };
        Self {
            id: id.to_string(),
            name: name.to_string(),
            version: 1,
            kind,
            page: PageSetup::default(),
            two_columns: false,
            numbering: NumberingOptions {
                scene_numbers: kind == DocumentKind::Screenplay,
                ..NumberingOptions::default()
            },
            duration: DurationMode::default(),
            continuation: ContinuationMarkers::default(),
            styles: kind
                .block_types()
                .map(|t| defaults::default_style(t, kind))
                .collect(),
        }
    }

    /// Resolved style for a block type. Never fails.
    pub fn resolve(&self, block_type: BlockType) -> ParagraphStyle {
        let block_type = match block_type {
            BlockType::Undefined => BlockType::Action,
            other => other,
        };
        self.styles
            .iter()
            .find(|s| s.block_type == block_type)
            .cloned()
            .unwrap_or_else(|| defaults::default_style(block_type, self.kind))
    }

    /// Text area width for the style's column, in millimetres.
    pub fn text_width_mm(&self) -> f32 {
        if self.two_columns {
            self.page.left_column_width_mm()
        } else {
            self.page.text_width_mm()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml_string(&self) -> Result<String, TemplateError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| TemplateError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), TemplateError> {
        let path = path.as_ref();
        let content = self.to_toml_string()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| TemplateError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| TemplateError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_is_total_for_every_kind() {
        for kind in [
            DocumentKind::Screenplay,
            DocumentKind::ComicBook,
            DocumentKind::Audioplay,
            DocumentKind::Stageplay,
            DocumentKind::Text,
        ] {
            let template = Template {
                styles: Vec::new(),
                ..Template::builtin(kind)
            };
            for t in kind.block_types() {
                assert_eq!(template.resolve(t).block_type, t);
            }
        }
    }

    #[test]
    fn test_resolve_prefers_template_style() {
        // Given a template that overrides only the character style
        let template = Template {
            styles: vec![ParagraphStyle {
                block_type: BlockType::Character,
                bold: true,
                ..ParagraphStyle::default()
            }],
            ..Template::default()
        };

        // Then character uses it and dialogue falls back to the default
        assert!(template.resolve(BlockType::Character).bold);
        assert_eq!(
            template.resolve(BlockType::Dialogue),
            defaults::default_style(BlockType::Dialogue, DocumentKind::Screenplay)
        );
    }

    #[test]
    fn test_partial_toml_template() {
        let content = r#"
id = "short"
name = "Short film"
version = 3

[duration]
mode = "by_word_count"
words = 150
seconds = 60.0

[[styles]]
block_type = "scene_heading"
bold = true
uppercase = true
"#;
        let template = Template::from_toml_str(content).unwrap();
        assert_eq!(template.version, 3);
        assert_eq!(template.styles.len(), 1);
        assert!(template.resolve(BlockType::SceneHeading).bold);
        assert_eq!(
            template.duration,
            DurationMode::ByWordCount {
                words: 150,
                seconds: 60.0
            }
        );
        assert_eq!(template.continuation.more, "(MORE)");
    }

    #[test]
    fn test_save_and_load_template() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("templates").join("screenplay.toml");
        let template = Template::builtin(DocumentKind::Screenplay);

        template.save_to_path(&path).unwrap();
        let loaded = Template::load_from_path(&path).unwrap();

        assert_eq!(loaded, template);
    }

    #[test]
    fn test_load_missing_template() {
        let temp_dir = TempDir::new().unwrap();
        let err = Template::load_from_path(temp_dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, TemplateError::Read { .. }));
    }
}
