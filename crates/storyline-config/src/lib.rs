use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid templates directory {templates_dir}: {source}")]
    TemplatePatternError {
        templates_dir: PathBuf,
        source: glob::PatternError,
    },
}

/// Defaults applied when importing formats that do not name a document kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportDefaults {
    /// Document kind id such as `screenplay` or `audioplay`
    pub kind: String,
}

impl Default for ImportDefaults {
    fn default() -> Self {
        Self {
            kind: "screenplay".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Folder scripts are read from and written to
    pub project_path: Option<PathBuf>,
    /// Folder of `*.toml` templates
    pub templates_dir: PathBuf,
    /// Template name, without extension, used when none is given
    pub default_template: Option<String>,
    /// Dictionary file for the corrector and importers
    pub dictionaries_path: Option<PathBuf>,
    pub import: ImportDefaults,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_path: None,
            templates_dir: Self::config_dir().join("templates"),
            default_template: None,
            dictionaries_path: None,
            import: ImportDefaults::default(),
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the loaded paths
        config.templates_dir = Self::expand_or_keep(config.templates_dir);
        config.project_path = config.project_path.map(Self::expand_or_keep);
        config.dictionaries_path = config.dictionaries_path.map(Self::expand_or_keep);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    fn config_dir() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/storyline");
        PathBuf::from(config_dir.as_ref())
    }

    /// Path of the named template in the templates directory
    pub fn template_path(&self, name: &str) -> PathBuf {
        self.templates_dir.join(format!("{name}.toml"))
    }

    /// Template files in the templates directory, sorted by path
    pub fn list_templates(&self) -> Result<Vec<PathBuf>, ConfigError> {
        let pattern = self.templates_dir.join("*.toml");
        let entries = glob::glob(&pattern.to_string_lossy()).map_err(|source| {
            ConfigError::TemplatePatternError {
                templates_dir: self.templates_dir.clone(),
                source,
            }
        })?;
        let mut templates: Vec<PathBuf> = entries.filter_map(Result::ok).collect();
        templates.sort();
        Ok(templates)
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }

    fn expand_or_keep(path: PathBuf) -> PathBuf {
        Self::expand_path(&path).unwrap_or(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        // Should not contain tilde anymore
        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/storyline/config.toml"));
    }

    #[test]
    fn test_missing_keys_take_defaults() {
        let config: Config = toml::from_str("default_template = \"stage\"\n").unwrap();

        assert_eq!(config.default_template.as_deref(), Some("stage"));
        assert_eq!(config.import.kind, "screenplay");
        assert!(config.templates_dir.ends_with("storyline/templates"));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test/path");
        let expanded = Config::expand_path(&path);

        assert!(expanded.is_some());
        let expanded = expanded.unwrap();
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_with_env_var() {
        unsafe {
            env::set_var("STORYLINE_TEST_VAR", "/test/env/path");
        }

        let path = PathBuf::from("$STORYLINE_TEST_VAR/subdir");
        let expanded = Config::expand_path(&path);

        assert_eq!(expanded, Some(PathBuf::from("/test/env/path/subdir")));

        unsafe {
            env::remove_var("STORYLINE_TEST_VAR");
        }
    }

    #[test]
    fn test_expand_path_with_relative_path() {
        let path = PathBuf::from("relative/path");
        let expanded = Config::expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "templates_dir = [").unwrap();

        let result = Config::load_from_path(&config_file);

        assert!(matches!(result, Err(ConfigError::ConfigParseError { .. })));
    }

    #[test]
    fn test_save_and_load_config() {
        // Given a config with every field set
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let test_config = Config {
            project_path: Some(PathBuf::from("/tmp/scripts")),
            templates_dir: PathBuf::from("/tmp/templates"),
            default_template: Some("screenplay_us".to_string()),
            dictionaries_path: Some(PathBuf::from("/tmp/dictionaries.toml")),
            import: ImportDefaults {
                kind: "audioplay".to_string(),
            },
        };

        // When saved into a folder that does not exist yet and loaded again
        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        // Then nothing is lost
        assert_eq!(loaded_config, test_config);
    }

    #[test]
    fn test_list_templates() {
        // Given a templates directory with templates and other files
        let temp_dir = TempDir::new().unwrap();
        for name in ["stage.toml", "comic.toml", "notes.txt"] {
            std::fs::write(temp_dir.path().join(name), "").unwrap();
        }
        let config = Config {
            templates_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };

        // When listing templates
        let templates = config.list_templates().unwrap();

        // Then only TOML files are found, sorted
        assert_eq!(
            templates,
            vec![config.template_path("comic"), config.template_path("stage")]
        );
    }
}
