use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Title page fields. Keys not listed here are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TitlePage {
    pub title: Option<String>,
    pub credit: Option<String>,
    pub author: Option<String>,
    pub source: Option<String>,
    pub draft_date: Option<String>,
    pub contact: Option<String>,
    pub extra: BTreeMap<String, String>,
}

impl TitlePage {
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Set a field by its title page key, case-insensitively.
    pub fn set(&mut self, key: &str, value: String) {
        match key.trim().to_lowercase().as_str() {
            "title" => self.title = Some(value),
            "credit" => self.credit = Some(value),
            "author" | "authors" => self.author = Some(value),
            "source" => self.source = Some(value),
            "draft date" | "draft_date" => self.draft_date = Some(value),
            "contact" => self.contact = Some(value),
            other => {
                self.extra.insert(other.to_string(), value);
            }
        }
    }

    /// Populated fields in a stable order, keyed by their display name.
    pub fn entries(&self) -> Vec<(String, &str)> {
        let mut entries = Vec::new();
        let known = [
            ("Title", &self.title),
            ("Credit", &self.credit),
            ("Author", &self.author),
            ("Source", &self.source),
            ("Draft date", &self.draft_date),
            ("Contact", &self.contact),
        ];
        for (key, value) in known {
            if let Some(value) = value {
                entries.push((key.to_string(), value.as_str()));
            }
        }
        for (key, value) in &self.extra {
            entries.push((key.clone(), value.as_str()));
        }
        entries
    }
}

/// Marks a document as derived from a project in another application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftInfo {
    pub label: String,
    pub derived_from: Option<String>,
}

impl DraftInfo {
    pub const IMPORTED_LABEL: &'static str = "Imported draft";

    /// Draft taken over from a project of `application`.
    pub fn imported_from(application: &str) -> Self {
        Self {
            label: Self::IMPORTED_LABEL.to_string(),
            derived_from: Some(application.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectMetadata {
    pub name: Option<String>,
    pub title_page: TitlePage,
    pub draft: Option<DraftInfo>,
}
