use serde::{Deserialize, Serialize};

/// Authoring dictionaries, grouped by category.
///
/// Passed by value into the corrector and importers; nothing reads them from
/// global state. The first entry of each scene intro group is its canonical
/// spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dictionaries {
    /// Groups of equivalent scene intro prefixes, canonical form first
    pub scene_intros: Vec<Vec<String>>,
    pub scene_times: Vec<String>,
    pub transitions: Vec<String>,
    pub character_extensions: Vec<String>,
    pub locations: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Dictionaries {
    fn default() -> Self {
        Self {
            scene_intros: vec![
                strings(&["INT.", "INT", "I.", "ИНТ.", "ИНТ"]),
                strings(&["EXT.", "EXT", "E.", "НАТ.", "НАТ", "ЭКСТ.", "ЭКСТ"]),
                strings(&["INT./EXT.", "INT/EXT", "INT./EXT", "I/E", "I./E.", "ИНТ./НАТ."]),
                strings(&["EXT./INT.", "EXT/INT", "E/I"]),
                strings(&["EST.", "EST"]),
                strings(&["ПАВ.", "ПАВ"]),
            ],
            scene_times: strings(&[
                "DAY",
                "NIGHT",
                "MORNING",
                "EVENING",
                "AFTERNOON",
                "DAWN",
                "DUSK",
                "CONTINUOUS",
                "LATER",
                "MOMENTS LATER",
            ]),
            transitions: strings(&[
                "CUT TO:",
                "FADE IN:",
                "FADE OUT.",
                "FADE TO:",
                "DISSOLVE TO:",
                "BACK TO:",
                "MATCH CUT TO:",
                "JUMP CUT TO:",
                "FADE TO BLACK.",
            ]),
            character_extensions: strings(&["V.O.", "O.S.", "O.C.", "CONT'D", "SUBTITLE"]),
            locations: Vec::new(),
        }
    }
}

impl Dictionaries {
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Canonical spelling of the scene intro `text` starts with, and the
    /// character length of the matched prefix.
    ///
    /// Matching is case-insensitive and the prefix must be followed by a
    /// space or the end of the text. The longest matching variant wins.
    pub fn match_scene_intro(&self, text: &str) -> Option<(&str, usize)> {
        let upper = text.to_uppercase();
        let mut best: Option<(&str, usize)> = None;
        for group in &self.scene_intros {
            let Some(canonical) = group.first() else {
                continue;
            };
            for variant in group {
                let variant_upper = variant.to_uppercase();
                if !upper.starts_with(&variant_upper) {
                    continue;
                }
                let rest = &upper[variant_upper.len()..];
                if !(rest.is_empty() || rest.starts_with(' ')) {
                    continue;
                }
                let len = variant.chars().count();
                if best.is_none_or(|(_, best_len)| len > best_len) {
                    best = Some((canonical.as_str(), len));
                }
            }
        }
        best
    }

    /// True when `text` is one of the known transitions.
    pub fn is_transition(&self, text: &str) -> bool {
        let upper = text.trim().to_uppercase();
        self.transitions.iter().any(|t| t.to_uppercase() == upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("INT. HOUSE - DAY", Some(("INT.", 4)))]
    #[case("int house - day", Some(("INT.", 3)))]
    #[case("I/E CAR - NIGHT", Some(("INT./EXT.", 3)))]
    #[case("INT./EXT. CAR - NIGHT", Some(("INT./EXT.", 9)))]
    #[case("EXT", Some(("EXT.", 3)))]
    #[case("ИНТ. КВАРТИРА - ДЕНЬ", Some(("INT.", 4)))]
    #[case("INTERIOR", None)]
    #[case("JOHN", None)]
    fn test_match_scene_intro(#[case] text: &str, #[case] expected: Option<(&str, usize)>) {
        let dictionaries = Dictionaries::default();
        assert_eq!(dictionaries.match_scene_intro(text), expected);
    }

    #[test]
    fn test_is_transition_ignores_case() {
        let dictionaries = Dictionaries::default();
        assert!(dictionaries.is_transition("cut to:"));
        assert!(!dictionaries.is_transition("CUT"));
    }

    #[test]
    fn test_toml_roundtrip_with_partial_file() {
        // Given a dictionary file that only overrides transitions
        let content = r#"transitions = ["SMASH CUT TO:"]"#;

        // When loading it
        let dictionaries = Dictionaries::from_toml_str(content).unwrap();

        // Then the other categories keep their defaults
        assert_eq!(dictionaries.transitions, vec!["SMASH CUT TO:".to_string()]);
        assert_eq!(
            dictionaries.scene_intros,
            Dictionaries::default().scene_intros
        );
        let saved = dictionaries.to_toml_string().unwrap();
        assert_eq!(Dictionaries::from_toml_str(&saved).unwrap(), dictionaries);
    }
}
