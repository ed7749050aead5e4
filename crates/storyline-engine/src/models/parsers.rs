//! Field extraction from the text of structured block types.

/// Collapse runs of whitespace and trim.
pub fn simplified(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Speaker name of a Character block: everything before the first `(`.
pub fn character_name(text: &str) -> String {
    let name = text.split('(').next().unwrap_or_default();
    simplified(name).to_uppercase()
}

/// Extension of a Character block, such as `V.O.`, without parentheses.
pub fn character_extension(text: &str) -> Option<String> {
    let start = text.find('(')?;
    let inner: String = text[start..]
        .chars()
        .filter(|c| *c != '(' && *c != ')')
        .collect();
    let inner = simplified(&inner).to_uppercase();
    (!inner.is_empty()).then_some(inner)
}

/// Parts of a scene heading such as `INT. HOUSE - KITCHEN - DAY, DAY 2`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SceneHeadingParts {
    pub intro: String,
    pub location: String,
    pub time: String,
    pub story_day: String,
}

impl SceneHeadingParts {
    pub fn parse(text: &str) -> Self {
        let (intro, rest) = match text.split_once(". ") {
            Some((intro, rest)) => (intro, Some(rest)),
            None => (text, None),
        };

        let (location, time) = match rest {
            Some(rest) => match rest.rsplit_once(" - ") {
                Some((location, suffix)) => (location, suffix.split(',').next().unwrap_or("")),
                None => (rest.split(", ").next().unwrap_or(rest), ""),
            },
            None => ("", ""),
        };

        let story_day = match text.split(", ").collect::<Vec<_>>().as_slice() {
            [_, day] => *day,
            _ => "",
        };

        Self {
            intro: simplified(intro).to_uppercase(),
            location: simplified(location).to_uppercase(),
            time: simplified(time).to_uppercase(),
            story_day: simplified(story_day).to_uppercase(),
        }
    }
}

/// Names listed in a SceneCharacters block.
pub fn scene_characters(text: &str) -> Vec<String> {
    text.split(',')
        .map(|name| simplified(name).to_uppercase())
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("JOHN", "JOHN", None)]
    #[case("john (v.o.)", "JOHN", Some("V.O."))]
    #[case("  MARY   ANN (CONT'D)", "MARY ANN", Some("CONT'D"))]
    #[case("BOB ()", "BOB", None)]
    fn test_character_parts(
        #[case] text: &str,
        #[case] name: &str,
        #[case] extension: Option<&str>,
    ) {
        assert_eq!(character_name(text), name);
        assert_eq!(character_extension(text).as_deref(), extension);
    }

    #[test]
    fn test_scene_heading_parts() {
        let parts = SceneHeadingParts::parse("INT. HOUSE - KITCHEN - DAY, DAY 2");
        assert_eq!(
            parts,
            SceneHeadingParts {
                intro: "INT".to_string(),
                location: "HOUSE - KITCHEN".to_string(),
                time: "DAY".to_string(),
                story_day: "DAY 2".to_string(),
            }
        );
    }

    #[test]
    fn test_scene_heading_without_time() {
        let parts = SceneHeadingParts::parse("EXT. FIELD");
        assert_eq!(parts.location, "FIELD");
        assert_eq!(parts.time, "");
    }

    #[test]
    fn test_scene_characters() {
        assert_eq!(
            scene_characters("john, Mary ,, bob"),
            vec!["JOHN".to_string(), "MARY".to_string(), "BOB".to_string()]
        );
    }
}
