//! Encoding text runs for RTF output.
//!
//! The writer side of the lexer: anything [`escape_text`] produces lexes back
//! into `Text`, `ControlSymbol` and `\u` control words only.

/// Escape a text run so it can be embedded in an RTF body.
///
/// Non-ASCII characters are written as `\uN?` with a `?` fallback, which
/// requires `\uc1` in the document preamble. Characters outside the Basic
/// Multilingual Plane are split into a UTF-16 surrogate pair.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '\t' => out.push_str("\\tab "),
            '\n' => out.push_str("\\line "),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    // RTF parameters are signed 16-bit
                    out.push_str(&format!("\\u{}?", *unit as i16));
                }
            }
        }
    }
    out
}

/// True when `name` can be written inside a `\fonttbl` entry unescaped.
pub fn is_valid_font_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii() && !c.is_ascii_control() && !matches!(c, ';' | '{' | '}' | '\\'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{TokenKind, lex};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("plain", "plain")]
    #[case("a{b}c\\", "a\\{b\\}c\\\\")]
    #[case("café", "caf\\u233?")]
    #[case("Привет", "\\u1055?\\u1088?\\u1080?\\u1074?\\u1077?\\u1090?")]
    fn escapes_text(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape_text(input), expected);
    }

    #[test]
    fn escaped_text_lexes_without_groups() {
        let escaped = escape_text("{weird} \\ text\twith tab");
        let tokens = lex(&escaped).unwrap();
        assert!(
            tokens
                .iter()
                .all(|t| t.kind != TokenKind::GroupOpen && t.kind != TokenKind::GroupClose)
        );
    }

    #[test]
    fn astral_characters_use_surrogates() {
        let escaped = escape_text("🎬");
        assert_eq!(escaped, "\\u-10180?\\u-8276?");
    }

    #[rstest]
    #[case("Courier Prime", true)]
    #[case("Bad;Font", false)]
    #[case("", false)]
    #[case("Шрифт", false)]
    fn validates_font_names(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(is_valid_font_name(name), valid);
    }
}
