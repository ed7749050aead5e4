//! # storyline-syntax
//!
//! A lossless tokenizer for the RTF rich-text format using [Logos].
//!
//! [Logos]: https://docs.rs/logos
//!
//! RTF is a self-delimited stream of groups (`{ ... }`), control words
//! (`\b`, `\li720`), escapes and text runs. This crate only splits the stream
//! into tokens; interpreting group state (fonts, stylesheets, paragraph
//! properties) is left to the RTF codec in `storyline-engine`.
//!
//! ```text
//! "{\b Hi}" → [GroupOpen, ControlWord("\b "), Text("Hi"), GroupClose]
//! ```
//!
//! ## Module Structure
//!
//! ```text
//! storyline-syntax/
//! ├── lib.rs      # This file - public API
//! ├── lexer.rs    # Logos-based tokenizer
//! └── escape.rs   # Text escaping for the RTF writer
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use storyline_syntax::{TokenKind, lex};
//!
//! let tokens = lex("{\\rtf1 Hello}").unwrap();
//! assert_eq!(tokens[0].kind, TokenKind::GroupOpen);
//! assert_eq!(tokens[1].control_word(), Some(("rtf", Some(1))));
//! ```

pub mod escape;
pub mod lexer;

pub use escape::{escape_text, is_valid_font_name};
pub use lexer::{LexError, Token, TokenKind, lex, lex_with_spans};

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    fn format_tokens(input: &str) -> String {
        lex(input)
            .unwrap()
            .iter()
            .map(|t| format!("{:?} {:?}\n", t.kind, t.text))
            .collect()
    }

    #[test]
    fn snapshot_minimal_document() {
        let input = "{\\rtf1\\ansi\\deff0{\\fonttbl{\\f0 Courier;}}\n\\pard\\qc JOHN\\par\n}";
        assert_snapshot!(format_tokens(input), @r#"
        GroupOpen "{"
        ControlWord "\\rtf1"
        ControlWord "\\ansi"
        ControlWord "\\deff0"
        GroupOpen "{"
        ControlWord "\\fonttbl"
        GroupOpen "{"
        ControlWord "\\f0 "
        Text "Courier;"
        GroupClose "}"
        GroupClose "}"
        Newline "\n"
        ControlWord "\\pard"
        ControlWord "\\qc "
        Text "JOHN"
        ControlWord "\\par"
        Newline "\n"
        GroupClose "}"
        "#);
    }

    #[test]
    fn escaped_text_roundtrips_through_lexer() {
        let escaped = escape_text("INT. {HOUSE} - DAY");
        let tokens = lex(&escaped).unwrap();
        let decoded: String = tokens
            .iter()
            .map(|t| match t.control_symbol() {
                Some(c) => c.to_string(),
                None => t.text.to_string(),
            })
            .collect();
        assert_eq!(decoded, "INT. {HOUSE} - DAY");
    }
}
