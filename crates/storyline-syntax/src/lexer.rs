//! # Lexer - Tokenizing RTF Source
//!
//! This module breaks an RTF byte stream (already widened to `char`s) into
//! tokens using the [Logos] lexer generator.
//!
//! [Logos]: https://docs.rs/logos
//!
//! ## The Lossless Guarantee
//!
//! Every character of the input appears in exactly one token. Nothing is
//! skipped, including the single space that terminates a control word:
//!
//! ```
//! use storyline_syntax::lexer::lex;
//!
//! let input = "{\\rtf1 Hello}";
//! let tokens = lex(input).unwrap();
//!
//! let reconstructed: String = tokens.iter().map(|t| t.text).collect();
//! assert_eq!(input, reconstructed);
//! ```
//!
//! ## Token Design
//!
//! Tokens are context-free. The lexer doesn't know whether `\b` toggles bold
//! or sits inside an ignored destination; the reader in the engine tracks
//! group state. Special sequences get their own kinds:
//! - `{` / `}` → [`TokenKind::GroupOpen`] / [`TokenKind::GroupClose`]
//! - `\word` or `\word-12` with optional delimiter space → [`TokenKind::ControlWord`]
//! - `\'hh` → [`TokenKind::HexEscape`]
//! - `\` + newline → [`TokenKind::ParBreak`] (equivalent to `\par`)
//! - `\~`, `\-`, `\*`, `\{` ... → [`TokenKind::ControlSymbol`]
//!
//! Everything else becomes `Text` runs or raw `Newline`s, which RTF ignores.
//!
//! ## Errors
//!
//! A backslash that cannot start any token (a dangling `\` at end of input,
//! or `\'` without two hex digits) is reported as a [`LexError`]. These only
//! happen in truncated streams.

use logos::Logos;
use thiserror::Error;

/// Token kinds produced by the Logos lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `{` opens a group
    #[token("{")]
    GroupOpen,

    /// `}` closes a group
    #[token("}")]
    GroupClose,

    /// `\name` with optional signed numeric parameter and delimiter space
    #[regex(r"\\[a-zA-Z]+(-?[0-9]+)? ?")]
    ControlWord,

    /// `\'hh` single byte in the document code page
    #[regex(r"\\'[0-9a-fA-F]{2}")]
    HexEscape,

    /// Backslash followed by a line ending
    #[regex(r"\\\r?\n")]
    ParBreak,

    /// Backslash followed by one non-letter
    #[regex(r"\\[^a-zA-Z'\r\n]")]
    ControlSymbol,

    /// Raw line ending, ignored by RTF readers
    #[regex(r"\r?\n")]
    Newline,

    /// Literal text run
    #[regex(r"[^\\{}\r\n]+")]
    Text,
}

/// A lexed token with its kind and text slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

impl<'a> Token<'a> {
    /// Split a control word into its name and numeric parameter.
    ///
    /// Returns `None` for any other token kind.
    pub fn control_word(&self) -> Option<(&'a str, Option<i32>)> {
        if self.kind != TokenKind::ControlWord {
            return None;
        }
        let body = self.text[1..].trim_end_matches(' ');
        let split = body
            .find(|c: char| c == '-' || c.is_ascii_digit())
            .unwrap_or(body.len());
        let (name, param) = body.split_at(split);
        Some((name, param.parse().ok()))
    }

    /// Decode a `\'hh` escape into its byte value.
    pub fn hex_byte(&self) -> Option<u8> {
        if self.kind != TokenKind::HexEscape {
            return None;
        }
        u8::from_str_radix(&self.text[2..4], 16).ok()
    }

    /// The character following the backslash of a control symbol.
    pub fn control_symbol(&self) -> Option<char> {
        if self.kind != TokenKind::ControlSymbol {
            return None;
        }
        self.text[1..].chars().next()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised RTF sequence {fragment:?} at offset {offset}")]
pub struct LexError {
    /// Byte offset of the offending sequence
    pub offset: usize,
    pub fragment: String,
}

impl LexError {
    /// True when the error sits at the very end of the input, the usual
    /// signature of a truncated file. The longest escape prefix that can be
    /// cut short is `\'h`.
    pub fn at_end_of(&self, input: &str) -> bool {
        input.len().saturating_sub(self.offset) <= 3
    }
}

/// Lex the input into a sequence of tokens.
///
/// Guarantees that all bytes from the input appear in the output tokens
/// when lexing succeeds.
pub fn lex(input: &str) -> Result<Vec<Token<'_>>, LexError> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(input);

    while let Some(result) = lexer.next() {
        let text = lexer.slice();
        match result {
            Ok(kind) => tokens.push(Token { kind, text }),
            Err(()) => {
                return Err(LexError {
                    offset: lexer.span().start,
                    fragment: text.to_string(),
                });
            }
        }
    }

    Ok(tokens)
}

/// Lex and return tokens along with their byte spans.
pub fn lex_with_spans(input: &str) -> Result<Vec<(Token<'_>, std::ops::Range<usize>)>, LexError> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(input);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let text = lexer.slice();
        match result {
            Ok(kind) => tokens.push((Token { kind, text }, span)),
            Err(()) => {
                return Err(LexError {
                    offset: span.start,
                    fragment: text.to_string(),
                });
            }
        }
    }

    Ok(tokens)
}
