//! # Text Corrector
//!
//! Block-type-aware text normalization. [`TextCorrector::correct`] is pure
//! and idempotent; [`correct_block`] turns its result into the smallest
//! `ReplaceText` command so anchors outside the changed span survive.
//!
//! The page-break half of correction, continuation markers, lives in
//! [`continuation`] and only ever touches the pagination stream.

pub mod continuation;

use log::debug;

use crate::editing::commands::replaced_text;
use crate::editing::{Cmd, Document, Patch, StructuralError};
use crate::models::{BlockId, BlockType, Dictionaries};

pub struct TextCorrector<'a> {
    dictionaries: &'a Dictionaries,
}

impl<'a> TextCorrector<'a> {
    pub fn new(dictionaries: &'a Dictionaries) -> Self {
        Self { dictionaries }
    }

    /// Corrected text for a block of `block_type`. Unformatted text and
    /// blocks whose type is not yet known come back unchanged.
    pub fn correct(&self, block_type: BlockType, text: &str) -> String {
        if matches!(block_type, BlockType::UnformattedText | BlockType::Undefined) {
            return text.to_string();
        }

        let mut text = collapse_spaces(&smart_quotes(&collapse_ellipsis(text)));

        if block_type == BlockType::SceneHeading {
            text = self.normalize_scene_intro(&text);
        }
        if forces_uppercase(block_type) {
            text = text.to_uppercase();
        }
        if block_type == BlockType::Parenthetical {
            text = wrap_parenthetical(&text);
        }
        text
    }

    fn normalize_scene_intro(&self, text: &str) -> String {
        match self.dictionaries.match_scene_intro(text) {
            Some((canonical, len)) => {
                let rest: String = text.chars().skip(len).collect();
                format!("{canonical}{rest}")
            }
            None => text.to_string(),
        }
    }
}

fn forces_uppercase(block_type: BlockType) -> bool {
    matches!(
        block_type,
        BlockType::SceneHeading
            | BlockType::Character
            | BlockType::Transition
            | BlockType::Shot
            | BlockType::SceneCharacters
    )
}

fn collapse_ellipsis(text: &str) -> String {
    text.replace(". . .", "…").replace("...", "…")
}

fn collapse_spaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_space = false;
    for c in text.chars() {
        if c == ' ' && previous_space {
            continue;
        }
        previous_space = c == ' ';
        out.push(c);
    }
    out
}

/// Replace straight quotes with typographic ones.
fn smart_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous: Option<char> = None;
    for c in text.chars() {
        let opening = previous.is_none_or(|p| p.is_whitespace() || "([{“‘—".contains(p));
        let replaced = match c {
            '"' if opening => '“',
            '"' => '”',
            '\'' if opening => '‘',
            '\'' => '’',
            other => other,
        };
        out.push(replaced);
        previous = Some(c);
    }
    out
}

fn wrap_parenthetical(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return text.to_string();
    }
    let open = if trimmed.starts_with('(') { "" } else { "(" };
    let close = if trimmed.ends_with(')') { "" } else { ")" };
    format!("{open}{trimmed}{close}")
}

/// The minimal `ReplaceText` that brings a block's text in line with the
/// corrector, or `None` when it is already correct.
pub fn correct_block(document: &Document, id: BlockId, corrector: &TextCorrector) -> Option<Cmd> {
    let block = document.block(id)?;
    let corrected = corrector.correct(block.block_type, &block.text);
    if corrected == block.text {
        return None;
    }

    let old: Vec<char> = block.text.chars().collect();
    let new: Vec<char> = corrected.chars().collect();
    let prefix = old.iter().zip(&new).take_while(|(a, b)| a == b).count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let range = prefix..old.len() - suffix;
    let text: String = new[prefix..new.len() - suffix].iter().collect();
    debug!(
        "Correcting {id}: {:?} -> {text:?}",
        replaced_text(document, id, range.clone()).unwrap_or_default()
    );
    Some(Cmd::ReplaceText { id, range, text })
}

impl Document {
    /// Run the corrector over one block.
    pub fn correct(
        &mut self,
        id: BlockId,
        corrector: &TextCorrector,
    ) -> Result<Option<Patch>, StructuralError> {
        if self.block(id).is_none() {
            return Err(StructuralError::UnknownBlock(id));
        }
        correct_block(self, id, corrector)
            .map(|cmd| self.apply(cmd))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bookmark, DocumentKind};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(BlockType::Action, "Wait...  what?", "Wait… what?")]
    #[case(BlockType::Action, "He said \"no\".", "He said “no”.")]
    #[case(BlockType::Action, "It's 'fine'", "It’s ‘fine’")]
    #[case(BlockType::Action, "So . . . yes", "So … yes")]
    #[case(BlockType::SceneHeading, "int. house - day", "INT. HOUSE - DAY")]
    #[case(BlockType::SceneHeading, "i/e car - night", "INT./EXT. CAR - NIGHT")]
    #[case(BlockType::Character, "john", "JOHN")]
    #[case(BlockType::Transition, "cut to:", "CUT TO:")]
    #[case(BlockType::Parenthetical, "beat", "(beat)")]
    #[case(BlockType::Parenthetical, "(beat)", "(beat)")]
    #[case(BlockType::Dialogue, "plain text", "plain text")]
    #[case(BlockType::UnformattedText, "keep  \"as is\"...", "keep  \"as is\"...")]
    #[case(BlockType::Undefined, "pasted  \"as is\"...", "pasted  \"as is\"...")]
    fn test_correct(#[case] block_type: BlockType, #[case] input: &str, #[case] expected: &str) {
        let dictionaries = Dictionaries::default();
        let corrector = TextCorrector::new(&dictionaries);
        assert_eq!(corrector.correct(block_type, input), expected);
    }

    #[rstest]
    #[case(BlockType::Action, "\"Wait...\"  she says. 'Now'")]
    #[case(BlockType::SceneHeading, "ext. street - night")]
    #[case(BlockType::Parenthetical, "  quietly ")]
    fn test_correct_is_idempotent(#[case] block_type: BlockType, #[case] input: &str) {
        let dictionaries = Dictionaries::default();
        let corrector = TextCorrector::new(&dictionaries);
        let once = corrector.correct(block_type, input);
        assert_eq!(corrector.correct(block_type, &once), once);
    }

    #[test]
    fn test_correct_block_is_minimal() {
        // Given dialogue with a doubled space in the middle
        let mut doc = Document::new(DocumentKind::Screenplay);
        let id = doc.push(BlockType::Dialogue, "Hello  there").id;
        doc.push(BlockType::Action, "Rain.");
        let dictionaries = Dictionaries::default();
        let corrector = TextCorrector::new(&dictionaries);

        // When corrected
        let cmd = correct_block(&doc, id, &corrector);

        // Then only the doubled space is replaced
        assert_eq!(
            cmd,
            Some(Cmd::ReplaceText {
                id,
                range: 6..7,
                text: String::new(),
            })
        );
    }

    #[test]
    fn test_document_correct_keeps_outside_anchors() {
        let mut doc = Document::new(DocumentKind::Screenplay);
        let block = doc.push(BlockType::Action, "Wait...  here");
        block.bookmarks.push(Bookmark {
            name: "end".to_string(),
            offset: 13,
        });
        let id = block.id;
        let dictionaries = Dictionaries::default();

        let patch = doc.correct(id, &TextCorrector::new(&dictionaries)).unwrap();

        assert!(patch.is_some());
        let block = doc.block(id).unwrap();
        assert_eq!(block.text, "Wait… here");
        assert_eq!(block.bookmarks[0].offset, 10);
    }

    #[test]
    fn test_already_correct_block_is_untouched() {
        let mut doc = Document::new(DocumentKind::Screenplay);
        let id = doc.push(BlockType::Character, "JOHN").id;
        let dictionaries = Dictionaries::default();

        let patch = doc.correct(id, &TextCorrector::new(&dictionaries)).unwrap();

        assert_eq!(patch, None);
        assert_eq!(doc.version(), 0);
    }
}
