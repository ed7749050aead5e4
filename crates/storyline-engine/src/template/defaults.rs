//! Built-in paragraph styles, used for any type a template leaves out.

use crate::models::{Alignment, BlockType, DocumentKind};
use crate::template::style::{Font, ParagraphStyle};

/// Industry layout for a Courier 12 screenplay on a 6" text area.
pub fn default_style(block_type: BlockType, kind: DocumentKind) -> ParagraphStyle {
    use BlockType::*;

    let font = match kind {
        DocumentKind::Text => Font {
            family: "Roboto".to_string(),
            size: 12.0,
        },
        _ => Font::default(),
    };
    let base = ParagraphStyle {
        block_type,
        font,
        lines_before: 1,
        ..ParagraphStyle::default()
    };

    match block_type {
        SceneHeading | SceneCharacters | Shot | SequenceFooter => ParagraphStyle {
            uppercase: true,
            lines_before: if block_type == SceneCharacters { 0 } else { 1 },
            ..base
        },
        Action | UnformattedText | Description | Text => base,
        Character | Cue => ParagraphStyle {
            uppercase: true,
            left_indent_mm: 55.9,
            left_indent_in_columns_mm: 20.0,
            ..base
        },
        Parenthetical => ParagraphStyle {
            lines_before: 0,
            left_indent_mm: 40.6,
            right_indent_mm: 61.0,
            left_indent_in_columns_mm: 10.0,
            right_indent_in_columns_mm: 10.0,
            ..base
        },
        Dialogue | Lyrics => ParagraphStyle {
            lines_before: 0,
            italic: block_type == Lyrics,
            left_indent_mm: 25.4,
            right_indent_mm: 38.1,
            left_indent_in_columns_mm: 5.0,
            right_indent_in_columns_mm: 5.0,
            ..base
        },
        Transition => ParagraphStyle {
            uppercase: true,
            alignment: Alignment::Right,
            ..base
        },
        InlineNote | Synopsis => ParagraphStyle {
            italic: true,
            ..base
        },
        SequenceHeading | BeatHeading => ParagraphStyle {
            bold: true,
            uppercase: block_type == SequenceHeading,
            ..base
        },
        ActHeading | Title => ParagraphStyle {
            bold: block_type == ActHeading,
            uppercase: true,
            alignment: Alignment::Center,
            ..base
        },
        Page => ParagraphStyle {
            bold: true,
            uppercase: true,
            lines_before: 2,
            ..base
        },
        Panel => ParagraphStyle {
            uppercase: true,
            ..base
        },
        Sound | Music => ParagraphStyle {
            uppercase: true,
            left_indent_mm: 25.4,
            ..base
        },
        Heading1 | Heading2 | Heading3 | Heading4 | Heading5 | Heading6 => {
            let size = match block_type {
                Heading1 => 20.0,
                Heading2 => 18.0,
                Heading3 => 16.0,
                Heading4 => 14.0,
                Heading5 => 13.0,
                _ => 12.0,
            };
            ParagraphStyle {
                bold: true,
                font: Font {
                    size,
                    ..base.font.clone()
                },
                ..base
            }
        }
        Undefined => default_style(Action, kind),
    }
}
