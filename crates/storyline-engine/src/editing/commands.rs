use std::ops::Range;
use std::sync::Arc;

use crate::editing::anchors::{append_anchors, shift_for_edit, split_anchors};
use crate::editing::{Document, Patch, StructuralError};
use crate::models::block::{byte_offset, char_slice};
use crate::models::{Block, BlockId, BlockType, Bookmark, FormattingOverride, ReviewMark};

/// Commands that can be applied to the document
///
/// Every command carries the ids and offsets it needs, so a log of commands
/// replays to the same document from the same starting point.
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    InsertBlock {
        position: usize,
        block_type: BlockType,
        text: String,
    },
    SplitBlock {
        id: BlockId,
        offset: usize,
    },
    MergeBlocks {
        first: BlockId,
        second: BlockId,
    },
    Retype {
        id: BlockId,
        to: BlockType,
    },
    RemoveBlock {
        id: BlockId,
    },
    ReplaceText {
        id: BlockId,
        range: Range<usize>,
        text: String,
    },
    SetFormatting {
        id: BlockId,
        formatting: Option<FormattingOverride>,
    },
    AddReviewMark {
        id: BlockId,
        mark: ReviewMark,
    },
    AddBookmark {
        id: BlockId,
        bookmark: Bookmark,
    },
    /// Replace `remove` blocks at `position` with `blocks`, ids included.
    /// Produced as the inverse of structural commands.
    RestoreBlocks {
        position: usize,
        remove: usize,
        blocks: Vec<Block>,
    },
}

fn check_offset(block: &Block, offset: usize) -> Result<(), StructuralError> {
    let len = block.char_len();
    if offset > len {
        return Err(StructuralError::OffsetOutOfRange {
            id: block.id,
            offset,
            len,
        });
    }
    Ok(())
}

fn check_type(doc: &Document, block_type: BlockType) -> Result<(), StructuralError> {
    if !block_type.is_valid_for(doc.kind) {
        return Err(StructuralError::IncompatibleType {
            block_type,
            kind: doc.kind,
        });
    }
    Ok(())
}

/// Inverse that puts one block back exactly as it was.
fn restore_one(position: usize, block: &Block) -> Cmd {
    Cmd::RestoreBlocks {
        position,
        remove: 1,
        blocks: vec![block.clone()],
    }
}

/// Apply `cmd` to `doc`, returning the patch and the command that undoes it.
///
/// On error the document is left untouched.
pub(crate) fn execute(doc: &mut Document, cmd: &Cmd) -> Result<(Patch, Cmd), StructuralError> {
    let mut patch = Patch::default();

    let inverse = match cmd {
        Cmd::InsertBlock {
            position,
            block_type,
            text,
        } => {
            if *position > doc.len() {
                return Err(StructuralError::InvalidPosition {
                    position: *position,
                    len: doc.len(),
                });
            }
            check_type(doc, *block_type)?;
            let id = doc.fresh_id();
            doc.blocks
                .insert(*position, Arc::new(Block::new(id, *block_type, text.clone())));
            patch.inserted.push(id);
            patch.focus = Some((id, text.chars().count()));
            Cmd::RemoveBlock { id }
        }
        Cmd::SplitBlock { id, offset } => {
            let index = doc.index_of(*id)?;
            let source = doc.blocks[index].clone();
            check_offset(&source, *offset)?;

            let at = byte_offset(&source.text, *offset);
            let new_id = doc.fresh_id();
            let mut left = Block {
                text: source.text[..at].to_string(),
                ..(*source).clone()
            };
            let mut right = Block {
                id: new_id,
                text: source.text[at..].to_string(),
                ..(*source).clone()
            };
            split_anchors(&source, *offset, &mut left, &mut right);

            doc.blocks[index] = Arc::new(left);
            doc.blocks.insert(index + 1, Arc::new(right));
            patch.changed.push(*id);
            patch.inserted.push(new_id);
            patch.focus = Some((new_id, 0));
            Cmd::RestoreBlocks {
                position: index,
                remove: 2,
                blocks: vec![(*source).clone()],
            }
        }
        Cmd::MergeBlocks { first, second } => {
            let index = doc.index_of(*first)?;
            let second_index = doc.index_of(*second)?;
            if second_index != index + 1 {
                return Err(StructuralError::NotAdjacent {
                    first: *first,
                    second: *second,
                });
            }
            let original_first = doc.blocks[index].clone();
            let original_second = doc.blocks.remove(second_index);

            let first_len = original_first.char_len();
            let merged = doc.block_mut(index);
            merged.text.push_str(&original_second.text);
            append_anchors(merged, &original_second, first_len);

            patch.changed.push(*first);
            patch.removed.push(*second);
            patch.focus = Some((*first, first_len));
            Cmd::RestoreBlocks {
                position: index,
                remove: 1,
                blocks: vec![(*original_first).clone(), (*original_second).clone()],
            }
        }
        Cmd::Retype { id, to } => {
            let index = doc.index_of(*id)?;
            check_type(doc, *to)?;
            let from = doc.blocks[index].block_type;
            doc.block_mut(index).block_type = *to;
            patch.changed.push(*id);
            Cmd::Retype { id: *id, to: from }
        }
        Cmd::RemoveBlock { id } => {
            let index = doc.index_of(*id)?;
            let removed = doc.blocks.remove(index);
            patch.removed.push(*id);
            // Anchors inside the block go with it
            Cmd::RestoreBlocks {
                position: index,
                remove: 0,
                blocks: vec![(*removed).clone()],
            }
        }
        Cmd::ReplaceText { id, range, text } => {
            let index = doc.index_of(*id)?;
            let original = doc.blocks[index].clone();
            if range.start > range.end {
                return Err(StructuralError::OffsetOutOfRange {
                    id: *id,
                    offset: range.start,
                    len: original.char_len(),
                });
            }
            check_offset(&original, range.end)?;

            let start = byte_offset(&original.text, range.start);
            let end = byte_offset(&original.text, range.end);
            let inserted = text.chars().count();
            let block = doc.block_mut(index);
            block.text.replace_range(start..end, text);
            shift_for_edit(block, range.clone(), inserted);

            patch.changed.push(*id);
            patch.focus = Some((*id, range.start + inserted));
            restore_one(index, &original)
        }
        Cmd::SetFormatting { id, formatting } => {
            let index = doc.index_of(*id)?;
            let original = doc.blocks[index].clone();
            doc.block_mut(index).formatting = formatting.clone();
            patch.changed.push(*id);
            restore_one(index, &original)
        }
        Cmd::AddReviewMark { id, mark } => {
            let index = doc.index_of(*id)?;
            let original = doc.blocks[index].clone();
            check_offset(&original, mark.range.end)?;
            let block = doc.block_mut(index);
            let at = block
                .review_marks
                .partition_point(|m| m.range.start <= mark.range.start);
            block.review_marks.insert(at, mark.clone());
            patch.changed.push(*id);
            restore_one(index, &original)
        }
        Cmd::AddBookmark { id, bookmark } => {
            let index = doc.index_of(*id)?;
            let original = doc.blocks[index].clone();
            check_offset(&original, bookmark.offset)?;
            doc.block_mut(index).bookmarks.push(bookmark.clone());
            patch.changed.push(*id);
            restore_one(index, &original)
        }
        Cmd::RestoreBlocks {
            position,
            remove,
            blocks,
        } => {
            if position + remove > doc.len() {
                return Err(StructuralError::InvalidPosition {
                    position: position + remove,
                    len: doc.len(),
                });
            }
            let outgoing: Vec<Arc<Block>> = doc.blocks[*position..position + remove].to_vec();
            for block in blocks {
                let clashes = doc.blocks.iter().enumerate().any(|(i, b)| {
                    b.id == block.id && !(*position..position + remove).contains(&i)
                });
                if clashes {
                    return Err(StructuralError::DuplicateId(block.id));
                }
            }

            doc.blocks.splice(
                *position..position + remove,
                blocks.iter().cloned().map(Arc::new),
            );
            if let Some(max) = blocks.iter().map(|b| b.id.0).max() {
                doc.next_id = doc.next_id.max(max + 1);
            }

            let incoming: Vec<BlockId> = blocks.iter().map(|b| b.id).collect();
            for block in &outgoing {
                if incoming.contains(&block.id) {
                    patch.changed.push(block.id);
                } else {
                    patch.removed.push(block.id);
                }
            }
            for id in incoming {
                if !patch.changed.contains(&id) {
                    patch.inserted.push(id);
                }
            }
            patch.focus = blocks.last().map(|b| (b.id, b.char_len()));
            Cmd::RestoreBlocks {
                position: *position,
                remove: blocks.len(),
                blocks: outgoing.iter().map(|b| (**b).clone()).collect(),
            }
        }
    };

    doc.version += 1;
    patch.version = doc.version;
    Ok((patch, inverse))
}

/// The text a `ReplaceText` would remove, for logging and tests.
pub fn replaced_text<'a>(doc: &'a Document, id: BlockId, range: Range<usize>) -> Option<&'a str> {
    doc.block(id).map(|b| char_slice(&b.text, range))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentKind;
    use pretty_assertions::assert_eq;

    fn doc() -> Document {
        Document::from_blocks(
            DocumentKind::Screenplay,
            [
                (BlockType::SceneHeading, "INT. HOUSE - DAY"),
                (BlockType::Character, "JOHN"),
                (BlockType::Dialogue, "Hello there, friend."),
            ],
        )
    }

    fn assert_inverse_restores(cmd: Cmd) {
        // Given a document and a command
        let mut doc = doc();
        let before: Vec<Block> = doc.blocks().cloned().collect();

        // When applying the command and then its inverse
        let (_, inverse) = execute(&mut doc, &cmd).unwrap();
        execute(&mut doc, &inverse).unwrap();

        // Then the blocks are back exactly, ids and anchors included
        let after: Vec<Block> = doc.blocks().cloned().collect();
        assert_eq!(after, before);
    }

    #[test]
    fn test_inverse_of_insert() {
        assert_inverse_restores(Cmd::InsertBlock {
            position: 1,
            block_type: BlockType::Action,
            text: "He waves.".to_string(),
        });
    }

    #[test]
    fn test_inverse_of_split() {
        assert_inverse_restores(Cmd::SplitBlock {
            id: BlockId(3),
            offset: 11,
        });
    }

    #[test]
    fn test_inverse_of_merge() {
        assert_inverse_restores(Cmd::MergeBlocks {
            first: BlockId(2),
            second: BlockId(3),
        });
    }

    #[test]
    fn test_inverse_of_remove() {
        assert_inverse_restores(Cmd::RemoveBlock { id: BlockId(1) });
    }

    #[test]
    fn test_inverse_of_replace_text() {
        assert_inverse_restores(Cmd::ReplaceText {
            id: BlockId(3),
            range: 0..5,
            text: "Goodbye".to_string(),
        });
    }

    #[test]
    fn test_inverse_of_retype() {
        assert_inverse_restores(Cmd::Retype {
            id: BlockId(3),
            to: BlockType::Parenthetical,
        });
    }

    #[test]
    fn test_failed_command_leaves_document_untouched() {
        let mut doc = doc();
        let version = doc.version();
        let result = execute(
            &mut doc,
            &Cmd::ReplaceText {
                id: BlockId(2),
                range: 2..9,
                text: String::new(),
            },
        );
        assert!(result.is_err());
        assert_eq!(doc.version(), version);
        assert_eq!(doc.get(1).unwrap().text, "JOHN");
    }

    #[test]
    fn test_restore_rejects_duplicate_ids() {
        let mut doc = doc();
        let copy = doc.get(0).unwrap().clone();
        let err = execute(
            &mut doc,
            &Cmd::RestoreBlocks {
                position: 3,
                remove: 0,
                blocks: vec![copy],
            },
        )
        .unwrap_err();
        assert_eq!(err, StructuralError::DuplicateId(BlockId(1)));
    }

    #[test]
    fn test_review_marks_kept_sorted() {
        let mut doc = doc();
        doc.apply(Cmd::AddReviewMark {
            id: BlockId(3),
            mark: ReviewMark::new(6..11, "#ff0000", "ann"),
        })
        .unwrap();
        doc.apply(Cmd::AddReviewMark {
            id: BlockId(3),
            mark: ReviewMark::new(0..5, "#00ff00", "bob"),
        })
        .unwrap();
        let starts: Vec<_> = doc
            .block(BlockId(3))
            .unwrap()
            .review_marks
            .iter()
            .map(|m| m.range.start)
            .collect();
        assert_eq!(starts, vec![0, 6]);
    }

    #[test]
    fn test_replaced_text() {
        let doc = doc();
        assert_eq!(replaced_text(&doc, BlockId(3), 0..5), Some("Hello"));
    }
}
