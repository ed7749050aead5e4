use std::ops::Range;
use std::sync::Arc;

use uuid::Uuid;

use crate::editing::commands::{self, Cmd};
use crate::editing::{Patch, Snapshot};
use crate::models::{Block, BlockId, BlockType, DocumentKind, ProjectMetadata};

/// Errors from the block model contract.
///
/// These indicate a caller bug: the ids or offsets given do not describe the
/// document as it currently is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    #[error("position {position} is past the end of the document ({len} blocks)")]
    InvalidPosition { position: usize, len: usize },
    #[error("offset {offset} is outside block {id} of length {len}")]
    OffsetOutOfRange {
        id: BlockId,
        offset: usize,
        len: usize,
    },
    #[error("blocks {first} and {second} are not adjacent")]
    NotAdjacent { first: BlockId, second: BlockId },
    #[error("no block with id {0}")]
    UnknownBlock(BlockId),
    #[error("{block_type} is not valid in a {kind:?} document")]
    IncompatibleType {
        block_type: BlockType,
        kind: DocumentKind,
    },
    #[error("block id {0} is already in use")]
    DuplicateId(BlockId),
}

/// An ordered sequence of typed blocks: one script.
///
/// Blocks are stored behind `Arc` so cloning a document (and taking a
/// [`Snapshot`]) only copies pointers. Mutation goes through [`Document::apply`]
/// and copies a block on write.
///
/// ```rust
/// # use storyline_engine::editing::{Document, Cmd};
/// # use storyline_engine::models::{BlockType, DocumentKind};
/// let mut doc = Document::new(DocumentKind::Screenplay);
/// let id = doc.insert(0, BlockType::Dialogue, "Hello there, friend.").unwrap();
///
/// let (left, right) = doc.split(id, 11).unwrap();
/// assert_eq!(doc.block(left).unwrap().text, "Hello there");
/// assert_eq!(doc.block(right).unwrap().text, ", friend.");
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) id: Uuid,
    pub(crate) kind: DocumentKind,
    pub(crate) blocks: Vec<Arc<Block>>,
    /// Next block id to hand out; only ever grows
    pub(crate) next_id: u64,
    /// Incremented on each applied command
    pub(crate) version: u64,
    pub metadata: ProjectMetadata,
}

impl Document {
    pub fn new(kind: DocumentKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            blocks: Vec::new(),
            next_id: 1,
            version: 0,
            metadata: ProjectMetadata::default(),
        }
    }

    /// Build a document from `(type, text)` pairs.
    pub fn from_blocks<S: Into<String>>(
        kind: DocumentKind,
        blocks: impl IntoIterator<Item = (BlockType, S)>,
    ) -> Self {
        let mut doc = Self::new(kind);
        for (block_type, text) in blocks {
            doc.push(block_type, text);
        }
        doc
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> impl DoubleEndedIterator<Item = &Block> + ExactSizeIterator {
        self.blocks.iter().map(|b| b.as_ref())
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index).map(|b| b.as_ref())
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id).map(|b| b.as_ref())
    }

    pub fn position(&self, id: BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| b.id == id)
    }

    /// Append a block without going through the command path.
    ///
    /// Used while constructing a document, e.g. by importers. The type is not
    /// checked against the document kind; see [`Document::bind_kind`].
    pub fn push(&mut self, block_type: BlockType, text: impl Into<String>) -> &mut Block {
        let id = self.fresh_id();
        self.blocks.push(Arc::new(Block::new(id, block_type, text)));
        let last = self.blocks.len() - 1;
        Arc::make_mut(&mut self.blocks[last])
    }

    /// Resolve `Undefined` and kind-incompatible types against the document
    /// kind. Importers call this once, after the last block is pushed.
    pub fn bind_kind(&mut self) {
        let kind = self.kind;
        for block in &mut self.blocks {
            let coerced = block.block_type.coerce_for(kind);
            if coerced != block.block_type {
                log::debug!(
                    "coercing block {} from {} to {} for {:?}",
                    block.id,
                    block.block_type,
                    coerced,
                    kind
                );
                Arc::make_mut(block).block_type = coerced;
            }
        }
    }

    /// First block whose type is not valid for the document kind.
    pub fn first_unresolved(&self) -> Option<&Block> {
        self.blocks()
            .find(|b| !b.block_type.is_valid_for(self.kind))
    }

    /// Plain text of the whole document, one block per line.
    pub fn text(&self) -> String {
        self.blocks()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Cheap immutable view for background work.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.clone())
    }

    /// Apply a command, returning what changed.
    pub fn apply(&mut self, cmd: Cmd) -> Result<Patch, StructuralError> {
        commands::execute(self, &cmd).map(|(patch, _inverse)| patch)
    }

    pub fn insert(
        &mut self,
        position: usize,
        block_type: BlockType,
        text: impl Into<String>,
    ) -> Result<BlockId, StructuralError> {
        let patch = self.apply(Cmd::InsertBlock {
            position,
            block_type,
            text: text.into(),
        })?;
        Ok(patch.inserted[0])
    }

    pub fn split(
        &mut self,
        id: BlockId,
        offset: usize,
    ) -> Result<(BlockId, BlockId), StructuralError> {
        let patch = self.apply(Cmd::SplitBlock { id, offset })?;
        Ok((id, patch.inserted[0]))
    }

    pub fn merge(&mut self, first: BlockId, second: BlockId) -> Result<BlockId, StructuralError> {
        self.apply(Cmd::MergeBlocks { first, second })?;
        Ok(first)
    }

    pub fn retype(&mut self, id: BlockId, to: BlockType) -> Result<(), StructuralError> {
        self.apply(Cmd::Retype { id, to }).map(|_| ())
    }

    pub fn remove(&mut self, id: BlockId) -> Result<(), StructuralError> {
        self.apply(Cmd::RemoveBlock { id }).map(|_| ())
    }

    pub fn replace_text(
        &mut self,
        id: BlockId,
        range: Range<usize>,
        text: impl Into<String>,
    ) -> Result<(), StructuralError> {
        self.apply(Cmd::ReplaceText {
            id,
            range,
            text: text.into(),
        })
        .map(|_| ())
    }

    pub(crate) fn fresh_id(&mut self) -> BlockId {
        let id = BlockId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn index_of(&self, id: BlockId) -> Result<usize, StructuralError> {
        self.position(id).ok_or(StructuralError::UnknownBlock(id))
    }

    pub(crate) fn block_mut(&mut self, index: usize) -> &mut Block {
        Arc::make_mut(&mut self.blocks[index])
    }
}
