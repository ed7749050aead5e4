use crate::models::BlockId;

/// Result of applying a command
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Patch {
    /// Blocks whose text, type or anchors changed
    pub changed: Vec<BlockId>,
    pub inserted: Vec<BlockId>,
    pub removed: Vec<BlockId>,
    /// Suggested caret position after the edit: block and character offset
    pub focus: Option<(BlockId, usize)>,
    pub version: u64,
}
