use crate::editing::commands::{self, Cmd};
use crate::editing::{Document, Patch, StructuralError};

/// Append-only command log with undo and redo.
///
/// Every command that touches the document is appended to the log, including
/// the inverses applied by `undo` and `redo`, so [`replay`] over the log
/// reproduces the current state from the starting document.
#[derive(Debug, Clone, Default)]
pub struct History {
    log: Vec<Cmd>,
    undo_stack: Vec<Cmd>,
    redo_stack: Vec<Cmd>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a user command, discarding any redo state.
    pub fn apply(&mut self, doc: &mut Document, cmd: Cmd) -> Result<Patch, StructuralError> {
        let (patch, inverse) = commands::execute(doc, &cmd)?;
        self.log.push(cmd);
        self.undo_stack.push(inverse);
        self.redo_stack.clear();
        Ok(patch)
    }

    /// Revert the most recent command. `Ok(None)` when there is nothing to undo.
    pub fn undo(&mut self, doc: &mut Document) -> Result<Option<Patch>, StructuralError> {
        let Some(inverse) = self.undo_stack.pop() else {
            return Ok(None);
        };
        match commands::execute(doc, &inverse) {
            Ok((patch, redo)) => {
                self.log.push(inverse);
                self.redo_stack.push(redo);
                Ok(Some(patch))
            }
            Err(err) => {
                self.undo_stack.push(inverse);
                Err(err)
            }
        }
    }

    /// Re-apply the most recently undone command.
    pub fn redo(&mut self, doc: &mut Document) -> Result<Option<Patch>, StructuralError> {
        let Some(cmd) = self.redo_stack.pop() else {
            return Ok(None);
        };
        match commands::execute(doc, &cmd) {
            Ok((patch, inverse)) => {
                self.log.push(cmd);
                self.undo_stack.push(inverse);
                Ok(Some(patch))
            }
            Err(err) => {
                self.redo_stack.push(cmd);
                Err(err)
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Every command applied so far, in order.
    pub fn log(&self) -> &[Cmd] {
        &self.log
    }
}

/// Re-derive a document state by folding `log` over `base`.
///
/// Pure: `base` is not modified and the same inputs always give the same
/// blocks and ids.
pub fn replay(base: &Document, log: &[Cmd]) -> Result<Document, StructuralError> {
    log.iter().try_fold(base.clone(), |mut doc, cmd| {
        commands::execute(&mut doc, cmd)?;
        Ok(doc)
    })
}
