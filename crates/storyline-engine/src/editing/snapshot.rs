use std::ops::Deref;
use std::sync::Arc;

use crate::editing::Document;

/// Immutable, shareable view of a document at one version.
///
/// Cloning is a reference count bump. Long-running work (export, pagination)
/// runs against a snapshot while the editing session keeps mutating the
/// live document.
#[derive(Debug, Clone)]
pub struct Snapshot {
    document: Arc<Document>,
}

impl Snapshot {
    pub(crate) fn new(document: Document) -> Self {
        Self {
            document: Arc::new(document),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }
}

impl Deref for Snapshot {
    type Target = Document;

    fn deref(&self) -> &Document {
        &self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BlockType, DocumentKind};

    #[test]
    fn test_snapshot_shares_blocks() {
        let doc = Document::from_blocks(DocumentKind::Screenplay, [(BlockType::Action, "a")]);
        let snapshot = doc.snapshot();
        assert!(Arc::ptr_eq(&doc.blocks[0], &snapshot.blocks[0]));
        assert_eq!(snapshot.version(), doc.version());
    }

    #[test]
    fn test_snapshot_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Snapshot>();
    }
}
