//! # Editing Core
//!
//! A script is a [`Document`]: an ordered list of typed [`Block`]s. Edits are
//! expressed as [`Cmd`] values and applied through [`Document::apply`], which
//! returns a [`Patch`] naming the blocks that changed.
//!
//! ## Module Structure
//!
//! - **`document`**: the `Document` container and `StructuralError`
//! - **`commands`**: the `Cmd` enum and its execution, which also yields the
//!   inverse command
//! - **`anchors`**: moving formats, review marks and bookmarks through edits
//! - **`history`**: append-only command log, undo/redo and pure `replay`
//! - **`snapshot`**: `Arc`-shared read-only views for background work
//! - **`patch`**: what an applied command changed
//!
//! ## Usage Pattern
//!
//! ```rust
//! use storyline_engine::editing::*;
//! use storyline_engine::models::{BlockType, DocumentKind};
//!
//! let mut doc = Document::new(DocumentKind::Screenplay);
//! let mut history = History::new();
//!
//! let patch = history
//!     .apply(&mut doc, Cmd::InsertBlock {
//!         position: 0,
//!         block_type: BlockType::SceneHeading,
//!         text: "INT. HOUSE - DAY".to_string(),
//!     })
//!     .unwrap();
//! assert_eq!(patch.inserted.len(), 1);
//!
//! history.undo(&mut doc).unwrap();
//! assert!(doc.is_empty());
//! ```
//!
//! [`Block`]: crate::models::Block

pub mod anchors;
pub mod commands;
pub mod document;
pub mod history;
pub mod patch;
pub mod snapshot;

pub use commands::Cmd;
pub use document::{Document, StructuralError};
pub use history::{History, replay};
pub use patch::Patch;
pub use snapshot::Snapshot;
