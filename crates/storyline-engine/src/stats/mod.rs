//! # Statistics
//!
//! Derived, read-only metrics over a document: the [`PageTable`] produced by
//! [`paginate`], running time estimates and speaker [`Counts`].

pub mod duration;
pub mod pagination;
pub mod summary;

pub use pagination::{Page, PageItem, PageTable, paginate, paginate_with_cancel};
pub use summary::{CharacterCount, Counts, SpeakingBucket, summarize};
