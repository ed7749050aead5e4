pub mod cancel;
pub mod codecs;
pub mod corrector;
pub mod editing;
pub mod io;
pub mod layout;
pub mod models;
pub mod stats;
pub mod template;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use cancel::{CancellationToken, Cancelled};
pub use codecs::{
    Codec, CodecRegistry, ExportError, ExportOptions, Format, ImportError, ImportOptions,
};
pub use editing::{Cmd, Document, History, Patch, Snapshot, StructuralError};
pub use io::*;
pub use layout::{LayoutItem, LayoutPlan};
pub use models::*;
pub use stats::{Counts, PageTable, paginate, summarize};
pub use template::{Template, TemplateError};
