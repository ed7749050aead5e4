pub mod block;
pub mod block_type;
pub mod dictionaries;
pub mod metadata;
pub mod parsers;
pub mod script_file;

pub use block::{
    Alignment, Block, BlockId, Bookmark, FormattingOverride, InlineStyle, ReviewMark, StyledRun,
    TextFormat,
};
pub use block_type::{BlockType, DocumentKind, KindSet};
pub use dictionaries::Dictionaries;
pub use metadata::{DraftInfo, ProjectMetadata, TitlePage};
pub use script_file::ScriptFile;
