use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Document kinds a block type may appear in
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct KindSet: u8 {
        const SCREENPLAY = 1 << 0;
        const COMIC_BOOK = 1 << 1;
        const AUDIOPLAY = 1 << 2;
        const STAGEPLAY = 1 << 3;
        const TEXT = 1 << 4;
        const SCRIPTS = Self::SCREENPLAY.bits()
            | Self::COMIC_BOOK.bits()
            | Self::AUDIOPLAY.bits()
            | Self::STAGEPLAY.bits();
    }
}

/// The kind of document, which decides the valid block types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    #[default]
    Screenplay,
    ComicBook,
    Audioplay,
    Stageplay,
    Text,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 5] = [
        DocumentKind::Screenplay,
        DocumentKind::ComicBook,
        DocumentKind::Audioplay,
        DocumentKind::Stageplay,
        DocumentKind::Text,
    ];

    /// Stable id, as written in configuration and template files.
    pub fn id(self) -> &'static str {
        match self {
            DocumentKind::Screenplay => "screenplay",
            DocumentKind::ComicBook => "comic_book",
            DocumentKind::Audioplay => "audioplay",
            DocumentKind::Stageplay => "stageplay",
            DocumentKind::Text => "text",
        }
    }

    pub fn from_id(id: &str) -> Option<DocumentKind> {
        DocumentKind::ALL.into_iter().find(|kind| kind.id() == id)
    }

    pub fn flag(self) -> KindSet {
        match self {
            DocumentKind::Screenplay => KindSet::SCREENPLAY,
            DocumentKind::ComicBook => KindSet::COMIC_BOOK,
            DocumentKind::Audioplay => KindSet::AUDIOPLAY,
            DocumentKind::Stageplay => KindSet::STAGEPLAY,
            DocumentKind::Text => KindSet::TEXT,
        }
    }

    /// Type given to paragraphs that nothing more specific matched
    pub fn default_block_type(self) -> BlockType {
        match self {
            DocumentKind::ComicBook => BlockType::Description,
            DocumentKind::Text => BlockType::Text,
            _ => BlockType::Action,
        }
    }

    /// All block types valid for this kind, in declaration order.
    pub fn block_types(self) -> impl Iterator<Item = BlockType> {
        BlockType::ALL
            .iter()
            .copied()
            .filter(move |t| t.is_valid_for(self))
    }
}

/// Flat enumeration of every block type across document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    SceneHeading,
    SceneCharacters,
    Action,
    Character,
    Parenthetical,
    Dialogue,
    Lyrics,
    Shot,
    Transition,
    InlineNote,
    UnformattedText,
    SequenceHeading,
    SequenceFooter,
    ActHeading,
    BeatHeading,
    Synopsis,
    Title,
    // Comic book
    Page,
    Panel,
    Description,
    // Audioplay
    Sound,
    Music,
    Cue,
    // Plain text
    Heading1,
    Heading2,
    Heading3,
    Heading4,
    Heading5,
    Heading6,
    Text,
    /// Only valid while an import is in progress
    Undefined,
}

impl BlockType {
    pub const ALL: [BlockType; 31] = [
        BlockType::SceneHeading,
        BlockType::SceneCharacters,
        BlockType::Action,
        BlockType::Character,
        BlockType::Parenthetical,
        BlockType::Dialogue,
        BlockType::Lyrics,
        BlockType::Shot,
        BlockType::Transition,
        BlockType::InlineNote,
        BlockType::UnformattedText,
        BlockType::SequenceHeading,
        BlockType::SequenceFooter,
        BlockType::ActHeading,
        BlockType::BeatHeading,
        BlockType::Synopsis,
        BlockType::Title,
        BlockType::Page,
        BlockType::Panel,
        BlockType::Description,
        BlockType::Sound,
        BlockType::Music,
        BlockType::Cue,
        BlockType::Heading1,
        BlockType::Heading2,
        BlockType::Heading3,
        BlockType::Heading4,
        BlockType::Heading5,
        BlockType::Heading6,
        BlockType::Text,
        BlockType::Undefined,
    ];

    /// Document kinds this type is allowed in.
    pub fn kinds(self) -> KindSet {
        use BlockType::*;
        match self {
            SceneHeading | Action | Character | Parenthetical | Dialogue | InlineNote
            | UnformattedText | SequenceHeading | SequenceFooter | ActHeading | BeatHeading
            | Synopsis | Title => KindSet::SCRIPTS,
            SceneCharacters | Shot | Transition => KindSet::SCREENPLAY | KindSet::STAGEPLAY,
            Lyrics => KindSet::SCREENPLAY | KindSet::STAGEPLAY | KindSet::AUDIOPLAY,
            Page | Panel | Description => KindSet::COMIC_BOOK,
            Sound | Music | Cue => KindSet::AUDIOPLAY,
            Heading1 | Heading2 | Heading3 | Heading4 | Heading5 | Heading6 | Text => {
                KindSet::TEXT
            }
            Undefined => KindSet::empty(),
        }
    }

    pub fn is_valid_for(self, kind: DocumentKind) -> bool {
        self.kinds().contains(kind.flag())
    }

    /// Map this type onto the closest type valid for `kind`.
    ///
    /// Used once when a document is bound to its kind, e.g. at the end of an
    /// import. `Undefined` always becomes the kind's default type.
    pub fn coerce_for(self, kind: DocumentKind) -> BlockType {
        if self.is_valid_for(kind) {
            return self;
        }
        use BlockType::*;
        let mapped = match (self, kind) {
            (Heading1 | ActHeading, DocumentKind::Text) => Heading1,
            (Heading2 | SequenceHeading, DocumentKind::Text) => Heading2,
            (Heading3 | BeatHeading | SceneHeading, DocumentKind::Text) => Heading3,
            (Heading4 | Heading5 | Heading6, _) => SequenceHeading,
            (Heading1, _) => ActHeading,
            (Heading2, _) => SequenceHeading,
            (Heading3, _) => SceneHeading,
            (Page, _) => SceneHeading,
            (Panel | Shot, DocumentKind::ComicBook) => Panel,
            (Shot, _) => Action,
            (Sound | Music | Cue, DocumentKind::ComicBook) => Description,
            (Sound | Music | Cue, _) => Action,
            _ => kind.default_block_type(),
        };
        if mapped.is_valid_for(kind) {
            mapped
        } else {
            kind.default_block_type()
        }
    }

    /// Types that are never split across a page break.
    pub fn is_heading_like(self) -> bool {
        matches!(
            self,
            BlockType::SceneHeading
                | BlockType::SceneCharacters
                | BlockType::Character
                | BlockType::Transition
                | BlockType::Shot
                | BlockType::ActHeading
                | BlockType::SequenceHeading
                | BlockType::SequenceFooter
                | BlockType::BeatHeading
                | BlockType::Page
                | BlockType::Panel
                | BlockType::Heading1
                | BlockType::Heading2
                | BlockType::Heading3
                | BlockType::Heading4
                | BlockType::Heading5
                | BlockType::Heading6
        )
    }

    /// Types that belong to a character's speech run.
    pub fn is_dialogue_run(self) -> bool {
        matches!(
            self,
            BlockType::Character | BlockType::Parenthetical | BlockType::Dialogue | BlockType::Lyrics
        )
    }

    /// Stable identifier used in templates and style names.
    pub fn as_str(self) -> &'static str {
        use BlockType::*;
        match self {
            SceneHeading => "scene_heading",
            SceneCharacters => "scene_characters",
            Action => "action",
            Character => "character",
            Parenthetical => "parenthetical",
            Dialogue => "dialogue",
            Lyrics => "lyrics",
            Shot => "shot",
            Transition => "transition",
            InlineNote => "inline_note",
            UnformattedText => "unformatted_text",
            SequenceHeading => "sequence_heading",
            SequenceFooter => "sequence_footer",
            ActHeading => "act_heading",
            BeatHeading => "beat_heading",
            Synopsis => "synopsis",
            Title => "title",
            Page => "page",
            Panel => "panel",
            Description => "description",
            Sound => "sound",
            Music => "music",
            Cue => "cue",
            Heading1 => "heading1",
            Heading2 => "heading2",
            Heading3 => "heading3",
            Heading4 => "heading4",
            Heading5 => "heading5",
            Heading6 => "heading6",
            Text => "text",
            Undefined => "undefined",
        }
    }

    /// Inverse of [`BlockType::as_str`]. Also accepts the camel-case names
    /// word processors show for our exported styles.
    pub fn from_name(name: &str) -> Option<BlockType> {
        let normalized: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        BlockType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().replace('_', "") == normalized)
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_every_kind_has_a_valid_default() {
        for kind in DocumentKind::ALL {
            assert!(kind.default_block_type().is_valid_for(kind), "{kind:?}");
        }
    }

    #[test]
    fn test_kind_ids_round_trip() {
        for kind in DocumentKind::ALL {
            assert_eq!(DocumentKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(DocumentKind::from_id("novel"), None);
    }

    #[test]
    fn test_undefined_is_never_valid() {
        assert!(!BlockType::Undefined.is_valid_for(DocumentKind::Screenplay));
        assert_eq!(
            BlockType::Undefined.coerce_for(DocumentKind::Screenplay),
            BlockType::Action
        );
    }

    #[rstest]
    #[case(BlockType::Panel, DocumentKind::Screenplay, BlockType::Action)]
    #[case(BlockType::Heading1, DocumentKind::Screenplay, BlockType::ActHeading)]
    #[case(BlockType::SceneHeading, DocumentKind::Text, BlockType::Heading3)]
    #[case(BlockType::Shot, DocumentKind::ComicBook, BlockType::Panel)]
    #[case(BlockType::Dialogue, DocumentKind::ComicBook, BlockType::Dialogue)]
    #[case(BlockType::Sound, DocumentKind::Screenplay, BlockType::Action)]
    #[case(BlockType::Transition, DocumentKind::Audioplay, BlockType::Action)]
    fn test_coerce_for_kind(
        #[case] from: BlockType,
        #[case] kind: DocumentKind,
        #[case] expected: BlockType,
    ) {
        assert_eq!(from.coerce_for(kind), expected);
    }

    #[test]
    fn test_coerce_always_lands_on_valid_type() {
        for kind in [
            DocumentKind::Screenplay,
            DocumentKind::ComicBook,
            DocumentKind::Audioplay,
            DocumentKind::Stageplay,
            DocumentKind::Text,
        ] {
            for t in BlockType::ALL {
                assert!(t.coerce_for(kind).is_valid_for(kind), "{t:?} in {kind:?}");
            }
        }
    }

    #[rstest]
    #[case("scene_heading", Some(BlockType::SceneHeading))]
    #[case("SceneHeading", Some(BlockType::SceneHeading))]
    #[case("Scene Heading", Some(BlockType::SceneHeading))]
    #[case("heading1", Some(BlockType::Heading1))]
    #[case("Normal", None)]
    fn test_from_name(#[case] name: &str, #[case] expected: Option<BlockType>) {
        assert_eq!(BlockType::from_name(name), expected);
    }

    #[test]
    fn test_as_str_roundtrips_for_all_types() {
        for t in BlockType::ALL {
            assert_eq!(BlockType::from_name(t.as_str()), Some(t));
        }
    }
}
