use std::collections::{BTreeMap, BTreeSet};

use crate::editing::Document;
use crate::models::BlockType;
use crate::models::parsers::{SceneHeadingParts, character_name, scene_characters};

/// How much a character talks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpeakingBucket {
    /// More than ten dialogues
    MoreThanTen,
    /// One to ten dialogues
    UpToTen,
    /// Listed in a scene but never speaks
    NonSpeaking,
}

impl SpeakingBucket {
    fn for_count(dialogues: usize) -> Self {
        match dialogues {
            0 => SpeakingBucket::NonSpeaking,
            1..=10 => SpeakingBucket::UpToTen,
            _ => SpeakingBucket::MoreThanTen,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CharacterCount {
    pub name: String,
    pub dialogues: usize,
    /// Share of all dialogues in the script
    pub percent: f64,
    pub bucket: SpeakingBucket,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Counts {
    pub paragraphs: usize,
    pub words: usize,
    pub characters_with_spaces: usize,
    pub characters_without_spaces: usize,
    pub scenes: usize,
    /// Most talkative first, then by name
    pub characters: Vec<CharacterCount>,
    pub locations: BTreeSet<String>,
}

impl Counts {
    pub fn character(&self, name: &str) -> Option<&CharacterCount> {
        self.characters.iter().find(|c| c.name == name)
    }

    pub fn in_bucket(&self, bucket: SpeakingBucket) -> impl Iterator<Item = &CharacterCount> {
        self.characters.iter().filter(move |c| c.bucket == bucket)
    }
}

/// Text and speaker statistics, in one pass over the blocks.
pub fn summarize(document: &Document) -> Counts {
    let mut counts = Counts::default();
    let mut dialogues: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_dialogues = 0;

    for block in document.blocks() {
        if !block.is_blank() {
            counts.paragraphs += 1;
        }
        counts.words += block.text.split_whitespace().count();
        for c in block.text.chars() {
            counts.characters_with_spaces += 1;
            if !c.is_whitespace() {
                counts.characters_without_spaces += 1;
            }
        }

        match block.block_type {
            BlockType::Character => {
                let name = character_name(&block.text);
                if !name.is_empty() {
                    *dialogues.entry(name).or_default() += 1;
                    total_dialogues += 1;
                }
            }
            BlockType::SceneCharacters => {
                for name in scene_characters(&block.text) {
                    dialogues.entry(name).or_default();
                }
            }
            BlockType::SceneHeading => {
                counts.scenes += 1;
                let location = SceneHeadingParts::parse(&block.text).location;
                if !location.is_empty() {
                    counts.locations.insert(location);
                }
            }
            _ => {}
        }
    }

    counts.characters = dialogues
        .into_iter()
        .map(|(name, count)| CharacterCount {
            name,
            dialogues: count,
            percent: if total_dialogues == 0 {
                0.0
            } else {
                count as f64 * 100.0 / total_dialogues as f64
            },
            bucket: SpeakingBucket::for_count(count),
        })
        .collect();
    counts
        .characters
        .sort_by(|a, b| b.dialogues.cmp(&a.dialogues).then_with(|| a.name.cmp(&b.name)));
    counts
}
