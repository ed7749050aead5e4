use crate::editing::Document;
use crate::models::{Block, BlockType};
use crate::template::DurationMode;

/// Notes and synopses are not performed, so they take no screen time.
pub(crate) fn is_timed(block: &Block) -> bool {
    !matches!(block.block_type, BlockType::InlineNote | BlockType::Synopsis)
}

/// Estimated running time in seconds.
///
/// `pages` is the fractional page count, only used by
/// [`DurationMode::PerPage`].
pub fn estimate(document: &Document, pages: f64, mode: &DurationMode) -> f64 {
    let timed = || document.blocks().filter(|b| is_timed(b));
    match *mode {
        DurationMode::PerPage { seconds_per_page } => pages * seconds_per_page,
        DurationMode::PerEntry { seconds_per_entry } => {
            timed().filter(|b| !b.is_blank()).count() as f64 * seconds_per_entry
        }
        DurationMode::ByWordCount { words, seconds } => {
            if words == 0 {
                return 0.0;
            }
            let count: usize = timed().map(|b| b.text.split_whitespace().count()).sum();
            count as f64 / f64::from(words) * seconds
        }
        DurationMode::ByLetterCount {
            letters,
            seconds,
            count_spaces,
        } => {
            if letters == 0 {
                return 0.0;
            }
            let count: usize = timed()
                .map(|b| {
                    b.text
                        .chars()
                        .filter(|c| count_spaces || !c.is_whitespace())
                        .count()
                })
                .sum();
            count as f64 / f64::from(letters) * seconds
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentKind;

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[test]
    fn test_three_hundred_words_at_one_fifty_per_minute() {
        // Given 300 words of action
        let doc = Document::from_blocks(
            DocumentKind::Screenplay,
            [
                (BlockType::Action, words(200)),
                (BlockType::Action, words(100)),
            ],
        );
        let mode = DurationMode::ByWordCount {
            words: 150,
            seconds: 60.0,
        };

        // Then the estimate is two minutes
        assert_eq!(estimate(&doc, 0.0, &mode), 120.0);
    }

    #[test]
    fn test_notes_are_not_timed() {
        let doc = Document::from_blocks(
            DocumentKind::Screenplay,
            [
                (BlockType::Action, words(150)),
                (BlockType::InlineNote, words(150)),
                (BlockType::Synopsis, words(150)),
            ],
        );
        let mode = DurationMode::ByWordCount {
            words: 150,
            seconds: 60.0,
        };
        assert_eq!(estimate(&doc, 0.0, &mode), 60.0);
    }

    #[test]
    fn test_by_letter_count() {
        let doc = Document::from_blocks(DocumentKind::Screenplay, [(BlockType::Action, "ab cd")]);
        let without = DurationMode::ByLetterCount {
            letters: 4,
            seconds: 2.0,
            count_spaces: false,
        };
        let with = DurationMode::ByLetterCount {
            letters: 5,
            seconds: 2.0,
            count_spaces: true,
        };
        assert_eq!(estimate(&doc, 0.0, &without), 2.0);
        assert_eq!(estimate(&doc, 0.0, &with), 2.0);
    }

    #[test]
    fn test_per_entry_skips_blank_blocks() {
        let doc = Document::from_blocks(
            DocumentKind::Screenplay,
            [
                (BlockType::Action, "One."),
                (BlockType::Action, "  "),
                (BlockType::Dialogue, "Two."),
            ],
        );
        let mode = DurationMode::PerEntry {
            seconds_per_entry: 1.5,
        };
        assert_eq!(estimate(&doc, 0.0, &mode), 3.0);
    }

    #[test]
    fn test_per_page() {
        let doc = Document::new(DocumentKind::Screenplay);
        let mode = DurationMode::default();
        assert_eq!(estimate(&doc, 2.5, &mode), 150.0);
    }
}
