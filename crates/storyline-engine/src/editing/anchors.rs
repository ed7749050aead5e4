//! Anchor maintenance for formats, review marks and bookmarks.
//!
//! Everything anchored to block text is stored as character offsets, so every
//! text mutation has to move them. The rules:
//!
//! - anchors before the edit stay put;
//! - anchors after the edit shift by the length delta;
//! - points strictly inside a deleted span are dropped;
//! - ranges lying entirely inside a deleted span are dropped, ranges that
//!   only overlap it are clipped;
//! - insertions at a range boundary land outside the range.

use std::ops::Range;

use crate::models::{Block, Bookmark, ReviewMark, TextFormat};

/// Where a single offset goes after replacing `edit` with `inserted` chars.
fn map_point(offset: usize, edit: &Range<usize>, inserted: usize) -> Option<usize> {
    if offset <= edit.start {
        Some(offset)
    } else if offset >= edit.end {
        Some(offset - edit.len() + inserted)
    } else {
        None
    }
}

/// Where a range goes after replacing `edit` with `inserted` chars.
fn map_range(range: &Range<usize>, edit: &Range<usize>, inserted: usize) -> Option<Range<usize>> {
    let start = if range.start < edit.start {
        range.start
    } else if range.start >= edit.end {
        range.start - edit.len() + inserted
    } else {
        edit.start + inserted
    };
    let end = if range.end <= edit.start {
        range.end
    } else if range.end > edit.end {
        range.end - edit.len() + inserted
    } else {
        edit.start
    };

    if start < end || (range.is_empty() && start == end) {
        Some(start..end)
    } else {
        None
    }
}

/// Move every anchor on `block` for a text replacement of `edit`
/// (character range, pre-edit coordinates) by `inserted` characters.
pub(crate) fn shift_for_edit(block: &mut Block, edit: Range<usize>, inserted: usize) {
    block.formats = block
        .formats
        .iter()
        .filter_map(|f| {
            map_range(&f.range, &edit, inserted).map(|range| TextFormat {
                range,
                style: f.style,
            })
        })
        .collect();

    block.review_marks = block
        .review_marks
        .iter()
        .filter_map(|m| {
            map_range(&m.range, &edit, inserted).map(|range| ReviewMark {
                range,
                ..m.clone()
            })
        })
        .collect();

    block.bookmarks = block
        .bookmarks
        .iter()
        .filter_map(|b| {
            map_point(b.offset, &edit, inserted).map(|offset| Bookmark {
                name: b.name.clone(),
                offset,
            })
        })
        .collect();

    block.normalize_formats();
}

fn split_range(range: &Range<usize>, at: usize) -> (Option<Range<usize>>, Option<Range<usize>>) {
    if range.end <= at && !(range.is_empty() && range.start == at) {
        (Some(range.clone()), None)
    } else if range.start >= at {
        (None, Some(range.start - at..range.end - at))
    } else {
        (Some(range.start..at), Some(0..range.end - at))
    }
}

/// Divide the anchors of `source` between the halves of a split at `at`.
///
/// `left` and `right` already hold their text; their anchor lists are
/// replaced. A range crossing the split point is cut in two.
pub(crate) fn split_anchors(source: &Block, at: usize, left: &mut Block, right: &mut Block) {
    left.formats.clear();
    right.formats.clear();
    for f in &source.formats {
        let (l, r) = split_range(&f.range, at);
        if let Some(range) = l {
            left.formats.push(TextFormat {
                range,
                style: f.style,
            });
        }
        if let Some(range) = r {
            right.formats.push(TextFormat {
                range,
                style: f.style,
            });
        }
    }

    left.review_marks.clear();
    right.review_marks.clear();
    for m in &source.review_marks {
        let (l, r) = split_range(&m.range, at);
        if let Some(range) = l {
            left.review_marks.push(ReviewMark {
                range,
                ..m.clone()
            });
        }
        if let Some(range) = r {
            right.review_marks.push(ReviewMark {
                range,
                ..m.clone()
            });
        }
    }

    let (before, after): (Vec<_>, Vec<_>) =
        source.bookmarks.iter().cloned().partition(|b| b.offset < at);
    left.bookmarks = before;
    right.bookmarks = after
        .into_iter()
        .map(|b| Bookmark {
            offset: b.offset - at,
            ..b
        })
        .collect();

    left.normalize_formats();
    right.normalize_formats();
}

/// Append the anchors of `second` to `first`, shifted by `first_len`.
pub(crate) fn append_anchors(first: &mut Block, second: &Block, first_len: usize) {
    first
        .formats
        .extend(second.formats.iter().map(|f| TextFormat {
            range: f.range.start + first_len..f.range.end + first_len,
            style: f.style,
        }));
    first
        .review_marks
        .extend(second.review_marks.iter().map(|m| ReviewMark {
            range: m.range.start + first_len..m.range.end + first_len,
            ..m.clone()
        }));
    first
        .bookmarks
        .extend(second.bookmarks.iter().map(|b| Bookmark {
            name: b.name.clone(),
            offset: b.offset + first_len,
        }));
    first.normalize_formats();
    first.coalesce_review_marks();
}
