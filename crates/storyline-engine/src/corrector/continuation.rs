//! Markers around a dialogue that breaks across pages.

use crate::models::parsers::character_name;
use crate::template::ContinuationMarkers;

/// Literal written under the fragment before the break.
pub fn more_marker(markers: &ContinuationMarkers) -> Option<&str> {
    markers.enabled.then_some(markers.more.as_str())
}

/// Cue repeated above the fragment after the break, such as `JOHN (CONT'D)`.
///
/// Extensions on the original cue are dropped; the speaker name is enough to
/// carry the speech over.
pub fn continued_cue(character: &str, markers: &ContinuationMarkers) -> Option<String> {
    if !markers.enabled {
        return None;
    }
    let name = character_name(character);
    if name.is_empty() {
        return Some(markers.continued.clone());
    }
    Some(format!("{name} {}", markers.continued))
}
