// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
use storyline_engine::{BlockType, Document, DocumentKind};

#[allow(dead_code)]
pub fn generate_fountain(scenes: usize) -> String {
    let mut content = String::from("Title: Benchmark\nAuthor: Nobody\n\n");
    for scene in 0..scenes {
        content.push_str(&format!("INT. ROOM {scene} - DAY\n\n"));
        content.push_str("Rain hammers the window. *Someone* knocks twice.\n\n");
        content.push_str("JOHN\n(whispering)\nWho is it? It is late and the lights are out.\n\n");
        content.push_str("MARY (O.S.)\nOpen the door, John. We need to talk about the **letter**.\n\n");
        if scene % 5 == 4 {
            content.push_str("CUT TO:\n\n");
        }
    }
    content
}

#[allow(dead_code)]
pub fn generate_screenplay(scenes: usize) -> Document {
    let speech = "Every word of this speech was written to run long enough to wrap. ".repeat(6);
    let mut doc = Document::new(DocumentKind::Screenplay);
    for scene in 0..scenes {
        doc.push(BlockType::SceneHeading, format!("EXT. STREET {scene} - NIGHT"));
        doc.push(BlockType::Action, "Cars pass. Nobody stops. ".repeat(4));
        doc.push(BlockType::Character, "JOHN");
        doc.push(BlockType::Parenthetical, "(tired)");
        doc.push(BlockType::Dialogue, speech.trim_end());
        doc.push(BlockType::Character, "MARY");
        doc.push(BlockType::Dialogue, "Then stop talking.");
    }
    doc
}
