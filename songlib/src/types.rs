//! Common type definitions.
//!
//! All entity ids are database-assigned, monotonically increasing `BIGINT` identities. They are
//! wrapped in type aliases so signatures say which table an id points into:
//!
//! - [`GroupId`]: group (artist/band) identifier
//! - [`SongId`]: song identifier
//! - [`VerseId`]: verse identifier

pub type GroupId = i64;
pub type SongId = i64;
pub type VerseId = i64;

/// Shorten long free text (lyrics, verse bodies) for log fields.
pub fn abbrev_text(text: &str) -> String {
    const MAX_CHARS: usize = 32;
    if text.chars().count() <= MAX_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX_CHARS).collect();
        format!("{head}...")
    }
}
