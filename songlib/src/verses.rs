//! Splitting lyric text into verses.
//!
//! A verse boundary is every occurrence of [`VERSE_SEPARATOR`] (two consecutive newlines), scanned
//! left to right without overlap. Nothing is trimmed or dropped, so runs of three or more newlines
//! leave a leading `\n` on the next verse or produce empty verses, and
//! `join_verses(split_into_verses(t)) == t` for every `t`.

/// The blank-line boundary between two verses
pub const VERSE_SEPARATOR: &str = "\n\n";

/// Split lyric text into verses in display order. Always returns at least one element.
pub fn split_into_verses(text: &str) -> Vec<&str> {
    text.split(VERSE_SEPARATOR).collect()
}

/// Inverse of [`split_into_verses`]
pub fn join_verses<I, S>(verses: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (i, verse) in verses.into_iter().enumerate() {
        if i > 0 {
            out.push_str(VERSE_SEPARATOR);
        }
        out.push_str(verse.as_ref());
    }
    out
}
