//! Transcript segmentation.
//!
//! Splits a raw transcript into ordered fragments on sentence-ending
//! punctuation, runs of extra whitespace, and spoken topic-change
//! conjunctions, so each fragment can be classified on its own.

use once_cell::sync::Lazy;
use regex::Regex;

/// Fragment delimiters: sentence punctuation, 2+ whitespace, Korean topic
/// conjunctions (plain literals — dictated speech puts them between
/// clauses), and word-bounded English equivalents.
static SEGMENT_SPLITTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[.?!]|\s{2,}|그리고|그래서|그런데|\b(?:and|so|but)\b")
        .expect("segment splitter regex is valid")
});

/// Split a transcript into trimmed, non-empty fragments in original order.
///
/// The returned iterator is lazy and finite; calling `segment` again
/// restarts from the top. Empty or whitespace-only transcripts yield
/// nothing. No merging, reordering or normalization beyond trimming.
pub fn segment(transcript: &str) -> impl Iterator<Item = &str> + '_ {
    SEGMENT_SPLITTER
        .split(transcript)
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
}
