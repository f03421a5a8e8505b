//! Source-text budgeting: normalization plus head/tail windowing so long
//! documents fit a character budget small models can handle.
//!
//! Keeping both the opening (definitions, framing) and the closing
//! (conclusions) of a document beats head-only truncation for question
//! quality, so the middle is what gets dropped, with a visible marker left
//! in its place.

use crate::util::word_count;

/// In-band notice separating retained head and tail after truncation.
pub const TRUNCATION_MARKER: &str = "\n[... trimmed for length ...]\n";

/// Hard character budget applied to source text before prompting.
pub const DEFAULT_SOURCE_LIMIT: usize = 8000;

/// Sources under this many words are refused before any prompting happens.
pub const MIN_SOURCE_WORDS: usize = 40;

/// Collapse runs of whitespace to single spaces and strip NUL bytes.
/// PDF/PPTX extractors routinely emit both.
pub fn normalize_source(text: &str) -> String {
  text
    .split_whitespace()
    .map(|w| w.replace('\0', ""))
    .filter(|w| !w.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

/// True when the text carries enough signal to generate from.
pub fn has_sufficient_source(text: &str) -> bool {
  word_count(text) >= MIN_SOURCE_WORDS
}

/// Window `text` into at most `limit` characters.
///
/// Text at or under the limit is returned unchanged. Longer text keeps an
/// equal head and tail slice with [`TRUNCATION_MARKER`] between them; the
/// marker's own length is reserved out of the budget so the result never
/// exceeds `limit` characters, which also makes the operation idempotent.
/// Counts are in chars, not bytes, so multi-byte input is never split.
pub fn budget(text: &str, limit: usize) -> String {
  let len = text.chars().count();
  if len <= limit {
    return text.to_string();
  }

  let marker_len = TRUNCATION_MARKER.chars().count();
  if limit <= marker_len {
    // Degenerate budget: no room for the marker, plain head cut.
    return text.chars().take(limit).collect();
  }

  let half = (limit - marker_len) / 2;
  let head: String = text.chars().take(half).collect();
  let tail: String = {
    let skip = len - half;
    text.chars().skip(skip).collect()
  };

  let mut out = String::with_capacity(head.len() + TRUNCATION_MARKER.len() + tail.len());
  out.push_str(&head);
  out.push_str(TRUNCATION_MARKER);
  out.push_str(&tail);
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn short_text_is_unchanged() {
    assert_eq!(budget("hello", 100), "hello");
    assert_eq!(budget("", 100), "");
  }

  #[test]
  fn long_text_keeps_head_and_tail_with_marker() {
    let text = "a".repeat(300) + &"z".repeat(300);
    let out = budget(&text, 100);
    assert!(out.starts_with('a'));
    assert!(out.ends_with('z'));
    assert!(out.contains(TRUNCATION_MARKER.trim()));
  }

  #[test]
  fn budget_is_bounded() {
    for limit in [10usize, 50, 100, 8000] {
      let text = "x".repeat(20_000);
      let out = budget(&text, limit);
      assert!(out.chars().count() <= limit + TRUNCATION_MARKER.chars().count());
    }
  }

  #[test]
  fn budget_is_idempotent() {
    let text: String = (0..5000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
    for limit in [64usize, 777, 8000] {
      let once = budget(&text, limit);
      let twice = budget(&once, limit);
      assert_eq!(once, twice);
    }
  }

  #[test]
  fn budget_respects_char_boundaries() {
    let text = "汉".repeat(500);
    let out = budget(&text, 100);
    assert!(out.chars().count() <= 100 + TRUNCATION_MARKER.chars().count());
  }

  #[test]
  fn normalize_collapses_whitespace_and_strips_nul() {
    let raw = "  one\t\ttwo\n\nthr\0ee ";
    assert_eq!(normalize_source(raw), "one two three");
  }

  #[test]
  fn sufficiency_threshold() {
    let short = "too few words here";
    assert!(!has_sufficient_source(short));
    let long = "word ".repeat(MIN_SOURCE_WORDS);
    assert!(has_sufficient_source(&long));
  }
}
