//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Whitespace-delimited word count. Used for the minimum-source precondition.
pub fn word_count(s: &str) -> usize {
  s.split_whitespace().count()
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge prompt/response payloads.
#[allow(dead_code)]
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.chars().count() <= max {
    s.to_string()
  } else {
    let head: String = s.chars().take(max).collect();
    format!("{}… ({} bytes total)", head, s.len())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fill_template_replaces_all_occurrences() {
    let out = fill_template("{n} items, yes {n}", &[("n", "3")]);
    assert_eq!(out, "3 items, yes 3");
  }

  #[test]
  fn fill_template_leaves_unknown_keys() {
    let out = fill_template("{source} and {other}", &[("source", "abc")]);
    assert_eq!(out, "abc and {other}");
  }

  #[test]
  fn word_count_splits_on_any_whitespace() {
    assert_eq!(word_count("one  two\n three\t"), 3);
    assert_eq!(word_count(""), 0);
  }
}
