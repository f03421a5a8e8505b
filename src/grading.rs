//! Batched short-answer grading against the completion service.
//!
//! One prompt lists every queued item; the model is asked for a strict JSON
//! object mapping item id to a boolean verdict. The policy is fail-closed:
//! anything that cannot be parsed into a verdict stays `false`. An ungraded
//! or ambiguous answer must never be silently marked correct.
//!
//! Grading is a single attempt (no retry): callers record answers as
//! incorrect before grading, so a visible best-effort failure is acceptable.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::config::Prompts;
use crate::domain::GradingItem;
use crate::llm::CompletionProvider;
use crate::prompts::build_grading_prompt;

const GRADING_TEMPERATURE: f32 = 0.0;
const GRADING_MAX_TOKENS: u32 = 500;

/// Grade a batch of short answers. Returns a verdict for every input id;
/// ids the model skipped or mangled stay `false`.
#[instrument(level = "info", skip(provider, prompts, items), fields(batch = items.len()))]
pub async fn grade_short_answers(
  provider: &dyn CompletionProvider,
  prompts: &Prompts,
  items: &[GradingItem],
) -> HashMap<i64, bool> {
  if items.is_empty() {
    return HashMap::new();
  }

  let mut verdicts: HashMap<i64, bool> = items.iter().map(|it| (it.id, false)).collect();
  let prompt = build_grading_prompt(prompts, items);

  let raw = match provider.complete(&prompt, GRADING_TEMPERATURE, GRADING_MAX_TOKENS).await {
    Ok(raw) => raw,
    Err(e) => {
      error!(target: "generate", error = %e, "Grading call failed; all answers stay incorrect");
      return verdicts;
    }
  };

  let Some(obj) = extract_json_object(&raw) else {
    warn!(target: "generate", response_len = raw.len(), "No JSON object in grading response");
    return verdicts;
  };

  match serde_json::from_str::<Value>(&obj) {
    Ok(Value::Object(map)) => {
      let mut applied = 0usize;
      for (k, v) in map {
        let (Ok(id), Some(correct)) = (k.trim().parse::<i64>(), v.as_bool()) else {
          continue;
        };
        if let Some(slot) = verdicts.get_mut(&id) {
          *slot = correct;
          applied += 1;
        }
      }
      info!(target: "generate", applied, batch = items.len(), "Grading verdicts applied");
    }
    Ok(_) => warn!(target: "generate", "Grading response JSON was not an object"),
    Err(e) => warn!(target: "generate", error = %e, "Malformed JSON in grading response"),
  }

  verdicts
}

/// Extract the first balanced brace-delimited JSON object found anywhere in
/// `raw`. Models routinely wrap the object in prose; string literals and
/// escapes are respected while matching braces.
pub fn extract_json_object(raw: &str) -> Option<String> {
  let start = raw.find('{')?;
  let mut depth = 0usize;
  let mut in_string = false;
  let mut escaped = false;

  for (i, ch) in raw[start..].char_indices() {
    if in_string {
      if escaped {
        escaped = false;
      } else if ch == '\\' {
        escaped = true;
      } else if ch == '"' {
        in_string = false;
      }
      continue;
    }
    match ch {
      '"' => in_string = true,
      '{' => depth += 1,
      '}' => {
        depth -= 1;
        if depth == 0 {
          return Some(raw[start..start + i + ch.len_utf8()].to_string());
        }
      }
      _ => {}
    }
  }
  None
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Prompts;
  use crate::llm::CompletionProvider;
  use async_trait::async_trait;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Mutex;

  struct ScriptedProvider {
    responses: Mutex<Vec<Result<String, String>>>,
    calls: AtomicUsize,
  }

  impl ScriptedProvider {
    fn new(responses: Vec<Result<String, String>>) -> Self {
      Self { responses: Mutex::new(responses), calls: AtomicUsize::new(0) }
    }
    fn calls(&self) -> usize {
      self.calls.load(Ordering::SeqCst)
    }
  }

  #[async_trait]
  impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, _p: &str, _t: f32, _m: u32) -> Result<String, String> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      let mut rs = self.responses.lock().unwrap();
      if rs.is_empty() {
        Err("script exhausted".into())
      } else {
        rs.remove(0)
      }
    }
    fn name(&self) -> &'static str {
      "scripted"
    }
  }

  fn items(ids: &[i64]) -> Vec<GradingItem> {
    ids
      .iter()
      .map(|&id| GradingItem {
        id,
        prompt: format!("Question {id}"),
        correct_answer: "expected".into(),
        user_answer: "given".into(),
      })
      .collect()
  }

  #[test]
  fn json_extraction_ignores_surrounding_noise() {
    let raw = "Here you go: {\"5\": true, \"6\": false} Thanks!";
    assert_eq!(extract_json_object(raw), Some("{\"5\": true, \"6\": false}".to_string()));
  }

  #[test]
  fn json_extraction_handles_nesting_and_strings() {
    let raw = "x {\"a\": {\"b\": \"}\"}, \"c\": 1} y";
    assert_eq!(extract_json_object(raw), Some("{\"a\": {\"b\": \"}\"}, \"c\": 1}".to_string()));
  }

  #[test]
  fn json_extraction_none_without_object() {
    assert_eq!(extract_json_object("no braces here"), None);
    assert_eq!(extract_json_object("{ never closed"), None);
  }

  #[tokio::test]
  async fn grades_json_in_noise() {
    let provider =
      ScriptedProvider::new(vec![Ok("Here you go: {\"5\": true, \"6\": false} Thanks!".into())]);
    let out = grade_short_answers(&provider, &Prompts::default(), &items(&[5, 6])).await;
    assert_eq!(out.get(&5), Some(&true));
    assert_eq!(out.get(&6), Some(&false));
  }

  #[tokio::test]
  async fn fails_closed_on_garbage() {
    let provider = ScriptedProvider::new(vec![Ok("total nonsense, no json".into())]);
    let out = grade_short_answers(&provider, &Prompts::default(), &items(&[1, 2, 3])).await;
    assert_eq!(out.len(), 3);
    assert!(out.values().all(|v| !v));
    assert_eq!(provider.calls(), 1);
  }

  #[tokio::test]
  async fn fails_closed_on_transport_error() {
    let provider = ScriptedProvider::new(vec![Err("connection refused".into())]);
    let out = grade_short_answers(&provider, &Prompts::default(), &items(&[7])).await;
    assert_eq!(out.get(&7), Some(&false));
    // Single attempt only.
    assert_eq!(provider.calls(), 1);
  }

  #[tokio::test]
  async fn missing_and_unknown_ids_are_handled() {
    // Model answers for one known id, skips another, invents a third.
    let provider = ScriptedProvider::new(vec![Ok("{\"1\": true, \"99\": true}".into())]);
    let out = grade_short_answers(&provider, &Prompts::default(), &items(&[1, 2])).await;
    assert_eq!(out.len(), 2);
    assert_eq!(out.get(&1), Some(&true));
    assert_eq!(out.get(&2), Some(&false));
    assert!(!out.contains_key(&99));
  }

  #[tokio::test]
  async fn non_boolean_verdicts_are_ignored() {
    let provider = ScriptedProvider::new(vec![Ok("{\"1\": \"yes\", \"2\": true}".into())]);
    let out = grade_short_answers(&provider, &Prompts::default(), &items(&[1, 2])).await;
    assert_eq!(out.get(&1), Some(&false));
    assert_eq!(out.get(&2), Some(&true));
  }

  #[tokio::test]
  async fn empty_input_makes_no_call() {
    let provider = ScriptedProvider::new(vec![]);
    let out = grade_short_answers(&provider, &Prompts::default(), &[]).await;
    assert!(out.is_empty());
    assert_eq!(provider.calls(), 0);
  }
}
