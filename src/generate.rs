//! The generation pipeline: budget source text, build the prompt, call the
//! completion provider, parse the response, and retry with exponential
//! backoff while the parse comes back empty.
//!
//! Contract per kind: return the first non-empty parse capped to the first
//! `n` items. Short valid lists are returned as-is, never padded. When the
//! attempt budget is exhausted (transport errors and unparseable output count
//! the same), the result is empty and nothing escapes this boundary; callers
//! treat empty as "generation failed". The insufficient-input precondition is
//! checked before any prompting.
//!
//! The pipeline holds no mutable state, so one `Generator` is shared across
//! concurrent requests without locking.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{error, info, instrument, warn};

use crate::budget::{budget, has_sufficient_source, normalize_source, DEFAULT_SOURCE_LIMIT};
use crate::config::Prompts;
use crate::domain::{ArtifactKind, DetailLevel, Flashcard, GradingItem, Question};
use crate::grading;
use crate::llm::CompletionProvider;
use crate::parse::{parse_flashcards, parse_mcqs, parse_short_answer, parse_summary, parse_true_false};
use crate::prompts::{build_items_prompt, build_summary_prompt};
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};

/// Sampling and budget settings per artifact kind. Small local models drift
/// off-format easily, so MCQs get the largest attempt budget.
#[derive(Clone, Copy, Debug)]
pub struct Tuning {
  pub attempts: u32,
  pub temperature: f32,
  pub max_tokens: u32,
}

pub fn tuning(kind: ArtifactKind) -> Tuning {
  match kind {
    ArtifactKind::Mcq => Tuning { attempts: 5, temperature: 0.2, max_tokens: 1200 },
    ArtifactKind::TrueFalse => Tuning { attempts: 4, temperature: 0.2, max_tokens: 800 },
    ArtifactKind::ShortAnswer => Tuning { attempts: 4, temperature: 0.2, max_tokens: 900 },
    ArtifactKind::Flashcard => Tuning { attempts: 3, temperature: 0.25, max_tokens: 800 },
    ArtifactKind::Summary => Tuning { attempts: 3, temperature: 0.25, max_tokens: 600 },
  }
}

pub struct Generator {
  provider: Box<dyn CompletionProvider>,
  prompts: Prompts,
  source_limit: usize,
  base_delay: Duration,
  sleeper: Box<dyn Sleeper>,
}

impl Generator {
  pub fn new(provider: Box<dyn CompletionProvider>, prompts: Prompts) -> Self {
    Self {
      provider,
      prompts,
      source_limit: DEFAULT_SOURCE_LIMIT,
      base_delay: Duration::from_secs(1),
      sleeper: Box::new(TokioSleeper),
    }
  }

  /// Substitute the sleep implementation (tests use an instant recorder).
  #[allow(dead_code)]
  pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
    self.sleeper = sleeper;
    self
  }

  pub fn provider_name(&self) -> &'static str {
    self.provider.name()
  }

  /// Normalize + precondition + budget. Returns None when the text is too
  /// thin to generate from without hallucinating.
  fn prepare_source(&self, source: &str) -> Option<String> {
    let normalized = normalize_source(source);
    if !has_sufficient_source(&normalized) {
      warn!(target: "generate", words = crate::util::word_count(&normalized), "Source below minimum word threshold; refusing to prompt");
      return None;
    }
    Some(budget(&normalized, self.source_limit))
  }

  /// One bounded attempt loop: same prompt every attempt, exponential
  /// backoff between failures, first non-empty parse wins.
  async fn run_attempts<T, F>(&self, kind: ArtifactKind, prompt: &str, parse: F) -> Vec<T>
  where
    F: Fn(&str) -> Vec<T>,
  {
    let t = tuning(kind);
    let policy = RetryPolicy { max_attempts: t.attempts, base_delay: self.base_delay };

    for attempt in 1..=policy.max_attempts {
      match self.provider.complete(prompt, t.temperature, t.max_tokens).await {
        Ok(raw) => {
          let items = parse(&raw);
          if !items.is_empty() {
            info!(target: "generate", kind = kind.as_str(), attempt, parsed = items.len(), "Generation succeeded");
            return items;
          }
          warn!(target: "generate", kind = kind.as_str(), attempt, response_len = raw.len(), "Response parsed to zero items");
        }
        Err(e) => {
          error!(target: "generate", kind = kind.as_str(), attempt, error = %e, "Completion call failed");
        }
      }
      if attempt < policy.max_attempts {
        self.sleeper.sleep(policy.delay_after(attempt)).await;
      }
    }
    warn!(target: "generate", kind = kind.as_str(), attempts = policy.max_attempts, "Attempt budget exhausted; returning empty");
    Vec::new()
  }

  async fn generate_questions(
    &self,
    kind: ArtifactKind,
    parse: fn(&str) -> Vec<Question>,
    source: &str,
    n: usize,
  ) -> Vec<Question> {
    if n == 0 {
      return Vec::new();
    }
    let Some(source) = self.prepare_source(source) else {
      return Vec::new();
    };
    let prompt = build_items_prompt(&self.prompts, kind, &source, n);
    let mut items = self.run_attempts(kind, &prompt, parse).await;
    items.truncate(n);
    items
  }

  #[instrument(level = "info", skip(self, source), fields(source_len = source.len(), n))]
  pub async fn generate_mcqs(&self, source: &str, n: usize) -> Vec<Question> {
    self.generate_questions(ArtifactKind::Mcq, parse_mcqs, source, n).await
  }

  #[instrument(level = "info", skip(self, source), fields(source_len = source.len(), n))]
  pub async fn generate_true_false(&self, source: &str, n: usize) -> Vec<Question> {
    self.generate_questions(ArtifactKind::TrueFalse, parse_true_false, source, n).await
  }

  #[instrument(level = "info", skip(self, source), fields(source_len = source.len(), n))]
  pub async fn generate_short_answer(&self, source: &str, n: usize) -> Vec<Question> {
    self.generate_questions(ArtifactKind::ShortAnswer, parse_short_answer, source, n).await
  }

  #[instrument(level = "info", skip(self, source), fields(source_len = source.len(), n))]
  pub async fn generate_flashcards(&self, source: &str, n: usize) -> Vec<Flashcard> {
    if n == 0 {
      return Vec::new();
    }
    let Some(source) = self.prepare_source(source) else {
      return Vec::new();
    };
    let prompt = build_items_prompt(&self.prompts, ArtifactKind::Flashcard, &source, n);
    let mut cards = self.run_attempts(ArtifactKind::Flashcard, &prompt, parse_flashcards).await;
    cards.truncate(n);
    cards
  }

  /// Generate a single summary. Empty string means generation failed;
  /// callers surface that as an error.
  #[instrument(level = "info", skip(self, source), fields(source_len = source.len(), detail = detail.as_str()))]
  pub async fn generate_summary(&self, source: &str, detail: DetailLevel) -> String {
    let Some(source) = self.prepare_source(source) else {
      return String::new();
    };
    let prompt = build_summary_prompt(&self.prompts, &source, detail);
    let texts = self
      .run_attempts(ArtifactKind::Summary, &prompt, |raw| {
        parse_summary(raw).into_iter().collect::<Vec<String>>()
      })
      .await;
    texts.into_iter().next().unwrap_or_default()
  }

  /// Batched short-answer grading; see [`crate::grading`] for the policy.
  #[instrument(level = "info", skip(self, items), fields(batch = items.len()))]
  pub async fn grade_short_answers(&self, items: &[GradingItem]) -> HashMap<i64, bool> {
    grading::grade_short_answers(self.provider.as_ref(), &self.prompts, items).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
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

    /// Repeats the final scripted response forever once the script runs out.
    fn looping(response: Result<String, String>) -> Self {
      Self { responses: Mutex::new(vec![response]), calls: AtomicUsize::new(0) }
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
      if rs.len() == 1 {
        rs[0].clone()
      } else {
        rs.remove(0)
      }
    }
    fn name(&self) -> &'static str {
      "scripted"
    }
  }

  #[derive(Default)]
  struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
  }

  #[async_trait]
  impl Sleeper for RecordingSleeper {
    async fn sleep(&self, d: Duration) {
      self.delays.lock().unwrap().push(d);
    }
  }

  /// Arc wrapper so tests keep a handle on the provider/sleeper after the
  /// generator takes ownership.
  struct Shared<T>(std::sync::Arc<T>);

  #[async_trait]
  impl<T: CompletionProvider> CompletionProvider for Shared<T> {
    async fn complete(&self, p: &str, t: f32, m: u32) -> Result<String, String> {
      self.0.complete(p, t, m).await
    }
    fn name(&self) -> &'static str {
      self.0.name()
    }
  }

  #[async_trait]
  impl<T: Sleeper> Sleeper for Shared<T> {
    async fn sleep(&self, d: Duration) {
      self.0.sleep(d).await;
    }
  }

  fn mitosis_source() -> String {
    "Mitosis is the process by which a eukaryotic cell separates the chromosomes \
in its nucleus into two identical sets in two daughter nuclei. "
      .repeat(10)
  }

  fn two_mcq_blocks() -> String {
    "\
Q: What does mitosis produce?
A) Four haploid cells
B) Two genetically identical daughter cells
C) A single gamete
D) Proteins
Answer: B
Explanation: Mitosis yields two identical daughter nuclei.

---

Q: In which structure does mitosis occur?
A) The nucleus
B) The cell membrane
C) The ribosome
D) The vacuole
Answer: A
Explanation: Chromosome separation happens in the nucleus.
"
    .to_string()
  }

  fn generator(
    provider: ScriptedProvider,
  ) -> (Generator, std::sync::Arc<ScriptedProvider>, std::sync::Arc<RecordingSleeper>) {
    let provider = std::sync::Arc::new(provider);
    let sleeper = std::sync::Arc::new(RecordingSleeper::default());
    let g = Generator::new(Box::new(Shared(provider.clone())), Prompts::default())
      .with_sleeper(Box::new(Shared(sleeper.clone())));
    (g, provider, sleeper)
  }

  #[tokio::test]
  async fn end_to_end_mcq_generation() {
    let (g, provider, _) = generator(ScriptedProvider::new(vec![Ok(two_mcq_blocks())]));

    let items = g.generate_mcqs(&mitosis_source(), 2).await;
    assert_eq!(items.len(), 2);
    for q in &items {
      assert_eq!(q.options.len(), 4);
      assert!(q.options.contains(&q.answer));
    }
    assert_eq!(items[0].answer, "Two genetically identical daughter cells");
    assert_eq!(provider.calls(), 1);
  }

  #[tokio::test]
  async fn retry_exhaustion_calls_provider_max_attempts_times() {
    let (g, provider, sleeper) =
      generator(ScriptedProvider::looping(Ok("I cannot produce questions, sorry.".into())));
    let attempts = tuning(ArtifactKind::Mcq).attempts as usize;

    let items = g.generate_mcqs(&mitosis_source(), 3).await;
    assert!(items.is_empty());
    assert_eq!(provider.calls(), attempts);
    let secs: Vec<u64> =
      sleeper.delays.lock().unwrap().iter().map(|d| d.as_secs()).collect();
    assert_eq!(secs, vec![1, 2, 4, 8]);
  }

  #[tokio::test]
  async fn transport_errors_are_retried_then_swallowed() {
    let (g, provider, _) = generator(ScriptedProvider::looping(Err("connection reset".into())));
    let attempts = tuning(ArtifactKind::Flashcard).attempts as usize;

    let cards = g.generate_flashcards(&mitosis_source(), 4).await;
    assert!(cards.is_empty());
    assert_eq!(provider.calls(), attempts);
  }

  #[tokio::test]
  async fn failure_then_success_stops_retrying() {
    let (g, provider, sleeper) = generator(ScriptedProvider::new(vec![
      Err("timeout".into()),
      Ok(two_mcq_blocks()),
      Ok("never reached".into()),
    ]));

    let items = g.generate_mcqs(&mitosis_source(), 5).await;
    assert_eq!(items.len(), 2);
    assert_eq!(provider.calls(), 2);
    // Exactly one backoff sleep: between the failed first and the
    // successful second attempt.
    let delays = sleeper.delays.lock().unwrap().clone();
    assert_eq!(delays, vec![Duration::from_secs(1)]);
  }

  #[tokio::test]
  async fn cap_not_pad() {
    // Only 2 parseable questions but 5 requested: return 2, never pad.
    let (g, _, _) = generator(ScriptedProvider::new(vec![Ok(two_mcq_blocks())]));
    let items = g.generate_mcqs(&mitosis_source(), 5).await;
    assert_eq!(items.len(), 2);
  }

  #[tokio::test]
  async fn surplus_items_are_truncated_to_n() {
    let (g, _, _) = generator(ScriptedProvider::new(vec![Ok(two_mcq_blocks())]));
    let items = g.generate_mcqs(&mitosis_source(), 1).await;
    assert_eq!(items.len(), 1);
  }

  #[tokio::test]
  async fn insufficient_source_makes_no_call() {
    let (g, provider, _) = generator(ScriptedProvider::new(vec![Ok(two_mcq_blocks())]));
    let items = g.generate_mcqs("mitosis is cell division", 3).await;
    assert!(items.is_empty());
    assert_eq!(provider.calls(), 0);
  }

  #[tokio::test]
  async fn zero_count_short_circuits() {
    let (g, provider, _) = generator(ScriptedProvider::new(vec![Ok(two_mcq_blocks())]));
    assert!(g.generate_true_false(&mitosis_source(), 0).await.is_empty());
    assert_eq!(provider.calls(), 0);
  }

  #[tokio::test]
  async fn flashcards_parse_and_cap() {
    let (g, _, _) = generator(ScriptedProvider::new(vec![Ok("\
Q: Mitosis
A: Division producing two identical nuclei.

Q: Chromatid
A: One half of a duplicated chromosome.

Q: Spindle
A: Fiber structure separating chromatids.
"
    .into())]));
    let cards = g.generate_flashcards(&mitosis_source(), 2).await;
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].front, "Mitosis");
  }

  #[tokio::test]
  async fn summary_retries_empty_response_then_succeeds() {
    let (g, provider, sleeper) = generator(ScriptedProvider::new(vec![
      Ok("   ".into()),
      Ok("Mitosis splits one nucleus into two identical sets.".into()),
    ]));
    let text = g.generate_summary(&mitosis_source(), DetailLevel::Brief).await;
    assert_eq!(text, "Mitosis splits one nucleus into two identical sets.");
    assert_eq!(provider.calls(), 2);
    assert_eq!(sleeper.delays.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn summary_exhaustion_yields_empty_string() {
    let (g, provider, _) = generator(ScriptedProvider::looping(Ok(String::new())));
    let text = g.generate_summary(&mitosis_source(), DetailLevel::Standard).await;
    assert!(text.is_empty());
    assert_eq!(provider.calls(), tuning(ArtifactKind::Summary).attempts as usize);
  }

  #[tokio::test]
  async fn true_false_generation_normalizes_answers() {
    let (g, _, _) = generator(ScriptedProvider::new(vec![Ok("\
Q: Mitosis produces identical cells.
Answer: true
Explanation: Both daughter nuclei carry the same chromosomes.

---

Q: Mitosis produces gametes.
Answer: FALSE
"
    .into())]));
    let items = g.generate_true_false(&mitosis_source(), 2).await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].answer, "True");
    assert_eq!(items[1].answer, "False");
  }
}
