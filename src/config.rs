//! Prompt configuration: the per-kind instruction templates, loadable from
//! TOML so the wording can be tuned without a rebuild.
//!
//! Templates are plain strings with `{source}`, `{n}`, `{detail}` and
//! grading placeholders filled by `prompts::build_*`. The defaults below are
//! the contract the parsers rely on: each template states the grammar, shows
//! one literal worked example, and forbids anything outside the format.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Instruction templates per artifact kind. Override any of them in TOML;
/// unspecified fields keep their defaults.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub mcq_template: String,
  pub true_false_template: String,
  pub short_answer_template: String,
  pub flashcard_template: String,
  pub summary_template: String,
  pub grading_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      mcq_template: r#"You are a precise and helpful assistant that writes clear multiple-choice questions (MCQs) based STRICTLY on the provided source text and concepts present in the source text. Avoid trivia; focus on key ideas. Each question must have exactly 4 options, with ONLY ONE correct answer. Do NOT add introductions, summaries, or any text outside the required format.

Source text:
"""
{source}
"""

You MUST return exactly {n} MCQs with Answer and Explanation, FOLLOWING the FORMAT below.
Each question must strictly match the structure and spacing shown in this EXAMPLE — no numbering, no bullets, no extra text.

Example format (follow this format EXACTLY but use the material from the source text to generate questions):

Q: What is the capital of France?
A) Berlin
B) Madrid
C) Paris
D) Rome
Answer: C
Explanation: Paris is the capital city of France.

---

Now write exactly {n} MCQs in the above format based only on the given source.
IMPORTANT INSTRUCTIONS (must follow):
- Start every question with "Q:" (not "Question:" or any numbering).
- Each question must have exactly 4 options labeled A), B), C), D).
- "Answer:" must be followed by exactly one letter (A/B/C/D) on its own line.
- "Explanation:" must start on a NEW line after "Answer:". Explanation should be one or two concise sentences explaining why that answer is correct.
- Do NOT include any additional commentary, titles, or text before or after the questions.
- Do NOT use the question shown in the example, it is only to show you the format.
"#
      .into(),

      true_false_template: r#"You are a precise assistant that writes true/false statements based STRICTLY on the provided source text. Half should be true and half false where possible. Do NOT add any text outside the required format.

Source text:
"""
{source}
"""

You MUST return exactly {n} true/false items FOLLOWING the FORMAT below.

Example format (follow this format EXACTLY but use the material from the source text):

Q: The Pacific is the largest ocean on Earth.
Answer: True
Explanation: The Pacific covers more area than any other ocean.

---

Now write exactly {n} items in the above format based only on the given source.
IMPORTANT INSTRUCTIONS (must follow):
- Start every statement with "Q:".
- "Answer:" must be exactly the word True or False on its own line.
- "Explanation:" must start on a NEW line after "Answer:" and be one concise sentence.
- Separate items with a line containing only "---".
- Do NOT include any additional commentary before or after the items.
"#
      .into(),

      short_answer_template: r#"You are a precise assistant that writes short-answer questions based STRICTLY on the provided source text. Questions should be answerable in one or two sentences. Do NOT add any text outside the required format.

Source text:
"""
{source}
"""

You MUST return exactly {n} short-answer questions FOLLOWING the FORMAT below.

Example format (follow this format EXACTLY but use the material from the source text):

Q: What process do plants use to convert sunlight into chemical energy?
Answer: Photosynthesis, which converts light energy into glucose.
Explanation: The source describes photosynthesis as the plant's energy-capture process.

---

Now write exactly {n} questions in the above format based only on the given source.
IMPORTANT INSTRUCTIONS (must follow):
- Start every question with "Q:".
- "Answer:" holds the model answer in one or two sentences.
- "Explanation:" is optional; when present it starts on a NEW line after the answer.
- Separate items with a line containing only "---".
- Do NOT include any additional commentary before or after the questions.
"#
      .into(),

      flashcard_template: r#"You are helping a student study from lecture notes.

Source text:
"""
{source}
"""

Create {n} concise flashcards in the following EXACT format.
Each card must be 1-2 short lines on the front and 1-3 short lines on the back.

For each card:

Q: <front side text>
A: <back side text>

---

Do not include any other text before or after the cards.
Do not number the cards. Just repeat the pattern above {n} times.
"#
      .into(),

      summary_template: r#"You are helping a student study from lecture materials.

Source text:
"""
{source}
"""

Write a {detail} summary for this document suitable for quick revision:
{shape}
- Use simple language, no flowery writing.
- Do not mention that you are an AI.
"#
      .into(),

      grading_template: r#"You are grading short-answer quiz responses. For each item decide whether the student's answer is correct. Accept paraphrases and minor wording differences; require the key idea of the expected answer to be present.

{items}

Return ONLY a JSON object mapping each item id to true (correct) or false (incorrect), like {"1": true, "2": false}. No other text.
"#
      .into(),
    }
  }
}

/// Attempt to load `AppConfig` from PROMPTS_CONFIG_PATH.
/// On any parsing/IO error, returns None and the defaults apply.
pub fn load_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("PROMPTS_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "studygen_backend", %path, "Loaded prompts config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "studygen_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "studygen_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
