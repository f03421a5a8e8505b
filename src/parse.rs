//! Parsers for the model's raw free-form responses, one per artifact kind.
//!
//! Each grammar is a single linear scan over trimmed lines. Keywords
//! (`Q:`, `A)`, `Answer:`, `Explanation:`) match case-insensitively, blank
//! lines are skipped, and items end at a `---` separator line, the next item
//! marker, or end of text. Items that fail structural validation are dropped
//! silently: a response where 4 of 5 questions are well-formed still yields
//! 4 questions.

use crate::domain::{ArtifactKind, Flashcard, Question};

/// A separator line: three or more hyphens and nothing else.
fn is_separator(line: &str) -> bool {
  let t = line.trim();
  t.len() >= 3 && t.chars().all(|c| c == '-')
}

/// Case-insensitive keyword prefix match. Returns the rest of the line
/// (leading whitespace stripped) when `line` starts with `prefix`.
fn strip_prefix_ci<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
  let t = line.trim_start();
  let head = t.get(..prefix.len())?;
  if head.eq_ignore_ascii_case(prefix) {
    Some(t[prefix.len()..].trim_start())
  } else {
    None
  }
}

/// Parse "C" / "c" (trimmed) into an option index 0..=3.
fn option_index(token: &str) -> Option<usize> {
  let t = token.trim();
  let mut chars = t.chars();
  let letter = chars.next()?;
  if chars.next().is_some() {
    return None;
  }
  match letter.to_ascii_uppercase() {
    'A' => Some(0),
    'B' => Some(1),
    'C' => Some(2),
    'D' => Some(3),
    _ => None,
  }
}

// --- MCQ ---

#[derive(Clone, Copy, PartialEq)]
enum McqField {
  Prompt,
  Option(usize),
  Answer,
  Explanation,
}

#[derive(Default)]
struct McqDraft {
  prompt: Vec<String>,
  options: [Option<String>; 4],
  answer: Option<usize>,
  explanation: Vec<String>,
}

impl McqDraft {
  fn finish(self) -> Option<Question> {
    let prompt = self.prompt.join(" ").trim().to_string();
    if prompt.is_empty() {
      return None;
    }
    let mut options = Vec::with_capacity(4);
    for o in self.options {
      let o = o?.trim().to_string();
      if o.is_empty() {
        return None;
      }
      options.push(o);
    }
    // The four options must be distinct; a duplicated option makes the
    // answer letter ambiguous.
    for i in 0..4 {
      for j in (i + 1)..4 {
        if options[i] == options[j] {
          return None;
        }
      }
    }
    let answer = options.get(self.answer?)?.clone();
    Some(Question {
      kind: ArtifactKind::Mcq,
      prompt,
      options,
      answer,
      explanation: self.explanation.join(" ").trim().to_string(),
    })
  }
}

fn flush_mcq(d: &mut Option<(McqDraft, McqField)>, out: &mut Vec<Question>) {
  if let Some((draft, _)) = d.take() {
    if let Some(q) = draft.finish() {
      out.push(q);
    }
  }
}

/// Parse multiple-choice questions in the requested grammar:
///
/// ```text
/// Q: <prompt>
/// A) ... B) ... C) ... D) ...
/// Answer: <letter A-D>
/// Explanation: <optional, may span lines>
/// ```
pub fn parse_mcqs(raw: &str) -> Vec<Question> {
  let mut out = Vec::new();
  let mut draft: Option<(McqDraft, McqField)> = None;

  for line in raw.lines() {
    if is_separator(line) {
      flush_mcq(&mut draft, &mut out);
      continue;
    }
    if let Some(rest) = strip_prefix_ci(line, "Q:") {
      flush_mcq(&mut draft, &mut out);
      let mut d = McqDraft::default();
      if !rest.trim().is_empty() {
        d.prompt.push(rest.trim().to_string());
      }
      draft = Some((d, McqField::Prompt));
      continue;
    }
    let Some((d, field)) = draft.as_mut() else {
      // Preamble chatter before the first Q: is ignored.
      continue;
    };
    if line.trim().is_empty() {
      continue;
    }

    let mut matched = false;
    for (label, idx) in [("A)", 0usize), ("B)", 1), ("C)", 2), ("D)", 3)] {
      if let Some(rest) = strip_prefix_ci(line, label) {
        d.options[idx] = Some(rest.trim().to_string());
        *field = McqField::Option(idx);
        matched = true;
        break;
      }
    }
    if matched {
      continue;
    }

    if let Some(rest) = strip_prefix_ci(line, "Answer:") {
      d.answer = option_index(rest);
      *field = McqField::Answer;
      continue;
    }
    if let Some(rest) = strip_prefix_ci(line, "Explanation:") {
      if !rest.trim().is_empty() {
        d.explanation.push(rest.trim().to_string());
      }
      *field = McqField::Explanation;
      continue;
    }

    // Continuation of whichever field is open.
    let text = line.trim().to_string();
    match *field {
      McqField::Prompt => d.prompt.push(text),
      McqField::Option(idx) => {
        if let Some(opt) = d.options[idx].as_mut() {
          opt.push(' ');
          opt.push_str(&text);
        }
      }
      McqField::Explanation => d.explanation.push(text),
      // Stray text after "Answer:" carries no structure we want.
      McqField::Answer => {}
    }
  }
  flush_mcq(&mut draft, &mut out);
  out
}

// --- True/False ---

#[derive(Clone, Copy, PartialEq)]
enum TfField {
  Prompt,
  Answer,
  Explanation,
}

#[derive(Default)]
struct TfDraft {
  prompt: Vec<String>,
  answer: Option<String>,
  explanation: Vec<String>,
}

impl TfDraft {
  fn finish(self) -> Option<Question> {
    let prompt = self.prompt.join(" ").trim().to_string();
    if prompt.is_empty() {
      return None;
    }
    let answer = self.answer?;
    Some(Question {
      kind: ArtifactKind::TrueFalse,
      prompt,
      options: vec!["True".into(), "False".into()],
      answer,
      explanation: self.explanation.join(" ").trim().to_string(),
    })
  }
}

/// Normalize an answer token to "True"/"False"; anything else is invalid.
fn normalize_bool_token(token: &str) -> Option<String> {
  match token.trim().to_ascii_lowercase().as_str() {
    "true" => Some("True".into()),
    "false" => Some("False".into()),
    _ => None,
  }
}

fn flush_tf(d: &mut Option<(TfDraft, TfField)>, out: &mut Vec<Question>) {
  if let Some((draft, _)) = d.take() {
    if let Some(q) = draft.finish() {
      out.push(q);
    }
  }
}

/// Parse true/false items: `Q:` statement, `Answer:` True|False,
/// optional `Explanation:`.
pub fn parse_true_false(raw: &str) -> Vec<Question> {
  let mut out = Vec::new();
  let mut draft: Option<(TfDraft, TfField)> = None;

  for line in raw.lines() {
    if is_separator(line) {
      flush_tf(&mut draft, &mut out);
      continue;
    }
    if let Some(rest) = strip_prefix_ci(line, "Q:") {
      flush_tf(&mut draft, &mut out);
      let mut d = TfDraft::default();
      if !rest.trim().is_empty() {
        d.prompt.push(rest.trim().to_string());
      }
      draft = Some((d, TfField::Prompt));
      continue;
    }
    let Some((d, field)) = draft.as_mut() else { continue };
    if line.trim().is_empty() {
      continue;
    }
    if let Some(rest) = strip_prefix_ci(line, "Answer:") {
      d.answer = normalize_bool_token(rest);
      *field = TfField::Answer;
      continue;
    }
    if let Some(rest) = strip_prefix_ci(line, "Explanation:") {
      if !rest.trim().is_empty() {
        d.explanation.push(rest.trim().to_string());
      }
      *field = TfField::Explanation;
      continue;
    }
    let text = line.trim().to_string();
    match *field {
      TfField::Prompt => d.prompt.push(text),
      TfField::Explanation => d.explanation.push(text),
      TfField::Answer => {}
    }
  }
  flush_tf(&mut draft, &mut out);
  out
}

// --- Short answer ---

#[derive(Clone, Copy, PartialEq)]
enum SaField {
  Prompt,
  Answer,
  Explanation,
}

#[derive(Default)]
struct SaDraft {
  prompt: Vec<String>,
  answer: Option<Vec<String>>,
  explanation: Vec<String>,
}

impl SaDraft {
  fn finish(self) -> Option<Question> {
    let prompt = self.prompt.join(" ").trim().to_string();
    if prompt.is_empty() {
      return None;
    }
    let answer = self.answer?.join("\n").trim().to_string();
    if answer.is_empty() {
      return None;
    }
    Some(Question {
      kind: ArtifactKind::ShortAnswer,
      prompt,
      options: Vec::new(),
      answer,
      explanation: self.explanation.join(" ").trim().to_string(),
    })
  }
}

fn flush_sa(d: &mut Option<(SaDraft, SaField)>, out: &mut Vec<Question>) {
  if let Some((draft, _)) = d.take() {
    if let Some(q) = draft.finish() {
      out.push(q);
    }
  }
}

/// Parse short-answer items: `Q:` question, `Answer:` free text (may span
/// lines), optional `Explanation:`. Options are always empty.
pub fn parse_short_answer(raw: &str) -> Vec<Question> {
  let mut out = Vec::new();
  let mut draft: Option<(SaDraft, SaField)> = None;

  for line in raw.lines() {
    if is_separator(line) {
      flush_sa(&mut draft, &mut out);
      continue;
    }
    if let Some(rest) = strip_prefix_ci(line, "Q:") {
      flush_sa(&mut draft, &mut out);
      let mut d = SaDraft::default();
      if !rest.trim().is_empty() {
        d.prompt.push(rest.trim().to_string());
      }
      draft = Some((d, SaField::Prompt));
      continue;
    }
    let Some((d, field)) = draft.as_mut() else { continue };
    if line.trim().is_empty() {
      continue;
    }
    if let Some(rest) = strip_prefix_ci(line, "Answer:") {
      let mut lines = Vec::new();
      if !rest.trim().is_empty() {
        lines.push(rest.trim().to_string());
      }
      d.answer = Some(lines);
      *field = SaField::Answer;
      continue;
    }
    if let Some(rest) = strip_prefix_ci(line, "Explanation:") {
      if !rest.trim().is_empty() {
        d.explanation.push(rest.trim().to_string());
      }
      *field = SaField::Explanation;
      continue;
    }
    let text = line.trim().to_string();
    match *field {
      SaField::Prompt => d.prompt.push(text),
      SaField::Answer => {
        if let Some(lines) = d.answer.as_mut() {
          lines.push(text);
        }
      }
      SaField::Explanation => d.explanation.push(text),
    }
  }
  flush_sa(&mut draft, &mut out);
  out
}

// --- Flashcards ---

enum FcField {
  Front,
  Back,
}

fn flush_card(front: &mut Vec<String>, back: &mut Option<Vec<String>>, out: &mut Vec<Flashcard>) {
  let f = front.join("\n").trim().to_string();
  let b = back.take().map(|b| b.join("\n").trim().to_string()).unwrap_or_default();
  if !f.is_empty() && !b.is_empty() {
    out.push(Flashcard { front: f, back: b });
  }
  front.clear();
}

/// Parse flashcards: `Q:` front, `A:` back, one pair per card, terminated by
/// the next `Q:`, a separator line, or end of text. Both sides must be
/// non-empty after trimming.
pub fn parse_flashcards(raw: &str) -> Vec<Flashcard> {
  let mut out = Vec::new();
  let mut front: Vec<String> = Vec::new();
  let mut back: Option<Vec<String>> = None;
  let mut field = FcField::Front;
  let mut active = false;

  for line in raw.lines() {
    if is_separator(line) {
      if active {
        flush_card(&mut front, &mut back, &mut out);
        active = false;
      }
      continue;
    }
    if let Some(rest) = strip_prefix_ci(line, "Q:") {
      if active {
        flush_card(&mut front, &mut back, &mut out);
      }
      active = true;
      field = FcField::Front;
      if !rest.trim().is_empty() {
        front.push(rest.trim().to_string());
      }
      continue;
    }
    if !active {
      continue;
    }
    if let Some(rest) = strip_prefix_ci(line, "A:") {
      field = FcField::Back;
      let mut lines = Vec::new();
      if !rest.trim().is_empty() {
        lines.push(rest.trim().to_string());
      }
      back = Some(lines);
      continue;
    }
    if line.trim().is_empty() {
      continue;
    }
    let text = line.trim().to_string();
    match field {
      FcField::Front => front.push(text),
      FcField::Back => {
        if let Some(lines) = back.as_mut() {
          lines.push(text);
        }
      }
    }
  }
  if active {
    flush_card(&mut front, &mut back, &mut out);
  }
  out
}

/// Parse a summary response: the whole trimmed text. Callers treat an empty
/// result as a failed attempt.
pub fn parse_summary(raw: &str) -> Option<String> {
  let t = raw.trim();
  if t.is_empty() {
    None
  } else {
    Some(t.to_string())
  }
}
