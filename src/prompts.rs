//! Prompt assembly: turns a template from [`crate::config::Prompts`] plus the
//! budgeted source text into the final instruction string.
//!
//! Builders are pure functions of their inputs. The same request always
//! produces the same prompt, and retries reuse the prompt verbatim.

use crate::config::Prompts;
use crate::domain::{ArtifactKind, DetailLevel, GradingItem};
use crate::util::fill_template;

/// Build the instruction prompt for an item-producing kind (not summary).
pub fn build_items_prompt(prompts: &Prompts, kind: ArtifactKind, source: &str, n: usize) -> String {
  let tpl = match kind {
    ArtifactKind::Mcq => &prompts.mcq_template,
    ArtifactKind::TrueFalse => &prompts.true_false_template,
    ArtifactKind::ShortAnswer => &prompts.short_answer_template,
    ArtifactKind::Flashcard => &prompts.flashcard_template,
    ArtifactKind::Summary => unreachable!("summary prompts are built by build_summary_prompt"),
  };
  fill_template(tpl, &[("source", source), ("n", &n.to_string())])
}

/// Build the summary prompt for the requested detail level.
pub fn build_summary_prompt(prompts: &Prompts, source: &str, detail: DetailLevel) -> String {
  let shape = match detail {
    DetailLevel::Brief => "- 3-5 bullet points with the key ideas only.",
    DetailLevel::Standard => {
      "- 1-2 short paragraphs giving the big picture.\n- Then 3-6 bullet points with key ideas or facts."
    }
    DetailLevel::Detailed => {
      "- 2-4 paragraphs covering each major section.\n- Then 6-10 bullet points with key ideas, facts, and definitions."
    }
  };
  fill_template(
    &prompts.summary_template,
    &[("source", source), ("detail", detail.as_str()), ("shape", shape)],
  )
}

/// Build one batched grading prompt listing every short-answer item.
pub fn build_grading_prompt(prompts: &Prompts, items: &[GradingItem]) -> String {
  let mut listing = String::new();
  for it in items {
    listing.push_str(&format!(
      "Item {id}:\nQuestion: {q}\nExpected answer: {exp}\nStudent answer: {ans}\n\n",
      id = it.id,
      q = it.prompt,
      exp = it.correct_answer,
      ans = it.user_answer,
    ));
  }
  fill_template(&prompts.grading_template, &[("items", listing.trim_end())])
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Prompts;

  #[test]
  fn items_prompt_embeds_source_and_count() {
    let p = Prompts::default();
    let out = build_items_prompt(&p, ArtifactKind::Mcq, "SOURCE-HERE", 7);
    assert!(out.contains("SOURCE-HERE"));
    assert!(out.contains("exactly 7 MCQs"));
    assert!(!out.contains("{source}"));
    assert!(!out.contains("{n}"));
  }

  #[test]
  fn items_prompt_is_deterministic() {
    let p = Prompts::default();
    let a = build_items_prompt(&p, ArtifactKind::Flashcard, "abc", 3);
    let b = build_items_prompt(&p, ArtifactKind::Flashcard, "abc", 3);
    assert_eq!(a, b);
  }

  #[test]
  fn summary_prompt_varies_by_detail() {
    let p = Prompts::default();
    let brief = build_summary_prompt(&p, "abc", DetailLevel::Brief);
    let detailed = build_summary_prompt(&p, "abc", DetailLevel::Detailed);
    assert_ne!(brief, detailed);
    assert!(brief.contains("brief"));
  }

  #[test]
  fn grading_prompt_lists_every_item() {
    let p = Prompts::default();
    let items = vec![
      GradingItem {
        id: 5,
        prompt: "What is mitosis?".into(),
        correct_answer: "Cell division".into(),
        user_answer: "cells splitting".into(),
      },
      GradingItem {
        id: 6,
        prompt: "Define osmosis".into(),
        correct_answer: "Diffusion of water".into(),
        user_answer: "no idea".into(),
      },
    ];
    let out = build_grading_prompt(&p, &items);
    assert!(out.contains("Item 5:"));
    assert!(out.contains("Item 6:"));
    assert!(out.contains("Student answer: no idea"));
    assert!(out.contains("JSON object"));
  }
}
