//! Domain models for generated study artifacts: questions, flashcards,
//! summaries, and the short-answer grading inputs.
//!
//! Everything here is transient. Items are built per request, handed to the
//! caller (route layer / persistence collaborator) and dropped afterwards.

use serde::{Deserialize, Serialize};

/// Which structural kind of study content is being generated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
  Mcq,
  TrueFalse,
  ShortAnswer,
  Flashcard,
  Summary,
}

impl ArtifactKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ArtifactKind::Mcq => "mcq",
      ArtifactKind::TrueFalse => "true_false",
      ArtifactKind::ShortAnswer => "short_answer",
      ArtifactKind::Flashcard => "flashcard",
      ArtifactKind::Summary => "summary",
    }
  }
}

/// A single quiz question. The shape is shared by all three question kinds:
///   - Mcq: exactly 4 options, `answer` equals one of them
///   - TrueFalse: options fixed to ["True", "False"], `answer` one of those
///   - ShortAnswer: options empty, `answer` is the free-text model answer
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Question {
  pub kind: ArtifactKind,
  pub prompt: String,
  pub options: Vec<String>,
  pub answer: String,
  /// May be empty; the model does not always produce one.
  #[serde(default)]
  pub explanation: String,
}

/// One flashcard: front (question side) and back (answer side).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Flashcard {
  pub front: String,
  pub back: String,
}

/// How much detail the generated summary should carry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailLevel {
  Brief,
  #[default]
  Standard,
  Detailed,
}

impl DetailLevel {
  pub fn as_str(&self) -> &'static str {
    match self {
      DetailLevel::Brief => "brief",
      DetailLevel::Standard => "standard",
      DetailLevel::Detailed => "detailed",
    }
  }
}

/// One short-answer response queued for LLM grading.
#[derive(Clone, Debug, Deserialize)]
pub struct GradingItem {
  pub id: i64,
  pub prompt: String,
  pub correct_answer: String,
  pub user_answer: String,
}
