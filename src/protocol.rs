//! Public request/response structs for the HTTP endpoints (serde ready).
//! Keep this small and stable so backend and clients evolve independently.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{DetailLevel, Flashcard, GradingItem, Question};

fn default_n_mcq() -> usize {
  5
}

/// POST /api/v1/quiz/generate
/// Callers pass extracted document text; extraction and storage live in
/// other services.
#[derive(Debug, Deserialize)]
pub struct QuizGenerateIn {
  pub source_text: String,
  #[serde(default = "default_n_mcq")]
  pub n_mcq: usize,
  #[serde(default)]
  pub n_true_false: usize,
  #[serde(default)]
  pub n_short_answer: usize,
}

#[derive(Serialize)]
pub struct QuizGenerateOut {
  pub generation_id: String,
  pub questions: Vec<Question>,
  pub count: usize,
}

/// POST /api/v1/quiz/grade
#[derive(Debug, Deserialize)]
pub struct GradeIn {
  pub items: Vec<GradingItem>,
}

#[derive(Serialize)]
pub struct GradeOut {
  pub verdicts: HashMap<i64, bool>,
}

/// POST /api/v1/flashcards/generate
#[derive(Debug, Deserialize)]
pub struct FlashcardsIn {
  pub source_text: String,
  #[serde(default = "default_n_flashcards")]
  pub n: usize,
}

fn default_n_flashcards() -> usize {
  12
}

#[derive(Serialize)]
pub struct FlashcardsOut {
  pub generation_id: String,
  pub cards: Vec<Flashcard>,
  pub count: usize,
}

/// POST /api/v1/summary/generate
#[derive(Debug, Deserialize)]
pub struct SummaryIn {
  pub source_text: String,
  #[serde(default)]
  pub detail_level: DetailLevel,
}

#[derive(Serialize)]
pub struct SummaryOut {
  pub generation_id: String,
  pub summary: String,
}

#[derive(Serialize)]
pub struct ErrorOut {
  pub error: String,
}

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
  pub provider: &'static str,
}
