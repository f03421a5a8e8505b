//! HTTP endpoint handlers. Thin wrappers that enforce request preconditions
//! and forward to the generation pipeline.
//!
//! The insufficient-input check happens here, before the pipeline runs, so
//! callers can tell "empty because the source was too thin" (400) apart from
//! "empty because generation failed" (502).

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::budget::{has_sufficient_source, normalize_source, MIN_SOURCE_WORDS};
use crate::protocol::*;
use crate::state::AppState;

fn bad_request(msg: &str) -> (StatusCode, Json<ErrorOut>) {
  (StatusCode::BAD_REQUEST, Json(ErrorOut { error: msg.into() }))
}

fn generation_failed(msg: &str) -> (StatusCode, Json<ErrorOut>) {
  (StatusCode::BAD_GATEWAY, Json(ErrorOut { error: msg.into() }))
}

/// Shared precondition: enough words to generate from.
fn check_source(source_text: &str) -> Result<(), (StatusCode, Json<ErrorOut>)> {
  if !has_sufficient_source(&normalize_source(source_text)) {
    return Err(bad_request(&format!(
      "not enough text to generate from (need at least {} words)",
      MIN_SOURCE_WORDS
    )));
  }
  Ok(())
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, provider: state.generator.provider_name() })
}

#[instrument(level = "info", skip(state, body),
             fields(source_len = body.source_text.len(), n_mcq = body.n_mcq,
                    n_tf = body.n_true_false, n_sa = body.n_short_answer))]
pub async fn http_quiz_generate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<QuizGenerateIn>,
) -> impl IntoResponse {
  if body.n_mcq + body.n_true_false + body.n_short_answer == 0 {
    return bad_request("requested zero questions").into_response();
  }
  if let Err(e) = check_source(&body.source_text) {
    return e.into_response();
  }

  let g = &state.generator;
  let mut questions = Vec::new();
  if body.n_mcq > 0 {
    questions.extend(g.generate_mcqs(&body.source_text, body.n_mcq).await);
  }
  if body.n_true_false > 0 {
    questions.extend(g.generate_true_false(&body.source_text, body.n_true_false).await);
  }
  if body.n_short_answer > 0 {
    questions.extend(g.generate_short_answer(&body.source_text, body.n_short_answer).await);
  }

  if questions.is_empty() {
    warn!(target: "generate", "Quiz generation produced no questions");
    return generation_failed("failed to generate any questions").into_response();
  }

  let generation_id = Uuid::new_v4().to_string();
  let count = questions.len();
  info!(target: "generate", %generation_id, count, "Quiz generated");
  Json(QuizGenerateOut { generation_id, questions, count }).into_response()
}

#[instrument(level = "info", skip(state, body), fields(batch = body.items.len()))]
pub async fn http_quiz_grade(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GradeIn>,
) -> impl IntoResponse {
  let verdicts = state.generator.grade_short_answers(&body.items).await;
  Json(GradeOut { verdicts })
}

#[instrument(level = "info", skip(state, body), fields(source_len = body.source_text.len(), n = body.n))]
pub async fn http_flashcards_generate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<FlashcardsIn>,
) -> impl IntoResponse {
  if body.n == 0 {
    return bad_request("requested zero flashcards").into_response();
  }
  if let Err(e) = check_source(&body.source_text) {
    return e.into_response();
  }

  let cards = state.generator.generate_flashcards(&body.source_text, body.n).await;
  if cards.is_empty() {
    warn!(target: "generate", "Flashcard generation produced no cards");
    return generation_failed("no valid flashcards parsed from model output").into_response();
  }

  let generation_id = Uuid::new_v4().to_string();
  let count = cards.len();
  info!(target: "generate", %generation_id, count, "Flashcards generated");
  Json(FlashcardsOut { generation_id, cards, count }).into_response()
}

#[instrument(level = "info", skip(state, body),
             fields(source_len = body.source_text.len(), detail = body.detail_level.as_str()))]
pub async fn http_summary_generate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SummaryIn>,
) -> impl IntoResponse {
  if let Err(e) = check_source(&body.source_text) {
    return e.into_response();
  }

  let summary = state.generator.generate_summary(&body.source_text, body.detail_level).await;
  if summary.is_empty() {
    warn!(target: "generate", "Summary generation produced no text");
    return generation_failed("failed to generate a summary").into_response();
  }

  let generation_id = Uuid::new_v4().to_string();
  info!(target: "generate", %generation_id, summary_len = summary.len(), "Summary generated");
  Json(SummaryOut { generation_id, summary }).into_response()
}
