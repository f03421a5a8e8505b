//! Studygen · Study-Assistant Generation Backend
//!
//! - Axum HTTP API turning extracted document text into quizzes, flashcards,
//!   and summaries via an LLM completion provider
//! - Ollama (local) or OpenRouter (hosted) backend, selected at startup
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   LLM_PROVIDER        : "ollama" (default) or "openrouter"
//!   OLLAMA_URL          : default "http://localhost:11434"
//!   OLLAMA_MODEL        : default "llama3.2:1b"
//!   OPENROUTER_API_KEY  : required when LLM_PROVIDER=openrouter
//!   OPENROUTER_MODEL    : default "qwen/qwen-2.5-72b-instruct"
//!   PROMPTS_CONFIG_PATH : path to TOML prompt overrides
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod budget;
mod prompts;
mod llm;
mod parse;
mod retry;
mod grading;
mod generate;
mod state;
mod protocol;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build shared application state (provider, prompts, generation pipeline).
  let state = Arc::new(AppState::new()?);

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "studygen_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
