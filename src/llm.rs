//! Completion providers: the one narrow seam to the external text-generation
//! service.
//!
//! `complete(prompt, temperature, max_tokens) -> text` is all the pipeline
//! needs. Two backends are supported, mirroring the deployment options:
//!   - Ollama        : local server, `POST /api/generate`
//!   - OpenRouter    : hosted chat completions API
//!
//! The backend is chosen once at process construction from LLM_PROVIDER and
//! injected as a trait object; nothing looks providers up per call. Retries
//! live one layer up in the generation pipeline, not here.
//!
//! NOTE: We never log the API key and we log payload sizes, not contents.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

const HTTP_TIMEOUT: Duration = Duration::from_secs(300);

/// Capability interface for the external completion service.
/// Errors are transport/provider failures; the caller decides retry policy.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
  async fn complete(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String, String>;

  /// Short name for logs.
  fn name(&self) -> &'static str;
}

/// Build the provider selected by LLM_PROVIDER ("ollama" default,
/// "openrouter" when configured). Returns None when the chosen provider
/// cannot be constructed (e.g. missing OPENROUTER_API_KEY).
pub fn provider_from_env() -> Option<Box<dyn CompletionProvider>> {
  let choice = std::env::var("LLM_PROVIDER")
    .unwrap_or_else(|_| "ollama".into())
    .to_lowercase();
  match choice.as_str() {
    "openrouter" => OpenRouter::from_env().map(|p| Box::new(p) as Box<dyn CompletionProvider>),
    _ => Ollama::from_env().map(|p| Box::new(p) as Box<dyn CompletionProvider>),
  }
}

// --- Ollama ---

#[derive(Clone)]
pub struct Ollama {
  client: reqwest::Client,
  base_url: String,
  model: String,
}

impl Ollama {
  pub fn from_env() -> Option<Self> {
    let base_url = std::env::var("OLLAMA_URL").unwrap_or_else(|_| "http://localhost:11434".into());
    let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2:1b".into());
    let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build().ok()?;
    Some(Self { client, base_url, model })
  }
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
  model: &'a str,
  prompt: &'a str,
  stream: bool,
  options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
  temperature: f32,
  num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaResponse {
  #[serde(default)]
  response: String,
}

#[async_trait]
impl CompletionProvider for Ollama {
  #[instrument(level = "info", skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
  async fn complete(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String, String> {
    let url = format!("{}/api/generate", self.base_url);
    let req = OllamaRequest {
      model: &self.model,
      prompt,
      stream: false,
      options: OllamaOptions { temperature, num_predict: max_tokens },
    };

    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, "studygen-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(&req)
      .send()
      .await
      .map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      return Err(format!("Ollama HTTP {}: {}", status, body));
    }

    let body: OllamaResponse = res.json().await.map_err(|e| e.to_string())?;
    let text = body.response.trim().to_string();
    info!(target: "studygen_backend", response_len = text.len(), "Ollama completion received");
    Ok(text)
  }

  fn name(&self) -> &'static str {
    "ollama"
  }
}

// --- OpenRouter ---

#[derive(Clone)]
pub struct OpenRouter {
  client: reqwest::Client,
  api_key: String,
  base_url: String,
  model: String,
}

impl OpenRouter {
  /// Construct the client if OPENROUTER_API_KEY is set; otherwise None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENROUTER_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENROUTER_BASE_URL").unwrap_or_else(|_| "https://openrouter.ai/api/v1".into());
    let model =
      std::env::var("OPENROUTER_MODEL").unwrap_or_else(|_| "qwen/qwen-2.5-72b-instruct".into());
    let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build().ok()?;
    Some(Self { client, api_key, base_url, model })
  }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
  model: &'a str,
  messages: Vec<ChatMessageReq<'a>>,
  temperature: f32,
  max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessageReq<'a> {
  role: &'a str,
  content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)]
  usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice {
  message: ChatMessageResp,
}
#[derive(Deserialize)]
struct ChatMessageResp {
  content: Option<Value>,
}
#[derive(Deserialize)]
struct Usage {
  #[serde(default)]
  prompt_tokens: Option<u32>,
  #[serde(default)]
  completion_tokens: Option<u32>,
  #[serde(default)]
  total_tokens: Option<u32>,
}

/// Some providers return the message content as a list of typed parts
/// instead of a single string; flatten either shape to plain text.
fn flatten_content(v: &Value) -> String {
  match v {
    Value::String(s) => s.clone(),
    Value::Array(parts) => parts
      .iter()
      .map(|p| match p {
        Value::String(s) => s.clone(),
        Value::Object(o) => o.get("text").and_then(|t| t.as_str()).unwrap_or_default().to_string(),
        other => other.to_string(),
      })
      .collect::<Vec<_>>()
      .join(""),
    _ => String::new(),
  }
}

#[async_trait]
impl CompletionProvider for OpenRouter {
  #[instrument(level = "info", skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
  async fn complete(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String, String> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: &self.model,
      messages: vec![
        ChatMessageReq {
          role: "system",
          content: "You are a precise assistant used inside a study assistant app.",
        },
        ChatMessageReq { role: "user", content: prompt },
      ],
      temperature,
      max_tokens,
    };

    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, "studygen-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req)
      .send()
      .await
      .map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_provider_error(&body).unwrap_or(body);
      return Err(format!("OpenRouter HTTP {}: {}", status, msg));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage {
      info!(
        prompt_tokens = ?usage.prompt_tokens,
        completion_tokens = ?usage.completion_tokens,
        total_tokens = ?usage.total_tokens,
        "OpenRouter usage"
      );
    }
    let text = body
      .choices
      .first()
      .and_then(|c| c.message.content.as_ref())
      .map(flatten_content)
      .unwrap_or_default()
      .trim()
      .to_string();

    Ok(text)
  }

  fn name(&self) -> &'static str {
    "openrouter"
  }
}

/// Try to extract a clean error message from a provider error body.
fn extract_provider_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap {
    error: EObj,
  }
  #[derive(Deserialize)]
  struct EObj {
    message: String,
  }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn flatten_plain_string_content() {
    assert_eq!(flatten_content(&json!("hello")), "hello");
  }

  #[test]
  fn flatten_segmented_content() {
    let v = json!([{ "type": "text", "text": "Q: one" }, { "type": "text", "text": "\nA) two" }]);
    assert_eq!(flatten_content(&v), "Q: one\nA) two");
  }

  #[test]
  fn provider_error_extraction() {
    let body = r#"{"error": {"message": "model overloaded"}}"#;
    assert_eq!(extract_provider_error(body).as_deref(), Some("model overloaded"));
    assert_eq!(extract_provider_error("not json"), None);
  }
}
