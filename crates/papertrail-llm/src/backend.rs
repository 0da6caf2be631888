//! LLM backend trait and the local Ollama implementation.
//!
//! The review agent sizes the context window per request, so `infer`
//! takes `num_ctx` alongside the prompt.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

use papertrail_config::LlmSettings;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("API error [{status}]: {message}")]
    ApiError { status: u16, message: String },
}

// ── Trait ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Complete `prompt` with a context window of `num_ctx` tokens.
    async fn infer(&self, prompt: &str, num_ctx: usize) -> Result<String, LlmError>;
    fn model_id(&self) -> &str;
    fn max_context_tokens(&self) -> usize;
}

async fn check_response_status(resp: reqwest::Response) -> Result<serde_json::Value, LlmError> {
    let status = resp.status().as_u16();
    let bytes = resp.bytes().await?;
    decode_body(status, &bytes)
}

fn decode_body(status: u16, bytes: &[u8]) -> Result<serde_json::Value, LlmError> {
    let body: serde_json::Value = serde_json::from_slice(bytes)?;
    if status >= 400 {
        // Ollama reports `{"error": "..."}`, OpenAI-style servers nest it.
        let msg = body["error"]
            .as_str()
            .or_else(|| body["error"]["message"].as_str())
            .unwrap_or("unknown API error")
            .to_string();
        return Err(LlmError::ApiError { status, message: msg });
    }
    Ok(body)
}

// ── Ollama (local) ────────────────────────────────────────────────────────────

pub struct OllamaBackend {
    pub base_url: String,
    pub model: String,
    temperature: f32,
    max_ctx: usize,
    client: reqwest::Client,
}

impl OllamaBackend {
    pub fn new(settings: &LlmSettings) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_ctx: settings.num_ctx,
            client,
        })
    }

    fn generate_body(&self, prompt: &str, num_ctx: usize) -> serde_json::Value {
        serde_json::json!({
            "model":  &self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_ctx":     num_ctx,
                "top_k":       20,
            },
        })
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn infer(&self, prompt: &str, num_ctx: usize) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = self.generate_body(prompt, num_ctx.min(self.max_ctx));
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Unavailable(format!("Ollama not reachable at {url}: {e}")))?;
        let json = check_response_status(resp).await?;
        let answer = parse_generate_response(&json)?;
        debug!(answer_len = answer.len(), "Generation complete");
        Ok(answer)
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn max_context_tokens(&self) -> usize {
        self.max_ctx
    }
}

fn parse_generate_response(json: &serde_json::Value) -> Result<String, LlmError> {
    json["response"]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| LlmError::Unavailable("missing 'response' in generate output".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> OllamaBackend {
        OllamaBackend::new(&LlmSettings::default()).unwrap()
    }

    #[test]
    fn test_generate_body_carries_sampling_options() {
        let body = backend().generate_body("What is a CNN?", 2048);
        assert_eq!(body["model"], "llama3:8b");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_ctx"], 2048);
        assert_eq!(body["options"]["top_k"], 20);
        assert!((body["options"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_parse_generate_response() {
        let json = serde_json::json!({"model": "llama3:8b", "response": "  An answer. ", "done": true});
        assert_eq!(parse_generate_response(&json).unwrap(), "An answer.");
        assert!(parse_generate_response(&serde_json::json!({"done": true})).is_err());
    }

    #[test]
    fn test_decode_body_reports_api_errors() {
        let err = decode_body(404, br#"{"error": "model 'llama3:8b' not found"}"#).unwrap_err();
        assert!(matches!(err, LlmError::ApiError { status: 404, ref message } if message.contains("not found")));

        let err = decode_body(500, br#"{"error": {"message": "overloaded"}}"#).unwrap_err();
        assert!(matches!(err, LlmError::ApiError { status: 500, ref message } if message == "overloaded"));
    }

    #[test]
    fn test_decode_body_rejects_non_json() {
        let err = decode_body(502, b"<html>Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, LlmError::Serde(_)));
        assert_eq!(decode_body(200, br#"{"response": "ok"}"#).unwrap()["response"], "ok");
    }

    #[test]
    fn test_base_url_trailing_slash_is_dropped() {
        let settings = LlmSettings { base_url: "http://localhost:11434/".to_string(), ..Default::default() };
        assert_eq!(OllamaBackend::new(&settings).unwrap().base_url, "http://localhost:11434");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        let settings = LlmSettings {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            ..Default::default()
        };
        let backend = OllamaBackend::new(&settings).unwrap();
        let err = backend.infer("hello", 512).await.unwrap_err();
        assert!(matches!(err, LlmError::Unavailable(_)));
    }
}
