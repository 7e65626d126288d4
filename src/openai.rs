use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::env;

/// Per-call knobs for a chat completion. Each endpoint keeps its own
/// fixed set of these.
#[derive(Clone, Copy, Debug)]
pub struct ChatOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the upstream for a strict JSON object response.
    pub json_response: bool,
}

/// Chat-completion client for an OpenAI-compatible endpoint.
///
/// Built once at startup and cloned into the router state; `reqwest::Client`
/// is internally reference-counted so clones share one connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl Client {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    /// Reads `OPENAI_API_KEY`, `OPENAI_BASE_URL`, and `OPENAI_MODEL`.
    /// A missing key is not fatal here; the upstream rejects each call
    /// instead.
    pub fn from_env() -> Self {
        let api_key = env::var("OPENAI_API_KEY").unwrap_or_default();
        if api_key.is_empty() {
            tracing::warn!("OPENAI_API_KEY is not set; completion calls will fail upstream");
        }
        let base_url = env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let model = env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string());
        Self::new(api_key, base_url, model)
    }

    /// Sends one system+user message pair and returns the assistant's text.
    /// Exactly one call per incoming request: no retries, no streaming.
    pub async fn chat(&self, system: &str, user: &str, opts: ChatOptions) -> Result<String> {
        let mut body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "temperature": opts.temperature,
            "max_tokens": opts.max_tokens,
            "stream": false
        });
        if opts.json_response {
            body["response_format"] = json!({"type": "json_object"});
        }

        let url = format!("{}/chat/completions", self.base_url);
        let res = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("chat completion call failed (HTTP)")?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            anyhow::bail!("chat completion API error: {} - {}", status, text);
        }

        let v: Value = res.json().await.context("failed to deserialize completion JSON")?;
        Ok(message_content(&v))
    }
}

fn message_content(v: &Value) -> String {
    v["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or("")
        .to_string()
}
