use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use serde_json::{Value, json};
use tokio::time::Duration;

/// Thin client for a local Ollama server. All model calls in the runtime
/// (embedding, extraction, answer drafting) go through here, so the
/// connect and request timeouts in one place bound every network call.
pub struct OllamaClient {
    http: Client,
    base: String,
}

impl OllamaClient {
    pub fn new(base: String, request_timeout: Duration) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(request_timeout)
            .build()
            .expect("client");
        Self {
            http,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// Embed a single input via `/api/embed`.
    pub async fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>> {
        let body = json!({ "model": model, "input": input });
        let response = self
            .http
            .post(format!("{}/api/embed", self.base))
            .json(&body)
            .send()
            .await
            .context("embed request failed")?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .context("embed response is not JSON")?;
        if !status.is_success() {
            return Err(anyhow!("embed request returned {status}: {payload}"));
        }

        let vector = payload
            .get("embeddings")
            .and_then(Value::as_array)
            .and_then(|rows| rows.first())
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("embedding missing from response"))?
            .iter()
            .map(|component| component.as_f64().unwrap_or(0.0) as f32)
            .collect();
        Ok(vector)
    }

    /// Non-streaming text generation via `/api/generate`.
    pub async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let body = json!({ "model": model, "prompt": prompt, "stream": false });
        let response = self
            .http
            .post(format!("{}/api/generate", self.base))
            .json(&body)
            .send()
            .await
            .context("generate request failed")?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .context("generate response is not JSON")?;
        if !status.is_success() {
            return Err(anyhow!("generate request returned {status}: {payload}"));
        }

        payload
            .get("response")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("response text missing"))
    }
}
