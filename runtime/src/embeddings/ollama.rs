use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::EmbeddingProvider;
use crate::ai::OllamaClient;

/// Embedding provider backed by an Ollama embedding model.
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(client: Arc<OllamaClient>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Vec<f32> {
        match self.client.embed(&self.model, text).await {
            Ok(vector) => vector,
            Err(err) => {
                warn!(error = %err, model = %self.model, "embedding call failed");
                Vec::new()
            }
        }
    }
}
