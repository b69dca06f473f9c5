use async_trait::async_trait;

pub mod ollama;
pub mod tfidf;

pub use ollama::OllamaEmbedder;
pub use tfidf::TfIdfEmbedder;

/// Maps text to a fixed-dimension vector. An empty vector signals
/// failure; providers log and degrade instead of erroring so retrieval
/// can fail soft (graph expansion still works without a query vector).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Vec<f32>;
}
