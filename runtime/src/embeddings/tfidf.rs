use std::collections::HashMap;

use async_trait::async_trait;

use super::EmbeddingProvider;

/// Tiny tf-idf vectorizer fitted over a fixed corpus during ingestion.
/// A local, network-free stand-in for a real embedding model; the vector
/// dimension is the fitted vocabulary size.
#[derive(Default)]
pub struct TfIdfEmbedder {
    vocab_index: HashMap<String, usize>,
    document_frequency: HashMap<String, usize>,
    doc_count: usize,
}

impl TfIdfEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the vocabulary and document frequencies from the corpus.
    pub fn fit(&mut self, documents: &[String]) {
        self.doc_count = documents.len();
        for document in documents {
            let mut seen = std::collections::HashSet::new();
            for token in tokens(document) {
                let next_index = self.vocab_index.len();
                self.vocab_index.entry(token.clone()).or_insert(next_index);
                if seen.insert(token.clone()) {
                    *self.document_frequency.entry(token).or_insert(0) += 1;
                }
            }
        }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        if self.vocab_index.is_empty() {
            return Vec::new();
        }

        let mut term_frequency: HashMap<String, usize> = HashMap::new();
        let mut max_frequency = 0usize;
        for token in tokens(text) {
            let count = term_frequency.entry(token).or_insert(0);
            *count += 1;
            max_frequency = max_frequency.max(*count);
        }

        let mut vector = vec![0f32; self.vocab_index.len()];
        for (token, frequency) in term_frequency {
            let Some(&index) = self.vocab_index.get(&token) else {
                continue;
            };
            let document_frequency = self.document_frequency.get(&token).copied().unwrap_or(1);
            let idf = ((1.0 + self.doc_count as f64) / (1.0 + document_frequency as f64)).ln() + 1.0;
            let tf = 0.5 + 0.5 * (frequency as f64 / max_frequency.max(1) as f64);
            vector[index] = (tf * idf) as f32;
        }

        normalize(vector)
    }
}

#[async_trait]
impl EmbeddingProvider for TfIdfEmbedder {
    async fn embed(&self, text: &str) -> Vec<f32> {
        self.vectorize(text)
    }
}

/// Lowercased word tokens: a leading letter followed by at least one more
/// letter, digit, or underscore.
fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|token| {
            token.len() >= 2
                && token
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_alphabetic())
        })
        .map(str::to_string)
        .collect()
}

fn normalize(vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|v| f64::from(*v).powi(2)).sum::<f64>().sqrt();
    if norm == 0.0 {
        return vector;
    }
    vector
        .into_iter()
        .map(|component| (f64::from(component) / norm) as f32)
        .collect()
}
