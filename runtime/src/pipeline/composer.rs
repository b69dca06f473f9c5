use std::sync::Arc;

use tracing::warn;

use crate::{ai::OllamaClient, retrieval::Hit};

/// Evidence lines passed to the model are capped to keep prompts short.
const MAX_HITS: usize = 10;
const PREVIEW_CHARS: usize = 100;

/// Drafts a natural-language answer from ranked evidence. When the model
/// call fails the composer degrades to a plain evidence listing, so the
/// caller always gets something to show.
pub struct AnswerComposer {
    client: Arc<OllamaClient>,
    model: String,
}

impl AnswerComposer {
    pub fn new(client: Arc<OllamaClient>, model: String) -> Self {
        Self { client, model }
    }

    pub async fn compose(&self, query: &str, hits: &[Hit]) -> String {
        let evidence = format_evidence(hits);
        let prompt = format!("Question: {query}\n\nEvidence:\n{evidence}\nDraft Answer:");

        match self.client.generate(&self.model, &prompt).await {
            Ok(answer) => answer,
            Err(err) => {
                warn!(error = %err, "answer generation failed, falling back to evidence listing");
                format!("Based on the retrieved evidence:\n{evidence}")
            }
        }
    }
}

fn format_evidence(hits: &[Hit]) -> String {
    let mut out = String::with_capacity(hits.len() * 150);
    for hit in hits.iter().take(MAX_HITS) {
        out.push_str(&format!(
            "- [{}] {} (score={:.4})\n",
            hit.chunk_id,
            preview(&hit.text),
            hit.score
        ));
    }
    out
}

fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{truncated}...")
    }
}
