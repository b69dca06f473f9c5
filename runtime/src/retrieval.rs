use std::{collections::HashSet, sync::Arc};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{embeddings::EmbeddingProvider, error::RetrievalError, graph::EntityGraph, vector};

/// Prior score carried by chunks pulled in through entity co-mention.
pub const EXPANSION_PRIOR: f32 = 0.15;
/// Rerank weight on direct query similarity.
pub const RERANK_VECTOR_WEIGHT: f32 = 0.85;
/// Rerank weight on the score a candidate carried into the rerank stage.
pub const RERANK_PRIOR_WEIGHT: f32 = 0.15;

/// One scored piece of evidence. Constructed fresh per query.
#[derive(Debug, Clone, Serialize)]
pub struct Hit {
    pub chunk_id: String,
    pub text: String,
    pub score: f32,
}

/// Three-stage retrieval over the entity graph: vector similarity search,
/// entity co-mention expansion, hybrid rerank.
///
/// Each retrieve call holds the graph read lock for its whole duration, so
/// it always sees one consistent graph state; ingestion writers queue up
/// behind in-flight retrievals.
pub struct Retriever {
    graph: Arc<RwLock<EntityGraph>>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    pub fn new(graph: Arc<RwLock<EntityGraph>>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { graph, embedder }
    }

    /// Return up to `2 * k` scored chunks for the query, best first.
    ///
    /// Never fails for "no results" — an empty corpus, an unembeddable
    /// query, or a query with no semantic overlap all yield `Ok(vec![])`.
    /// The only error is a dimension mismatch between compared vectors,
    /// which means the corpus and query were embedded with different
    /// models and the caller must re-embed upstream.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        expand_per_entity: usize,
    ) -> Result<Vec<Hit>, RetrievalError> {
        let query_embedding = self.embedder.embed(query).await;
        let graph = self.graph.read().await;

        // Stage 1: vector similarity search over embedded chunks. Scores
        // <= 0 are discarded as unrelated or anti-correlated, not merely
        // truncated away.
        let mut seeds = Vec::new();
        for chunk in graph.chunks() {
            let Some(embedding) = chunk.embedding.as_deref() else {
                debug!(chunk_id = %chunk.id, "skipping chunk without embedding");
                continue;
            };
            let similarity = if query_embedding.is_empty() {
                0.0
            } else {
                vector::cosine(&query_embedding, embedding)?
            };
            if similarity > 0.0 {
                seeds.push(Hit {
                    chunk_id: chunk.id.clone(),
                    text: chunk.text.clone(),
                    score: similarity,
                });
            }
        }

        if seeds.is_empty() {
            debug!("no chunk cleared the similarity filter");
            return Ok(Vec::new());
        }

        sort_hits(&mut seeds);
        seeds.truncate(k);

        // Stage 2: pull in chunks that share an entity with a seed. The
        // merge set is keyed by chunk id and first write wins: a seed is
        // never downgraded to the exploratory prior, and a chunk reached
        // through two entities is added once. Fan-out from high-degree
        // entities is bounded per (seed, entity) pair.
        let mut candidates = seeds.clone();
        let mut seen: HashSet<String> = seeds.iter().map(|hit| hit.chunk_id.clone()).collect();
        for seed in &seeds {
            for entity in graph.entities_mentioned_in(&seed.chunk_id) {
                let mut added = 0usize;
                for other in graph.chunks_mentioning(&entity.name) {
                    if added >= expand_per_entity {
                        break;
                    }
                    if other.id == seed.chunk_id || seen.contains(&other.id) {
                        continue;
                    }
                    seen.insert(other.id.clone());
                    candidates.push(Hit {
                        chunk_id: other.id.clone(),
                        text: other.text.clone(),
                        score: EXPANSION_PRIOR,
                    });
                    added += 1;
                }
            }
        }

        // Stage 3: hybrid rerank. Direct similarity dominates; the score a
        // candidate carried into this stage only contributes 15%. No
        // positivity filter here: an expansion candidate with zero or
        // negative similarity may still surface.
        let mut reranked = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let vec_score = match graph
                .chunk_by_id(&candidate.chunk_id)
                .and_then(|chunk| chunk.embedding.as_deref())
            {
                Some(embedding) if !query_embedding.is_empty() => {
                    vector::cosine(&query_embedding, embedding)?
                }
                _ => 0.0,
            };
            let score = RERANK_VECTOR_WEIGHT * vec_score + RERANK_PRIOR_WEIGHT * candidate.score;
            reranked.push(Hit { score, ..candidate });
        }

        sort_hits(&mut reranked);
        reranked.truncate(2 * k);
        Ok(reranked)
    }
}

/// Descending by score, ties broken by ascending chunk id so results are
/// stable across calls and graph insertion orders.
fn sort_hits(hits: &mut [Hit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
}
