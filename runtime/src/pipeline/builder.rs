use std::{collections::BTreeSet, sync::Arc};

use anyhow::Result;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{
    embeddings::EmbeddingProvider,
    graph::EntityGraph,
    pipeline::{
        extractor::{EntityExtractor, ExtractionOutcome},
        utils::compute_hash_id,
        wikidata::WikidataMatcher,
    },
};

const PREPARE_CONCURRENCY: usize = 8;
/// Mentions are weighted uniformly; per-mention weighting is a data-model
/// affordance, not something ranking consumes today.
pub const MENTION_WEIGHT: f64 = 1.0;

#[derive(Debug, Default, Clone, Serialize)]
pub struct IngestStats {
    pub doc_id: String,
    pub chunks: usize,
    pub embedded_chunks: usize,
    pub entities: usize,
    pub relations: usize,
}

struct PreparedChunk {
    id: String,
    text: String,
    order: usize,
    embedding: Vec<f32>,
    extraction: ExtractionOutcome,
}

/// Turns chunked text into graph state: chunk nodes with embeddings,
/// entities deduplicated by name, mentions edges, and relation edges.
///
/// Embedding and extraction fan out concurrently per chunk; the graph
/// write lock is taken once, after all network work is done.
pub struct GraphBuilder {
    embedder: Arc<dyn EmbeddingProvider>,
    extractor: Arc<dyn EntityExtractor>,
    matcher: Option<Arc<WikidataMatcher>>,
}

impl GraphBuilder {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, extractor: Arc<dyn EntityExtractor>) -> Self {
        Self {
            embedder,
            extractor,
            matcher: None,
        }
    }

    /// Enable knowledge-base enrichment of newly created entities.
    pub fn with_enrichment(mut self, matcher: Arc<WikidataMatcher>) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub async fn ingest(
        &self,
        graph: &RwLock<EntityGraph>,
        doc_id: &str,
        pieces: Vec<String>,
    ) -> Result<IngestStats> {
        let mut prepared: Vec<PreparedChunk> = stream::iter(pieces.into_iter().enumerate())
            .map(|(order, text)| {
                let embedder = Arc::clone(&self.embedder);
                let extractor = Arc::clone(&self.extractor);
                let doc = doc_id.to_string();
                async move {
                    let embedding = embedder.embed(&text).await;
                    let extraction = match extractor.extract(&text).await {
                        Ok(outcome) => outcome,
                        Err(err) => {
                            warn!(error = %err, doc_id = %doc, order, "entity extraction failed");
                            ExtractionOutcome::default()
                        }
                    };
                    PreparedChunk {
                        id: compute_hash_id(&text, "chunk-"),
                        text,
                        order,
                        embedding,
                        extraction,
                    }
                }
            })
            .buffer_unordered(PREPARE_CONCURRENCY)
            .collect()
            .await;
        prepared.sort_by_key(|chunk| chunk.order);

        let enrichment = self.enrich(&prepared).await;

        let mut stats = IngestStats {
            doc_id: doc_id.to_string(),
            ..Default::default()
        };

        let mut graph = graph.write().await;
        for chunk in &prepared {
            if chunk.embedding.is_empty() {
                warn!(chunk_id = %chunk.id, "chunk has no embedding, vector search will skip it");
            } else {
                stats.embedded_chunks += 1;
            }
            graph.add_chunk(&chunk.id, &chunk.text, chunk.embedding.clone());
            stats.chunks += 1;

            for entity in &chunk.extraction.entities {
                if graph.add_entity(&entity.name, &entity.entity_type) {
                    stats.entities += 1;
                    if let Some((_, external_id)) =
                        enrichment.iter().find(|(name, _)| name == &entity.name)
                    {
                        graph.set_entity_external_id(&entity.name, external_id);
                    }
                }
                graph.add_mention(&chunk.id, &entity.name, MENTION_WEIGHT);
            }

            for relation in &chunk.extraction.relations {
                if graph.add_relation(
                    &relation.source,
                    &relation.target,
                    &relation.relation_type,
                    false,
                ) {
                    stats.relations += 1;
                } else {
                    debug!(
                        source = %relation.source,
                        target = %relation.target,
                        "relation references unknown entity"
                    );
                }
            }
        }

        Ok(stats)
    }

    /// Resolve every distinct entity name in the batch, outside the graph
    /// lock. Lookups never fail hard; the fallback id still marks the
    /// entity as seen.
    async fn enrich(&self, prepared: &[PreparedChunk]) -> Vec<(String, String)> {
        let Some(matcher) = &self.matcher else {
            return Vec::new();
        };

        let names: BTreeSet<&str> = prepared
            .iter()
            .flat_map(|chunk| chunk.extraction.entities.iter())
            .map(|entity| entity.name.as_str())
            .collect();

        let mut resolved = Vec::with_capacity(names.len());
        for name in names {
            let matched = matcher.match_term(name).await;
            resolved.push((name.to_string(), matched.id));
        }
        resolved
    }
}
