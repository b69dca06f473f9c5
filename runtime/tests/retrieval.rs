use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use graphrag_runtime::{
    embeddings::EmbeddingProvider,
    error::RetrievalError,
    graph::EntityGraph,
    retrieval::{Hit, Retriever},
};

/// Deterministic in-memory embedder: texts it has never seen embed to the
/// empty vector, the provider-failure signal.
struct StaticEmbedder {
    vectors: HashMap<String, Vec<f32>>,
}

impl StaticEmbedder {
    fn new(entries: &[(&str, Vec<f32>)]) -> Self {
        Self {
            vectors: entries
                .iter()
                .map(|(text, vector)| (text.to_string(), vector.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for StaticEmbedder {
    async fn embed(&self, text: &str) -> Vec<f32> {
        self.vectors.get(text).cloned().unwrap_or_default()
    }
}

/// Unit vector in 2-d whose cosine against `[1, 0]` is exactly `c`.
fn with_cosine(c: f32) -> Vec<f32> {
    vec![c, (1.0 - c * c).sqrt()]
}

fn retriever(graph: EntityGraph, embedder: StaticEmbedder) -> Retriever {
    Retriever::new(Arc::new(RwLock::new(graph)), Arc::new(embedder))
}

fn assert_close(left: f32, right: f32) {
    assert!(
        (left - right).abs() < 1e-4,
        "expected {right}, got {left}"
    );
}

fn ids(hits: &[Hit]) -> Vec<&str> {
    hits.iter().map(|hit| hit.chunk_id.as_str()).collect()
}

/// The three-chunk scenario: two strong seeds plus an anti-correlated
/// chunk that only enters through entity co-mention.
fn three_chunk_graph() -> EntityGraph {
    let mut graph = EntityGraph::new();
    graph.add_chunk("chunk-a", "text a", with_cosine(0.9));
    graph.add_chunk("chunk-b", "text b", with_cosine(0.8));
    graph.add_chunk("chunk-c", "text c", with_cosine(-0.1));
    graph.add_entity("X", "Thing");
    graph.add_mention("chunk-a", "X", 1.0);
    graph.add_mention("chunk-b", "X", 1.0);
    graph.add_mention("chunk-c", "X", 1.0);
    graph
}

#[tokio::test]
async fn three_chunk_scenario_ranks_seeds_then_expansion() {
    let embedder = StaticEmbedder::new(&[("query", vec![1.0, 0.0])]);
    let retriever = retriever(three_chunk_graph(), embedder);

    let hits = retriever.retrieve("query", 2, 1).await.unwrap();

    assert_eq!(ids(&hits), vec!["chunk-a", "chunk-b", "chunk-c"]);
    assert!(hits.len() <= 4);
    assert_close(hits[0].score, 0.9);
    assert_close(hits[1].score, 0.8);
    // 0.85 * (-0.1) + 0.15 * 0.15
    assert_close(hits[2].score, -0.0625);
}

#[tokio::test]
async fn seeds_keep_their_stage_one_prior_through_expansion() {
    // chunk-b is reachable from chunk-a's expansion, but it entered the
    // merge set as a seed and must not be re-scored with the exploratory
    // prior.
    let embedder = StaticEmbedder::new(&[("query", vec![1.0, 0.0])]);
    let retriever = retriever(three_chunk_graph(), embedder);

    let hits = retriever.retrieve("query", 2, 5).await.unwrap();
    let chunk_b = hits.iter().find(|hit| hit.chunk_id == "chunk-b").unwrap();
    assert_close(chunk_b.score, 0.8);
}

#[tokio::test]
async fn empty_graph_returns_no_hits() {
    let embedder = StaticEmbedder::new(&[("query", vec![1.0, 0.0])]);
    let retriever = retriever(EntityGraph::new(), embedder);

    let hits = retriever.retrieve("query", 3, 2).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn graph_without_embeddings_returns_no_hits() {
    let mut graph = EntityGraph::new();
    graph.add_chunk("chunk-a", "text a", Vec::new());
    graph.add_chunk("chunk-b", "text b", Vec::new());

    let embedder = StaticEmbedder::new(&[("query", vec![1.0, 0.0])]);
    let retriever = retriever(graph, embedder);

    let hits = retriever.retrieve("query", 3, 2).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn unembeddable_query_returns_no_hits() {
    let mut graph = EntityGraph::new();
    graph.add_chunk("chunk-a", "text a", with_cosine(0.9));

    // the embedder has no entry for the query and degrades to empty
    let embedder = StaticEmbedder::new(&[]);
    let retriever = retriever(graph, embedder);

    let hits = retriever.retrieve("query", 3, 2).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn result_window_is_capped_at_twice_k() {
    let mut graph = EntityGraph::new();
    graph.add_entity("X", "Thing");
    for index in 0..6 {
        let id = format!("chunk-{index}");
        graph.add_chunk(&id, "text", with_cosine(0.9 - 0.05 * index as f32));
        graph.add_mention(&id, "X", 1.0);
    }

    let embedder = StaticEmbedder::new(&[("query", vec![1.0, 0.0])]);
    let retriever = retriever(graph, embedder);

    let hits = retriever.retrieve("query", 1, 10).await.unwrap();
    assert_eq!(hits.len(), 2);
}

#[tokio::test]
async fn expansion_is_bounded_per_entity() {
    let mut graph = EntityGraph::new();
    graph.add_entity("X", "Thing");
    graph.add_chunk("chunk-seed", "seed text", with_cosine(0.9));
    graph.add_mention("chunk-seed", "X", 1.0);
    for index in 0..5 {
        let id = format!("other-{index}");
        // no embedding, so these can only surface through expansion
        graph.add_chunk(&id, "co-mentioned text", Vec::new());
        graph.add_mention(&id, "X", 1.0);
    }

    let embedder = StaticEmbedder::new(&[("query", vec![1.0, 0.0])]);
    let retriever = retriever(graph, embedder);

    let hits = retriever.retrieve("query", 2, 2).await.unwrap();
    // seed plus exactly two of the five co-mentioned chunks
    assert_eq!(ids(&hits), vec!["chunk-seed", "other-0", "other-1"]);
}

#[tokio::test]
async fn expansion_bound_of_zero_adds_nothing() {
    let embedder = StaticEmbedder::new(&[("query", vec![1.0, 0.0])]);
    let retriever = retriever(three_chunk_graph(), embedder);

    let hits = retriever.retrieve("query", 2, 0).await.unwrap();
    assert_eq!(ids(&hits), vec!["chunk-a", "chunk-b"]);
}

#[tokio::test]
async fn negative_similarity_needs_entity_linkage_to_surface() {
    // same chunks as the scenario but without any mentions: chunk-c has
    // nothing to ride in on and must not appear
    let mut graph = EntityGraph::new();
    graph.add_chunk("chunk-a", "text a", with_cosine(0.9));
    graph.add_chunk("chunk-b", "text b", with_cosine(0.8));
    graph.add_chunk("chunk-c", "text c", with_cosine(-0.1));

    let embedder = StaticEmbedder::new(&[("query", vec![1.0, 0.0])]);
    let retriever = retriever(graph, embedder);

    let hits = retriever.retrieve("query", 2, 1).await.unwrap();
    assert_eq!(ids(&hits), vec!["chunk-a", "chunk-b"]);
}

#[tokio::test]
async fn shared_expansion_candidate_is_added_once() {
    let mut graph = EntityGraph::new();
    graph.add_chunk("chunk-a", "text a", with_cosine(0.9));
    graph.add_chunk("chunk-b", "text b", with_cosine(0.8));
    graph.add_chunk("chunk-d", "shared neighbor", Vec::new());
    graph.add_entity("X", "Thing");
    graph.add_entity("Y", "Thing");
    graph.add_mention("chunk-a", "X", 1.0);
    graph.add_mention("chunk-b", "Y", 1.0);
    graph.add_mention("chunk-d", "X", 1.0);
    graph.add_mention("chunk-d", "Y", 1.0);

    let embedder = StaticEmbedder::new(&[("query", vec![1.0, 0.0])]);
    let retriever = retriever(graph, embedder);

    let hits = retriever.retrieve("query", 2, 5).await.unwrap();
    let occurrences = hits
        .iter()
        .filter(|hit| hit.chunk_id == "chunk-d")
        .count();
    assert_eq!(occurrences, 1);
    assert_eq!(hits.len(), 3);
}

#[tokio::test]
async fn unembedded_expansion_candidate_scores_prior_only() {
    let mut graph = EntityGraph::new();
    graph.add_chunk("chunk-a", "text a", with_cosine(0.9));
    graph.add_chunk("chunk-n", "no embedding", Vec::new());
    graph.add_entity("X", "Thing");
    graph.add_mention("chunk-a", "X", 1.0);
    graph.add_mention("chunk-n", "X", 1.0);

    let embedder = StaticEmbedder::new(&[("query", vec![1.0, 0.0])]);
    let retriever = retriever(graph, embedder);

    let hits = retriever.retrieve("query", 1, 1).await.unwrap();
    assert_eq!(ids(&hits), vec!["chunk-a", "chunk-n"]);
    // 0.85 * 0 + 0.15 * 0.15
    assert_close(hits[1].score, 0.0225);
}

#[tokio::test]
async fn mismatched_embedding_spaces_abort_the_call() {
    let mut graph = EntityGraph::new();
    graph.add_chunk("chunk-a", "text a", vec![0.1; 256]);

    let embedder = StaticEmbedder::new(&[("query", vec![0.1; 128])]);
    let retriever = retriever(graph, embedder);

    let result = retriever.retrieve("query", 2, 1).await;
    assert_eq!(
        result.unwrap_err(),
        RetrievalError::DimensionMismatch {
            left: 128,
            right: 256
        }
    );
}

#[tokio::test]
async fn equal_scores_tie_break_on_chunk_id() {
    let mut graph = EntityGraph::new();
    // inserted out of id order on purpose
    graph.add_chunk("chunk-b", "text b", with_cosine(0.7));
    graph.add_chunk("chunk-a", "text a", with_cosine(0.7));

    let embedder = StaticEmbedder::new(&[("query", vec![1.0, 0.0])]);
    let retriever = retriever(graph, embedder);

    let hits = retriever.retrieve("query", 2, 0).await.unwrap();
    assert_eq!(ids(&hits), vec!["chunk-a", "chunk-b"]);
}

#[tokio::test]
async fn retrieval_is_deterministic_across_calls() {
    let embedder = StaticEmbedder::new(&[("query", vec![1.0, 0.0])]);
    let retriever = retriever(three_chunk_graph(), embedder);

    let first = retriever.retrieve("query", 2, 1).await.unwrap();
    let second = retriever.retrieve("query", 2, 1).await.unwrap();

    assert_eq!(ids(&first), ids(&second));
    for (left, right) in first.iter().zip(second.iter()) {
        assert_eq!(left.score, right.score);
    }
}
